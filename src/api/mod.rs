//! Feedly Cloud API access.
//!
//! - `client` - Authenticated HTTP session with retry and rate-limit backoff
//! - [`types`] - Serde mirrors of the JSON the service returns

mod client;
pub mod types;

pub use client::{ApiError, FeedlyClient, RawResponse, StreamRequest};
pub use types::{Entry, Profile, StreamContents, Subscription};
