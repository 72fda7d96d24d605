use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-local host would leak the bearer token.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
}

/// Validates the API base URL that receives the bearer token.
///
/// HTTPS is required. Plain HTTP is accepted only for `localhost` and
/// loopback addresses so tests can point the client at a mock server.
/// A trailing slash is added so relative endpoint paths join under it.
///
/// ```
/// use feeder::util::validate_base_url;
///
/// let url = validate_base_url("https://cloud.feedly.com/v3").unwrap();
/// assert_eq!(url.join("profile").unwrap().as_str(), "https://cloud.feedly.com/v3/profile");
///
/// assert!(validate_base_url("http://cloud.feedly.com/v3").is_err());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_local = match url.host() {
                Some(url::Host::Domain(d)) => d == "localhost",
                Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
                Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
                None => false,
            };
            if !is_local {
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
