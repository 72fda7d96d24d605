use anyhow::{Context, Result};
use clap::Parser;
use feeder::api::FeedlyClient;
use feeder::config::Config;
use feeder::extractor::{ExtractError, Extractor, Summary};
use feeder::options::{DateWindow, FetchOptions, OutputFormat};
use feeder::ratelimit;
use feeder::util::generate_output_prefix;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const EXAMPLES: &str = "\
Examples:
  # Extract articles from the past week
  feeder

  # Extract articles from the past 3 days
  feeder --days 3

  # Extract articles from a specific date range
  feeder --start-date 2024-01-01 --end-date 2024-01-07

  # Extract only unread articles from one folder
  feeder --unread-only --category \"Tech News\"

  # Limit to 100 articles and save as JSON only
  feeder --max-articles 100 --format json --output my_articles";

#[derive(Parser, Debug)]
#[command(
    name = "feeder",
    version,
    about = "Extract articles from your Feedly feeds",
    after_help = EXAMPLES
)]
struct Args {
    /// Number of days to look back (default: 7, or `default_days_back` from the config)
    #[arg(short, long, conflicts_with = "start_date")]
    days: Option<u32>,

    /// Start date in YYYY-MM-DD format
    #[arg(short, long, value_name = "YYYY-MM-DD")]
    start_date: Option<String>,

    /// End date in YYYY-MM-DD format (requires --start-date)
    #[arg(short, long, value_name = "YYYY-MM-DD")]
    end_date: Option<String>,

    /// Filter by Feedly folder name (partial match, case-insensitive)
    #[arg(short, long)]
    category: Option<String>,

    /// Only fetch unread articles
    #[arg(short, long)]
    unread_only: bool,

    /// Maximum number of articles to fetch
    #[arg(short, long)]
    max_articles: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::All)]
    format: OutputFormat,

    /// Output filename prefix (without extension)
    #[arg(short, long)]
    output: Option<String>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// List your Feedly folders and exit
    #[arg(long)]
    list_categories: bool,

    /// List your subscribed feeds and exit
    #[arg(long)]
    list_subscriptions: bool,

    /// Report the API rate limit status and exit
    #[arg(long)]
    check_rate_limit: bool,

    /// Delay between API requests in seconds (default: 0.5)
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Disable progressive saving (save all at once at the end)
    #[arg(long)]
    no_progressive_save: bool,

    /// Config file (default: ~/.config/feeder/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the token may come from the real environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tokio::select! {
        result = run(args) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Operation cancelled by user");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let window = DateWindow::from_args(args.days, args.start_date, args.end_date)?;

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        },
    };

    let api_delay = match args.delay {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid --delay value: {secs}"))?,
        None => config.api_delay(),
    };

    let token = config.access_token()?;
    let client = FeedlyClient::new(token, config.client_settings())?;

    if args.check_rate_limit {
        check_rate_limit(&client).await;
        return Ok(());
    }

    let extractor = Extractor::new(
        client,
        config.fetch_limits(),
        config.export_dir.clone(),
        config.default_days_back,
    );

    if args.list_categories {
        extractor.list_categories().await?;
        return Ok(());
    }
    if args.list_subscriptions {
        extractor.list_subscriptions().await?;
        return Ok(());
    }

    if !args.quiet {
        println!("Starting Feedly Articles Extractor...");
    }

    let options = FetchOptions {
        window,
        category: args.category,
        unread_only: args.unread_only,
        max_articles: args.max_articles,
        api_delay,
        output_prefix: generate_output_prefix(args.output.as_deref(), chrono::Local::now()),
        output_format: args.format,
        progressive: !args.no_progressive_save,
        quiet: args.quiet,
    };

    let outcome = extractor.export(&options).await?;
    tracing::info!(
        articles = outcome.articles.len(),
        stop = ?outcome.stop,
        "Export finished"
    );

    if outcome.articles.is_empty() {
        println!("No articles found for the specified criteria");
        return Ok(());
    }

    if !args.quiet {
        println!();
        print!("{}", Summary::from_articles(&outcome.articles));
    }
    Ok(())
}

async fn check_rate_limit(client: &FeedlyClient) {
    println!(
        "Checking rate limit status at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}", "-".repeat(50));

    match ratelimit::check_rate_limit(client).await {
        Ok(status) => print!("{}", status.report(chrono::Utc::now())),
        Err(e) => println!("Error checking API status: {e}"),
    }

    println!();
    println!("{}", "-".repeat(50));
    println!("{}", ratelimit::TIPS);
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<ExtractError>() {
        Some(e) if e.is_rate_limited() => {
            eprintln!("Error: Rate limit exceeded. The Feedly API has usage limits.");
            eprintln!("Tips to avoid rate limits:");
            eprintln!("   - Use smaller date ranges (--days 1 or --days 3)");
            eprintln!("   - Limit articles fetched (--max-articles 100)");
            eprintln!("   - Wait a few minutes before trying again");
            eprintln!("   - Use --category to fetch from specific categories only");
        }
        Some(ExtractError::Api(e)) => {
            eprintln!("Error: API request failed: {e}");
            eprintln!("Check your access token and internet connection");
        }
        _ => eprintln!("Error: {err:#}"),
    }
}
