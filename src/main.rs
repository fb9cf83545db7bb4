//! # Daily Briefing
//!
//! A scheduled news digest: searches Google News for a fixed set of
//! construction-procurement keywords, filters and deduplicates the results,
//! has Gemini write an HTML briefing, and mails it to a static recipient list.
//!
//! ## Features
//!
//! - One Google News RSS search per keyword, first three results each
//! - 24-hour recency window (fail-open on unparseable dates) and a
//!   stock-market noise filter on titles
//! - Single Gemini `generateContent` call producing the briefing body
//! - HTML email over Gmail SMTP (STARTTLS), optional PDF attachment
//!   (`--features pdf`)
//!
//! ## Usage
//!
//! ```sh
//! GOOGLE_API_KEY=... EMAIL_SENDER=... EMAIL_PASSWORD=... \
//!     EMAIL_RECEIVERS="a@x.com, b@x.com" daily_briefing
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Collect**: Search the feed per keyword and filter entries
//! 2. **Summarize**: Send the items to Gemini for the briefing body
//! 3. **Render**: Optionally produce a PDF copy
//! 4. **Publish**: Wrap the body in the email template and send it
//!
//! Every failure is logged; the process always exits with status 0.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod collector;
mod config;
mod mail;
mod models;
mod outputs;
mod pipeline;
mod summarizer;
mod utils;

use api::GeminiClient;
use cli::Cli;
use collector::google_news::GoogleNewsClient;
use config::Config;
use mail::SmtpMailer;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_briefing starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, model = %args.gemini_model, "Parsed CLI arguments");

    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration; nothing to do");
            return Ok(());
        }
    };
    info!(
        keywords = config.settings.keywords.len(),
        mail_configured = config.mail.is_some(),
        "Configuration loaded"
    );

    let feed = GoogleNewsClient::new(config.settings.negative_terms.clone());
    let llm = GeminiClient::new(&config.gemini);
    let mailer = match config.mail.as_ref().map(SmtpMailer::new).transpose() {
        Ok(mailer) => mailer,
        Err(e) => {
            error!(error = %e, "Failed to set up SMTP transport");
            None
        }
    };

    let outcome = pipeline::run(&config, &feed, &llm, mailer.as_ref(), Utc::now()).await;

    let elapsed = start_time.elapsed();
    info!(
        %outcome,
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
