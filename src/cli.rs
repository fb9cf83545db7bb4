//! Command-line interface definitions for the daily briefing.
//!
//! The program is meant to run with no arguments from a scheduler; every
//! option falls back to an environment variable or a default. Flags exist so
//! a run can be reproduced by hand.

use clap::Parser;

/// Command-line arguments for the daily briefing.
///
/// # Examples
///
/// ```sh
/// # Scheduled run, everything from the environment
/// GOOGLE_API_KEY=... EMAIL_SENDER=... EMAIL_PASSWORD=... \
///     EMAIL_RECEIVERS="a@x.com, b@x.com" daily_briefing
///
/// # Override the keyword list and keep the PDF somewhere else
/// daily_briefing --config ./briefing.yaml --pdf-dir /tmp/briefing
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Sending mailbox, also used as the SMTP login
    #[arg(long, env = "EMAIL_SENDER")]
    pub email_sender: Option<String>,

    /// SMTP password (an app password for Gmail)
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: Option<String>,

    /// Comma-separated list of recipients
    #[arg(long, env = "EMAIL_RECEIVERS")]
    pub email_receivers: Option<String>,

    /// Optional YAML file overriding keywords, exclusions and the recency window
    #[arg(short, long)]
    pub config: Option<String>,

    /// Gemini model used for the summary
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash-preview-09-2025")]
    pub gemini_model: String,

    /// Directory the PDF attachment is written to (only used with the `pdf` feature)
    #[arg(long, default_value = ".")]
    pub pdf_dir: String,

    /// Local path of the PDF font; downloaded on first use if missing
    #[arg(long, default_value = "NanumGothic-Regular.ttf")]
    pub font_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_defaults() {
        // read from the command definition so a GEMINI_MODEL set on the host cannot interfere
        let command = Cli::command();
        let default_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_default_values().first())
                .map(|value| value.to_string_lossy().into_owned())
        };
        assert_eq!(
            default_of("gemini_model").as_deref(),
            Some("gemini-2.5-flash-preview-09-2025")
        );
        assert_eq!(default_of("pdf_dir").as_deref(), Some("."));
        assert_eq!(default_of("font_path").as_deref(), Some("NanumGothic-Regular.ttf"));
    }

    #[test]
    fn test_cli_flags_override_env() {
        let cli = Cli::parse_from([
            "daily_briefing",
            "--gemini-model",
            "gemini-test",
            "--font-path",
            "/fonts/a.ttf",
        ]);
        assert_eq!(cli.gemini_model, "gemini-test");
        assert_eq!(cli.font_path, "/fonts/a.ttf");
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "daily_briefing",
            "--google-api-key",
            "abc",
            "-c",
            "./briefing.yaml",
            "--pdf-dir",
            "/tmp/pdf",
        ]);

        assert_eq!(cli.google_api_key.as_deref(), Some("abc"));
        assert_eq!(cli.config.as_deref(), Some("./briefing.yaml"));
        assert_eq!(cli.pdf_dir, "/tmp/pdf");
    }
}
