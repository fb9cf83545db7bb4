//! The briefing run: collect → summarize → render → publish.
//!
//! Stages run strictly one after another. Each returns a `Result`, and this
//! module decides what a failure means for the run:
//!
//! | Stage | On failure |
//! |-------|-----------|
//! | Collect (per keyword) | skipped inside the collector |
//! | Collect (nothing left) | run ends, no mail |
//! | Summarize | run ends, no mail |
//! | Render | mail goes out without attachment |
//! | Publish | run ends |

use crate::api::AskAsync;
use crate::collector::{self, FeedSource};
use crate::config::Config;
use crate::mail::{self, MailTransport, PublishError};
use crate::outputs::pdf;
use crate::utils::{korean_date, to_kst};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{error, info, instrument};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The collector found nothing; no summary, no mail.
    NoNews,
    /// The language model failed; no mail.
    SummaryFailed,
    /// Mail could not be sent.
    DeliveryFailed { items: usize },
    Delivered {
        items: usize,
        recipients: usize,
        with_attachment: bool,
    },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NoNews => write!(f, "no news collected"),
            RunOutcome::SummaryFailed => write!(f, "summary generation failed"),
            RunOutcome::DeliveryFailed { items } => {
                write!(f, "delivery failed ({items} items summarized)")
            }
            RunOutcome::Delivered {
                items,
                recipients,
                with_attachment,
            } => write!(
                f,
                "delivered {items} items to {recipients} recipients (attachment: {with_attachment})"
            ),
        }
    }
}

/// Execute one briefing run.
///
/// # Arguments
///
/// * `config` - Run configuration
/// * `feed` - News search backend
/// * `llm` - Language model backend
/// * `mailer` - Mail transport; `None` when SMTP is not configured
/// * `now` - Collection instant; the briefing date is this plus nine hours
#[instrument(level = "info", skip_all)]
pub async fn run<F, A, M>(
    config: &Config,
    feed: &F,
    llm: &A,
    mailer: Option<&M>,
    now: DateTime<Utc>,
) -> RunOutcome
where
    F: FeedSource,
    A: AskAsync,
    M: MailTransport,
{
    let kst = to_kst(now);
    let today = korean_date(&kst);

    let items = collector::collect(&config.settings, feed, now).await;
    if items.is_empty() {
        info!("No news collected; skipping summary and delivery");
        return RunOutcome::NoNews;
    }

    let digest = match crate::summarizer::summarize(&items, llm, &today).await {
        Ok(digest) => digest,
        Err(e) => {
            error!(error = %e, "Briefing not generated; no mail will be sent");
            return RunOutcome::SummaryFailed;
        }
    };

    let attachment = pdf::render_optional(&items, &digest, &config.render, &kst).await;

    let (Some(mail_config), Some(mailer)) = (config.mail.as_ref(), mailer) else {
        error!(error = %PublishError::NotConfigured, "Cannot deliver briefing");
        return RunOutcome::DeliveryFailed { items: items.len() };
    };

    match mail::publish(mail_config, mailer, &digest, attachment.as_ref(), &today).await {
        Ok(recipients) => RunOutcome::Delivered {
            items: items.len(),
            recipients,
            with_attachment: attachment.is_some(),
        },
        Err(_) => RunOutcome::DeliveryFailed { items: items.len() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::collector::CollectError;
    use crate::config::{GeminiConfig, MailConfig, RenderConfig, Settings, SMTP_HOST, SMTP_PORT};
    use crate::models::FeedEntry;
    use chrono::TimeZone;
    use lettre::Message;
    use std::cell::{Cell, RefCell};

    struct StaticFeed(Vec<FeedEntry>);

    impl FeedSource for StaticFeed {
        async fn search(&self, _keyword: &str) -> Result<Vec<FeedEntry>, CollectError> {
            Ok(self.0.clone())
        }
    }

    struct CountingLlm {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingLlm {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl AskAsync for CountingLlm {
        async fn ask(&self, _prompt: &str) -> Result<String, ApiError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(ApiError::Empty("no candidates".to_string()))
            } else {
                Ok("```html\n<div>briefing</div>\n```".to_string())
            }
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: RefCell<Vec<Message>>,
    }

    impl MailTransport for RecordingMailer {
        async fn send(&self, message: Message) -> Result<(), PublishError> {
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 0, 0, 0).unwrap()
    }

    /// A config whose renderer always fails: the output "directory" sits under a regular file.
    fn config(blocker: &std::path::Path, with_mail: bool) -> Config {
        Config {
            settings: Settings {
                keywords: vec!["건설".to_string()],
                ..Settings::default()
            },
            gemini: GeminiConfig {
                api_key: "k".to_string(),
                model: "m".to_string(),
            },
            mail: with_mail.then(|| MailConfig {
                sender: "bot@x.com".to_string(),
                password: "p".to_string(),
                receivers: vec!["a@x.com".to_string(), "b@x.com".to_string()],
                host: SMTP_HOST.to_string(),
                port: SMTP_PORT,
            }),
            render: RenderConfig {
                output_dir: blocker.join("out"),
                font_path: blocker.join("font.ttf"),
            },
        }
    }

    fn blocker() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    fn one_entry() -> Vec<FeedEntry> {
        vec![FeedEntry {
            title: Some("하도급법 개정안 통과".to_string()),
            link: Some("https://n.com/1".to_string()),
            published: None,
        }]
    }

    #[tokio::test]
    async fn test_run_short_circuits_without_news() {
        let file = blocker();
        let llm = CountingLlm::new(false);
        let mailer = RecordingMailer::default();

        let outcome = run(&config(file.path(), true), &StaticFeed(vec![]), &llm, Some(&mailer), now()).await;

        assert_eq!(outcome, RunOutcome::NoNews);
        assert_eq!(llm.calls.get(), 0);
        assert!(mailer.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_when_summary_fails() {
        let file = blocker();
        let llm = CountingLlm::new(true);
        let mailer = RecordingMailer::default();

        let outcome = run(&config(file.path(), true), &StaticFeed(one_entry()), &llm, Some(&mailer), now()).await;

        assert_eq!(outcome, RunOutcome::SummaryFailed);
        assert_eq!(llm.calls.get(), 1);
        assert!(mailer.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_run_sends_html_only_when_render_fails() {
        let file = blocker();
        let llm = CountingLlm::new(false);
        let mailer = RecordingMailer::default();

        let outcome = run(&config(file.path(), true), &StaticFeed(one_entry()), &llm, Some(&mailer), now()).await;

        assert_eq!(
            outcome,
            RunOutcome::Delivered {
                items: 1,
                recipients: 2,
                with_attachment: false
            }
        );
        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        let raw = String::from_utf8_lossy(&sent[0].formatted()).into_owned();
        assert!(!raw.contains("Content-Disposition: attachment"));
    }

    #[tokio::test]
    async fn test_run_without_mail_config() {
        let file = blocker();
        let llm = CountingLlm::new(false);

        let outcome = run(
            &config(file.path(), false),
            &StaticFeed(one_entry()),
            &llm,
            None::<&RecordingMailer>,
            now(),
        )
        .await;

        assert_eq!(outcome, RunOutcome::DeliveryFailed { items: 1 });
        assert_eq!(llm.calls.get(), 1);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = RunOutcome::Delivered {
            items: 3,
            recipients: 2,
            with_attachment: true,
        };
        assert_eq!(
            outcome.to_string(),
            "delivered 3 items to 2 recipients (attachment: true)"
        );
    }
}
