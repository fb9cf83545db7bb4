//! Run configuration.
//!
//! A [`Config`] is assembled once in `main` from the parsed [`Cli`] (which
//! itself falls back to environment variables) and an optional YAML
//! [`Settings`] file, then passed by reference into every stage.
//!
//! The keyword list, the exclusion list and the recency window have compiled-in
//! defaults; the YAML file can override any of them.

use crate::cli::Cli;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Mail submission host.
pub const SMTP_HOST: &str = "smtp.gmail.com";

/// Mail submission port (STARTTLS).
pub const SMTP_PORT: u16 = 587;

/// Search terms queried once each, in this order.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "포스코이앤씨",
    "건설 원자재 가격",
    "공정위 하도급 건설",
    "건설 중대재해처벌법",
    "건설사 협력사 ESG",
    "주요 건설사 구매 동향",
    "건설 자재 환율 유가",
    "해상 운임 SCFI 건설",
    "스마트 건설 모듈러 OSC",
    "건설 현장 인력난 외국인",
    "건설 노조 파업 노란봉투법",
    "납품대금 연동제 건설",
    "건설산업기본법 개정",
    "화물연대 레미콘 운송 파업",
];

/// Title substrings that mark stock-market noise.
pub const DEFAULT_EXCLUDE_KEYWORDS: &[&str] = &[
    "특징주", "테마주", "관련주", "주가", "급등", "급락", "상한가", "하한가", "거래량", "매수",
    "매도", "목표가", "체결", "증시", "종목", "투자자", "지수", "코스피", "코스닥", "마감",
];

/// Negative search operators appended to every query.
pub const DEFAULT_NEGATIVE_TERMS: &[&str] = &["-주식", "-종목", "-테마", "-특징주"];

pub const DEFAULT_RECENCY_WINDOW_HOURS: i64 = 24;

pub const DEFAULT_PER_KEYWORD_LIMIT: usize = 3;

/// Upper bound for `recency_window_hours` (one year).
pub const MAX_RECENCY_WINDOW_HOURS: i64 = 24 * 366;

/// Errors raised while assembling a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The generative-language credential is required for every run.
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid settings in {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// Collection settings, overridable through a YAML file.
///
/// ```yaml
/// keywords:
///   - 포스코이앤씨
///   - 건설 원자재 가격
/// exclude_keywords: [주가, 급등]
/// recency_window_hours: 48
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub negative_terms: Vec<String>,
    pub recency_window_hours: i64,
    pub per_keyword_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            exclude_keywords: DEFAULT_EXCLUDE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            negative_terms: DEFAULT_NEGATIVE_TERMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            recency_window_hours: DEFAULT_RECENCY_WINDOW_HOURS,
            per_keyword_limit: DEFAULT_PER_KEYWORD_LIMIT,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        settings.validate().map_err(|reason| ConfigError::Invalid {
            path: path.display().to_string(),
            reason,
        })?;
        info!(
            keywords = settings.keywords.len(),
            exclusions = settings.exclude_keywords.len(),
            window_hours = settings.recency_window_hours,
            "Loaded settings file"
        );
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Check the values a YAML file can get wrong.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_RECENCY_WINDOW_HOURS).contains(&self.recency_window_hours) {
            return Err(format!(
                "recency_window_hours must be between 1 and {MAX_RECENCY_WINDOW_HOURS}, got {}",
                self.recency_window_hours
            ));
        }
        if self.per_keyword_limit == 0 {
            return Err("per_keyword_limit must be at least 1".to_string());
        }
        if self.keywords.is_empty() {
            return Err("keywords must not be empty".to_string());
        }
        Ok(())
    }

    /// The recency window, saturating at [`chrono::TimeDelta::MAX`] for out-of-range hours.
    pub fn recency_window(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_hours(self.recency_window_hours).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// SMTP credentials and recipients.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Sender mailbox, also the SMTP login.
    pub sender: String,
    pub password: String,
    pub receivers: Vec<String>,
    pub host: String,
    pub port: u16,
}

/// Gemini access settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

/// Where the optional PDF and its font live.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub output_dir: PathBuf,
    pub font_path: PathBuf,
}

/// Everything a run needs, built once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub gemini: GeminiConfig,
    /// `None` when any SMTP variable is missing; delivery then fails but
    /// collection and summarization still run.
    pub mail: Option<MailConfig>,
    pub render: RenderConfig,
}

impl Config {
    /// Assemble the run configuration from CLI arguments (and their env fallbacks).
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let api_key = cli
            .google_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        let settings = match cli.config.as_deref() {
            Some(path) => Settings::load(Path::new(path))?,
            None => Settings::default(),
        };

        let mail = match (
            cli.email_sender.as_deref(),
            cli.email_password.as_deref(),
            cli.email_receivers.as_deref(),
        ) {
            (Some(sender), Some(password), Some(receivers)) => Some(MailConfig {
                sender: sender.trim().to_string(),
                password: password.to_string(),
                receivers: parse_recipients(receivers),
                host: SMTP_HOST.to_string(),
                port: SMTP_PORT,
            }),
            _ => {
                warn!("EMAIL_SENDER, EMAIL_PASSWORD or EMAIL_RECEIVERS missing; delivery will fail");
                None
            }
        };

        Ok(Self {
            settings,
            gemini: GeminiConfig {
                api_key,
                model: cli.gemini_model.clone(),
            },
            mail,
            render: RenderConfig {
                output_dir: PathBuf::from(&cli.pdf_dir),
                font_path: PathBuf::from(&cli.font_path),
            },
        })
    }
}

/// Split a comma-separated recipient list, trimming each entry.
///
/// Empty entries (e.g. from a trailing comma) are dropped.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
