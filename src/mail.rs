//! Briefing delivery over SMTP.
//!
//! One `multipart/mixed` message is built per run: the HTML body and, when a
//! PDF was rendered, one attachment part. It is handed to a [`MailTransport`]
//! in a single send covering every recipient. Any failure (bad address,
//! rejected login, unreachable host) fails the whole delivery; there is no
//! per-recipient tracking and no retry.

use crate::config::MailConfig;
use crate::models::{Attachment, DigestDocument};
use crate::outputs::email::{render_email, subject};
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    /// SMTP credentials or recipients were not configured.
    #[error("mail delivery is not configured")]
    NotConfigured,

    #[error("no recipients configured")]
    NoRecipients,

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl From<lettre::error::Error> for PublishError {
    fn from(e: lettre::error::Error) -> Self {
        PublishError::Build(e.to_string())
    }
}

/// Something that can deliver a finished message.
pub trait MailTransport {
    async fn send(&self, message: Message) -> Result<(), PublishError>;
}

/// Authenticated STARTTLS submission.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, PublishError> {
        let creds = Credentials::new(config.sender.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(creds)
            .build();
        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), PublishError> {
        self.transport.send(message).await?;
        Ok(())
    }
}

/// A rendered attachment loaded into memory.
pub struct AttachmentPart<'a> {
    pub attachment: &'a Attachment,
    pub bytes: Vec<u8>,
}

/// Build the briefing message addressed to every configured recipient.
pub fn build_message(
    config: &MailConfig,
    subject: &str,
    html: String,
    attachment: Option<AttachmentPart<'_>>,
) -> Result<Message, PublishError> {
    if config.receivers.is_empty() {
        return Err(PublishError::NoRecipients);
    }

    let from: Mailbox = config.sender.parse()?;
    let mut builder = Message::builder().from(from).subject(subject);
    for receiver in &config.receivers {
        builder = builder.to(receiver.parse::<Mailbox>()?);
    }

    let mut body = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(html),
    );
    if let Some(part) = attachment {
        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| PublishError::Build(e.to_string()))?;
        body = body.singlepart(
            lettre::message::Attachment::new(part.attachment.filename.clone())
                .body(part.bytes, content_type),
        );
    }

    Ok(builder.multipart(body)?)
}

/// Send the briefing.
///
/// An attachment that cannot be read back from disk is dropped with a
/// warning; the HTML mail still goes out.
///
/// # Returns
///
/// The number of recipients the message was addressed to.
#[instrument(level = "info", skip_all, fields(recipients = config.receivers.len()))]
pub async fn publish<T: MailTransport>(
    config: &MailConfig,
    transport: &T,
    digest: &DigestDocument,
    attachment: Option<&Attachment>,
    today: &str,
) -> Result<usize, PublishError> {
    let part = match attachment {
        Some(att) => match tokio::fs::read(&att.path).await {
            Ok(bytes) => Some(AttachmentPart {
                attachment: att,
                bytes,
            }),
            Err(e) => {
                warn!(path = %att.path.display(), error = %e, "Could not read attachment; sending without it");
                None
            }
        },
        None => None,
    };
    let with_attachment = part.is_some();

    let message = build_message(config, &subject(today), render_email(digest, today), part)
        .inspect_err(|e| error!(error = %e, "Failed to build briefing mail"))?;

    transport
        .send(message)
        .await
        .inspect_err(|e| error!(error = %e, "Mail delivery failed"))?;

    info!(
        recipients = config.receivers.len(),
        with_attachment, "Briefing mail sent"
    );
    Ok(config.receivers.len())
}
