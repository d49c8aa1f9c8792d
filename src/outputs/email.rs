//! Email delivery over SMTP.
//!
//! One message per run: credentials are checked first (nothing is dialed when
//! any is missing), then a single STARTTLS session is opened, authenticated,
//! used for one send to every recipient and closed. Failures are reported to
//! the caller as a [`DeliveryOutcome`]; nothing is retried or queued.

use crate::models::EmailMessage;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Default relay host.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
/// Submission port; the session is upgraded with STARTTLS.
pub const DEFAULT_SMTP_PORT: u16 = 587;

const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

pub const SENDER_VAR: &str = "SENDER_EMAIL";
pub const SECRET_VAR: &str = "SENDER_PASSWORD";
pub const RECIPIENTS_VAR: &str = "RECEIVER_EMAIL";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("invalid email address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Sender identity and recipients, as read from the environment.
///
/// `Debug` never shows the secret.
#[derive(Debug, Default)]
pub struct Credentials {
    sender: Option<String>,
    secret: Option<SecretString>,
    recipients: Vec<String>,
}

/// Credentials with every required value present.
#[derive(Debug)]
pub struct CheckedCredentials<'a> {
    pub sender: &'a str,
    pub secret: &'a SecretString,
    pub recipients: &'a [String],
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Credentials {
    /// Build from raw optional values; blank values count as missing.
    pub fn from_parts(
        sender: Option<String>,
        secret: Option<String>,
        recipients: Option<String>,
    ) -> Self {
        Self {
            sender: non_empty(sender),
            secret: non_empty(secret).map(SecretString::from),
            recipients: recipients.as_deref().map(split_recipients).unwrap_or_default(),
        }
    }

    /// Ensure sender, secret and at least one recipient are present.
    ///
    /// The error names every missing variable, not just the first.
    pub fn check(&self) -> Result<CheckedCredentials<'_>, MailError> {
        let mut missing = Vec::new();
        if self.sender.is_none() {
            missing.push(SENDER_VAR);
        }
        if self.secret.is_none() {
            missing.push(SECRET_VAR);
        }
        if self.recipients.is_empty() {
            missing.push(RECIPIENTS_VAR);
        }

        match (&self.sender, &self.secret) {
            (Some(sender), Some(secret)) if missing.is_empty() => Ok(CheckedCredentials {
                sender,
                secret,
                recipients: &self.recipients,
            }),
            _ => Err(MailError::MissingCredentials(missing)),
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build the MIME message: From, To (every recipient), Subject, Date and a
/// multipart body holding a single HTML part.
pub fn build_message(email: &EmailMessage) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mailbox(&email.from)?)
        .subject(email.subject.as_str())
        .date_now();
    for recipient in &email.to {
        builder = builder.to(mailbox(recipient)?);
    }

    builder
        .multipart(MultiPart::mixed().singlepart(SinglePart::html(email.html_body.clone())))
        .map_err(|e| MailError::Build(e.to_string()))
}

/// Sends a finished message.
pub trait Mailer {
    /// Send `email` once, authenticating as `email.from` with `secret`.
    async fn send(&self, email: &EmailMessage, secret: &SecretString) -> Result<(), MailError>;
}

/// SMTP relay mailer (STARTTLS + AUTH).
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Mailer for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(host = %self.host, port = self.port, recipients = email.to.len()))]
    async fn send(&self, email: &EmailMessage, secret: &SecretString) -> Result<(), MailError> {
        let message = build_message(email)?;
        let creds = SmtpCredentials::new(email.from.clone(), secret.expose_secret().to_string());
        let host = self.host.clone();
        let port = self.port;

        // The transport is built without the connection pool, so the session
        // is closed when the send returns, successfully or not.
        tokio::task::spawn_blocking(move || {
            let transport = SmtpTransport::starttls_relay(&host)
                .map_err(|e| MailError::Smtp(format!("relay setup failed: {e}")))?
                .port(port)
                .credentials(creds)
                .timeout(Some(SMTP_TIMEOUT))
                .build();
            transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| MailError::Smtp(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Smtp(format!("send task failed: {e}")))?
    }
}

/// How a delivery attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    MissingCredentials(Vec<&'static str>),
    Failed(String),
}

/// Check credentials, then send one message with `subject` and `html_body`
/// to every configured recipient.
#[instrument(level = "info", skip_all, fields(%subject))]
pub async fn deliver(
    mailer: &impl Mailer,
    credentials: &Credentials,
    subject: &str,
    html_body: String,
) -> DeliveryOutcome {
    let checked = match credentials.check() {
        Ok(checked) => checked,
        Err(MailError::MissingCredentials(missing)) => {
            warn!(?missing, "Email credentials not configured; not sending");
            return DeliveryOutcome::MissingCredentials(missing);
        }
        Err(e) => return DeliveryOutcome::Failed(e.to_string()),
    };

    let email = EmailMessage {
        from: checked.sender.to_string(),
        to: checked.recipients.to_vec(),
        subject: subject.to_string(),
        html_body,
    };

    info!(recipients = email.to.len(), "Sending email");
    match mailer.send(&email, checked.secret).await {
        Ok(()) => {
            info!("Email sent");
            DeliveryOutcome::Sent
        }
        Err(e) => {
            error!(error = %e, "Failed to send email");
            DeliveryOutcome::Failed(e.to_string())
        }
    }
}
