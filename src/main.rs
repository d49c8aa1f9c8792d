//! # News Mailer
//!
//! A daily newsletter job: fetch news for a topic, optionally rewrite it as a
//! narrative with a generative-text model, render an HTML email and send it
//! over SMTP.
//!
//! ## Usage
//!
//! ```sh
//! export SENDER_EMAIL=... SENDER_PASSWORD=... RECEIVER_EMAIL=a@x.com,b@y.com
//! news_mailer scrape
//! GNEWS_API_KEY=... GEMINI_API_KEY=... news_mailer digest -t "mercado imobiliario"
//! ```
//!
//! ## Architecture
//!
//! Every run is one pass of a fixed pipeline:
//! 1. **Fetch**: scrape the Google News search page, or query GNews per term
//! 2. **Transform**: optionally turn the articles into a narrative (Gemini)
//! 3. **Render**: build the HTML body
//! 4. **Deliver**: one SMTP session, one message to every recipient
//!
//! Failures degrade to empty results or fallback text and are logged; the
//! process exits normally either way.

use chrono::Local;
use clap::Parser;
use secrecy::SecretString;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod models;
mod narrative;
mod outputs;
mod pipeline;
mod scrapers;
#[cfg(test)]
mod test_support;
mod utils;

use api::GeminiClient;
use cli::{Cli, Command, DigestArgs, ScrapeArgs};
use outputs::email::{Credentials, Mailer, SmtpMailer};
use pipeline::{RunContext, RunOutcome};
use scrapers::gnews::{API_KEY_VAR, GNewsApi, SearchParams};
use scrapers::google_news::{GoogleNewsPage, SearchPage};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // Both reqwest and lettre use rustls; pick the provider before any TLS.
    // An Err here only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // A missing .env is fine; the scheduler normally exports the variables.
    let _ = dotenvy::dotenv();

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
    info!("news_mailer starting up");

    let args = Cli::parse();
    let mail = args.mail.with_legacy_vars(|name| std::env::var(name).ok());

    let credentials = Credentials::from_parts(
        mail.sender_email,
        mail.sender_password,
        mail.receiver_email,
    );
    let mailer = SmtpMailer::new(mail.smtp_host, mail.smtp_port);
    let ctx = RunContext {
        mailer: &mailer,
        credentials: &credentials,
        now: Local::now(),
    };

    let outcome = match args.command {
        Command::Scrape(scrape) => run_scrape(scrape, ctx).await?,
        Command::Digest(digest) => run_digest(digest, ctx).await?,
    };

    match &outcome {
        RunOutcome::EmptyFetch => warn!("Could not fetch any news; email not sent"),
        RunOutcome::MissingApiKey(var) => warn!(%var, "Required API key missing; email not sent"),
        RunOutcome::Delivered(delivery) => info!(?delivery, "Delivery finished"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

async fn run_scrape(
    args: ScrapeArgs,
    ctx: RunContext<'_, SmtpMailer>,
) -> Result<RunOutcome, Box<dyn Error>> {
    debug!(?args, "Scrape arguments");
    let search = SearchPage {
        query: args.query.clone(),
        hl: args.hl,
        gl: args.gl,
        ceid: args.ceid,
    };
    let source = GoogleNewsPage::new(&args.base_url, &search, args.limit, args.snapshot_dir)?;

    Ok(pipeline::run_scrape(&source, &args.query, ctx).await)
}

async fn run_digest<M: Mailer>(
    args: DigestArgs,
    ctx: RunContext<'_, M>,
) -> Result<RunOutcome, Box<dyn Error>> {
    debug!(terms = ?args.terms, lang = %args.lang, country = %args.country, max = args.max, "Digest arguments");

    let gnews_key = match pipeline::require_api_key(args.gnews_api_key, API_KEY_VAR) {
        Ok(key) => key,
        Err(outcome) => return Ok(outcome),
    };
    let source = GNewsApi::new(
        &args.gnews_endpoint,
        gnews_key,
        args.terms.clone(),
        SearchParams {
            lang: args.lang,
            country: args.country,
            max: args.max,
        },
    )?;

    let asker = match args.gemini_api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => match GeminiClient::new(
            &args.gemini_endpoint,
            &args.gemini_model,
            SecretString::from(key),
        ) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Could not build Gemini client; mailing a plain list");
                None
            }
        },
        None => {
            info!("GEMINI_API_KEY not set; mailing a plain list");
            None
        }
    };

    Ok(pipeline::run_digest(&source, asker.as_ref(), &args.terms, ctx).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailMessage;
    use crate::outputs::email::MailError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingMailer {
        sent: RefCell<Vec<EmailMessage>>,
    }

    impl Mailer for RecordingMailer {
        async fn send(&self, email: &EmailMessage, _secret: &SecretString) -> Result<(), MailError> {
            self.sent.borrow_mut().push(email.clone());
            Ok(())
        }
    }

    fn digest_args(gnews_api_key: Option<&str>) -> DigestArgs {
        DigestArgs {
            terms: vec!["mercado imobiliario".to_string()],
            lang: "pt".to_string(),
            country: "br".to_string(),
            max: 10,
            gnews_api_key: gnews_api_key.map(str::to_string),
            // Nothing listens here; a request would only come back empty.
            gnews_endpoint: "http://127.0.0.1:9".to_string(),
            gemini_api_key: None,
            gemini_model: api::DEFAULT_GEMINI_MODEL.to_string(),
            gemini_endpoint: api::GEMINI_ENDPOINT.to_string(),
        }
    }

    #[tokio::test]
    async fn test_digest_without_gnews_key_never_mails() {
        let credentials = Credentials::from_parts(
            Some("news@example.com".to_string()),
            Some("secret".to_string()),
            Some("a@example.com".to_string()),
        );

        for key in [None, Some(""), Some("   ")] {
            let mailer = RecordingMailer::default();
            let ctx = RunContext {
                mailer: &mailer,
                credentials: &credentials,
                now: Local::now(),
            };

            let outcome = run_digest(digest_args(key), ctx).await.unwrap();

            assert_eq!(outcome, RunOutcome::MissingApiKey(API_KEY_VAR));
            assert!(mailer.sent.borrow().is_empty());
        }
    }

    #[tokio::test]
    async fn test_digest_with_gnews_key_mails() {
        let credentials = Credentials::from_parts(
            Some("news@example.com".to_string()),
            Some("secret".to_string()),
            Some("a@example.com".to_string()),
        );
        let mailer = RecordingMailer::default();
        let ctx = RunContext {
            mailer: &mailer,
            credentials: &credentials,
            now: Local::now(),
        };

        let outcome = run_digest(digest_args(Some("key")), ctx).await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Delivered(outputs::email::DeliveryOutcome::Sent)
        );
        assert_eq!(mailer.sent.borrow().len(), 1);
    }
}
