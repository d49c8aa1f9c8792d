//! The fetch → transform → render → deliver sequence.
//!
//! Each run walks the steps once, strictly downstream. Fetchers, the text
//! model and the mailer are passed in, so the same code drives production
//! clients and test stubs.

use crate::api::AskAsync;
use crate::narrative;
use crate::outputs::email::{Credentials, DeliveryOutcome, Mailer, deliver};
use crate::outputs::html::{render_article_list, render_narrative};
use crate::scrapers::NewsSource;
use crate::utils::{date_stamp, title_case};
use chrono::{DateTime, Local};
use secrecy::SecretString;
use tracing::{info, instrument, warn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Delivery was attempted (or skipped for missing credentials).
    Delivered(DeliveryOutcome),
    /// The fetch came back empty and this variant does not mail empty digests.
    EmptyFetch,
    /// A required API key was missing or blank; nothing was fetched or sent.
    MissingApiKey(&'static str),
}

/// Read a required API key, treating a blank value as missing.
pub fn require_api_key(raw: Option<String>, var: &'static str) -> Result<SecretString, RunOutcome> {
    match raw.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        Some(key) => Ok(SecretString::from(key)),
        None => {
            warn!(%var, "API key not configured; not fetching or sending");
            Err(RunOutcome::MissingApiKey(var))
        }
    }
}

/// Inputs shared by both variants.
pub struct RunContext<'a, M> {
    pub mailer: &'a M,
    pub credentials: &'a Credentials,
    pub now: DateTime<Local>,
}

/// Subject for the scrape variant: `Notícias Diárias sobre <Topic> - dd/mm/YYYY`.
pub fn scrape_subject(query: &str, now: &DateTime<Local>) -> String {
    format!(
        "Notícias Diárias sobre {} - {}",
        title_case(query),
        date_stamp(now)
    )
}

fn topics(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| title_case(t))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Subject for the digest variant: `Notícias sobre '<Topics>' - dd/mm/YYYY`.
pub fn digest_subject(terms: &[String], now: &DateTime<Local>) -> String {
    format!("Notícias sobre '{}' - {}", topics(terms), date_stamp(now))
}

/// Scrape a results page and mail the links. Nothing is sent when the
/// scrape found no articles.
#[instrument(level = "info", skip_all, fields(%query))]
pub async fn run_scrape<M: Mailer>(
    source: &impl NewsSource,
    query: &str,
    ctx: RunContext<'_, M>,
) -> RunOutcome {
    let articles = source.fetch().await;
    info!(count = articles.len(), "Fetch step finished");
    if articles.is_empty() {
        warn!("No articles found; the email will not be sent");
        return RunOutcome::EmptyFetch;
    }

    let heading = format!("Principais Notícias sobre {}", title_case(query));
    let html = render_article_list(&heading, &articles, &ctx.now);
    let subject = scrape_subject(query, &ctx.now);

    RunOutcome::Delivered(deliver(ctx.mailer, ctx.credentials, &subject, html).await)
}

/// Query the news API and mail either a generated narrative (when a text
/// model is configured) or a list of links. An empty fetch still mails the
/// "no news" body.
#[instrument(level = "info", skip_all, fields(terms = terms.len(), narrative = asker.is_some()))]
pub async fn run_digest<M: Mailer, A: AskAsync>(
    source: &impl NewsSource,
    asker: Option<&A>,
    terms: &[String],
    ctx: RunContext<'_, M>,
) -> RunOutcome {
    let articles = source.fetch().await;
    info!(count = articles.len(), "Fetch step finished");

    let heading = format!("Sua Newsletter Diária sobre '{}'", topics(terms));

    let html = match asker {
        Some(asker) => {
            let body = narrative::generate(asker, &articles).await;
            render_narrative(&heading, &body, &ctx.now)
        }
        None => render_article_list(&heading, &articles, &ctx.now),
    };
    let subject = digest_subject(terms, &ctx.now);

    RunOutcome::Delivered(deliver(ctx.mailer, ctx.credentials, &subject, html).await)
}
