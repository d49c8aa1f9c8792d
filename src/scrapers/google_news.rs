//! Google News search-page scraper.
//!
//! Loads the Google News search results for a query and extracts the first
//! few `article` cards. The markup is undocumented and changes without
//! notice, so everything here is best effort:
//!
//! 1. Load the search page (bounded by [`FETCH_TIMEOUT`]).
//! 2. If Google answered with its consent interstitial, submit the consent
//!    form once. Not finding or not submitting it is not an error.
//! 3. Require at least one node matching the content selector.
//! 4. Walk the first `limit` cards, reading the headline and the card link.
//!    Cards missing either are skipped.
//!
//! Any failure writes an HTML snapshot of the last page seen to the snapshot
//! directory and yields an empty result.

use crate::models::Article;
use crate::scrapers::{FETCH_TIMEOUT, NewsSource};
use chrono::Local;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Public Google News host; article links are resolved against it.
pub const GOOGLE_NEWS_BASE: &str = "https://news.google.com/";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static HEADLINE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h3, h4").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static FORM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("form[action]").unwrap());
static HIDDEN_INPUT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[type="hidden"][name]"#).unwrap());

/// Query parameters for the search page.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Free-text query, e.g. `construção civil`.
    pub query: String,
    /// Interface language, e.g. `pt-BR`.
    pub hl: String,
    /// Country, e.g. `BR`.
    pub gl: String,
    /// Edition id, e.g. `BR:pt-419`.
    pub ceid: String,
}

/// Scrapes article cards from a Google News search-results page.
#[derive(Debug)]
pub struct GoogleNewsPage {
    client: Client,
    base_url: Url,
    search_url: Url,
    limit: usize,
    snapshot_dir: PathBuf,
}

/// A fetched page: the URL it finally came from, and its body.
struct Page {
    url: Url,
    body: String,
}

/// Why a scrape produced nothing, plus whatever body was last seen.
struct ScrapeFailure {
    reason: String,
    body: Option<String>,
}

impl ScrapeFailure {
    fn new(reason: impl Into<String>, body: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            body,
        }
    }
}

impl fmt::Display for ScrapeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl GoogleNewsPage {
    /// Build a scraper against `base_url` (normally [`GOOGLE_NEWS_BASE`]).
    pub fn new(
        base_url: &str,
        search: &SearchPage,
        limit: usize,
        snapshot_dir: impl Into<PathBuf>,
    ) -> Result<Self, Box<dyn Error>> {
        let base_url = Url::parse(base_url)?;
        let search_url = Url::parse_with_params(
            base_url.join("search")?.as_str(),
            &[
                ("q", search.query.as_str()),
                ("hl", search.hl.as_str()),
                ("gl", search.gl.as_str()),
                ("ceid", search.ceid.as_str()),
            ],
        )?;
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            search_url,
            limit,
            snapshot_dir: snapshot_dir.into(),
        })
    }

    async fn load(&self, url: Url) -> Result<Page, ScrapeFailure> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeFailure::new(format!("page request failed: {e}"), None))?;
        read_page(resp).await
    }

    /// Submit the consent form if `page` is the consent interstitial.
    ///
    /// Returns the page to continue with: the post-consent page on success,
    /// otherwise the page that was passed in.
    #[instrument(level = "debug", skip_all, fields(url = %page.url))]
    async fn dismiss_consent(&self, page: Page) -> Page {
        let Some((action, fields)) = consent_form(&page.url, &page.body) else {
            debug!("No consent dialog found");
            return page;
        };

        info!(%action, fields = fields.len(), "Consent dialog found; submitting");
        let submitted = match self.client.post(action).form(&fields).send().await {
            Ok(resp) => read_page(resp).await,
            Err(e) => Err(ScrapeFailure::new(e.to_string(), None)),
        };
        match submitted {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, "Could not dismiss consent dialog; using original page");
                page
            }
        }
    }

    async fn scrape(&self) -> Result<Vec<Article>, ScrapeFailure> {
        let page = self.load(self.search_url.clone()).await?;
        let page = self.dismiss_consent(page).await;

        if !has_content(&page.body) {
            return Err(ScrapeFailure::new(
                "content selector `article` not found",
                Some(page.body),
            ));
        }

        Ok(extract_articles(&page.body, &self.base_url, self.limit))
    }

    /// Write the last seen page (or the failure reason) to the snapshot directory.
    #[instrument(level = "info", skip_all, fields(dir = %self.snapshot_dir.display()))]
    async fn write_snapshot(&self, failure: &ScrapeFailure) -> Result<PathBuf, Box<dyn Error>> {
        fs::create_dir_all(&self.snapshot_dir).await?;
        let path = self.snapshot_dir.join(format!(
            "news_snapshot_{}.html",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let contents = match &failure.body {
            Some(body) => body.clone(),
            None => format!("<!-- {} -->\n", failure.reason),
        };
        fs::write(&path, contents).await?;
        Ok(path)
    }
}

impl NewsSource for GoogleNewsPage {
    #[instrument(level = "info", skip_all, fields(url = %self.search_url))]
    async fn fetch(&self) -> Vec<Article> {
        match self.scrape().await {
            Ok(articles) => {
                info!(count = articles.len(), "Scraped Google News articles");
                articles
            }
            Err(failure) => {
                error!(reason = %failure, "Google News scrape failed");
                match self.write_snapshot(&failure).await {
                    Ok(path) => info!(path = %path.display(), "Wrote diagnostic snapshot"),
                    Err(e) => warn!(error = %e, "Failed to write diagnostic snapshot"),
                }
                Vec::new()
            }
        }
    }
}

async fn read_page(resp: reqwest::Response) -> Result<Page, ScrapeFailure> {
    let status = resp.status();
    let url = resp.url().clone();
    let body = resp
        .text()
        .await
        .map_err(|e| ScrapeFailure::new(format!("reading page body failed: {e}"), None))?;
    if !status.is_success() {
        return Err(ScrapeFailure::new(
            format!("page returned status {status}"),
            Some(body),
        ));
    }
    Ok(Page { url, body })
}

fn has_content(body: &str) -> bool {
    Html::parse_document(body)
        .select(&CONTENT_SELECTOR)
        .next()
        .is_some()
}

/// Locate a consent form on `body`.
///
/// A page counts as a consent interstitial when it was served from
/// `consent.google.com` or holds a form posting to a `consent` action.
/// Returns the absolute action URL and the form's hidden fields.
fn consent_form(page_url: &Url, body: &str) -> Option<(Url, Vec<(String, String)>)> {
    let on_consent_host = page_url.host_str() == Some("consent.google.com");
    let document = Html::parse_document(body);

    let form = document.select(&FORM_SELECTOR).find(|form| {
        let action = form.value().attr("action").unwrap_or_default();
        on_consent_host || action.contains("consent")
    })?;

    let action = page_url.join(form.value().attr("action")?).ok()?;
    let fields = form
        .select(&HIDDEN_INPUT_SELECTOR)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Some((action, fields))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_article(card: ElementRef<'_>, base_url: &Url) -> Option<Article> {
    let href = card
        .select(&LINK_SELECTOR)
        .find_map(|a| a.value().attr("href"))?;
    let link = base_url.join(href).ok()?;

    let title = card
        .select(&HEADLINE_SELECTOR)
        .map(element_text)
        .find(|t| !t.is_empty())
        .or_else(|| {
            card.select(&LINK_SELECTOR)
                .map(element_text)
                .find(|t| !t.is_empty())
        })?;

    Some(Article {
        title,
        link: link.to_string(),
        source: None,
        description: None,
    })
}

/// Extract article records from the first `limit` cards of a results page.
///
/// Cards are taken first and filtered afterwards, so fewer than `limit`
/// records come back when some of the leading cards are incomplete.
pub fn extract_articles(body: &str, base_url: &Url, limit: usize) -> Vec<Article> {
    let document = Html::parse_document(body);
    let mut articles = Vec::new();

    for (i, card) in document.select(&CONTENT_SELECTOR).take(limit).enumerate() {
        match extract_article(card, base_url) {
            Some(article) => articles.push(article),
            None => debug!(index = i, "Skipping card without headline or link"),
        }
    }

    articles
}
