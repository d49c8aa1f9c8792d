//! GNews search API fetcher.
//!
//! Issues one `GET /api/v4/search` per configured term and concatenates the
//! results in term order. A term whose request fails (transport error,
//! non-200 status, undecodable body) contributes zero articles and the next
//! term is still queried.

use crate::models::{Article, GNewsResponse};
use crate::scrapers::{FETCH_TIMEOUT, NewsSource};
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Public GNews host.
pub const GNEWS_ENDPOINT: &str = "https://gnews.io";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GNEWS_API_KEY";

/// Search parameters sent with every term.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Two-letter language code, e.g. `pt`.
    pub lang: String,
    /// Two-letter country code, e.g. `br`.
    pub country: String,
    /// Maximum number of articles per term.
    pub max: u32,
}

/// Fetches articles for a list of search terms from the GNews API.
#[derive(Debug)]
pub struct GNewsApi {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    terms: Vec<String>,
    params: SearchParams,
}

impl GNewsApi {
    /// Build a fetcher against `endpoint` (normally [`GNEWS_ENDPOINT`]).
    pub fn new(
        endpoint: &str,
        api_key: SecretString,
        terms: Vec<String>,
        params: SearchParams,
    ) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            terms,
            params,
        })
    }

    /// Query a single term.
    ///
    /// The term is wrapped in double quotes so GNews treats it as a phrase.
    /// URLs are stripped from transport errors since they carry the API key.
    #[instrument(level = "info", skip(self), fields(lang = %self.params.lang, country = %self.params.country))]
    async fn search_term(&self, term: &str) -> Result<Vec<Article>, Box<dyn Error>> {
        let url = format!("{}/api/v4/search", self.endpoint);
        let phrase = format!("\"{term}\"");
        let max = self.params.max.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", phrase.as_str()),
                ("lang", self.params.lang.as_str()),
                ("country", self.params.country.as_str()),
                ("max", max.as_str()),
                ("apikey", self.api_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| e.without_url())?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!(
                "GNews returned status {status}: {}",
                truncate_for_log(&body, 200)
            )
            .into());
        }

        let body: GNewsResponse = resp.json().await.map_err(|e| e.without_url())?;
        let articles: Vec<Article> = body.articles.into_iter().map(Article::from).collect();
        debug!(titles = ?articles.iter().map(|a| &a.title).collect::<Vec<_>>(), "GNews titles");
        Ok(articles)
    }
}

impl NewsSource for GNewsApi {
    #[instrument(level = "info", skip_all, fields(terms = self.terms.len()))]
    async fn fetch(&self) -> Vec<Article> {
        let mut articles = Vec::new();

        for term in &self.terms {
            match self.search_term(term).await {
                Ok(found) => {
                    info!(%term, count = found.len(), "Fetched GNews articles for term");
                    articles.extend(found);
                }
                Err(e) => {
                    warn!(%term, error = %e, "GNews search failed; continuing with next term");
                }
            }
        }

        info!(count = articles.len(), "Fetched GNews articles");
        articles
    }
}
