//! Data models shared by the fetch, narrative, render and delivery steps.
//!
//! - [`Article`]: a normalized news record produced by a fetcher
//! - [`EmailMessage`]: the single message built and sent per run
//! - [`GNewsResponse`] / [`GNewsArticle`]: wire format of the GNews search API

use serde::{Deserialize, Serialize};

/// A news article as returned by any fetcher.
///
/// Records are read-only once produced. They carry no identity beyond their
/// fields and are neither deduplicated nor persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// The headline.
    pub title: String,
    /// Absolute URL of the article.
    pub link: String,
    /// Publisher name, when the source exposes one.
    pub source: Option<String>,
    /// Short description or lede, when the source exposes one.
    pub description: Option<String>,
}

/// An outgoing HTML email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// Top-level body of a GNews `/api/v4/search` response.
///
/// Only the fields used downstream are modeled; `totalArticles` and the
/// per-article image/date fields are ignored.
#[derive(Debug, Deserialize)]
pub struct GNewsResponse {
    #[serde(default)]
    pub articles: Vec<GNewsArticle>,
}

/// One entry of [`GNewsResponse::articles`].
#[derive(Debug, Deserialize)]
pub struct GNewsArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
pub struct GNewsSource {
    pub name: String,
}

impl From<GNewsArticle> for Article {
    fn from(a: GNewsArticle) -> Self {
        Article {
            title: a.title,
            link: a.url,
            source: a.source.map(|s| s.name),
            description: a.description.filter(|d| !d.trim().is_empty()),
        }
    }
}
