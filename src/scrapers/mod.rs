//! News fetchers.
//!
//! Each fetcher hides its source behind [`NewsSource`] and hands back plain
//! [`Article`] records, so the fragile, site-specific extraction can change
//! without touching rendering or delivery.
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Google News search page | [`google_news`] | HTML scraping | Best-effort consent dismissal, snapshot on failure |
//! | GNews | [`gnews`] | Search API | One request per term, failed terms are skipped |
//!
//! Fetchers never fail past their own boundary: any error is logged and the
//! affected results are simply absent from the returned vector.

use crate::models::Article;
use std::time::Duration;

pub mod gnews;
pub mod google_news;

/// Upper bound for every page load or API request made by a fetcher.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// A source of article records.
pub trait NewsSource {
    /// Fetch articles, in source order. Errors are logged, never returned.
    async fn fetch(&self) -> Vec<Article>;
}
