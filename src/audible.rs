// Audiobook catalog client. ASIN search goes through the Audible catalog
// products endpoint; full metadata comes from audnex, which returns the
// record shape in `metadata::BookMetadata`.

use crate::metadata::BookMetadata;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const ASIN_SEARCH_URL: &str = "https://api.audible.com/1.0/catalog/products";
const ASIN_METADATA_BASE_URL: &str = "https://api.audnex.us/books";

/// Search results are capped at the catalog's relevance-ordered top ten
const SEARCH_RESULT_CAP: &str = "10";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("No catalog entry for ASIN {0}")]
    NotFound(String),
    #[error("Catalog returned status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// The two catalog operations the importer needs (allows mocking for tests)
#[async_trait]
pub trait AudibleCatalog: Send + Sync {
    /// Look up the full record for an ASIN
    async fn lookup_by_asin(&self, asin: &str) -> Result<BookMetadata, CatalogError>;

    /// Search by title (and author when known), returning ASINs in the
    /// catalog's relevance order. May be empty.
    async fn search_by_title(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<Vec<String>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct AsinItem {
    asin: String,
}

#[derive(Debug, Deserialize)]
struct AsinSearchResponse {
    #[serde(default)]
    products: Vec<AsinItem>,
    #[serde(default)]
    total_results: i64,
}

#[derive(Clone)]
pub struct AudibleClient {
    client: Client,
    search_url: String,
    metadata_base_url: String,
}

impl Default for AudibleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AudibleClient {
    pub fn new() -> Self {
        AudibleClient {
            client: Client::new(),
            search_url: ASIN_SEARCH_URL.to_string(),
            metadata_base_url: ASIN_METADATA_BASE_URL.to_string(),
        }
    }

    /// Point the client at different endpoints (for tests against a local
    /// server)
    pub fn with_base_urls(search_url: String, metadata_base_url: String) -> Self {
        AudibleClient {
            client: Client::new(),
            search_url,
            metadata_base_url,
        }
    }
}

#[async_trait]
impl AudibleCatalog for AudibleClient {
    async fn lookup_by_asin(&self, asin: &str) -> Result<BookMetadata, CatalogError> {
        let url = format!("{}/{}", self.metadata_base_url, asin);

        debug!(asin = %asin, url = %url, "Looking up catalog metadata");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(asin.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::UnexpectedStatus { status, body });
        }

        let md: BookMetadata = response.json().await?;

        info!(asin = %asin, title = %md.title, "Retrieved catalog metadata");

        Ok(md)
    }

    async fn search_by_title(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<Vec<String>, CatalogError> {
        debug!(title = %title, author = ?author, "Searching catalog by title");

        let mut query = vec![
            ("num_results", SEARCH_RESULT_CAP),
            ("products_sort_by", "Relevance"),
            ("title", title),
        ];
        if let Some(author) = author {
            query.push(("author", author));
        }

        let response = self.client.get(&self.search_url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::UnexpectedStatus { status, body });
        }

        let parsed: AsinSearchResponse = response.json().await?;
        let asins: Vec<String> = parsed.products.into_iter().map(|item| item.asin).collect();

        info!(
            title = %title,
            result_count = asins.len(),
            total_results = parsed.total_results,
            "Searched catalog by title"
        );

        Ok(asins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_deserializes() {
        let json = r#"{
            "products": [{"asin": "B001"}, {"asin": "B002"}],
            "total_results": 37
        }"#;

        let parsed: AsinSearchResponse = serde_json::from_str(json).unwrap();
        let asins: Vec<String> = parsed.products.into_iter().map(|item| item.asin).collect();
        assert_eq!(asins, vec!["B001", "B002"]);
    }

    #[test]
    fn search_response_tolerates_missing_fields() {
        let parsed: AsinSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.products.is_empty());
        assert_eq!(parsed.total_results, 0);
    }
}
