// Book identity resolution: ASIN rung first, then title search. On multiple
// title matches the resolver refuses to guess and reports the candidates so
// a human can pick.

use crate::audible::{AudibleCatalog, CatalogError};
use crate::metadata::probe::TagSet;
use crate::metadata::BookMetadata;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No ASIN or title tag to identify the book")]
    NoIdentity,
    #[error("No catalog matches for title")]
    NoMatch,
    #[error("Multiple catalog matches, manual selection required: {}", summaries.join("; "))]
    Ambiguous {
        asins: Vec<String>,
        summaries: Vec<String>,
    },
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub struct MetadataResolver {
    catalog: Arc<dyn AudibleCatalog>,
}

impl MetadataResolver {
    pub fn new(catalog: Arc<dyn AudibleCatalog>) -> Self {
        MetadataResolver { catalog }
    }

    /// Resolve a tag set to a single book record
    pub async fn resolve(&self, tags: &TagSet) -> Result<BookMetadata, ResolveError> {
        if let Some(asin) = tags.audible_asin() {
            match self.lookup(asin).await {
                Ok(md) => {
                    info!(asin = %asin, title = %md.title, summary = %md.summarize(), "Book metadata found by ASIN");
                    return Ok(md);
                }
                Err(err) => {
                    warn!(asin = %asin, error = %err, "ASIN lookup failed, falling back to title lookup");
                }
            }
        }

        let title = tags.title().ok_or(ResolveError::NoIdentity)?;
        let author = tags.artist();

        info!(title = %title, author = ?author, "Looking up by title and author tags");

        let asins = self
            .catalog
            .search_by_title(title, author)
            .await
            .map_err(ResolveError::Catalog)?;

        match asins.as_slice() {
            [] => Err(ResolveError::NoMatch),
            [asin] => Ok(self.lookup(asin).await?),
            _ => {
                let summaries = self.summarize_candidates(&asins).await;
                info!(?asins, ?summaries, "Multiple ASINs found for title, manual selection required");
                Err(ResolveError::Ambiguous { asins, summaries })
            }
        }
    }

    /// Look up an ASIN, treating a record with an empty ASIN as a failed
    /// lookup
    async fn lookup(&self, asin: &str) -> Result<BookMetadata, CatalogError> {
        let md = self.catalog.lookup_by_asin(asin).await?;

        if md.asin.is_empty() {
            return Err(CatalogError::NotFound(asin.to_string()));
        }

        Ok(md)
    }

    async fn summarize_candidates(&self, asins: &[String]) -> Vec<String> {
        let mut summaries = Vec::with_capacity(asins.len());

        for asin in asins {
            match self.lookup(asin).await {
                Ok(md) => summaries.push(md.summarize()),
                Err(err) => {
                    warn!(asin = %asin, error = %err, "Failed to get metadata for candidate ASIN");
                }
            }
        }

        summaries
    }
}
