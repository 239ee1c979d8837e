// Shared test doubles for the import pipeline integration tests

use async_trait::async_trait;
use shelfwright::audible::{AudibleCatalog, CatalogError};
use shelfwright::metadata::probe::{ProbeError, TagReader, TagSet};
use shelfwright::metadata::BookMetadata;
use shelfwright::qbit::{QbitError, Torrent, TorrentFile, TorrentGateway};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Initialize tracing for tests with proper test output handling
#[allow(dead_code)]
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// In-memory torrent client. Tag operations mutate the stored torrents so
/// the absorbing-tag behavior is observable through the gateway itself.
#[derive(Default)]
pub struct MockGateway {
    pub state: Mutex<GatewayState>,
    pub fail_add_tags: bool,
}

#[derive(Default)]
struct GatewayState {
    torrents: Vec<Torrent>,
    files: HashMap<String, Vec<String>>,
}

impl MockGateway {
    pub fn add_torrent(&self, torrent: Torrent, files: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .files
            .insert(torrent.hash.clone(), files.iter().map(|f| f.to_string()).collect());
        state.torrents.push(torrent);
    }

    pub fn tags_of(&self, hash: &str) -> HashSet<String> {
        let state = self.state.lock().unwrap();
        state
            .torrents
            .iter()
            .find(|t| t.hash == hash)
            .map(|t| shelfwright::qbit::tag_set(&t.tags))
            .unwrap_or_default()
    }
}

#[async_trait]
impl TorrentGateway for MockGateway {
    async fn list_by_category(&self, category: &str) -> Result<Vec<Torrent>, QbitError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .torrents
            .iter()
            .filter(|t| category.is_empty() || t.category == category)
            .cloned()
            .collect())
    }

    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, QbitError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(hash)
            .map(|names| {
                names
                    .iter()
                    .map(|name| TorrentFile { name: name.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_tags(&self, hashes: &[String], tag: &str) -> Result<(), QbitError> {
        if self.fail_add_tags {
            return Err(QbitError::AuthFailed);
        }

        let mut state = self.state.lock().unwrap();
        for torrent in state.torrents.iter_mut() {
            if hashes.contains(&torrent.hash) {
                if torrent.tags.is_empty() {
                    torrent.tags = tag.to_string();
                } else {
                    torrent.tags = format!("{},{}", torrent.tags, tag);
                }
            }
        }
        Ok(())
    }

    async fn remove_tags(&self, hashes: &[String], tag: &str) -> Result<(), QbitError> {
        let mut state = self.state.lock().unwrap();
        for torrent in state.torrents.iter_mut() {
            if hashes.contains(&torrent.hash) {
                torrent.tags = torrent
                    .tags
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty() && *t != tag)
                    .collect::<Vec<_>>()
                    .join(",");
            }
        }
        Ok(())
    }

    async fn set_category(&self, hashes: &[String], category: &str) -> Result<(), QbitError> {
        let mut state = self.state.lock().unwrap();
        for torrent in state.torrents.iter_mut() {
            if hashes.contains(&torrent.hash) {
                torrent.category = category.to_string();
            }
        }
        Ok(())
    }
}

/// Catalog test double: an ASIN -> metadata mapping plus canned title
/// search results
#[derive(Default)]
pub struct MockCatalog {
    books: HashMap<String, BookMetadata>,
    searches: HashMap<String, Vec<String>>,
}

impl MockCatalog {
    pub fn add_book(&mut self, md: BookMetadata) {
        self.books.insert(md.asin.clone(), md);
    }

    pub fn add_search(&mut self, title: &str, asins: &[&str]) {
        self.searches
            .insert(title.to_string(), asins.iter().map(|s| s.to_string()).collect());
    }
}

#[async_trait]
impl AudibleCatalog for MockCatalog {
    async fn lookup_by_asin(&self, asin: &str) -> Result<BookMetadata, CatalogError> {
        self.books
            .get(asin)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(asin.to_string()))
    }

    async fn search_by_title(
        &self,
        title: &str,
        _author: Option<&str>,
    ) -> Result<Vec<String>, CatalogError> {
        Ok(self.searches.get(title).cloned().unwrap_or_default())
    }
}

/// Catalog whose calls never complete, for shutdown behavior tests
pub struct StalledCatalog;

#[async_trait]
impl AudibleCatalog for StalledCatalog {
    async fn lookup_by_asin(&self, _asin: &str) -> Result<BookMetadata, CatalogError> {
        std::future::pending().await
    }

    async fn search_by_title(
        &self,
        _title: &str,
        _author: Option<&str>,
    ) -> Result<Vec<String>, CatalogError> {
        std::future::pending().await
    }
}

/// Tag reader that returns the same TagSet for every file
pub struct StaticTagReader {
    tags: TagSet,
}

impl StaticTagReader {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StaticTagReader {
            tags: TagSet::from_raw(&raw),
        }
    }
}

#[async_trait]
impl TagReader for StaticTagReader {
    async fn read(&self, _path: &Path, _cancel: &CancellationToken) -> Result<TagSet, ProbeError> {
        Ok(self.tags.clone())
    }
}
