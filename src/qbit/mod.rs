// Narrow adapter over the qBittorrent Web API. The importer only needs to
// list torrents and their files, and to move torrents between tag states.

pub mod client;
pub mod tags;

pub use client::QbitClient;
pub use tags::{
    filter_by_tag, get_manual_intervention_in_category, get_unimported_in_category, tag_set,
    FilteredTorrents,
};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QbitError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("qBittorrent authentication failed")]
    AuthFailed,
    #[error("qBittorrent returned status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// A torrent as reported by qBittorrent
///
/// `tags` is the wire format: a comma-joined string. `save_path` and
/// `content_path` are in the torrent client's view of the filesystem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Torrent {
    pub hash: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub content_path: String,
}

/// One file inside a torrent. `name` is relative to the torrent's save path
/// and may contain subdirectories.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentFile {
    pub name: String,
}

/// Abstraction over the torrent client (allows mocking for tests)
#[async_trait]
pub trait TorrentGateway: Send + Sync {
    /// List torrents in a category. An empty category string means no
    /// filter.
    async fn list_by_category(&self, category: &str) -> Result<Vec<Torrent>, QbitError>;

    /// List the files of a torrent by hash
    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, QbitError>;

    /// Add a single tag to the given torrents
    async fn add_tags(&self, hashes: &[String], tag: &str) -> Result<(), QbitError>;

    /// Remove a single tag from the given torrents
    async fn remove_tags(&self, hashes: &[String], tag: &str) -> Result<(), QbitError>;

    /// Move the given torrents to a category
    async fn set_category(&self, hashes: &[String], category: &str) -> Result<(), QbitError>;
}
