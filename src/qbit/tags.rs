// Tag-multiset helpers. The importer uses the torrent client's tag set as
// its journal: a torrent carrying the imported tag is terminal regardless of
// what else it carries.

use crate::qbit::{QbitError, Torrent, TorrentGateway};
use std::collections::HashSet;

/// Parse the comma-joined wire format into a tag set
///
/// qBittorrent joins with ", " in some responses, so entries are trimmed.
pub fn tag_set(tags: &str) -> HashSet<String> {
    tags.split(',')
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Torrents partitioned by whether they carry a tag
#[derive(Debug, Default)]
pub struct FilteredTorrents {
    pub filtered: Vec<Torrent>,
    pub remaining: Vec<Torrent>,
}

pub fn filter_by_tag(torrents: Vec<Torrent>, tag: &str) -> FilteredTorrents {
    let mut result = FilteredTorrents::default();

    for torrent in torrents {
        if tag_set(&torrent.tags).contains(tag) {
            result.filtered.push(torrent);
        } else {
            result.remaining.push(torrent);
        }
    }

    result
}

/// List torrents in a category that carry neither terminal tag, in the order
/// the client returned them.
///
/// A torrent carrying the imported tag is excluded even if it also carries
/// the manual-intervention tag: imported is absorbing.
pub async fn get_unimported_in_category(
    gateway: &dyn TorrentGateway,
    category: &str,
    imported_tag: &str,
    manual_intervention_tag: &str,
) -> Result<Vec<Torrent>, QbitError> {
    let torrents = gateway.list_by_category(category).await?;

    Ok(torrents
        .into_iter()
        .filter(|torrent| {
            let tags = tag_set(&torrent.tags);
            !tags.contains(imported_tag) && !tags.contains(manual_intervention_tag)
        })
        .collect())
}

/// List torrents in a category that are waiting on a human
pub async fn get_manual_intervention_in_category(
    gateway: &dyn TorrentGateway,
    category: &str,
    manual_intervention_tag: &str,
) -> Result<Vec<Torrent>, QbitError> {
    let torrents = gateway.list_by_category(category).await?;

    Ok(filter_by_tag(torrents, manual_intervention_tag).filtered)
}
