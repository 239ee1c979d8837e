// Translation between the torrent client's view of the filesystem and this
// process's view. Pure string/path work; nothing here touches the disk.

use crate::qbit::{Torrent, TorrentFile};
use std::path::{Path, PathBuf};

/// A torrent file with its importer-visible location
#[derive(Debug, Clone, PartialEq)]
pub struct MappedFile {
    /// The torrent client's relative name, which may contain subdirectories
    pub base_name: String,
    pub local_path: PathBuf,
}

/// Maps paths under the configured remote download root onto the local
/// download root
#[derive(Debug, Clone)]
pub struct PathMapper {
    remote_download_path: String,
    local_download_path: PathBuf,
}

impl PathMapper {
    pub fn new(remote_download_path: impl Into<String>, local_download_path: impl Into<PathBuf>) -> Self {
        PathMapper {
            remote_download_path: remote_download_path.into(),
            local_download_path: local_download_path.into(),
        }
    }

    /// Map the torrent's content path (its root file or directory) to a
    /// local path
    pub fn map_content_path(&self, torrent: &Torrent) -> PathBuf {
        self.map_remote(&torrent.content_path)
    }

    /// Map the torrent's save path to a local path
    pub fn map_save_path(&self, torrent: &Torrent) -> PathBuf {
        self.map_remote(&torrent.save_path)
    }

    /// Map every file of a torrent, preserving the client's relative names
    pub fn map_files(&self, torrent: &Torrent, files: &[TorrentFile]) -> Vec<MappedFile> {
        let local_save_path = self.map_save_path(torrent);

        files
            .iter()
            .map(|file| MappedFile {
                base_name: file.name.clone(),
                local_path: join_relative(&local_save_path, &file.name),
            })
            .collect()
    }

    fn map_remote(&self, remote_path: &str) -> PathBuf {
        let prefix = self.remote_download_path.trim_end_matches('/');

        let relative = remote_path.strip_prefix(prefix).unwrap_or(remote_path);

        join_relative(&self.local_download_path, relative)
    }
}

/// Join a possibly slash-prefixed fragment under a base directory without
/// letting PathBuf::join treat it as absolute
fn join_relative(base: &Path, fragment: &str) -> PathBuf {
    base.join(fragment.trim_start_matches('/'))
}
