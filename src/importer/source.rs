// Classification of a torrent's file list by audio format. Extension
// matching is case-sensitive; anything unrecognized is ignored.

use crate::importer::paths::MappedFile;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    M4b,
    Mp3,
    /// Both .m4b and .mp3 files present; the m4b release wins
    Mixed,
    Unknown,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceType::M4b => "M4B",
            SourceType::Mp3 => "MP3",
            SourceType::Mixed => "M4B and MP3",
            SourceType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// The partition of a file list into recognized audio files
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub m4b_files: Vec<MappedFile>,
    pub mp3_files: Vec<MappedFile>,
    pub source_type: SourceType,
}

impl SourceInfo {
    /// Classify a file list. Total: empty or unrecognized input yields
    /// `Unknown`.
    pub fn classify(files: &[MappedFile]) -> SourceInfo {
        let mut m4b_files = Vec::new();
        let mut mp3_files = Vec::new();

        for file in files {
            match Path::new(&file.base_name).extension().and_then(|e| e.to_str()) {
                Some("m4b") => m4b_files.push(file.clone()),
                Some("mp3") => mp3_files.push(file.clone()),
                _ => {}
            }
        }

        let source_type = match (!m4b_files.is_empty(), !mp3_files.is_empty()) {
            (true, true) => SourceType::Mixed,
            (true, false) => SourceType::M4b,
            (false, true) => SourceType::Mp3,
            (false, false) => SourceType::Unknown,
        };

        SourceInfo {
            m4b_files,
            mp3_files,
            source_type,
        }
    }

    /// The single audio file tags are read from. None for `Unknown`.
    pub fn representative(&self) -> Option<&MappedFile> {
        match self.source_type {
            SourceType::M4b | SourceType::Mixed => self.m4b_files.first(),
            SourceType::Mp3 => self.mp3_files.first(),
            SourceType::Unknown => None,
        }
    }
}
