// Embedded tag extraction via ffprobe. Container-level tags win; the first
// audio stream's tags are the fallback. A file with no tags at all yields an
// empty TagSet rather than an error.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const AUDIBLE_ASIN_URL_PREFIX: &str = "http://www.audible.com/pd/";

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run ffprobe: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffprobe failed for {path}: {stderr}")]
    Failed { path: String, stderr: String },
    #[error("Failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Probe canceled")]
    Canceled,
}

/// The small set of embedded tags the importer cares about
///
/// All fields are optional. `AUDIBLE_ASIN` values are normalized on
/// construction: some MP3 taggers store the full Audible product URL instead
/// of the bare ASIN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet {
    title: Option<String>,
    artist: Option<String>,
    audible_asin: Option<String>,
}

impl TagSet {
    /// Build a TagSet from a raw tag mapping, matching keys
    /// case-insensitively
    pub fn from_raw(tags: &HashMap<String, String>) -> Self {
        let lookup = |wanted: &str| {
            tags.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
                .map(|(_, value)| value.clone())
        };

        let audible_asin = lookup("AUDIBLE_ASIN").map(|value| {
            value
                .strip_prefix(AUDIBLE_ASIN_URL_PREFIX)
                .map(str::to_string)
                .unwrap_or(value)
        });

        TagSet {
            title: lookup("title"),
            artist: lookup("artist"),
            audible_asin,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn audible_asin(&self) -> Option<&str> {
        self.audible_asin.as_deref()
    }
}

/// Trait for reading embedded tags from an audio file (allows mocking for
/// tests)
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read(&self, path: &Path, cancel: &CancellationToken) -> Result<TagSet, ProbeError>;
}

/// Production tag reader that shells out to ffprobe
pub struct FfprobeTagReader;

#[async_trait]
impl TagReader for FfprobeTagReader {
    async fn read(&self, path: &Path, cancel: &CancellationToken) -> Result<TagSet, ProbeError> {
        let mut command = Command::new("ffprobe");
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .kill_on_drop(true);

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Canceled),
            output = command.output() => output?,
        };

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: path.display().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        let tags = parse_probe_tags(&json);

        debug!(path = %path.display(), ?tags, "ffprobe tags");

        Ok(tags)
    }
}

/// Extract the winning tag mapping from ffprobe JSON: format-level tags
/// first, then the first audio stream's tags
fn parse_probe_tags(json: &Value) -> TagSet {
    if let Some(tags) = tag_object(json.get("format").and_then(|f| f.get("tags"))) {
        return TagSet::from_raw(&tags);
    }

    let streams = json.get("streams").and_then(|s| s.as_array());
    let audio_stream = streams.and_then(|streams| {
        streams
            .iter()
            .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"))
            .or_else(|| streams.first())
    });

    if let Some(tags) = tag_object(audio_stream.and_then(|s| s.get("tags"))) {
        return TagSet::from_raw(&tags);
    }

    TagSet::default()
}

fn tag_object(value: Option<&Value>) -> Option<HashMap<String, String>> {
    let object = value?.as_object()?;
    if object.is_empty() {
        return None;
    }

    let mut tags = HashMap::new();
    for (key, value) in object {
        if let Some(v) = value.as_str() {
            tags.insert(key.clone(), v.to_string());
        }
    }

    Some(tags)
}
