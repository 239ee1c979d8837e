// # Audiobook Import Pipeline
//
// One sweep asks the torrent client for finished-but-unimported torrents per
// configured category, then runs each through extract -> resolve ->
// relocate. Terminal outcomes are journaled on the torrent itself as tags:
// `imported` on success, `manual-intervention` on failure. A torrent that
// fails before either tag lands is simply retried on the next sweep.

pub mod paths;
pub mod relocate;
pub mod resolver;
pub mod source;

pub use paths::{MappedFile, PathMapper};
pub use resolver::{MetadataResolver, ResolveError};
pub use source::{SourceInfo, SourceType};

use crate::audible::AudibleCatalog;
use crate::config::{find_library_by_name, ImportType, ImportersConfig, Library};
use crate::metadata::probe::{ProbeError, TagReader};
use crate::metadata::BookMetadata;
use crate::notifications::{
    DiscordEmbed, DiscordEmbedField, DiscordWebhookMessage, Notifications,
};
use crate::qbit::{self, QbitError, Torrent, TorrentGateway};
use relocate::RelocateError;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const NOTIFICATION_USERNAME: &str = "Shelfwright Audiobook Importer";
const SUCCESS_COLOR: u32 = 0x00FF00;
const MANUAL_INTERVENTION_COLOR: u32 = 0xFFA500;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No audio files in torrent")]
    NoAudioFiles,
    #[error("Failed to read tags: {0}")]
    Probe(ProbeError),
    #[error("Failed to resolve book identity: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Failed to relocate into library: {0}")]
    Relocate(#[from] RelocateError),
    #[error("Torrent client error: {0}")]
    Gateway(#[from] QbitError),
    #[error("Unknown library: {0}")]
    UnknownLibrary(String),
    #[error("Sweep canceled")]
    Canceled,
}

/// The importer, wired up with its collaborators at construction time
pub struct AudiobookImporter {
    gateway: Arc<dyn TorrentGateway>,
    tag_reader: Arc<dyn TagReader>,
    resolver: MetadataResolver,
    notifications: Arc<Notifications>,
    paths: PathMapper,
    config: ImportersConfig,
}

impl AudiobookImporter {
    /// Wire up the importer, rejecting any import type whose library name
    /// does not resolve so the misconfiguration surfaces at startup
    pub fn new(
        gateway: Arc<dyn TorrentGateway>,
        catalog: Arc<dyn AudibleCatalog>,
        tag_reader: Arc<dyn TagReader>,
        notifications: Arc<Notifications>,
        paths: PathMapper,
        config: ImportersConfig,
    ) -> Result<Self, ImportError> {
        for import_type in &config.audiobooks.import_types {
            if find_library_by_name(&config.audiobooks.libraries, &import_type.library).is_none() {
                return Err(ImportError::UnknownLibrary(import_type.library.clone()));
            }
        }

        Ok(AudiobookImporter {
            gateway,
            tag_reader,
            resolver: MetadataResolver::new(catalog),
            notifications,
            paths,
            config,
        })
    }

    /// Run one sweep over every configured import type.
    ///
    /// A single torrent's failure never aborts the sweep; it is journaled on
    /// the torrent and the sweep moves on.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<(), ImportError> {
        info!("Running audiobook import sweep");

        for import_type in &self.config.audiobooks.import_types {
            info!(category = %import_type.category, "Processing import type");

            let library = find_library_by_name(
                &self.config.audiobooks.libraries,
                &import_type.library,
            )
            .ok_or_else(|| ImportError::UnknownLibrary(import_type.library.clone()))?;

            self.process_import_type(import_type, library, cancel).await?;
        }

        Ok(())
    }

    async fn process_import_type(
        &self,
        import_type: &ImportType,
        library: &Library,
        cancel: &CancellationToken,
    ) -> Result<(), ImportError> {
        let torrents = cancellable(
            cancel,
            qbit::get_unimported_in_category(
                self.gateway.as_ref(),
                &import_type.category,
                &self.config.imported_tag,
                &self.config.manual_intervention_tag,
            ),
        )
        .await??;

        for torrent in &torrents {
            if cancel.is_cancelled() {
                return Err(ImportError::Canceled);
            }

            info!(name = %torrent.name, hash = %torrent.hash, "Found unimported torrent");
            self.import_one(torrent, import_type, library, cancel).await;
        }

        Ok(())
    }

    /// Import a single torrent end to end, leaving it carrying exactly one
    /// terminal tag unless the tagging call itself failed
    pub async fn import_one(
        &self,
        torrent: &Torrent,
        import_type: &ImportType,
        library: &Library,
        cancel: &CancellationToken,
    ) {
        let md = match self.try_import(torrent, library, cancel).await {
            Ok(md) => md,
            Err(ImportError::Canceled) => {
                // Untagged; the next sweep picks it up again
                info!(name = %torrent.name, hash = %torrent.hash, "Import canceled before tagging");
                return;
            }
            Err(err) => {
                error!(name = %torrent.name, hash = %torrent.hash, error = %err, "Import failed");
                self.mark_for_manual_intervention(torrent, import_type, &err.to_string(), cancel)
                    .await;
                return;
            }
        };

        if !self.mark_as_imported(torrent).await {
            // Tagging failed; stay untagged and retry next sweep
            return;
        }

        self.send_success_notification(&md, import_type, cancel).await;
    }

    /// extract -> resolve -> relocate. Any error here routes the torrent to
    /// manual intervention; cancellation leaves it untagged.
    async fn try_import(
        &self,
        torrent: &Torrent,
        library: &Library,
        cancel: &CancellationToken,
    ) -> Result<BookMetadata, ImportError> {
        // extract
        let files = cancellable(cancel, self.gateway.list_files(&torrent.hash)).await??;
        let mapped = self.paths.map_files(torrent, &files);
        let source_info = SourceInfo::classify(&mapped);
        let representative = source_info
            .representative()
            .ok_or(ImportError::NoAudioFiles)?;

        info!(
            name = %torrent.name,
            source_type = %source_info.source_type,
            representative = %representative.local_path.display(),
            "Source analysis complete"
        );

        let tags = self
            .tag_reader
            .read(&representative.local_path, cancel)
            .await
            .map_err(|err| match err {
                ProbeError::Canceled => ImportError::Canceled,
                other => ImportError::Probe(other),
            })?;

        // resolve
        let md = cancellable(cancel, self.resolver.resolve(&tags)).await??;

        // relocate
        let dir_name = sanitize_name(&md.directory_name());
        let destination = library.path.join(&dir_name);
        let local_content_path = self.paths.map_content_path(torrent);

        cancellable(
            cancel,
            relocate::move_into_library(&local_content_path, &destination),
        )
        .await??;
        cancellable(cancel, relocate::write_sidecar(&md, &destination)).await??;

        info!(
            name = %torrent.name,
            destination = %destination.display(),
            "Successfully imported audiobook"
        );

        Ok(md)
    }

    /// Apply the absorbing `imported` tag, then clean up a stale
    /// manual-intervention tag from a previous run. Add-before-remove: a
    /// crash in between leaves both tags, and the unimported filter treats
    /// that as imported.
    ///
    /// Not raced against cancellation: once relocation succeeded the
    /// journal write must land or the next sweep would repeat the import.
    async fn mark_as_imported(&self, torrent: &Torrent) -> bool {
        let hashes = vec![torrent.hash.clone()];

        if let Err(err) = self
            .gateway
            .add_tags(&hashes, &self.config.imported_tag)
            .await
        {
            error!(name = %torrent.name, hash = %torrent.hash, error = %err, "Failed to mark as imported");
            return false;
        }

        info!(name = %torrent.name, hash = %torrent.hash, "Marked torrent as imported");

        if qbit::tag_set(&torrent.tags).contains(&self.config.manual_intervention_tag) {
            if let Err(err) = self
                .gateway
                .remove_tags(&hashes, &self.config.manual_intervention_tag)
                .await
            {
                error!(name = %torrent.name, hash = %torrent.hash, error = %err, "Failed to remove stale manual intervention tag");
            }
        }

        true
    }

    async fn mark_for_manual_intervention(
        &self,
        torrent: &Torrent,
        import_type: &ImportType,
        reason: &str,
        cancel: &CancellationToken,
    ) {
        let hashes = vec![torrent.hash.clone()];

        if let Err(err) = self
            .gateway
            .add_tags(&hashes, &self.config.manual_intervention_tag)
            .await
        {
            error!(name = %torrent.name, hash = %torrent.hash, error = %err, "Failed to add manual intervention tag");
            return;
        }

        info!(name = %torrent.name, hash = %torrent.hash, reason = %reason, "Marked torrent for manual intervention");

        if let Some(notifier) = &import_type.notifier {
            let message = manual_intervention_message(torrent, reason);
            // Best-effort: the tag already landed, so a cancelled delivery
            // is just skipped
            let _ = cancellable(cancel, self.notifications.send(notifier, &message)).await;
        }
    }

    async fn send_success_notification(
        &self,
        md: &BookMetadata,
        import_type: &ImportType,
        cancel: &CancellationToken,
    ) {
        let Some(notifier) = &import_type.notifier else {
            return;
        };

        let message = success_message(md);
        let _ = cancellable(cancel, self.notifications.send(notifier, &message)).await;
    }
}

/// Race a pipeline stage against cancellation so a hung outbound call never
/// blocks shutdown
async fn cancellable<T>(
    cancel: &CancellationToken,
    stage: impl Future<Output = T>,
) -> Result<T, ImportError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ImportError::Canceled),
        out = stage => Ok(out),
    }
}

/// Slashes would split the directory name; everything else is left to the
/// filesystem
pub fn sanitize_name(name: &str) -> String {
    name.replace('/', "-")
}

fn success_message(md: &BookMetadata) -> DiscordWebhookMessage {
    let mut description = format!("**{}**", md.title);
    if let Some(series) = &md.primary_series {
        description.push_str(&format!(" - {}", series.name));
        if let Some(position) = &series.position {
            description.push_str(&format!(" - Book {position}"));
        }
    }

    let author_names: Vec<&str> = md.authors.iter().map(|a| a.name.as_str()).collect();

    let mut fields = vec![DiscordEmbedField {
        name: "Author(s)".to_string(),
        value: author_names.join(", "),
        inline: false,
    }];

    if let Some(series) = &md.primary_series {
        let mut series_str = series.name.clone();
        if let Some(position) = &series.position {
            series_str.push_str(&format!(" - Book {position}"));
        }
        fields.push(DiscordEmbedField {
            name: "Series".to_string(),
            value: series_str,
            inline: true,
        });
    }

    let audible_url = format!("https://www.audible.com/pd/{}", md.asin);
    fields.push(DiscordEmbedField {
        name: "Audible".to_string(),
        value: format!("[View on Audible]({audible_url})"),
        inline: true,
    });

    DiscordWebhookMessage {
        username: NOTIFICATION_USERNAME.to_string(),
        embeds: vec![DiscordEmbed {
            title: "🎧 New Audiobook Imported".to_string(),
            description,
            color: SUCCESS_COLOR,
            fields,
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn manual_intervention_message(torrent: &Torrent, reason: &str) -> DiscordWebhookMessage {
    DiscordWebhookMessage {
        username: NOTIFICATION_USERNAME.to_string(),
        embeds: vec![DiscordEmbed {
            title: "⚠️ Manual Intervention Required".to_string(),
            description: format!("Audiobook **{}** requires manual intervention", torrent.name),
            color: MANUAL_INTERVENTION_COLOR,
            fields: vec![
                DiscordEmbedField {
                    name: "Reason".to_string(),
                    value: reason.to_string(),
                    inline: false,
                },
                DiscordEmbedField {
                    name: "Torrent Hash".to_string(),
                    value: torrent.hash.clone(),
                    inline: true,
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Person, Series};

    #[test]
    fn sanitize_replaces_every_slash() {
        assert_eq!(sanitize_name("X/Y"), "X-Y");
        assert_eq!(sanitize_name("a/b/c"), "a-b-c");
        assert_eq!(sanitize_name("plain"), "plain");
    }

    #[test]
    fn success_message_includes_series_and_audible_link() {
        let md = BookMetadata {
            asin: "B001".to_string(),
            title: "Foo".to_string(),
            authors: vec![
                Person {
                    name: "Alice".to_string(),
                    asin: None,
                },
                Person {
                    name: "Bob".to_string(),
                    asin: None,
                },
            ],
            primary_series: Some(Series {
                name: "S".to_string(),
                asin: None,
                position: Some("2".to_string()),
            }),
            ..Default::default()
        };

        let message = success_message(&md);
        let embed = &message.embeds[0];
        assert_eq!(embed.description, "**Foo** - S - Book 2");
        assert_eq!(embed.fields[0].value, "Alice, Bob");
        assert_eq!(embed.fields[1].value, "S - Book 2");
        assert!(embed.fields[2].value.contains("https://www.audible.com/pd/B001"));
    }

    #[test]
    fn manual_intervention_message_carries_reason_and_hash() {
        let torrent = Torrent {
            hash: "f".repeat(40),
            name: "Some.Book".to_string(),
            ..Default::default()
        };

        let message = manual_intervention_message(&torrent, "No audio files in torrent");
        let embed = &message.embeds[0];
        assert!(embed.description.contains("Some.Book"));
        assert_eq!(embed.fields[0].value, "No audio files in torrent");
        assert_eq!(embed.fields[1].value, "f".repeat(40));
    }
}
