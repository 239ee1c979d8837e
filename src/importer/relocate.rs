// Relocation into the library. Hard links keep seeding intact when the
// library shares a filesystem with the download root; the copy fallback is
// unconditional so cross-filesystem setups degrade gracefully.

use crate::metadata::{opf, BookMetadata};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Source path missing: {0}")]
    SourceMissing(PathBuf),
    #[error("Destination not writable: {path}: {source}")]
    DestinationUnwritable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Hard link and copy both failed for {path}: {detail}")]
    LinkAndCopyBothFailed { path: PathBuf, detail: String },
    #[error("Failed to write metadata.opf sidecar: {0}")]
    SidecarWriteFailed(#[source] std::io::Error),
}

/// Relocate a torrent's content (file or directory) into `dest_dir`.
///
/// Not idempotent across crashes: re-running against an already-populated
/// destination may fail, and the caller routes that failure to manual
/// intervention.
pub async fn move_into_library(source: &Path, dest_dir: &Path) -> Result<(), RelocateError> {
    let source_meta = tokio::fs::metadata(source)
        .await
        .map_err(|_| RelocateError::SourceMissing(source.to_path_buf()))?;

    if source_meta.is_dir() {
        link_tree(source, dest_dir).await
    } else {
        link_file(source, dest_dir).await
    }
}

/// Write the metadata.opf sidecar into the destination directory
pub async fn write_sidecar(md: &BookMetadata, dest_dir: &Path) -> Result<(), RelocateError> {
    opf::write_opf(md, &dest_dir.join("metadata.opf"))
        .await
        .map_err(RelocateError::SidecarWriteFailed)
}

/// Hard-link a directory tree into the library, falling back to a full
/// recursive copy
async fn link_tree(source: &Path, dest_dir: &Path) -> Result<(), RelocateError> {
    info!(source = %source.display(), destination = %dest_dir.display(), "Linking directory into library");

    let link_detail = match run_cp(&["-al"], source, dest_dir).await {
        Ok(()) => return Ok(()),
        Err(detail) => detail,
    };

    warn!(detail = %link_detail, "Hard link failed, falling back to recursive copy");

    match run_cp(&["-r"], source, dest_dir).await {
        Ok(()) => Ok(()),
        Err(copy_detail) => Err(RelocateError::LinkAndCopyBothFailed {
            path: source.to_path_buf(),
            detail: format!("link: {link_detail}; copy: {copy_detail}"),
        }),
    }
}

async fn run_cp(flags: &[&str], source: &Path, dest: &Path) -> Result<(), String> {
    let output = Command::new("cp")
        .args(flags)
        .arg(source)
        .arg(dest)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| err.to_string())?;

    if output.status.success() {
        return Ok(());
    }

    Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
}

/// Hard-link a single file into the library, falling back to a byte-wise
/// copy
async fn link_file(source: &Path, dest_dir: &Path) -> Result<(), RelocateError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|err| RelocateError::DestinationUnwritable {
            path: dest_dir.to_path_buf(),
            source: err,
        })?;

    let base_name = source.file_name().unwrap_or(source.as_os_str());
    let destination = dest_dir.join(base_name);

    info!(source = %source.display(), destination = %destination.display(), "Copying file into library");

    let link_err = match tokio::fs::hard_link(source, &destination).await {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    warn!(error = %link_err, "Hard link failed, falling back to copy");

    match tokio::fs::copy(source, &destination).await {
        Ok(_) => Ok(()),
        Err(copy_err) => Err(RelocateError::LinkAndCopyBothFailed {
            path: source.to_path_buf(),
            detail: format!("link: {link_err}; copy: {copy_err}"),
        }),
    }
}
