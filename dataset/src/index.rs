//! Incremental indexing of a datasets directory.

use std::path::{Path, PathBuf};

use database::{models::AudioFile, Session};
use tracing::{debug, info, instrument, trace};
use walkdir::WalkDir;

use crate::{decoder::DurationProbe, Error};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// File name suffixes that mark audio files, matched case-sensitively.
    pub extensions: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".wav".to_string(), ".m4a".to_string()],
        }
    }
}

impl SyncOptions {
    /// Adds another recognized extension; a missing leading dot is added.
    pub fn with_extension(mut self, extension: &str) -> Self {
        let extension = match extension.starts_with('.') {
            true => extension.to_string(),
            false => format!(".{extension}"),
        };
        if !self.extensions.contains(&extension) {
            self.extensions.push(extension);
        }
        self
    }

    fn is_audio(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Audio files found under the root.
    pub found: usize,
    pub inserted: usize,
    /// Already indexed under the same name.
    pub skipped: usize,
}

/// Indexes every audio file under `root` that is not indexed yet.
///
/// Existing names are loaded once, new files are measured with `probe`, and
/// everything new is inserted in bulk before the session is committed. The
/// first file `probe` cannot measure aborts the sync and nothing is written.
#[instrument(skip(session, probe, options), level = "trace")]
pub async fn sync<P: DurationProbe>(
    mut session: Session,
    root: &Path,
    probe: &P,
    options: &SyncOptions,
) -> Result<SyncReport, Error> {
    let candidates = scan(root, options)?;
    info!(n_files = candidates.len(), root = %root.display(), "found audio files");

    let existing = session.audio_file_names().await?;
    debug!(n_indexed = existing.len(), "loaded indexed names");

    let mut staged = Vec::new();
    let mut skipped = 0;
    for (name, path) in &candidates {
        if existing.contains(name) {
            trace!(%name, "already indexed");
            skipped += 1;
            continue;
        }

        let duration = probe.duration(path).map_err(|source| Error::Decoder {
            path: path.clone(),
            source,
        })?;
        trace!(%name, duration, "measured");
        staged.push(AudioFile::new(name.clone(), duration));
    }

    session.insert_audio_files(&staged).await?;
    session.commit().await?;

    let report = SyncReport {
        found: candidates.len(),
        inserted: staged.len(),
        skipped,
    };
    info!(?report, "sync complete");

    Ok(report)
}

/// Audio files under `root` as `(name, path)` pairs sorted by name, where
/// `name` is the `/`-separated path relative to `root`.
///
/// Symlinks to files are listed under the link's own name. Symlinked
/// directories are not descended into and dangling links are ignored.
pub fn scan(root: &Path, options: &SyncOptions) -> Result<Vec<(String, PathBuf)>, Error> {
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        let file_type = entry.file_type();
        // `Path::is_file` follows the link
        if !(file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())) {
            continue;
        }
        if !options.is_audio(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.into_path();
        files.push((relative_name(root, &path), path));
    }
    files.sort();

    Ok(files)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
