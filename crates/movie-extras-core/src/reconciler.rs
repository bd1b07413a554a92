use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::candidate::Candidate;
use crate::error::Error;
use crate::extra_config::ExtraTypeConfig;
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::retriever::{DownloadOptions, RetrievalError, RetrievalKind, VideoRetriever};
use crate::retry::RetryPolicy;
use crate::scanner::{Collision, FileSystemSnapshot};
use crate::storage::models::{DownloadRecord, ExtraType, FolderRecord};

/// Fixed file name for theme music, placed next to the media.
pub const THEME_FILE_NAME: &str = "theme.mp3";

/// Only these become the theme file; thumbnails and subtitles are left behind.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "opus", "ogg", "flac", "wma", "wav"];

/// What one reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Source ids retrieved into scratch, in download order.
    pub retrieved: Vec<String>,
    /// Files moved into the folder and recorded.
    pub placed: usize,
    /// Files dropped as duplicates or collisions.
    pub discarded: usize,
    /// The retrieval tool got no data at all; the pass stopped early.
    pub aborted: bool,
}

/// Downloads selected candidates into scratch, then merges them into the
/// folder, dropping anything byte-identical or colliding with what is there.
pub struct DownloadReconciler<'a> {
    retriever: &'a dyn VideoRetriever,
    scratch_dir: PathBuf,
    retry: RetryPolicy,
}

enum DownloadResult {
    Retrieved,
    GaveUp,
    NoData,
}

impl<'a> DownloadReconciler<'a> {
    pub fn new(retriever: &'a dyn VideoRetriever, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            retriever,
            scratch_dir: scratch_dir.into(),
            retry: RetryPolicy::download_default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn reconcile(
        &self,
        selection: &[Candidate],
        config: &ExtraTypeConfig,
        force: bool,
        record: &mut FolderRecord,
        snapshot: &mut FileSystemSnapshot,
        reporter: &dyn ProgressReporter,
    ) -> Result<ReconcileOutcome, Error> {
        let mut outcome = ReconcileOutcome::default();
        let options = config.downloading.download_options();
        let wanted = config.downloading.videos_to_download;
        let mut attempted = HashSet::new();
        let mut scratch_dirs = Vec::new();

        for candidate in selection {
            if outcome.retrieved.len() >= wanted {
                break;
            }
            if !attempted.insert(candidate.id.as_str()) {
                continue;
            }
            if !force && record.has_download_source(&candidate.id) {
                info!("Already downloaded {}, skipping", candidate.url);
                continue;
            }

            let dest = self.scratch_dir.join(&candidate.id);
            fs::create_dir_all(&dest)?;

            reporter.on_download_start(&candidate.url);
            let result = self.download_with_retry(candidate, &options, &dest);
            reporter.on_download_complete(&candidate.url, matches!(result, DownloadResult::Retrieved));

            match result {
                DownloadResult::Retrieved => {
                    outcome.retrieved.push(candidate.id.clone());
                    scratch_dirs.push((candidate, dest));
                }
                DownloadResult::GaveUp => remove_scratch(&dest),
                DownloadResult::NoData => {
                    error!(
                        "No data received for {}, aborting {} downloads for '{}'",
                        candidate.url, config.extra_type, record.name
                    );
                    remove_scratch(&dest);
                    outcome.aborted = true;
                    break;
                }
            }
        }

        for (candidate, dir) in scratch_dirs {
            self.place_files(candidate, &dir, force, record, snapshot, &mut outcome)?;
            remove_scratch(&dir);
        }

        info!(
            "{} for '{}': {} retrieved, {} placed, {} discarded",
            config.extra_type,
            record.name,
            outcome.retrieved.len(),
            outcome.placed,
            outcome.discarded
        );
        Ok(outcome)
    }

    fn download_with_retry(
        &self,
        candidate: &Candidate,
        options: &DownloadOptions,
        dest: &Path,
    ) -> DownloadResult {
        for attempt in 1..=self.retry.attempts {
            match self.retriever.download(&candidate.url, options, dest) {
                Ok(()) => return DownloadResult::Retrieved,
                Err(RetrievalError {
                    kind: RetrievalKind::NoData,
                    ..
                }) => return DownloadResult::NoData,
                Err(e) if e.kind == RetrievalKind::Unavailable => {
                    warn!("Failed to download {}: {}", candidate.url, e.message);
                    return DownloadResult::GaveUp;
                }
                Err(e) => {
                    warn!(
                        "Failed to download {} (attempt {}/{}): {}",
                        candidate.url, attempt, self.retry.attempts, e.message
                    );
                    if attempt < self.retry.attempts {
                        self.retry.pause();
                    }
                }
            }
        }
        error!("Giving up on {}", candidate.url);
        DownloadResult::GaveUp
    }

    fn place_files(
        &self,
        candidate: &Candidate,
        dir: &Path,
        force: bool,
        record: &mut FolderRecord,
        snapshot: &mut FileSystemSnapshot,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), Error> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for source in files {
            let downloaded_name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if candidate.extra_type == ExtraType::ThemeMusic && !is_audio(&source) {
                debug!("Ignoring {} from theme music download", downloaded_name);
                continue;
            }
            let (subdirectory, file_name) = match candidate.extra_type {
                ExtraType::ThemeMusic => (None, THEME_FILE_NAME.to_string()),
                extra_type => (Some(extra_type.dir_name()), downloaded_name),
            };
            let relative_path = match subdirectory {
                Some(subdirectory) => Path::new(subdirectory).join(&file_name),
                None => PathBuf::from(&file_name),
            };

            let hash = hasher::hash_file(&source)?;

            if record.has_download_hash(&hash) {
                debug!("{} duplicates an earlier download, removing", file_name);
                fs::remove_file(&source)?;
                outcome.discarded += 1;
                continue;
            }

            if let Some(collision) = snapshot.collision(&file_name, &hash) {
                if !force {
                    info!(
                        "{} collides with an existing file ({:?}), removing",
                        file_name, collision
                    );
                    fs::remove_file(&source)?;
                    outcome.discarded += 1;
                    continue;
                }
                if collision == Collision::Name {
                    debug!("Overwriting {}", relative_path.display());
                }
            }

            move_file(&source, &record.full_path.join(&relative_path))?;
            snapshot.insert(subdirectory, &file_name, &hash);
            record.downloads.push(DownloadRecord {
                hash,
                file_path: relative_path,
                file_name,
                source_id: candidate.id.clone(),
                extra_type: candidate.extra_type,
            });
            outcome.placed += 1;
        }

        Ok(())
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|audio| ext.eq_ignore_ascii_case(audio))
        })
}

/// Rename, falling back to copy and delete across file systems.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(source, target).is_err() {
        fs::copy(source, target)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

fn remove_scratch(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove scratch directory {}: {}", dir.display(), e);
        }
    }
}
