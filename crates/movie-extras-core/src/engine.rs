use chrono::{Datelike, Local, NaiveDate};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::extra_config::ExtraTypeConfig;
use crate::fetcher::CandidateFetcher;
use crate::filter;
use crate::metadata::{MetadataResolver, MetadataService};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::ranking;
use crate::reconciler::DownloadReconciler;
use crate::retriever::VideoRetriever;
use crate::retry::RetryPolicy;
use crate::scanner::{self, FileSystemSnapshot};
use crate::storage::models::{ExtraType, FolderRecord, MediaType};
use crate::storage::RecordStore;

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub media_type: MediaType,
    /// Metadata id of the folder; only used for a single directory.
    pub tmdb_id: Option<u64>,
    pub force: bool,
    /// Ban the current trailer and fetch a different one. Implies `force`.
    pub replace: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            media_type: MediaType::Movie,
            tmdb_id: None,
            force: false,
            replace: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub name: String,
    pub configs_completed: usize,
    pub configs_skipped: usize,
    pub files_placed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub folders_processed: usize,
    pub folders_failed: usize,
    pub files_placed: usize,
}

/// Drives one invocation: resolve each folder, then fetch, filter, rank and
/// download for every extra-type config in turn.
pub struct ExtrasEngine<'a> {
    metadata: &'a dyn MetadataService,
    fetcher: CandidateFetcher<'a>,
    reconciler: DownloadReconciler<'a>,
    store: RecordStore,
    configs: Vec<ExtraTypeConfig>,
    scratch_dir: PathBuf,
    reporter: &'a dyn ProgressReporter,
    today: NaiveDate,
}

impl<'a> ExtrasEngine<'a> {
    pub fn new(
        app_config: &AppConfig,
        configs: Vec<ExtraTypeConfig>,
        metadata: &'a dyn MetadataService,
        retriever: &'a dyn VideoRetriever,
    ) -> Self {
        Self {
            metadata,
            fetcher: CandidateFetcher::new(metadata, retriever, app_config.search_interval()),
            reconciler: DownloadReconciler::new(retriever, &app_config.scratch_dir),
            store: RecordStore::new(&app_config.records_dir),
            configs,
            scratch_dir: app_config.scratch_dir.clone(),
            reporter: &SilentReporter,
            today: Local::now().date_naive(),
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Retry budget for both candidate lookups and downloads.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.fetcher = self.fetcher.with_retry(retry);
        self.reconciler = self.reconciler.with_retry(retry);
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Process a single media folder.
    pub fn process_directory(
        &mut self,
        folder: &Path,
        options: ProcessOptions,
    ) -> Result<FolderSummary, Error> {
        self.reset_scratch()?;
        self.reporter.on_folder_start(&folder_name(folder), 1, 1);
        let result = self.process_folder(folder, options);
        self.clear_scratch();
        result
    }

    /// Process every non-hidden subdirectory of `library` in name order.
    /// Folder failures are logged and skipped; a fatal error ends the run.
    pub fn process_library(
        &mut self,
        library: &Path,
        options: ProcessOptions,
    ) -> Result<RunSummary, Error> {
        if options.replace {
            return Err(Error::Other(
                "replace cannot be used when processing a whole library".to_string(),
            ));
        }
        let options = ProcessOptions {
            tmdb_id: None,
            ..options
        };

        let folders = list_media_folders(library)?;
        info!("Processing {} folders in {}", folders.len(), library.display());
        self.reset_scratch()?;

        let mut summary = RunSummary::default();
        for (index, folder) in folders.iter().enumerate() {
            self.reporter
                .on_folder_start(&folder_name(folder), index + 1, folders.len());
            match self.process_folder(folder, options) {
                Ok(folder_summary) => {
                    summary.folders_processed += 1;
                    summary.files_placed += folder_summary.files_placed;
                }
                Err(e) if e.is_fatal() => {
                    self.clear_scratch();
                    return Err(e);
                }
                Err(e) => {
                    error!("Skipping '{}': {}", folder.display(), e);
                    summary.folders_failed += 1;
                }
            }
        }

        self.clear_scratch();
        Ok(summary)
    }

    fn process_folder(
        &mut self,
        folder: &Path,
        options: ProcessOptions,
    ) -> Result<FolderSummary, Error> {
        let start = Instant::now();
        let name = folder_name(folder);
        info!("Working on directory: {}", folder.display());

        // Replace needs the stored trailer id, so only a plain force starts over.
        let stored = if options.force && !options.replace {
            None
        } else {
            self.store.load(&name)?
        };
        let mut record = match stored {
            Some(mut record) if record.tmdb_id.is_some() => {
                record.full_path = folder.to_path_buf();
                record
            }
            _ => {
                let mut record = FolderRecord::new(folder, options.media_type);
                MetadataResolver::new(self.metadata, self.today.year())
                    .resolve(&mut record, options.tmdb_id)?;
                record
            }
        };
        if record.tmdb_id.is_none() {
            return Err(Error::MetadataNotFound(format!("no id for '{}'", name)));
        }

        let mut summary = FolderSummary {
            name: name.clone(),
            ..FolderSummary::default()
        };
        for index in 0..self.configs.len() {
            let placed = self.process_config(index, &mut record, options)?;
            match placed {
                Some(placed) => {
                    summary.configs_completed += 1;
                    summary.files_placed += placed;
                }
                None => summary.configs_skipped += 1,
            }
        }

        self.store.save(&record)?;
        self.reporter.on_folder_complete(&name, summary.files_placed);
        debug!(
            "Finished '{}' in {:.2}s: {} placed",
            name,
            start.elapsed().as_secs_f64(),
            summary.files_placed
        );
        Ok(summary)
    }

    /// Run one extra-type config against the folder. Returns the number of files
    /// placed, or `None` when the config was skipped or did not complete.
    fn process_config(
        &mut self,
        index: usize,
        record: &mut FolderRecord,
        options: ProcessOptions,
    ) -> Result<Option<usize>, Error> {
        let config = &self.configs[index];
        let cli_force = options.force || options.replace;
        let folder = record.full_path.clone();
        self.reporter.on_config_start(&record.name, &config.config_id);

        if record.is_completed(&config.config_id) && !cli_force {
            debug!("'{}' already completed for '{}'", config.config_id, record.name);
            return Ok(None);
        }

        if config.skip_if_trailer_exists && !options.replace && scanner::has_existing_trailer(&folder)? {
            info!("'{}' already has a trailer, skipping", record.name);
            self.store.save(record)?;
            return Ok(None);
        }
        if config.skip_if_theme_exists && scanner::has_existing_theme(&folder)? {
            info!("'{}' already has a theme song, skipping", record.name);
            self.store.save(record)?;
            return Ok(None);
        }

        if cli_force {
            let removed = record.reset_downloads(config.extra_type);
            debug!("Forgot {} earlier {} downloads", removed, config.extra_type);
        }
        if options.replace && config.extra_type == ExtraType::Trailers {
            if let Some(id) = record.trailer_source_id.clone() {
                info!("Banning current trailer {}", id);
                record.ban_source(&id);
            }
            remove_dir_if_present(&folder.join(ExtraType::Trailers.dir_name()))?;
        }

        let mut snapshot = FileSystemSnapshot::capture(&folder)?;

        // Fetch
        let fetched = self.fetcher.fetch(record, config, self.today)?;
        let total = fetched.candidates.len();

        // Filter
        let general = filter::apply_hard_filters(fetched.candidates, record, &config.filtering);
        let play_trailers = filter::apply_play_trailer_filters(fetched.play_trailers, record);
        let reserved_slots = usize::from(
            !play_trailers.is_empty() && config.extra_type == ExtraType::Trailers,
        );
        let general = filter::apply_custom_filters(
            &general,
            &config.custom_filters.groups,
            config.custom_filters.break_limit,
            reserved_slots,
        );
        self.reporter.on_candidates_found(total, general.len());

        // Rank
        let general = ranking::order_candidates(
            general,
            config.priority_rules.order,
            &config.priority_rules.preferred_channels,
        );
        let play_trailers = ranking::order_play_trailers(play_trailers);
        let Some(selection) =
            ranking::select(general, &play_trailers, config.selection_policy(), record)
        else {
            info!("No official trailer for '{}', skipping {}", record.name, config.config_id);
            self.store.save(record)?;
            return Ok(None);
        };
        for candidate in &selection {
            info!(
                "{} : {} ({:.3})",
                candidate.url,
                candidate.format.as_deref().unwrap_or("unknown format"),
                candidate.adjusted_rating
            );
        }

        // Download
        let outcome = self.reconciler.reconcile(
            &selection,
            config,
            cli_force || config.force,
            record,
            &mut snapshot,
            self.reporter,
        )?;

        if config.extra_type == ExtraType::Trailers && outcome.placed > 0 {
            record.trailer_source_id = outcome.retrieved.first().cloned();
        }
        let completed = !outcome.aborted;
        if completed {
            record.mark_completed(&config.config_id);
        } else {
            warn!("'{}' left incomplete for '{}'", config.config_id, record.name);
        }
        self.store.save(record)?;

        Ok(completed.then_some(outcome.placed))
    }

    fn reset_scratch(&self) -> Result<(), Error> {
        remove_dir_if_present(&self.scratch_dir)?;
        fs::create_dir_all(&self.scratch_dir)?;
        Ok(())
    }

    fn clear_scratch(&self) {
        if let Err(e) = remove_dir_if_present(&self.scratch_dir) {
            warn!("Could not clear {}: {}", self.scratch_dir.display(), e);
        }
    }
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn remove_dir_if_present(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Subdirectories of `library`, hidden ones excluded, sorted by name.
pub fn list_media_folders(library: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut folders: Vec<PathBuf> = fs::read_dir(library)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir() && !folder_name(path).starts_with('.'))
        .collect();
    folders.sort();
    Ok(folders)
}
