/// Trait for reporting progress through folders, configs and downloads.
///
/// The CLI implements it with an indicatif spinner. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_folder_start(&self, _name: &str, _index: usize, _total: usize) {}
    fn on_config_start(&self, _folder: &str, _config_id: &str) {}
    fn on_candidates_found(&self, _total: usize, _after_filters: usize) {}
    fn on_download_start(&self, _url: &str) {}
    fn on_download_complete(&self, _url: &str, _success: bool) {}
    fn on_folder_complete(&self, _name: &str, _files_placed: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
