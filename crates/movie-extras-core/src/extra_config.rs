use config::{Config, ConfigError, File as ConfigFile, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Error;
use crate::filter::FilterRule;
use crate::ranking::{PriorityOrder, SelectionPolicy};
use crate::retriever::{ArgValue, DownloadOptions};
use crate::storage::models::ExtraType;

const DEFAULT_NAMING_SCHEME: &str = "%(title)s.%(ext)s";

/// Where a search template gets its links from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Videos the metadata service links to the resolved id.
    #[default]
    Tmdb,
    /// Free-text search on the video platform.
    Ytsearch,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchTemplate {
    pub query: String,
    pub limit: usize,
    #[serde(default)]
    pub source: SearchSource,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    pub required_phrases: Vec<String>,
    pub banned_phrases: Vec<String>,
    pub banned_channels: Vec<String>,
    pub require_title_match: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomFilters {
    #[serde(default = "default_break_limit")]
    pub break_limit: usize,
    #[serde(default)]
    pub groups: Vec<Vec<FilterRule>>,
}

impl Default for CustomFilters {
    fn default() -> Self {
        Self {
            break_limit: default_break_limit(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriorityRules {
    pub order: PriorityOrder,
    #[serde(default)]
    pub preferred_channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownloadingConfig {
    #[serde(default = "default_videos_to_download")]
    pub videos_to_download: usize,
    #[serde(default = "default_naming_scheme")]
    pub naming_scheme: String,
    #[serde(default)]
    pub ytdl_arguments: BTreeMap<String, ArgValue>,
}

impl Default for DownloadingConfig {
    fn default() -> Self {
        Self {
            videos_to_download: default_videos_to_download(),
            naming_scheme: default_naming_scheme(),
            ytdl_arguments: BTreeMap::new(),
        }
    }
}

impl DownloadingConfig {
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            output_template: self.naming_scheme.clone(),
            arguments: self.ytdl_arguments.clone(),
        }
    }
}

/// One extra-type definition. `config_id` is what a folder record remembers
/// once the definition has been fully processed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtraTypeConfig {
    pub extra_type: ExtraType,
    pub config_id: String,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub disable_play_trailers: bool,
    #[serde(default)]
    pub only_play_trailers: bool,
    #[serde(default)]
    pub skip_if_trailer_exists: bool,
    #[serde(default)]
    pub skip_if_theme_exists: bool,
    pub searches: Vec<SearchTemplate>,
    #[serde(default)]
    pub filtering: FilteringConfig,
    #[serde(default)]
    pub custom_filters: CustomFilters,
    pub priority_rules: PriorityRules,
    #[serde(default)]
    pub downloading: DownloadingConfig,
}

impl ExtraTypeConfig {
    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            disable_play_trailers: self.disable_play_trailers,
            only_play_trailers: self.only_play_trailers,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.config_id.trim().is_empty() {
            return Err(ConfigError::Message("config_id must not be empty".to_string()));
        }
        if self.searches.is_empty() {
            return Err(ConfigError::Message(
                "at least one [[searches]] entry is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_break_limit() -> usize {
    1
}

fn default_videos_to_download() -> usize {
    1
}

fn default_naming_scheme() -> String {
    DEFAULT_NAMING_SCHEME.to_string()
}

/// Parse one extra-type document.
pub fn load_extra_config(path: &Path) -> Result<ExtraTypeConfig, Error> {
    let wrap = |source: ConfigError| Error::ExtraConfig {
        path: path.to_path_buf(),
        source,
    };

    let extra_config = Config::builder()
        .add_source(ConfigFile::from(path).format(FileFormat::Toml))
        .build()
        .and_then(|c| c.try_deserialize::<ExtraTypeConfig>())
        .map_err(wrap)?;
    extra_config.validate().map_err(wrap)?;

    debug!(
        "Loaded extra config '{}' ({}) from {}",
        extra_config.config_id,
        extra_config.extra_type,
        path.display()
    );
    Ok(extra_config)
}

/// Every `*.toml` in `dir` in file name order. Names starting with `.` or `_`
/// are skipped. The first broken document fails the whole load.
pub fn load_extra_configs(dir: &Path) -> Result<Vec<ExtraTypeConfig>, Error> {
    let configs = config_paths(dir)?
        .iter()
        .map(|path| load_extra_config(path))
        .collect::<Result<Vec<_>, _>>()?;

    info!("Loaded {} extra configs from {}", configs.len(), dir.display());
    Ok(configs)
}

fn config_paths(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let pattern = dir.join("*.toml");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern)
        .map_err(|e| Error::Other(format!("bad extra config pattern '{}': {}", pattern, e)))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| !n.starts_with('.') && !n.starts_with('_'))
        })
        .collect();
    paths.sort();
    Ok(paths)
}
