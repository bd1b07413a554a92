use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TMDB_API_URL: &str = "https://api.themoviedb.org/3";

const APP_DIR_NAME: &str = "movie-extras";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub tmdb_api_key: String,
    pub tmdb_api_url: String,
    pub records_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub extra_configs_dir: PathBuf,
    pub yt_dlp_path: PathBuf,
    pub search_interval_secs: u64,
}

impl AppConfig {
    pub fn search_interval(&self) -> Duration {
        Duration::from_secs(self.search_interval_secs)
    }
}

/// Directory holding the executable. Library managers start the binary from
/// arbitrary working directories, so relative defaults are anchored here.
pub fn install_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| env::temp_dir().join(APP_DIR_NAME))
}

/// Scratch space owned by this tool alone; it is wiped at the start of every run.
pub fn default_scratch_dir() -> PathBuf {
    env::temp_dir().join(APP_DIR_NAME)
}

fn path_default(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Settings from an optional `Config.toml` next to the executable, then one in
/// the working directory, overridden by `MOVIE_EXTRAS_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from("Config")
}

/// Like [`load_configuration`] with an explicit settings file name (extension optional).
pub fn load_configuration_from(file_name: &str) -> Result<AppConfig, ConfigError> {
    let install_dir = install_dir();
    let builder = Config::builder()
        .set_default("tmdb_api_url", DEFAULT_TMDB_API_URL)?
        .set_default("records_dir", path_default(install_dir.join("records")))?
        .set_default("scratch_dir", path_default(default_scratch_dir()))?
        .set_default(
            "extra_configs_dir",
            path_default(install_dir.join("extra_configs")),
        )?
        .set_default("yt_dlp_path", "yt-dlp")?
        .set_default("search_interval_secs", 2)?
        .add_source(ConfigFile::from(install_dir.join("Config.toml")).required(false))
        .add_source(ConfigFile::with_name(file_name).required(false))
        .add_source(
            Environment::with_prefix("MOVIE_EXTRAS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_fill_missing_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Settings.toml");
        fs::write(&path, "tmdb_api_key = \"abc\"\nsearch_interval_secs = 5\n").unwrap();

        let config = load_configuration_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.tmdb_api_key, "abc");
        assert_eq!(config.tmdb_api_url, DEFAULT_TMDB_API_URL);
        assert_eq!(config.records_dir, install_dir().join("records"));
        assert_eq!(config.scratch_dir, env::temp_dir().join("movie-extras"));
        assert_eq!(config.extra_configs_dir, install_dir().join("extra_configs"));
        assert_eq!(config.yt_dlp_path, PathBuf::from("yt-dlp"));
        assert_eq!(config.search_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_directories_ignore_working_directory() {
        let scratch = default_scratch_dir();
        assert!(scratch.is_absolute());
        assert_ne!(scratch, env::temp_dir());
        assert!(scratch.starts_with(env::temp_dir()));
        assert!(install_dir().is_absolute());
    }

    #[test]
    fn test_explicit_directories_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Paths.toml");
        fs::write(
            &path,
            "tmdb_api_key = \"abc\"\nscratch_dir = \"/srv/extras/scratch\"\nrecords_dir = \"/srv/extras/records\"\n",
        )
        .unwrap();

        let config = load_configuration_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.scratch_dir, PathBuf::from("/srv/extras/scratch"));
        assert_eq!(config.records_dir, PathBuf::from("/srv/extras/records"));
    }
}
