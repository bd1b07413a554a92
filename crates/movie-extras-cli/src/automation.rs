use anyhow::{Context, Result};
use movie_extras_core::MediaType;
use std::env;
use std::path::PathBuf;

const TEST_EVENT: &str = "Test";

/// What a library manager asked for through its custom-script environment.
#[derive(Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The connection test fired when the script is configured.
    Test,
    Process {
        directory: PathBuf,
        media_type: MediaType,
        tmdb_id: Option<u64>,
    },
}

/// Radarr and Sonarr custom-script variables, if the binary was started by either.
pub fn trigger_from_env() -> Result<Option<Trigger>> {
    trigger_from(|key| env::var(key).ok())
}

fn trigger_from(var: impl Fn(&str) -> Option<String>) -> Result<Option<Trigger>> {
    if let Some(event) = var("radarr_eventtype") {
        if event.eq_ignore_ascii_case(TEST_EVENT) {
            return Ok(Some(Trigger::Test));
        }
        let directory = var("radarr_movie_path")
            .context("radarr_movie_path is not set for the Radarr event")?;
        let tmdb_id = var("radarr_movie_tmdbid")
            .filter(|id| !id.trim().is_empty())
            .map(|id| {
                id.trim()
                    .parse::<u64>()
                    .with_context(|| format!("radarr_movie_tmdbid '{}' is not a number", id))
            })
            .transpose()?;
        return Ok(Some(Trigger::Process {
            directory: PathBuf::from(directory),
            media_type: MediaType::Movie,
            tmdb_id,
        }));
    }

    if let Some(event) = var("sonarr_eventtype") {
        if event.eq_ignore_ascii_case(TEST_EVENT) {
            return Ok(Some(Trigger::Test));
        }
        let directory = var("sonarr_series_path")
            .context("sonarr_series_path is not set for the Sonarr event")?;
        return Ok(Some(Trigger::Process {
            directory: PathBuf::from(directory),
            media_type: MediaType::Tv,
            tmdb_id: None,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn trigger(pairs: &[(&str, &str)]) -> Result<Option<Trigger>> {
        let vars = vars(pairs);
        trigger_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_no_manager_variables() {
        assert_eq!(trigger(&[]).unwrap(), None);
    }

    #[test]
    fn test_test_events() {
        assert_eq!(trigger(&[("radarr_eventtype", "Test")]).unwrap(), Some(Trigger::Test));
        assert_eq!(trigger(&[("sonarr_eventtype", "test")]).unwrap(), Some(Trigger::Test));
    }

    #[test]
    fn test_radarr_download() {
        let trigger = trigger(&[
            ("radarr_eventtype", "Download"),
            ("radarr_movie_path", "/movies/Inception (2010)"),
            ("radarr_movie_tmdbid", "27205"),
        ])
        .unwrap();
        assert_eq!(
            trigger,
            Some(Trigger::Process {
                directory: PathBuf::from("/movies/Inception (2010)"),
                media_type: MediaType::Movie,
                tmdb_id: Some(27205),
            })
        );
    }

    #[test]
    fn test_sonarr_download() {
        let trigger = trigger(&[
            ("sonarr_eventtype", "Download"),
            ("sonarr_series_path", "/tv/The Wire"),
        ])
        .unwrap();
        assert_eq!(
            trigger,
            Some(Trigger::Process {
                directory: PathBuf::from("/tv/The Wire"),
                media_type: MediaType::Tv,
                tmdb_id: None,
            })
        );
    }

    #[test]
    fn test_bad_radarr_variables() {
        assert!(trigger(&[("radarr_eventtype", "Download")]).is_err());
        assert!(trigger(&[
            ("radarr_eventtype", "Download"),
            ("radarr_movie_path", "/movies/x"),
            ("radarr_movie_tmdbid", "abc"),
        ])
        .is_err());
    }
}
