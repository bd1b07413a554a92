mod automation;
mod commands;
mod logging;
mod progress;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use automation::Trigger;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ProcessArgs};
use dotenv::dotenv;
use movie_extras_core::{
    load_extra_configs, AppConfig, ExtrasEngine, MediaType, MetadataService, ProcessOptions,
    TmdbClient, YtDlp,
};
use progress::CliReporter;
use tracing::{error, info, warn};

const API_KEY_CHECK_QUERY: &str = "star wars";

enum Target {
    Directory(PathBuf),
    Library(PathBuf),
}

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match movie_extras_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match automation::trigger_from_env() {
        Ok(None) => {}
        Ok(Some(Trigger::Test)) => {
            info!("Received test event from the library manager");
            return;
        }
        Ok(Some(Trigger::Process {
            directory,
            media_type,
            tmdb_id,
        })) => {
            let options = ProcessOptions {
                media_type,
                tmdb_id,
                ..ProcessOptions::default()
            };
            exit_on_error(run_process(&config, Target::Directory(directory), options));
            return;
        }
        Err(err) => {
            error!("Error reading automation environment: {:#}", err);
            process::exit(1);
        }
    }

    let args = Cli::parse();

    match args.command {
        Some(Commands::Process(args)) => {
            exit_on_error(
                process_request(args)
                    .and_then(|(target, options)| run_process(&config, target, options)),
            );
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", masked(&config));
        }
        Some(Commands::ListConfigs) => {
            exit_on_error(run_list_configs(&config));
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }
}

fn exit_on_error(result: Result<()>) {
    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn process_request(args: ProcessArgs) -> Result<(Target, ProcessOptions)> {
    let options = ProcessOptions {
        media_type: args.media_type.into(),
        tmdb_id: args.tmdb_id,
        force: args.force,
        replace: args.replace,
    };
    let target = match (args.directory, args.library) {
        (Some(directory), _) => Target::Directory(directory),
        (None, Some(library)) => Target::Library(library),
        (None, None) => bail!("either --directory or --library is required"),
    };
    Ok((target, options))
}

fn run_process(config: &AppConfig, target: Target, options: ProcessOptions) -> Result<()> {
    let configs = load_extra_configs(&config.extra_configs_dir)?;
    if configs.is_empty() {
        bail!(
            "no extra configs found in {}",
            config.extra_configs_dir.display()
        );
    }

    let retriever = YtDlp::new(config.yt_dlp_path.clone());
    let version = retriever
        .ensure_available()
        .with_context(|| format!("{} is not usable", config.yt_dlp_path.display()))?;
    info!("Using yt-dlp {}", version);

    let metadata = TmdbClient::new(&config.tmdb_api_url, &config.tmdb_api_key);
    check_api_key(&metadata);

    let reporter = CliReporter::new();
    let mut engine =
        ExtrasEngine::new(config, configs, &metadata, &retriever).with_reporter(&reporter);
    let start = Instant::now();

    match target {
        Target::Directory(directory) => {
            ensure_dir(&directory)?;
            let result = engine.process_directory(&directory, options);
            reporter.finish();
            let summary = result?;
            info!(
                "'{}': {} configs completed, {} skipped, {} new files",
                summary.name,
                summary.configs_completed.to_string().green(),
                summary.configs_skipped.to_string().yellow(),
                summary.files_placed.to_string().cyan(),
            );
        }
        Target::Library(library) => {
            ensure_dir(&library)?;
            let result = engine.process_library(&library, options);
            reporter.finish();
            let summary = result?;
            info!(
                "{} folders processed, {} failed, {} new files",
                summary.folders_processed.to_string().green(),
                summary.folders_failed.to_string().red(),
                summary.files_placed.to_string().cyan(),
            );
        }
    }

    info!(
        "Done in {}",
        format!("{:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    let metadata = path
        .metadata()
        .with_context(|| format!("cannot read {}", path.display()))?;
    if !metadata.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(())
}

fn check_api_key(metadata: &TmdbClient) {
    match metadata.search(API_KEY_CHECK_QUERY, MediaType::Movie) {
        Ok(results) if !results.is_empty() => info!("Metadata API key is valid"),
        Ok(_) => warn!("Metadata API key check returned no results"),
        Err(err) => warn!("Metadata API key check failed: {}", err),
    }
}

fn run_list_configs(config: &AppConfig) -> Result<()> {
    let configs = load_extra_configs(&config.extra_configs_dir)?;
    if configs.is_empty() {
        println!(
            "No extra configs in {}",
            config.extra_configs_dir.display()
        );
        return Ok(());
    }
    for extra_config in configs {
        println!(
            "{} {} ({} searches, {} videos, order {:?})",
            extra_config.config_id.bold(),
            extra_config.extra_type.to_string().cyan(),
            extra_config.searches.len(),
            extra_config.downloading.videos_to_download,
            extra_config.priority_rules.order,
        );
    }
    Ok(())
}

fn masked(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if !config.tmdb_api_key.is_empty() {
        config.tmdb_api_key = "[masked]".to_string();
    }
    config
}
