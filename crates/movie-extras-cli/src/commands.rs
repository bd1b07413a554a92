use clap::{Args, Parser, Subcommand, ValueEnum};
use movie_extras_core::MediaType;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "movie-extras")]
#[command(about = "Finds and downloads trailers and other extras for a media library", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch, filter and download extras for one folder or a whole library
    Process(ProcessArgs),
    /// Print configuration values
    PrintConfig,
    /// Validate and list the extra-type configs
    ListConfigs,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// A single media folder
    #[arg(short, long, conflicts_with = "library", required_unless_present = "library")]
    pub directory: Option<PathBuf>,

    /// A folder whose subdirectories are media folders
    #[arg(short, long)]
    pub library: Option<PathBuf>,

    /// Metadata id of the folder, skipping the title search
    #[arg(short = 'i', long, requires = "directory")]
    pub tmdb_id: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = MediaTypeArg::Movie)]
    pub media_type: MediaTypeArg,

    /// Re-run configs that already completed and forget earlier downloads
    #[arg(short, long)]
    pub force: bool,

    /// Ban the current trailer and download a different one
    #[arg(short, long, requires = "directory")]
    pub replace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaTypeArg {
    Movie,
    Tv,
}

impl From<MediaTypeArg> for MediaType {
    fn from(arg: MediaTypeArg) -> Self {
        match arg {
            MediaTypeArg::Movie => MediaType::Movie,
            MediaTypeArg::Tv => MediaType::Tv,
        }
    }
}
