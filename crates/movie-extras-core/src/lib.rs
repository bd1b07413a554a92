pub mod candidate;
pub mod config;
pub mod engine;
pub mod error;
pub mod extra_config;
pub mod fetcher;
pub mod filter;
pub mod hasher;
pub mod metadata;
pub mod progress;
pub mod ranking;
pub mod reconciler;
pub mod retriever;
pub mod retry;
pub mod scanner;
pub mod storage;
pub mod text;

pub use config::AppConfig;
pub use engine::{ExtrasEngine, FolderSummary, ProcessOptions, RunSummary};
pub use error::Error;
pub use extra_config::{load_extra_configs, ExtraTypeConfig};
pub use metadata::{MetadataService, TmdbClient};
pub use progress::{ProgressReporter, SilentReporter};
pub use retriever::{VideoRetriever, YtDlp};
pub use storage::models::{ExtraType, FolderRecord, MediaType};
pub use storage::RecordStore;
