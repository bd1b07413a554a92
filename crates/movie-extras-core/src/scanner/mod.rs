pub mod snapshot;

pub use snapshot::{has_existing_theme, has_existing_trailer, Collision, FileSystemSnapshot};
