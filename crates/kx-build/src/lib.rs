pub mod archive;
pub mod lifecycle;
pub mod logfile;
pub mod runner;
pub mod slug;
pub mod storage;

mod error;

pub use archive::{clean_preserving, extract_archive, flatten_tree, is_node_project, is_zip_archive};
pub use error::BuildError;
pub use lifecycle::{parse_progress, ThemeStatus};
pub use logfile::{BuildLog, LOG_TAIL_LINES};
pub use runner::run_logged;
pub use slug::{is_valid_slug, slugify};
pub use storage::ThemeStorage;
