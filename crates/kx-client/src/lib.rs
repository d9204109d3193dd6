//! Admin client library for the KX Commerce platform.
//!
//! The dashboards are thin views over this crate: a theme registry
//! client (multipart uploads with progress, CRUD, log fetching), a
//! build status poller that drives the log viewer, a pure log line
//! classifier, and small helpers for plan billing views and the store
//! deletion countdown.
//!
//! All configuration is passed in explicitly via [`ClientConfig`];
//! nothing in this crate reads ambient global state.

pub mod config;
pub mod countdown;
pub mod plans;
pub mod poller;
pub mod registry;
pub mod render;
pub mod stores;
pub mod unwrap;
pub mod upload;

mod error;

pub use config::ClientConfig;
pub use countdown::DeleteCountdown;
pub use error::ClientError;
pub use plans::{PlanClient, PlanView};
pub use poller::{LogViewer, ViewerState, POLL_INTERVAL};
pub use registry::{Theme, ThemePatch, ThemeRegistry};
pub use render::{classify_line, render_log, LineKind, LogLine};
pub use stores::{StoreClient, StoreView};
pub use upload::{ProgressFn, ThemeUpload};
