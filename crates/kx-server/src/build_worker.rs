//! Background theme build worker.
//!
//! One build task per theme slug: extract the uploaded archive, flatten
//! wrapper directories, run the Node install/build steps for Node
//! projects and record every stage in the theme's build log and in the
//! registry row (status + a progress percentage embedded in the
//! description, which the dashboards parse back out).

use kx_build::{
    archive::{self, PRESERVED_ENTRIES},
    logfile::BuildLog,
    run_logged, BuildError, ThemeStatus,
};
use kx_db::entities::theme;
use kx_db::AppState;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex};

/// Slugs with a build currently in flight. At most one build runs per
/// theme at a time.
static IN_FLIGHT: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Failure messages stored on the theme row are capped at this length.
const ERROR_DESCRIPTION_CHARS: usize = 100;

pub fn is_building(slug: &str) -> bool {
    IN_FLIGHT.lock().unwrap().contains(slug)
}

/// Releases the in-flight slot even if the build task unwinds.
struct InFlightGuard(String);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        IN_FLIGHT.lock().unwrap().remove(&self.0);
    }
}

/// Spawn the build job for `slug` unless one is already running.
/// Returns `false` when the slug was already in flight.
pub fn try_spawn_build(state: Arc<AppState>, slug: String) -> bool {
    {
        let mut in_flight = IN_FLIGHT.lock().unwrap();
        if !in_flight.insert(slug.clone()) {
            tracing::warn!(slug = %slug, "build already in flight, not spawning another");
            return false;
        }
    }

    tokio::spawn(async move {
        let _guard = InFlightGuard(slug.clone());
        let log = state.storage.build_log(&slug);

        match run_build(&state, &slug, &log).await {
            Ok(()) => finish_success(&state, &slug, &log).await,
            Err(e) => finish_failure(&state, &slug, &log, e).await,
        }
    });
    true
}

// ─── Build steps ────────────────────────────────────────────────────────

async fn run_build(state: &AppState, slug: &str, log: &BuildLog) -> Result<(), BuildError> {
    let storage = &state.storage;
    let zip_path = storage.zip_path(slug);
    let dir = storage.extract_dir(slug);

    set_progress(state, slug, log, "Step 1/4: Unzipping files...", 25).await;
    archive::clean_preserving(&dir, PRESERVED_ENTRIES).await?;
    archive::extract_archive(&zip_path, &dir).await?;

    set_progress(state, slug, log, "Step 2/4: Preparing theme sources...", 50).await;
    archive::flatten_tree(&dir).await?;

    if !archive::is_node_project(&dir) {
        // Static archive: nothing to compile, serve it as-is.
        log.append_step("Static theme detected, skipping build").await?;
        return Ok(());
    }

    set_progress(state, slug, log, "Step 3/4: Installing dependencies...", 75).await;
    run_logged("npm", &["install", "--legacy-peer-deps"], &dir, log).await?;

    set_progress(state, slug, log, "Step 4/4: Compiling assets...", 90).await;
    run_logged("npm", &["run", "build"], &dir, log).await?;

    let out_dir = storage.output_dir(slug);
    if !out_dir.is_dir() {
        return Err(BuildError::MissingOutput(out_dir));
    }

    set_progress(state, slug, log, "Cleaning up...", 95).await;
    let node_modules = dir.join("node_modules");
    if node_modules.exists() {
        tokio::fs::remove_dir_all(&node_modules).await?;
    }

    Ok(())
}

async fn finish_success(state: &AppState, slug: &str, log: &BuildLog) {
    if let Err(e) = log.append_step("Build complete").await {
        tracing::warn!(slug = %slug, "failed to write build log: {e}");
    }
    let stamp = chrono::Local::now().format("%H:%M");
    update_row(
        state,
        slug,
        ThemeStatus::Active,
        format!("Live (last build {stamp})"),
    )
    .await;
    tracing::info!(slug = %slug, "theme build succeeded");
}

async fn finish_failure(state: &AppState, slug: &str, log: &BuildLog, error: BuildError) {
    // Command failures already wrote their own ❌ line via the runner.
    if !matches!(error, BuildError::CommandFailed { .. }) {
        if let Err(e) = log.append_error(&error.to_string()).await {
            tracing::warn!(slug = %slug, "failed to write build log: {e}");
        }
    }
    let truncated: String = error.to_string().chars().take(ERROR_DESCRIPTION_CHARS).collect();
    update_row(
        state,
        slug,
        ThemeStatus::Failed,
        format!("Error: {truncated}"),
    )
    .await;
    tracing::error!(slug = %slug, "theme build failed: {error}");
}

/// Write a step marker to the log and mirror the progress into the
/// theme's description as `"<msg> (<pct>%)"`.
async fn set_progress(state: &AppState, slug: &str, log: &BuildLog, message: &str, percent: u8) {
    if let Err(e) = log.append_step(message).await {
        tracing::warn!(slug = %slug, "failed to write build log: {e}");
    }
    set_description(state, slug, format!("{message} ({percent}%)")).await;
}

async fn set_description(state: &AppState, slug: &str, description: String) {
    let found = theme::Entity::find()
        .filter(theme::Column::Slug.eq(slug))
        .one(&state.db)
        .await;
    match found {
        Ok(Some(model)) => {
            let mut active: theme::ActiveModel = model.into();
            active.description = Set(Some(description));
            active.updated_at = Set(chrono::Utc::now().fixed_offset());
            if let Err(e) = active.update(&state.db).await {
                tracing::warn!(slug = %slug, "failed to record build progress: {e}");
            }
        }
        Ok(None) => tracing::warn!(slug = %slug, "theme row vanished during build"),
        Err(e) => tracing::warn!(slug = %slug, "failed to load theme row: {e}"),
    }
}

async fn update_row(state: &AppState, slug: &str, status: ThemeStatus, description: String) {
    let found = theme::Entity::find()
        .filter(theme::Column::Slug.eq(slug))
        .one(&state.db)
        .await;
    match found {
        Ok(Some(model)) => {
            let mut active: theme::ActiveModel = model.into();
            active.status = Set(status.to_string());
            active.description = Set(Some(description));
            active.updated_at = Set(chrono::Utc::now().fixed_offset());
            if let Err(e) = active.update(&state.db).await {
                tracing::error!(slug = %slug, "failed to record build outcome: {e}");
            }
        }
        Ok(None) => tracing::warn!(slug = %slug, "theme row vanished during build"),
        Err(e) => tracing::error!(slug = %slug, "failed to load theme row: {e}"),
    }
}
