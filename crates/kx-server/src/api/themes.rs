//! Theme registry API endpoints.
//!
//! Admin endpoints for uploading, listing, updating and deleting site
//! themes, reading a theme's build log and applying a theme to a store.
//! Uploading kicks off a background build job; the dashboard polls the
//! logs endpoint until it closes the viewer.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use kx_build::{is_valid_slug, is_zip_archive, slugify, ThemeStatus, LOG_TAIL_LINES};
use kx_db::entities::{store, theme};
use kx_db::AppState;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::{bad_request, conflict, db_error, not_found, ApiError, ListResponse};
use crate::build_worker;

// ─── Response types ─────────────────────────────────────────────────────

/// Theme as the dashboards expect it (camelCase keys, `buildPath` for
/// the archive URL).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub build_path: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<theme::Model> for ThemeResponse {
    fn from(t: theme::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
            description: t.description,
            thumbnail_url: t.thumbnail_url,
            build_path: t.zip_url,
            status: t.status,
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ThemeListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyThemeRequest {
    pub store_slug: String,
    pub theme_slug: String,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn matches_search(t: &theme::Model, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    t.name.to_lowercase().contains(&needle) || t.slug.to_lowercase().contains(&needle)
}

async fn find_theme(state: &AppState, slug: &str) -> Result<theme::Model, ApiError> {
    theme::Entity::find()
        .filter(theme::Column::Slug.eq(slug))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Theme"))
}

fn thumbnail_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "png".to_string())
}

/// Content type for files served out of a theme's build output.
fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Serve one file from under `root` with a canonicalization check so a
/// crafted path can never escape it.
async fn serve_under(root: &std::path::Path, requested: &str) -> Result<axum::response::Response, ApiError> {
    let joined = root.join(requested);
    let canonical = joined
        .canonicalize()
        .map_err(|_| not_found("File"))?;
    let canonical_root = root
        .canonicalize()
        .map_err(|_| not_found("File"))?;

    if !canonical.starts_with(&canonical_root) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Path traversal detected" })),
        ));
    }
    if !canonical.is_file() {
        return Err(not_found("File"));
    }

    let data = tokio::fs::read(&canonical).await.map_err(|e| {
        tracing::error!(path = %canonical.display(), "failed to read file: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to read file" })),
        )
    })?;

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        content_type_for(&canonical).parse().unwrap(),
    );
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        "public, max-age=3600".parse().unwrap(),
    );
    Ok((headers, data).into_response())
}

// ─── Multipart parsing ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ThemeForm {
    name: Option<String>,
    slug: Option<String>,
    description: Option<String>,
    status: Option<String>,
    thumbnail: Option<(String, Vec<u8>)>,
    build_zip: Option<(String, Vec<u8>)>,
}

async fn read_theme_form(mut multipart: Multipart) -> Result<ThemeForm, ApiError> {
    let mut form = ThemeForm::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "name" => form.name = field.text().await.ok(),
            "slug" => form.slug = field.text().await.ok(),
            "description" => form.description = field.text().await.ok(),
            "status" => form.status = field.text().await.ok(),
            "thumbnail" => {
                let filename = field.file_name().unwrap_or("thumbnail.png").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {e}")))?;
                if !data.is_empty() {
                    form.thumbnail = Some((filename, data.to_vec()));
                }
            }
            "buildZip" => {
                let filename = field.file_name().unwrap_or("theme.zip").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {e}")))?;
                if !data.is_empty() {
                    form.build_zip = Some((filename, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Write thumbnail + archive to upload storage. Returns the public URLs.
async fn store_theme_assets(
    state: &AppState,
    slug: &str,
    form: &ThemeForm,
) -> Result<(Option<String>, Option<String>), ApiError> {
    state.storage.ensure_dirs().await.map_err(|e| {
        tracing::error!("failed to create upload dirs: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Upload storage unavailable" })),
        )
    })?;

    let mut thumbnail_url = None;
    if let Some((filename, data)) = &form.thumbnail {
        let ext = thumbnail_extension(filename);
        let path = state.storage.thumbnail_path(slug, &ext);
        tokio::fs::write(&path, data).await.map_err(|e| {
            tracing::error!(path = %path.display(), "failed to store thumbnail: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store thumbnail" })),
            )
        })?;
        thumbnail_url = Some(state.storage.thumbnail_url(slug, &ext));
    }

    let mut zip_url = None;
    if let Some((_, data)) = &form.build_zip {
        let path = state.storage.zip_path(slug);
        tokio::fs::write(&path, data).await.map_err(|e| {
            tracing::error!(path = %path.display(), "failed to store archive: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store build archive" })),
            )
        })?;
        zip_url = Some(state.storage.zip_url(slug));
    }

    Ok((thumbnail_url, zip_url))
}

// ─── Handlers ───────────────────────────────────────────────────────────

/// GET /api/v1/themes — list themes, newest first.
pub async fn list_themes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ThemeListQuery>,
) -> Result<Json<ListResponse<ThemeResponse>>, ApiError> {
    let mut themes = theme::Entity::find()
        .order_by_desc(theme::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    if let Some(search) = query.search.as_deref() {
        if !search.is_empty() {
            themes.retain(|t| matches_search(t, search));
        }
    }

    Ok(Json(ListResponse::new(
        themes.into_iter().map(ThemeResponse::from).collect(),
    )))
}

/// GET /api/v1/themes/{slug}
pub async fn get_theme(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ThemeResponse>, ApiError> {
    let model = find_theme(&state, &slug).await?;
    Ok(Json(ThemeResponse::from(model)))
}

/// POST /api/v1/themes — multipart theme upload.
///
/// Creates the registry record in `building` status and spawns the
/// background build job. Re-uploading an existing slug replaces the
/// previous record.
pub async fn upload_theme(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ThemeResponse>), ApiError> {
    let form = read_theme_form(multipart).await?;

    let name = match form.name.as_deref() {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => return Err(bad_request("Theme name is required")),
    };

    let slug = match form.slug.as_deref() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => slugify(&name),
    };
    if !is_valid_slug(&slug) {
        return Err(bad_request(format!(
            "Invalid slug '{slug}': lowercase letters, digits and hyphens, 2-64 chars"
        )));
    }

    let Some((_, zip_data)) = &form.build_zip else {
        return Err(bad_request("buildZip file is required"));
    };
    if !is_zip_archive(zip_data) {
        return Err(bad_request("buildZip is not a valid ZIP archive"));
    }

    if build_worker::is_building(&slug) {
        return Err(conflict(format!(
            "Theme '{slug}' is currently building; try again when the build finishes"
        )));
    }

    // Re-upload replaces the previous record for the same slug.
    let existing = theme::Entity::find()
        .filter(theme::Column::Slug.eq(&slug))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if let Some(old) = existing {
        tracing::info!(slug = %slug, "re-uploading theme; removing previous record");
        theme::Entity::delete_by_id(old.id)
            .exec(&state.db)
            .await
            .map_err(db_error)?;
    }

    let (thumbnail_url, zip_url) = store_theme_assets(&state, &slug, &form).await?;

    let now = chrono::Utc::now().fixed_offset();
    let new_theme = theme::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(slug.clone()),
        description: Set(Some("Queued for build (0%)".to_string())),
        thumbnail_url: Set(thumbnail_url),
        zip_url: Set(zip_url),
        status: Set(ThemeStatus::Building.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let model = new_theme.insert(&state.db).await.map_err(db_error)?;

    build_worker::try_spawn_build(state.clone(), slug.clone());

    tracing::info!(slug = %slug, theme_id = %model.id, "theme uploaded, build started");
    Ok((StatusCode::CREATED, Json(ThemeResponse::from(model))))
}

/// PUT /api/v1/themes/{slug} — multipart partial update. The slug is
/// immutable; a new `buildZip` re-triggers the build job.
pub async fn update_theme(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Json<ThemeResponse>, ApiError> {
    let existing = find_theme(&state, &slug).await?;
    let form = read_theme_form(multipart).await?;

    if let Some((_, zip_data)) = &form.build_zip {
        if !is_zip_archive(zip_data) {
            return Err(bad_request("buildZip is not a valid ZIP archive"));
        }
        if build_worker::is_building(&slug) {
            return Err(conflict(format!("Theme '{slug}' is currently building")));
        }
    }

    let current_status = ThemeStatus::from_str(&existing.status)
        .map_err(|e| bad_request(e.to_string()))?;

    if let Some(requested) = form.status.as_deref() {
        let requested =
            ThemeStatus::from_str(requested).map_err(|e| bad_request(e.to_string()))?;
        if !kx_build::lifecycle::can_transition(current_status, requested) {
            return Err(bad_request(format!(
                "Cannot change theme status from {current_status} to {requested}"
            )));
        }
    }

    let (thumbnail_url, zip_url) = store_theme_assets(&state, &slug, &form).await?;

    let rebuild = form.build_zip.is_some();
    let now = chrono::Utc::now().fixed_offset();
    let mut active: theme::ActiveModel = existing.into();
    if let Some(name) = form.name {
        if !name.trim().is_empty() {
            active.name = Set(name.trim().to_string());
        }
    }
    if let Some(description) = form.description {
        active.description = Set(Some(description));
    }
    if let Some(status) = form.status {
        active.status = Set(status);
    }
    if let Some(url) = thumbnail_url {
        active.thumbnail_url = Set(Some(url));
    }
    if let Some(url) = zip_url {
        active.zip_url = Set(Some(url));
        active.status = Set(ThemeStatus::Building.to_string());
        active.description = Set(Some("Updating theme assets... (0%)".to_string()));
    }
    active.updated_at = Set(now);

    let model = active.update(&state.db).await.map_err(db_error)?;

    if rebuild {
        build_worker::try_spawn_build(state.clone(), slug.clone());
        tracing::info!(slug = %slug, "theme archive replaced, rebuild started");
    }

    Ok(Json(ThemeResponse::from(model)))
}

/// DELETE /api/v1/themes/{slug} — permanent removal.
///
/// Refused while any store still references the theme.
pub async fn delete_theme(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = find_theme(&state, &slug).await?;

    let stores_using = store::Entity::find()
        .filter(store::Column::ThemeId.eq(existing.id))
        .count(&state.db)
        .await
        .map_err(db_error)?;
    if stores_using > 0 {
        return Err(conflict(format!(
            "Cannot delete theme. It is currently being used by {stores_using} store(s). Please unassign it first."
        )));
    }

    if let Err(e) = state.storage.remove_theme_files(&slug).await {
        // The record still goes away; leftover files are harmless.
        tracing::warn!(slug = %slug, "error cleaning up theme files: {e}");
    }

    theme::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    tracing::info!(slug = %slug, "theme deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/themes/{slug}/logs — snapshot of the build log tail.
pub async fn get_theme_logs(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !is_valid_slug(&slug) {
        return Err(bad_request("Invalid slug"));
    }

    let log = state.storage.build_log(&slug);
    let logs = match log.tail(LOG_TAIL_LINES).await {
        Ok(Some(text)) => text,
        Ok(None) => "Logs not found or build hasn't started yet.".to_string(),
        Err(e) => {
            tracing::error!(slug = %slug, "failed to read build log: {e}");
            format!("Error reading logs: {e}")
        }
    };

    Ok(Json(json!({ "logs": logs })))
}

/// GET /api/v1/themes/{slug}/preview/{*path} — serve the built theme.
///
/// Only an `active` theme can be previewed; anything else answers 409
/// with the reason.
pub async fn preview_theme(
    State(state): State<Arc<AppState>>,
    Path((slug, path)): Path<(String, String)>,
) -> Result<axum::response::Response, ApiError> {
    let model = find_theme(&state, &slug).await?;

    let status =
        ThemeStatus::from_str(&model.status).map_err(|e| bad_request(e.to_string()))?;
    if let Some(reason) = status.preview_blocked_reason() {
        return Err((StatusCode::CONFLICT, Json(json!({ "error": reason }))));
    }

    let out_dir = state.storage.output_dir(&slug);
    let root = if out_dir.is_dir() {
        out_dir
    } else {
        // Static themes are served straight from the extraction directory.
        state.storage.extract_dir(&slug)
    };

    serve_under(&root, &path).await
}

/// GET /uploads/{*path} — uploaded assets (thumbnails, archives).
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    serve_under(state.storage.base(), &path).await
}

/// POST /api/v1/themes/apply — link a theme to a store and rebuild it.
pub async fn apply_theme(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ApplyThemeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store_model = store::Entity::find()
        .filter(store::Column::Slug.eq(&body.store_slug))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Store"))?;

    let theme_model = find_theme(&state, &body.theme_slug).await?;

    let now = chrono::Utc::now().fixed_offset();
    let mut active: store::ActiveModel = store_model.into();
    active.theme_id = Set(Some(theme_model.id));
    active.updated_at = Set(now);
    active.update(&state.db).await.map_err(db_error)?;

    build_worker::try_spawn_build(state.clone(), body.theme_slug.clone());

    tracing::info!(
        store = %body.store_slug,
        theme = %body.theme_slug,
        "theme applied to store, rebuild started"
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Theme '{}' is being prepared for store '{}'", body.theme_slug, body.store_slug),
        "status": "processing"
    })))
}

// ─── Tests ──────────────────────────────────────────────────────────────
