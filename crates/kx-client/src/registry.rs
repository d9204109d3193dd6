//! Theme registry client.
//!
//! CRUD against the theme collection plus log fetching for the build
//! viewer. Every response body goes through the normalization adapter
//! in [`crate::unwrap`]; server-reported errors surface their message
//! verbatim.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::unwrap::{unwrap_list, unwrap_object};
use crate::upload::{ProgressFn, ProgressStream, ThemeUpload};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

/// Theme record as the registry returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub build_path: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Theme {
    /// Build progress for a `building` theme, parsed out of the
    /// description the worker keeps updating. 0 when unknown.
    pub fn build_progress(&self) -> u8 {
        self.description
            .as_deref()
            .map(kx_build::parse_progress)
            .unwrap_or(0)
    }
}

/// Partial update for an existing theme. The slug is immutable.
#[derive(Debug, Clone, Default)]
pub struct ThemePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub thumbnail: Option<(String, Vec<u8>)>,
    pub build_zip: Option<(String, Vec<u8>)>,
}

#[derive(Clone)]
pub struct ThemeRegistry {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ThemeRegistry {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Parse the body and map non-success statuses to [`ClientError::Server`].
    async fn check(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::from_response(status, &body))
        }
    }

    /// GET /themes
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Theme>, ClientError> {
        let mut request = self.http.get(self.config.endpoint("themes"));
        if let Some(search) = search {
            request = request.query(&[("search", search)]);
        }
        let body = Self::check(request.send().await?).await?;
        unwrap_list(body)
    }

    /// GET /themes/{slug}
    pub async fn get(&self, slug: &str) -> Result<Theme, ClientError> {
        let response = self
            .http
            .get(self.config.endpoint(&format!("themes/{slug}")))
            .send()
            .await?;
        unwrap_object(Self::check(response).await?)
    }

    /// POST /themes — multipart upload.
    ///
    /// Missing `build_zip` fails here, before any request is issued.
    /// `progress` receives the percentage of the archive transferred.
    pub async fn create(
        &self,
        upload: ThemeUpload,
        progress: Option<ProgressFn>,
    ) -> Result<Theme, ClientError> {
        let Some((zip_name, zip_data)) = upload.build_zip else {
            return Err(ClientError::Validation(
                "buildZip is required: pick a .zip archive before submitting".to_string(),
            ));
        };

        let mut form = Form::new()
            .text("name", upload.name)
            .text("slug", upload.slug)
            .text("description", upload.description.unwrap_or_default());

        if let Some((thumb_name, thumb_data)) = upload.thumbnail {
            form = form.part("thumbnail", Part::bytes(thumb_data).file_name(thumb_name));
        }

        let zip_len = zip_data.len() as u64;
        let zip_part = match progress {
            Some(progress) => Part::stream_with_length(
                reqwest::Body::wrap_stream(ProgressStream::new(zip_data, progress)),
                zip_len,
            ),
            None => Part::bytes(zip_data),
        };
        let zip_part = zip_part
            .file_name(zip_name)
            .mime_str("application/zip")
            .map_err(ClientError::Transport)?;
        form = form.part("buildZip", zip_part);

        let response = self
            .http
            .post(self.config.endpoint("themes"))
            .multipart(form)
            .send()
            .await?;
        unwrap_object(Self::check(response).await?)
    }

    /// PUT /themes/{slug} — partial multipart update.
    pub async fn update(&self, slug: &str, patch: ThemePatch) -> Result<Theme, ClientError> {
        let mut form = Form::new();
        if let Some(name) = patch.name {
            form = form.text("name", name);
        }
        if let Some(description) = patch.description {
            form = form.text("description", description);
        }
        if let Some(status) = patch.status {
            form = form.text("status", status);
        }
        if let Some((thumb_name, thumb_data)) = patch.thumbnail {
            form = form.part("thumbnail", Part::bytes(thumb_data).file_name(thumb_name));
        }
        if let Some((zip_name, zip_data)) = patch.build_zip {
            let part = Part::bytes(zip_data)
                .file_name(zip_name)
                .mime_str("application/zip")
                .map_err(ClientError::Transport)?;
            form = form.part("buildZip", part);
        }

        let response = self
            .http
            .put(self.config.endpoint(&format!("themes/{slug}")))
            .multipart(form)
            .send()
            .await?;
        unwrap_object(Self::check(response).await?)
    }

    /// DELETE /themes/{slug}. A 409 carries the server's explanation of
    /// which stores still reference the theme.
    pub async fn remove(&self, slug: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.config.endpoint(&format!("themes/{slug}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// POST /themes/apply
    pub async fn apply(&self, store_slug: &str, theme_slug: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.config.endpoint("themes/apply"))
            .json(&serde_json::json!({
                "storeSlug": store_slug,
                "themeSlug": theme_slug,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// GET /themes/{slug}/logs — one snapshot of the build log tail.
    pub async fn fetch_logs(&self, slug: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.config.endpoint(&format!("themes/{slug}/logs")))
            .send()
            .await?;
        let body = Self::check(response).await?;
        body.get("logs")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::Shape("logs response missing 'logs' field".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry_for(server: &MockServer) -> ThemeRegistry {
        ThemeRegistry::new(ClientConfig::new(server.uri()))
    }

    #[tokio::test]
    async fn missing_build_zip_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let upload = ThemeUpload::new("My  Theme!!");
        let err = registry.create(upload, None).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        // MockServer verifies expect(0) on drop.
    }

    #[tokio::test]
    async fn create_submits_multipart_and_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/themes"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "1", "name": "My Theme", "slug": "my-theme",
                "description": "Queued for build (0%)", "status": "building"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = std::sync::Arc::new(move |pct| sink.lock().unwrap().push(pct));

        let upload = ThemeUpload::new("My Theme").build_zip("theme.zip", vec![0u8; 150_000]);
        let theme = registry.create(upload, Some(progress)).await.unwrap();

        assert_eq!(theme.slug, "my-theme");
        assert_eq!(theme.status, "building");
        assert_eq!(*seen.lock().unwrap().last().unwrap(), 100);
    }

    #[tokio::test]
    async fn list_normalizes_envelope_and_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "1", "name": "A", "slug": "a", "status": "active"},
                    {"id": "2", "name": "B", "slug": "b", "status": "failed"}
                ],
                "total": 2
            })))
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let themes = registry.list(None).await.unwrap();
        assert_eq!(themes.len(), 2);
        assert_eq!(themes[1].status, "failed");
    }

    #[tokio::test]
    async fn remove_surfaces_conflict_message_verbatim() {
        let server = MockServer::start().await;
        let message =
            "Cannot delete theme. It is currently being used by 2 store(s). Please unassign it first.";
        Mock::given(method("DELETE"))
            .and(path("/themes/urban-kicks"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(serde_json::json!({ "error": message })),
            )
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let err = registry.remove("urban-kicks").await.unwrap_err();
        match err {
            ClientError::Server { status, message: m } => {
                assert_eq!(status, 409);
                assert_eq!(m, message);
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_logs_returns_snapshot_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/themes/my-theme/logs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "logs": "[12:00:00] --- Step 1/4: Unzipping files... ---"
            })))
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let logs = registry.fetch_logs("my-theme").await.unwrap();
        assert!(logs.contains("Step 1/4"));
    }

    #[tokio::test]
    async fn building_theme_exposes_progress() {
        let theme = Theme {
            id: "1".into(),
            name: "A".into(),
            slug: "a".into(),
            description: Some("Step 3/4: Installing dependencies... (75%)".into()),
            thumbnail_url: None,
            build_path: None,
            status: "building".into(),
            created_at: None,
        };
        assert_eq!(theme.build_progress(), 75);
    }
}
