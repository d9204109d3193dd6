//! Store client helpers.

use crate::config::ClientConfig;
use crate::countdown::DeleteCountdown;
use crate::error::ClientError;
use crate::unwrap::unwrap_list;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub theme_id: Option<String>,
    pub status: String,
}

#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl StoreClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn check(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::from_response(status, &body))
        }
    }

    /// GET /stores
    pub async fn list(&self) -> Result<Vec<StoreView>, ClientError> {
        let response = self.http.get(self.config.endpoint("stores")).send().await?;
        unwrap_list(Self::check(response).await?)
    }

    /// DELETE /stores/{slug}, gated by the armed countdown: the call is
    /// refused locally until the confirmation delay has elapsed.
    pub async fn remove(
        &self,
        slug: &str,
        confirmation: &DeleteCountdown,
    ) -> Result<(), ClientError> {
        if !confirmation.is_ready() {
            return Err(ClientError::Validation(format!(
                "deletion not confirmed yet; wait {}s",
                confirmation.remaining().as_secs() + 1
            )));
        }

        let response = self
            .http
            .delete(self.config.endpoint(&format!("stores/{slug}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
