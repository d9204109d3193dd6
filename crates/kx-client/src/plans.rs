//! Plan views and billing helpers.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::unwrap::unwrap_list;
use serde::Deserialize;
use serde_json::Value;

/// Plan as the billing screens consume it. Unknown fields (like the
/// server's own computed savings) are ignored; the view recomputes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub id: String,
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    pub active: bool,
}

impl PlanView {
    /// Savings of a yearly cycle against twelve monthly cycles.
    pub fn yearly_savings(&self) -> i64 {
        self.price_monthly * 12 - self.price_yearly
    }

    /// Badge shown under the yearly billing toggle.
    pub fn savings_label(&self) -> String {
        format!("Save ₹{}/yr", self.yearly_savings())
    }
}

#[derive(Clone)]
pub struct PlanClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl PlanClient {
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

    /// GET /plans
    pub async fn list(&self) -> Result<Vec<PlanView>, ClientError> {
        let response = self.http.get(self.config.endpoint("plans")).send().await?;
        unwrap_list(Self::check(response).await?)
    }

    /// Toggle a plan's active flag optimistically: the local view flips
    /// immediately and is rolled back when the server rejects the call.
    pub async fn toggle_active(&self, plan: &mut PlanView) -> Result<(), ClientError> {
        let previous = plan.active;
        plan.active = !previous;

        let result = async {
            let response = self
                .http
                .put(self.config.endpoint(&format!("plans/{}", plan.id)))
                .json(&serde_json::json!({ "active": plan.active }))
                .send()
                .await?;
            Self::check(response).await?;
            Ok(())
        }
        .await;

        if result.is_err() {
            plan.active = previous;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn plan() -> PlanView {
        PlanView {
            id: "growth".into(),
            name: "Growth".into(),
            price_monthly: 500,
            price_yearly: 4800,
            active: true,
        }
    }

    #[test]
    fn yearly_savings_and_label() {
        let plan = plan();
        assert_eq!(plan.yearly_savings(), 1200);
        assert_eq!(plan.savings_label(), "Save ₹1200/yr");
    }

    #[test]
    fn negative_savings_render_too() {
        let mut plan = plan();
        plan.price_yearly = 7000;
        assert_eq!(plan.yearly_savings(), -1000);
    }

    #[tokio::test]
    async fn toggle_commits_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/plans/growth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = PlanClient::new(ClientConfig::new(server.uri()));
        let mut plan = plan();
        client.toggle_active(&mut plan).await.unwrap();
        assert!(!plan.active);
    }

    #[tokio::test]
    async fn toggle_reverts_on_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/plans/growth"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "DB error" })),
            )
            .mount(&server)
            .await;

        let client = PlanClient::new(ClientConfig::new(server.uri()));
        let mut plan = plan();
        let err = client.toggle_active(&mut plan).await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 500, .. }));
        assert!(plan.active, "optimistic flip was not rolled back");
    }
}
