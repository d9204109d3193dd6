//! Client configuration.
//!
//! Read from the environment once, then passed down explicitly;
//! data-fetch code never reaches into ambient globals.

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL including the version prefix, without a trailing
    /// slash (e.g. `http://localhost:8000/api/v1`).
    pub api_url: String,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        let mut api_url = api_url.into();
        while api_url.ends_with('/') {
            api_url.pop();
        }
        Self { api_url }
    }

    pub fn from_env() -> Self {
        let api_url = std::env::var("KX_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_string());
        Self::new(api_url)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_double_slashes() {
        let config = ClientConfig::new("http://localhost:8000/api/v1/");
        assert_eq!(
            config.endpoint("themes"),
            "http://localhost:8000/api/v1/themes"
        );
        assert_eq!(
            config.endpoint("/themes/urban-kicks/logs"),
            "http://localhost:8000/api/v1/themes/urban-kicks/logs"
        );
    }
}
