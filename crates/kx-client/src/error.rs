use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any network request was issued.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status. The message is
    /// taken verbatim from the response body when one is present.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl ClientError {
    /// Build a [`ClientError::Server`] from a response body, preferring
    /// the body's own `error`/`detail` message.
    pub(crate) fn from_response(status: reqwest::StatusCode, body: &serde_json::Value) -> Self {
        let message = body
            .get("error")
            .or_else(|| body.get("detail"))
            .and_then(|v| v.as_str())
            .unwrap_or("request failed")
            .to_string();
        ClientError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_error_field() {
        let err = ClientError::from_response(
            reqwest::StatusCode::CONFLICT,
            &json!({ "error": "Cannot delete theme. It is currently being used by 2 store(s). Please unassign it first." }),
        );
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 409);
                assert!(message.starts_with("Cannot delete theme"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn falls_back_to_detail_then_generic() {
        let err = ClientError::from_response(
            reqwest::StatusCode::BAD_REQUEST,
            &json!({ "detail": "Store not found" }),
        );
        assert!(matches!(err, ClientError::Server { message, .. } if message == "Store not found"));

        let err =
            ClientError::from_response(reqwest::StatusCode::BAD_GATEWAY, &serde_json::Value::Null);
        assert!(matches!(err, ClientError::Server { message, .. } if message == "request failed"));
    }
}
