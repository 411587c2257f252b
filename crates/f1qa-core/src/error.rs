use thiserror::Error;

/// Failures surfaced by the request layer.
///
/// `Timeout`, `Network`, `Http` and `Decode` come straight out of
/// [`ApiClient::send`](crate::api::ApiClient::send). The remaining variants are
/// produced by the endpoint helpers when they translate a raw failure into
/// something the conversation can show.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("connection error: cannot reach the server ({0})")]
    Network(String),

    #[error("{detail}")]
    Http { status: u16, detail: String },

    #[error("could not decode server response: {0}")]
    Decode(String),

    #[error("invalid question: {0}")]
    InvalidInput(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("cannot connect to the server: {0}")]
    ConnectionError(String),

    #[error("health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("could not fetch entities of type {entity_type}: {reason}")]
    EntitiesUnavailable { entity_type: String, reason: String },

    #[error("could not explore the semantic network: {0}")]
    ExploreFailed(String),
}

impl ApiError {
    /// Text shown inline in the conversation when a question fails.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Timeout(_) => "The request took too long. Please try again.".to_string(),
            ApiError::Network(_) | ApiError::ConnectionError(_) => {
                "Cannot connect to the server. Check your connection.".to_string()
            }
            ApiError::InvalidInput(_) => {
                "Invalid question. Please rephrase your question.".to_string()
            }
            ApiError::ServerError(_) => {
                "Server error. Please try again later.".to_string()
            }
            ApiError::HealthCheckFailed(_) => "Unable to verify the server status.".to_string(),
            ApiError::Http { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::InvalidInput(_) => Some(400),
            ApiError::ServerError(_) => Some(500),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_displays_detail() {
        let err = ApiError::Http {
            status: 404,
            detail: "Node 'x' not found".to_string(),
        };
        assert_eq!(err.to_string(), "Node 'x' not found");
        assert_eq!(err.user_message(), "Node 'x' not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_timeout_and_network_are_distinct() {
        let timeout = ApiError::Timeout(30_000);
        let network = ApiError::Network("refused".to_string());
        assert_ne!(timeout.user_message(), network.user_message());
        assert!(timeout.to_string().contains("30000"));
    }
}
