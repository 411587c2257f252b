use crate::error::ApiError;
use crate::models::HealthResponse;

/// Backend reachability as shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Checking,
    Connected,
    Warning,
    Error,
}

impl ConnectionStatus {
    /// Coarse mapping: "ok"/"healthy" is connected, any other reported status
    /// is a warning, and a failed check is an error.
    pub fn from_health(result: &Result<HealthResponse, ApiError>) -> Self {
        match result {
            Ok(health) if health.is_healthy() => ConnectionStatus::Connected,
            Ok(_) => ConnectionStatus::Warning,
            Err(_) => ConnectionStatus::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Checking => "Checking...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Warning => "Unstable connection",
            ConnectionStatus::Error => "Disconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(status: &str) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: status.to_string(),
            version: None,
            knowledge_base_loaded: None,
        })
    }

    #[test]
    fn test_three_way_mapping() {
        assert_eq!(ConnectionStatus::from_health(&health("ok")), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_health(&health("healthy")), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_health(&health("down")), ConnectionStatus::Warning);
        assert_eq!(ConnectionStatus::from_health(&health("degraded")), ConnectionStatus::Warning);

        let failed = Err(ApiError::HealthCheckFailed("refused".into()));
        assert_eq!(ConnectionStatus::from_health(&failed), ConnectionStatus::Error);
    }
}
