/// HTTP client for the prediction service.
///
/// Uses the synchronous `ureq` client. Non-success statuses are returned as
/// a [`RawReply`] so the caller can still look for an `{"error": ...}`
/// envelope in the body; only failures that produce no reply at all become
/// a [`NetworkError`].
///
/// There is no timeout unless one is configured: a hung call stays pending
/// until the transport resolves it.
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::ServiceConfig;

use super::{NetworkError, PredictionService, RawReply};

/// Request body for `POST /predict`.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    phrase: &'a str,
}

/// Synchronous prediction service client.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpPredictionClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let timeout = (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms));
        Self {
            endpoint: config.endpoint(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check whether anything is listening at the service's base address.
    ///
    /// Any HTTP response counts, including 404/405: the predict route only
    /// accepts `POST`. Uses a short fixed timeout.
    pub fn is_reachable(&self) -> bool {
        // On Windows, "localhost" may try IPv6 (::1) first, causing delays.
        let url = self.endpoint.replace("://localhost", "://127.0.0.1");
        match ureq::get(&url).timeout(Duration::from_secs(5)).call() {
            Ok(_) | Err(ureq::Error::Status(_, _)) => true,
            Err(ureq::Error::Transport(_)) => false,
        }
    }
}

impl PredictionService for HttpPredictionClient {
    fn predict(&self, phrase: &str) -> Result<RawReply, NetworkError> {
        let mut request = ureq::post(&self.endpoint).set("Content-Type", "application/json");
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        match request.send_json(PredictRequest { phrase }) {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| NetworkError(format!("failed reading response body: {e}")))?;
                Ok(RawReply { status, body })
            }
            Err(ureq::Error::Status(status, response)) => {
                // The body may still hold an error envelope; an unreadable
                // body just means there is none.
                let body = response.into_string().unwrap_or_default();
                Ok(RawReply { status, body })
            }
            Err(ureq::Error::Transport(transport)) => Err(NetworkError(transport.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config() {
        let client = HttpPredictionClient::from_config(&ServiceConfig::default());
        assert_eq!(client.endpoint(), "http://127.0.0.1:5000/predict");
        assert_eq!(client.timeout, None);
    }

    #[test]
    fn client_uses_configured_timeout() {
        let config = ServiceConfig {
            timeout_ms: 2500,
            ..ServiceConfig::default()
        };
        let client = HttpPredictionClient::from_config(&config);
        assert_eq!(client.timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_string(&PredictRequest { phrase: "the cat" }).unwrap();
        assert_eq!(json, r#"{"phrase":"the cat"}"#);
    }

    #[test]
    fn unreachable_service_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let config = ServiceConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 2000,
            ..ServiceConfig::default()
        };
        let client = HttpPredictionClient::from_config(&config);
        assert!(client.predict("the cat").is_err());
    }
}
