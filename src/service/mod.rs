//! Prediction service boundary.
//!
//! The service is an opaque HTTP endpoint: one `POST` with `{"phrase": ...}`
//! in, one JSON envelope out. [`PredictionService`] is the seam the session
//! talks to; [`client::HttpPredictionClient`] is the real transport, and tests
//! substitute an in-process stub.

pub mod client;

use std::fmt;

pub use client::HttpPredictionClient;

/// A reply that made it back over the wire, successful status or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The call never produced a reply (connection refused, DNS, reset, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError(pub String);

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network error: {}", self.0)
    }
}

impl std::error::Error for NetworkError {}

/// Anything that can answer a phrase with a raw reply.
pub trait PredictionService {
    fn predict(&self, phrase: &str) -> Result<RawReply, NetworkError>;
}

impl<T: PredictionService + ?Sized> PredictionService for &T {
    fn predict(&self, phrase: &str) -> Result<RawReply, NetworkError> {
        (**self).predict(phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(RawReply::ok("{}").is_success());
        assert!(
            RawReply {
                status: 204,
                body: String::new()
            }
            .is_success()
        );
        assert!(
            !RawReply {
                status: 500,
                body: String::new()
            }
            .is_success()
        );
    }
}
