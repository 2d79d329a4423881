//! Request lifecycle: gate, call, parse, store, render.
//!
//! A [`Session`] owns every piece of mutable client state (the cooldown
//! window, the state store, the render pipeline) and is driven from a single
//! thread. A submission is split in two so the network call can happen
//! elsewhere:
//!
//! 1. [`Session::begin`] gates the phrase and returns a [`PendingRequest`]
//!    holding the in-flight guard.
//! 2. [`Session::complete`] takes the pending request and whatever the
//!    transport produced, then updates state and views. The guard is dropped
//!    on every path through `complete`, so the session is always left
//!    submittable.
//!
//! [`Session::submit`] runs both halves back to back for synchronous callers.

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::config::schema::WordlensConfig;
use crate::diagnostics::DiagnosticLog;
use crate::parser::{self, Envelope, ParseError};
use crate::render::RenderPipeline;
use crate::render::surface::{MountPoint, Surface};
use crate::safety::cooldown::{CooldownController, InFlight, SubmitRejection};
use crate::service::{NetworkError, PredictionService, RawReply};
use crate::state::{StateStore, VisualizationState};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A submission that was accepted but did not produce a new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Non-success HTTP status without an error envelope.
    Transport { status: u16 },
    /// The call never produced a reply.
    Network(String),
    Parse(ParseError),
}

impl RequestError {
    /// Message shown in the error area.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { status } => {
                format!("The prediction service returned HTTP {status}. Please try again.")
            }
            Self::Network(_) => {
                "Could not reach the prediction service. Please try again.".to_string()
            }
            Self::Parse(e) => e.user_message(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport_failure",
            Self::Network(_) => "network_error",
            Self::Parse(e) => e.kind(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { status } => write!(f, "service replied with HTTP {status}"),
            Self::Network(detail) => write!(f, "network error: {detail}"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for RequestError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<NetworkError> for RequestError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e.0)
    }
}

/// Turn a transport result into a state, or classify why it could not be.
///
/// Precedence: an `{"error": ...}` envelope is a service error whatever the
/// status; otherwise a non-success status is a transport failure; otherwise
/// the body is parsed.
pub fn classify_reply(
    outcome: Result<RawReply, NetworkError>,
    phrase: &str,
) -> Result<VisualizationState, RequestError> {
    let reply = outcome?;
    let envelope = parser::read_envelope(&reply.body);

    if let Ok(Envelope::Failure(message)) = envelope {
        return Err(ParseError::ServiceError(message).into());
    }
    if !reply.is_success() {
        return Err(RequestError::Transport {
            status: reply.status,
        });
    }

    match envelope? {
        Envelope::Failure(message) => Err(ParseError::ServiceError(message).into()),
        Envelope::Reply(shape) => Ok(parser::decode(shape, phrase)?),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An accepted submission waiting for its reply.
#[derive(Debug)]
#[must_use = "a pending request holds the in-flight slot until completed"]
pub struct PendingRequest {
    guard: InFlight,
}

impl PendingRequest {
    pub fn phrase(&self) -> &str {
        self.guard.phrase()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.guard.started_at()
    }
}

/// Result of a synchronous submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    Rendered(Rc<VisualizationState>),
    Rejected(SubmitRejection),
    Failed(RequestError),
}

impl SubmitOutcome {
    /// The message shown in the error area, if any.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Rendered(_) => None,
            Self::Rejected(rejection) => Some(rejection.user_message()),
            Self::Failed(error) => Some(error.user_message()),
        }
    }
}

pub struct Session {
    cooldown: CooldownController,
    store: StateStore,
    pipeline: RenderPipeline,
    diagnostics: DiagnosticLog,
}

impl Session {
    pub fn new(config: &WordlensConfig) -> Self {
        Self::with_parts(
            CooldownController::with_window_ms(config.cooldown.window_ms),
            RenderPipeline::new(config.render.clone()),
            DiagnosticLog::from_config(&config.logging),
        )
    }

    pub fn with_parts(
        cooldown: CooldownController,
        pipeline: RenderPipeline,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            cooldown,
            store: StateStore::new(),
            pipeline,
            diagnostics,
        }
    }

    /// Gate a submission at `now`.
    ///
    /// A rejection is shown in the error area and logged; the current state
    /// and views are left as they are.
    pub fn begin(
        &mut self,
        phrase: &str,
        now: DateTime<Utc>,
        surface: &mut dyn Surface,
    ) -> Result<PendingRequest, SubmitRejection> {
        match self.cooldown.attempt_submit(phrase, now) {
            Ok(guard) => {
                surface.set_loading(true);
                surface.set_visible(MountPoint::ErrorDisplay, false);
                surface.set_visible(MountPoint::Results, false);
                Ok(PendingRequest { guard })
            }
            Err(rejection) => {
                self.diagnostics
                    .record(rejection.kind(), phrase, &rejection.to_string(), None);
                show_error(surface, &rejection.user_message());
                Err(rejection)
            }
        }
    }

    /// Resolve a pending request with its transport outcome.
    ///
    /// Success replaces the state and shows the results. Any failure resets
    /// the state, renders placeholders and shows one message. Either way the
    /// in-flight slot is released and the loading indicator cleared.
    pub fn complete(
        &mut self,
        pending: PendingRequest,
        outcome: Result<RawReply, NetworkError>,
        surface: &mut dyn Surface,
    ) -> Result<Rc<VisualizationState>, RequestError> {
        let PendingRequest { guard } = pending;
        let result = self.resolve(guard.phrase(), outcome, surface);

        guard.release();
        surface.set_loading(false);
        result
    }

    /// Apply a transport outcome for `phrase` without gating it.
    ///
    /// Used by [`complete`](Self::complete) and for replies loaded from disk.
    /// A failure is recorded in the diagnostics log with the raw body, then
    /// the state is reset.
    pub fn resolve(
        &mut self,
        phrase: &str,
        outcome: Result<RawReply, NetworkError>,
        surface: &mut dyn Surface,
    ) -> Result<Rc<VisualizationState>, RequestError> {
        let raw = outcome.as_ref().ok().map(|reply| reply.body.clone());

        match classify_reply(outcome, phrase) {
            Ok(state) => Ok(self.show(state, surface)),
            Err(error) => {
                self.diagnostics
                    .record(error.kind(), phrase, &error.to_string(), raw.as_deref());
                self.fail(&error, surface);
                Err(error)
            }
        }
    }

    /// Gate, call `service`, and complete, using the current time.
    pub fn submit(
        &mut self,
        service: &dyn PredictionService,
        phrase: &str,
        surface: &mut dyn Surface,
    ) -> SubmitOutcome {
        self.submit_at(service, phrase, Utc::now(), surface)
    }

    pub fn submit_at(
        &mut self,
        service: &dyn PredictionService,
        phrase: &str,
        now: DateTime<Utc>,
        surface: &mut dyn Surface,
    ) -> SubmitOutcome {
        let pending = match self.begin(phrase, now, surface) {
            Ok(pending) => pending,
            Err(rejection) => return SubmitOutcome::Rejected(rejection),
        };

        let outcome = service.predict(pending.phrase());
        match self.complete(pending, outcome, surface) {
            Ok(state) => SubmitOutcome::Rendered(state),
            Err(error) => SubmitOutcome::Failed(error),
        }
    }

    /// Replace the state with `state`, render, and reveal the results.
    pub fn show(
        &mut self,
        state: VisualizationState,
        surface: &mut dyn Surface,
    ) -> Rc<VisualizationState> {
        let snapshot = self.store.replace(state);
        self.pipeline.render(&snapshot, surface);
        surface.set_visible(MountPoint::Results, true);
        snapshot
    }

    /// Reset to placeholders and show `error`.
    pub fn fail(&mut self, error: &RequestError, surface: &mut dyn Surface) {
        let snapshot = self.store.reset();
        self.pipeline.render(&snapshot, surface);
        surface.set_visible(MountPoint::Results, false);
        show_error(surface, &error.user_message());
    }

    pub fn snapshot(&self) -> Rc<VisualizationState> {
        self.store.snapshot()
    }

    pub fn is_in_flight(&self) -> bool {
        self.cooldown.is_in_flight()
    }

    pub fn cooldown(&self) -> &CooldownController {
        &self.cooldown
    }
}

fn show_error(surface: &mut dyn Surface, message: &str) {
    surface.set_text(MountPoint::ErrorDisplay, message);
    surface.set_visible(MountPoint::ErrorDisplay, true);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::config::schema::RenderConfig;
    use crate::render::surface::HtmlSurface;

    const GOOD: &str = r#"{"response": {"predictions": [{"word": "sat", "confidence": 0.9}]}}"#;

    fn session() -> Session {
        Session::with_parts(
            CooldownController::new(),
            RenderPipeline::new(RenderConfig::default()),
            DiagnosticLog::disabled(),
        )
    }

    fn reply(status: u16, body: &str) -> Result<RawReply, NetworkError> {
        Ok(RawReply {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn error_envelope_wins_over_status() {
        let err = classify_reply(reply(500, r#"{"error": "model offline"}"#), "x").unwrap_err();
        assert_eq!(err, RequestError::Parse(ParseError::ServiceError("model offline".into())));
        assert_eq!(err.user_message(), "model offline");
    }

    #[test]
    fn bad_status_without_error_is_transport() {
        let err = classify_reply(reply(502, "<html>bad gateway</html>"), "x").unwrap_err();
        assert_eq!(err, RequestError::Transport { status: 502 });
        assert_eq!(err.kind(), "transport_failure");
    }

    #[test]
    fn network_error_is_its_own_class() {
        let err = classify_reply(Err(NetworkError("refused".into())), "x").unwrap_err();
        assert_eq!(err.kind(), "network_error");
        assert!(!err.user_message().contains("refused"));
    }

    #[test]
    fn success_shows_results_and_clears_loading() {
        let mut session = session();
        let mut surface = HtmlSurface::new();
        let now = Utc::now();

        let pending = session.begin("the cat", now, &mut surface).unwrap();
        assert!(surface.is_loading());
        assert!(session.is_in_flight());

        let state = session.complete(pending, reply(200, GOOD), &mut surface).unwrap();
        assert_eq!(state.tokens, vec!["the", "cat"]);
        assert!(!surface.is_loading());
        assert!(!session.is_in_flight());
        assert!(surface.is_visible(MountPoint::Results));
        assert!(!surface.is_visible(MountPoint::ErrorDisplay));
    }

    #[test]
    fn failure_resets_state_and_shows_one_message() {
        let mut session = session();
        let mut surface = HtmlSurface::new();
        let now = Utc::now();

        let pending = session.begin("the cat", now, &mut surface).unwrap();
        session.complete(pending, reply(200, GOOD), &mut surface).unwrap();

        let later = now + Duration::seconds(5);
        let pending = session.begin("the cat", later, &mut surface).unwrap();
        let err = session
            .complete(pending, reply(200, r#"{"response": {"predictions": []}}"#), &mut surface)
            .unwrap_err();

        assert_eq!(err, RequestError::Parse(ParseError::NoPredictions));
        assert!(session.snapshot().is_empty());
        assert!(surface.is_visible(MountPoint::ErrorDisplay));
        assert_eq!(surface.markup(MountPoint::ErrorDisplay), err.user_message());
        assert!(!session.is_in_flight());
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let mut session = session();
        let mut surface = HtmlSurface::new();
        let now = Utc::now();

        let pending = session.begin("the cat", now, &mut surface).unwrap();
        session.complete(pending, reply(200, GOOD), &mut surface).unwrap();

        let rejection = session
            .begin("the dog", now + Duration::seconds(1), &mut surface)
            .unwrap_err();
        assert_eq!(rejection, SubmitRejection::TooSoon { seconds_remaining: 2 });
        assert_eq!(session.snapshot().predictions[0].word, "sat");
        assert!(surface.is_visible(MountPoint::ErrorDisplay));
    }
}
