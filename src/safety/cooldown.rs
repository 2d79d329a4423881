/// Request cooldown controller.
///
/// Gates every submission against two rules: a minimum interval between
/// accepted attempts, and at most one request in flight. The interval is
/// measured from the moment a request is *initiated*, so it rate-limits
/// attempts rather than successes.
///
/// The controller owns the only [`RequestWindow`]. Callers get an
/// [`InFlight`] guard back from [`CooldownController::attempt_submit`];
/// dropping the guard (on success, failure, or unwinding) clears the
/// in-flight flag.
///
/// # Defaults
///
/// | Parameter | Default | Description                              |
/// |-----------|---------|------------------------------------------|
/// | Window    | 3000 ms | Minimum time between accepted submissions |
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

/// Minimum interval between accepted submissions, in milliseconds.
pub const COOLDOWN_MS: u64 = 3000;

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why a submission was not allowed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// The phrase was empty after trimming.
    Empty,
    /// The cooldown window has not elapsed yet.
    TooSoon { seconds_remaining: u64 },
    /// A previous request has not resolved yet.
    Busy,
}

impl SubmitRejection {
    /// Message shown in the error area.
    pub fn user_message(&self) -> String {
        match self {
            Self::Empty => "Please enter a phrase to predict.".to_string(),
            Self::TooSoon { seconds_remaining } => {
                let unit = if *seconds_remaining == 1 { "second" } else { "seconds" };
                format!("Please wait {seconds_remaining} {unit} before submitting again.")
            }
            Self::Busy => "A prediction is already in progress. Please wait.".to_string(),
        }
    }

    /// Short machine-readable kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooSoon { .. } => "too_soon",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for SubmitRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty phrase"),
            Self::TooSoon { seconds_remaining } => {
                write!(f, "cooldown active ({seconds_remaining}s remaining)")
            }
            Self::Busy => write!(f, "request already in flight"),
        }
    }
}

impl std::error::Error for SubmitRejection {}

// ---------------------------------------------------------------------------
// Window state
// ---------------------------------------------------------------------------

/// Session-wide submission bookkeeping.
///
/// The in-flight flag is shared only with the [`InFlight`] guard handed out
/// for the current request, so nothing else can set or clear it.
#[derive(Debug, Default)]
pub struct RequestWindow {
    last_request: Option<DateTime<Utc>>,
    in_flight: Rc<Cell<bool>>,
}

/// Proof that a submission was accepted. Clears the in-flight flag on drop.
#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the in-flight slot"]
pub struct InFlight {
    flag: Rc<Cell<bool>>,
    phrase: String,
    started_at: DateTime<Utc>,
}

impl InFlight {
    /// The accepted phrase, trimmed.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Release the in-flight slot now. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CooldownController {
    window: RequestWindow,
    cooldown: Duration,
}

impl Default for CooldownController {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownController {
    /// Controller with the default [`COOLDOWN_MS`] window.
    pub fn new() -> Self {
        Self::with_window_ms(COOLDOWN_MS)
    }

    pub fn with_window_ms(window_ms: u64) -> Self {
        let window_ms = i64::try_from(window_ms).unwrap_or(i64::MAX);
        Self {
            window: RequestWindow::default(),
            cooldown: Duration::milliseconds(window_ms),
        }
    }

    /// Try to start a submission at `now`.
    ///
    /// Checks run in order: empty phrase, request in flight, cooldown. On
    /// acceptance the in-flight flag is set and `now` becomes the start of
    /// the next cooldown window before this function returns.
    pub fn attempt_submit(
        &mut self,
        phrase: &str,
        now: DateTime<Utc>,
    ) -> Result<InFlight, SubmitRejection> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(SubmitRejection::Empty);
        }

        if self.window.in_flight.get() {
            return Err(SubmitRejection::Busy);
        }

        if let Some(seconds_remaining) = self.seconds_remaining(now) {
            return Err(SubmitRejection::TooSoon { seconds_remaining });
        }

        self.window.in_flight.set(true);
        self.window.last_request = Some(now);

        Ok(InFlight {
            flag: Rc::clone(&self.window.in_flight),
            phrase: phrase.to_string(),
            started_at: now,
        })
    }

    /// Whole seconds until the cooldown expires, or `None` if it already has.
    ///
    /// A clock that moved backwards counts as zero elapsed time.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        let last = self.window.last_request?;
        let elapsed = (now - last).max(Duration::zero());
        if elapsed >= self.cooldown {
            return None;
        }

        let remaining_ms = (self.cooldown - elapsed).num_milliseconds().max(0) as u64;
        Some(remaining_ms.div_ceil(1000))
    }

    pub fn is_in_flight(&self) -> bool {
        self.window.in_flight.get()
    }

    pub fn last_request(&self) -> Option<DateTime<Utc>> {
        self.window.last_request
    }

    pub fn window_ms(&self) -> i64 {
        self.cooldown.num_milliseconds()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
