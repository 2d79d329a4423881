//! Response parser.
//!
//! Turns the prediction service's reply envelope into a canonical
//! [`VisualizationState`]. The service has emitted two shapes over time:
//!
//! - `{"response": "<json text>"}`: the payload encoded a second time as a string
//! - `{"response": { ... }}`: the payload as a structured object
//!
//! [`read_envelope`] classifies the reply into an [`Envelope`], and
//! [`decode`] normalizes either [`ResponseShape`] into the same state. Nothing
//! downstream ever sees the wire shapes.

mod wire;

use std::fmt;

use serde_json::Value;

use crate::state::{
    self, AnalysisBundle, PLACEHOLDER, Prediction, ReasoningBundle, VisualizationState,
};

use wire::{WirePayload, WirePrediction, WireReasoning, extract_json_object};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a reply could not be turned into a [`VisualizationState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The envelope carried an `error` field.
    ServiceError(String),
    /// The envelope had neither `error` nor `response`.
    MissingResponse,
    /// The envelope or its payload could not be decoded.
    MalformedPayload(String),
    /// The payload decoded but held no predictions.
    NoPredictions,
}

impl ParseError {
    /// Message shown in the error area. Never includes raw payload text.
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceError(message) => message.clone(),
            Self::MissingResponse => "Invalid response from server".to_string(),
            Self::MalformedPayload(_) => {
                "The server returned a response that could not be read.".to_string()
            }
            Self::NoPredictions => "No predictions were returned for this phrase.".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceError(_) => "service_error",
            Self::MissingResponse => "missing_response",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::NoPredictions => "no_predictions",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceError(message) => write!(f, "service reported error: {message}"),
            Self::MissingResponse => write!(f, "envelope has no `response` field"),
            Self::MalformedPayload(detail) => write!(f, "malformed payload: {detail}"),
            Self::NoPredictions => write!(f, "payload contains no predictions"),
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level reply, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{"error": "..."}`: a service-level failure.
    Failure(String),
    /// `{"response": ...}`.
    Reply(ResponseShape),
}

/// The two observed encodings of the `response` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    StringEncoded(String),
    Structured(Value),
}

/// Classify a raw reply body.
///
/// An `error` field wins over `response` when both are present.
pub fn read_envelope(raw: &str) -> Result<Envelope, ParseError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ParseError::MalformedPayload(format!("envelope is not JSON: {e}")))?;

    let Value::Object(mut fields) = value else {
        return Err(ParseError::MalformedPayload(
            "envelope is not a JSON object".to_string(),
        ));
    };

    match fields.remove("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => return Ok(Envelope::Failure(message)),
        Some(other) => return Ok(Envelope::Failure(other.to_string())),
    }

    match fields.remove("response") {
        None | Some(Value::Null) => Err(ParseError::MissingResponse),
        Some(Value::String(text)) => Ok(Envelope::Reply(ResponseShape::StringEncoded(text))),
        Some(other) => Ok(Envelope::Reply(ResponseShape::Structured(other))),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a response payload into the canonical state for `phrase`.
pub fn decode(shape: ResponseShape, phrase: &str) -> Result<VisualizationState, ParseError> {
    let payload: WirePayload = match shape {
        ResponseShape::StringEncoded(text) => decode_string_payload(&text)?,
        ResponseShape::Structured(value) => {
            if !value.is_object() {
                return Err(ParseError::MalformedPayload(format!(
                    "response is neither a string nor an object: {}",
                    json_type_name(&value)
                )));
            }
            serde_json::from_value(value)
                .map_err(|e| ParseError::MalformedPayload(e.to_string()))?
        }
    };

    let predictions = match payload.predictions {
        Some(predictions) if !predictions.is_empty() => predictions,
        _ => return Err(ParseError::NoPredictions),
    };

    Ok(VisualizationState {
        tokens: state::tokenize(phrase),
        predictions: predictions.into_iter().map(to_prediction).collect(),
        analysis: to_analysis(payload.grammar_context, payload.reasoning),
    })
}

/// Classify and decode a raw reply body in one step.
///
/// An error envelope comes back as [`ParseError::ServiceError`].
pub fn parse(raw: &str, phrase: &str) -> Result<VisualizationState, ParseError> {
    match read_envelope(raw)? {
        Envelope::Failure(message) => Err(ParseError::ServiceError(message)),
        Envelope::Reply(shape) => decode(shape, phrase),
    }
}

/// Second-level decode of a string-encoded payload.
fn decode_string_payload(text: &str) -> Result<WirePayload, ParseError> {
    if let Ok(payload) = serde_json::from_str::<WirePayload>(text) {
        return Ok(payload);
    }

    let object = extract_json_object(text).ok_or_else(|| {
        ParseError::MalformedPayload("string response contains no JSON object".to_string())
    })?;

    serde_json::from_str(object).map_err(|e| ParseError::MalformedPayload(e.to_string()))
}

fn to_prediction(wire: WirePrediction) -> Prediction {
    Prediction {
        word: wire.word,
        confidence: wire.confidence,
        reasoning: or_placeholder(wire.reasoning),
        attention: wire.attention,
    }
}

fn to_analysis(
    grammar_context: Option<String>,
    reasoning: Option<WireReasoning>,
) -> AnalysisBundle {
    let reasoning = reasoning.unwrap_or_default();
    AnalysisBundle {
        grammar_context: or_placeholder(grammar_context),
        reasoning: ReasoningBundle {
            syntactic_analysis: or_placeholder(reasoning.syntactic_analysis),
            semantic_context: or_placeholder(reasoning.semantic_context),
            common_patterns: or_placeholder(reasoning.common_patterns),
        },
    }
}

fn or_placeholder(text: Option<String>) -> String {
    text.filter(|s| !s.is_empty())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
