//! JSON API handlers for the dashboard.
//!
//! Each handler returns a `Response<Cursor<Vec<u8>>>`; the frame endpoint
//! returns SVG instead of JSON.

use std::collections::BTreeMap;
use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::render::surface::MountPoint;
use crate::service::HttpPredictionClient;
use crate::state::VisualizationState;

use super::{Dashboard, Dispatched, content_type_json, content_type_svg};

// ---------------------------------------------------------------------------
// JSON request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PredictBody {
    #[serde(default)]
    phrase: String,
}

/// One mount point as the frontend applies it.
#[derive(Serialize)]
struct MountView {
    html: String,
    visible: bool,
}

/// Current contents of every mount point.
#[derive(Serialize)]
struct ViewsResponse {
    in_flight: bool,
    loading: bool,
    mounts: BTreeMap<&'static str, MountView>,
}

#[derive(Serialize)]
struct PredictResponse {
    /// `"accepted"` or `"rejected"`.
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    views: ViewsResponse,
}

#[derive(Serialize)]
struct StateResponse<'a> {
    in_flight: bool,
    state: &'a VisualizationState,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn bad_request(message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(400))
}

fn views(dashboard: &Dashboard) -> ViewsResponse {
    let surface = dashboard.surface();
    ViewsResponse {
        in_flight: dashboard.is_in_flight(),
        loading: surface.is_loading(),
        mounts: MountPoint::ALL
            .iter()
            .map(|&mount| {
                (
                    mount.id(),
                    MountView {
                        html: surface.markup(mount),
                        visible: surface.is_visible(mount),
                    },
                )
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `POST /api/predict`: gate a phrase and start the call.
pub fn post_predict(
    dashboard: &mut Dashboard,
    client: &HttpPredictionClient,
    body: &str,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let Ok(request) = serde_json::from_str::<PredictBody>(body) else {
        return Ok(bad_request("expected a JSON body like {\"phrase\": \"...\"}"));
    };

    let (status, message) = match dashboard.submit(client, &request.phrase, Utc::now()) {
        Dispatched::Accepted => ("accepted", None),
        Dispatched::Rejected(rejection) => ("rejected", Some(rejection.user_message())),
    };

    json_response(&PredictResponse {
        status,
        message,
        views: views(dashboard),
    })
}

/// `GET /api/views`: every mount point's current content.
pub fn get_views(dashboard: &Dashboard) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&views(dashboard))
}

/// `GET /api/frame`: one attention graph frame.
pub fn get_frame(dashboard: &mut Dashboard) -> Result<Response<Cursor<Vec<u8>>>> {
    let svg = dashboard.frame();
    Ok(Response::from_data(svg.into_bytes())
        .with_header(content_type_svg())
        .with_status_code(StatusCode(200)))
}

/// `GET /api/state`: the current visualization state.
pub fn get_state(dashboard: &Dashboard) -> Result<Response<Cursor<Vec<u8>>>> {
    let snapshot = dashboard.snapshot();
    json_response(&StateResponse {
        in_flight: dashboard.is_in_flight(),
        state: &snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::WordlensConfig;

    #[test]
    fn views_cover_every_mount() {
        let dashboard = Dashboard::new(&WordlensConfig::default());
        let json = serde_json::to_value(views(&dashboard)).unwrap();
        for mount in MountPoint::ALL {
            assert!(json["mounts"].get(mount.id()).is_some(), "missing {}", mount.id());
        }
        assert_eq!(json["mounts"]["results"]["visible"], false);
        assert_eq!(json["in_flight"], false);
    }

    #[test]
    fn empty_phrase_is_rejected_without_network() {
        let mut config = WordlensConfig::default();
        config.logging.enabled = false;
        let mut dashboard = Dashboard::new(&config);
        let client = HttpPredictionClient::from_config(&config.service);

        let resp = post_predict(&mut dashboard, &client, r#"{"phrase": "   "}"#).unwrap();
        assert_eq!(resp.status_code(), StatusCode(200));
        assert!(!dashboard.is_in_flight());
        assert!(dashboard.surface().is_visible(MountPoint::ErrorDisplay));
    }

    #[test]
    fn garbage_body_is_bad_request() {
        let mut dashboard = Dashboard::new(&WordlensConfig::default());
        let client = HttpPredictionClient::from_config(&WordlensConfig::default().service);
        let resp = post_predict(&mut dashboard, &client, "not json").unwrap();
        assert_eq!(resp.status_code(), StatusCode(400));
    }
}
