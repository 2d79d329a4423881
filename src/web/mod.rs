//! Local dashboard for wordlens.
//!
//! A sequential HTTP server (`tiny_http`) hosting the single-page frontend
//! plus a small JSON API. The server loop is the one thread that owns the
//! [`Session`]; the only work that leaves it is the prediction call itself,
//! which runs on a transport thread and hands its reply back over a channel.
//!
//! Launched via `wordlens serve` (default: `http://127.0.0.1:9747`).

mod api;
pub mod frontend;

use std::io::{Cursor, Read};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::config::schema::WordlensConfig;
use crate::render::attention::{AttentionRenderer, SvgCanvas};
use crate::render::surface::HtmlSurface;
use crate::safety::cooldown::SubmitRejection;
use crate::service::{HttpPredictionClient, NetworkError, PredictionService, RawReply};
use crate::session::{PendingRequest, RequestError, Session};
use crate::state::VisualizationState;

/// How long the server loop blocks waiting for a request before it checks
/// for finished predictions.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

type Completion = Result<RawReply, NetworkError>;

/// What happened to a dashboard submission.
#[derive(Debug)]
pub enum Dispatched {
    /// The call is running on a transport thread.
    Accepted,
    Rejected(SubmitRejection),
}

/// Everything the server loop owns.
pub struct Dashboard {
    session: Session,
    surface: HtmlSurface,
    graph: AttentionRenderer,
    pending: Option<PendingRequest>,
    last_error: Option<RequestError>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    frame_interval_ms: u64,
}

impl Dashboard {
    pub fn new(config: &WordlensConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::channel();
        Self {
            session: Session::new(config),
            surface: HtmlSurface::new(),
            graph: AttentionRenderer::new(config.graph.clone(), config.render.attention),
            pending: None,
            last_error: None,
            completions_tx,
            completions_rx,
            frame_interval_ms: config.graph.frame_interval_ms,
        }
    }

    /// Gate `phrase` and, if accepted, start the call on its own thread.
    pub fn submit<S>(&mut self, service: &S, phrase: &str, now: DateTime<Utc>) -> Dispatched
    where
        S: PredictionService + Clone + Send + 'static,
    {
        let pending = match self.session.begin(phrase, now, &mut self.surface) {
            Ok(pending) => pending,
            Err(rejection) => return Dispatched::Rejected(rejection),
        };

        let service = service.clone();
        let phrase = pending.phrase().to_string();
        let tx = self.completions_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(service.predict(&phrase));
        });

        self.pending = Some(pending);
        Dispatched::Accepted
    }

    /// Apply any finished call. Returns `true` if one was applied.
    pub fn drain_completions(&mut self) -> bool {
        match self.completions_rx.try_recv() {
            Ok(outcome) => self.apply(outcome),
            Err(_) => false,
        }
    }

    /// Block up to `timeout` for the in-flight call to finish and apply it.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        match self.completions_rx.recv_timeout(timeout) {
            Ok(outcome) => self.apply(outcome),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    fn apply(&mut self, outcome: Completion) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        self.last_error = self
            .session
            .complete(pending, outcome, &mut self.surface)
            .err();
        true
    }

    /// Draw one attention-graph frame from the current snapshot.
    pub fn frame(&mut self) -> String {
        let snapshot = self.session.snapshot();
        let mut canvas = SvgCanvas::new();
        self.graph.tick(&snapshot, &mut canvas);
        canvas.finish()
    }

    pub fn surface(&self) -> &HtmlSurface {
        &self.surface
    }

    pub fn snapshot(&self) -> Rc<VisualizationState> {
        self.session.snapshot()
    }

    pub fn is_in_flight(&self) -> bool {
        self.session.is_in_flight()
    }

    pub fn last_error(&self) -> Option<&RequestError> {
        self.last_error.as_ref()
    }

    pub fn frame_interval_ms(&self) -> u64 {
        self.frame_interval_ms
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on `addr`.
///
/// Blocks the current thread. Requests are handled one at a time; errors are
/// answered per request without stopping the server.
pub fn serve(config: &WordlensConfig, addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    let client = HttpPredictionClient::from_config(&config.service);
    let mut dashboard = Dashboard::new(config);

    println!("wordlens dashboard running at http://{addr}");
    println!("Prediction service: {}", client.endpoint());
    println!("Press Ctrl+C to stop.\n");

    if config.web.open_browser {
        let _ = open_browser(&format!("http://{addr}"));
    }

    loop {
        dashboard.drain_completions();

        let mut request = match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => return Err(e).context("failed to receive HTTP request"),
        };

        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let result = dispatch(&mut dashboard, &client, &method, &url, body.as_deref());

        match result {
            Ok(resp) => {
                let _ = request.respond(resp);
            }
            Err(e) => {
                let body = serde_json::json!({ "error": e.to_string() }).to_string();
                let resp = Response::from_data(body.into_bytes())
                    .with_header(content_type_json())
                    .with_status_code(StatusCode(500));
                let _ = request.respond(resp);
            }
        }

        // Frame polling would drown out everything else.
        if !url.starts_with("/api/frame") {
            println!(
                "{} {} {}",
                method,
                url,
                chrono::Local::now().format("%H:%M:%S")
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn dispatch(
    dashboard: &mut Dashboard,
    client: &HttpPredictionClient,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => {
            Ok(serve_frontend(dashboard.frame_interval_ms()))
        }

        (&Method::Post, "/api/predict") => {
            api::post_predict(dashboard, client, body.unwrap_or("{}"))
        }
        (&Method::Get, "/api/views") => api::get_views(dashboard),
        (&Method::Get, "/api/frame") => api::get_frame(dashboard),
        (&Method::Get, "/api/state") => api::get_state(dashboard),

        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn serve_frontend(frame_interval_ms: u64) -> Response<Cursor<Vec<u8>>> {
    let html = frontend::index_html(frame_interval_ms);
    Response::from_data(html.into_bytes())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = r#"{"error": "not found"}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
}

pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

pub(crate) fn content_type_svg() -> Header {
    Header::from_bytes("Content-Type", "image/svg+xml").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
