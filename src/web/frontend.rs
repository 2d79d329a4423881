//! Embedded HTML/CSS/JS frontend for the wordlens dashboard.
//!
//! The page is compiled into the binary as a string constant. All markup
//! inside the mount points comes from the server already escaped; the
//! script only copies it in and toggles visibility.

use crate::render::surface::{HtmlSurface, MountPoint};

const FRAME_INTERVAL_SLOT: &str = "__FRAME_INTERVAL_MS__";
const STYLE_SLOT: &str = "__STYLE__";

/// The dashboard page with the render tick interval filled in.
pub fn index_html(frame_interval_ms: u64) -> String {
    INDEX_HTML
        .replace(STYLE_SLOT, STYLE)
        .replace(FRAME_INTERVAL_SLOT, &frame_interval_ms.max(1).to_string())
}

/// A script-free snapshot of `surface`, for `--html` export.
///
/// `graph_svg` is placed into the attention canvas mount as-is.
pub fn static_page(surface: &HtmlSurface, graph_svg: &str) -> String {
    let mount = |m: MountPoint| surface.markup(m);
    let hidden = |m: MountPoint| if surface.is_visible(m) { "" } else { " hidden" };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>wordlens snapshot</title>
<style>{STYLE}</style>
</head>
<body>
<div class="app">
  <header><h1>wordlens</h1></header>
  <div id="errorMessage" class="error-message{error_hidden}">{error}</div>
  <section id="results" class="results{results_hidden}">
    <div class="card"><h2>Predictions</h2><div id="predictionsGrid">{predictions}</div></div>
    <div class="card"><h2>Confidence</h2><div id="confidenceChart" class="chart-box">{chart}</div></div>
    <div class="card">
      <h2>Analysis</h2>
      <div class="analysis-grid">
        <div class="analysis-item"><h3>Grammar context</h3><p id="grammarContext">{grammar}</p></div>
        <div class="analysis-item"><h3>Syntactic analysis</h3><p id="syntacticAnalysis">{syntactic}</p></div>
        <div class="analysis-item"><h3>Semantic context</h3><p id="semanticContext">{semantic}</p></div>
        <div class="analysis-item"><h3>Common patterns</h3><p id="commonPatterns">{patterns}</p></div>
      </div>
      <p id="attentionCallout" class="callout">{callout}</p>
    </div>
    <div class="card"><h2>Attention graph</h2><div id="attentionCanvas" class="graph-box">{graph_svg}</div></div>
    <div class="card"><h2>Attention heatmap</h2><div id="heatmapChart" class="chart-box">{heatmap}</div></div>
  </section>
</div>
</body>
</html>
"##,
        error_hidden = hidden(MountPoint::ErrorDisplay),
        error = mount(MountPoint::ErrorDisplay),
        results_hidden = hidden(MountPoint::Results),
        predictions = mount(MountPoint::Predictions),
        chart = mount(MountPoint::ConfidenceChart),
        grammar = mount(MountPoint::GrammarContext),
        syntactic = mount(MountPoint::SyntacticAnalysis),
        semantic = mount(MountPoint::SemanticContext),
        patterns = mount(MountPoint::CommonPatterns),
        callout = mount(MountPoint::AttentionCallout),
        heatmap = mount(MountPoint::Heatmap),
    )
}

const STYLE: &str = r##"
:root {
  --bg: #f8fafc;
  --surface: #ffffff;
  --border: #e2e8f0;
  --text: #1e293b;
  --text-muted: #64748b;
  --accent: #6366f1;
  --accent-soft: rgba(99, 102, 241, 0.12);
  --red: #dc2626;
  --radius: 12px;
  --font: 'Inter', -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; }
.app { max-width: 1000px; margin: 0 auto; padding: 32px 24px; }
header { margin-bottom: 24px; }
header h1 { font-size: 26px; font-weight: 700; }
header p { color: var(--text-muted); }
form { display: flex; gap: 12px; margin-bottom: 16px; }
#phraseInput { flex: 1; padding: 12px 16px; border: 1px solid var(--border); border-radius: var(--radius); font-size: 15px; }
#submitBtn { padding: 12px 24px; border: none; border-radius: var(--radius); background: var(--accent); color: #fff; font-weight: 600; cursor: pointer; }
#submitBtn:disabled { opacity: 0.6; cursor: wait; }
#submitBtn.loading::after { content: '...'; }
.hidden { display: none !important; }
.error-message { padding: 12px 16px; margin-bottom: 16px; border-radius: var(--radius); background: #fef2f2; color: var(--red); border: 1px solid #fecaca; }
.card { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 20px; margin-bottom: 16px; }
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 12px; }
.prediction-card { display: flex; align-items: center; gap: 16px; padding: 12px 0; border-bottom: 1px solid var(--border); }
.prediction-card:last-child { border-bottom: none; }
.prediction-rank { width: 32px; height: 32px; border-radius: 50%; background: var(--accent-soft); color: var(--accent); display: flex; align-items: center; justify-content: center; font-weight: 700; }
.prediction-content { flex: 1; }
.prediction-word { font-size: 17px; font-weight: 600; }
.prediction-reasoning { color: var(--text-muted); font-size: 13px; }
.prediction-confidence { width: 140px; text-align: right; }
.confidence-value { font-weight: 600; }
.confidence-bar { height: 6px; background: var(--accent-soft); border-radius: 3px; overflow: hidden; margin-top: 4px; }
.confidence-fill { height: 100%; background: var(--accent); }
.empty-state { color: var(--text-muted); }
.analysis-grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 16px; }
.analysis-item h3 { font-size: 12px; text-transform: uppercase; letter-spacing: 0.04em; color: var(--text-muted); margin-bottom: 4px; }
.callout { margin-top: 16px; padding: 10px 14px; border-radius: 8px; background: var(--accent-soft); color: var(--accent); font-weight: 500; }
.chart-box svg, .graph-box svg { width: 100%; height: auto; }
.graph-box { overflow-x: auto; }
@keyframes bar-grow { from { transform: scaleY(0); } to { transform: scaleY(1); } }
@keyframes cell-fade { from { opacity: 0; } to { opacity: 1; } }
.bar { transform-box: fill-box; transform-origin: bottom; }
"##;

/// The complete single-page dashboard HTML.
const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>wordlens</title>
<style>__STYLE__</style>
</head>
<body>
<div class="app">
  <header>
    <h1>wordlens</h1>
    <p>Type the start of a sentence and see which words come next.</p>
  </header>

  <form id="predictionForm" autocomplete="off">
    <input id="phraseInput" type="text" placeholder="The quick brown fox..." maxlength="200">
    <button id="submitBtn" type="submit">Predict</button>
  </form>

  <div id="errorMessage" class="error-message hidden"></div>

  <section id="results" class="results hidden">
    <div class="card"><h2>Predictions</h2><div id="predictionsGrid"></div></div>
    <div class="card"><h2>Confidence</h2><div id="confidenceChart" class="chart-box"></div></div>
    <div class="card">
      <h2>Analysis</h2>
      <div class="analysis-grid">
        <div class="analysis-item"><h3>Grammar context</h3><p id="grammarContext"></p></div>
        <div class="analysis-item"><h3>Syntactic analysis</h3><p id="syntacticAnalysis"></p></div>
        <div class="analysis-item"><h3>Semantic context</h3><p id="semanticContext"></p></div>
        <div class="analysis-item"><h3>Common patterns</h3><p id="commonPatterns"></p></div>
      </div>
      <p id="attentionCallout" class="callout"></p>
    </div>
    <div class="card"><h2>Attention graph</h2><div id="attentionCanvas" class="graph-box"></div></div>
    <div class="card"><h2>Attention heatmap</h2><div id="heatmapChart" class="chart-box"></div></div>
  </section>
</div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
const FRAME_INTERVAL_MS = __FRAME_INTERVAL_MS__;
let polling = null;

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  return res.json();
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------
// Markup arrives escaped from the server.
function applyViews(views) {
  for (const [id, mount] of Object.entries(views.mounts)) {
    const el = document.getElementById(id);
    if (!el) continue;
    if (id === 'submitBtn') {
      el.disabled = views.loading;
      el.classList.toggle('loading', views.loading);
    } else if (id !== 'attentionCanvas' && id !== 'results') {
      el.innerHTML = mount.html;
    }
    el.classList.toggle('hidden', !mount.visible);
  }
  if (views.in_flight) {
    startPolling();
  } else {
    stopPolling();
  }
}

function startPolling() {
  if (polling) return;
  polling = setInterval(async () => applyViews(await api('GET', '/api/views')), 250);
}

function stopPolling() {
  if (!polling) return;
  clearInterval(polling);
  polling = null;
}

// ---------------------------------------------------------------------------
// Render tick
// ---------------------------------------------------------------------------
async function drawFrame() {
  const res = await fetch('/api/frame');
  document.getElementById('attentionCanvas').innerHTML = await res.text();
}

setInterval(() => { drawFrame().catch(() => {}); }, FRAME_INTERVAL_MS);

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------
document.getElementById('predictionForm').addEventListener('submit', async (e) => {
  e.preventDefault();
  const phrase = document.getElementById('phraseInput').value;
  try {
    const resp = await api('POST', '/api/predict', { phrase });
    if (resp.views) applyViews(resp.views);
  } catch (err) {
    const el = document.getElementById('errorMessage');
    el.textContent = 'Connection failed. Please try again.';
    el.classList.remove('hidden');
  }
});

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
api('GET', '/api/views').then(applyViews);
</script>
</body>
</html>"##;
