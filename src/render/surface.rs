//! Mount points and the surfaces that hold them.
//!
//! The page markup is owned elsewhere; the render pipeline only needs to
//! address a fixed set of named mount points and write into them. A
//! [`Surface`] is that write-only view of the page. [`HtmlSurface`] keeps
//! the written content in memory so the dashboard can ship it to the
//! browser and the CLI can export it as a static page.

use std::collections::BTreeMap;

use serde::Serialize;

use super::escape::escape_html;

/// Every addressable element the core writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MountPoint {
    SubmitTrigger,
    Results,
    Predictions,
    ConfidenceChart,
    GrammarContext,
    SyntacticAnalysis,
    SemanticContext,
    CommonPatterns,
    AttentionCallout,
    ErrorDisplay,
    AttentionCanvas,
    Heatmap,
}

impl MountPoint {
    pub const ALL: [MountPoint; 12] = [
        Self::SubmitTrigger,
        Self::Results,
        Self::Predictions,
        Self::ConfidenceChart,
        Self::GrammarContext,
        Self::SyntacticAnalysis,
        Self::SemanticContext,
        Self::CommonPatterns,
        Self::AttentionCallout,
        Self::ErrorDisplay,
        Self::AttentionCanvas,
        Self::Heatmap,
    ];

    /// Element id in the page markup.
    pub fn id(&self) -> &'static str {
        match self {
            Self::SubmitTrigger => "submitBtn",
            Self::Results => "results",
            Self::Predictions => "predictionsGrid",
            Self::ConfidenceChart => "confidenceChart",
            Self::GrammarContext => "grammarContext",
            Self::SyntacticAnalysis => "syntacticAnalysis",
            Self::SemanticContext => "semanticContext",
            Self::CommonPatterns => "commonPatterns",
            Self::AttentionCallout => "attentionCallout",
            Self::ErrorDisplay => "errorMessage",
            Self::AttentionCanvas => "attentionCanvas",
            Self::Heatmap => "heatmapChart",
        }
    }
}

/// Write-only access to the page's mount points.
pub trait Surface {
    /// Replace a mount's content with markup. Callers escape every
    /// service- or user-derived string inside `markup` before passing it.
    fn set_markup(&mut self, mount: MountPoint, markup: String);

    /// Replace a mount's content with literal text.
    fn set_text(&mut self, mount: MountPoint, text: &str);

    fn set_visible(&mut self, mount: MountPoint, visible: bool);

    /// Toggle the loading indicator on the submit trigger.
    fn set_loading(&mut self, loading: bool);
}

// ---------------------------------------------------------------------------
// In-memory HTML surface
// ---------------------------------------------------------------------------

/// What a mount currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountContent {
    Empty,
    Markup(String),
    Text(String),
}

impl MountContent {
    /// Content as markup, escaping literal text.
    pub fn to_markup(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Markup(markup) => markup.clone(),
            Self::Text(text) => escape_html(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountState {
    pub content: MountContent,
    pub visible: bool,
}

impl Default for MountState {
    fn default() -> Self {
        Self {
            content: MountContent::Empty,
            visible: true,
        }
    }
}

/// A page held in memory.
///
/// Results and the error area start hidden, like the page they model.
#[derive(Debug, Clone, Serialize)]
pub struct HtmlSurface {
    mounts: BTreeMap<&'static str, MountState>,
    loading: bool,
}

impl Default for HtmlSurface {
    fn default() -> Self {
        let mut mounts: BTreeMap<&'static str, MountState> = MountPoint::ALL
            .iter()
            .map(|m| (m.id(), MountState::default()))
            .collect();
        for hidden in [MountPoint::Results, MountPoint::ErrorDisplay] {
            if let Some(state) = mounts.get_mut(hidden.id()) {
                state.visible = false;
            }
        }
        Self {
            mounts,
            loading: false,
        }
    }
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&self, mount: MountPoint) -> &MountState {
        // Every mount is inserted at construction.
        &self.mounts[mount.id()]
    }

    /// Markup currently held by a mount.
    pub fn markup(&self, mount: MountPoint) -> String {
        self.mount(mount).content.to_markup()
    }

    pub fn is_visible(&self, mount: MountPoint) -> bool {
        self.mount(mount).visible
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn entry(&mut self, mount: MountPoint) -> &mut MountState {
        self.mounts.entry(mount.id()).or_default()
    }
}

impl Surface for HtmlSurface {
    fn set_markup(&mut self, mount: MountPoint, markup: String) {
        self.entry(mount).content = MountContent::Markup(markup);
    }

    fn set_text(&mut self, mount: MountPoint, text: &str) {
        self.entry(mount).content = MountContent::Text(text.to_string());
    }

    fn set_visible(&mut self, mount: MountPoint, visible: bool) {
        self.entry(mount).visible = visible;
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_surface_hides_results_and_error() {
        let surface = HtmlSurface::new();
        assert!(!surface.is_visible(MountPoint::Results));
        assert!(!surface.is_visible(MountPoint::ErrorDisplay));
        assert!(surface.is_visible(MountPoint::Predictions));
        assert_eq!(surface.markup(MountPoint::Predictions), "");
    }

    #[test]
    fn text_content_is_escaped_on_read() {
        let mut surface = HtmlSurface::new();
        surface.set_text(MountPoint::GrammarContext, "<i>noun</i>");
        assert_eq!(
            surface.markup(MountPoint::GrammarContext),
            "&lt;i&gt;noun&lt;/i&gt;"
        );
    }

    #[test]
    fn mount_ids_are_unique() {
        let mut ids: Vec<_> = MountPoint::ALL.iter().map(|m| m.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MountPoint::ALL.len());
    }

    #[test]
    fn serializes_by_element_id() {
        let mut surface = HtmlSurface::new();
        surface.set_text(MountPoint::ErrorDisplay, "oops");
        let json = serde_json::to_value(&surface).unwrap();
        assert_eq!(json["mounts"]["errorMessage"]["content"]["text"], "oops");
        assert_eq!(json["loading"], false);
    }
}
