//! Selection tip: the popup offered for a fresh selection
//!
//! Starts as a compact "Highlight" button and expands into a small form with
//! a note, an emoji and a color swatch. Expanding changes the popup's shape,
//! so it asks its container to measure again.

use crate::tip_container::RelayoutHandle;
use marginalia_model::Comment;

pub const PALETTE: [&str; 8] = [
    "#f27b72", "#f6c177", "#f6d365", "#a6f3a6", "#6b7cff", "#8f73d6", "#b06cf7", "#22c1c3",
];

pub const DEFAULT_COLOR: &str = "#f6d365";

#[derive(Debug, Clone)]
pub struct TipEditor {
    compact: bool,
    text: String,
    emoji: String,
    color: String,
    relayout: Option<RelayoutHandle>,
}

impl Default for TipEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl TipEditor {
    pub fn new() -> Self {
        Self {
            compact: true,
            text: String::new(),
            emoji: String::new(),
            color: DEFAULT_COLOR.to_owned(),
            relayout: None,
        }
    }

    pub fn with_relayout(mut self, relayout: RelayoutHandle) -> Self {
        self.relayout = Some(relayout);
        self
    }

    /// Start expanded, for hosts that open the form as soon as text is selected.
    pub fn opened(mut self) -> Self {
        self.open();
        self
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Expand the form. Returns `false` when it was already open.
    pub fn open(&mut self) -> bool {
        if !self.compact {
            return false;
        }
        self.compact = false;
        if let Some(relayout) = &self.relayout {
            relayout.request();
        }
        true
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_emoji(&mut self, emoji: impl Into<String>) {
        self.emoji = emoji.into();
    }

    /// Pick a swatch. Colors outside [`PALETTE`] are rejected.
    pub fn select_color(&mut self, swatch: &str) -> bool {
        if !PALETTE.iter().any(|candidate| *candidate == swatch) {
            tracing::debug!(swatch, "ignoring color outside the palette");
            return false;
        }
        self.color = swatch.to_owned();
        true
    }

    /// The comment to attach to the new annotation.
    pub fn confirm(&self) -> Comment {
        Comment::new(self.text.clone(), self.emoji.clone()).with_color(self.color.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::tip_container::TipContainer;

    #[test]
    fn test_defaults() {
        let tip = TipEditor::new();
        assert!(tip.is_compact());
        assert_eq!(tip.color(), DEFAULT_COLOR);
        assert!(PALETTE.contains(&DEFAULT_COLOR));
    }

    #[test]
    fn test_open_requests_remeasure_once() {
        let mut container = TipContainer::default();
        container.on_frame(|| Some(Size::new(90.0, 30.0)));
        let mut tip = TipEditor::new().with_relayout(container.relayout_handle());

        assert!(tip.open());
        assert!(!tip.open());
        assert!(container.on_frame(|| Some(Size::new(280.0, 180.0))));
        assert!(!container.on_frame(|| None));
        assert_eq!(container.size(), Some(Size::new(280.0, 180.0)));
    }

    #[test]
    fn test_confirm_builds_comment() {
        let mut tip = TipEditor::new().opened();
        tip.set_text("check this");
        tip.set_emoji("💡");
        assert!(tip.select_color("#6b7cff"));
        assert!(!tip.select_color("#000000"));

        let comment = tip.confirm();
        assert_eq!(comment.text, "check this");
        assert_eq!(comment.emoji, "💡");
        assert_eq!(comment.color.as_deref(), Some("#6b7cff"));
    }
}
