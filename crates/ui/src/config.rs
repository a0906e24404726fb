use crate::mouse_monitor::{DEFAULT_PADDING_X, DEFAULT_PADDING_Y};
use crate::placement::GAP;
use serde::{Deserialize, Serialize};

/// Overlay tuning; every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Distance between anchor and popup.
    pub gap: f64,
    /// Horizontal grace margin around the popup.
    pub grace_padding_x: f64,
    /// Vertical grace margin around the popup.
    pub grace_padding_y: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { gap: GAP, grace_padding_x: DEFAULT_PADDING_X, grace_padding_y: DEFAULT_PADDING_Y }
    }
}

impl OverlayConfig {
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }
}
