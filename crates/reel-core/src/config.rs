//! Player configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Player configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial bitrate hint in kbps for MSE-driven handlers
    pub initial_bitrate_kbps: Option<u32>,
    /// Report native events without a mapping through the `error` event
    /// instead of only logging them
    pub strict_native_events: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_bitrate_kbps: None,
            strict_native_events: cfg!(debug_assertions),
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Config for production builds: unknown native events are only logged
    pub fn lenient() -> Self {
        Self {
            strict_native_events: false,
            ..Self::default()
        }
    }
}
