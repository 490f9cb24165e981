//! Host environment capabilities
//!
//! A snapshot of what the platform can play, computed once by the host
//! (see `reel-wasm`'s probe) and handed to the player at construction.

use crate::types::StreamType;
use serde::{Deserialize, Serialize};

/// What the host platform supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentCapabilities {
    /// Media Source Extensions are available to adaptive libraries
    pub adaptive_extension_supported: bool,
    /// The video element plays HLS playlists natively
    pub native_hls: bool,
    /// The video element plays DASH manifests natively
    pub native_dash: bool,
    /// The video element plays MP4 files
    pub native_mp4: bool,
    /// The video element plays WebM files
    pub native_webm: bool,
}

impl EnvironmentCapabilities {
    /// Nothing supported
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything supported
    pub fn all() -> Self {
        Self {
            adaptive_extension_supported: true,
            native_hls: true,
            native_dash: true,
            native_mp4: true,
            native_webm: true,
        }
    }

    /// Typical desktop browser without native adaptive playback
    pub fn desktop() -> Self {
        Self {
            adaptive_extension_supported: true,
            native_mp4: true,
            native_webm: true,
            ..Self::default()
        }
    }

    /// Whether the video element can play `stream_type` by itself
    pub fn supports_natively(&self, stream_type: StreamType) -> bool {
        match stream_type {
            StreamType::Mp4 => self.native_mp4,
            StreamType::Webm => self.native_webm,
            StreamType::Hls => self.native_hls,
            StreamType::Dash => self.native_dash,
        }
    }

    /// Override native support for one stream type
    pub fn with_native(mut self, stream_type: StreamType, supported: bool) -> Self {
        match stream_type {
            StreamType::Mp4 => self.native_mp4 = supported,
            StreamType::Webm => self.native_webm = supported,
            StreamType::Hls => self.native_hls = supported,
            StreamType::Dash => self.native_dash = supported,
        }
        self
    }

    /// Override MSE availability
    pub fn with_adaptive_extension(mut self, supported: bool) -> Self {
        self.adaptive_extension_supported = supported;
        self
    }
}
