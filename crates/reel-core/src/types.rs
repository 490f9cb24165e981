//! Core types for Reel

use crate::{Error, Surface};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Stream container/playlist types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamType {
    /// Progressive MP4 download
    #[serde(alias = "mp4")]
    Mp4,
    /// Progressive WebM download
    #[serde(alias = "webm")]
    Webm,
    /// HLS playlist
    #[serde(alias = "hls")]
    Hls,
    /// DASH manifest
    #[serde(alias = "dash")]
    Dash,
}

impl StreamType {
    pub const ALL: [StreamType; 4] = [
        StreamType::Mp4,
        StreamType::Webm,
        StreamType::Hls,
        StreamType::Dash,
    ];

    /// Map a file extension (without the dot) to a stream type
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(StreamType::Mp4),
            "webm" => Some(StreamType::Webm),
            "m3u8" => Some(StreamType::Hls),
            "mpd" => Some(StreamType::Dash),
            _ => None,
        }
    }

    /// Returns true for playlist/manifest based streams
    pub fn is_adaptive(&self) -> bool {
        matches!(self, StreamType::Hls | StreamType::Dash)
    }
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Mp4 => write!(f, "MP4"),
            StreamType::Webm => write!(f, "WEBM"),
            StreamType::Hls => write!(f, "HLS"),
            StreamType::Dash => write!(f, "DASH"),
        }
    }
}

impl std::str::FromStr for StreamType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MP4" => Ok(StreamType::Mp4),
            "WEBM" => Ok(StreamType::Webm),
            "HLS" => Ok(StreamType::Hls),
            "DASH" => Ok(StreamType::Dash),
            _ => Err(Error::UnknownStreamType(s.to_string())),
        }
    }
}

/// A resolved, typed, playable stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Location of the media file, playlist or manifest
    pub url: String,
    /// Stream type
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    /// Human-readable name, used as the level name for native renditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StreamDescriptor {
    pub fn new(url: impl Into<String>, stream_type: StreamType) -> Self {
        Self {
            url: url.into(),
            stream_type,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Input assigned to the player's `src`.
///
/// Cloning is cheap and preserves identity: two clones of the same
/// descriptor or list are treated as the same source.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// A URL whose stream type is detected from its extension
    Url(String),
    /// An explicit stream descriptor
    Stream(Rc<StreamDescriptor>),
    /// An ordered list of sources, earlier entries take precedence on ties
    List(Rc<[MediaSource]>),
}

impl MediaSource {
    /// Identity comparison: URLs by value, descriptors and lists by reference
    pub fn is_same(&self, other: &MediaSource) -> bool {
        match (self, other) {
            (MediaSource::Url(a), MediaSource::Url(b)) => a == b,
            (MediaSource::Stream(a), MediaSource::Stream(b)) => Rc::ptr_eq(a, b),
            (MediaSource::List(a), MediaSource::List(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for MediaSource {
    fn from(url: &str) -> Self {
        MediaSource::Url(url.to_string())
    }
}

impl From<String> for MediaSource {
    fn from(url: String) -> Self {
        MediaSource::Url(url)
    }
}

impl From<StreamDescriptor> for MediaSource {
    fn from(stream: StreamDescriptor) -> Self {
        MediaSource::Stream(Rc::new(stream))
    }
}

impl From<Vec<MediaSource>> for MediaSource {
    fn from(sources: Vec<MediaSource>) -> Self {
        MediaSource::List(sources.into())
    }
}

impl std::fmt::Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaSource::Url(url) => write!(f, "{}", url),
            MediaSource::Stream(stream) => write!(f, "{} ({})", stream.url, stream.stream_type),
            MediaSource::List(sources) => {
                write!(f, "[")?;
                for (i, source) in sources.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", source)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Mechanism class used to deliver a stream.
///
/// Declaration order is the selection rank: later variants are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Plain progressive download played by the video element
    NativeProgressive,
    /// Adaptive stream fed through Media Source Extensions by a library
    AdaptiveViaExtension,
    /// Adaptive stream played by the video element itself
    NativeAdaptive,
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::NativeProgressive => write!(f, "native progressive"),
            DeliveryMethod::AdaptiveViaExtension => write!(f, "adaptive via MSE"),
            DeliveryMethod::NativeAdaptive => write!(f, "native adaptive"),
        }
    }
}

/// One quality rendition reported by a stream handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaLevel {
    /// Bitrate in bits per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MediaLevel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Playback status reported through `statuschange`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackStatus {
    Paused,
    PausedBuffering,
    Playing,
    PlayingBuffering,
    Ended,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::PausedBuffering => write!(f, "paused (buffering)"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::PlayingBuffering => write!(f, "playing (buffering)"),
            PlaybackStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Volume payload of `volumechange`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeState {
    pub volume: f64,
    pub muted: bool,
}

/// Snapshot of the surface's playback properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Duration in seconds, 0 while unknown
    pub duration: f64,
    /// Position in seconds
    pub current_time: f64,
    pub status: PlaybackStatus,
    pub playback_rate: f64,
    pub volume: f64,
    pub muted: bool,
}

impl PlaybackState {
    /// Read the current state from a surface
    pub fn from_surface(surface: &dyn Surface) -> Self {
        let duration = surface.duration();
        Self {
            duration: if duration.is_finite() { duration } else { 0.0 },
            current_time: surface.current_time(),
            status: if surface.paused() {
                PlaybackStatus::Paused
            } else {
                PlaybackStatus::Playing
            },
            playback_rate: surface.playback_rate(),
            volume: surface.volume(),
            muted: surface.muted(),
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            duration: 0.0,
            current_time: 0.0,
            status: PlaybackStatus::Paused,
            playback_rate: 1.0,
            volume: 1.0,
            muted: false,
        }
    }
}
