//! Source classification
//!
//! Turns whatever was assigned to `src` into typed [`StreamDescriptor`]s.
//! Classification is pluggable through [`SourceHandler`]s kept in a
//! [`SourceHandlerRegistry`]; the first handler that claims a source wins and
//! later registrations take priority over earlier ones and over built-ins.

use crate::{Error, MediaSource, Result, StreamDescriptor, StreamType};
use std::rc::Rc;
use tracing::debug;
use url::Url;

/// Base used to resolve relative URLs before extracting their path
const RELATIVE_URL_BASE: &str = "http://localhost/";

/// A pluggable source classifier
pub trait SourceHandler {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether this handler can classify `source`
    fn can_handle(&self, source: &MediaSource) -> bool;

    /// Produce the streams for a source this handler claimed
    fn resolve(&self, source: &MediaSource) -> Result<Vec<StreamDescriptor>>;
}

/// Accepts explicit stream descriptors unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorSource;

impl SourceHandler for DescriptorSource {
    fn name(&self) -> &str {
        "descriptor"
    }

    fn can_handle(&self, source: &MediaSource) -> bool {
        matches!(source, MediaSource::Stream(_))
    }

    fn resolve(&self, source: &MediaSource) -> Result<Vec<StreamDescriptor>> {
        match source {
            MediaSource::Stream(stream) => Ok(vec![StreamDescriptor::clone(stream)]),
            MediaSource::Url(url) => Err(Error::UnrecognizedSource { url: url.clone() }),
            MediaSource::List(_) => Err(Error::EmptySource),
        }
    }
}

/// Accepts URLs with a recognizable extension:
/// - `http://host/video.mp4` (MP4 file)
/// - `http://host/video.webm` (WebM file)
/// - `http://host/playlist.m3u8` (HLS playlist)
/// - `http://host/manifest.mpd` (DASH manifest)
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlSource;

impl SourceHandler for UrlSource {
    fn name(&self) -> &str {
        "url"
    }

    fn can_handle(&self, source: &MediaSource) -> bool {
        match source {
            MediaSource::Url(url) => detect_stream_type(url).is_ok(),
            _ => false,
        }
    }

    fn resolve(&self, source: &MediaSource) -> Result<Vec<StreamDescriptor>> {
        match source {
            MediaSource::Url(url) => Ok(vec![StreamDescriptor::new(
                url.clone(),
                detect_stream_type(url)?,
            )]),
            MediaSource::Stream(stream) => Err(Error::UnrecognizedSource {
                url: stream.url.clone(),
            }),
            MediaSource::List(_) => Err(Error::EmptySource),
        }
    }
}

/// Extract the lowercase trailing extension of a URL's path.
///
/// The query string and fragment are ignored. Relative URLs are resolved
/// against a placeholder base first.
pub fn extension_of(url: &str) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(RELATIVE_URL_BASE).ok()?.join(url).ok()?
        }
        Err(_) => return None,
    };

    let file_name = parsed.path().rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Detect the stream type of a URL from its extension
pub fn detect_stream_type(url: &str) -> Result<StreamType> {
    extension_of(url)
        .and_then(|ext| StreamType::from_extension(&ext))
        .ok_or_else(|| Error::UnrecognizedSource {
            url: url.to_string(),
        })
}

/// Classify a source with the built-in rules only.
///
/// Descriptors pass through unchanged, URLs are typed by extension and lists
/// are classified element by element, concatenated in input order.
pub fn classify(source: &MediaSource) -> Result<Vec<StreamDescriptor>> {
    match source {
        MediaSource::Stream(stream) => Ok(vec![StreamDescriptor::clone(stream)]),
        MediaSource::Url(url) => Ok(vec![StreamDescriptor::new(
            url.clone(),
            detect_stream_type(url)?,
        )]),
        MediaSource::List(sources) => {
            let mut streams = Vec::new();
            for source in sources.iter() {
                streams.extend(classify(source)?);
            }
            Ok(streams)
        }
    }
}

/// Ordered list of source handlers, highest priority first
#[derive(Clone)]
pub struct SourceHandlerRegistry {
    handlers: Vec<Rc<dyn SourceHandler>>,
}

impl SourceHandlerRegistry {
    /// Registry with no handlers at all
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registry with the built-in descriptor and URL handlers
    pub fn builtin() -> Self {
        Self {
            handlers: vec![Rc::new(DescriptorSource), Rc::new(UrlSource)],
        }
    }

    /// Register a handler ahead of every existing one
    pub fn register(&mut self, handler: Rc<dyn SourceHandler>) {
        debug!(handler = handler.name(), "Source handler registered");
        self.handlers.insert(0, handler);
    }

    /// Handlers in priority order
    pub fn list(&self) -> &[Rc<dyn SourceHandler>] {
        &self.handlers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn SourceHandler>> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Classify a source using the first handler that claims each element
    pub fn classify(&self, source: &MediaSource) -> Result<Vec<StreamDescriptor>> {
        if let MediaSource::List(sources) = source {
            let mut streams = Vec::new();
            for source in sources.iter() {
                streams.extend(self.classify(source)?);
            }
            return Ok(streams);
        }

        match self.handlers.iter().find(|h| h.can_handle(source)) {
            Some(handler) => {
                let streams = handler.resolve(source)?;
                debug!(handler = handler.name(), streams = streams.len(), "Source classified");
                Ok(streams)
            }
            None => match source {
                MediaSource::Url(url) => Err(Error::UnrecognizedSource { url: url.clone() }),
                _ => classify(source),
            },
        }
    }
}

impl Default for SourceHandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for SourceHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}
