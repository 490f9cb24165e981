//! Adaptive streams played through an MSE library
//!
//! The library itself (hls.js, dash.js, ...) is an opaque [`AdaptiveEngine`]
//! created by an [`AdaptiveBackend`]. The handler owns one engine per
//! attachment and translates its asynchronous reports into handler events.

use super::{HandlerEmitter, StreamHandler};
use crate::{DeliveryMethod, Error, MediaLevel, Result, StreamDescriptor, StreamType, SurfaceRef};
use std::rc::Rc;
use tracing::{debug, info};

/// One running instance of an adaptive streaming library
pub trait AdaptiveEngine {
    /// Attach to `surface` and start loading `url`.
    ///
    /// Manifest results arrive later through `events`.
    fn load(
        &mut self,
        surface: &SurfaceRef,
        url: &str,
        initial_bitrate: Option<u32>,
        events: EngineEvents,
    );

    /// Force rendition `index`
    fn set_level(&mut self, index: usize);

    /// Stop loading, detach from the surface and release all resources
    fn destroy(&mut self);
}

/// Provider of adaptive engines for one protocol
pub trait AdaptiveBackend {
    /// Library name, e.g. `hls.js`
    fn name(&self) -> &str;

    /// Library-specific platform check, on top of MSE availability
    fn is_supported(&self) -> bool {
        true
    }

    fn create_engine(&self) -> Box<dyn AdaptiveEngine>;
}

/// Adaptive libraries available to a player
#[derive(Clone, Default)]
pub struct AdaptiveBackends {
    pub hls: Option<Rc<dyn AdaptiveBackend>>,
    pub dash: Option<Rc<dyn AdaptiveBackend>>,
}

impl std::fmt::Debug for AdaptiveBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveBackends")
            .field("hls", &self.hls.as_ref().map(|b| b.name().to_string()))
            .field("dash", &self.dash.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

/// Sink an engine reports through
#[derive(Clone, Debug)]
pub struct EngineEvents {
    emitter: HandlerEmitter,
    url: String,
}

impl EngineEvents {
    pub fn new(emitter: HandlerEmitter, url: impl Into<String>) -> Self {
        Self {
            emitter,
            url: url.into(),
        }
    }

    /// The manifest was parsed; `levels` in the library's own order
    pub fn manifest_parsed(&self, levels: Vec<MediaLevel>) {
        debug!(url = %self.url, levels = levels.len(), "Manifest parsed");
        self.emitter.levels(levels);
    }

    pub fn level_switched(&self, index: usize) {
        self.emitter.level_change(index);
    }

    /// The manifest or playlist could not be loaded or parsed
    pub fn load_failed(&self, reason: impl Into<String>) {
        self.emitter.error(Error::stream_load(self.url.clone(), reason));
    }
}

/// Handler for a single HLS or DASH stream played through an MSE library
pub struct AdaptiveStream {
    stream_type: StreamType,
    stream: StreamDescriptor,
    backend: Rc<dyn AdaptiveBackend>,
    engine: Option<Box<dyn AdaptiveEngine>>,
    emitter: HandlerEmitter,
}

impl AdaptiveStream {
    /// Create a handler; the library manages renditions itself, so exactly
    /// one stream is accepted
    pub fn new(
        stream_type: StreamType,
        mut streams: Vec<StreamDescriptor>,
        backend: Rc<dyn AdaptiveBackend>,
        emitter: HandlerEmitter,
    ) -> Result<Self> {
        if streams.len() != 1 {
            return Err(Error::MultiStreamNotSupported {
                handler: backend.name().to_string(),
                stream_type,
                count: streams.len(),
            });
        }
        let stream = streams.remove(0);

        Ok(Self {
            stream_type,
            stream,
            backend,
            engine: None,
            emitter,
        })
    }

    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    pub fn is_attached(&self) -> bool {
        self.engine.is_some()
    }
}

impl StreamHandler for AdaptiveStream {
    fn attach(&mut self, surface: &SurfaceRef, initial_bitrate: Option<u32>) {
        if let Some(mut previous) = self.engine.take() {
            previous.destroy();
        }

        info!(
            library = self.backend.name(),
            stream_type = %self.stream_type,
            url = %self.stream.url,
            initial_bitrate,
            "Attaching adaptive stream"
        );

        let mut engine = self.backend.create_engine();
        let events = EngineEvents::new(self.emitter.clone(), self.stream.url.clone());
        engine.load(surface, &self.stream.url, initial_bitrate, events);
        self.engine = Some(engine);
    }

    fn detach(&mut self, _surface: &SurfaceRef) {
        if let Some(mut engine) = self.engine.take() {
            debug!(library = self.backend.name(), url = %self.stream.url, "Destroying adaptive engine");
            engine.destroy();
        }
    }

    fn delivery_method(&self) -> DeliveryMethod {
        DeliveryMethod::AdaptiveViaExtension
    }

    fn set_level(&mut self, index: usize, _surface: &SurfaceRef) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_level(index);
        }
    }
}
