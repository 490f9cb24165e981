//! Stream handlers
//!
//! A stream handler attaches one group of same-typed streams to a surface.
//! Handlers are created by factories that advertise platform support and
//! stream-type compatibility. The built-in factories form a closed set
//! ([`BuiltinFactory`]); applications may register their own through
//! [`StreamFactory`].

mod adaptive;
mod native;

pub use adaptive::{AdaptiveBackend, AdaptiveBackends, AdaptiveEngine, AdaptiveStream, EngineEvents};
pub use native::NativeStream;

use crate::resolution::{self, PlannedHandler, ResolvedHandler};
use crate::{
    DeliveryMethod, EnvironmentCapabilities, Error, MediaLevel, Result, StreamDescriptor,
    StreamType, SurfaceRef,
};
use std::rc::Rc;
use tracing::debug;

/// Identifies one handler instance for the lifetime of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous report from a handler
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    Levels(Vec<MediaLevel>),
    LevelChange(usize),
    Error(Error),
}

/// Callback a handler uses to report levels, level changes and errors.
///
/// The player only forwards reports from the handler that is currently
/// attached; anything a superseded handler emits later is dropped.
#[derive(Clone)]
pub struct HandlerEmitter {
    id: HandlerId,
    target: Rc<dyn Fn(HandlerId, HandlerEvent)>,
}

impl HandlerEmitter {
    pub fn new(id: HandlerId, target: impl Fn(HandlerId, HandlerEvent) + 'static) -> Self {
        Self {
            id,
            target: Rc::new(target),
        }
    }

    /// An emitter whose reports go nowhere
    pub fn detached(id: HandlerId) -> Self {
        Self::new(id, |_, _| {})
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn emit(&self, event: HandlerEvent) {
        (self.target)(self.id, event);
    }

    pub fn levels(&self, levels: Vec<MediaLevel>) {
        self.emit(HandlerEvent::Levels(levels));
    }

    pub fn level_change(&self, index: usize) {
        self.emit(HandlerEvent::LevelChange(index));
    }

    pub fn error(&self, error: Error) {
        self.emit(HandlerEvent::Error(error));
    }
}

impl std::fmt::Debug for HandlerEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEmitter").field("id", &self.id).finish()
    }
}

/// An instantiated handler bound to one group of streams
pub trait StreamHandler {
    /// Start playing on `surface`; `initial_bitrate` is a kbps hint
    fn attach(&mut self, surface: &SurfaceRef, initial_bitrate: Option<u32>);

    /// Stop playing on `surface` and release everything tied to it
    fn detach(&mut self, surface: &SurfaceRef);

    fn delivery_method(&self) -> DeliveryMethod;

    /// Switch to rendition `index`
    fn set_level(&mut self, index: usize, surface: &SurfaceRef);
}

/// Creates handlers for the stream types it can play
pub trait StreamFactory {
    fn name(&self) -> String;

    /// Static platform check, evaluated once when a player is built
    fn is_supported(&self, env: &EnvironmentCapabilities) -> bool;

    fn can_play(&self, stream_type: StreamType) -> bool;

    /// Delivery method of the handlers this factory creates
    fn delivery_method(&self) -> DeliveryMethod;

    /// Instantiate a handler for a group of streams sharing one type
    fn create(
        &self,
        streams: Vec<StreamDescriptor>,
        emitter: HandlerEmitter,
    ) -> Result<Box<dyn StreamHandler>>;
}

/// The built-in handler variants
#[derive(Clone)]
pub enum BuiltinFactory {
    /// Video element plays a progressive file
    NativeProgressive(StreamType),
    /// Video element plays an adaptive playlist itself
    NativeAdaptive(StreamType),
    /// HLS through an MSE library
    MseHls(Rc<dyn AdaptiveBackend>),
    /// DASH through an MSE library
    MseDash(Rc<dyn AdaptiveBackend>),
}

impl StreamFactory for BuiltinFactory {
    fn name(&self) -> String {
        match self {
            BuiltinFactory::NativeProgressive(stream_type)
            | BuiltinFactory::NativeAdaptive(stream_type) => {
                format!("native-{}", stream_type.to_string().to_lowercase())
            }
            BuiltinFactory::MseHls(backend) | BuiltinFactory::MseDash(backend) => {
                backend.name().to_string()
            }
        }
    }

    fn is_supported(&self, env: &EnvironmentCapabilities) -> bool {
        match self {
            BuiltinFactory::NativeProgressive(stream_type)
            | BuiltinFactory::NativeAdaptive(stream_type) => env.supports_natively(*stream_type),
            BuiltinFactory::MseHls(backend) | BuiltinFactory::MseDash(backend) => {
                env.adaptive_extension_supported && backend.is_supported()
            }
        }
    }

    fn can_play(&self, stream_type: StreamType) -> bool {
        match self {
            BuiltinFactory::NativeProgressive(own) | BuiltinFactory::NativeAdaptive(own) => {
                *own == stream_type
            }
            BuiltinFactory::MseHls(_) => stream_type == StreamType::Hls,
            BuiltinFactory::MseDash(_) => stream_type == StreamType::Dash,
        }
    }

    fn delivery_method(&self) -> DeliveryMethod {
        match self {
            BuiltinFactory::NativeProgressive(_) => DeliveryMethod::NativeProgressive,
            BuiltinFactory::NativeAdaptive(_) => DeliveryMethod::NativeAdaptive,
            BuiltinFactory::MseHls(_) | BuiltinFactory::MseDash(_) => {
                DeliveryMethod::AdaptiveViaExtension
            }
        }
    }

    fn create(
        &self,
        streams: Vec<StreamDescriptor>,
        emitter: HandlerEmitter,
    ) -> Result<Box<dyn StreamHandler>> {
        let handler: Box<dyn StreamHandler> = match self {
            BuiltinFactory::NativeProgressive(_) | BuiltinFactory::NativeAdaptive(_) => Box::new(
                NativeStream::new(streams, self.delivery_method(), emitter),
            ),
            BuiltinFactory::MseHls(backend) => Box::new(AdaptiveStream::new(
                StreamType::Hls,
                streams,
                backend.clone(),
                emitter,
            )?),
            BuiltinFactory::MseDash(backend) => Box::new(AdaptiveStream::new(
                StreamType::Dash,
                streams,
                backend.clone(),
                emitter,
            )?),
        };
        Ok(handler)
    }
}

/// Entry of a [`StreamHandlerRegistry`]
#[derive(Clone)]
pub enum HandlerFactory {
    Builtin(BuiltinFactory),
    Custom(Rc<dyn StreamFactory>),
}

impl HandlerFactory {
    fn factory(&self) -> &dyn StreamFactory {
        match self {
            HandlerFactory::Builtin(builtin) => builtin,
            HandlerFactory::Custom(custom) => custom.as_ref(),
        }
    }

    pub fn name(&self) -> String {
        self.factory().name()
    }

    pub fn is_supported(&self, env: &EnvironmentCapabilities) -> bool {
        self.factory().is_supported(env)
    }

    pub fn can_play(&self, stream_type: StreamType) -> bool {
        self.factory().can_play(stream_type)
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.factory().delivery_method()
    }

    pub fn create(
        &self,
        streams: Vec<StreamDescriptor>,
        emitter: HandlerEmitter,
    ) -> Result<Box<dyn StreamHandler>> {
        self.factory().create(streams, emitter)
    }
}

impl std::fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerFactory::Builtin(_) => write!(f, "Builtin({})", self.name()),
            HandlerFactory::Custom(_) => write!(f, "Custom({})", self.name()),
        }
    }
}

/// Ordered list of handler factories, highest priority first
#[derive(Clone, Default, Debug)]
pub struct StreamHandlerRegistry {
    factories: Vec<HandlerFactory>,
}

impl StreamHandlerRegistry {
    /// Registry with no factories
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in factories supported by `env`, in priority order:
    /// native HLS, native DASH, MSE HLS, MSE DASH, native MP4, native WebM
    pub fn builtin(env: &EnvironmentCapabilities, backends: &AdaptiveBackends) -> Self {
        let mut candidates = vec![
            BuiltinFactory::NativeAdaptive(StreamType::Hls),
            BuiltinFactory::NativeAdaptive(StreamType::Dash),
        ];
        if let Some(hls) = &backends.hls {
            candidates.push(BuiltinFactory::MseHls(hls.clone()));
        }
        if let Some(dash) = &backends.dash {
            candidates.push(BuiltinFactory::MseDash(dash.clone()));
        }
        candidates.push(BuiltinFactory::NativeProgressive(StreamType::Mp4));
        candidates.push(BuiltinFactory::NativeProgressive(StreamType::Webm));

        let factories: Vec<HandlerFactory> = candidates
            .into_iter()
            .filter(|factory| factory.is_supported(env))
            .map(HandlerFactory::Builtin)
            .collect();

        debug!(
            handlers = ?factories.iter().map(HandlerFactory::name).collect::<Vec<_>>(),
            "Built-in stream handlers"
        );

        Self { factories }
    }

    /// Register a factory ahead of every existing one
    pub fn register(&mut self, factory: Rc<dyn StreamFactory>) {
        debug!(handler = %factory.name(), "Stream handler registered");
        self.factories.insert(0, HandlerFactory::Custom(factory));
    }

    /// Factories in priority order
    pub fn list(&self) -> &[HandlerFactory] {
        &self.factories
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerFactory> {
        self.factories.iter()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Instantiate handlers for `streams`, best delivery method first
    pub fn resolve(
        &self,
        streams: Vec<StreamDescriptor>,
        next_emitter: impl FnMut() -> HandlerEmitter,
    ) -> Result<Vec<ResolvedHandler>> {
        resolution::resolve(streams, &self.factories, next_emitter)
    }

    /// Dry run of [`StreamHandlerRegistry::resolve`] without instantiating anything
    pub fn plan(&self, streams: &[StreamDescriptor]) -> Result<Vec<PlannedHandler>> {
        resolution::plan(streams, &self.factories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdaptiveEngine;

    struct NullBackend;

    impl AdaptiveBackend for NullBackend {
        fn name(&self) -> &str {
            "null.js"
        }

        fn create_engine(&self) -> Box<dyn AdaptiveEngine> {
            unreachable!("registry tests never attach")
        }
    }

    fn backends() -> AdaptiveBackends {
        let backend: Rc<dyn AdaptiveBackend> = Rc::new(NullBackend);
        AdaptiveBackends {
            hls: Some(backend.clone()),
            dash: Some(backend),
        }
    }

    fn names(registry: &StreamHandlerRegistry) -> Vec<String> {
        registry.list().iter().map(HandlerFactory::name).collect()
    }

    #[test]
    fn test_builtin_order_with_everything_supported() {
        let registry = StreamHandlerRegistry::builtin(&EnvironmentCapabilities::all(), &backends());
        assert_eq!(
            names(&registry),
            vec!["native-hls", "native-dash", "null.js", "null.js", "native-mp4", "native-webm"]
        );
    }

    #[test]
    fn test_unsupported_builtins_are_excluded() {
        let registry =
            StreamHandlerRegistry::builtin(&EnvironmentCapabilities::desktop(), &backends());
        assert_eq!(names(&registry), vec!["null.js", "null.js", "native-mp4", "native-webm"]);

        let registry = StreamHandlerRegistry::builtin(
            &EnvironmentCapabilities::desktop(),
            &AdaptiveBackends::default(),
        );
        assert_eq!(names(&registry), vec!["native-mp4", "native-webm"]);

        let registry = StreamHandlerRegistry::builtin(&EnvironmentCapabilities::none(), &backends());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builtin_capabilities() {
        let mse = BuiltinFactory::MseDash(Rc::new(NullBackend));
        assert!(mse.can_play(StreamType::Dash));
        assert!(!mse.can_play(StreamType::Hls));
        assert_eq!(mse.delivery_method(), DeliveryMethod::AdaptiveViaExtension);
        assert!(!mse.is_supported(&EnvironmentCapabilities::all().with_adaptive_extension(false)));

        let native = BuiltinFactory::NativeAdaptive(StreamType::Hls);
        assert!(native.can_play(StreamType::Hls));
        assert_eq!(native.delivery_method(), DeliveryMethod::NativeAdaptive);
    }

    #[test]
    fn test_emitter_tags_reports_with_its_id() {
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        let emitter = HandlerEmitter::new(HandlerId(7), move |id, event| {
            sink.borrow_mut().push((id, event));
        });
        emitter.level_change(2);
        HandlerEmitter::detached(HandlerId(8)).level_change(3);

        assert_eq!(*seen.borrow(), vec![(HandlerId(7), HandlerEvent::LevelChange(2))]);
    }
}
