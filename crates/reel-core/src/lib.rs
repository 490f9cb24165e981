//! Reel Core - Playback orchestration for Reel
//!
//! This crate decides how a media source gets played on a video surface:
//! - Source classification into typed stream descriptors
//! - Stream handler selection by delivery method
//! - Attach/detach lifecycle against the surface
//! - Native event normalization
//! - Typed event bus
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Reel Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Source    │  │    Stream    │  │    Native    │           │
//! │  │   Handlers   │  │   Handlers   │  │  Normalizer  │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Player    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │   Surface    │  │    Event    │  │   Adaptive   │            │
//! │  │  (element)   │  │     Bus     │  │   Engines    │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod events;
pub mod handlers;
pub mod normalizer;
pub mod player;
pub mod resolution;
pub mod source;
pub mod surface;
pub mod types;

pub use config::PlayerConfig;
pub use env::EnvironmentCapabilities;
pub use error::{Error, ErrorKind, Result};
pub use events::{EventBus, EventKind, ListenerId, PlayerEvent};
pub use handlers::{
    AdaptiveBackend, AdaptiveBackends, AdaptiveEngine, BuiltinFactory, EngineEvents,
    HandlerEmitter, HandlerEvent, HandlerFactory, HandlerId, StreamFactory, StreamHandler,
    StreamHandlerRegistry,
};
pub use normalizer::NativeEventKind;
pub use player::{Player, PlayerBuilder};
pub use resolution::{PlannedHandler, ResolvedHandler};
pub use source::{SourceHandler, SourceHandlerRegistry};
pub use surface::{
    same_surface, Completion, NativeError, NativeEvent, NativeListener, Surface, SurfaceKey,
    SurfaceRef,
};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Reel Core initialized");
}
