//! Player - orchestrates sources, stream handlers and the surface
//!
//! Coordinates:
//! - Source classification and handler resolution
//! - Attach/detach of the selected handler on the current surface
//! - Native event normalization
//! - Canonical event emission
//!
//! Everything is single threaded. Source and surface changes run as one
//! step: reports that arrive meanwhile (from a handler being detached or
//! attached, or from the surface) are queued and delivered once the step
//! completes, so listeners may safely call back into the player.

use crate::events::{EventBus, EventKind, ListenerId, PlayerEvent};
use crate::handlers::{
    AdaptiveBackends, HandlerEmitter, HandlerEvent, HandlerFactory, HandlerId, StreamFactory,
    StreamHandler, StreamHandlerRegistry,
};
use crate::normalizer::{normalize, NativeEventKind};
use crate::resolution::{PlannedHandler, ResolvedHandler};
use crate::source::{SourceHandler, SourceHandlerRegistry};
use crate::{
    same_surface, Completion, EnvironmentCapabilities, Error, MediaSource, NativeError,
    NativeEvent, NativeListener, PlaybackState, PlayerConfig, Result, SurfaceKey, SurfaceRef,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// The handler currently attached, with the surface it was attached to
struct Attached {
    id: HandlerId,
    handler: Box<dyn StreamHandler>,
    surface: SurfaceRef,
}

struct State {
    surface: Option<SurfaceRef>,
    source: Option<MediaSource>,
    source_handlers: SourceHandlerRegistry,
    stream_handlers: StreamHandlerRegistry,
    attached: Option<Attached>,
    /// Top handler resolved while no surface was bound
    resolved: Option<ResolvedHandler>,
}

struct Shared {
    this: Weak<Shared>,
    capabilities: EnvironmentCapabilities,
    strict_native_events: bool,
    bus: EventBus,
    initial_bitrate: Cell<Option<u32>>,
    /// Only emissions from this handler reach the bus
    live_handler: Cell<Option<HandlerId>>,
    next_handler_id: Cell<u64>,
    /// Depth of in-progress stream handler calls
    busy: Cell<u32>,
    pending: RefCell<VecDeque<(Option<HandlerId>, PlayerEvent)>>,
    native_listener: NativeListener,
    state: RefCell<State>,
}

impl Shared {
    fn emitter(&self) -> HandlerEmitter {
        let id = HandlerId(self.next_handler_id.get());
        self.next_handler_id.set(id.0 + 1);

        let this = self.this.clone();
        HandlerEmitter::new(id, move |id, event| {
            if let Some(shared) = this.upgrade() {
                shared.on_handler_event(id, event);
            }
        })
    }

    fn on_handler_event(&self, id: HandlerId, event: HandlerEvent) {
        if self.live_handler.get() != Some(id) {
            debug!(handler = %id, ?event, "Dropping report from detached handler");
            return;
        }

        let event = match event {
            HandlerEvent::Levels(levels) => PlayerEvent::Levels(levels),
            HandlerEvent::LevelChange(index) => PlayerEvent::LevelChange(index),
            HandlerEvent::Error(err) => {
                warn!(handler = %id, error = %err, "Stream handler reported an error");
                PlayerEvent::Error(err)
            }
        };
        self.dispatch(Some(id), event);
    }

    fn on_native_event(&self, event: &NativeEvent) {
        let surface = self.state.borrow().surface.clone();
        let Some(surface) = surface.filter(|s| SurfaceKey::of_ref(s) == event.target) else {
            debug!(event_type = %event.event_type, "Ignoring event from a surface no longer bound");
            return;
        };

        let Some(kind) = NativeEventKind::from_name(&event.event_type) else {
            error!(event_type = %event.event_type, "Received a native event without a handler");
            if self.strict_native_events {
                self.dispatch(
                    None,
                    PlayerEvent::Error(Error::UnhandledNativeEvent(event.event_type.clone())),
                );
            }
            return;
        };

        self.dispatch(None, normalize(kind, surface.as_ref()));
    }

    fn native_failure(&self, operation: &str, err: NativeError) {
        warn!(operation, error = %err, "Native playback call failed");
        self.dispatch(None, PlayerEvent::Error(Error::NativePlayback(err)));
    }

    fn completion(&self, operation: &'static str) -> Completion {
        let this = self.this.clone();
        Completion::new(move |err| {
            if let Some(shared) = this.upgrade() {
                shared.native_failure(operation, err);
            }
        })
    }

    /// Emit now, or queue while a stream handler call is in progress
    fn dispatch(&self, origin: Option<HandlerId>, event: PlayerEvent) {
        if self.busy.get() > 0 {
            self.pending.borrow_mut().push_back((origin, event));
            return;
        }
        self.bus.emit(&event);
    }

    /// Run `call` with event delivery deferred until the outermost call returns
    fn deferred<R>(&self, call: impl FnOnce() -> R) -> R {
        self.busy.set(self.busy.get() + 1);
        let result = call();
        self.busy.set(self.busy.get() - 1);
        if self.busy.get() == 0 {
            self.flush();
        }
        result
    }

    fn flush(&self) {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some((origin, event)) = next else {
                break;
            };
            if origin.is_some() && origin != self.live_handler.get() {
                debug!(kind = %event.kind(), "Dropping queued report from detached handler");
                continue;
            }
            self.bus.emit(&event);
        }
    }

    fn install_listeners(&self, surface: &SurfaceRef) {
        for kind in NativeEventKind::ALL {
            surface.add_event_listener(kind.as_str(), self.native_listener.clone());
        }
    }

    fn remove_listeners(&self, surface: &SurfaceRef) {
        for kind in NativeEventKind::ALL {
            surface.remove_event_listener(kind.as_str(), &self.native_listener);
        }
    }

    fn detach_current(&self) {
        self.live_handler.set(None);
        let (attached, resolved) = {
            let mut state = self.state.borrow_mut();
            (state.attached.take(), state.resolved.take())
        };
        if let Some(resolved) = resolved {
            debug!(handler = %resolved.id, "Discarding unattached stream handler");
        }
        if let Some(Attached {
            id,
            mut handler,
            surface,
        }) = attached
        {
            info!(handler = %id, delivery = %handler.delivery_method(), "Detaching stream handler");
            self.deferred(|| handler.detach(&surface));
        }
    }

    fn attach(&self, resolved: ResolvedHandler, surface: SurfaceRef) {
        // At most one handler per surface
        self.detach_current();

        let ResolvedHandler { id, mut handler } = resolved;
        let initial_bitrate = self.initial_bitrate.get();
        info!(
            handler = %id,
            delivery = %handler.delivery_method(),
            initial_bitrate,
            "Attaching stream handler"
        );

        self.live_handler.set(Some(id));
        self.deferred(|| {
            handler.attach(&surface, initial_bitrate);
            self.state.borrow_mut().attached = Some(Attached {
                id,
                handler,
                surface,
            });
        });
    }

    /// Classify and resolve `source`, then attach the best handler or keep it
    /// until a surface is bound
    fn connect(&self, source: &MediaSource) -> Result<()> {
        let (source_handlers, stream_handlers, surface) = {
            let state = self.state.borrow();
            (
                state.source_handlers.clone(),
                state.stream_handlers.clone(),
                state.surface.clone(),
            )
        };

        let streams = source_handlers.classify(source).inspect_err(|err| {
            warn!(source = %source, error = %err, "Source classification failed");
        })?;
        if streams.is_empty() {
            warn!(source = %source, "Source resolved to no streams");
            return Err(Error::EmptySource);
        }

        let resolved = stream_handlers
            .resolve(streams, || self.emitter())
            .inspect_err(|err| warn!(source = %source, error = %err, "Handler resolution failed"))?;

        let mut resolved = resolved.into_iter();
        let Some(top) = resolved.next() else {
            return Err(Error::EmptySource);
        };
        let fallbacks = resolved.len();
        if fallbacks > 0 {
            debug!(fallbacks, "Lower ranked handlers left unattached");
        }

        match surface {
            Some(surface) => self.attach(top, surface),
            None => {
                debug!(handler = %top.id, "No surface bound, attach deferred");
                self.state.borrow_mut().resolved = Some(top);
            }
        }
        Ok(())
    }
}

/// Builder for [`Player`]
#[derive(Default)]
pub struct PlayerBuilder {
    config: PlayerConfig,
    capabilities: EnvironmentCapabilities,
    backends: AdaptiveBackends,
    surface: Option<SurfaceRef>,
}

impl PlayerBuilder {
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Platform capabilities used to filter the built-in stream handlers
    pub fn capabilities(mut self, capabilities: EnvironmentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Adaptive libraries backing the MSE stream handlers
    pub fn backends(mut self, backends: AdaptiveBackends) -> Self {
        self.backends = backends;
        self
    }

    pub fn surface(mut self, surface: SurfaceRef) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn build(self) -> Player {
        let PlayerBuilder {
            config,
            capabilities,
            backends,
            surface,
        } = self;

        let stream_handlers = StreamHandlerRegistry::builtin(&capabilities, &backends);
        let shared = Rc::new_cyclic(|this: &Weak<Shared>| {
            let listener_target = this.clone();
            let native_listener: NativeListener = Rc::new(move |event: &NativeEvent| {
                if let Some(shared) = listener_target.upgrade() {
                    shared.on_native_event(event);
                }
            });

            Shared {
                this: this.clone(),
                capabilities,
                strict_native_events: config.strict_native_events,
                bus: EventBus::new(),
                initial_bitrate: Cell::new(config.initial_bitrate_kbps),
                live_handler: Cell::new(None),
                next_handler_id: Cell::new(1),
                busy: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                native_listener,
                state: RefCell::new(State {
                    surface: surface.clone(),
                    source: None,
                    source_handlers: SourceHandlerRegistry::builtin(),
                    stream_handlers,
                    attached: None,
                    resolved: None,
                }),
            }
        });

        if let Some(surface) = &surface {
            shared.install_listeners(surface);
        }

        info!(
            stream_handlers = shared.state.borrow().stream_handlers.len(),
            surface = surface.is_some(),
            "Player created"
        );
        Player { shared }
    }
}

/// Playback orchestrator bound to at most one surface and one source
pub struct Player {
    shared: Rc<Shared>,
}

impl Player {
    /// Create a player with the default configuration and no adaptive libraries
    pub fn new(capabilities: EnvironmentCapabilities, surface: Option<SurfaceRef>) -> Self {
        Self::with_config(PlayerConfig::default(), capabilities, surface)
    }

    pub fn with_config(
        config: PlayerConfig,
        capabilities: EnvironmentCapabilities,
        surface: Option<SurfaceRef>,
    ) -> Self {
        let builder = Self::builder().config(config).capabilities(capabilities);
        match surface {
            Some(surface) => builder.surface(surface).build(),
            None => builder.build(),
        }
    }

    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::default()
    }

    /// The most recently assigned source, even if its assignment failed
    pub fn src(&self) -> Option<MediaSource> {
        self.shared.state.borrow().source.clone()
    }

    /// Assign a new source.
    ///
    /// Reassigning the identical source is a no-op. Otherwise the current
    /// handler is detached and the source classified and resolved, so
    /// classification and resolution errors are returned here. The best
    /// handler is attached now if a surface is bound, else when one is.
    /// `None` clears the source.
    pub fn set_source(&self, source: Option<MediaSource>) -> Result<()> {
        let unchanged = match (&self.shared.state.borrow().source, &source) {
            (Some(current), Some(next)) => current.is_same(next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            debug!("Source unchanged");
            return Ok(());
        }

        self.shared.deferred(|| {
            self.shared.detach_current();
            self.shared.state.borrow_mut().source = source.clone();

            match source {
                Some(source) => {
                    info!(source = %source, "Source assigned");
                    self.shared.connect(&source)
                }
                None => {
                    info!("Source cleared");
                    Ok(())
                }
            }
        })
    }

    /// Bind a new surface, moving the current source onto it
    pub fn set_video_element(&self, surface: Option<SurfaceRef>) -> Result<()> {
        let previous = self.shared.state.borrow().surface.clone();
        let unchanged = match (&previous, &surface) {
            (Some(current), Some(next)) => same_surface(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            debug!("Surface unchanged");
            return Ok(());
        }

        self.shared.deferred(|| {
            if let Some(previous) = &previous {
                self.shared.remove_listeners(previous);
            }
            let resolved = self.shared.state.borrow_mut().resolved.take();
            self.shared.detach_current();
            self.shared.state.borrow_mut().surface = surface.clone();
            info!(bound = surface.is_some(), "Surface changed");

            let Some(surface) = surface else {
                return Ok(());
            };
            self.shared.install_listeners(&surface);

            if let Some(resolved) = resolved {
                self.shared.attach(resolved, surface);
                return Ok(());
            }
            let source = self.shared.state.borrow().source.clone();
            match source {
                Some(source) => self.shared.connect(&source),
                None => Ok(()),
            }
        })
    }

    pub fn video_element(&self) -> Option<SurfaceRef> {
        self.shared.state.borrow().surface.clone()
    }

    /// Snapshot of the surface's playback properties
    pub fn playback_state(&self) -> PlaybackState {
        self.video_element()
            .map(|surface| PlaybackState::from_surface(surface.as_ref()))
            .unwrap_or_default()
    }

    /// Start playback; failures are reported through the `error` event
    pub fn play(&self) {
        let Some(surface) = self.video_element() else {
            debug!("play() without a surface");
            return;
        };
        if let Err(err) = surface.play(self.shared.completion("play")) {
            self.shared.native_failure("play", err);
        }
    }

    /// Pause playback; failures are reported through the `error` event
    pub fn pause(&self) {
        let Some(surface) = self.video_element() else {
            debug!("pause() without a surface");
            return;
        };
        if let Err(err) = surface.pause(self.shared.completion("pause")) {
            self.shared.native_failure("pause", err);
        }
    }

    /// Bitrate hint in kbps for the next attach
    pub fn set_initial_bitrate(&self, kbps: u32) {
        self.shared.initial_bitrate.set(Some(kbps));
    }

    pub fn initial_bitrate(&self) -> Option<u32> {
        self.shared.initial_bitrate.get()
    }

    /// Switch the attached handler to rendition `index`
    pub fn set_media_level(&self, index: usize) {
        let attached = self.shared.state.borrow_mut().attached.take();
        let Some(mut attached) = attached else {
            debug!(index, "No stream handler attached, level change ignored");
            return;
        };

        debug!(handler = %attached.id, index, "Switching media level");
        self.shared.deferred(|| {
            attached.handler.set_level(index, &attached.surface);
            self.shared.state.borrow_mut().attached = Some(attached);
        });
    }

    /// Id of the attached handler, if any
    pub fn active_handler(&self) -> Option<HandlerId> {
        self.shared.live_handler.get()
    }

    pub fn capabilities(&self) -> EnvironmentCapabilities {
        self.shared.capabilities
    }

    pub fn on(&self, kind: EventKind, callback: impl Fn(&PlayerEvent) + 'static) -> ListenerId {
        self.shared.bus.on(kind, callback)
    }

    pub fn once(&self, kind: EventKind, callback: impl Fn(&PlayerEvent) + 'static) -> ListenerId {
        self.shared.bus.once(kind, callback)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.shared.bus.off(kind, id)
    }

    pub fn emit(&self, event: &PlayerEvent) -> bool {
        self.shared.bus.emit(event)
    }

    /// Register a source handler ahead of the built-in ones
    pub fn register_source_handler(&self, handler: Rc<dyn SourceHandler>) {
        self.shared.state.borrow_mut().source_handlers.register(handler);
    }

    pub fn source_handlers(&self) -> Vec<Rc<dyn SourceHandler>> {
        self.shared.state.borrow().source_handlers.list().to_vec()
    }

    /// Register a stream handler factory ahead of the built-in ones
    pub fn register_stream_handler(&self, factory: Rc<dyn StreamFactory>) {
        self.shared.state.borrow_mut().stream_handlers.register(factory);
    }

    pub fn stream_handlers(&self) -> Vec<HandlerFactory> {
        self.shared.state.borrow().stream_handlers.list().to_vec()
    }

    /// Resolution plan for `source` against the current registries
    pub fn plan(&self, source: &MediaSource) -> Result<Vec<PlannedHandler>> {
        let (source_handlers, stream_handlers) = {
            let state = self.shared.state.borrow();
            (state.source_handlers.clone(), state.stream_handlers.clone())
        };
        let streams = source_handlers.classify(source)?;
        stream_handlers.plan(&streams)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let surface = self.shared.state.borrow().surface.clone();
        if let Some(surface) = &surface {
            self.shared.remove_listeners(surface);
        }
        self.shared.detach_current();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Player")
            .field("source", &state.source)
            .field("surface", &state.surface.as_ref().map(SurfaceKey::of_ref))
            .field("active_handler", &self.shared.live_handler.get())
            .field("stream_handlers", &state.stream_handlers)
            .finish()
    }
}
