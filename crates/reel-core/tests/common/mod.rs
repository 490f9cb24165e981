//! Shared fakes for reel-core integration tests

#![allow(dead_code)]

use reel_core::{
    AdaptiveBackend, AdaptiveBackends, AdaptiveEngine, Completion, DeliveryMethod, EngineEvents,
    EnvironmentCapabilities, HandlerEmitter, MediaLevel, NativeError, NativeEvent, NativeListener,
    Result, StreamDescriptor, StreamFactory, StreamHandler, StreamType, Surface, SurfaceKey,
    SurfaceRef,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// =============================================================================
// Mock surface
// =============================================================================

/// In-memory video element
pub struct MockSurface {
    src: RefCell<String>,
    src_history: RefCell<Vec<String>>,
    current_time: Cell<f64>,
    duration: Cell<f64>,
    volume: Cell<f64>,
    muted: Cell<bool>,
    playback_rate: Cell<f64>,
    paused: Cell<bool>,
    error: RefCell<Option<NativeError>>,
    listeners: RefCell<Vec<(String, NativeListener)>>,
    play_failure: RefCell<Option<NativeError>>,
    pending_play: RefCell<Option<Completion>>,
    hold_play: Cell<bool>,
    play_calls: Cell<usize>,
    pause_calls: Cell<usize>,
}

impl MockSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            src: RefCell::new(String::new()),
            src_history: RefCell::new(Vec::new()),
            current_time: Cell::new(0.0),
            duration: Cell::new(f64::NAN),
            volume: Cell::new(1.0),
            muted: Cell::new(false),
            playback_rate: Cell::new(1.0),
            paused: Cell::new(true),
            error: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            play_failure: RefCell::new(None),
            pending_play: RefCell::new(None),
            hold_play: Cell::new(false),
            play_calls: Cell::new(0),
            pause_calls: Cell::new(0),
        })
    }

    /// Shared handle for passing to the player
    pub fn handle(self: &Rc<Self>) -> SurfaceRef {
        self.clone()
    }

    pub fn key(&self) -> SurfaceKey {
        SurfaceKey::of(self)
    }

    /// Fire `event_type` at the listeners registered for it
    pub fn dispatch(&self, event_type: &str) {
        self.dispatch_as(event_type, event_type);
    }

    /// Fire an event of `event_type` at the listeners registered for `registered`
    pub fn dispatch_as(&self, registered: &str, event_type: &str) {
        let listeners: Vec<NativeListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(kind, _)| kind == registered)
            .map(|(_, listener)| listener.clone())
            .collect();
        let event = NativeEvent::new(event_type, self.key());
        for listener in listeners {
            listener(&event);
        }
    }

    /// Listeners currently registered for `event_type`
    pub fn listeners_for(&self, event_type: &str) -> Vec<NativeListener> {
        self.listeners
            .borrow()
            .iter()
            .filter(|(kind, _)| kind == event_type)
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn src_history(&self) -> Vec<String> {
        self.src_history.borrow().clone()
    }

    pub fn set_duration(&self, duration: f64) {
        self.duration.set(duration);
    }

    pub fn set_volume(&self, volume: f64, muted: bool) {
        self.volume.set(volume);
        self.muted.set(muted);
    }

    pub fn set_playback_rate(&self, rate: f64) {
        self.playback_rate.set(rate);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.set(paused);
    }

    pub fn set_error(&self, error: Option<NativeError>) {
        *self.error.borrow_mut() = error;
    }

    /// Make the next `play()` fail synchronously
    pub fn fail_play_with(&self, error: NativeError) {
        *self.play_failure.borrow_mut() = Some(error);
    }

    /// Keep the completion of the next `play()` so it can be rejected later
    pub fn hold_play(&self) {
        self.hold_play.set(true);
    }

    /// Reject a held `play()`; returns false if none was pending
    pub fn reject_pending_play(&self, error: NativeError) -> bool {
        let pending = self.pending_play.borrow_mut().take();
        match pending {
            Some(completion) => {
                completion.reject(error);
                true
            }
            None => false,
        }
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.get()
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.get()
    }
}

impl Surface for MockSurface {
    fn src(&self) -> String {
        self.src.borrow().clone()
    }

    fn set_src(&self, url: &str) {
        *self.src.borrow_mut() = url.to_string();
        self.src_history.borrow_mut().push(url.to_string());
        self.current_time.set(0.0);
    }

    fn current_time(&self) -> f64 {
        self.current_time.get()
    }

    fn set_current_time(&self, time: f64) {
        self.current_time.set(time);
    }

    fn duration(&self) -> f64 {
        self.duration.get()
    }

    fn volume(&self) -> f64 {
        self.volume.get()
    }

    fn muted(&self) -> bool {
        self.muted.get()
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate.get()
    }

    fn paused(&self) -> bool {
        self.paused.get()
    }

    fn error(&self) -> Option<NativeError> {
        self.error.borrow().clone()
    }

    fn play(&self, completion: Completion) -> std::result::Result<(), NativeError> {
        self.play_calls.set(self.play_calls.get() + 1);
        if let Some(error) = self.play_failure.borrow_mut().take() {
            return Err(error);
        }
        if self.hold_play.replace(false) {
            *self.pending_play.borrow_mut() = Some(completion);
        }
        self.paused.set(false);
        Ok(())
    }

    fn pause(&self, _completion: Completion) -> std::result::Result<(), NativeError> {
        self.pause_calls.set(self.pause_calls.get() + 1);
        self.paused.set(true);
        Ok(())
    }

    fn add_event_listener(&self, event_type: &str, listener: NativeListener) {
        self.listeners
            .borrow_mut()
            .push((event_type.to_string(), listener));
    }

    fn remove_event_listener(&self, event_type: &str, listener: &NativeListener) {
        self.listeners
            .borrow_mut()
            .retain(|(kind, existing)| !(kind == event_type && Rc::ptr_eq(existing, listener)));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Mock stream handlers
// =============================================================================

/// Lifecycle call made on a mock handler
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach {
        handler: String,
        surface: SurfaceKey,
        initial_bitrate: Option<u32>,
    },
    Detach {
        handler: String,
        surface: SurfaceKey,
    },
    SetLevel {
        handler: String,
        index: usize,
    },
}

/// Shared record of every call made on mock handlers
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn attaches(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Attach { .. }))
            .count()
    }

    pub fn detaches(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Detach { .. }))
            .count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

struct MockHandler {
    name: String,
    streams: Vec<StreamDescriptor>,
    delivery: DeliveryMethod,
    log: CallLog,
    detach_event: Option<String>,
}

impl StreamHandler for MockHandler {
    fn attach(&mut self, surface: &SurfaceRef, initial_bitrate: Option<u32>) {
        if let Some(stream) = self.streams.first() {
            surface.set_src(&stream.url);
        }
        self.log.push(Call::Attach {
            handler: self.name.clone(),
            surface: SurfaceKey::of_ref(surface),
            initial_bitrate,
        });
    }

    fn detach(&mut self, surface: &SurfaceRef) {
        self.log.push(Call::Detach {
            handler: self.name.clone(),
            surface: SurfaceKey::of_ref(surface),
        });
        if let Some(event_type) = &self.detach_event {
            if let Some(mock) = surface.as_any().downcast_ref::<MockSurface>() {
                mock.dispatch(event_type);
            }
        }
    }

    fn delivery_method(&self) -> DeliveryMethod {
        self.delivery
    }

    fn set_level(&mut self, index: usize, _surface: &SurfaceRef) {
        self.log.push(Call::SetLevel {
            handler: self.name.clone(),
            index,
        });
    }
}

/// Configurable stream handler factory
pub struct MockFactory {
    pub name: String,
    pub plays: Vec<StreamType>,
    pub delivery: DeliveryMethod,
    pub supported: bool,
    pub log: CallLog,
    emitters: RefCell<Vec<HandlerEmitter>>,
    detach_event: RefCell<Option<String>>,
}

impl MockFactory {
    pub fn new(name: &str, plays: &[StreamType], delivery: DeliveryMethod, log: &CallLog) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            plays: plays.to_vec(),
            delivery,
            supported: true,
            log: log.clone(),
            emitters: RefCell::new(Vec::new()),
            detach_event: RefCell::new(None),
        })
    }

    /// Make handlers created from now on fire `event_type` on the surface when detached
    pub fn dispatch_on_detach(&self, event_type: &str) {
        *self.detach_event.borrow_mut() = Some(event_type.to_string());
    }

    /// Emitters handed to every handler this factory created, oldest first
    pub fn emitters(&self) -> Vec<HandlerEmitter> {
        self.emitters.borrow().clone()
    }

    pub fn created(&self) -> usize {
        self.emitters.borrow().len()
    }
}

impl StreamFactory for MockFactory {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_supported(&self, _env: &EnvironmentCapabilities) -> bool {
        self.supported
    }

    fn can_play(&self, stream_type: StreamType) -> bool {
        self.plays.contains(&stream_type)
    }

    fn delivery_method(&self) -> DeliveryMethod {
        self.delivery
    }

    fn create(&self, streams: Vec<StreamDescriptor>, emitter: HandlerEmitter) -> Result<Box<dyn StreamHandler>> {
        self.emitters.borrow_mut().push(emitter);
        Ok(Box::new(MockHandler {
            name: self.name.clone(),
            streams,
            delivery: self.delivery,
            log: self.log.clone(),
            detach_event: self.detach_event.borrow().clone(),
        }))
    }
}

// =============================================================================
// Mock adaptive library
// =============================================================================

/// Record of an adaptive engine's activity
#[derive(Default)]
pub struct EngineLog {
    pub loads: Vec<(String, Option<u32>)>,
    pub levels: Vec<usize>,
    pub destroyed: usize,
    pub events: Option<EngineEvents>,
}

pub struct MockBackend {
    name: &'static str,
    pub log: Rc<RefCell<EngineLog>>,
}

impl MockBackend {
    pub fn new(name: &'static str) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: Rc::new(RefCell::new(EngineLog::default())),
        })
    }

    /// Report a parsed manifest through the most recent engine
    pub fn manifest_parsed(&self, levels: Vec<MediaLevel>) {
        let events = self.log.borrow().events.clone();
        if let Some(events) = events {
            events.manifest_parsed(levels);
        }
    }

    pub fn load_failed(&self, reason: &str) {
        let events = self.log.borrow().events.clone();
        if let Some(events) = events {
            events.load_failed(reason);
        }
    }
}

struct MockEngine {
    log: Rc<RefCell<EngineLog>>,
}

impl AdaptiveEngine for MockEngine {
    fn load(&mut self, _surface: &SurfaceRef, url: &str, initial_bitrate: Option<u32>, events: EngineEvents) {
        let mut log = self.log.borrow_mut();
        log.loads.push((url.to_string(), initial_bitrate));
        log.events = Some(events);
    }

    fn set_level(&mut self, index: usize) {
        self.log.borrow_mut().levels.push(index);
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().destroyed += 1;
    }
}

impl AdaptiveBackend for MockBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn create_engine(&self) -> Box<dyn AdaptiveEngine> {
        Box::new(MockEngine {
            log: self.log.clone(),
        })
    }
}

pub fn backends(hls: &Rc<MockBackend>, dash: &Rc<MockBackend>) -> AdaptiveBackends {
    AdaptiveBackends {
        hls: Some(hls.clone()),
        dash: Some(dash.clone()),
    }
}
