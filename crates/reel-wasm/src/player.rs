//! JavaScript-facing player

use crate::capabilities::probe_capabilities;
use crate::dash::DashBackend;
use crate::hls::HlsBackend;
use crate::surface::VideoSurface;
use js_sys::{Array, Function, Object};
use reel_core::{
    AdaptiveBackend, AdaptiveBackends, Error, ErrorKind, EventKind, ListenerId, MediaSource,
    Player, PlayerConfig, PlayerEvent, StreamDescriptor, SurfaceRef,
};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlVideoElement;

/// Payload of the `error` event
#[derive(Serialize)]
struct ErrorPayload<'a> {
    kind: ErrorKind,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

impl<'a> From<&'a Error> for ErrorPayload<'a> {
    fn from(err: &'a Error) -> Self {
        Self {
            kind: err.kind(),
            code: err.error_code(),
            message: err.to_string(),
            url: err.url(),
        }
    }
}

/// Convert a canonical event into the value handed to JS listeners
fn payload(event: &PlayerEvent) -> Result<JsValue, serde_wasm_bindgen::Error> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    match event {
        PlayerEvent::LoadStart(state) => state.serialize(&serializer),
        PlayerEvent::DurationChange(value)
        | PlayerEvent::TimeUpdate(value)
        | PlayerEvent::RateChange(value) => Ok(JsValue::from_f64(*value)),
        PlayerEvent::VolumeChange(volume) => volume.serialize(&serializer),
        PlayerEvent::StatusChange(status) => status.serialize(&serializer),
        PlayerEvent::Error(err) => ErrorPayload::from(err).serialize(&serializer),
        PlayerEvent::Levels(levels) => levels.serialize(&serializer),
        PlayerEvent::LevelChange(index) => Ok(JsValue::from_f64(*index as f64)),
    }
}

fn js_error(err: Error) -> JsValue {
    let error = js_sys::Error::new(&err.to_string());
    if let Ok(kind) = serde_wasm_bindgen::to_value(&err.kind()) {
        crate::js::set(&error, "kind", &kind);
    }
    crate::js::set(&error, "code", &JsValue::from_str(err.error_code()));
    error.into()
}

/// Convert a JS `src` value: a URL string, a `{url, type, name?}` descriptor
/// or an array of either
fn to_media_source(value: &JsValue) -> Result<MediaSource, JsValue> {
    if let Some(url) = value.as_string() {
        return Ok(MediaSource::Url(url));
    }
    if let Some(array) = value.dyn_ref::<Array>() {
        let sources = array
            .iter()
            .map(|entry| to_media_source(&entry))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(MediaSource::from(sources));
    }
    if value.is_object() {
        let descriptor: StreamDescriptor = serde_wasm_bindgen::from_value(value.clone())?;
        return Ok(MediaSource::from(descriptor));
    }
    Err(JsValue::from_str("src must be a URL, a stream descriptor or an array of them"))
}

/// JS-side listener ids and the bus registrations behind them
#[derive(Default)]
struct Subscriptions {
    entries: HashMap<u32, (EventKind, ListenerId)>,
    next: u32,
}

impl Subscriptions {
    /// Hand out the id a new listener will be known by
    fn reserve(&mut self) -> u32 {
        self.next += 1;
        self.next
    }

    fn insert(&mut self, id: u32, kind: EventKind, listener: ListenerId) {
        self.entries.insert(id, (kind, listener));
    }

    /// Take the registration of `id` if it was made for `kind`
    fn take(&mut self, id: u32, kind: EventKind) -> Option<ListenerId> {
        match self.entries.get(&id) {
            Some((registered, _)) if *registered == kind => {
                self.entries.remove(&id).map(|(_, listener)| listener)
            }
            _ => None,
        }
    }

    fn forget(&mut self, id: u32) {
        self.entries.remove(&id);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Callback run on delivery: a once listener gives its id back
fn releaser(table: &Rc<RefCell<Subscriptions>>, id: u32, once: bool) -> impl Fn() {
    let registry = once.then(|| Rc::downgrade(table));
    move || {
        if let Some(table) = registry.as_ref().and_then(Weak::upgrade) {
            table.borrow_mut().forget(id);
        }
    }
}

/// Reel player bound to an `HTMLVideoElement`
///
/// ```javascript
/// const player = new ReelPlayer(document.querySelector('video'));
/// player.on('levels', levels => console.log(levels));
/// player.setSrc('https://cdn.example.com/master.m3u8');
/// ```
#[wasm_bindgen]
pub struct ReelPlayer {
    player: Player,
    src: RefCell<Option<(JsValue, MediaSource)>>,
    surface: RefCell<Option<(HtmlVideoElement, SurfaceRef)>>,
    listeners: Rc<RefCell<Subscriptions>>,
}

#[wasm_bindgen]
impl ReelPlayer {
    /// Create a player; `config` is an optional `{initial_bitrate_kbps, strict_native_events}` object
    #[wasm_bindgen(constructor)]
    pub fn new(video: Option<HtmlVideoElement>, config: JsValue) -> Result<ReelPlayer, JsValue> {
        let config: PlayerConfig = if config.is_undefined() || config.is_null() {
            PlayerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };

        let backends = AdaptiveBackends {
            hls: HlsBackend::is_available().then(|| Rc::new(HlsBackend) as Rc<dyn AdaptiveBackend>),
            dash: DashBackend::is_available().then(|| Rc::new(DashBackend) as Rc<dyn AdaptiveBackend>),
        };

        let mut builder = Player::builder()
            .config(config)
            .capabilities(probe_capabilities())
            .backends(backends);

        let surface = video.map(|element| {
            let surface: SurfaceRef = VideoSurface::new(element.clone());
            (element, surface)
        });
        if let Some((_, surface)) = &surface {
            builder = builder.surface(surface.clone());
        }

        Ok(Self {
            player: builder.build(),
            src: RefCell::new(None),
            surface: RefCell::new(surface),
            listeners: Rc::new(RefCell::new(Subscriptions::default())),
        })
    }

    /// Assign the source; `null` clears it
    #[wasm_bindgen(js_name = setSrc)]
    pub fn set_src(&self, src: JsValue) -> Result<(), JsValue> {
        if src.is_undefined() || src.is_null() {
            *self.src.borrow_mut() = None;
            return self.player.set_source(None).map_err(js_error);
        }

        let previous = self
            .src
            .borrow()
            .as_ref()
            .filter(|(value, _)| Object::is(value, &src))
            .map(|(_, source)| source.clone());
        let source = match previous {
            Some(source) => source,
            None => to_media_source(&src)?,
        };

        *self.src.borrow_mut() = Some((src, source.clone()));
        self.player.set_source(Some(source)).map_err(js_error)
    }

    /// The last value passed to `setSrc`
    #[wasm_bindgen(getter)]
    pub fn src(&self) -> JsValue {
        self.src
            .borrow()
            .as_ref()
            .map(|(value, _)| value.clone())
            .unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(js_name = setVideoElement)]
    pub fn set_video_element(&self, video: Option<HtmlVideoElement>) -> Result<(), JsValue> {
        let surface = video.map(|element| {
            let existing = self
                .surface
                .borrow()
                .as_ref()
                .filter(|(current, _)| Object::is(current, &element))
                .map(|(_, surface)| surface.clone());
            let surface = existing.unwrap_or_else(|| VideoSurface::new(element.clone()) as SurfaceRef);
            (element, surface)
        });

        let handle = surface.as_ref().map(|(_, surface)| surface.clone());
        *self.surface.borrow_mut() = surface;
        self.player.set_video_element(handle).map_err(js_error)
    }

    #[wasm_bindgen(js_name = getVideoElement)]
    pub fn video_element(&self) -> Option<HtmlVideoElement> {
        self.surface
            .borrow()
            .as_ref()
            .map(|(element, _)| element.clone())
    }

    #[wasm_bindgen(js_name = getPlaybackState)]
    pub fn playback_state(&self) -> Result<JsValue, JsValue> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        Ok(self.player.playback_state().serialize(&serializer)?)
    }

    pub fn play(&self) {
        self.player.play();
    }

    pub fn pause(&self) {
        self.player.pause();
    }

    /// Bitrate hint in kbps for adaptive streams attached later
    #[wasm_bindgen(js_name = setInitialBitrate)]
    pub fn set_initial_bitrate(&self, kbps: u32) {
        self.player.set_initial_bitrate(kbps);
    }

    #[wasm_bindgen(js_name = setMediaLevel)]
    pub fn set_media_level(&self, index: u32) {
        self.player.set_media_level(index as usize);
    }

    /// Subscribe to an event by name; returns an id for `off`
    pub fn on(&self, event: &str, callback: Function) -> Result<u32, JsValue> {
        self.subscribe(event, callback, false)
    }

    pub fn once(&self, event: &str, callback: Function) -> Result<u32, JsValue> {
        self.subscribe(event, callback, true)
    }

    pub fn off(&self, event: &str, id: u32) -> bool {
        let Some(kind) = EventKind::from_name(event) else {
            return false;
        };
        let listener = self.listeners.borrow_mut().take(id, kind);
        listener.is_some_and(|listener| self.player.off(kind, listener))
    }
}

impl ReelPlayer {
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Number of listeners still registered through `on`/`once`
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn subscribe(&self, event: &str, callback: Function, once: bool) -> Result<u32, JsValue> {
        let kind = EventKind::from_name(event)
            .ok_or_else(|| JsValue::from_str(&format!("unknown event: {}", event)))?;

        let id = self.listeners.borrow_mut().reserve();

        let release = releaser(&self.listeners, id, once);
        let deliver = move |event: &PlayerEvent| {
            release();
            match payload(event) {
                Ok(value) => {
                    if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                        web_sys::console::error_2(&"[Reel] listener threw".into(), &err);
                    }
                }
                Err(err) => tracing::warn!(kind = %event.kind(), error = %err, "Failed to convert event payload"),
            }
        };
        let listener = if once {
            self.player.once(kind, deliver)
        } else {
            self.player.on(kind, deliver)
        };

        self.listeners.borrow_mut().insert(id, kind, listener);
        Ok(id)
    }
}
