//! dash.js engine
//!
//! Expects the `dashjs` global to be loaded on the page.

use crate::capabilities::has_global;
use crate::js;
use crate::surface::{native_error, VideoSurface};
use js_sys::{Array, Function};
use reel_core::{AdaptiveBackend, AdaptiveEngine, EngineEvents, SurfaceRef};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlMediaElement;

#[wasm_bindgen]
extern "C" {
    type MediaPlayerFactory;

    #[wasm_bindgen(js_namespace = dashjs, js_name = MediaPlayer, catch)]
    fn media_player() -> Result<MediaPlayerFactory, JsValue>;

    #[wasm_bindgen(method)]
    fn create(this: &MediaPlayerFactory) -> DashPlayer;

    #[derive(Clone)]
    type DashPlayer;

    #[wasm_bindgen(method)]
    fn initialize(this: &DashPlayer, view: &HtmlMediaElement, url: &str, auto_play: bool);

    #[wasm_bindgen(method, js_name = setInitialBitrateFor)]
    fn set_initial_bitrate_for(this: &DashPlayer, media_type: &str, kbps: f64);

    #[wasm_bindgen(method, js_name = getBitrateInfoListFor)]
    fn get_bitrate_info_list_for(this: &DashPlayer, media_type: &str) -> Array;

    #[wasm_bindgen(method, js_name = updateSettings)]
    fn update_settings(this: &DashPlayer, settings: &JsValue);

    #[wasm_bindgen(method, js_name = setQualityFor)]
    fn set_quality_for(this: &DashPlayer, media_type: &str, index: u32);

    #[wasm_bindgen(method)]
    fn reset(this: &DashPlayer);

    #[wasm_bindgen(method)]
    fn on(this: &DashPlayer, event: &str, callback: &Function);

    #[wasm_bindgen(method)]
    fn off(this: &DashPlayer, event: &str, callback: &Function);
}

const STREAM_INITIALIZED: &str = "streamInitialized";
const QUALITY_CHANGE_RENDERED: &str = "qualityChangeRendered";
const ERROR: &str = "error";

/// dash.js backend for DASH over MSE
#[derive(Debug, Default)]
pub struct DashBackend;

impl DashBackend {
    /// Whether the `dashjs` global is loaded
    pub fn is_available() -> bool {
        has_global("dashjs")
    }
}

impl AdaptiveBackend for DashBackend {
    fn name(&self) -> &str {
        "dash.js"
    }

    fn is_supported(&self) -> bool {
        Self::is_available()
    }

    fn create_engine(&self) -> Box<dyn AdaptiveEngine> {
        Box::new(DashEngine::default())
    }
}

type EventClosure = Closure<dyn FnMut(JsValue)>;

/// Returns true for dash.js errors that mean the manifest itself failed
fn is_manifest_error(data: &JsValue) -> bool {
    match js::string(data, "error").as_deref() {
        Some("manifestError") => true,
        Some("download") => js::string(&js::get(data, "event"), "id").as_deref() == Some("manifest"),
        _ => false,
    }
}

#[derive(Default)]
struct DashEngine {
    player: Option<DashPlayer>,
    callbacks: Vec<(&'static str, EventClosure)>,
}

/// Patch for `updateSettings`: `{streaming: {abr: {autoSwitchBitrate: {video}}}}`
#[derive(Serialize)]
struct AbrSettings {
    streaming: Streaming,
}

#[derive(Serialize)]
struct Streaming {
    abr: Abr,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Abr {
    auto_switch_bitrate: AutoSwitch,
}

#[derive(Serialize)]
struct AutoSwitch {
    video: bool,
}

impl AbrSettings {
    fn video_auto_switch(enabled: bool) -> Self {
        Self {
            streaming: Streaming {
                abr: Abr {
                    auto_switch_bitrate: AutoSwitch { video: enabled },
                },
            },
        }
    }
}

impl DashEngine {
    fn listen(&mut self, player: &DashPlayer, event: &'static str, callback: impl FnMut(JsValue) + 'static) {
        let closure = EventClosure::new(callback);
        player.on(event, closure.as_ref().unchecked_ref());
        self.callbacks.push((event, closure));
    }
}

impl AdaptiveEngine for DashEngine {
    fn load(&mut self, surface: &SurfaceRef, url: &str, initial_bitrate: Option<u32>, events: EngineEvents) {
        let Some(media) = VideoSurface::media_element(surface) else {
            events.load_failed("dash.js needs a video element surface");
            return;
        };

        let player = match media_player() {
            Ok(factory) => factory.create(),
            Err(err) => {
                events.load_failed(native_error(&err).message);
                return;
            }
        };

        // Levels are only known once the stream is initialized
        let handle = player.clone();
        let initialized = events.clone();
        self.listen(&player, STREAM_INITIALIZED, move |_| {
            initialized.manifest_parsed(js::levels(&handle.get_bitrate_info_list_for("video")));
        });

        let switched = events.clone();
        self.listen(&player, QUALITY_CHANGE_RENDERED, move |data| {
            if js::string(&data, "mediaType").as_deref() != Some("video") {
                return;
            }
            if let Some(quality) = js::number(&data, "newQuality") {
                switched.level_switched(quality as usize);
            }
        });

        self.listen(&player, ERROR, move |data| {
            if is_manifest_error(&data) {
                events.load_failed(js::string(&data, "error").unwrap_or_default());
            }
        });

        player.initialize(media, url, media.autoplay());
        if let Some(kbps) = initial_bitrate {
            player.set_initial_bitrate_for("video", f64::from(kbps));
        }
        self.player = Some(player);
    }

    fn set_level(&mut self, index: usize) {
        if let Some(player) = &self.player {
            // A pinned quality only holds with ABR switching off
            let serializer = serde_wasm_bindgen::Serializer::json_compatible();
            match AbrSettings::video_auto_switch(false).serialize(&serializer) {
                Ok(settings) => player.update_settings(&settings),
                Err(err) => tracing::warn!(error = %err, "Failed to build dash.js settings"),
            }
            player.set_quality_for("video", u32::try_from(index).unwrap_or(u32::MAX));
        }
    }

    fn destroy(&mut self) {
        let Some(player) = self.player.take() else {
            return;
        };
        player.reset();
        for (event, closure) in self.callbacks.drain(..) {
            player.off(event, closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for DashEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
