//! hls.js engine
//!
//! Expects the `Hls` global from hls.js to be loaded on the page.

use crate::capabilities::has_global;
use crate::js;
use crate::surface::{native_error, VideoSurface};
use js_sys::{Function, Object};
use reel_core::{AdaptiveBackend, AdaptiveEngine, EngineEvents, SurfaceRef};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlMediaElement;

#[wasm_bindgen]
extern "C" {
    type Hls;

    #[wasm_bindgen(constructor, catch)]
    fn new(config: &JsValue) -> Result<Hls, JsValue>;

    #[wasm_bindgen(static_method_of = Hls, js_name = isSupported, catch)]
    fn is_supported() -> Result<bool, JsValue>;

    #[wasm_bindgen(method, js_name = attachMedia)]
    fn attach_media(this: &Hls, media: &HtmlMediaElement);

    #[wasm_bindgen(method, js_name = loadSource)]
    fn load_source(this: &Hls, url: &str);

    #[wasm_bindgen(method)]
    fn on(this: &Hls, event: &str, callback: &Function);

    #[wasm_bindgen(method)]
    fn off(this: &Hls, event: &str, callback: &Function);

    #[wasm_bindgen(method)]
    fn destroy(this: &Hls);

    #[wasm_bindgen(method, setter = currentLevel)]
    fn set_current_level(this: &Hls, level: i32);
}

const MANIFEST_PARSED: &str = "hlsManifestParsed";
const LEVEL_SWITCHED: &str = "hlsLevelSwitched";
const ERROR: &str = "hlsError";

/// hls.js backend for HLS over MSE
#[derive(Debug, Default)]
pub struct HlsBackend;

impl HlsBackend {
    /// Whether the `Hls` global is loaded
    pub fn is_available() -> bool {
        has_global("Hls")
    }
}

impl AdaptiveBackend for HlsBackend {
    fn name(&self) -> &str {
        "hls.js"
    }

    fn is_supported(&self) -> bool {
        Self::is_available() && Hls::is_supported().unwrap_or(false)
    }

    fn create_engine(&self) -> Box<dyn AdaptiveEngine> {
        Box::new(HlsEngine::default())
    }
}

type EventClosure = Closure<dyn FnMut(JsValue, JsValue)>;

#[derive(Default)]
struct HlsEngine {
    hls: Option<Hls>,
    callbacks: Vec<(&'static str, EventClosure)>,
}

impl HlsEngine {
    fn listen(&mut self, hls: &Hls, event: &'static str, callback: impl FnMut(JsValue, JsValue) + 'static) {
        let closure = EventClosure::new(callback);
        hls.on(event, closure.as_ref().unchecked_ref());
        self.callbacks.push((event, closure));
    }
}

impl AdaptiveEngine for HlsEngine {
    fn load(&mut self, surface: &SurfaceRef, url: &str, initial_bitrate: Option<u32>, events: EngineEvents) {
        let Some(media) = VideoSurface::media_element(surface) else {
            events.load_failed("hls.js needs a video element surface");
            return;
        };

        let config: JsValue = Object::new().into();
        if let Some(kbps) = initial_bitrate {
            js::set(&config, "abrEwmaDefaultEstimate", &JsValue::from_f64(f64::from(kbps) * 1000.0));
        }
        let hls = match Hls::new(&config) {
            Ok(hls) => hls,
            Err(err) => {
                events.load_failed(native_error(&err).message);
                return;
            }
        };

        let parsed = events.clone();
        self.listen(&hls, MANIFEST_PARSED, move |_, data| {
            parsed.manifest_parsed(js::levels(&js::get(&data, "levels")));
        });

        let switched = events.clone();
        self.listen(&hls, LEVEL_SWITCHED, move |_, data| {
            if let Some(level) = js::number(&data, "level") {
                switched.level_switched(level as usize);
            }
        });

        self.listen(&hls, ERROR, move |_, data| {
            let details = js::string(&data, "details").unwrap_or_default();
            if details.starts_with("manifest") {
                events.load_failed(details);
            }
        });

        hls.attach_media(media);
        hls.load_source(url);
        self.hls = Some(hls);
    }

    fn set_level(&mut self, index: usize) {
        if let Some(hls) = &self.hls {
            hls.set_current_level(i32::try_from(index).unwrap_or(-1));
        }
    }

    fn destroy(&mut self) {
        let Some(hls) = self.hls.take() else {
            return;
        };
        for (event, closure) in self.callbacks.drain(..) {
            hls.off(event, closure.as_ref().unchecked_ref());
        }
        hls.destroy();
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
