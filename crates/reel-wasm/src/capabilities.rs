//! Browser capability detection

use js_sys::Reflect;
use reel_core::EnvironmentCapabilities;
use std::cell::OnceCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlMediaElement;

thread_local! {
    static CAPABILITIES: OnceCell<EnvironmentCapabilities> = const { OnceCell::new() };
}

/// What this browser can play, probed on first use
pub fn probe_capabilities() -> EnvironmentCapabilities {
    CAPABILITIES.with(|cell| *cell.get_or_init(probe))
}

/// Capabilities as a plain JS object
#[wasm_bindgen(js_name = probeCapabilities)]
pub fn probe_capabilities_js() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&probe_capabilities()).map_err(JsValue::from)
}

/// Returns true if the page has a global named `name`
pub(crate) fn has_global(name: &str) -> bool {
    Reflect::has(&js_sys::global(), &JsValue::from_str(name)).unwrap_or(false)
}

fn probe() -> EnvironmentCapabilities {
    let Some(window) = web_sys::window() else {
        return EnvironmentCapabilities::none();
    };

    let video = window
        .document()
        .and_then(|document| document.create_element("video").ok())
        .and_then(|element| element.dyn_into::<HtmlMediaElement>().ok());
    let can_play = |mime: &str| {
        video
            .as_ref()
            .map(|video| !video.can_play_type(mime).is_empty())
            .unwrap_or(false)
    };

    let capabilities = EnvironmentCapabilities {
        adaptive_extension_supported: has_global("MediaSource") || has_global("WebKitMediaSource"),
        native_hls: can_play("application/x-mpegURL") || can_play("application/vnd.apple.mpegURL"),
        native_dash: can_play("application/dash+xml"),
        native_mp4: can_play("video/mp4"),
        native_webm: can_play("video/webm"),
    };
    tracing::debug!(?capabilities, "Probed browser capabilities");
    capabilities
}
