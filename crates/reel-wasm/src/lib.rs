//! Reel WASM - browser bindings for the Reel playback engine
//!
//! Binds the core player to a real `HTMLVideoElement`:
//! - Capability probing through `canPlayType` and `MediaSource`
//! - hls.js and dash.js engines for adaptive streams over MSE
//! - A JS-facing [`ReelPlayer`] with named events
//!
//! ## Usage
//!
//! ```javascript
//! import init, { ReelPlayer } from '@reel/wasm';
//!
//! await init();
//! const player = new ReelPlayer(document.querySelector('video'));
//! player.on('statuschange', status => console.log(status));
//! player.setSrc([
//!   { url: 'https://cdn.example.com/master.m3u8', type: 'HLS' },
//!   { url: 'https://cdn.example.com/fallback.mp4', type: 'MP4' },
//! ]);
//! ```
//!
//! hls.js and dash.js are picked up from the `Hls` and `dashjs` globals
//! when the player is created. Without them adaptive streams fall back to
//! native playback where the browser supports it.

use wasm_bindgen::prelude::*;

mod capabilities;
mod dash;
mod hls;
mod js;
mod player;
mod surface;

pub use capabilities::{probe_capabilities, probe_capabilities_js};
pub use dash::DashBackend;
pub use hls::HlsBackend;
pub use player::ReelPlayer;
pub use surface::VideoSurface;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    web_sys::console::log_1(&"[Reel WASM] Initialized".into());
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
