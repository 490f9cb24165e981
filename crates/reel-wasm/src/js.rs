//! Helpers for reading loosely typed JS objects

use js_sys::{Array, Reflect};
use reel_core::MediaLevel;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub(crate) fn get(object: &JsValue, key: &str) -> JsValue {
    Reflect::get(object, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

pub(crate) fn number(object: &JsValue, key: &str) -> Option<f64> {
    get(object, key).as_f64().filter(|n| n.is_finite())
}

pub(crate) fn string(object: &JsValue, key: &str) -> Option<String> {
    get(object, key).as_string()
}

pub(crate) fn set(object: &JsValue, key: &str, value: &JsValue) {
    let _ = Reflect::set(object, &JsValue::from_str(key), value);
}

/// Read `{bitrate, width, height, name}` entries of a level array
pub(crate) fn levels(value: &JsValue) -> Vec<MediaLevel> {
    let Some(array) = value.dyn_ref::<Array>() else {
        return Vec::new();
    };

    array
        .iter()
        .map(|level| MediaLevel {
            bitrate: number(&level, "bitrate").filter(|b| *b > 0.0).map(|b| b as u64),
            width: number(&level, "width").map(|w| w as u32),
            height: number(&level, "height").map(|h| h as u32),
            name: string(&level, "name").filter(|n| !n.is_empty()),
        })
        .collect()
}
