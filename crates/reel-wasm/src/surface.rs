//! `HTMLVideoElement` surface

use reel_core::{Completion, NativeError, NativeEvent, NativeListener, Surface, SurfaceKey, SurfaceRef};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlMediaElement, HtmlVideoElement};

struct Registration {
    event_type: String,
    listener: NativeListener,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

/// Surface backed by a DOM video element
pub struct VideoSurface {
    element: HtmlVideoElement,
    registrations: RefCell<Vec<Registration>>,
}

impl VideoSurface {
    pub fn new(element: HtmlVideoElement) -> Rc<Self> {
        Rc::new(Self {
            element,
            registrations: RefCell::new(Vec::new()),
        })
    }

    pub fn element(&self) -> &HtmlVideoElement {
        &self.element
    }

    /// The media element behind a player surface, if it is a `VideoSurface`
    pub fn media_element(surface: &SurfaceRef) -> Option<&HtmlMediaElement> {
        surface
            .as_any()
            .downcast_ref::<VideoSurface>()
            .map(|video| video.element.as_ref())
    }
}

/// Convert a thrown JS value or promise rejection into a native error
pub(crate) fn native_error(value: &JsValue) -> NativeError {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        let name = String::from(err.name());
        let message = String::from(err.message());
        return NativeError::new(format!("{}: {}", name, message));
    }
    NativeError::new(value.as_string().unwrap_or_else(|| "unknown error".to_string()))
}

impl Surface for VideoSurface {
    fn src(&self) -> String {
        self.element.src()
    }

    fn set_src(&self, url: &str) {
        if url.is_empty() {
            // Assigning "" would make the element try to load the page URL
            let _ = self.element.remove_attribute("src");
            self.element.load();
        } else {
            self.element.set_src(url);
        }
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn set_current_time(&self, time: f64) {
        self.element.set_current_time(time);
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn volume(&self) -> f64 {
        self.element.volume()
    }

    fn muted(&self) -> bool {
        self.element.muted()
    }

    fn playback_rate(&self) -> f64 {
        self.element.playback_rate()
    }

    fn paused(&self) -> bool {
        self.element.paused()
    }

    fn error(&self) -> Option<NativeError> {
        self.element
            .error()
            .map(|err| NativeError::with_code(err.code(), err.message()))
    }

    fn play(&self, completion: Completion) -> Result<(), NativeError> {
        let promise = self.element.play().map_err(|err| native_error(&err))?;
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                completion.reject(native_error(&err));
            }
        });
        Ok(())
    }

    fn pause(&self, _completion: Completion) -> Result<(), NativeError> {
        self.element.pause().map_err(|err| native_error(&err))
    }

    fn add_event_listener(&self, event_type: &str, listener: NativeListener) {
        let target = SurfaceKey::of(self);
        let name = event_type.to_string();
        let callback = listener.clone();
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            callback(&NativeEvent::new(name.clone(), target));
        });

        if let Err(err) = self
            .element
            .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())
        {
            tracing::warn!(event_type, error = ?err, "Failed to add video listener");
            return;
        }

        self.registrations.borrow_mut().push(Registration {
            event_type: event_type.to_string(),
            listener,
            closure,
        });
    }

    fn remove_event_listener(&self, event_type: &str, listener: &NativeListener) {
        let removed = {
            let mut registrations = self.registrations.borrow_mut();
            let position = registrations
                .iter()
                .position(|r| r.event_type == event_type && Rc::ptr_eq(&r.listener, listener));
            position.map(|index| registrations.remove(index))
        };

        if let Some(registration) = removed {
            let _ = self.element.remove_event_listener_with_callback(
                &registration.event_type,
                registration.closure.as_ref().unchecked_ref(),
            );
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VideoSurface {
    fn drop(&mut self) {
        for registration in self.registrations.get_mut().drain(..) {
            let _ = self.element.remove_event_listener_with_callback(
                &registration.event_type,
                registration.closure.as_ref().unchecked_ref(),
            );
        }
    }
}
