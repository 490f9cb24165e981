//! Rendering surface capability interface
//!
//! The player never renders or decodes anything itself. It drives a video
//! capable element through the narrow [`Surface`] trait: source assignment,
//! play/pause, property reads and event listener registration. Browser
//! builds implement it over `HTMLVideoElement`, tests over an in-memory fake.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::rc::Rc;

/// Shared handle to a rendering surface
pub type SurfaceRef = Rc<dyn Surface>;

/// Listener installed on a surface for native events
pub type NativeListener = Rc<dyn Fn(&NativeEvent)>;

/// Identity of a surface, derived from its address.
///
/// Two handles to the same surface always produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceKey(usize);

impl SurfaceKey {
    /// Key of a surface value (use `SurfaceKey::of(self)` inside `Surface` impls)
    pub fn of<S: ?Sized>(surface: &S) -> Self {
        Self(surface as *const S as *const () as usize)
    }

    /// Key of a shared surface handle
    pub fn of_ref(surface: &SurfaceRef) -> Self {
        Self::of::<dyn Surface>(&**surface)
    }
}

/// Returns true if both handles point at the same surface
pub fn same_surface(a: &SurfaceRef, b: &SurfaceRef) -> bool {
    SurfaceKey::of_ref(a) == SurfaceKey::of_ref(b)
}

/// Event dispatched by a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEvent {
    /// Native event type, e.g. `timeupdate`
    pub event_type: String,
    /// Surface the event was dispatched on
    pub target: SurfaceKey,
}

impl NativeEvent {
    pub fn new(event_type: impl Into<String>, target: SurfaceKey) -> Self {
        Self {
            event_type: event_type.into(),
            target,
        }
    }
}

/// Error object reported by the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeError {
    /// Native error code (`MediaError.code` in browsers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for NativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Completion handle for an asynchronous native operation.
///
/// Surfaces whose `play()`/`pause()` settle later keep the handle and call
/// [`Completion::reject`] if the operation fails. Dropping it signals success.
pub struct Completion {
    on_reject: Option<Box<dyn FnOnce(NativeError)>>,
}

impl Completion {
    pub fn new(on_reject: impl FnOnce(NativeError) + 'static) -> Self {
        Self {
            on_reject: Some(Box::new(on_reject)),
        }
    }

    /// A completion nobody listens to
    pub fn ignored() -> Self {
        Self { on_reject: None }
    }

    /// Report that the operation failed
    pub fn reject(mut self, error: NativeError) {
        if let Some(on_reject) = self.on_reject.take() {
            on_reject(error);
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.on_reject.is_some())
            .finish()
    }
}

/// Video-capable rendering surface.
///
/// All methods take `&self`: surfaces are shared handles with interior
/// mutability, like the DOM elements they model.
pub trait Surface {
    /// Currently assigned media URL, empty if none
    fn src(&self) -> String;

    /// Assign a media URL; an empty string unloads the current media
    fn set_src(&self, url: &str);

    fn current_time(&self) -> f64;

    fn set_current_time(&self, time: f64);

    /// Duration in seconds; NaN or infinite while unknown
    fn duration(&self) -> f64;

    fn volume(&self) -> f64;

    fn muted(&self) -> bool;

    fn playback_rate(&self) -> f64;

    fn paused(&self) -> bool;

    /// Last media error, if any
    fn error(&self) -> Option<NativeError>;

    /// Start playback.
    ///
    /// A synchronous failure is returned directly; an asynchronous one is
    /// reported through `completion`.
    fn play(&self, completion: Completion) -> Result<(), NativeError>;

    /// Pause playback, with the same failure contract as [`Surface::play`]
    fn pause(&self, completion: Completion) -> Result<(), NativeError>;

    fn add_event_listener(&self, event_type: &str, listener: NativeListener);

    /// Remove a listener previously added with the same handle
    fn remove_event_listener(&self, event_type: &str, listener: &NativeListener);

    /// Downcast hook for engines that need the concrete element
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_completion_reject_runs_once() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let completion = Completion::new(move |err| {
            assert_eq!(err.message, "AbortError");
            counter.set(counter.get() + 1);
        });
        completion.reject(NativeError::new("AbortError"));
        assert_eq!(hits.get(), 1);

        Completion::ignored().reject(NativeError::new("unobserved"));
    }

    #[test]
    fn test_surface_key_identity() {
        let a = Rc::new(5u8);
        let b = Rc::new(5u8);
        assert_eq!(SurfaceKey::of(&*a), SurfaceKey::of(&*a.clone()));
        assert_ne!(SurfaceKey::of(&*a), SurfaceKey::of(&*b));
    }

    #[test]
    fn test_native_error_display() {
        assert_eq!(NativeError::with_code(4, "unsupported").to_string(), "unsupported (code 4)");
        assert_eq!(NativeError::new("aborted").to_string(), "aborted");
    }
}
