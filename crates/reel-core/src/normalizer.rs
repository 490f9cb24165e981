//! Native event normalization
//!
//! Translates events dispatched by the surface into canonical
//! [`PlayerEvent`]s. Payloads are read from the surface at the moment the
//! event is handled.

use crate::{Error, NativeError, PlaybackState, PlaybackStatus, PlayerEvent, Surface, VolumeState};
use serde::{Deserialize, Serialize};

/// Native surface events the player listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeEventKind {
    LoadStart,
    DurationChange,
    TimeUpdate,
    RateChange,
    VolumeChange,
    Play,
    Playing,
    Pause,
    Seeking,
    Seeked,
    Ended,
    Error,
}

impl NativeEventKind {
    pub const ALL: [NativeEventKind; 12] = [
        NativeEventKind::LoadStart,
        NativeEventKind::DurationChange,
        NativeEventKind::TimeUpdate,
        NativeEventKind::RateChange,
        NativeEventKind::VolumeChange,
        NativeEventKind::Play,
        NativeEventKind::Playing,
        NativeEventKind::Pause,
        NativeEventKind::Seeking,
        NativeEventKind::Seeked,
        NativeEventKind::Ended,
        NativeEventKind::Error,
    ];

    /// DOM event type
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeEventKind::LoadStart => "loadstart",
            NativeEventKind::DurationChange => "durationchange",
            NativeEventKind::TimeUpdate => "timeupdate",
            NativeEventKind::RateChange => "ratechange",
            NativeEventKind::VolumeChange => "volumechange",
            NativeEventKind::Play => "play",
            NativeEventKind::Playing => "playing",
            NativeEventKind::Pause => "pause",
            NativeEventKind::Seeking => "seeking",
            NativeEventKind::Seeked => "seeked",
            NativeEventKind::Ended => "ended",
            NativeEventKind::Error => "error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for NativeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn status_while(surface: &dyn Surface, paused: PlaybackStatus, playing: PlaybackStatus) -> PlaybackStatus {
    if surface.paused() {
        paused
    } else {
        playing
    }
}

/// Build the canonical event for a native event on `surface`
pub fn normalize(kind: NativeEventKind, surface: &dyn Surface) -> PlayerEvent {
    match kind {
        NativeEventKind::LoadStart => PlayerEvent::LoadStart(PlaybackState::from_surface(surface)),
        NativeEventKind::DurationChange => PlayerEvent::DurationChange(surface.duration()),
        NativeEventKind::TimeUpdate => PlayerEvent::TimeUpdate(surface.current_time()),
        NativeEventKind::RateChange => PlayerEvent::RateChange(surface.playback_rate()),
        NativeEventKind::VolumeChange => PlayerEvent::VolumeChange(VolumeState {
            volume: surface.volume(),
            muted: surface.muted(),
        }),
        NativeEventKind::Play => PlayerEvent::StatusChange(PlaybackStatus::PlayingBuffering),
        NativeEventKind::Playing => PlayerEvent::StatusChange(PlaybackStatus::Playing),
        NativeEventKind::Pause => PlayerEvent::StatusChange(PlaybackStatus::Paused),
        NativeEventKind::Seeking => PlayerEvent::StatusChange(status_while(
            surface,
            PlaybackStatus::PausedBuffering,
            PlaybackStatus::PlayingBuffering,
        )),
        NativeEventKind::Seeked => PlayerEvent::StatusChange(status_while(
            surface,
            PlaybackStatus::Paused,
            PlaybackStatus::Playing,
        )),
        NativeEventKind::Ended => PlayerEvent::StatusChange(PlaybackStatus::Ended),
        NativeEventKind::Error => PlayerEvent::Error(Error::NativePlayback(
            surface
                .error()
                .unwrap_or_else(|| NativeError::new("unknown media error")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Completion, NativeListener};
    use std::cell::{Cell, RefCell};

    struct Probe {
        paused: Cell<bool>,
        error: RefCell<Option<NativeError>>,
    }

    impl Probe {
        fn new(paused: bool) -> Self {
            Self {
                paused: Cell::new(paused),
                error: RefCell::new(None),
            }
        }
    }

    impl Surface for Probe {
        fn src(&self) -> String {
            "http://host/a.mp4".into()
        }
        fn set_src(&self, _: &str) {}
        fn current_time(&self) -> f64 {
            12.5
        }
        fn set_current_time(&self, _: f64) {}
        fn duration(&self) -> f64 {
            90.0
        }
        fn volume(&self) -> f64 {
            0.25
        }
        fn muted(&self) -> bool {
            true
        }
        fn playback_rate(&self) -> f64 {
            1.5
        }
        fn paused(&self) -> bool {
            self.paused.get()
        }
        fn error(&self) -> Option<NativeError> {
            self.error.borrow().clone()
        }
        fn play(&self, _: Completion) -> Result<(), NativeError> {
            Ok(())
        }
        fn pause(&self, _: Completion) -> Result<(), NativeError> {
            Ok(())
        }
        fn add_event_listener(&self, _: &str, _: NativeListener) {}
        fn remove_event_listener(&self, _: &str, _: &NativeListener) {}
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_property_events_read_the_surface() {
        let surface = Probe::new(true);
        assert_eq!(normalize(NativeEventKind::DurationChange, &surface), PlayerEvent::DurationChange(90.0));
        assert_eq!(normalize(NativeEventKind::TimeUpdate, &surface), PlayerEvent::TimeUpdate(12.5));
        assert_eq!(normalize(NativeEventKind::RateChange, &surface), PlayerEvent::RateChange(1.5));
        assert_eq!(
            normalize(NativeEventKind::VolumeChange, &surface),
            PlayerEvent::VolumeChange(VolumeState {
                volume: 0.25,
                muted: true
            })
        );

        let PlayerEvent::LoadStart(state) = normalize(NativeEventKind::LoadStart, &surface) else {
            panic!("expected loadstart");
        };
        assert_eq!(state.duration, 90.0);
        assert_eq!(state.status, PlaybackStatus::Paused);
    }

    #[test]
    fn test_status_mapping() {
        let surface = Probe::new(false);
        let status = |kind| match normalize(kind, &surface) {
            PlayerEvent::StatusChange(status) => status,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(status(NativeEventKind::Play), PlaybackStatus::PlayingBuffering);
        assert_eq!(status(NativeEventKind::Playing), PlaybackStatus::Playing);
        assert_eq!(status(NativeEventKind::Pause), PlaybackStatus::Paused);
        assert_eq!(status(NativeEventKind::Seeking), PlaybackStatus::PlayingBuffering);
        assert_eq!(status(NativeEventKind::Seeked), PlaybackStatus::Playing);
        assert_eq!(status(NativeEventKind::Ended), PlaybackStatus::Ended);

        surface.paused.set(true);
        assert_eq!(status(NativeEventKind::Seeking), PlaybackStatus::PausedBuffering);
        assert_eq!(status(NativeEventKind::Seeked), PlaybackStatus::Paused);
    }

    #[test]
    fn test_error_carries_native_error() {
        let surface = Probe::new(true);
        *surface.error.borrow_mut() = Some(NativeError::with_code(4, "MEDIA_ERR_SRC_NOT_SUPPORTED"));
        assert_eq!(
            normalize(NativeEventKind::Error, &surface),
            PlayerEvent::Error(Error::NativePlayback(NativeError::with_code(4, "MEDIA_ERR_SRC_NOT_SUPPORTED")))
        );

        *surface.error.borrow_mut() = None;
        assert!(matches!(
            normalize(NativeEventKind::Error, &surface),
            PlayerEvent::Error(Error::NativePlayback(_))
        ));
    }

    #[test]
    fn test_native_event_names() {
        for kind in NativeEventKind::ALL {
            assert_eq!(NativeEventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(NativeEventKind::from_name("progress"), None);
    }
}
