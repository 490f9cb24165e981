//! Headless playback example
//!
//! Drives a player against an in-memory surface: assigns a mixed source
//! list, shows which handler gets attached and replays a few native events.
//!
//! Run with: cargo run -p reel-core --example headless

use reel_core::{
    Completion, EnvironmentCapabilities, EventKind, MediaSource, NativeError, NativeEvent,
    NativeListener, Player, PlayerEvent, StreamDescriptor, StreamType, Surface, SurfaceKey,
    SurfaceRef,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Surface that keeps its state in memory and prints what happens to it
#[derive(Default)]
struct HeadlessSurface {
    src: RefCell<String>,
    time: Cell<f64>,
    paused: Cell<bool>,
    listeners: RefCell<HashMap<String, Vec<NativeListener>>>,
}

impl HeadlessSurface {
    fn dispatch(self: &Rc<Self>, event_type: &str) {
        let event = NativeEvent::new(event_type, SurfaceKey::of::<HeadlessSurface>(self));
        let listeners = self
            .listeners
            .borrow()
            .get(event_type)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Surface for HeadlessSurface {
    fn src(&self) -> String {
        self.src.borrow().clone()
    }

    fn set_src(&self, url: &str) {
        println!("  [surface] src = {:?}", url);
        *self.src.borrow_mut() = url.to_string();
    }

    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn set_current_time(&self, time: f64) {
        self.time.set(time);
    }

    fn duration(&self) -> f64 {
        120.0
    }

    fn volume(&self) -> f64 {
        1.0
    }

    fn muted(&self) -> bool {
        false
    }

    fn playback_rate(&self) -> f64 {
        1.0
    }

    fn paused(&self) -> bool {
        self.paused.get()
    }

    fn error(&self) -> Option<NativeError> {
        None
    }

    fn play(&self, _completion: Completion) -> Result<(), NativeError> {
        self.paused.set(false);
        Ok(())
    }

    fn pause(&self, _completion: Completion) -> Result<(), NativeError> {
        self.paused.set(true);
        Ok(())
    }

    fn add_event_listener(&self, event_type: &str, listener: NativeListener) {
        self.listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(listener);
    }

    fn remove_event_listener(&self, event_type: &str, listener: &NativeListener) {
        if let Some(listeners) = self.listeners.borrow_mut().get_mut(event_type) {
            listeners.retain(|l| !Rc::ptr_eq(l, listener));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn main() {
    println!("Reel Core - Headless Playback Example");
    println!("=====================================\n");

    let surface = Rc::new(HeadlessSurface {
        paused: Cell::new(true),
        ..Default::default()
    });
    let handle: SurfaceRef = surface.clone();

    // Desktop browser without hls.js or dash.js loaded
    let player = Player::new(EnvironmentCapabilities::desktop(), Some(handle));

    for kind in [EventKind::StatusChange, EventKind::TimeUpdate, EventKind::Error] {
        player.on(kind, |event| match event {
            PlayerEvent::StatusChange(status) => println!("  [event] status: {}", status),
            PlayerEvent::TimeUpdate(time) => println!("  [event] time: {:.1}s", time),
            PlayerEvent::Error(err) => println!("  [event] error: {}", err),
            _ => {}
        });
    }

    let source = MediaSource::from(vec![
        MediaSource::from(StreamDescriptor::new("https://cdn.example.com/live/master.m3u8", StreamType::Hls)),
        MediaSource::from("https://cdn.example.com/vod/movie.webm"),
        MediaSource::from("https://cdn.example.com/vod/movie.mp4"),
    ]);

    println!("Planned handlers for {}:", source);
    match player.plan(&source) {
        Ok(plan) => {
            for (i, planned) in plan.iter().enumerate() {
                println!(
                    "  {}. {} ({} via {})",
                    i + 1,
                    planned.handler,
                    planned.stream_type,
                    planned.delivery_method
                );
            }
        }
        Err(err) => println!("  no plan: {}", err),
    }

    println!("\nAssigning source:");
    if let Err(err) = player.set_source(Some(source)) {
        println!("  failed: {}", err);
        return;
    }

    println!("\nReplaying native events:");
    player.play();
    surface.dispatch("playing");
    surface.time.set(4.2);
    surface.dispatch("timeupdate");
    player.pause();
    surface.dispatch("pause");

    println!("\nPlayback state: {}", player.playback_state().to_json());
}
