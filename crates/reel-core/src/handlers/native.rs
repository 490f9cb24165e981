//! Streams the video element plays by itself

use super::{HandlerEmitter, StreamHandler};
use crate::{DeliveryMethod, MediaLevel, StreamDescriptor, SurfaceRef};
use tracing::{debug, warn};

/// Handler that hands stream URLs straight to the surface.
///
/// Every stream in the group is one rendition; switching level reassigns
/// the surface source and restores the playback position.
pub struct NativeStream {
    streams: Vec<StreamDescriptor>,
    delivery_method: DeliveryMethod,
    current_level: usize,
    emitter: HandlerEmitter,
}

impl NativeStream {
    pub fn new(
        streams: Vec<StreamDescriptor>,
        delivery_method: DeliveryMethod,
        emitter: HandlerEmitter,
    ) -> Self {
        Self {
            streams,
            delivery_method,
            current_level: 0,
            emitter,
        }
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    fn levels(&self) -> Vec<MediaLevel> {
        self.streams
            .iter()
            .map(|stream| MediaLevel::named(stream.name.clone().unwrap_or_else(|| stream.url.clone())))
            .collect()
    }
}

impl StreamHandler for NativeStream {
    fn attach(&mut self, surface: &SurfaceRef, _initial_bitrate: Option<u32>) {
        let Some(stream) = self.streams.get(self.current_level) else {
            warn!(level = self.current_level, "Native stream has no rendition to attach");
            return;
        };

        debug!(url = %stream.url, delivery = %self.delivery_method, "Attaching native stream");
        surface.set_src(&stream.url);
        self.emitter.levels(self.levels());
        self.emitter.level_change(self.current_level);
    }

    fn detach(&mut self, surface: &SurfaceRef) {
        surface.set_src("");
    }

    fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    fn set_level(&mut self, index: usize, surface: &SurfaceRef) {
        let Some(stream) = self.streams.get(index) else {
            debug!(index, levels = self.streams.len(), "Ignoring out of range level");
            return;
        };

        self.current_level = index;
        let position = surface.current_time();
        surface.set_src(&stream.url);
        surface.set_current_time(position);
        self.emitter.level_change(index);
    }
}
