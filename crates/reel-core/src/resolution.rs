//! Playback resolution: choosing handlers for classified streams
//!
//! 1. Group streams by type, keeping the order in which types first appear.
//! 2. For each group, the first factory that can play the type creates a
//!    handler for the whole group.
//! 3. Handlers are stable-sorted by delivery method, best first.
//!
//! Only the first handler is attached. Input order matters only between
//! handlers of equal delivery rank.

use crate::handlers::{HandlerEmitter, HandlerFactory, HandlerId, StreamHandler};
use crate::{DeliveryMethod, Error, Result, StreamDescriptor, StreamType};
use serde::Serialize;
use tracing::debug;

/// A handler produced by resolution, tagged with its emitter id
pub struct ResolvedHandler {
    pub id: HandlerId,
    pub handler: Box<dyn StreamHandler>,
}

impl std::fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("id", &self.id)
            .field("delivery_method", &self.handler.delivery_method())
            .finish()
    }
}

/// One row of a dry-run resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedHandler {
    /// Factory name
    pub handler: String,
    pub stream_type: StreamType,
    pub delivery_method: DeliveryMethod,
    /// Number of streams the handler would receive
    pub streams: usize,
}

/// Group streams by type, preserving first-seen type order
pub fn group_by_type(streams: Vec<StreamDescriptor>) -> Vec<(StreamType, Vec<StreamDescriptor>)> {
    let mut groups: Vec<(StreamType, Vec<StreamDescriptor>)> = Vec::new();
    for stream in streams {
        match groups.iter_mut().find(|(t, _)| *t == stream.stream_type) {
            Some((_, group)) => group.push(stream),
            None => groups.push((stream.stream_type, vec![stream])),
        }
    }
    groups
}

fn no_handler_error(groups: &[(StreamType, Vec<StreamDescriptor>)]) -> Error {
    match groups.first() {
        Some((stream_type, streams)) => Error::NoCompatibleHandler {
            stream_type: *stream_type,
            url: streams.first().map(|s| s.url.clone()).unwrap_or_default(),
        },
        None => Error::EmptySource,
    }
}

/// Instantiate handlers for `streams`, best delivery method first.
///
/// Fails if there are no streams, if no factory claims any of them, or if a
/// factory rejects its group.
pub fn resolve(
    streams: Vec<StreamDescriptor>,
    factories: &[HandlerFactory],
    mut next_emitter: impl FnMut() -> HandlerEmitter,
) -> Result<Vec<ResolvedHandler>> {
    if streams.is_empty() {
        return Err(Error::EmptySource);
    }

    let groups = group_by_type(streams);
    let missing = no_handler_error(&groups);
    let mut resolved = Vec::with_capacity(groups.len());

    for (stream_type, group) in groups {
        let Some(factory) = factories.iter().find(|f| f.can_play(stream_type)) else {
            debug!(%stream_type, "No stream handler claims stream type");
            continue;
        };

        let emitter = next_emitter();
        let id = emitter.id();
        debug!(handler = %factory.name(), %stream_type, streams = group.len(), %id, "Creating stream handler");
        let handler = factory.create(group, emitter)?;
        resolved.push(ResolvedHandler { id, handler });
    }

    if resolved.is_empty() {
        return Err(missing);
    }

    resolved.sort_by(|a, b| b.handler.delivery_method().cmp(&a.handler.delivery_method()));
    Ok(resolved)
}

/// Dry-run resolution using each factory's advertised delivery method
pub fn plan(streams: &[StreamDescriptor], factories: &[HandlerFactory]) -> Result<Vec<PlannedHandler>> {
    if streams.is_empty() {
        return Err(Error::EmptySource);
    }

    let groups = group_by_type(streams.to_vec());
    let mut planned: Vec<PlannedHandler> = groups
        .iter()
        .filter_map(|(stream_type, group)| {
            factories
                .iter()
                .find(|f| f.can_play(*stream_type))
                .map(|factory| PlannedHandler {
                    handler: factory.name(),
                    stream_type: *stream_type,
                    delivery_method: factory.delivery_method(),
                    streams: group.len(),
                })
        })
        .collect();

    if planned.is_empty() {
        return Err(no_handler_error(&groups));
    }

    planned.sort_by(|a, b| b.delivery_method.cmp(&a.delivery_method));
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{BuiltinFactory, StreamFactory};
    use crate::{EnvironmentCapabilities, SurfaceRef};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixed(DeliveryMethod);

    impl StreamHandler for Fixed {
        fn attach(&mut self, _: &SurfaceRef, _: Option<u32>) {}
        fn detach(&mut self, _: &SurfaceRef) {}
        fn delivery_method(&self) -> DeliveryMethod {
            self.0
        }
        fn set_level(&mut self, _: usize, _: &SurfaceRef) {}
    }

    struct FixedFactory {
        name: &'static str,
        plays: StreamType,
        delivery: DeliveryMethod,
    }

    impl StreamFactory for FixedFactory {
        fn name(&self) -> String {
            self.name.to_string()
        }
        fn is_supported(&self, _: &EnvironmentCapabilities) -> bool {
            true
        }
        fn can_play(&self, stream_type: StreamType) -> bool {
            stream_type == self.plays
        }
        fn delivery_method(&self) -> DeliveryMethod {
            self.delivery
        }
        fn create(&self, _: Vec<StreamDescriptor>, _: HandlerEmitter) -> Result<Box<dyn StreamHandler>> {
            Ok(Box::new(Fixed(self.delivery)))
        }
    }

    fn custom(name: &'static str, plays: StreamType, delivery: DeliveryMethod) -> HandlerFactory {
        HandlerFactory::Custom(Rc::new(FixedFactory { name, plays, delivery }))
    }

    fn emitters() -> impl FnMut() -> HandlerEmitter {
        let next = Cell::new(0);
        move || {
            next.set(next.get() + 1);
            HandlerEmitter::detached(HandlerId(next.get()))
        }
    }

    fn stream(url: &str, stream_type: StreamType) -> StreamDescriptor {
        StreamDescriptor::new(url, stream_type)
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let groups = group_by_type(vec![
            stream("a", StreamType::Mp4),
            stream("b", StreamType::Hls),
            stream("c", StreamType::Mp4),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, StreamType::Mp4);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, StreamType::Hls);
    }

    #[test]
    fn test_best_delivery_method_first_regardless_of_input_order() {
        let factories = vec![
            custom("progressive", StreamType::Mp4, DeliveryMethod::NativeProgressive),
            custom("mse", StreamType::Dash, DeliveryMethod::AdaptiveViaExtension),
            custom("native", StreamType::Hls, DeliveryMethod::NativeAdaptive),
        ];
        let inputs = [
            vec![stream("a", StreamType::Mp4), stream("b", StreamType::Dash), stream("c", StreamType::Hls)],
            vec![stream("c", StreamType::Hls), stream("b", StreamType::Dash), stream("a", StreamType::Mp4)],
        ];

        for streams in inputs {
            let resolved = resolve(streams, &factories, emitters()).unwrap();
            let methods: Vec<_> = resolved.iter().map(|r| r.handler.delivery_method()).collect();
            assert_eq!(
                methods,
                vec![
                    DeliveryMethod::NativeAdaptive,
                    DeliveryMethod::AdaptiveViaExtension,
                    DeliveryMethod::NativeProgressive,
                ]
            );
        }
    }

    #[test]
    fn test_ties_keep_type_order() {
        let factories = vec![
            custom("mp4", StreamType::Mp4, DeliveryMethod::NativeProgressive),
            custom("webm", StreamType::Webm, DeliveryMethod::NativeProgressive),
        ];
        let plan_a = plan(&[stream("w", StreamType::Webm), stream("m", StreamType::Mp4)], &factories).unwrap();
        assert_eq!(plan_a[0].handler, "webm");

        let plan_b = plan(&[stream("m", StreamType::Mp4), stream("w", StreamType::Webm)], &factories).unwrap();
        assert_eq!(plan_b[0].handler, "mp4");
    }

    #[test]
    fn test_first_claiming_factory_wins() {
        let factories = vec![
            custom("first", StreamType::Hls, DeliveryMethod::AdaptiveViaExtension),
            custom("second", StreamType::Hls, DeliveryMethod::NativeAdaptive),
        ];
        let planned = plan(&[stream("x", StreamType::Hls)], &factories).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].handler, "first");
    }

    #[test]
    fn test_unclaimed_types_are_skipped() {
        let factories = vec![custom("mp4", StreamType::Mp4, DeliveryMethod::NativeProgressive)];
        let resolved = resolve(
            vec![stream("d", StreamType::Dash), stream("m", StreamType::Mp4)],
            &factories,
            emitters(),
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, HandlerId(1));
    }

    #[test]
    fn test_no_compatible_handler() {
        let factories = vec![HandlerFactory::Builtin(BuiltinFactory::NativeProgressive(StreamType::Mp4))];
        let err = resolve(vec![stream("http://host/a.mpd", StreamType::Dash)], &factories, emitters())
            .err()
            .unwrap();
        assert_eq!(
            err,
            Error::NoCompatibleHandler {
                stream_type: StreamType::Dash,
                url: "http://host/a.mpd".to_string(),
            }
        );
        assert_eq!(resolve(vec![], &factories, emitters()).err(), Some(Error::EmptySource));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let factories = vec![
            custom("native", StreamType::Hls, DeliveryMethod::NativeAdaptive),
            custom("mp4", StreamType::Mp4, DeliveryMethod::NativeProgressive),
        ];
        let streams = [stream("m", StreamType::Mp4), stream("h", StreamType::Hls)];
        let first = plan(&streams, &factories).unwrap();
        for _ in 0..5 {
            assert_eq!(plan(&streams, &factories).unwrap(), first);
        }
    }
}
