//! CLI command implementations

use anyhow::{bail, Context};
use reel_core::{
    AdaptiveBackend, AdaptiveBackends, AdaptiveEngine, EngineEvents, EnvironmentCapabilities,
    MediaSource, SourceHandlerRegistry, StreamDescriptor, StreamHandlerRegistry, StreamType,
    SurfaceRef,
};
use std::rc::Rc;
use tracing::debug;

use crate::output;

/// Stand-in for a browser streaming library when planning offline
struct OfflineBackend {
    name: &'static str,
}

impl AdaptiveBackend for OfflineBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn create_engine(&self) -> Box<dyn AdaptiveEngine> {
        Box::new(OfflineEngine)
    }
}

struct OfflineEngine;

impl AdaptiveEngine for OfflineEngine {
    fn load(&mut self, _surface: &SurfaceRef, _url: &str, _initial_bitrate: Option<u32>, events: EngineEvents) {
        events.load_failed("streaming libraries are not available offline");
    }

    fn set_level(&mut self, _index: usize) {}

    fn destroy(&mut self) {}
}

fn offline_backends() -> AdaptiveBackends {
    AdaptiveBackends {
        hls: Some(Rc::new(OfflineBackend { name: "hls.js" })),
        dash: Some(Rc::new(OfflineBackend { name: "dash.js" })),
    }
}

/// Parse one command-line source: a URL, a JSON descriptor or a JSON array of descriptors
pub fn parse_source(arg: &str) -> anyhow::Result<MediaSource> {
    let trimmed = arg.trim();
    if trimmed.starts_with('{') {
        let descriptor: StreamDescriptor = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid stream descriptor: {}", trimmed))?;
        return Ok(descriptor.into());
    }
    if trimmed.starts_with('[') {
        let descriptors: Vec<StreamDescriptor> = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid stream descriptor list: {}", trimmed))?;
        return Ok(descriptors.into_iter().map(MediaSource::from).collect::<Vec<_>>().into());
    }
    Ok(MediaSource::Url(trimmed.to_string()))
}

/// A single argument stays as is, several become a list
fn parse_sources(args: &[String]) -> anyhow::Result<MediaSource> {
    let mut sources = args
        .iter()
        .map(|arg| parse_source(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if sources.len() == 1 {
        if let Some(source) = sources.pop() {
            return Ok(source);
        }
    }
    Ok(sources.into())
}

/// Parse `--env`: a preset or a comma-separated capability list
pub fn parse_env(spec: &str) -> anyhow::Result<EnvironmentCapabilities> {
    match spec.trim().to_lowercase().as_str() {
        "all" => return Ok(EnvironmentCapabilities::all()),
        "desktop" => return Ok(EnvironmentCapabilities::desktop()),
        "none" | "" => return Ok(EnvironmentCapabilities::none()),
        _ => {}
    }

    let mut env = EnvironmentCapabilities::none();
    for token in spec.split(',').map(|t| t.trim().to_lowercase()) {
        env = match token.as_str() {
            "mse" => env.with_adaptive_extension(true),
            "hls" => env.with_native(StreamType::Hls, true),
            "dash" => env.with_native(StreamType::Dash, true),
            "mp4" => env.with_native(StreamType::Mp4, true),
            "webm" => env.with_native(StreamType::Webm, true),
            "" => env,
            other => bail!("Unknown capability '{}' (expected mse, hls, dash, mp4, webm)", other),
        };
    }
    Ok(env)
}

/// Classify sources and print the resulting streams
pub fn classify(sources: &[String], format: &str) -> anyhow::Result<()> {
    let source = parse_sources(sources)?;
    let registry = SourceHandlerRegistry::builtin();
    let streams = registry
        .classify(&source)
        .with_context(|| format!("Failed to classify {}", source))?;

    debug!(streams = streams.len(), "Classified");
    output::print_streams(&streams, format)
}

/// Print the handlers that would play the sources, best first
pub fn plan(sources: &[String], env: &str, format: &str) -> anyhow::Result<()> {
    let source = parse_sources(sources)?;
    let capabilities = parse_env(env)?;

    let streams = SourceHandlerRegistry::builtin()
        .classify(&source)
        .with_context(|| format!("Failed to classify {}", source))?;

    let registry = StreamHandlerRegistry::builtin(&capabilities, &offline_backends());
    let plan = registry
        .plan(&streams)
        .with_context(|| format!("No playback plan for {}", source))?;

    debug!(handlers = plan.len(), ?capabilities, "Planned");
    output::print_plan(&capabilities, &plan, format)
}
