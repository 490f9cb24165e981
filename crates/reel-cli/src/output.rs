//! Output formatting for CLI

use reel_core::{EnvironmentCapabilities, PlannedHandler, StreamDescriptor};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Tabled)]
struct StreamRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Type")]
    stream_type: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Handler")]
    handler: String,
    #[tabled(rename = "Type")]
    stream_type: String,
    #[tabled(rename = "Delivery")]
    delivery: String,
    #[tabled(rename = "Streams")]
    streams: usize,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    capabilities: &'a EnvironmentCapabilities,
    plan: &'a [PlannedHandler],
}

fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print classified streams in the selected format
pub fn print_streams(streams: &[StreamDescriptor], format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => print_json(&streams)?,
        OutputFormat::Table => {
            let rows = streams.iter().enumerate().map(|(i, s)| StreamRow {
                index: i + 1,
                stream_type: s.stream_type.to_string(),
                url: s.url.clone(),
                name: s.name.clone().unwrap_or_default(),
            });
            println!("{}", Table::new(rows).with(Style::modern()));
        }
        OutputFormat::Text => {
            println!("Streams: {}", streams.len());
            for (i, s) in streams.iter().enumerate() {
                match &s.name {
                    Some(name) => println!("  {}. {:<4} {} ({})", i + 1, s.stream_type, s.url, name),
                    None => println!("  {}. {:<4} {}", i + 1, s.stream_type, s.url),
                }
            }
        }
    }
    Ok(())
}

/// Print a handler plan in the selected format
pub fn print_plan(
    capabilities: &EnvironmentCapabilities,
    plan: &[PlannedHandler],
    format: &str,
) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => print_json(&PlanReport { capabilities, plan })?,
        OutputFormat::Table => {
            let rows = plan.iter().enumerate().map(|(i, p)| PlanRow {
                rank: i + 1,
                handler: p.handler.clone(),
                stream_type: p.stream_type.to_string(),
                delivery: p.delivery_method.to_string(),
                streams: p.streams,
            });
            println!("{}", Table::new(rows).with(Style::modern()));
        }
        OutputFormat::Text => {
            println!("Environment:");
            println!("  MSE:  {}", capabilities.adaptive_extension_supported);
            println!("  HLS:  {}", capabilities.native_hls);
            println!("  DASH: {}", capabilities.native_dash);
            println!("  MP4:  {}", capabilities.native_mp4);
            println!("  WebM: {}", capabilities.native_webm);

            println!("\nHandlers:");
            for (i, p) in plan.iter().enumerate() {
                let role = if i == 0 { "selected" } else { "fallback" };
                println!(
                    "  {}. {} - {} via {} ({} stream{}) [{}]",
                    i + 1,
                    p.handler,
                    p.stream_type,
                    p.delivery_method,
                    p.streams,
                    if p.streams == 1 { "" } else { "s" },
                    role
                );
            }
        }
    }
    Ok(())
}
