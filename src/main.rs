mod cli;
mod config;
mod logging;
mod scenarios;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use kronos_engine::{Event, EventKind, FieldKeys};
use tracing::info;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let overrides = match &cli.config {
        Some(path) => config::load(path)?,
        None => config::RunOverrides::default(),
    };
    let seed = cli.seed.or(overrides.seed).unwrap_or(0);

    info!(scenario = %cli.scenario, seed, "running scenario");
    let events = scenarios::run(&cli.scenario, &overrides, seed)?;

    let summary = summarize(&events);
    println!("{}: {} events ({summary})", cli.scenario, events.len());

    if let Some(path) = &cli.output {
        let json = render(&events, &FieldKeys::default())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write events: {}", path.display()))?;
        info!(path = %path.display(), "event stream written");
    }

    Ok(())
}

/// Counts events per kind for the one-line summary.
fn summarize(events: &[Event]) -> String {
    let mut counts: Vec<(EventKind, usize)> = Vec::new();
    for ev in events {
        match counts.iter_mut().find(|(k, _)| *k == ev.kind()) {
            Some((_, c)) => *c += 1,
            None => counts.push((ev.kind(), 1)),
        }
    }
    counts
        .iter()
        .map(|(k, c)| format!("{c} {k:?}").to_lowercase())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serializes the stream, rendering jump payloads through the wire
/// field names.
fn render(events: &[Event], keys: &FieldKeys) -> Result<String> {
    let values: Vec<serde_json::Value> = events
        .iter()
        .map(|ev| match ev {
            Event::Jump(jump) => {
                let mut value = keys.jump_json(jump);
                if let Some(map) = value.as_object_mut() {
                    map.insert("at".to_string(), "jump".into());
                }
                Ok(value)
            }
            other => serde_json::to_value(other).context("failed to serialize event"),
        })
        .collect::<Result<_>>()?;
    serde_json::to_string_pretty(&values).context("failed to serialize event stream")
}
