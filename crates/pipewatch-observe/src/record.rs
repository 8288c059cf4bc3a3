//! Script replay against a fresh, observed pipeline.

use pipewatch_core::{Mutation, Pipeline};

use crate::config::ObserverConfig;
use crate::error::ObserveError;
use crate::event::ChangeEvent;
use crate::observer::ChangeObserver;

/// Parses a JSON array of mutations.
pub fn parse_script(raw: &str) -> Result<Vec<Mutation>, ObserveError> {
    Ok(serde_json::from_str(raw)?)
}

/// Replays `script` on an empty pipeline under `config` and returns the
/// complete event log. Stops at the first failing mutation.
pub async fn record(script: &[Mutation], config: &ObserverConfig) -> Result<Vec<ChangeEvent>, ObserveError> {
    let mut pipeline = Pipeline::new();
    let (observer, events) = ChangeObserver::attach(&mut pipeline, config)?;

    pipeline.apply_all(script)?;
    observer.finish().await;

    let log = events.collect().await;
    tracing::debug!(
        mutations = script.len(),
        events = log.len(),
        strategy = %config.strategy,
        "script recorded"
    );
    Ok(log)
}

/// Encodes an event log as one JSON object per line.
pub fn to_json_lines(events: &[ChangeEvent]) -> Result<String, ObserveError> {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}
