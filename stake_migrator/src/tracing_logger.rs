//! Tracing subscriber setup and per-run correlation ids

use std::fmt;

use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::types::MigrationStep;

/// Identifies one queue run in the logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_subscriber(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt_layer::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // A subscriber may already be installed (tests, embedding apps)
    if tracing_subscriber::registry().with(filter).with(layer).try_init().is_ok() {
        info!("Tracing logger initialized");
    }
}

/// Span wrapping every executor call of one run
pub fn run_span(run_id: &RunId, step: MigrationStep, positions: usize) -> Span {
    info_span!("migration_run", run_id = %run_id, step = %step, positions)
}
