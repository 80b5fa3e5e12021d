//! Queue driver loop

use std::sync::Arc;

use futures::stream::{FuturesOrdered, StreamExt};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, Instrument};

use super::QueuePolicy;
use crate::step_executor::{StepExecutor, StepOutcome};
use crate::tracing_logger::{run_span, RunId};
use crate::types::{MigrationStep, Position, PositionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    NotStarted,
    Running,
    Done,
}

/// Result of one run, outcomes in list order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub step: MigrationStep,
    pub outcomes: Vec<(PositionId, StepOutcome)>,
    pub submitted: usize,
    pub failed: usize,
}

impl RunReport {
    fn new(run_id: &RunId, step: MigrationStep, outcomes: Vec<(PositionId, StepOutcome)>) -> Self {
        let submitted = outcomes.iter().filter(|(_, outcome)| outcome.is_submitted()).count();

        Self {
            run_id: run_id.to_string(),
            step,
            failed: outcomes.len() - submitted,
            submitted,
            outcomes,
        }
    }
}

/// Runs one migration step over a list of positions.
///
/// Runs on one driver never overlap: a `run` issued while another is in
/// progress waits for it to finish, so the published phase always describes
/// a single run.
pub struct QueueDriver {
    executor: Arc<StepExecutor>,
    policy: QueuePolicy,
    phase: watch::Sender<RunPhase>,
    run_lock: Mutex<()>,
}

impl QueueDriver {
    /// Create a new driver; the phase starts at `NotStarted`
    pub fn new(executor: Arc<StepExecutor>, policy: QueuePolicy) -> Self {
        let (phase, _) = watch::channel(RunPhase::NotStarted);

        Self {
            executor,
            policy,
            phase,
            run_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Phase of the current or most recent run
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Watch the phase of successive runs
    pub fn subscribe_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// Runs `step` for every position, head to tail.
    ///
    /// An empty list returns straight away without touching the store or
    /// waiting for another run.
    pub async fn run(&self, step: MigrationStep, positions: &[Position]) -> RunReport {
        let run_id = RunId::new();

        if positions.is_empty() {
            debug!(run_id = %run_id, step = %step, "Nothing to migrate");
            return RunReport::new(&run_id, step, Vec::new());
        }

        let _running = self.run_lock.lock().await;
        let span = run_span(&run_id, step, positions.len());
        self.drive(&run_id, step, positions).instrument(span).await
    }

    async fn drive(&self, run_id: &RunId, step: MigrationStep, positions: &[Position]) -> RunReport {
        self.phase.send_replace(RunPhase::Running);
        info!(policy = ?self.policy, "Migration run started");

        let executor = &self.executor;
        let mut in_flight = FuturesOrdered::new();
        let mut outcomes = Vec::with_capacity(positions.len());

        for (index, position) in positions.iter().enumerate() {
            match self.policy {
                QueuePolicy::FireAndContinue => {
                    in_flight.push_back(async move { (position.id.clone(), executor.execute(step, position).await) });
                }
                QueuePolicy::Serialized { delay } => {
                    if index > 0 {
                        tokio::time::sleep(delay).await;
                    }
                    let outcome = executor.execute(step, position).await;
                    outcomes.push((position.id.clone(), outcome));
                }
            }
        }

        // Fire-and-continue: every queued call starts on the first poll, in list order
        while let Some(settled) = in_flight.next().await {
            outcomes.push(settled);
        }

        let report = RunReport::new(run_id, step, outcomes);
        self.phase.send_replace(RunPhase::Done);

        info!(
            submitted = report.submitted,
            failed = report.failed,
            "Migration run finished"
        );

        report
    }
}
