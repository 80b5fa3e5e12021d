//! Migration status store
//!
//! Single source of truth for per position step status plus the append-only
//! transaction and completion logs of a session. Every status write is
//! broadcast to subscribers before `update_status` returns.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::typed_errors::StoreError;
use crate::types::{
    MigrateLpStatus, MigrateStatus, MigrateTransaction, MigrationCompleteLog, MigrationStep, PositionId,
};

/// Default capacity of the status broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Status change pushed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: PositionId,
    pub step: MigrationStep,
    pub status: MigrateStatus,
    pub message: String,
}

pub struct MigrationStatusStore {
    statuses: DashMap<PositionId, MigrateLpStatus>,
    transactions: RwLock<Vec<MigrateTransaction>>,
    completion_log: RwLock<Vec<MigrationCompleteLog>>,
    events: broadcast::Sender<StatusEvent>,
}

impl MigrationStatusStore {
    /// Empty store with the default event buffer
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_CAPACITY)
    }

    /// Store whose broadcast channel keeps `capacity` unread events per subscriber.
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));

        Self {
            statuses: DashMap::new(),
            transactions: RwLock::new(Vec::new()),
            completion_log: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Starts a new session: every listed position goes back to `INCOMPLETE`
    /// for both steps. Logs are kept.
    pub fn initialize<'a>(&self, ids: impl IntoIterator<Item = &'a PositionId>) {
        for id in ids {
            self.statuses.insert(id.clone(), MigrateLpStatus::new(id.clone()));
            for step in MigrationStep::ALL {
                self.notify(StatusEvent {
                    id: id.clone(),
                    step,
                    status: MigrateStatus::Incomplete,
                    message: String::new(),
                });
            }
        }
    }

    /// Sets `(id, step)` to `status`.
    ///
    /// Writes for different positions never contend; the transition is
    /// checked under the entry lock so a rejected write leaves the old value.
    pub fn update_status(
        &self,
        id: &PositionId,
        step: MigrationStep,
        status: MigrateStatus,
        message: impl Into<String>,
    ) -> Result<(), StoreError> {
        let message = message.into();

        {
            let mut entry = self
                .statuses
                .entry(id.clone())
                .or_insert_with(|| MigrateLpStatus::new(id.clone()));
            let state = entry.step_mut(step);

            if !state.status.can_transition_to(status) {
                warn!(
                    position_id = %id,
                    step = %step,
                    from = ?state.status,
                    to = ?status,
                    "Rejected status transition"
                );
                return Err(StoreError::IllegalTransition {
                    id: id.clone(),
                    step,
                    from: state.status,
                    to: status,
                });
            }

            state.status = status;
            state.message = message.clone();
        }

        debug!(position_id = %id, step = %step, status = ?status, "Status updated");

        self.notify(StatusEvent {
            id: id.clone(),
            step,
            status,
            message,
        });

        Ok(())
    }

    /// Records a submitted transaction; entries are never removed
    pub async fn append_transaction(&self, tx: MigrateTransaction) {
        self.transactions.write().await.push(tx);
    }

    /// Records a successful stake for the summary screen
    pub async fn append_completion_log(&self, log: MigrationCompleteLog) {
        self.completion_log.write().await.push(log);
    }

    /// Status of both steps; positions never touched read as `INCOMPLETE`
    pub fn get_status(&self, id: &PositionId) -> MigrateLpStatus {
        self.statuses
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| MigrateLpStatus::new(id.clone()))
    }

    /// Every tracked position, sorted by id
    pub fn all_statuses(&self) -> Vec<MigrateLpStatus> {
        let mut statuses: Vec<_> = self.statuses.iter().map(|entry| entry.value().clone()).collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// True once every listed position reached `COMPLETE` or `INVALID` for `step`
    pub fn is_settled<'a>(&self, ids: impl IntoIterator<Item = &'a PositionId>, step: MigrationStep) -> bool {
        ids.into_iter()
            .all(|id| self.get_status(id).step(step).status.is_terminal())
    }

    /// Snapshot of the transaction log in append order
    pub async fn transactions(&self) -> Vec<MigrateTransaction> {
        self.transactions.read().await.clone()
    }

    /// Snapshot of the completion log in append order
    pub async fn completion_log(&self) -> Vec<MigrationCompleteLog> {
        self.completion_log.read().await.clone()
    }

    /// Receives every status write made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: StatusEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for MigrationStatusStore {
    fn default() -> Self {
        Self::new()
    }
}
