//! Status rendering adapter
//!
//! The UI owns layout; this module only maps stored statuses to the icon a
//! step should show and pumps store events into a renderer.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::status_store::StatusEvent;
use crate::types::{MigrateLpStatus, MigrateStatus, MigrationStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "icon", content = "step", rename_all = "snake_case")]
pub enum StatusIcon {
    Success,
    /// Not started yet; shows the 1-based step number
    Step(usize),
    Spinner,
    Error,
}

pub fn icon_for(index: usize, status: MigrateStatus) -> StatusIcon {
    match status {
        MigrateStatus::Complete => StatusIcon::Success,
        MigrateStatus::Incomplete => StatusIcon::Step(index + 1),
        MigrateStatus::Pending => StatusIcon::Spinner,
        MigrateStatus::Invalid => StatusIcon::Error,
    }
}

/// Icons for approve then stake
pub fn icons_for(status: &MigrateLpStatus) -> Vec<StatusIcon> {
    MigrationStep::ALL
        .iter()
        .enumerate()
        .map(|(index, step)| icon_for(index, status.step(*step).status))
        .collect()
}

/// Implemented by whatever draws the migration list
pub trait StatusRenderer: Send {
    fn render(&mut self, event: &StatusEvent);
}

/// Feeds store events into `renderer` until the store is dropped.
/// Returns how many events were delivered.
pub async fn forward_events<R: StatusRenderer>(
    mut events: broadcast::Receiver<StatusEvent>,
    renderer: &mut R,
) -> usize {
    let mut delivered = 0;

    loop {
        match events.recv().await {
            Ok(event) => {
                renderer.render(&event);
                delivered += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Status renderer lagged behind the store");
            }
            Err(RecvError::Closed) => return delivered,
        }
    }
}
