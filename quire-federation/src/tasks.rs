//! Background work scheduled after a remote entity is materialized.

use quire_types::EntityId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TaskError;

/// Follow-up work the surrounding system runs out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum FederationTask {
    /// Refresh what is known about the server hosting a fetched entity.
    RefreshRemoteServer {
        entity_id: EntityId,
        remote_id: String,
        host: String,
    },
}

/// Fire-and-forget hook for [`FederationTask`]s.
///
/// Dispatch must not block. Failures are logged by the caller and never
/// fail the operation that scheduled the task.
pub trait TaskDispatcher: Send + Sync {
    fn dispatch(&self, task: FederationTask) -> Result<(), TaskError>;
}

/// Hands tasks to a bounded tokio channel drained by a worker.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<FederationTask>,
}

impl ChannelDispatcher {
    /// Creates a dispatcher and the receiving end for the worker.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<FederationTask>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl TaskDispatcher for ChannelDispatcher {
    fn dispatch(&self, task: FederationTask) -> Result<(), TaskError> {
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TaskError::Full,
            mpsc::error::TrySendError::Closed(_) => TaskError::Closed,
        })
    }
}

/// Drops every task.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl TaskDispatcher for NoopDispatcher {
    fn dispatch(&self, task: FederationTask) -> Result<(), TaskError> {
        debug!("Dropping background task {:?}", task);
        Ok(())
    }
}
