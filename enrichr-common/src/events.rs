//! Event types for the enrichr event system
//!
//! The orchestration engine publishes job lifecycle events on an [`EventBus`];
//! UI collaborators subscribe and render whatever they receive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Bulk job status
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, no channel opened yet
    Idle,
    /// Channel open requested
    Connecting,
    /// Start message sent, waiting for progress or completion
    AwaitingProgress,
    /// Terminal message received
    Completed,
    /// Transport error, unexpected close, cancellation or timeout
    Failed,
}

impl JobStatus {
    /// Check if status is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Idle => "idle",
            JobStatus::Connecting => "connecting",
            JobStatus::AwaitingProgress => "awaiting_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Enrichr event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnrichEvent {
    /// Bulk job changed status
    JobStateChanged {
        job_id: Uuid,
        old_state: JobStatus,
        new_state: JobStatus,
        timestamp: DateTime<Utc>,
    },

    /// Bulk job progress update
    JobProgress {
        job_id: Uuid,
        processed: u64,
        total: u64,
        percent: f64,
        timestamp: DateTime<Utc>,
    },

    /// Bulk job resolved with enriched rows
    JobCompleted {
        job_id: Uuid,
        company_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Bulk job failed
    JobFailed {
        job_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Single-profile request resolved
    ProfileEnriched {
        company_name: String,
        timestamp: DateTime<Utc>,
    },
}

impl EnrichEvent {
    /// Job this event belongs to, if any
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            EnrichEvent::JobStateChanged { job_id, .. }
            | EnrichEvent::JobProgress { job_id, .. }
            | EnrichEvent::JobCompleted { job_id, .. }
            | EnrichEvent::JobFailed { job_id, .. } => Some(*job_id),
            EnrichEvent::ProfileEnriched { .. } => None,
        }
    }
}

/// Broadcast bus for [`EnrichEvent`]s
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EnrichEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers
    ///   start missing old events; raised to 1 if zero
    ///
    /// # Examples
    ///
    /// ```
    /// use enrichr_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EnrichEvent,
    ) -> Result<usize, broadcast::error::SendError<EnrichEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EnrichEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
