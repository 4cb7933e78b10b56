//! Bulk job state machine
//!
//! Transitions:
//! IDLE → CONNECTING → AWAITING_PROGRESS → COMPLETED
//!            │               │
//!            └──────┬────────┘
//!                   ▼
//!                FAILED
//!
//! COMPLETED and FAILED are terminal: every event handler below is a no-op
//! once the job has reached one of them. The coordinator owns the I/O; this
//! type only records what the I/O observed.

use super::company::EnrichmentRequest;
use chrono::{DateTime, Utc};
use enrichr_common::JobStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Companies processed so far (never exceeds `total`)
    pub processed: u64,
    /// Companies in the job, as reported by the service
    pub total: u64,
    /// Percentage complete (0.0 - 100.0), non-decreasing
    pub percent: f64,
}

/// Progress figures as reported by one server message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub percent: f64,
    pub processed: u64,
    pub total: u64,
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JobFailure {
    Transport(String),
    /// Terminal message arrived but could not be decoded
    Protocol(String),
    UnexpectedClose { code: Option<u16>, reason: String },
    Cancelled,
    TimedOut { idle_secs: u64 },
}

/// Recorded status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: Uuid,
    pub old_state: JobStatus,
    pub new_state: JobStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// One enrichment run over many companies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJob {
    pub id: Uuid,
    pub companies: Vec<EnrichmentRequest>,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub failure: Option<JobFailure>,
    pub transitions: Vec<StateTransition>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl BulkJob {
    pub fn new(companies: Vec<EnrichmentRequest>) -> Self {
        Self {
            id: Uuid::new_v4(),
            companies,
            status: JobStatus::Idle,
            progress: JobProgress::default(),
            failure: None,
            transitions: Vec::new(),
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// IDLE → CONNECTING
    pub fn begin_connect(&mut self) -> Option<StateTransition> {
        match self.status {
            JobStatus::Idle => Some(self.transition_to(JobStatus::Connecting)),
            _ => None,
        }
    }

    /// CONNECTING → AWAITING_PROGRESS
    pub fn channel_opened(&mut self) -> Option<StateTransition> {
        match self.status {
            JobStatus::Connecting => Some(self.transition_to(JobStatus::AwaitingProgress)),
            _ => None,
        }
    }

    /// Apply a progress message while AWAITING_PROGRESS
    ///
    /// `processed` and `percent` never decrease and `processed` never exceeds
    /// `total`, whatever order the service reports in. Returns the new snapshot
    /// if the update was accepted.
    pub fn apply_progress(&mut self, update: ProgressUpdate) -> Option<JobProgress> {
        if self.status != JobStatus::AwaitingProgress {
            return None;
        }

        let previous = self.progress;
        let total = update.total.max(previous.processed);
        let processed = update.processed.max(previous.processed).min(total);
        let percent = update.percent.clamp(0.0, 100.0).max(previous.percent);

        self.progress = JobProgress {
            processed,
            total,
            percent,
        };
        Some(self.progress)
    }

    /// AWAITING_PROGRESS → COMPLETED on the terminal message
    pub fn complete(&mut self, result_count: usize) -> Option<StateTransition> {
        if self.status != JobStatus::AwaitingProgress {
            return None;
        }

        let total = self.progress.total.max(result_count as u64);
        self.progress = JobProgress {
            processed: total,
            total,
            percent: 100.0,
        };
        Some(self.transition_to(JobStatus::Completed))
    }

    /// Any non-terminal state → FAILED
    pub fn fail(&mut self, failure: JobFailure) -> Option<StateTransition> {
        if self.is_terminal() {
            return None;
        }
        self.failure = Some(failure);
        Some(self.transition_to(JobStatus::Failed))
    }

    fn transition_to(&mut self, new_state: JobStatus) -> StateTransition {
        let transition = StateTransition {
            job_id: self.id,
            old_state: self.status,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.status = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        self.transitions.push(transition.clone());
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn awaiting_job() -> BulkJob {
        let mut job = BulkJob::new(vec![
            EnrichmentRequest::new("Acme", "acme.com"),
            EnrichmentRequest::new("Globex", ""),
        ]);
        job.begin_connect().unwrap();
        job.channel_opened().unwrap();
        job
    }

    fn update(percent: f64, processed: u64, total: u64) -> ProgressUpdate {
        ProgressUpdate {
            percent,
            processed,
            total,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = BulkJob::new(vec![EnrichmentRequest::new("Acme", "")]);
        assert_eq!(job.status, JobStatus::Idle);
        assert_eq!(job.progress.percent, 0.0);

        job.begin_connect().unwrap();
        job.channel_opened().unwrap();
        job.complete(1).unwrap();

        let states: Vec<_> = job.transitions.iter().map(|t| t.new_state).collect();
        assert_eq!(
            states,
            vec![
                JobStatus::Connecting,
                JobStatus::AwaitingProgress,
                JobStatus::Completed
            ]
        );
        assert!(job.ended_at.is_some());
        assert_eq!(job.progress.percent, 100.0);
        assert_eq!(job.progress.processed, 1);
    }

    #[test]
    fn test_open_requires_connecting() {
        let mut job = BulkJob::new(Vec::new());
        assert!(job.channel_opened().is_none());
        assert_eq!(job.status, JobStatus::Idle);
    }

    #[test]
    fn test_progress_is_monotonic_and_bounded() {
        let mut job = awaiting_job();

        let p1 = job.apply_progress(update(50.0, 1, 2)).unwrap();
        // Out-of-order message reporting less work
        let p2 = job.apply_progress(update(25.0, 0, 2)).unwrap();
        assert!(p2.processed >= p1.processed);
        assert!(p2.percent >= p1.percent);

        // Processed beyond total is clamped
        let p3 = job.apply_progress(update(150.0, 5, 2)).unwrap();
        assert_eq!(p3.processed, 2);
        assert_eq!(p3.total, 2);
        assert_eq!(p3.percent, 100.0);
    }

    #[test]
    fn test_shrinking_total_never_drops_below_processed() {
        let mut job = awaiting_job();
        job.apply_progress(update(60.0, 3, 5)).unwrap();
        let p = job.apply_progress(update(70.0, 3, 1)).unwrap();
        assert_eq!(p.processed, 3);
        assert_eq!(p.total, 3);
    }

    #[test]
    fn test_progress_ignored_outside_awaiting() {
        let mut job = BulkJob::new(Vec::new());
        assert!(job.apply_progress(update(10.0, 1, 10)).is_none());
        assert_eq!(job.progress, JobProgress::default());
    }

    #[test]
    fn test_completion_without_progress_dialect() {
        let mut job = awaiting_job();
        assert_eq!(job.progress.percent, 0.0);
        job.complete(2).unwrap();
        assert_eq!(job.progress.total, 2);
        assert_eq!(job.progress.percent, 100.0);
    }

    #[test]
    fn test_terminal_states_ignore_further_events() {
        let mut job = awaiting_job();
        job.complete(2).unwrap();
        let transitions = job.transitions.len();

        assert!(job.apply_progress(update(10.0, 1, 2)).is_none());
        assert!(job.complete(5).is_none());
        assert!(job
            .fail(JobFailure::UnexpectedClose {
                code: None,
                reason: "late close".to_string()
            })
            .is_none());

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.transitions.len(), transitions);
        assert!(job.failure.is_none());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut job = awaiting_job();
        job.fail(JobFailure::Cancelled).unwrap();
        assert!(job.complete(2).is_none());
        assert!(job.fail(JobFailure::Transport("again".to_string())).is_none());
        assert_eq!(job.failure, Some(JobFailure::Cancelled));
    }

    #[test]
    fn test_fail_from_connecting() {
        let mut job = BulkJob::new(vec![EnrichmentRequest::new("Acme", "")]);
        job.begin_connect().unwrap();
        let t = job
            .fail(JobFailure::Transport("connection refused".to_string()))
            .unwrap();
        assert_eq!(t.old_state, JobStatus::Connecting);
        assert_eq!(t.new_state, JobStatus::Failed);
    }
}
