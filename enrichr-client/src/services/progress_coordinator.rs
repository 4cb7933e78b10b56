//! Streaming progress coordinator
//!
//! Drives one [`BulkJob`] over one persistent duplex channel:
//!
//! 1. IDLE → CONNECTING: open the channel (a failed open is a transport error)
//! 2. CONNECTING → AWAITING_PROGRESS: send `start_enrichment` exactly once
//! 3. apply progress messages (services that never send any are fine)
//! 4. on `enrichment_complete`: close the channel once and resolve with the rows,
//!    or fail with a parse error if its payload does not decode
//!
//! Any other ending fails the job. Cancellation and the idle timeout close
//! the channel from this side; transport errors and peer closes leave it to
//! the transport. Only one job may be active per coordinator.

use crate::config::ClientConfig;
use crate::error::{EnrichError, EnrichResult};
use crate::models::{BulkJob, EnrichedCompany, JobFailure, JobProgress, StateTransition};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::services::channel::{ChannelConnector, ChannelEvent, DuplexChannel};
use chrono::Utc;
use enrichr_common::{EnrichEvent, EventBus, JobStatus};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// Owns the streaming channel for one bulk job at a time
pub struct ProgressCoordinator {
    connector: Arc<dyn ChannelConnector>,
    channel_url: Url,
    idle_timeout: Option<Duration>,
    event_bus: EventBus,
    active_job: Mutex<Option<Uuid>>,
}

/// Clears the active job slot when the run ends, however it ends
struct ActiveJobGuard<'a> {
    slot: &'a Mutex<Option<Uuid>>,
}

impl Drop for ActiveJobGuard<'_> {
    fn drop(&mut self) {
        *lock_slot(self.slot) = None;
    }
}

fn lock_slot(slot: &Mutex<Option<Uuid>>) -> MutexGuard<'_, Option<Uuid>> {
    // The slot holds plain data; a poisoned lock is still consistent
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressCoordinator {
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        channel_url: Url,
        idle_timeout: Option<Duration>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            connector,
            channel_url,
            idle_timeout,
            event_bus,
            active_job: Mutex::new(None),
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        connector: Arc<dyn ChannelConnector>,
        event_bus: EventBus,
    ) -> EnrichResult<Self> {
        Ok(Self::new(
            connector,
            config.channel_url()?,
            config.idle_timeout,
            event_bus,
        ))
    }

    /// Job currently holding the channel, if any
    pub fn active_job(&self) -> Option<Uuid> {
        *lock_slot(&self.active_job)
    }

    /// Run `job` to a terminal state
    ///
    /// Resolves with the enriched rows on completion. On failure the job is
    /// left in FAILED with its [`JobFailure`] recorded and the matching error
    /// is returned. `on_progress` sees every accepted progress snapshot.
    pub async fn run<F>(
        &self,
        job: &mut BulkJob,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> EnrichResult<Vec<EnrichedCompany>>
    where
        F: Fn(&JobProgress) + Send + Sync,
    {
        if job.status != JobStatus::Idle {
            return Err(EnrichError::Conflict(format!(
                "Job {} is {}, only idle jobs can be submitted",
                job.id, job.status
            )));
        }
        let _guard = self.claim(job.id)?;

        info!(job_id = %job.id, companies = job.companies.len(), "Starting bulk enrichment job");
        self.record(job.begin_connect());

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EnrichError::Cancelled),
            result = self.connector.connect(&self.channel_url) => result,
        };
        let mut channel = match connected {
            Ok(channel) => channel,
            Err(e) => return Err(self.fail(job, e)),
        };
        self.record(job.channel_opened());

        if let Err(e) = Self::send_start(job, channel.as_mut()).await {
            Self::close_channel(job.id, channel.as_mut()).await;
            return Err(self.fail(job, e));
        }

        match self
            .stream_until_terminal(job, channel.as_mut(), cancel, &on_progress)
            .await
        {
            Ok(rows) => Ok(rows),
            Err(e) => Err(self.fail(job, e)),
        }
    }

    fn claim(&self, job_id: Uuid) -> EnrichResult<ActiveJobGuard<'_>> {
        let mut slot = lock_slot(&self.active_job);
        if let Some(active) = *slot {
            warn!(job_id = %job_id, active_job_id = %active, "Rejecting bulk job while another is active");
            return Err(EnrichError::Conflict(format!(
                "Bulk job {} is already in progress",
                active
            )));
        }
        *slot = Some(job_id);
        Ok(ActiveJobGuard {
            slot: &self.active_job,
        })
    }

    async fn send_start(job: &BulkJob, channel: &mut dyn DuplexChannel) -> EnrichResult<()> {
        let start = ClientMessage::StartEnrichment {
            companies: job.companies.clone(),
        }
        .to_json()?;
        debug!(job_id = %job.id, bytes = start.len(), "Sending start_enrichment");
        channel.send_text(start).await
    }

    async fn stream_until_terminal<F>(
        &self,
        job: &mut BulkJob,
        channel: &mut dyn DuplexChannel,
        cancel: &CancellationToken,
        on_progress: &F,
    ) -> EnrichResult<Vec<EnrichedCompany>>
    where
        F: Fn(&JobProgress) + Send + Sync,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = within_idle_timeout(self.idle_timeout, channel.next_event()) => Some(result),
            };

            let event = match next {
                None => {
                    info!(job_id = %job.id, "Cancelling bulk enrichment job");
                    Self::close_channel(job.id, channel).await;
                    return Err(EnrichError::Cancelled);
                }
                Some(Err(limit)) => {
                    Self::close_channel(job.id, channel).await;
                    return Err(EnrichError::Timeout(limit));
                }
                Some(Ok(event)) => event,
            };

            match event {
                ChannelEvent::Message(text) => match ServerMessage::parse(&text) {
                    Ok(ServerMessage::Progress(update)) => {
                        if let Some(progress) = job.apply_progress(update) {
                            debug!(
                                job_id = %job.id,
                                processed = progress.processed,
                                total = progress.total,
                                percent = progress.percent,
                                "Progress update"
                            );
                            self.event_bus.emit_lossy(EnrichEvent::JobProgress {
                                job_id: job.id,
                                processed: progress.processed,
                                total: progress.total,
                                percent: progress.percent,
                                timestamp: Utc::now(),
                            });
                            on_progress(&progress);
                        }
                    }
                    Ok(ServerMessage::Complete(rows)) => {
                        self.record(job.complete(rows.len()));
                        Self::close_channel(job.id, channel).await;

                        info!(job_id = %job.id, companies = rows.len(), "Bulk enrichment job completed");
                        self.event_bus.emit_lossy(EnrichEvent::JobCompleted {
                            job_id: job.id,
                            company_count: rows.len(),
                            timestamp: Utc::now(),
                        });
                        return Ok(rows);
                    }
                    Ok(ServerMessage::InvalidCompletion(reason)) => {
                        Self::close_channel(job.id, channel).await;
                        return Err(EnrichError::Parse(reason));
                    }
                    Ok(ServerMessage::Unrecognized(message_type)) => {
                        warn!(job_id = %job.id, message_type = ?message_type, "Ignoring unrecognized server message");
                    }
                    Err(e) => {
                        warn!(job_id = %job.id, "Ignoring malformed server message: {}", e);
                    }
                },
                ChannelEvent::Error(message) => {
                    return Err(EnrichError::Transport(message));
                }
                ChannelEvent::Closed { code, reason } => {
                    return Err(EnrichError::UnexpectedClose { code, reason });
                }
            }
        }
    }

    async fn close_channel(job_id: Uuid, channel: &mut dyn DuplexChannel) {
        if let Err(e) = channel.close().await {
            warn!(job_id = %job_id, "Failed to close channel cleanly: {}", e);
        }
    }

    /// Move the job to FAILED, publish it, and hand the error back
    fn fail(&self, job: &mut BulkJob, error: EnrichError) -> EnrichError {
        let failure = match &error {
            EnrichError::UnexpectedClose { code, reason } => JobFailure::UnexpectedClose {
                code: *code,
                reason: reason.clone(),
            },
            EnrichError::Cancelled => JobFailure::Cancelled,
            EnrichError::Timeout(limit) => JobFailure::TimedOut {
                idle_secs: limit.as_secs(),
            },
            EnrichError::Transport(message) => JobFailure::Transport(message.clone()),
            EnrichError::Parse(message) => JobFailure::Protocol(message.clone()),
            other => JobFailure::Transport(other.to_string()),
        };

        if let Some(transition) = job.fail(failure) {
            error!(job_id = %job.id, "Bulk enrichment job failed: {}", error);
            self.record(Some(transition));
            self.event_bus.emit_lossy(EnrichEvent::JobFailed {
                job_id: job.id,
                error: error.to_string(),
                timestamp: Utc::now(),
            });
        }
        error
    }

    fn record(&self, transition: Option<StateTransition>) {
        let Some(transition) = transition else {
            return;
        };
        info!(
            job_id = %transition.job_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Job state changed"
        );
        self.event_bus.emit_lossy(EnrichEvent::JobStateChanged {
            job_id: transition.job_id,
            old_state: transition.old_state,
            new_state: transition.new_state,
            timestamp: transition.transitioned_at,
        });
    }
}

/// Await `future`, or report the limit that elapsed first
async fn within_idle_timeout<F: Future>(
    limit: Option<Duration>,
    future: F,
) -> Result<F::Output, Duration> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| limit),
        None => Ok(future.await),
    }
}
