//! Upload-Process-Poll lifecycle.
//!
//! One [`JobLifecycle`] drives one flow: request upload URLs, push the files
//! straight to storage, ask the backend to start the job, then poll its status
//! on a fixed interval until it completes or fails.
//!
//! Every submission, resume and reset bumps a generation counter. Responses
//! that arrive for an older generation are discarded, so a late answer to a
//! request issued before `reset()` can never move the state machine.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::try_join_all;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::flow::JobFlow;
use super::ops::{JobBackendOps, JobServices};
use super::phase::{JobPhase, PollOutcome, SubmitOutcome};
use super::poller::{PollHandle, PollSlot};
use crate::backend::client::redact_key;
use crate::backend::{FileDescriptor, JobStatusReport, StartJobRequest};
use crate::config::PollingConfig;
use crate::error::AppError;
use crate::storage::KeyValueStore;
use crate::validation::{validate_submission, InputFile, Submission};

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Default interval between status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polling cadence of a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Give up after this long in `Processing`. `None` polls until a terminal answer.
    pub max_duration: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_duration: None,
        }
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_duration: config.max_duration(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

struct Core {
    phase: JobPhase,
    generation: u64,
}

struct Inner<B> {
    flow: JobFlow,
    backend: B,
    store: Arc<dyn KeyValueStore>,
    settings: PollSettings,
    core: Mutex<Core>,
    phase_tx: watch::Sender<JobPhase>,
    poller: PollSlot,
    /// Held for the whole of a status query so scheduled and manual polls
    /// never overlap.
    poll_lock: AsyncMutex<()>,
}

impl<B: JobBackendOps> Inner<B> {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, core: &mut Core, phase: JobPhase) {
        info!(
            "[LIFECYCLE] {}: {} -> {}",
            self.flow.name,
            core.phase.label(),
            phase.label()
        );
        core.phase = phase.clone();
        self.phase_tx.send_replace(phase);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Applies `phase` only if `generation` is still the active one.
    fn transition(&self, generation: u64, phase: JobPhase) -> bool {
        let mut core = self.lock();
        if core.generation != generation {
            return false;
        }
        self.set_phase(&mut core, phase);
        true
    }

    /// Removes the persisted job key. With `expected`, only if it still
    /// holds that key, so a newer job's key is never clobbered.
    async fn clear_persisted(&self, expected: Option<&str>) {
        let key = self.flow.persistence_key.as_str();

        if let Some(expected) = expected {
            match self.store.get(key).await {
                Ok(Some(stored)) if stored == expected => {}
                Ok(_) => return,
                Err(e) => {
                    warn!("[LIFECYCLE] Failed to read persisted job key: {}", e);
                    return;
                }
            }
        }

        if let Err(e) = self.store.remove(key).await {
            warn!("[LIFECYCLE] Failed to clear persisted job key: {}", e);
        }
    }

    /// Moves to `Error` if `generation` is current. Returns false if stale.
    async fn fail(&self, generation: u64, job_key: Option<&str>, message: String) -> bool {
        if !self.transition(generation, JobPhase::Error { message }) {
            return false;
        }
        self.poller.disarm();
        self.clear_persisted(job_key).await;
        true
    }

    async fn fail_poll(&self, generation: u64, job_key: &str, err: AppError) -> PollOutcome {
        warn!("[LIFECYCLE] Job {} failed: {}", redact_key(job_key), err);
        let message = err.display_message();
        if self.fail(generation, Some(job_key), message.clone()).await {
            PollOutcome::Failed { message }
        } else {
            PollOutcome::Stale
        }
    }

    /// Whether `job_key` is still the processing job of `generation`.
    fn is_processing(&self, generation: u64, job_key: &str) -> bool {
        let core = self.lock();
        core.generation == generation
            && matches!(&core.phase, JobPhase::Processing { job_key: active } if active == job_key)
    }

    async fn poll_key(&self, generation: u64, job_key: &str) -> PollOutcome {
        let _in_flight = self.poll_lock.lock().await;

        // A poll that finished while this one waited may have ended the job
        if !self.is_processing(generation, job_key) {
            return PollOutcome::Stale;
        }

        let result = self.backend.job_status(&self.flow.resource, job_key).await;

        if !self.is_current(generation) {
            debug!(
                "[LIFECYCLE] Ignoring status for inactive job {}",
                redact_key(job_key)
            );
            return PollOutcome::Stale;
        }

        match result {
            Ok(JobStatusReport::NotFound) => {
                debug!("[LIFECYCLE] Job {} not visible yet", redact_key(job_key));
                PollOutcome::Pending
            }
            Ok(JobStatusReport::Pending { status }) => {
                debug!("[LIFECYCLE] Job {} still {}", redact_key(job_key), status);
                PollOutcome::Pending
            }
            Ok(JobStatusReport::Completed { download_url }) => {
                let phase = JobPhase::Completed {
                    job_key: job_key.to_string(),
                    download_url: download_url.clone(),
                };
                if !self.transition(generation, phase) {
                    return PollOutcome::Stale;
                }
                self.poller.disarm();
                self.clear_persisted(Some(job_key)).await;
                info!("[LIFECYCLE] Job {} completed", redact_key(job_key));
                PollOutcome::Completed { download_url }
            }
            Ok(JobStatusReport::Failed { message }) => {
                let err = AppError::JobFailed {
                    job_key: job_key.to_string(),
                    message,
                };
                self.fail_poll(generation, job_key, err).await
            }
            Err(err) => self.fail_poll(generation, job_key, err).await,
        }
    }
}

/// Body of the poll task: wait one interval, poll, repeat until a final outcome.
async fn run_poller<B: JobBackendOps>(
    inner: Arc<Inner<B>>,
    generation: u64,
    job_key: String,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let interval = inner.settings.interval;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        if let Some(max_duration) = inner.settings.max_duration {
            let elapsed = started.elapsed();
            if elapsed >= max_duration {
                let err = AppError::PollingTimeout {
                    job_key: job_key.clone(),
                    elapsed_secs: elapsed.as_secs(),
                };
                inner.fail_poll(generation, &job_key, err).await;
                return;
            }
        }

        if inner.poll_key(generation, &job_key).await.is_final() {
            return;
        }
    }
}

fn arm_poller<B: JobBackendOps>(inner: &Arc<Inner<B>>, generation: u64, job_key: String) {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_poller(
        Arc::clone(inner),
        generation,
        job_key,
        cancel.clone(),
    ));
    inner.poller.arm(PollHandle::new(cancel, task));
}

// ─────────────────────────────────────────────────────────────────────────────
// JobLifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// State machine for one flow's jobs. At most one job is active at a time.
///
/// Dropping the lifecycle stops its poll task.
pub struct JobLifecycle<B: JobBackendOps = JobServices> {
    inner: Arc<Inner<B>>,
}

impl<B: JobBackendOps> JobLifecycle<B> {
    pub fn new(
        flow: JobFlow,
        backend: B,
        store: Arc<dyn KeyValueStore>,
        settings: PollSettings,
    ) -> Self {
        let (phase_tx, _) = watch::channel(JobPhase::Idle);
        Self {
            inner: Arc::new(Inner {
                flow,
                backend,
                store,
                settings,
                core: Mutex::new(Core {
                    phase: JobPhase::Idle,
                    generation: 0,
                }),
                phase_tx,
                poller: PollSlot::default(),
                poll_lock: AsyncMutex::new(()),
            }),
        }
    }

    pub fn flow(&self) -> &JobFlow {
        &self.inner.flow
    }

    /// Snapshot of the current phase.
    pub fn phase(&self) -> JobPhase {
        self.inner.lock().phase.clone()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<JobPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Whether a poll task is currently scheduled.
    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_armed()
    }

    /// Validates and runs a submission.
    ///
    /// Only input problems are returned as errors, before any network call
    /// and without touching the phase. Every later failure ends in
    /// [`JobPhase::Error`] and is reported as [`SubmitOutcome::Failed`].
    pub async fn submit(&self, submission: &Submission) -> Result<SubmitOutcome, AppError> {
        let validated = validate_submission(&self.inner.flow, submission).await?;

        let generation = {
            let mut core = self.inner.lock();
            if !core.phase.is_idle() {
                info!(
                    "[LIFECYCLE] {}: submit ignored while {}",
                    self.inner.flow.name,
                    core.phase.label()
                );
                return Ok(SubmitOutcome::Ignored);
            }
            core.generation += 1;
            let generation = core.generation;
            self.inner.set_phase(&mut core, JobPhase::Uploading);
            generation
        };

        let submission_id = Uuid::new_v4();
        info!(
            "[LIFECYCLE] {}: submission {} with {} files",
            self.inner.flow.name,
            submission_id,
            validated.files.len()
        );

        match self
            .run_submission(generation, &validated.files, &validated.metadata)
            .await
        {
            Ok(Some(job_key)) => {
                info!(
                    "[LIFECYCLE] Submission {} accepted as job {}",
                    submission_id,
                    redact_key(&job_key)
                );
                Ok(SubmitOutcome::Accepted { job_key })
            }
            Ok(None) => {
                info!("[LIFECYCLE] Submission {} superseded by reset", submission_id);
                Ok(SubmitOutcome::Superseded)
            }
            Err(err) => {
                warn!("[LIFECYCLE] Submission {} failed: {}", submission_id, err);
                let message = err.display_message();
                if self.inner.fail(generation, None, message.clone()).await {
                    Ok(SubmitOutcome::Failed { message })
                } else {
                    Ok(SubmitOutcome::Superseded)
                }
            }
        }
    }

    /// Upload URLs → concurrent transfers → start → `Processing`.
    ///
    /// `Ok(None)` means the generation went stale along the way.
    async fn run_submission(
        &self,
        generation: u64,
        files: &[InputFile],
        metadata: &BTreeMap<String, String>,
    ) -> Result<Option<String>, AppError> {
        let inner = &self.inner;
        let resource = inner.flow.resource.as_str();

        let descriptors: Vec<FileDescriptor> = files
            .iter()
            .map(|file| FileDescriptor {
                slot: file.slot.clone(),
                filename: file.file_name.clone(),
                content_type: file.content_type.clone(),
            })
            .collect();

        let targets = inner
            .backend
            .request_upload_targets(resource, &descriptors)
            .await?;
        if !inner.is_current(generation) {
            return Ok(None);
        }

        let pairs = files
            .iter()
            .map(|file| {
                targets
                    .iter()
                    .find(|target| target.slot == file.slot)
                    .map(|target| (target, file))
                    .ok_or_else(|| AppError::Backend {
                        status: 200,
                        message: format!("No upload URL returned for '{}'", file.slot),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        try_join_all(
            pairs
                .into_iter()
                .map(|(target, file)| inner.backend.transfer(target, file)),
        )
        .await?;

        if !inner.transition(generation, JobPhase::Starting) {
            return Ok(None);
        }

        let request = StartJobRequest {
            keys: targets
                .iter()
                .map(|target| (target.slot.clone(), target.key.clone()))
                .collect(),
            metadata: metadata.clone(),
        };
        let job_key = inner.backend.start_job(resource, &request).await?;
        if !inner.is_current(generation) {
            return Ok(None);
        }

        if let Err(e) = inner.store.set(&inner.flow.persistence_key, &job_key).await {
            warn!(
                "[LIFECYCLE] Could not persist job key, a reload will not resume it: {}",
                e
            );
        }

        let processing = JobPhase::Processing {
            job_key: job_key.clone(),
        };
        if !inner.transition(generation, processing) {
            inner.clear_persisted(Some(&job_key)).await;
            return Ok(None);
        }

        arm_poller(inner, generation, job_key.clone());
        Ok(Some(job_key))
    }

    /// Queries the active job's status once, outside the regular schedule.
    ///
    /// Returns [`PollOutcome::Stale`] when no job is processing.
    pub async fn poll_once(&self) -> PollOutcome {
        let (generation, job_key) = {
            let core = self.inner.lock();
            match &core.phase {
                JobPhase::Processing { job_key } => (core.generation, job_key.clone()),
                _ => return PollOutcome::Stale,
            }
        };
        self.inner.poll_key(generation, &job_key).await
    }

    /// Returns to `Idle` from any phase, stops polling and forgets the
    /// persisted job key. Requests already in flight finish but are ignored.
    pub async fn reset(&self) {
        self.inner.poller.disarm();
        {
            let mut core = self.inner.lock();
            core.generation += 1;
            self.inner.set_phase(&mut core, JobPhase::Idle);
        }
        self.inner.clear_persisted(None).await;
    }

    /// Picks up a job persisted by an earlier session.
    ///
    /// Only from `Idle`. Polls the stored key without uploading or starting
    /// anything; returns the key when polling resumed.
    pub async fn resume(&self) -> Result<Option<String>, AppError> {
        if !self.phase().is_idle() {
            return Ok(None);
        }

        let stored = self.inner.store.get(&self.inner.flow.persistence_key).await?;
        let Some(job_key) = stored.filter(|key| !key.trim().is_empty()) else {
            return Ok(None);
        };

        let generation = {
            let mut core = self.inner.lock();
            if !core.phase.is_idle() {
                return Ok(None);
            }
            core.generation += 1;
            let generation = core.generation;
            self.inner.set_phase(
                &mut core,
                JobPhase::Processing {
                    job_key: job_key.clone(),
                },
            );
            generation
        };

        info!(
            "[LIFECYCLE] {}: resuming job {}",
            self.inner.flow.name,
            redact_key(&job_key)
        );
        arm_poller(&self.inner, generation, job_key.clone());
        Ok(Some(job_key))
    }

    /// Stops the poll task immediately. The phase is left as is.
    pub fn shutdown(&self) {
        self.inner.poller.abort();
    }
}

impl<B: JobBackendOps> Drop for JobLifecycle<B> {
    fn drop(&mut self) {
        self.inner.poller.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
