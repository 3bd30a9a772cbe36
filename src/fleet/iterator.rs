//! # Fleet Iterator
//!
//! Canary-first, concurrency-bounded, retrying rollout of one operation across
//! every instance of a service offering.
//!
//! ## Phases
//!
//! 1. List instances in the inventory's natural order; every record starts `Pending`.
//! 2. Canary phase over the first `canary_count` instances. This is a hard barrier:
//!    if any canary ends `Failed`, the run stops and the rest stay `Pending`.
//! 3. Post-canary phase over the remaining instances.
//!
//! ## Worker pool
//!
//! Each phase runs a fixed pool of `max_in_flight` workers draining a shared queue.
//! A worker handles one instance at a time (trigger, poll to terminal, retry on
//! transient failure), so at most `max_in_flight` operations are ever triggered
//! but not yet terminal. Record updates flow back to the coordinator over a single
//! channel; only the coordinator mutates the record collection.
//!
//! ## Stopping
//!
//! Cancellation or the run's total timeout stops workers from taking new instances.
//! In-flight instances keep polling for `cancellation_grace`, then are abandoned and
//! recorded `Failed` with a timeout cause.
//!
//! Every trigger and poll call races the instance deadline and the stop grace period,
//! so a backend call that never answers cannot hold the run open. An instance that
//! exceeds its own deadline is not re-triggered: its backend task may still be running.

use crate::broker::{ManagementSurface, TriggerOutcome};
use crate::config::PollingConfig;
use crate::fleet::classifier::{
    classify_instance_timeout, classify_poll_error, classify_task_failure, classify_trigger_error,
    FailureClass,
};
use crate::fleet::config::FleetConfig;
use crate::fleet::record::{FleetInstanceStatus, FleetOperationKind, FleetOperationRecord};
use crate::fleet::report::{FleetOutcome, FleetReport};
use crate::fleet::FleetError;
use crate::gateway::{Instance, InventoryClient};
use crate::logging::log_fleet_progress;
use crate::operation::{LastOperationState, OperationToken};
use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct FleetIterator {
    inventory: Arc<dyn InventoryClient>,
    management: Arc<dyn ManagementSurface>,
    config: FleetConfig,
    poll_interval: Duration,
}

impl std::fmt::Debug for FleetIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetIterator")
            .field("config", &self.config)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Terminal observation for one attempt on one instance
#[derive(Debug, Clone, PartialEq)]
enum AttemptOutcome {
    Succeeded,
    Skipped(String),
    Failed { class: FailureClass, detail: String },
}

#[derive(Debug)]
enum RecordUpdate {
    Started {
        index: usize,
        attempt: u32,
    },
    Finished {
        index: usize,
        status: FleetInstanceStatus,
        attempts: u32,
        last_error: Option<String>,
        note: Option<String>,
    },
}

/// Everything a worker needs, shared across the pool
struct RunContext {
    management: Arc<dyn ManagementSurface>,
    offering_id: String,
    kind: FleetOperationKind,
    config: FleetConfig,
    poll_interval: Duration,
    run_deadline: Instant,
    cancel: CancellationToken,
}

impl RunContext {
    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.run_deadline
    }

    /// Resolves once the run is cancelled or past its deadline
    async fn stopped(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = sleep_until(self.run_deadline) => {}
        }
    }

    /// Resolves when an in-flight backend call for one instance must be given up
    async fn call_limit(&self, instance_deadline: Instant, abandon_at: Option<Instant>) {
        match abandon_at {
            Some(at) => sleep_until(at).await,
            None => {
                tokio::select! {
                    _ = sleep_until(instance_deadline) => {}
                    _ = async {
                        self.stopped().await;
                        sleep(self.config.cancellation_grace()).await;
                    } => {}
                }
            }
        }
    }

    /// Failure recorded when an instance is given up on before a terminal observation
    fn timed_out(&self, waiting_for: &str, last_poll_error: Option<String>) -> AttemptOutcome {
        let detail = if self.should_stop() {
            format!("timed out: fleet run stopped while {waiting_for} was still running")
        } else {
            let mut detail = format!(
                "timed out after {}s waiting for {waiting_for}",
                self.config.instance_timeout_seconds
            );
            if let Some(poll_error) = last_poll_error {
                detail.push_str(&format!(" (last poll error: {poll_error})"));
            }
            detail
        };
        AttemptOutcome::Failed {
            class: classify_instance_timeout(),
            detail,
        }
    }
}

impl FleetIterator {
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        management: Arc<dyn ManagementSurface>,
        config: FleetConfig,
    ) -> Self {
        Self {
            inventory,
            management,
            config,
            poll_interval: PollingConfig::default().poll_interval(),
        }
    }

    /// LastOperation cadence while an instance's task runs
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Apply `kind` to every instance of `offering_id`.
    ///
    /// Errors only when nothing could be started: invalid configuration or an
    /// inventory failure. Per-instance failures are reported in the returned report.
    pub async fn run(
        &self,
        offering_id: &str,
        kind: FleetOperationKind,
        cancel: CancellationToken,
    ) -> Result<FleetReport, FleetError> {
        self.config
            .validate()
            .map_err(|e| FleetError::InvalidConfig {
                reason: e.to_string(),
            })?;

        let instances = self.inventory.list_instances(offering_id).await?;
        let started_at = Utc::now();
        let mut records: Vec<FleetOperationRecord> =
            instances.iter().map(FleetOperationRecord::pending).collect();

        let ctx = Arc::new(RunContext {
            management: self.management.clone(),
            offering_id: offering_id.to_string(),
            kind,
            config: self.config.clone(),
            poll_interval: self.poll_interval,
            run_deadline: Instant::now() + self.config.total_timeout(),
            cancel,
        });

        let canary_count = self.config.canary_count.min(instances.len());
        info!(
            offering_id = %offering_id,
            operation = %kind,
            instances = instances.len(),
            canaries = canary_count,
            max_in_flight = self.config.max_in_flight,
            "🚀 FLEET: Starting rollout"
        );

        let mut batches = instances.into_iter().enumerate();
        let canaries: Vec<(usize, Instance)> = batches.by_ref().take(canary_count).collect();
        let remaining: Vec<(usize, Instance)> = batches.collect();

        let mut canary_failed = false;
        if !canaries.is_empty() {
            let canary_indices: Vec<usize> = canaries.iter().map(|(index, _)| *index).collect();
            Self::run_phase(&ctx, canaries, &mut records).await;

            canary_failed = canary_indices
                .iter()
                .any(|index| records[*index].status == FleetInstanceStatus::Failed);

            if canary_failed {
                error!(
                    offering_id = %offering_id,
                    operation = %kind,
                    untouched = remaining.len(),
                    "🛑 FLEET: Canary failed, halting rollout"
                );
            } else {
                info!(offering_id = %offering_id, "🐤 FLEET: Canaries succeeded");
            }
        }

        if !canary_failed && !remaining.is_empty() && !ctx.should_stop() {
            Self::run_phase(&ctx, remaining, &mut records).await;
        }

        let outcome = Self::outcome(&ctx, canary_failed, &records);
        let report = FleetReport {
            offering_id: offering_id.to_string(),
            operation: kind,
            outcome,
            records,
            started_at,
            finished_at: Utc::now(),
        };

        let summary = report.summary();
        info!(
            offering_id = %offering_id,
            operation = %kind,
            outcome = %outcome,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            pending = summary.pending,
            "🏁 FLEET: Rollout finished"
        );

        Ok(report)
    }

    fn outcome(
        ctx: &RunContext,
        canary_failed: bool,
        records: &[FleetOperationRecord],
    ) -> FleetOutcome {
        if records.iter().all(|record| record.status.is_success()) {
            return FleetOutcome::Succeeded;
        }
        if ctx.cancel.is_cancelled() {
            return FleetOutcome::Cancelled;
        }
        if Instant::now() >= ctx.run_deadline {
            return FleetOutcome::TimedOut;
        }
        if canary_failed {
            return FleetOutcome::CanaryFailed;
        }
        FleetOutcome::Failed
    }

    /// Drain `batch` with a fixed pool of workers, applying their updates to `records`
    async fn run_phase(
        ctx: &Arc<RunContext>,
        batch: Vec<(usize, Instance)>,
        records: &mut [FleetOperationRecord],
    ) {
        let worker_count = ctx.config.max_in_flight.min(batch.len());
        let indices: Vec<usize> = batch.iter().map(|(index, _)| *index).collect();
        let queue = Arc::new(Mutex::new(VecDeque::from(batch)));
        let (updates_tx, mut updates_rx) = mpsc::channel::<RecordUpdate>(worker_count.max(1) * 4);

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let ctx = ctx.clone();
            let queue = queue.clone();
            let updates = updates_tx.clone();
            workers.spawn(async move { Self::worker_loop(worker_id, ctx, queue, updates).await });
        }
        drop(updates_tx);

        while let Some(update) = updates_rx.recv().await {
            match update {
                RecordUpdate::Started { index, attempt } => {
                    records[index].begin_attempt(attempt);
                }
                RecordUpdate::Finished {
                    index,
                    status,
                    attempts,
                    last_error,
                    note,
                } => {
                    records[index].finish(status, attempts, last_error, note);
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "❌ FLEET: Worker task ended abnormally");
            }
        }

        // An instance whose worker vanished mid-flight must not stay InProgress
        for index in indices {
            let record = &mut records[index];
            if record.status == FleetInstanceStatus::InProgress {
                let attempts = record.attempts;
                record.finish(
                    FleetInstanceStatus::Failed,
                    attempts,
                    Some("instance worker stopped before a terminal observation".to_string()),
                    None,
                );
            }
        }
    }

    async fn worker_loop(
        worker_id: usize,
        ctx: Arc<RunContext>,
        queue: Arc<Mutex<VecDeque<(usize, Instance)>>>,
        updates: mpsc::Sender<RecordUpdate>,
    ) {
        debug!(worker_id = worker_id, "👷 FLEET: Worker started");

        loop {
            if ctx.should_stop() {
                debug!(worker_id = worker_id, "👷 FLEET: Run stopped, worker exiting");
                break;
            }
            let Some((index, instance)) = queue.lock().pop_front() else {
                break;
            };

            let finished = AssertUnwindSafe(Self::process_instance(&ctx, index, &instance, &updates))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(instance_id = %instance.guid, "❌ FLEET: Instance processing panicked");
                    RecordUpdate::Finished {
                        index,
                        status: FleetInstanceStatus::Failed,
                        attempts: 0,
                        last_error: Some("instance processing panicked".to_string()),
                        note: None,
                    }
                });

            if updates.send(finished).await.is_err() {
                warn!(worker_id = worker_id, "⚠️ FLEET: Coordinator gone, worker exiting");
                break;
            }
        }
    }

    /// Trigger and poll one instance, retrying transient failures
    async fn process_instance(
        ctx: &RunContext,
        index: usize,
        instance: &Instance,
        updates: &mpsc::Sender<RecordUpdate>,
    ) -> RecordUpdate {
        let max_attempts = ctx.config.max_attempts;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            // A closed channel only means the coordinator is gone; the final update reports it
            let _ = updates.send(RecordUpdate::Started { index, attempt }).await;

            let outcome = Self::attempt_instance(ctx, instance).await;
            let (status, last_error, note) = match outcome {
                AttemptOutcome::Succeeded => (FleetInstanceStatus::Succeeded, None, None),
                AttemptOutcome::Skipped(note) => (FleetInstanceStatus::Skipped, None, Some(note)),
                AttemptOutcome::Failed { class, detail } => {
                    let retries_left = class.is_transient() && attempt < max_attempts;
                    if retries_left && !ctx.should_stop() {
                        warn!(
                            instance_id = %instance.guid,
                            attempt = attempt,
                            max_attempts = max_attempts,
                            error = %detail,
                            "🔁 FLEET: Transient failure, retrying instance"
                        );
                        tokio::select! {
                            _ = sleep(ctx.config.attempt_interval()) => continue,
                            _ = ctx.stopped() => {}
                        }
                    }
                    let detail = if retries_left {
                        format!("timed out: fleet run stopped before retry (last error: {detail})")
                    } else {
                        detail
                    };
                    (FleetInstanceStatus::Failed, Some(detail), None)
                }
            };

            log_fleet_progress(
                &ctx.offering_id,
                &ctx.kind.to_string(),
                &instance.guid,
                &status.to_string(),
                attempt,
                last_error.as_deref().or(note.as_deref()),
            );

            return RecordUpdate::Finished {
                index,
                status,
                attempts: attempt,
                last_error,
                note,
            };
        }
    }

    async fn attempt_instance(ctx: &RunContext, instance: &Instance) -> AttemptOutcome {
        let instance_deadline = Instant::now() + ctx.config.instance_timeout();
        let trigger = async {
            match ctx.kind {
                FleetOperationKind::Upgrade => ctx.management.trigger_upgrade(instance).await,
                FleetOperationKind::Recreate => ctx.management.trigger_recreate(instance).await,
            }
        };
        let triggered = tokio::select! {
            triggered = trigger => triggered,
            _ = ctx.call_limit(instance_deadline, None) => {
                warn!(instance_id = %instance.guid, "⏰ FLEET: Trigger call did not return in time");
                return ctx.timed_out(&format!("the {} trigger", ctx.kind), None);
            }
        };

        let token = match triggered {
            Ok(TriggerOutcome::Accepted(token)) => token,
            Ok(TriggerOutcome::AlreadyCurrent) => {
                return AttemptOutcome::Skipped(
                    "instance already runs the plan's current revision".to_string(),
                )
            }
            Ok(TriggerOutcome::InstanceGone) => {
                return AttemptOutcome::Skipped("instance deployment no longer exists".to_string())
            }
            Err(err) => {
                return AttemptOutcome::Failed {
                    class: classify_trigger_error(&err),
                    detail: err.to_string(),
                }
            }
        };

        debug!(
            instance_id = %instance.guid,
            task_id = token.backend_task_id,
            context_id = %token.context_id,
            "▶️ FLEET: Instance operation triggered"
        );

        Self::poll_to_terminal(ctx, instance, &token, instance_deadline).await
    }

    /// Poll until terminal, the instance deadline, or the end of the stop grace period
    async fn poll_to_terminal(
        ctx: &RunContext,
        instance: &Instance,
        token: &OperationToken,
        instance_deadline: Instant,
    ) -> AttemptOutcome {
        let waiting_for = format!("task {}", token.backend_task_id);
        let mut abandon_at: Option<Instant> = None;
        let mut last_poll_error: Option<String> = None;

        loop {
            let polled = tokio::select! {
                polled = ctx.management.operation_status(&instance.guid, token) => polled,
                _ = ctx.call_limit(instance_deadline, abandon_at) => {
                    warn!(
                        instance_id = %instance.guid,
                        task_id = token.backend_task_id,
                        "⏰ FLEET: Poll call did not return in time"
                    );
                    return ctx.timed_out(&waiting_for, last_poll_error);
                }
            };

            match polled {
                Ok(operation) => match operation.state {
                    LastOperationState::Succeeded => return AttemptOutcome::Succeeded,
                    LastOperationState::Failed => {
                        return AttemptOutcome::Failed {
                            class: classify_task_failure(),
                            detail: operation.description,
                        }
                    }
                    LastOperationState::InProgress => {}
                },
                Err(err) => match classify_poll_error(&err) {
                    FailureClass::Fatal => {
                        return AttemptOutcome::Failed {
                            class: FailureClass::Fatal,
                            detail: err.to_string(),
                        }
                    }
                    FailureClass::Transient => {
                        warn!(
                            instance_id = %instance.guid,
                            task_id = token.backend_task_id,
                            error = %err,
                            "⚠️ FLEET: Poll failed, polling again"
                        );
                        last_poll_error = Some(err.to_string());
                    }
                },
            }

            let now = Instant::now();
            if abandon_at.is_none() && ctx.should_stop() {
                info!(
                    instance_id = %instance.guid,
                    grace_seconds = ctx.config.cancellation_grace_seconds,
                    "⏳ FLEET: Run stopping, draining in-flight instance"
                );
                abandon_at = Some(now + ctx.config.cancellation_grace());
            }

            match abandon_at {
                Some(at) if now >= at => return ctx.timed_out(&waiting_for, last_poll_error),
                Some(at) => sleep_until((now + ctx.poll_interval).min(at)).await,
                None if now >= instance_deadline => {
                    return ctx.timed_out(&waiting_for, last_poll_error)
                }
                None => {
                    tokio::select! {
                        _ = sleep_until((now + ctx.poll_interval).min(instance_deadline)) => {}
                        _ = ctx.stopped() => {}
                    }
                }
            }
        }
    }
}
