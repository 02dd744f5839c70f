//! Job supervisor: runs enrollments as cancelable background tasks and
//! streams their progress to any number of subscribers.
//!
//! Each job keeps an append-only event log for the lifetime of the process;
//! late subscribers get the full log replayed before live events. A slow or
//! dead subscriber never blocks the run or its peers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::enroll::{EnrollmentContext, EnrollmentMachine, EnrollmentResult, ProgressEvent, ProgressSink, Step};
use crate::error::{PaneError, Result};

/// Opaque, collision-resistant job identifier.
pub type JobId = String;

struct JobState {
    events: Vec<ProgressEvent>,
    subscribers: Vec<(u64, mpsc::UnboundedSender<ProgressEvent>)>,
    next_subscriber: u64,
    cancel: CancellationToken,
    result: Option<EnrollmentResult>,
    /// Set once the terminal event has been appended; later emits are
    /// dropped, upholding the no-events-after-terminal invariant.
    sealed: bool,
}

/// Handle returned by `subscribe`; detaching drops the live feed without
/// touching the run or other subscribers.
pub struct Subscription {
    pub job_id: JobId,
    subscriber_id: u64,
    pub receiver: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Subscription {
    /// Next event in the job's ordered sequence (replayed history first,
    /// then live). `None` once the job is sealed and the log is drained.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }
}

#[derive(Clone)]
pub struct JobSupervisor {
    jobs: Arc<Mutex<HashMap<JobId, JobState>>>,
}

impl Default for JobSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl JobSupervisor {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Allocate a job and start its enrollment run in the background.
    /// Returns immediately with the job id.
    pub fn spawn_enrollment(
        &self,
        machine: Arc<EnrollmentMachine>,
        target_url: String,
        ctx: EnrollmentContext,
    ) -> JobId {
        let job_id = self.create_job();
        let cancel = self
            .with_job(&job_id, |job| job.cancel.clone())
            .unwrap_or_default();
        let supervisor = self.clone();
        let id = job_id.clone();

        tokio::spawn(async move {
            let sink = JobSink {
                supervisor: supervisor.clone(),
                job_id: id.clone(),
            };
            let result = machine.run(&target_url, &ctx, &sink, cancel).await;
            supervisor.seal(&id, result);
        });

        job_id
    }

    /// Allocate an empty event log and subscriber set.
    pub fn create_job(&self) -> JobId {
        let job_id = format!("job-{:016x}{:016x}", random_u64(), random_u64());
        let mut jobs = lock(&self.jobs);
        jobs.insert(
            job_id.clone(),
            JobState {
                events: Vec::new(),
                subscribers: Vec::new(),
                next_subscriber: 0,
                cancel: CancellationToken::new(),
                result: None,
                sealed: false,
            },
        );
        info!(%job_id, "job created");
        job_id
    }

    /// Append an event to the job's log and push it to every attached
    /// subscriber. A dead subscriber is pruned; it never affects the rest.
    pub fn emit(&self, job_id: &str, event: ProgressEvent) {
        let mut jobs = lock(&self.jobs);
        let Some(job) = jobs.get_mut(job_id) else {
            warn!(%job_id, "emit for unknown job");
            return;
        };
        if job.sealed {
            debug!(%job_id, step = %event.step, "dropping event after terminal");
            return;
        }
        if matches!(event.step, Step::Complete | Step::Error) {
            job.sealed = true;
        }
        job.events.push(event.clone());
        job.subscribers
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    /// Attach a subscriber. The full existing event log is replayed before
    /// any live event is delivered.
    pub fn subscribe(&self, job_id: &str) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut jobs = lock(&self.jobs);
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| PaneError::JobNotFound(job_id.to_string()))?;

        for event in &job.events {
            // Replay cannot fail: we still hold the receiver.
            let _ = sender.send(event.clone());
        }
        let subscriber_id = job.next_subscriber;
        job.next_subscriber += 1;
        if !job.sealed {
            job.subscribers.push((subscriber_id, sender));
        }
        Ok(Subscription {
            job_id: job_id.to_string(),
            subscriber_id,
            receiver,
        })
    }

    /// Detach a subscriber. The run and other subscribers are unaffected.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut jobs = lock(&self.jobs);
        if let Some(job) = jobs.get_mut(&subscription.job_id) {
            job.subscribers
                .retain(|(id, _)| *id != subscription.subscriber_id);
        }
    }

    /// Request early termination. The run observes the token at its next
    /// suspension point and still tears down its browser session.
    pub fn cancel(&self, job_id: &str) -> Result<()> {
        self.with_job(job_id, |job| job.cancel.cancel())
            .ok_or_else(|| PaneError::JobNotFound(job_id.to_string()))
    }

    /// Terminal result of a finished job, if any.
    pub fn result(&self, job_id: &str) -> Option<EnrollmentResult> {
        self.with_job(job_id, |job| job.result.clone()).flatten()
    }

    /// Ordered copy of the job's event log.
    pub fn events(&self, job_id: &str) -> Vec<ProgressEvent> {
        self.with_job(job_id, |job| job.events.clone())
            .unwrap_or_default()
    }

    /// Record the terminal result and drop all subscribers, closing their
    /// channels once the replayed/live sequence is fully consumed.
    fn seal(&self, job_id: &str, result: EnrollmentResult) {
        let mut jobs = lock(&self.jobs);
        if let Some(job) = jobs.get_mut(job_id) {
            job.sealed = true;
            job.result = Some(result);
            job.subscribers.clear();
        }
    }

    fn with_job<T>(&self, job_id: &str, f: impl FnOnce(&mut JobState) -> T) -> Option<T> {
        let mut jobs = lock(&self.jobs);
        jobs.get_mut(job_id).map(f)
    }
}

/// Progress sink wired to one job.
struct JobSink {
    supervisor: JobSupervisor,
    job_id: JobId,
}

impl ProgressSink for JobSink {
    fn emit(&self, event: ProgressEvent) {
        self.supervisor.emit(&self.job_id, event);
    }
}

fn random_u64() -> u64 {
    rand::thread_rng().gen()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Event log mutation never panics while holding the lock.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enroll::Step;

    fn event(step: Step, message: &str) -> ProgressEvent {
        ProgressEvent::new(step, message)
    }

    #[tokio::test]
    async fn late_subscriber_replays_history_in_order() {
        let supervisor = JobSupervisor::new();
        let job_id = supervisor.create_job();
        supervisor.emit(&job_id, event(Step::Launch, "one"));
        supervisor.emit(&job_id, event(Step::Navigate, "two"));
        supervisor.emit(&job_id, event(Step::Fill, "three"));

        let mut sub = supervisor.subscribe(&job_id).unwrap();
        for expected in ["one", "two", "three"] {
            let got = sub.next().await.unwrap();
            assert_eq!(got.message, expected);
        }

        supervisor.emit(&job_id, event(Step::Submit, "four"));
        assert_eq!(sub.next().await.unwrap().message, "four");
    }

    #[tokio::test]
    async fn dead_subscriber_does_not_block_others() {
        let supervisor = JobSupervisor::new();
        let job_id = supervisor.create_job();

        let dead = supervisor.subscribe(&job_id).unwrap();
        drop(dead);
        let mut live = supervisor.subscribe(&job_id).unwrap();

        supervisor.emit(&job_id, event(Step::Launch, "still delivered"));
        assert_eq!(live.next().await.unwrap().message, "still delivered");
    }

    #[tokio::test]
    async fn no_events_after_terminal() {
        let supervisor = JobSupervisor::new();
        let job_id = supervisor.create_job();
        let mut sub = supervisor.subscribe(&job_id).unwrap();

        supervisor.emit(&job_id, event(Step::Complete, "done"));
        supervisor.emit(&job_id, event(Step::Fill, "late"));

        assert_eq!(sub.next().await.unwrap().message, "done");
        assert_eq!(supervisor.events(&job_id).len(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_leaves_other_subscribers_attached() {
        let supervisor = JobSupervisor::new();
        let job_id = supervisor.create_job();
        let first = supervisor.subscribe(&job_id).unwrap();
        let mut second = supervisor.subscribe(&job_id).unwrap();

        supervisor.unsubscribe(&first);
        supervisor.emit(&job_id, event(Step::Launch, "after detach"));
        assert_eq!(second.next().await.unwrap().message, "after detach");
    }

    #[test]
    fn job_ids_are_distinct() {
        let supervisor = JobSupervisor::new();
        let a = supervisor.create_job();
        let b = supervisor.create_job();
        assert_ne!(a, b);
        assert!(a.starts_with("job-"));
    }

    #[test]
    fn cancel_unknown_job_errors() {
        let supervisor = JobSupervisor::new();
        assert!(supervisor.cancel("job-missing").is_err());
    }
}
