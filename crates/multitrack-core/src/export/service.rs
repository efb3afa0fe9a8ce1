//! Extraction job queue
//!
//! Async extraction requests are queued FIFO and drained by a single
//! worker thread, so at most one job renders at a time. Every job gets a
//! monotonically increasing id and its own cancel flag, and its completion
//! callback always runs exactly once, whether the job succeeded, failed or
//! was cancelled.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use super::message::ExtractionProgress;
use super::pipeline::{extract_mix, extract_track, TrackSnapshot};
use super::{ExtractionConfig, ExtractionError, ExtractionResult};

/// Called with `(job_id, fraction)` from the worker thread
pub type ProgressCallback = Box<dyn FnMut(u64, f32) + Send>;

/// Called once with the job's outcome from the worker thread
pub type CompletionCallback = Box<dyn FnOnce(u64, ExtractionResult) + Send>;

/// What a job renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionTarget {
    /// One track by id
    Track(String),
    /// Every loaded track, mixed with solo/mute resolution
    Mix,
}

impl fmt::Display for ExtractionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionTarget::Track(id) => write!(f, "track '{}'", id),
            ExtractionTarget::Mix => write!(f, "mix"),
        }
    }
}

/// An extraction request
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub target: ExtractionTarget,
    pub output_path: PathBuf,
    pub config: ExtractionConfig,
}

/// Sources for a job, looked up when the worker starts it
#[derive(Debug, Clone)]
pub struct JobSources {
    pub tracks: Vec<TrackSnapshot>,
    pub master_volume: f32,
}

/// Looks up the current state of a job's tracks.
///
/// Resolution happens on the worker thread when the job starts, not at
/// submission, so a job sees the controls as they are when it runs.
pub trait TrackResolver: Send + Sync {
    fn resolve(&self, target: &ExtractionTarget) -> Result<JobSources, ExtractionError>;
}

impl<F> TrackResolver for F
where
    F: Fn(&ExtractionTarget) -> Result<JobSources, ExtractionError> + Send + Sync,
{
    fn resolve(&self, target: &ExtractionTarget) -> Result<JobSources, ExtractionError> {
        self(target)
    }
}

// ============================================================================
// Commands
// ============================================================================

struct QueuedJob {
    id: u64,
    job: ExtractionJob,
    cancel: Arc<AtomicBool>,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompletionCallback>,
}

enum QueueCommand {
    Run(QueuedJob),
    Shutdown,
}

/// Bookkeeping shared by the handle and the worker
struct QueueState {
    /// Cancel flags of queued and running jobs
    jobs: Mutex<HashMap<u64, Arc<AtomicBool>>>,
    /// Running job id, 0 when idle
    current: AtomicU64,
    monitor: Mutex<Option<Sender<ExtractionProgress>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl QueueState {
    fn emit(&self, event: ExtractionProgress) {
        if let Some(tx) = lock(&self.monitor).as_ref() {
            let _ = tx.send(event);
        }
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Single-worker FIFO of extraction jobs
pub struct ExtractionQueue {
    command_tx: Sender<QueueCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    state: Arc<QueueState>,
}

impl ExtractionQueue {
    /// Start the worker thread
    pub fn spawn(resolver: Arc<dyn TrackResolver>) -> Self {
        let (command_tx, command_rx) = channel::unbounded();
        let state = Arc::new(QueueState {
            jobs: Mutex::new(HashMap::new()),
            current: AtomicU64::new(0),
            monitor: Mutex::new(None),
        });

        let worker_state = Arc::clone(&state);
        let thread_handle = thread::Builder::new()
            .name("extraction-worker".to_string())
            .spawn(move || Self::run(worker_state, resolver, command_rx))
            .expect("Failed to spawn extraction worker");

        Self {
            command_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
            next_id: AtomicU64::new(1),
            state,
        }
    }

    /// Mirror job lifecycle events to `monitor`
    pub fn set_monitor(&self, monitor: Option<Sender<ExtractionProgress>>) {
        *lock(&self.state.monitor) = monitor;
    }

    /// Queue a job and return its id
    pub fn submit(
        &self,
        job: ExtractionJob,
        on_progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<u64, ExtractionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::new(AtomicBool::new(false));
        lock(&self.state.jobs).insert(id, Arc::clone(&cancel));

        log::info!("[EXTRACT] Job {} queued: {} -> {:?}", id, job.target, job.output_path);
        let queued = QueuedJob {
            id,
            job,
            cancel,
            on_progress,
            on_complete,
        };
        self.state.emit(ExtractionProgress::Queued { job_id: id });
        if self.command_tx.send(QueueCommand::Run(queued)).is_err() {
            lock(&self.state.jobs).remove(&id);
            return Err(ExtractionError::QueueClosed);
        }
        Ok(id)
    }

    /// Request cancellation of a queued or running job.
    ///
    /// Returns false if the job is unknown or already finished. A running
    /// job stops at its next block boundary.
    pub fn cancel(&self, job_id: u64) -> bool {
        match lock(&self.state.jobs).get(&job_id) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                log::info!("[EXTRACT] Job {} cancel requested", job_id);
                true
            }
            None => false,
        }
    }

    /// Cancel every queued and running job
    pub fn cancel_all(&self) {
        let jobs = lock(&self.state.jobs);
        for flag in jobs.values() {
            flag.store(true, Ordering::Relaxed);
        }
        if !jobs.is_empty() {
            log::info!("[EXTRACT] Cancelling {} jobs", jobs.len());
        }
    }

    /// Whether `job_id` is queued or rendering
    pub fn is_running(&self, job_id: u64) -> bool {
        lock(&self.state.jobs).contains_key(&job_id)
    }

    /// Id of the job currently rendering
    pub fn current_job(&self) -> Option<u64> {
        match self.state.current.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    /// Jobs queued or rendering
    pub fn pending_count(&self) -> usize {
        lock(&self.state.jobs).len()
    }

    /// Cancel everything and stop the worker.
    ///
    /// Jobs still queued complete with [`ExtractionError::Cancelled`]
    /// before this returns. Idempotent.
    pub fn shutdown(&self) {
        let handle = lock(&self.thread_handle).take();
        if let Some(handle) = handle {
            self.cancel_all();
            let _ = self.command_tx.send(QueueCommand::Shutdown);
            if handle.join().is_err() {
                log::error!("[EXTRACT] Worker thread panicked");
            }
        }
    }

    /// Main worker loop
    fn run(state: Arc<QueueState>, resolver: Arc<dyn TrackResolver>, command_rx: Receiver<QueueCommand>) {
        log::info!("[EXTRACT] Worker started");

        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                QueueCommand::Run(job) => Self::execute(&state, resolver.as_ref(), job),
                QueueCommand::Shutdown => {
                    log::info!("[EXTRACT] Worker shutting down");
                    break;
                }
            }
        }
    }

    fn execute(state: &QueueState, resolver: &dyn TrackResolver, queued: QueuedJob) {
        let QueuedJob {
            id,
            job,
            cancel,
            mut on_progress,
            on_complete,
        } = queued;

        state.current.store(id, Ordering::Release);
        let result = if cancel.load(Ordering::Relaxed) {
            Err(ExtractionError::Cancelled)
        } else {
            state.emit(ExtractionProgress::Started {
                job_id: id,
                target: job.target.to_string(),
            });
            let mut report = |fraction: f32| {
                if let Some(callback) = on_progress.as_mut() {
                    callback(id, fraction);
                }
                state.emit(ExtractionProgress::Progress { job_id: id, fraction });
            };
            resolver
                .resolve(&job.target)
                .and_then(|sources| run_job(&job, sources, &cancel, &mut report))
        };
        state.current.store(0, Ordering::Release);
        lock(&state.jobs).remove(&id);

        let event = match &result {
            Ok(summary) => {
                log::info!("[EXTRACT] Job {} complete ({} frames)", id, summary.frames_written);
                ExtractionProgress::Complete {
                    job_id: id,
                    output_path: summary.output_path.clone(),
                    frames_written: summary.frames_written,
                }
            }
            Err(ExtractionError::Cancelled) => {
                log::info!("[EXTRACT] Job {} cancelled", id);
                ExtractionProgress::Cancelled { job_id: id }
            }
            Err(e) => {
                log::warn!("[EXTRACT] Job {} failed: {}", id, e);
                ExtractionProgress::Failed {
                    job_id: id,
                    error: e.to_string(),
                }
            }
        };
        state.emit(event);

        if let Some(callback) = on_complete {
            callback(id, result);
        }
    }
}

impl Drop for ExtractionQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Render `job` from already-resolved sources
fn run_job(
    job: &ExtractionJob,
    sources: JobSources,
    cancel: &AtomicBool,
    progress: &mut dyn FnMut(f32),
) -> ExtractionResult {
    match &job.target {
        ExtractionTarget::Track(id) => {
            let snapshot = sources
                .tracks
                .iter()
                .find(|t| &t.id == id)
                .ok_or_else(|| ExtractionError::TrackNotFound(id.clone()))?;
            extract_track(snapshot, &job.output_path, &job.config, cancel, progress)
        }
        ExtractionTarget::Mix => extract_mix(
            &sources.tracks,
            sources.master_volume,
            &job.output_path,
            &job.config,
            cancel,
            progress,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_file::test_util::write_sine_wav;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(20);

    /// Resolver over `<dir>/<id>.wav` for the given ids
    fn resolver(dir: &Path, ids: &[&str]) -> Arc<dyn TrackResolver> {
        let tracks: Vec<TrackSnapshot> = ids
            .iter()
            .map(|id| TrackSnapshot::new(*id, dir.join(format!("{}.wav", id))))
            .collect();
        Arc::new(move |target: &ExtractionTarget| match target {
            ExtractionTarget::Track(id) if !tracks.iter().any(|t| &t.id == id) => {
                Err(ExtractionError::TrackNotFound(id.clone()))
            }
            _ => Ok(JobSources {
                tracks: tracks.clone(),
                master_volume: 1.0,
            }),
        })
    }

    fn job(target: ExtractionTarget, output: PathBuf) -> ExtractionJob {
        ExtractionJob {
            target,
            output_path: output,
            config: ExtractionConfig::default(),
        }
    }

    fn completion(tx: &Sender<(u64, ExtractionResult)>) -> Option<CompletionCallback> {
        let tx = tx.clone();
        Some(Box::new(move |id, result| {
            let _ = tx.send((id, result));
        }))
    }

    #[test]
    fn test_jobs_run_in_order_with_increasing_ids() {
        let dir = tempdir().unwrap();
        write_sine_wav(&dir.path().join("a.wav"), 48000, 1, 4800, 0.5);
        let queue = ExtractionQueue::spawn(resolver(dir.path(), &["a"]));
        let (done_tx, done_rx) = channel::unbounded();

        let mut ids = Vec::new();
        for n in 0..3 {
            let out = dir.path().join(format!("out{}.wav", n));
            let target = ExtractionTarget::Track("a".into());
            ids.push(queue.submit(job(target, out), None, completion(&done_tx)).unwrap());
        }
        assert_eq!(ids, vec![1, 2, 3]);

        let finished: Vec<u64> = (0..3).map(|_| done_rx.recv_timeout(WAIT).unwrap().0).collect();
        assert_eq!(finished, ids);
        assert_eq!(queue.pending_count(), 0);
        assert!(dir.path().join("out2.wav").exists());
    }

    #[test]
    fn test_cancel_queued_and_running() {
        let dir = tempdir().unwrap();
        write_sine_wav(&dir.path().join("a.wav"), 48000, 2, 96000, 0.5);
        let queue = ExtractionQueue::spawn(resolver(dir.path(), &["a"]));
        let (done_tx, done_rx) = channel::unbounded();
        let (started_tx, started_rx) = channel::bounded::<()>(1);
        let (gate_tx, gate_rx) = channel::bounded::<()>(1);

        // First progress report parks the worker until the gate opens
        let mut parked = false;
        let hold: ProgressCallback = Box::new(move |_, _| {
            if !parked {
                parked = true;
                let _ = started_tx.send(());
                let _ = gate_rx.recv_timeout(WAIT);
            }
        });

        let first_out = dir.path().join("first.wav");
        let second_out = dir.path().join("second.wav");
        let target = ExtractionTarget::Track("a".into());
        let first = queue
            .submit(job(target.clone(), first_out.clone()), Some(hold), completion(&done_tx))
            .unwrap();
        let second = queue
            .submit(job(target, second_out.clone()), None, completion(&done_tx))
            .unwrap();

        started_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(queue.current_job(), Some(first));
        assert!(queue.is_running(second));

        assert!(queue.cancel(second));
        assert!(queue.cancel(first));
        gate_tx.send(()).unwrap();

        for _ in 0..2 {
            let (_, result) = done_rx.recv_timeout(WAIT).unwrap();
            assert!(result.unwrap_err().is_cancelled());
        }
        assert!(!first_out.exists());
        assert!(!second_out.exists());
        assert!(!queue.is_running(first));
        assert!(!queue.cancel(first));
        assert_eq!(queue.current_job(), None);
    }

    #[test]
    fn test_unknown_track_fails_through_completion() {
        let dir = tempdir().unwrap();
        let queue = ExtractionQueue::spawn(resolver(dir.path(), &[]));
        let (done_tx, done_rx) = channel::unbounded();

        let out = dir.path().join("out.wav");
        let id = queue
            .submit(job(ExtractionTarget::Track("nope".into()), out.clone()), None, completion(&done_tx))
            .unwrap();
        let (done_id, result) = done_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(done_id, id);
        assert!(matches!(result, Err(ExtractionError::TrackNotFound(_))));
        assert!(!out.exists());
    }

    #[test]
    fn test_monitor_sees_lifecycle() {
        let dir = tempdir().unwrap();
        write_sine_wav(&dir.path().join("a.wav"), 48000, 1, 24000, 0.5);
        write_sine_wav(&dir.path().join("b.wav"), 48000, 1, 12000, 0.5);
        let queue = ExtractionQueue::spawn(resolver(dir.path(), &["a", "b"]));
        let (monitor_tx, monitor_rx) = channel::unbounded();
        queue.set_monitor(Some(monitor_tx));

        let (done_tx, done_rx) = channel::unbounded();
        let id = queue
            .submit(job(ExtractionTarget::Mix, dir.path().join("mix.wav")), None, completion(&done_tx))
            .unwrap();
        let summary = done_rx.recv_timeout(WAIT).unwrap().1.unwrap();
        assert_eq!(summary.frames_written, 24000);

        let events: Vec<ExtractionProgress> = monitor_rx.try_iter().collect();
        assert!(events.iter().all(|e| e.job_id() == id));
        assert!(matches!(events.first(), Some(ExtractionProgress::Queued { .. })));
        assert!(matches!(events.get(1), Some(ExtractionProgress::Started { .. })));
        assert!(matches!(events.last(), Some(ExtractionProgress::Complete { .. })));
        let fractions: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionProgress::Progress { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect();
        assert!(fractions.windows(2).all(|w| w[1] >= w[0]));
        assert!(*fractions.last().unwrap() >= 0.99);
    }

    #[test]
    fn test_shutdown_completes_pending_as_cancelled() {
        let dir = tempdir().unwrap();
        write_sine_wav(&dir.path().join("a.wav"), 48000, 1, 480_000, 0.5);
        let queue = ExtractionQueue::spawn(resolver(dir.path(), &["a"]));
        let (done_tx, done_rx) = channel::unbounded();

        for n in 0..3 {
            let out = dir.path().join(format!("out{}.wav", n));
            queue
                .submit(job(ExtractionTarget::Track("a".into()), out), None, completion(&done_tx))
                .unwrap();
        }
        queue.shutdown();

        // Every callback ran before shutdown returned
        let results: Vec<_> = done_rx.try_iter().collect();
        assert_eq!(results.len(), 3);
        assert!(results.iter().any(|(_, r)| matches!(r, Err(ExtractionError::Cancelled))));

        let late = queue.submit(job(ExtractionTarget::Mix, dir.path().join("late.wav")), None, None);
        assert!(matches!(late, Err(ExtractionError::QueueClosed)));
    }
}
