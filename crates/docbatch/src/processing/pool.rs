//! Worker pool driving a batch run
//!
//! N OS threads pull from one shared FIFO queue. Queue, busy count and run
//! state live behind a single mutex; paused workers park on a condition
//! variable. Observer callbacks never run while that mutex is held.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::config::{BatchConfig, FileProductionPolicy};
use crate::error::{Error, Result};
use crate::remote::{DocumentApi, HttpDocumentApi, RemoteOperationClient, RetryPolicy};
use crate::types::{FileOperationsResult, FileTask, WorkflowDefinition};

use super::events::{BatchObserver, EventSink, WorkerId};
use super::executor::WorkflowExecutor;
use super::output::{InputSnapshot, OutputProducer};
use super::queue::WorkQueue;

/// Pool-wide run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No live workers
    Idle,
    Running,
    /// Workers park before their next file
    Paused,
    /// Abort requested; queue is empty and workers are draining
    Cancelling,
}

/// Parameters of one `start` call
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub worker_count: usize,
    pub destination: PathBuf,
    pub policy: FileProductionPolicy,
    pub workflow: WorkflowDefinition,
}

impl BatchRun {
    /// Worker count and production policy taken from `config`
    pub fn new(
        config: &BatchConfig,
        destination: impl Into<PathBuf>,
        workflow: WorkflowDefinition,
    ) -> Self {
        Self {
            worker_count: config.processing.worker_count,
            destination: destination.into(),
            policy: config.production,
            workflow,
        }
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

struct PoolState {
    queue: WorkQueue,
    run_state: RunState,
    busy_workers: usize,
}

struct Shared {
    state: Mutex<PoolState>,
    resumed: Condvar,
    events: Arc<EventSink>,
}

impl Shared {
    fn pick_file(&self) -> Option<FileTask> {
        self.state.lock().queue.pick()
    }

    fn is_cancelled(&self) -> bool {
        self.state.lock().run_state == RunState::Cancelling
    }

    /// Park the worker while the pool is paused
    fn wait_if_paused(&self, worker: WorkerId) {
        if self.state.lock().run_state != RunState::Paused {
            return;
        }
        self.events.emit(|o| o.worker_paused(worker));

        let mut state = self.state.lock();
        while state.run_state == RunState::Paused {
            self.resumed.wait(&mut state);
        }
        tracing::debug!("[worker {}] Resumed", worker);
    }

    /// Report a finished worker and, for the last one, the whole run
    fn worker_exited(&self, worker: WorkerId) {
        let _dispatch = self.events.hold();
        self.events.emit(|o| o.worker_completed(worker));

        let last = {
            let mut state = self.state.lock();
            state.busy_workers = state.busy_workers.saturating_sub(1);
            if state.busy_workers == 0 {
                state.run_state = RunState::Idle;
                true
            } else {
                false
            }
        };

        if last {
            tracing::info!("All workers finished");
            self.events.emit(|o| o.all_completed());
        }
    }
}

/// Everything a worker needs for one run, shared read-only
struct WorkerJob {
    executor: WorkflowExecutor,
    producer: OutputProducer,
    destination: PathBuf,
    max_content_length: Option<u64>,
}

impl WorkerJob {
    /// Process one file; failures are reported, never propagated
    fn process(&self, shared: &Shared, worker: WorkerId, task: &FileTask) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.process_file(shared, worker, task)
        }));

        match outcome {
            Ok(Ok(Some(result))) => shared.events.emit(|o| o.file_completed(&result)),
            Ok(Ok(None)) => tracing::debug!(
                "[worker {}] {} stopped by abort",
                worker,
                task.source().display()
            ),
            Ok(Err(error)) => {
                let message = error.describe(task.source());
                shared.events.emit(|o| o.error(&message));
            }
            Err(payload) => {
                let message = format!(
                    "unexpected error: {} - {}",
                    task.source().display(),
                    panic_message(payload.as_ref())
                );
                tracing::error!("[worker {}] {}", worker, message);
                shared.events.emit(|o| o.error(&message));
            }
        }
    }

    fn process_file(
        &self,
        shared: &Shared,
        worker: WorkerId,
        task: &FileTask,
    ) -> Result<Option<FileOperationsResult>> {
        let input = InputSnapshot::capture(task.source())?;
        if input.size == 0 {
            return Err(Error::EmptyFile);
        }
        if let Some(limit) = self.max_content_length {
            if input.size > limit {
                return Err(Error::FileTooLarge {
                    size: input.size,
                    limit,
                });
            }
        }

        let is_cancelled = || shared.is_cancelled();
        let mut result = match self.executor.run(worker, task, &is_cancelled)? {
            Some(result) => result,
            None => return Ok(None),
        };

        let warnings = std::mem::take(&mut result.warnings);
        let destination = self.destination.join(task.relative_path());
        let report = self.producer.produce(task, &destination, &input, result)?;

        for warning in warnings.iter().chain(&report.warnings) {
            shared.events.emit(|o| o.warning(warning));
        }

        Ok(Some(FileOperationsResult {
            input_path: task.source().to_path_buf(),
            input_size: input.size,
            output_size: report.output_size,
            converted_to_pdf: !task.is_pdf(),
        }))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("worker panicked")
}

enum WorkerStep {
    Pull,
    Process(FileTask),
    Pause,
    Exit,
}

fn run_worker(shared: &Shared, job: &WorkerJob, worker: WorkerId) {
    tracing::debug!("[worker {}] Started", worker);

    let mut step = WorkerStep::Pull;
    loop {
        step = match step {
            WorkerStep::Pull => match shared.pick_file() {
                Some(task) if shared.is_cancelled() => {
                    tracing::debug!(
                        "[worker {}] Dropping {} after abort",
                        worker,
                        task.source().display()
                    );
                    WorkerStep::Exit
                }
                Some(task) => WorkerStep::Process(task),
                None => WorkerStep::Exit,
            },
            WorkerStep::Process(task) => {
                job.process(shared, worker, &task);
                WorkerStep::Pause
            }
            WorkerStep::Pause => {
                shared.wait_if_paused(worker);
                WorkerStep::Pull
            }
            WorkerStep::Exit => break,
        };
    }

    shared.worker_exited(worker);
}

/// Owns the queue and the worker threads of batch runs
pub struct OperationsManager {
    config: Arc<BatchConfig>,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl OperationsManager {
    pub fn new(config: Arc<BatchConfig>, observer: Arc<dyn BatchObserver>) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: WorkQueue::new(),
                    run_state: RunState::Idle,
                    busy_workers: 0,
                }),
                resumed: Condvar::new(),
                events: Arc::new(EventSink::new(observer)),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Append tasks to the shared queue
    pub fn feed<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = FileTask>,
    {
        self.shared.state.lock().queue.feed(tasks);
    }

    pub fn pending_files(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn run_state(&self) -> RunState {
        self.shared.state.lock().run_state
    }

    /// Spawn `run.worker_count` workers over the queue.
    ///
    /// `api` is shared by every worker of the run. Fails with
    /// `Error::AlreadyRunning` while threads of a previous run are alive.
    pub fn start(&self, api: Arc<dyn DocumentApi>, run: BatchRun) -> Result<()> {
        let mut workers = self.workers.lock();
        if workers.iter().any(|handle| !handle.is_finished()) {
            return Err(Error::AlreadyRunning);
        }
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("A worker of the previous run panicked");
            }
        }

        if run.worker_count == 0 {
            return Err(Error::invalid_input("worker count must be at least 1"));
        }
        let destination = fs::canonicalize(&run.destination).map_err(|e| {
            Error::invalid_input(format!(
                "destination folder {} is not accessible: {}",
                run.destination.display(),
                e
            ))
        })?;
        if !destination.is_dir() {
            return Err(Error::invalid_input(format!(
                "destination {} is not a folder",
                destination.display()
            )));
        }

        let reduction_intended = run.workflow.is_file_size_reduction_intended();
        let client = RemoteOperationClient::new(api, RetryPolicy::from_config(&self.config.retry));
        let job = Arc::new(WorkerJob {
            executor: WorkflowExecutor::new(
                client,
                Arc::new(run.workflow),
                Arc::clone(&self.shared.events),
                self.config.processing.ocr_page_chunk_length,
            ),
            producer: OutputProducer::new(run.policy, reduction_intended),
            destination,
            max_content_length: self.config.processing.max_allowed_content_length,
        });

        let pending = {
            let mut state = self.shared.state.lock();
            // A pause requested before the start holds until resumed
            if state.run_state != RunState::Paused {
                state.run_state = RunState::Running;
            }
            state.busy_workers = run.worker_count;
            state.queue.len()
        };
        tracing::info!(
            "Starting {} workers for {} files",
            run.worker_count,
            pending
        );

        for worker in 1..=run.worker_count {
            let shared = Arc::clone(&self.shared);
            let job = Arc::clone(&job);
            let spawned = thread::Builder::new()
                .name(format!("docbatch-worker-{}", worker))
                .spawn(move || run_worker(&shared, &job, worker));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    tracing::error!("Could not spawn worker {}: {}", worker, e);
                    for unspawned in worker..=run.worker_count {
                        self.shared.worker_exited(unspawned);
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Start with an HTTP client built from the configured endpoint
    pub fn start_with_api_key(&self, api_key: &str, run: BatchRun) -> Result<()> {
        let api = HttpDocumentApi::new(&self.config.api, api_key)?;
        self.start(Arc::new(api), run)
    }

    /// Pause before the next file.
    ///
    /// Returns false, without effect, when an abort is pending or the queue
    /// is empty. Before `start`, workers of the coming run each finish one
    /// file and then wait.
    pub fn pause_work(&self) -> bool {
        let mut state = self.shared.state.lock();
        let can_pause = state.run_state != RunState::Cancelling && !state.queue.is_empty();
        if can_pause {
            state.run_state = RunState::Paused;
            tracing::info!("Pausing with {} files pending", state.queue.len());
        }
        can_pause
    }

    pub fn resume_work(&self) {
        let mut state = self.shared.state.lock();
        if state.run_state == RunState::Paused {
            state.run_state = if state.busy_workers > 0 {
                RunState::Running
            } else {
                RunState::Idle
            };
            tracing::info!("Resuming");
        }
        self.shared.resumed.notify_all();
    }

    /// Drop pending files and let workers exit after their current file
    pub fn abort_work(&self) {
        let mut state = self.shared.state.lock();
        let dropped = state.queue.clear();
        state.run_state = if state.busy_workers > 0 {
            RunState::Cancelling
        } else {
            RunState::Idle
        };
        self.shared.resumed.notify_all();
        tracing::info!("Abort requested, {} pending files dropped", dropped);
    }

    /// Block until every worker of the current run has exited.
    ///
    /// Does not return while the pool stays paused.
    pub fn wait(&self) {
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::events::recording::{Event, RecordingObserver};
    use crate::remote::api::ResultCode;
    use crate::remote::fake::FakeDocumentApi;
    use crate::types::ReduceConfig;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn config() -> Arc<BatchConfig> {
        let mut config = BatchConfig::default();
        config.retry.base_delay_ms = 0;
        config.retry.delay_increment_ms = 0;
        Arc::new(config)
    }

    fn seed(root: &Path, names: &[&str]) -> Vec<FileTask> {
        let input = root.join("in");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(root.join("out")).unwrap();
        names
            .iter()
            .map(|name| {
                let path = input.join(name);
                fs::write(&path, format!("%PDF-1.4 {:0>64}", name)).unwrap();
                FileTask::new(path, *name)
            })
            .collect()
    }

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}.pdf", i)).collect()
    }

    fn run(root: &Path, workers: usize) -> BatchRun {
        BatchRun::new(
            &BatchConfig::default(),
            root.join("out"),
            WorkflowDefinition::pdf_reduction(ReduceConfig::default()),
        )
        .with_worker_count(workers)
    }

    /// Observer hook with access to the manager it observes
    fn bind(
        observer: &RecordingObserver,
        manager: &Arc<OperationsManager>,
        hook: impl Fn(&OperationsManager, &Event) + Send + Sync + 'static,
    ) {
        let slot: Arc<OnceLock<Weak<OperationsManager>>> = Arc::new(OnceLock::new());
        let _ = slot.set(Arc::downgrade(manager));
        observer.on_event(move |event| {
            if let Some(manager) = slot.get().and_then(Weak::upgrade) {
                hook(&manager, event);
            }
        });
    }

    #[test]
    fn test_every_file_processed_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let names = numbered(40);
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let tasks = seed(dir.path(), &names);
        let api = Arc::new(FakeDocumentApi::new());
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());

        manager.feed(tasks);
        manager.start(api.clone(), run(dir.path(), 8)).unwrap();
        manager.wait();

        let completed = observer.completed();
        let unique: HashSet<_> = completed.iter().map(|r| r.input_path.clone()).collect();
        assert_eq!(completed.len(), 40);
        assert_eq!(unique.len(), 40);
        assert_eq!(api.uploads().len(), 40);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(observer.count(|e| matches!(e, Event::WorkerDone(_))), 8);
        assert_eq!(observer.events().last(), Some(&Event::AllDone));
        assert_eq!(manager.pending_files(), 0);
        assert_eq!(manager.run_state(), RunState::Idle);
        assert!(dir.path().join("out").join("17.pdf").exists());
    }

    #[test]
    fn test_completion_fires_once_with_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &[]);
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());

        manager
            .start(Arc::new(FakeDocumentApi::new()), run(dir.path(), 6))
            .unwrap();
        manager.wait();

        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(observer.count(|e| matches!(e, Event::WorkerDone(_))), 6);
    }

    #[test]
    fn test_pause_from_callback_then_resume() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = seed(dir.path(), &["a.pdf", "b.pdf", "c.pdf"]);
        let observer = RecordingObserver::new();
        let manager = Arc::new(OperationsManager::new(config(), observer.clone()));

        let paused = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&paused);
        bind(&observer, &manager, move |manager, event| {
            if matches!(event, Event::Completed(_)) && !flag.load(Ordering::SeqCst) {
                flag.store(manager.pause_work(), Ordering::SeqCst);
            }
        });

        manager.feed(tasks);
        manager
            .start(Arc::new(FakeDocumentApi::new()), run(dir.path(), 1))
            .unwrap();

        assert!(observer.wait_for(|e| *e == Event::Paused(1), TIMEOUT));
        assert!(paused.load(Ordering::SeqCst));
        assert_eq!(manager.run_state(), RunState::Paused);
        assert_eq!(manager.pending_files(), 2);
        assert_eq!(observer.completed().len(), 1);

        manager.resume_work();
        manager.wait();

        assert_eq!(observer.completed().len(), 3);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
    }

    #[test]
    fn test_abort_while_paused_unblocks_workers() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = seed(dir.path(), &["a.pdf", "b.pdf", "c.pdf", "d.pdf"]);
        let observer = RecordingObserver::new();
        let manager = Arc::new(OperationsManager::new(config(), observer.clone()));

        let once = Arc::new(AtomicBool::new(false));
        bind(&observer, &manager, move |manager, event| {
            if matches!(event, Event::Completed(_)) && !once.swap(true, Ordering::SeqCst) {
                assert!(manager.pause_work());
            }
        });

        manager.feed(tasks);
        manager
            .start(Arc::new(FakeDocumentApi::new()), run(dir.path(), 1))
            .unwrap();
        assert!(observer.wait_for(|e| matches!(e, Event::Paused(_)), TIMEOUT));

        manager.abort_work();
        manager.wait();

        assert_eq!(manager.pending_files(), 0);
        assert_eq!(observer.completed().len(), 1);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(observer.count(|e| matches!(e, Event::WorkerDone(_))), 1);
        assert_eq!(manager.run_state(), RunState::Idle);
        assert!(!manager.pause_work());
    }

    #[test]
    fn test_abort_mid_run_stops_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let names = numbered(20);
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let tasks = seed(dir.path(), &names);
        let observer = RecordingObserver::new();
        let manager = Arc::new(OperationsManager::new(config(), observer.clone()));

        bind(&observer, &manager, |manager, event| {
            if matches!(event, Event::Completed(_)) {
                manager.abort_work();
            }
        });

        manager.feed(tasks);
        manager
            .start(Arc::new(FakeDocumentApi::new()), run(dir.path(), 4))
            .unwrap();
        manager.wait();

        let completed = observer.completed().len();
        assert!((1..=4).contains(&completed), "completed {}", completed);
        assert_eq!(manager.pending_files(), 0);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(observer.count(|e| matches!(e, Event::WorkerDone(_))), 4);
    }

    #[test]
    fn test_pause_needs_pending_files() {
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());
        assert!(!manager.pause_work());
        assert_eq!(manager.run_state(), RunState::Idle);

        manager.feed(vec![FileTask::new("/in/a.pdf", "a.pdf")]);
        // Not started yet, but there is work to hold back
        assert!(manager.pause_work());
        assert_eq!(manager.run_state(), RunState::Paused);
        manager.resume_work();
        assert_eq!(manager.run_state(), RunState::Idle);

        assert!(manager.pause_work());
        manager.abort_work();
        assert_eq!(manager.pending_files(), 0);
        assert_eq!(manager.run_state(), RunState::Idle);
        assert!(!manager.pause_work());
        assert!(observer.events().is_empty());
    }

    #[test]
    fn test_pause_before_start_holds_after_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = seed(dir.path(), &["a.pdf", "b.pdf", "c.pdf"]);
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());

        manager.feed(tasks);
        assert!(manager.pause_work());
        manager
            .start(Arc::new(FakeDocumentApi::new()), run(dir.path(), 1))
            .unwrap();

        assert!(observer.wait_for(|e| *e == Event::Paused(1), TIMEOUT));
        assert_eq!(manager.run_state(), RunState::Paused);
        assert_eq!(observer.completed().len(), 1);
        assert_eq!(manager.pending_files(), 2);

        manager.resume_work();
        manager.wait();

        assert_eq!(observer.completed().len(), 3);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(manager.run_state(), RunState::Idle);
    }

    /// Pause on the first completion and wait until every worker is parked
    fn pause_all_workers(
        dir: &Path,
        observer: &Arc<RecordingObserver>,
        manager: &Arc<OperationsManager>,
        workers: usize,
    ) {
        let once = Arc::new(AtomicBool::new(false));
        bind(observer, manager, move |manager, event| {
            if matches!(event, Event::Completed(_)) && !once.swap(true, Ordering::SeqCst) {
                assert!(manager.pause_work());
            }
        });

        let names = numbered(40);
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        manager.feed(seed(dir, &names));
        manager
            .start(Arc::new(FakeDocumentApi::new()), run(dir, workers))
            .unwrap();

        for worker in 1..=workers {
            assert!(observer.wait_for(|e| *e == Event::Paused(worker), TIMEOUT));
        }
        assert_eq!(manager.run_state(), RunState::Paused);
    }

    #[test]
    fn test_pause_and_resume_with_many_workers() {
        let dir = tempfile::tempdir().unwrap();
        let observer = RecordingObserver::new();
        let manager = Arc::new(OperationsManager::new(config(), observer.clone()));

        pause_all_workers(dir.path(), &observer, &manager, 4);
        let held = observer.completed().len();
        assert!(held >= 1 && held < 40, "completed {}", held);
        assert_eq!(manager.pending_files(), 40 - held);

        thread::sleep(Duration::from_millis(300));
        assert_eq!(observer.completed().len(), held);
        assert_eq!(observer.count(|e| matches!(e, Event::Paused(_))), 4);

        manager.resume_work();
        manager.wait();

        let completed = observer.completed();
        let unique: HashSet<_> = completed.iter().map(|r| r.input_path.clone()).collect();
        assert_eq!(completed.len(), 40);
        assert_eq!(unique.len(), 40);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(observer.count(|e| matches!(e, Event::WorkerDone(_))), 4);
        assert_eq!(manager.run_state(), RunState::Idle);
    }

    #[test]
    fn test_abort_while_many_workers_paused() {
        let dir = tempfile::tempdir().unwrap();
        let observer = RecordingObserver::new();
        let manager = Arc::new(OperationsManager::new(config(), observer.clone()));

        pause_all_workers(dir.path(), &observer, &manager, 4);
        let held = observer.completed().len();

        manager.abort_work();
        manager.wait();

        assert_eq!(manager.pending_files(), 0);
        assert_eq!(observer.completed().len(), held);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
        assert_eq!(observer.count(|e| matches!(e, Event::WorkerDone(_))), 4);
        assert_eq!(observer.events().last(), Some(&Event::AllDone));
        assert_eq!(manager.run_state(), RunState::Idle);
    }

    #[test]
    fn test_file_errors_do_not_stop_the_pool() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = seed(dir.path(), &["ok1.pdf", "bad.pdf", "ok2.pdf", "boom.pdf"]);
        let api = Arc::new(
            FakeDocumentApi::new()
                .with_load_error("bad.pdf", ResultCode::PdfCanNotOpenFile)
                .panicking_on("boom.pdf"),
        );
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());

        manager.feed(tasks);
        manager.start(api, run(dir.path(), 2)).unwrap();
        manager.wait();

        let errors = observer.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| e.starts_with("(Load) PDF can not be opened") && e.contains("bad.pdf")));
        assert!(errors
            .iter()
            .any(|e| e.starts_with("unexpected error") && e.contains("boom.pdf")));
        assert_eq!(observer.completed().len(), 2);
        assert_eq!(observer.count(|e| *e == Event::AllDone), 1);
    }

    #[test]
    fn test_input_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = seed(dir.path(), &["big.pdf"]);
        let empty = dir.path().join("in").join("empty.pdf");
        fs::write(&empty, b"").unwrap();
        tasks.push(FileTask::new(&empty, "empty.pdf"));

        let mut config = (*config()).clone();
        config.processing.max_allowed_content_length = Some(16);
        let api = Arc::new(FakeDocumentApi::new());
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(Arc::new(config), observer.clone());

        manager.feed(tasks);
        manager.start(api.clone(), run(dir.path(), 1)).unwrap();
        manager.wait();

        let errors = observer.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("exceeds the maximum allowed size of 16 bytes"));
        assert!(errors[1].starts_with("file is empty"));
        assert!(api.uploads().is_empty());
    }

    #[test]
    fn test_warnings_reported_for_discarded_output() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = seed(dir.path(), &["a.pdf", "b.pdf"]);
        let api = Arc::new(FakeDocumentApi::new().with_artifact(Some(vec![b'x'; 4096])));
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());

        manager.feed(tasks);
        manager.start(api, run(dir.path(), 2)).unwrap();
        manager.wait();

        assert_eq!(observer.warnings().len(), 2);
        let completed = observer.completed();
        assert_eq!(completed.len(), 2);
        assert!(completed.iter().all(|r| r.input_size == r.output_size));
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = seed(dir.path(), &["a.pdf", "b.pdf"]);
        let observer = RecordingObserver::new();
        let manager = Arc::new(OperationsManager::new(config(), observer.clone()));

        let pauses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pauses);
        bind(&observer, &manager, move |manager, event| {
            if matches!(event, Event::Completed(_)) && counter.fetch_add(1, Ordering::SeqCst) == 0 {
                manager.pause_work();
            }
        });

        manager.feed(tasks);
        let api: Arc<dyn DocumentApi> = Arc::new(FakeDocumentApi::new());
        manager.start(Arc::clone(&api), run(dir.path(), 1)).unwrap();
        assert!(observer.wait_for(|e| matches!(e, Event::Paused(_)), TIMEOUT));

        assert!(matches!(
            manager.start(Arc::clone(&api), run(dir.path(), 1)),
            Err(Error::AlreadyRunning)
        ));

        manager.abort_work();
        manager.wait();

        manager.start(api, run(dir.path(), 1)).unwrap();
        manager.wait();
        assert_eq!(observer.count(|e| *e == Event::AllDone), 2);
    }

    #[test]
    fn test_invalid_destination_rejected_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let observer = RecordingObserver::new();
        let manager = OperationsManager::new(config(), observer.clone());
        let run = BatchRun::new(
            &BatchConfig::default(),
            dir.path().join("missing"),
            WorkflowDefinition::pdf_reduction(ReduceConfig::default()),
        );

        assert!(matches!(
            manager.start(Arc::new(FakeDocumentApi::new()), run),
            Err(Error::InvalidInput(_))
        ));
        assert!(observer.events().is_empty());
        assert_eq!(manager.run_state(), RunState::Idle);
    }
}
