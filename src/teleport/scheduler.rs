//! Delayed single-shot task scheduling.
//!
//! Two executors are exposed:
//! * `Main` funnels jobs through one actor task, so everything it runs is
//!   serialized. Fired warmups move players here.
//! * `Async` runs the job on whatever tokio worker picked up the timer.
//!
//! A job fires at most once: the [`TaskHandle`] state moves from pending to
//! either fired or cancelled exactly once, and the job runs only if it won the
//! pending -> fired transition. Cancelling after the timer elapsed but before the
//! main actor got to the job still prevents it. A main job that is dropped
//! unrun (the main executor stopped) moves its handle to cancelled, so owners
//! can tell it will never fire.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Executor {
    /// Serialized world-thread executor
    Main,
    /// Free-running background executor
    Async,
}

pub trait Scheduler: Send + Sync {
    /// Run `job` once on `executor` after `delay`.
    fn schedule_once(&self, executor: Executor, delay: Duration, job: Job) -> TaskHandle;

    /// Whether the caller is currently running on the main executor.
    ///
    /// Hosts whose command handlers already run on the world thread may keep
    /// the default.
    fn is_main_executor(&self) -> bool {
        true
    }
}

tokio::task_local! {
    static MAIN_EXECUTOR: ();
}

/// True while a job of a [`TokioScheduler`] main executor is running.
pub fn on_main_executor() -> bool {
    MAIN_EXECUTOR.try_with(|_| ()).is_ok()
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

struct TaskCell {
    state: AtomicU8,
    timer: Mutex<Option<AbortHandle>>,
}

/// Cancelable handle to a scheduled job. Clones share state.
#[derive(Clone)]
pub struct TaskHandle {
    cell: Arc<TaskCell>,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.cell.state.load(Ordering::Acquire) {
            PENDING => "pending",
            FIRED => "fired",
            _ => "cancelled",
        };
        f.debug_struct("TaskHandle").field("state", &state).finish()
    }
}

impl TaskHandle {
    /// A handle in the pending state with no timer attached yet.
    pub fn pending() -> Self {
        Self {
            cell: Arc::new(TaskCell {
                state: AtomicU8::new(PENDING),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Cancel the job. Returns `true` only if this call prevented it from
    /// running (it had neither fired nor been cancelled before).
    pub fn cancel(&self) -> bool {
        let won = self
            .cell
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            if let Some(timer) = self.lock_timer().take() {
                timer.abort();
            }
        }
        won
    }

    /// Still waiting to fire.
    pub fn is_live(&self) -> bool {
        self.cell.state.load(Ordering::Acquire) == PENDING
    }

    pub fn has_fired(&self) -> bool {
        self.cell.state.load(Ordering::Acquire) == FIRED
    }

    /// Cancelled, either by its owner or because it can no longer run.
    pub fn is_cancelled(&self) -> bool {
        self.cell.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Claim the right to run the job. Schedulers call this right before
    /// invoking it; a `false` means it was cancelled in the meantime.
    pub fn try_fire(&self) -> bool {
        self.cell
            .state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give up a task that can no longer run. Unlike [`cancel`](Self::cancel)
    /// this leaves the timer alone; it is called from inside it.
    fn abandon(&self) -> bool {
        self.cell
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn attach_timer(&self, timer: AbortHandle) {
        let mut slot = self.lock_timer();
        if self.is_live() {
            *slot = Some(timer);
        } else if !self.has_fired() {
            timer.abort();
        }
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<AbortHandle>> {
        self.cell.timer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A job on its way to the main executor. Dropping it unrun abandons the handle.
struct MainJob {
    handle: TaskHandle,
    job: Option<Job>,
}

impl MainJob {
    fn run(mut self) {
        if let Some(job) = self.job.take() {
            if self.handle.try_fire() {
                job();
            }
        }
    }
}

impl Drop for MainJob {
    fn drop(&mut self) {
        if self.job.is_some() && self.handle.abandon() {
            warn!("main executor stopped; scheduled job abandoned");
        }
    }
}

enum MainCommand {
    Run(Job),
    Snapshot(oneshot::Sender<MainThreadStats>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Default)]
pub struct MainThreadStats {
    pub executed: u64,
    pub panicked: u64,
}

/// Sender side of the main executor actor.
#[derive(Clone, Debug)]
pub struct MainThreadHandle {
    tx: mpsc::UnboundedSender<MainCommand>,
}

impl MainThreadHandle {
    /// Queue a job on the main executor. Returns `false` once the actor is gone.
    pub fn run(&self, job: Job) -> bool {
        self.tx.send(MainCommand::Run(job)).is_ok()
    }

    pub async fn snapshot(&self) -> Option<MainThreadStats> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(MainCommand::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(MainCommand::Shutdown(tx));
        let _ = rx.await;
    }
}

/// Spawn the main executor actor on the current runtime.
pub fn start_main_thread() -> MainThreadHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<MainCommand>();
    tokio::spawn(async move {
        let mut stats = MainThreadStats::default();
        while let Some(cmd) = rx.recv().await {
            match cmd {
                MainCommand::Run(job) => {
                    let ran = catch_unwind(AssertUnwindSafe(|| MAIN_EXECUTOR.sync_scope((), job)));
                    if ran.is_err() {
                        stats.panicked += 1;
                        error!("main executor job panicked; continuing");
                    }
                    stats.executed += 1;
                }
                MainCommand::Snapshot(resp) => {
                    let _ = resp.send(stats.clone());
                }
                MainCommand::Shutdown(done) => {
                    let _ = done.send(());
                    break;
                }
            }
        }
        debug!("main executor loop terminated");
    });
    MainThreadHandle { tx }
}

/// [`Scheduler`] backed by tokio timers and a main executor actor.
#[derive(Clone)]
pub struct TokioScheduler {
    runtime: Handle,
    main: MainThreadHandle,
}

impl TokioScheduler {
    /// Must be called from within a tokio runtime. Scheduling afterwards works
    /// from any thread.
    pub fn start() -> Self {
        Self {
            runtime: Handle::current(),
            main: start_main_thread(),
        }
    }

    pub fn main_thread(&self) -> &MainThreadHandle {
        &self.main
    }
}

impl Scheduler for TokioScheduler {
    fn is_main_executor(&self) -> bool {
        on_main_executor()
    }

    fn schedule_once(&self, executor: Executor, delay: Duration, job: Job) -> TaskHandle {
        let handle = TaskHandle::pending();
        let fire = handle.clone();
        let main = self.main.clone();
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            match executor {
                Executor::Main => {
                    let task = MainJob {
                        handle: fire,
                        job: Some(job),
                    };
                    // A refused job comes back inside the send error and is
                    // dropped here, which abandons the handle.
                    main.run(Box::new(move || task.run()));
                }
                Executor::Async => {
                    if fire.try_fire() {
                        job();
                    }
                }
            }
        });
        handle.attach_timer(timer.abort_handle());
        handle
    }
}
