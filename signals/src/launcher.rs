use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A unit of work handed to a [`Launcher`]: one slot called with one copy of the arguments.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Starts the units of work produced by an invocation.
///
/// Every job must be started so that it runs concurrently with the caller; a launcher must never
/// run a job inline. Dropping a job without running it is allowed (the slot then reports
/// [`SlotError::Abandoned`](crate::SlotError::Abandoned)), and an `Err` return reports
/// [`SlotError::Launch`](crate::SlotError::Launch) for that slot alone.
pub trait Launcher: Send + Sync + 'static {
    fn launch(&self, job: Job) -> std::io::Result<()>;
}

impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    fn launch(&self, job: Job) -> std::io::Result<()> { (**self).launch(job) }
}

impl<L: Launcher + ?Sized> Launcher for Box<L> {
    fn launch(&self, job: Job) -> std::io::Result<()> { (**self).launch(job) }
}

/// Runs every job on its own detached OS thread. This is the default launcher.
///
/// Threads are named `slot-{n}` unless another prefix is set.
#[derive(Debug, Clone)]
pub struct ThreadLauncher {
    name_prefix: String,
    stack_size: Option<usize>,
}

impl Default for ThreadLauncher {
    fn default() -> Self { Self { name_prefix: "slot".to_string(), stack_size: None } }
}

static NEXT_THREAD: AtomicUsize = AtomicUsize::new(0);

impl ThreadLauncher {
    pub fn new() -> Self { Self::default() }

    /// Name spawned threads `{prefix}-{n}`
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Stack size in bytes for spawned threads
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Launcher for ThreadLauncher {
    fn launch(&self, job: Job) -> std::io::Result<()> {
        let mut builder = std::thread::Builder::new().name(format!("{}-{}", self.name_prefix, NEXT_THREAD.fetch_add(1, Ordering::Relaxed)));
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        // the JoinHandle is dropped, which detaches the thread
        builder.spawn(job).map(|_| ())
    }
}

/// Runs every job on the blocking pool of a tokio runtime.
///
/// The pool is bounded (see `Builder::max_blocking_threads`), so under load jobs queue instead of
/// each getting a fresh thread. Jobs still pending when the runtime shuts down are dropped.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioLauncher(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioLauncher {
    pub fn new(handle: tokio::runtime::Handle) -> Self { Self(handle) }

    /// Use the runtime the caller is currently running in
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> { Ok(Self(tokio::runtime::Handle::try_current()?)) }
}

#[cfg(feature = "tokio")]
impl Launcher for TokioLauncher {
    fn launch(&self, job: Job) -> std::io::Result<()> {
        drop(self.0.spawn_blocking(job));
        Ok(())
    }
}
