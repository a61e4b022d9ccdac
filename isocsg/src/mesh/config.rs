//! Configuration for sampling and meshing
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

/// Local pools, keyed by thread count
///
/// Pools are built on first use and kept for the life of the process, so
/// repeated calls with the same settings share one set of workers.
static POOLS: LazyLock<Mutex<HashMap<usize, Arc<rayon::ThreadPool>>>> =
    LazyLock::new(Default::default);

/// Returns the shared pool with `n` threads, building it if needed
fn pool(
    n: NonZeroUsize,
) -> Result<Arc<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
    let mut pools = POOLS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(p) = pools.get(&n.get()) {
        return Ok(p.clone());
    }
    let p = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(n.get())
            .thread_name(|i| format!("isocsg-{i}"))
            .build()?,
    );
    log::debug!("built thread pool with {n} threads");
    pools.insert(n.get(), p.clone());
    Ok(p)
}

/// Number of threads to use during sampling and meshing
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadCount {
    /// Perform all work in the calling thread, not spawning any workers
    One,

    /// Run work on a local pool with the given number of worker threads
    ///
    /// This can be set to `1`, in which case a single worker thread will be
    /// spawned; this is different from doing work in the calling thread, but
    /// not particularly useful!
    Many(NonZeroUsize),
}

impl From<NonZeroUsize> for ThreadCount {
    fn from(v: NonZeroUsize) -> Self {
        match v.get() {
            1 => ThreadCount::One,
            _ => ThreadCount::Many(v),
        }
    }
}

/// Single-threaded mode is shown as `-`; otherwise, an integer
impl std::fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadCount::One => write!(f, "-"),
            ThreadCount::Many(n) => write!(f, "{n}"),
        }
    }
}

impl ThreadCount {
    /// Gets the thread count
    ///
    /// Returns `None` if we are required to be single-threaded
    pub fn get(&self) -> Option<usize> {
        match self {
            ThreadCount::One => None,
            ThreadCount::Many(v) => Some(v.get()),
        }
    }
}

impl Default for ThreadCount {
    fn default() -> Self {
        std::thread::available_parallelism()
            .map(ThreadCount::from)
            .unwrap_or(ThreadCount::One)
    }
}

/// Settings for sampling and meshing
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of worker threads
    pub threads: ThreadCount,

    /// Number of points evaluated together by a single worker
    ///
    /// Must be non-zero.
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: ThreadCount::default(),
            chunk_size: 4096,
        }
    }
}

impl Settings {
    /// Builds single-threaded settings with the default chunk size
    pub fn single_threaded() -> Self {
        Self {
            threads: ThreadCount::One,
            ..Self::default()
        }
    }

    /// Runs a parallel job within the configured thread pool
    ///
    /// `f` receives `true` if it may use `rayon` parallel iterators, and
    /// `false` if it must run on the calling thread.
    pub(crate) fn run<F: FnOnce(bool) -> V + Send, V: Send>(&self, f: F) -> V {
        match self.threads {
            ThreadCount::One => f(false),
            ThreadCount::Many(n) => match pool(n) {
                Ok(pool) => pool.install(|| f(true)),
                Err(e) => {
                    log::warn!(
                        "could not build thread pool ({e}); \
                         using the global pool"
                    );
                    f(true)
                }
            },
        }
    }
}
