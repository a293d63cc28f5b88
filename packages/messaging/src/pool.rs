//! Bounded worker pool for asynchronous dispatch.

use std::cell::Cell;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::{Backpressure, DispatchError, DispatcherConfig};

thread_local! {
    static DISPATCH_WORKER: Cell<bool> = const { Cell::new(false) };
}

fn on_dispatch_worker() -> bool {
    DISPATCH_WORKER.with(Cell::get)
}

/// A fixed set of worker threads with a bounded number of outstanding jobs.
///
/// Each job holds a semaphore permit until it finishes, so at most
/// `queue_capacity` jobs are queued or running at once.
pub(crate) struct WorkerPool {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    permits: Arc<Semaphore>,
    backpressure: Backpressure,
}

impl WorkerPool {
    pub fn new(config: &DispatcherConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.pool_size)
            .thread_name(config.thread_name.clone())
            .on_thread_start(|| DISPATCH_WORKER.with(|worker| worker.set(true)))
            .build()
            .map_err(DispatchError::Pool)?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
            permits: Arc::new(Semaphore::new(config.queue_capacity)),
            backpressure: config.backpressure,
        })
    }

    /// Queue `job`. Returns `false` if it was dropped.
    ///
    /// With [`Backpressure::Block`] a full pool makes the caller wait, except
    /// on this pool's own workers: a job dispatching further work must not
    /// wait on itself, so there a full pool drops the job.
    pub fn submit<J>(&self, job: J) -> bool
    where
        J: FnOnce() + Send + 'static,
    {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::Closed) => None,
            Err(TryAcquireError::NoPermits)
                if self.backpressure == Backpressure::Block && !on_dispatch_worker() =>
            {
                self.wait_for_permit()
            }
            Err(TryAcquireError::NoPermits) => None,
        };

        let Some(permit) = permit else {
            return false;
        };

        self.handle.spawn(async move {
            let _permit = permit;
            job();
        });
        true
    }

    fn wait_for_permit(&self) -> Option<OwnedSemaphorePermit> {
        let acquire = || {
            self.handle
                .block_on(Arc::clone(&self.permits).acquire_owned())
                .ok()
        };
        if Handle::try_current().is_err() {
            return acquire();
        }
        // The caller is inside some other runtime, where `block_on` is not
        // allowed. Wait from a plain thread instead.
        std::thread::scope(|scope| scope.spawn(acquire).join().ok().flatten())
    }

    /// Stop accepting jobs and shut the workers down without waiting.
    ///
    /// Queued jobs that have not started are dropped.
    pub fn shutdown(&self) {
        self.permits.close();
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
