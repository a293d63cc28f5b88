//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::DispatchError;

/// What an asynchronous dispatcher does when its queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// The calling thread waits for a free slot.
    ///
    /// Callers already running on an async runtime cannot wait and fall back
    /// to dropping the job.
    #[default]
    Block,
    /// The new job is dropped and reported to the observer.
    DropNewest,
}

/// Worker pool settings for asynchronous dispatchers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of worker threads.
    pub pool_size: usize,
    /// Maximum number of queued plus running deliveries.
    pub queue_capacity: usize,
    pub backpressure: Backpressure,
    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            queue_capacity: 1024,
            backpressure: Backpressure::Block,
            thread_name: "xal-dispatch".to_string(),
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.pool_size == 0 {
            return Err(DispatchError::InvalidConfig {
                message: "pool_size must be at least 1".to_string(),
            });
        }
        if self.queue_capacity == 0 || self.queue_capacity > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(DispatchError::InvalidConfig {
                message: format!("queue_capacity {} is out of range", self.queue_capacity),
            });
        }
        Ok(())
    }
}
