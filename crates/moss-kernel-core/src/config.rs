//! Pool capacity configuration
//!
//! Capacities are fixed at build time. The constants below are the defaults
//! used by [`DefaultKernelPools`](crate::state::DefaultKernelPools); any other
//! capacities can be chosen through the const parameters of
//! [`KernelPools`](crate::state::KernelPools).

use serde::{Deserialize, Serialize};

/// Maximum number of processes, including the root process
pub const MAX_PROCESSES: usize = 20;

/// Maximum number of threads across all processes
pub const MAX_THREADS: usize = 40;

/// Maximum number of in-flight messages across all mailboxes
pub const MAX_MESSAGES: usize = 128;

/// Capacities of a pools instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Process pool capacity (root included)
    pub max_processes: usize,
    /// Thread pool capacity
    pub max_threads: usize,
    /// Message pool capacity
    pub max_messages: usize,
}

impl PoolConfig {
    /// Capacities described by the build-time constants
    pub const fn defaults() -> Self {
        Self {
            max_processes: MAX_PROCESSES,
            max_threads: MAX_THREADS,
            max_messages: MAX_MESSAGES,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
