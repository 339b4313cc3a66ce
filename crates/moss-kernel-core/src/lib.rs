//! Moss Kernel Core - Fixed-Capacity Process, Thread and Message Pools
//!
//! This crate holds the **pure, HAL-free** bookkeeping layer of the Moss
//! kernel: three statically sized arenas, the process tree, the scheduler's
//! thread queues and the per-thread mailboxes.
//!
//! # Design Principles
//!
//! 1. **No heap in the pools**: every record lives in a `[T; N]` array sized
//!    at compile time; `alloc` is only used by the invariant checker
//! 2. **No HAL dependency**: logging and timing live in `moss-kernel`
//! 3. **Checked membership**: each intrusive link is tagged with the list that
//!    owns it, so a slot can never sit in two lists of the same family
//! 4. **Failed operations change nothing**
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    moss-kernel-core                         │
//! │                                                             │
//! │   ┌───────────────┐    ┌───────────────┐                   │
//! │   │  KernelPools  │    │  LinkTable    │                   │
//! │   │  - processes  │───▶│  index-linked │                   │
//! │   │  - threads    │    │  lists with   │                   │
//! │   │  - messages   │    │  owner tags   │                   │
//! │   └───────────────┘    └───────────────┘                   │
//! │                                                             │
//! │   ┌───────────────┐    ┌───────────────┐                   │
//! │   │  ThreadQueue  │    │  Invariants   │                   │
//! │   │  LIFO ready / │    │  Assertions   │                   │
//! │   │  wait queues  │    └───────────────┘                   │
//! │   └───────────────┘                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              │ used by
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      moss-kernel                            │
//! │                                                             │
//! │   - HAL integration (debug output, timing)                  │
//! │   - CommitLog recording                                     │
//! │   - Subtree teardown                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - Handles (ProcessId, ThreadId, ...) and list owner keys
//! - `config` - Pool capacities
//! - `error` - KernelError and precondition reasons
//! - `list` - Intrusive doubly linked lists over slot indices
//! - `process` - Process arena and tree
//! - `thread` - Thread arena, ownership and scheduling queues
//! - `message` - Message arena and mailboxes with selective receive
//! - `state` - KernelPools context owning all three arenas
//! - `invariants` - Structural invariant assertions

#![no_std]
extern crate alloc;

pub mod config;
pub mod error;
pub mod invariants;
pub mod list;
pub mod message;
pub mod process;
pub mod state;
pub mod thread;
pub mod types;

pub use config::{PoolConfig, MAX_MESSAGES, MAX_PROCESSES, MAX_THREADS};
pub use error::{KernelError, Precondition};
pub use invariants::{
    assert_invariants, check_all_invariants, check_structural_invariants, InvariantViolation,
};
pub use list::{Link, LinkTable, List, ListError};
pub use message::{MessagePool, Received, Selector};
pub use process::{ProcessPool, ROOT};
pub use state::{DefaultKernelPools, KernelPools, PoolStats};
pub use thread::{ThreadPool, ThreadQueue};
pub use types::{ListKey, MessageId, PoolKind, ProcessId, QueueId, ThreadId, Word};
