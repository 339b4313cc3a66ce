//! Commit log
//!
//! Records every successful pool mutation, in order. Failed operations
//! change nothing and leave no commit. Commits are append-only with monotonic
//! sequence numbers; the oldest entries are dropped once the log is full.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use moss_kernel_core::{MessageId, ProcessId, QueueId, ThreadId, Word};

/// Maximum number of commits to keep in memory
pub const MAX_COMMITS: usize = 10000;

/// A recorded state mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Sequence number (monotonic, never reused after trimming)
    pub seq: u64,
    /// Timestamp (nanos since boot)
    pub timestamp: u64,
    /// What changed
    pub commit_type: CommitType,
}

/// Kind of mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitType {
    /// Process allocated under `parent`
    ProcessCreated { pid: ProcessId, parent: ProcessId },
    /// Process returned to the free pool
    ProcessDeleted { pid: ProcessId },
    /// Thread allocated for `process`
    ThreadCreated { tid: ThreadId, process: ProcessId },
    /// Thread returned to the free pool
    ThreadFreed { tid: ThreadId },
    /// Thread pushed onto a scheduling queue
    ThreadEnqueued { tid: ThreadId, queue: QueueId },
    /// Thread taken off a scheduling queue
    ThreadDequeued { tid: ThreadId, queue: QueueId },
    /// Message queued in `to`'s mailbox
    MessageSent {
        msg: MessageId,
        from: ThreadId,
        to: ThreadId,
        value: Word,
    },
    /// Message removed from `to`'s mailbox
    MessageReceived {
        from: ThreadId,
        to: ThreadId,
        value: Word,
    },
}

/// In-memory commit log.
pub struct CommitLog {
    /// Commit entries (append-only)
    commits: Vec<Commit>,
    /// Next sequence number to assign
    next_seq: u64,
}

impl CommitLog {
    /// Create a new empty CommitLog.
    pub fn new() -> Self {
        Self {
            commits: Vec::new(),
            next_seq: 0,
        }
    }

    /// Append a commit, returning its sequence number.
    pub fn append(&mut self, commit_type: CommitType, timestamp: u64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.commits.push(Commit {
            seq,
            timestamp,
            commit_type,
        });

        self.trim_if_needed();
        seq
    }

    /// Get all retained commits, oldest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Get the most recent N commits, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<&Commit> {
        self.commits.iter().rev().take(count).collect()
    }

    /// Get commits with `start <= seq < end`.
    pub fn get_range(&self, start: u64, end: u64) -> Vec<&Commit> {
        self.commits
            .iter()
            .filter(|c| c.seq >= start && c.seq < end)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Sequence number the next commit will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    fn trim_if_needed(&mut self) {
        if self.commits.len() > MAX_COMMITS {
            let drain_count = self.commits.len() - MAX_COMMITS;
            self.commits.drain(0..drain_count);
        }
    }
}

impl Default for CommitLog {
    fn default() -> Self {
        Self::new()
    }
}
