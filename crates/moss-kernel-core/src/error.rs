//! Kernel pool errors
//!
//! Every failure is local and recoverable, and a failing operation leaves all
//! pools untouched.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::list::ListError;
use crate::types::PoolKind;

/// Structural condition that blocked an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// The root process cannot be deleted
    IsRoot,
    /// Process still has children
    HasChildren,
    /// Process still owns threads
    HasThreads,
    /// Thread mailbox still holds messages
    MailboxNotEmpty,
    /// Thread is still linked into a scheduling queue
    ThreadQueued,
    /// Thread is already linked into a scheduling queue
    AlreadyQueued,
    /// Thread is not a member of the given queue
    NotQueued,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Precondition::IsRoot => "root process",
            Precondition::HasChildren => "process has children",
            Precondition::HasThreads => "process has threads",
            Precondition::MailboxNotEmpty => "mailbox not empty",
            Precondition::ThreadQueued => "thread still queued",
            Precondition::AlreadyQueued => "thread already queued",
            Precondition::NotQueued => "thread not in queue",
        };
        f.write_str(what)
    }
}

/// Kernel pool errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelError {
    /// A required handle is out of range or names a free slot
    InvalidArgument,
    /// No free slot left in the named arena
    PoolExhausted(PoolKind),
    /// A structural constraint blocks the operation
    PreconditionFailed(Precondition),
    /// No message matched the receive request
    NotFound,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidArgument => f.write_str("invalid argument"),
            KernelError::PoolExhausted(pool) => write!(f, "{} pool exhausted", pool),
            KernelError::PreconditionFailed(why) => write!(f, "precondition failed: {}", why),
            KernelError::NotFound => f.write_str("no matching message"),
        }
    }
}

impl From<ListError> for KernelError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::OutOfRange => KernelError::InvalidArgument,
            ListError::AlreadyLinked => {
                KernelError::PreconditionFailed(Precondition::AlreadyQueued)
            }
            ListError::NotMember => KernelError::PreconditionFailed(Precondition::NotQueued),
        }
    }
}
