//! Core kernel types
//!
//! Handles into the three arenas plus the small enums shared by every pool.
//! A handle is a slot index; it carries no generation, so a handle to a freed
//! slot names whatever record is allocated there next.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Machine-word message payload
pub type Word = usize;

/// Process identifier (process pool slot index)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

/// Thread identifier (thread pool slot index)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u32);

/// Message identifier (message pool slot index)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u32);

/// Scheduling queue identifier, minted by `ThreadPool::new_queue`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueId(pub u32);

macro_rules! slot_handle {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Slot index in the backing arena
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub(crate) const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

slot_handle!(ProcessId, "P");
slot_handle!(ThreadId, "T");
slot_handle!(MessageId, "M");

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

/// The arena a record belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolKind {
    /// Process records
    Process,
    /// Thread records
    Thread,
    /// Message records
    Message,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::Process => "process",
            PoolKind::Thread => "thread",
            PoolKind::Message => "message",
        };
        f.write_str(name)
    }
}

/// Identifies the list currently holding a link.
///
/// Each link table threads exactly one family of lists, so `Free` is never
/// ambiguous: it names the free pool of the arena the link belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKey {
    /// The owning arena's free pool
    Free,
    /// Child list of a process (process sibling links)
    Children(ProcessId),
    /// Thread list of a process (thread links)
    Threads(ProcessId),
    /// An external scheduling queue (thread scheduling links)
    Queue(QueueId),
    /// Inbound mailbox of a thread (message links)
    Mailbox(ThreadId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_handle_index_roundtrip() {
        assert_eq!(ProcessId::from_index(7).index(), 7);
        assert_eq!(ThreadId(3).index(), 3);
        assert_eq!(MessageId(0).index(), 0);
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(ProcessId(1).to_string(), "P1");
        assert_eq!(ThreadId(12).to_string(), "T12");
        assert_eq!(MessageId(5).to_string(), "M5");
        assert_eq!(QueueId(2).to_string(), "Q2");
    }

    #[test]
    fn test_process_id_ordering() {
        assert!(ProcessId(1) < ProcessId(2));
        assert_eq!(ProcessId(2), ProcessId(2));
    }

    #[test]
    fn test_list_keys_distinguish_owners() {
        assert_ne!(ListKey::Children(ProcessId(1)), ListKey::Threads(ProcessId(1)));
        assert_ne!(ListKey::Mailbox(ThreadId(1)), ListKey::Mailbox(ThreadId(2)));
        assert_eq!(ListKey::Queue(QueueId(4)), ListKey::Queue(QueueId(4)));
    }
}
