//! Process pool and process tree
//!
//! Slot 0 holds the permanent root process. Every other slot starts in the
//! free pool. A process's sibling link threads it either into its parent's
//! child list or into the free pool, never both.

use crate::error::{KernelError, Precondition};
use crate::list::{LinkTable, List};
use crate::types::{ListKey, PoolKind, ProcessId, ThreadId};

/// Identity of the root process
pub const ROOT: ProcessId = ProcessId(0);

/// A process slot
#[derive(Clone, Copy, Debug)]
struct ProcessRecord {
    parent: Option<ProcessId>,
    children: List<ListKey>,
    threads: List<ListKey>,
    live: bool,
}

impl ProcessRecord {
    fn vacant(pid: ProcessId) -> Self {
        Self {
            parent: None,
            children: List::new(ListKey::Children(pid)),
            threads: List::new(ListKey::Threads(pid)),
            live: false,
        }
    }
}

/// Fixed-capacity process arena plus the process tree.
pub struct ProcessPool<const P: usize> {
    records: [ProcessRecord; P],
    siblings: LinkTable<ListKey, P>,
    free: List<ListKey>,
}

impl<const P: usize> ProcessPool<P> {
    const HAS_ROOT: () = assert!(P >= 1, "process pool needs a slot for the root");

    /// Build the root process and put every other slot in the free pool
    pub fn new() -> Self {
        let () = Self::HAS_ROOT;

        let mut records: [ProcessRecord; P] =
            core::array::from_fn(|i| ProcessRecord::vacant(ProcessId::from_index(i)));
        records[ROOT.index()].live = true;

        let mut siblings = LinkTable::new();
        let mut free = List::new(ListKey::Free);
        for slot in 1..P {
            let linked = siblings.insert_tail(&mut free, slot);
            debug_assert!(linked.is_ok());
        }

        Self {
            records,
            siblings,
            free,
        }
    }

    /// The root process
    pub fn root(&self) -> ProcessId {
        ROOT
    }

    fn live_index(&self, pid: ProcessId) -> Option<usize> {
        let i = pid.index();
        self.records.get(i).filter(|r| r.live).map(|_| i)
    }

    /// True if `pid` names an allocated process
    pub fn is_live(&self, pid: ProcessId) -> bool {
        self.live_index(pid).is_some()
    }

    /// Allocate a new process as a child of `parent`
    pub fn alloc(&mut self, parent: ProcessId) -> Result<ProcessId, KernelError> {
        let parent_idx = self.live_index(parent).ok_or(KernelError::InvalidArgument)?;
        let slot = self
            .free
            .head()
            .ok_or(KernelError::PoolExhausted(PoolKind::Process))?;

        self.siblings.remove(&mut self.free, slot)?;

        let pid = ProcessId::from_index(slot);
        self.records[slot] = ProcessRecord {
            parent: Some(parent),
            live: true,
            ..ProcessRecord::vacant(pid)
        };
        self.siblings
            .insert_head(&mut self.records[parent_idx].children, slot)?;

        Ok(pid)
    }

    /// Delete a childless, threadless, non-root process.
    ///
    /// A failed delete leaves the tree untouched.
    pub fn delete(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let idx = self.live_index(pid).ok_or(KernelError::InvalidArgument)?;
        let record = &self.records[idx];

        let parent = record
            .parent
            .ok_or(KernelError::PreconditionFailed(Precondition::IsRoot))?;
        if !record.children.is_empty() {
            return Err(KernelError::PreconditionFailed(Precondition::HasChildren));
        }
        if !record.threads.is_empty() {
            return Err(KernelError::PreconditionFailed(Precondition::HasThreads));
        }

        self.siblings
            .remove(&mut self.records[parent.index()].children, idx)?;
        self.records[idx] = ProcessRecord::vacant(pid);
        self.siblings.insert_head(&mut self.free, idx)?;
        Ok(())
    }

    /// Most recently inserted child of `pid`
    pub fn first_child(&self, pid: ProcessId) -> Option<ProcessId> {
        let idx = self.live_index(pid)?;
        self.records[idx].children.head().map(ProcessId::from_index)
    }

    /// Most recently allocated thread of `pid`
    pub fn first_thread(&self, pid: ProcessId) -> Option<ThreadId> {
        let idx = self.live_index(pid)?;
        self.records[idx].threads.head().map(ThreadId::from_index)
    }

    /// Parent of `pid`; `None` for the root or a free slot
    pub fn parent(&self, pid: ProcessId) -> Option<ProcessId> {
        let idx = self.live_index(pid)?;
        self.records[idx].parent
    }

    /// Children of `pid`, most recent first
    pub fn children(&self, pid: ProcessId) -> impl Iterator<Item = ProcessId> + '_ {
        self.live_index(pid)
            .map(|idx| self.siblings.iter(&self.records[idx].children))
            .into_iter()
            .flatten()
            .map(ProcessId::from_index)
    }

    /// Every allocated process, in slot order
    pub fn live(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.live)
            .map(|(i, _)| ProcessId::from_index(i))
    }

    /// Pool capacity, root included
    pub const fn capacity(&self) -> usize {
        P
    }

    /// Number of allocated processes, root included
    pub fn live_count(&self) -> usize {
        P - self.free.len()
    }

    /// Number of free slots
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    // ========================================================================
    // Crate-internal access for the thread pool and invariant checks
    // ========================================================================

    pub(crate) fn threads(&self, pid: ProcessId) -> Option<&List<ListKey>> {
        let idx = self.live_index(pid)?;
        Some(&self.records[idx].threads)
    }

    pub(crate) fn threads_mut(&mut self, pid: ProcessId) -> Option<&mut List<ListKey>> {
        let idx = self.live_index(pid)?;
        Some(&mut self.records[idx].threads)
    }

    pub(crate) fn sibling_owner(&self, slot: usize) -> Option<ListKey> {
        self.siblings.owner(slot)
    }

    pub(crate) fn free_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.siblings.iter(&self.free)
    }
}

impl<const P: usize> Default for ProcessPool<P> {
    fn default() -> Self {
        Self::new()
    }
}
