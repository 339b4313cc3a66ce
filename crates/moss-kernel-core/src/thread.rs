//! Thread pool and scheduling linkage
//!
//! Each thread slot carries two links:
//!
//! - the *owner link* threads it into its process's thread list, or into the
//!   free pool while unallocated
//! - the *scheduling link* threads it into at most one [`ThreadQueue`]
//!
//! Queues are plain list heads owned by the caller (ready queue, IPC wait
//! queue, and so on). Which queue a thread sits in is scheduler policy; this
//! module only moves links.
//!
//! Queue ids are unique across every pool in the program, and each queue
//! remembers the pool that minted it. A pool refuses queues minted elsewhere.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{KernelError, Precondition};
use crate::list::{LinkTable, List};
use crate::process::ProcessPool;
use crate::types::{ListKey, PoolKind, ProcessId, QueueId, ThreadId};

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(0);
static NEXT_QUEUE_ID: AtomicU32 = AtomicU32::new(0);

/// A thread slot
#[derive(Clone, Copy, Debug)]
struct ThreadRecord {
    process: Option<ProcessId>,
    mailbox: List<ListKey>,
}

impl ThreadRecord {
    fn vacant(tid: ThreadId) -> Self {
        Self {
            process: None,
            mailbox: List::new(ListKey::Mailbox(tid)),
        }
    }
}

/// An externally owned scheduling queue.
///
/// Enqueue and dequeue both work at the head, so the queue behaves as a stack.
#[derive(Debug)]
pub struct ThreadQueue {
    id: QueueId,
    pool: u32,
    list: List<ListKey>,
}

impl ThreadQueue {
    fn new(id: QueueId, pool: u32) -> Self {
        Self {
            id,
            pool,
            list: List::new(ListKey::Queue(id)),
        }
    }

    /// Queue identity, as reported by `ThreadPool::queue_of`
    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }
}

/// Fixed-capacity thread arena.
pub struct ThreadPool<const T: usize> {
    records: [ThreadRecord; T],
    owner_links: LinkTable<ListKey, T>,
    sched_links: LinkTable<ListKey, T>,
    free: List<ListKey>,
    instance: u32,
}

impl<const T: usize> ThreadPool<T> {
    const NON_EMPTY: () = assert!(T >= 1, "thread pool needs at least one slot");

    /// Put every thread slot in the free pool
    pub fn new() -> Self {
        let () = Self::NON_EMPTY;

        let records = core::array::from_fn(|i| ThreadRecord::vacant(ThreadId::from_index(i)));
        let mut owner_links = LinkTable::new();
        let mut free = List::new(ListKey::Free);
        for slot in 0..T {
            let linked = owner_links.insert_tail(&mut free, slot);
            debug_assert!(linked.is_ok());
        }

        Self {
            records,
            owner_links,
            sched_links: LinkTable::new(),
            free,
            instance: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn live_index(&self, tid: ThreadId) -> Option<usize> {
        let i = tid.index();
        self.records
            .get(i)
            .filter(|r| r.process.is_some())
            .map(|_| i)
    }

    /// True if `tid` names an allocated thread
    pub fn is_live(&self, tid: ThreadId) -> bool {
        self.live_index(tid).is_some()
    }

    /// Allocate a thread owned by `process`
    pub fn alloc<const P: usize>(
        &mut self,
        processes: &mut ProcessPool<P>,
        process: ProcessId,
    ) -> Result<ThreadId, KernelError> {
        let thread_list = processes
            .threads_mut(process)
            .ok_or(KernelError::InvalidArgument)?;
        let slot = self
            .free
            .head()
            .ok_or(KernelError::PoolExhausted(PoolKind::Thread))?;

        self.owner_links.remove(&mut self.free, slot)?;

        // Free slots are never queued: `free` refuses queued threads
        let tid = ThreadId::from_index(slot);
        self.records[slot] = ThreadRecord {
            process: Some(process),
            ..ThreadRecord::vacant(tid)
        };
        self.owner_links.insert_head(thread_list, slot)?;

        Ok(tid)
    }

    /// Return a thread to the free pool.
    ///
    /// Fails without side effects if the mailbox still holds messages or the
    /// thread is still linked into a scheduling queue.
    pub fn free<const P: usize>(
        &mut self,
        processes: &mut ProcessPool<P>,
        tid: ThreadId,
    ) -> Result<(), KernelError> {
        let idx = self.live_index(tid).ok_or(KernelError::InvalidArgument)?;
        let record = &self.records[idx];

        if !record.mailbox.is_empty() {
            return Err(KernelError::PreconditionFailed(Precondition::MailboxNotEmpty));
        }
        if self.sched_links.owner(idx).is_some() {
            return Err(KernelError::PreconditionFailed(Precondition::ThreadQueued));
        }

        let thread_list = record
            .process
            .and_then(|pid| processes.threads_mut(pid))
            .ok_or(KernelError::InvalidArgument)?;

        self.owner_links.remove(thread_list, idx)?;
        self.records[idx] = ThreadRecord::vacant(tid);
        self.owner_links.insert_head(&mut self.free, idx)?;
        Ok(())
    }

    /// Owning process of `tid`
    pub fn owner(&self, tid: ThreadId) -> Option<ProcessId> {
        let idx = self.live_index(tid)?;
        self.records[idx].process
    }

    /// Threads owned by `process`, most recent first
    pub fn threads_of<'a, const P: usize>(
        &'a self,
        processes: &'a ProcessPool<P>,
        process: ProcessId,
    ) -> impl Iterator<Item = ThreadId> + 'a {
        processes
            .threads(process)
            .map(|list| self.owner_links.iter(list))
            .into_iter()
            .flatten()
            .map(ThreadId::from_index)
    }

    // ========================================================================
    // Scheduling queues
    // ========================================================================

    /// Mint a new empty scheduling queue bound to this pool
    pub fn new_queue(&mut self) -> ThreadQueue {
        let id = QueueId(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed));
        ThreadQueue::new(id, self.instance)
    }

    /// True if `queue` was minted by this pool
    pub fn owns_queue(&self, queue: &ThreadQueue) -> bool {
        queue.pool == self.instance
    }

    fn check_queue(&self, queue: &ThreadQueue) -> Result<(), KernelError> {
        if self.owns_queue(queue) {
            Ok(())
        } else {
            Err(KernelError::InvalidArgument)
        }
    }

    /// Push `tid` onto the head of `queue`.
    ///
    /// Enqueueing a free slot is a no-op. A thread already sitting in any
    /// queue is rejected; remove it from that queue first. A queue minted by
    /// another pool is an invalid argument.
    pub fn enqueue(&mut self, tid: ThreadId, queue: &mut ThreadQueue) -> Result<(), KernelError> {
        self.check_queue(queue)?;
        let Some(idx) = self.live_index(tid) else {
            return Ok(());
        };
        self.sched_links.insert_head(&mut queue.list, idx)?;
        Ok(())
    }

    /// Most recently enqueued thread, left in place
    pub fn queue_head(&self, queue: &ThreadQueue) -> Option<ThreadId> {
        self.check_queue(queue).ok()?;
        queue.list.head().map(ThreadId::from_index)
    }

    /// Remove and return the most recently enqueued thread
    pub fn dequeue(&mut self, queue: &mut ThreadQueue) -> Option<ThreadId> {
        self.check_queue(queue).ok()?;
        self.sched_links
            .pop_head(&mut queue.list)
            .map(ThreadId::from_index)
    }

    /// Pull `tid` out of `queue` wherever it sits (timeouts, cancellation)
    pub fn remove_from_queue(
        &mut self,
        tid: ThreadId,
        queue: &mut ThreadQueue,
    ) -> Result<(), KernelError> {
        self.check_queue(queue)?;
        let idx = self.live_index(tid).ok_or(KernelError::InvalidArgument)?;
        self.sched_links.remove(&mut queue.list, idx)?;
        Ok(())
    }

    /// Queue currently holding `tid`
    pub fn queue_of(&self, tid: ThreadId) -> Option<QueueId> {
        match self.sched_links.owner(tid.index()) {
            Some(ListKey::Queue(id)) => Some(id),
            _ => None,
        }
    }

    /// Members of `queue`, head first
    pub fn queued<'a>(&'a self, queue: &ThreadQueue) -> impl Iterator<Item = ThreadId> + 'a {
        let len = if self.owns_queue(queue) { queue.len() } else { 0 };
        self.sched_links
            .iter(&queue.list)
            .take(len)
            .map(ThreadId::from_index)
    }

    // ========================================================================
    // Pool statistics
    // ========================================================================

    /// Number of messages waiting in `tid`'s mailbox
    pub fn mailbox_len(&self, tid: ThreadId) -> usize {
        self.live_index(tid)
            .map(|idx| self.records[idx].mailbox.len())
            .unwrap_or(0)
    }

    /// Every allocated thread, in slot order
    pub fn live(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.process.is_some())
            .map(|(i, _)| ThreadId::from_index(i))
    }

    pub const fn capacity(&self) -> usize {
        T
    }

    pub fn live_count(&self) -> usize {
        T - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    // ========================================================================
    // Crate-internal access for the message pool and invariant checks
    // ========================================================================

    pub(crate) fn mailbox(&self, tid: ThreadId) -> Option<&List<ListKey>> {
        let idx = self.live_index(tid)?;
        Some(&self.records[idx].mailbox)
    }

    pub(crate) fn mailbox_mut(&mut self, tid: ThreadId) -> Option<&mut List<ListKey>> {
        let idx = self.live_index(tid)?;
        Some(&mut self.records[idx].mailbox)
    }

    pub(crate) fn owner_link(&self, slot: usize) -> Option<ListKey> {
        self.owner_links.owner(slot)
    }

    pub(crate) fn free_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.owner_links.iter(&self.free)
    }
}

impl<const T: usize> Default for ThreadPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
