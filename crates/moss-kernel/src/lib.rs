//! Moss Kernel
//!
//! Runtime wrapper around the `moss-kernel-core` pools:
//! - HAL integration (debug output, timestamps)
//! - Commit log of every successful mutation
//! - Process teardown (see [`lifecycle`])
//!
//! The core decides what an operation does; this crate only observes it.
//! A failed operation writes a debug line but records no commit.

#![no_std]
extern crate alloc;

pub mod commitlog;
pub mod lifecycle;

use moss_hal::HAL;
use moss_kernel_core::{
    check_all_invariants, InvariantViolation, KernelError, KernelPools, MessageId, PoolStats,
    ProcessId, Received, Selector, ThreadId, ThreadQueue, Word, MAX_MESSAGES, MAX_PROCESSES,
    MAX_THREADS,
};

pub use commitlog::{Commit, CommitLog, CommitType, MAX_COMMITS};
pub use lifecycle::Teardown;

// Re-export HAL types
pub use moss_hal::{TestHal, HAL as HalTrait};

/// The kernel: pools, HAL and commit log.
pub struct Kernel<
    H: HAL,
    const P: usize = MAX_PROCESSES,
    const T: usize = MAX_THREADS,
    const M: usize = MAX_MESSAGES,
> {
    hal: H,
    pools: KernelPools<P, T, M>,
    commitlog: CommitLog,
    boot_time: u64,
}

impl<H: HAL, const P: usize, const T: usize, const M: usize> Kernel<H, P, T, M> {
    /// Initialise the pools and start the clock
    pub fn new(hal: H) -> Self {
        let boot_time = hal.now_nanos();
        let pools = KernelPools::<P, T, M>::new();
        let config = pools.config();
        hal.debug_write(&alloc::format!(
            "[kernel] Pools ready: {} processes, {} threads, {} messages",
            config.max_processes,
            config.max_threads,
            config.max_messages
        ));
        Self {
            hal,
            pools,
            commitlog: CommitLog::new(),
            boot_time,
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Read-only view of the pools
    pub fn pools(&self) -> &KernelPools<P, T, M> {
        &self.pools
    }

    pub fn commitlog(&self) -> &CommitLog {
        &self.commitlog
    }

    /// Get uptime in nanoseconds.
    pub fn uptime_nanos(&self) -> u64 {
        self.hal.now_nanos().saturating_sub(self.boot_time)
    }

    pub fn root(&self) -> ProcessId {
        self.pools.root()
    }

    pub fn stats(&self) -> PoolStats {
        self.pools.stats()
    }

    /// Run the invariant checker over the current pools
    pub fn check_invariants(&self) -> alloc::vec::Vec<InvariantViolation> {
        check_all_invariants(&self.pools)
    }

    fn record(&mut self, commit_type: CommitType) {
        let timestamp = self.uptime_nanos();
        self.commitlog.append(commit_type, timestamp);
    }

    fn report_failure(&self, op: &str, err: KernelError) {
        self.hal
            .debug_write(&alloc::format!("[kernel] {} failed: {}", op, err));
    }

    // ========================================================================
    // Processes
    // ========================================================================

    /// Allocate a child of `parent`
    pub fn proc_alloc(&mut self, parent: ProcessId) -> Result<ProcessId, KernelError> {
        match self.pools.proc_alloc(parent) {
            Ok(pid) => {
                self.hal.debug_write(&alloc::format!(
                    "[kernel] Created process {} (parent {})",
                    pid,
                    parent
                ));
                self.record(CommitType::ProcessCreated { pid, parent });
                Ok(pid)
            }
            Err(e) => {
                self.report_failure("proc_alloc", e);
                Err(e)
            }
        }
    }

    /// Delete a childless, threadless, non-root process
    pub fn proc_delete(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        match self.pools.proc_delete(pid) {
            Ok(()) => {
                self.hal
                    .debug_write(&alloc::format!("[kernel] Deleted process {}", pid));
                self.record(CommitType::ProcessDeleted { pid });
                Ok(())
            }
            Err(e) => {
                self.report_failure("proc_delete", e);
                Err(e)
            }
        }
    }

    pub fn proc_first_child(&self, pid: ProcessId) -> Option<ProcessId> {
        self.pools.proc_first_child(pid)
    }

    pub fn proc_first_thread(&self, pid: ProcessId) -> Option<ThreadId> {
        self.pools.proc_first_thread(pid)
    }

    // ========================================================================
    // Threads
    // ========================================================================

    /// Allocate a thread owned by `process`
    pub fn thread_alloc(&mut self, process: ProcessId) -> Result<ThreadId, KernelError> {
        match self.pools.thread_alloc(process) {
            Ok(tid) => {
                self.hal.debug_write(&alloc::format!(
                    "[kernel] Created thread {} in process {}",
                    tid,
                    process
                ));
                self.record(CommitType::ThreadCreated { tid, process });
                Ok(tid)
            }
            Err(e) => {
                self.report_failure("thread_alloc", e);
                Err(e)
            }
        }
    }

    /// Free an unqueued thread with an empty mailbox
    pub fn thread_free(&mut self, tid: ThreadId) -> Result<(), KernelError> {
        match self.pools.thread_free(tid) {
            Ok(()) => {
                self.hal
                    .debug_write(&alloc::format!("[kernel] Freed thread {}", tid));
                self.record(CommitType::ThreadFreed { tid });
                Ok(())
            }
            Err(e) => {
                self.report_failure("thread_free", e);
                Err(e)
            }
        }
    }

    pub fn new_queue(&mut self) -> ThreadQueue {
        self.pools.new_queue()
    }

    /// Push `tid` onto `queue`; a free slot is ignored
    pub fn thread_enqueue(
        &mut self,
        tid: ThreadId,
        queue: &mut ThreadQueue,
    ) -> Result<(), KernelError> {
        let live = self.pools.threads.is_live(tid);
        match self.pools.thread_enqueue(tid, queue) {
            Ok(()) if live => {
                self.record(CommitType::ThreadEnqueued {
                    tid,
                    queue: queue.id(),
                });
                Ok(())
            }
            Ok(()) => Ok(()),
            Err(e) => {
                self.report_failure("thread_enqueue", e);
                Err(e)
            }
        }
    }

    pub fn thread_queue_head(&self, queue: &ThreadQueue) -> Option<ThreadId> {
        self.pools.thread_queue_head(queue)
    }

    /// Pop the most recently enqueued thread
    pub fn thread_dequeue(&mut self, queue: &mut ThreadQueue) -> Option<ThreadId> {
        let tid = self.pools.thread_dequeue(queue)?;
        self.record(CommitType::ThreadDequeued {
            tid,
            queue: queue.id(),
        });
        Some(tid)
    }

    /// Pull `tid` out of `queue` wherever it sits
    pub fn thread_remove_from_queue(
        &mut self,
        tid: ThreadId,
        queue: &mut ThreadQueue,
    ) -> Result<(), KernelError> {
        match self.pools.thread_remove_from_queue(tid, queue) {
            Ok(()) => {
                self.record(CommitType::ThreadDequeued {
                    tid,
                    queue: queue.id(),
                });
                Ok(())
            }
            Err(e) => {
                self.report_failure("thread_remove_from_queue", e);
                Err(e)
            }
        }
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Queue `value` in `destination`'s mailbox
    pub fn msg_send(
        &mut self,
        sender: ThreadId,
        destination: ThreadId,
        value: Word,
    ) -> Result<MessageId, KernelError> {
        match self.pools.msg_send(sender, destination, value) {
            Ok(msg) => {
                self.record(CommitType::MessageSent {
                    msg,
                    from: sender,
                    to: destination,
                    value,
                });
                Ok(msg)
            }
            Err(e) => {
                self.report_failure("msg_send", e);
                Err(e)
            }
        }
    }

    /// Take one message out of `destination`'s mailbox.
    ///
    /// An empty mailbox is an ordinary outcome for a polling receiver, so
    /// `NotFound` is not logged.
    pub fn msg_receive(
        &mut self,
        selector: Selector,
        destination: ThreadId,
    ) -> Result<Received, KernelError> {
        let result = self.pools.msg_receive(selector, destination);
        self.observe_receive(destination, result)
    }

    /// Receive through an optional sender slot.
    ///
    /// Same three modes as `MessagePool::receive_into`.
    pub fn msg_receive_into(
        &mut self,
        sender: Option<&mut Option<ThreadId>>,
        destination: ThreadId,
    ) -> Result<Word, KernelError> {
        let result = self.pools.msg_receive_slot(sender, destination);
        self.observe_receive(destination, result).map(|r| r.value)
    }

    fn observe_receive(
        &mut self,
        destination: ThreadId,
        result: Result<Received, KernelError>,
    ) -> Result<Received, KernelError> {
        match result {
            Ok(received) => {
                self.record(CommitType::MessageReceived {
                    from: received.sender,
                    to: destination,
                    value: received.value,
                });
                Ok(received)
            }
            Err(KernelError::NotFound) => Err(KernelError::NotFound),
            Err(e) => {
                self.report_failure("msg_receive", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moss_kernel_core::Precondition;

    type SmallKernel = Kernel<TestHal, 4, 4, 4>;

    #[test]
    fn test_new_kernel() {
        let kernel = SmallKernel::new(TestHal::new());
        assert!(kernel.commitlog().is_empty());
        assert_eq!(kernel.stats().live_processes, 1);
        assert_eq!(kernel.uptime_nanos(), 0);
    }

    #[test]
    fn test_mutations_are_recorded() {
        let mut kernel = SmallKernel::new(TestHal::new());
        let root = kernel.root();
        let p = kernel.proc_alloc(root).unwrap();
        kernel.hal().advance(50);
        let t = kernel.thread_alloc(p).unwrap();

        let commits = kernel.commitlog().commits();
        assert_eq!(commits.len(), 2);
        assert_eq!(
            commits[0].commit_type,
            CommitType::ProcessCreated { pid: p, parent: root }
        );
        assert_eq!(commits[1].commit_type, CommitType::ThreadCreated { tid: t, process: p });
        assert_eq!(commits[1].timestamp, 50);
    }

    #[test]
    fn test_failures_leave_no_commit() {
        let mut kernel = SmallKernel::new(TestHal::new());
        let root = kernel.root();

        assert_eq!(
            kernel.proc_delete(root),
            Err(KernelError::PreconditionFailed(Precondition::IsRoot))
        );
        assert!(kernel.commitlog().is_empty());
    }

    #[test]
    fn test_enqueue_of_free_slot_records_nothing() {
        let mut kernel = SmallKernel::new(TestHal::new());
        let root = kernel.root();
        let t = kernel.thread_alloc(root).unwrap();
        kernel.thread_free(t).unwrap();
        let before = kernel.commitlog().len();

        let mut ready = kernel.new_queue();
        assert_eq!(kernel.thread_enqueue(t, &mut ready), Ok(()));
        assert!(ready.is_empty());
        assert_eq!(kernel.commitlog().len(), before);
    }

    #[test]
    fn test_receive_into_fills_sender() {
        let mut kernel = SmallKernel::new(TestHal::new());
        let root = kernel.root();
        let a = kernel.thread_alloc(root).unwrap();
        let b = kernel.thread_alloc(root).unwrap();
        kernel.msg_send(a, b, 3).unwrap();
        kernel.msg_send(b, b, 4).unwrap();

        let mut from = Some(b);
        assert_eq!(kernel.msg_receive_into(Some(&mut from), b), Ok(4));
        assert_eq!(from, Some(b));

        let mut from = None;
        assert_eq!(kernel.msg_receive_into(Some(&mut from), b), Ok(3));
        assert_eq!(from, Some(a));

        assert_eq!(kernel.msg_receive_into(None, b), Err(KernelError::NotFound));
    }

    #[test]
    fn test_receive_into_records_commit() {
        let mut kernel = SmallKernel::new(TestHal::new());
        let root = kernel.root();
        let a = kernel.thread_alloc(root).unwrap();
        let b = kernel.thread_alloc(root).unwrap();
        kernel.msg_send(a, b, 8).unwrap();

        let mut from = None;
        assert_eq!(kernel.msg_receive_into(Some(&mut from), b), Ok(8));
        assert_eq!(
            kernel.commitlog().get_recent(1)[0].commit_type,
            CommitType::MessageReceived {
                from: a,
                to: b,
                value: 8
            }
        );
    }

    #[test]
    fn test_foreign_queue_is_reported() {
        let mut kernel = SmallKernel::new(TestHal::new());
        let mut other = SmallKernel::new(TestHal::new());
        let root = kernel.root();
        let t = kernel.thread_alloc(root).unwrap();
        let mut foreign = other.new_queue();
        let before = kernel.commitlog().len();

        assert_eq!(
            kernel.thread_enqueue(t, &mut foreign),
            Err(KernelError::InvalidArgument)
        );
        assert_eq!(kernel.pools().threads.queue_of(t), None);
        assert_eq!(kernel.commitlog().len(), before);
    }
}
