//! Process teardown
//!
//! The pools only delete leaves: a process with children or threads, a thread
//! with mail or sitting in a queue, are all refused. `terminate_process`
//! reaps a whole subtree by doing the work in the order the pools accept it:
//! drain each mailbox, pull the thread off its scheduling queue, free it, and
//! delete processes from the leaves up.

use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use moss_hal::HAL;
use moss_kernel_core::{KernelError, Precondition, ProcessId, Selector, ThreadId, ThreadQueue};

use crate::Kernel;

/// What a teardown reclaimed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teardown {
    /// Processes deleted, the target included
    pub processes: usize,
    /// Threads freed
    pub threads: usize,
    /// Undelivered messages discarded
    pub messages: usize,
}

impl<H: HAL, const P: usize, const T: usize, const M: usize> Kernel<H, P, T, M> {
    /// Tear down `pid` and all of its descendants.
    ///
    /// `queues` must contain every scheduling queue that holds a thread of the
    /// subtree. The subtree is checked before anything is touched, so an
    /// error leaves every pool as it was.
    ///
    /// Messages the subtree's threads sent elsewhere stay queued; their
    /// sender handle then names a free slot.
    pub fn terminate_process(
        &mut self,
        pid: ProcessId,
        queues: &mut [&mut ThreadQueue],
    ) -> Result<Teardown, KernelError> {
        if !self.pools.processes.is_live(pid) {
            return Err(KernelError::InvalidArgument);
        }
        if pid == self.pools.root() {
            return Err(KernelError::PreconditionFailed(Precondition::IsRoot));
        }

        // Descendants come after their ancestors
        let mut subtree = vec![pid];
        let mut next = 0;
        while let Some(&p) = subtree.get(next) {
            subtree.extend(self.pools.processes.children(p));
            next += 1;
        }

        let mut plan: Vec<(ThreadId, Option<usize>)> = Vec::new();
        for &p in &subtree {
            for tid in self.pools.threads.threads_of(&self.pools.processes, p) {
                let queue = match self.pools.threads.queue_of(tid) {
                    None => None,
                    Some(id) => Some(
                        queues
                            .iter()
                            .position(|q| q.id() == id)
                            .ok_or(KernelError::PreconditionFailed(Precondition::ThreadQueued))?,
                    ),
                };
                plan.push((tid, queue));
            }
        }

        let mut summary = Teardown::default();
        for (tid, queue) in plan {
            while self.msg_receive(Selector::Any, tid).is_ok() {
                summary.messages += 1;
            }
            if let Some(q) = queue {
                self.thread_remove_from_queue(tid, &mut *queues[q])?;
            }
            self.thread_free(tid)?;
            summary.threads += 1;
        }
        for &p in subtree.iter().rev() {
            self.proc_delete(p)?;
            summary.processes += 1;
        }

        self.hal.debug_write(&alloc::format!(
            "[kernel] Terminated process {}: {} processes, {} threads, {} messages reclaimed",
            pid,
            summary.processes,
            summary.threads,
            summary.messages
        ));
        Ok(summary)
    }
}
