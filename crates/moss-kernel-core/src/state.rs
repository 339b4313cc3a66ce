//! Kernel pools - the explicit context owning all three arenas
//!
//! `KernelPools` replaces process-wide arrays: the scheduler and the IPC layer
//! hold one instance and call into it. Independent instances can coexist,
//! which tests rely on. Constructing an instance runs the three pool
//! initialisations, so no operation can observe an uninitialised pool.

use serde::{Deserialize, Serialize};

use crate::config::{PoolConfig, MAX_MESSAGES, MAX_PROCESSES, MAX_THREADS};
use crate::error::KernelError;
use crate::message::{MessagePool, Received, Selector};
use crate::process::ProcessPool;
use crate::thread::{ThreadPool, ThreadQueue};
use crate::types::{MessageId, ProcessId, ThreadId, Word};

/// Pools sized by the build-time constants
pub type DefaultKernelPools = KernelPools<MAX_PROCESSES, MAX_THREADS, MAX_MESSAGES>;

/// Occupancy snapshot across the three pools
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Allocated processes, root included
    pub live_processes: usize,
    /// Allocated threads
    pub live_threads: usize,
    /// Messages sitting in mailboxes
    pub live_messages: usize,
    /// Free process slots
    pub free_processes: usize,
    /// Free thread slots
    pub free_threads: usize,
    /// Free message slots
    pub free_messages: usize,
}

/// The process, thread and message arenas.
pub struct KernelPools<
    const P: usize = MAX_PROCESSES,
    const T: usize = MAX_THREADS,
    const M: usize = MAX_MESSAGES,
> {
    /// Process arena and tree
    pub processes: ProcessPool<P>,
    /// Thread arena and scheduling links
    pub threads: ThreadPool<T>,
    /// Message arena
    pub messages: MessagePool<M>,
}

impl<const P: usize, const T: usize, const M: usize> KernelPools<P, T, M> {
    /// Initialise all three pools
    pub fn new() -> Self {
        Self {
            processes: ProcessPool::new(),
            threads: ThreadPool::new(),
            messages: MessagePool::new(),
        }
    }

    /// Capacities of this instance
    pub const fn config(&self) -> PoolConfig {
        PoolConfig {
            max_processes: self.processes.capacity(),
            max_threads: self.threads.capacity(),
            max_messages: self.messages.capacity(),
        }
    }

    /// The root process
    pub fn root(&self) -> ProcessId {
        self.processes.root()
    }

    /// Occupancy of every pool
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live_processes: self.processes.live_count(),
            live_threads: self.threads.live_count(),
            live_messages: self.messages.live_count(),
            free_processes: self.processes.free_count(),
            free_threads: self.threads.free_count(),
            free_messages: self.messages.free_count(),
        }
    }

    // ========================================================================
    // Processes
    // ========================================================================

    /// Allocate a child of `parent`
    pub fn proc_alloc(&mut self, parent: ProcessId) -> Result<ProcessId, KernelError> {
        self.processes.alloc(parent)
    }

    /// Delete a childless, threadless, non-root process
    pub fn proc_delete(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        self.processes.delete(pid)
    }

    /// Most recently inserted child
    pub fn proc_first_child(&self, pid: ProcessId) -> Option<ProcessId> {
        self.processes.first_child(pid)
    }

    /// Most recently allocated thread
    pub fn proc_first_thread(&self, pid: ProcessId) -> Option<ThreadId> {
        self.processes.first_thread(pid)
    }

    // ========================================================================
    // Threads
    // ========================================================================

    pub fn thread_alloc(&mut self, process: ProcessId) -> Result<ThreadId, KernelError> {
        self.threads.alloc(&mut self.processes, process)
    }

    pub fn thread_free(&mut self, tid: ThreadId) -> Result<(), KernelError> {
        self.threads.free(&mut self.processes, tid)
    }

    pub fn new_queue(&mut self) -> ThreadQueue {
        self.threads.new_queue()
    }

    pub fn thread_enqueue(
        &mut self,
        tid: ThreadId,
        queue: &mut ThreadQueue,
    ) -> Result<(), KernelError> {
        self.threads.enqueue(tid, queue)
    }

    pub fn thread_queue_head(&self, queue: &ThreadQueue) -> Option<ThreadId> {
        self.threads.queue_head(queue)
    }

    pub fn thread_dequeue(&mut self, queue: &mut ThreadQueue) -> Option<ThreadId> {
        self.threads.dequeue(queue)
    }

    pub fn thread_remove_from_queue(
        &mut self,
        tid: ThreadId,
        queue: &mut ThreadQueue,
    ) -> Result<(), KernelError> {
        self.threads.remove_from_queue(tid, queue)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn msg_send(
        &mut self,
        sender: ThreadId,
        destination: ThreadId,
        value: Word,
    ) -> Result<MessageId, KernelError> {
        self.messages
            .send(&mut self.threads, sender, destination, value)
    }

    pub fn msg_receive(
        &mut self,
        selector: Selector,
        destination: ThreadId,
    ) -> Result<Received, KernelError> {
        self.messages
            .receive(&mut self.threads, selector, destination)
    }

    /// Receive through an optional sender slot (see [`MessagePool::receive_into`])
    pub fn msg_receive_into(
        &mut self,
        sender: Option<&mut Option<ThreadId>>,
        destination: ThreadId,
    ) -> Result<Word, KernelError> {
        self.messages
            .receive_into(&mut self.threads, sender, destination)
    }

    /// Like `msg_receive_into`, but hands back the whole message
    pub fn msg_receive_slot(
        &mut self,
        sender: Option<&mut Option<ThreadId>>,
        destination: ThreadId,
    ) -> Result<Received, KernelError> {
        self.messages
            .receive_slot(&mut self.threads, sender, destination)
    }
}

impl<const P: usize, const T: usize, const M: usize> Default for KernelPools<P, T, M> {
    fn default() -> Self {
        Self::new()
    }
}
