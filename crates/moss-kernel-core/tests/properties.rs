//! Property-based tests for the kernel pools.
//!
//! Uses proptest to drive random operation sequences and verify the pools'
//! structural invariants and ordering laws.

use std::collections::VecDeque;

use moss_kernel_core::{
    check_structural_invariants, KernelError, KernelPools, PoolKind, ProcessId, Selector,
    ThreadId, ThreadQueue,
};
use proptest::prelude::*;

type Pools = KernelPools<6, 8, 8>;

/// One step of a random workload. Indices pick among currently live handles.
#[derive(Clone, Debug)]
enum Op {
    ProcAlloc(usize),
    ProcDelete(usize),
    ThreadAlloc(usize),
    ThreadFree(usize),
    Enqueue(usize, usize),
    Dequeue(usize),
    Send(usize, usize, usize),
    ReceiveAny(usize),
    ReceiveFrom(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..8).prop_map(Op::ProcAlloc),
        (0usize..8).prop_map(Op::ProcDelete),
        (0usize..8).prop_map(Op::ThreadAlloc),
        (0usize..8).prop_map(Op::ThreadFree),
        (0usize..8, 0usize..2).prop_map(|(t, q)| Op::Enqueue(t, q)),
        (0usize..2).prop_map(Op::Dequeue),
        (0usize..8, 0usize..8, 0usize..100).prop_map(|(a, b, v)| Op::Send(a, b, v)),
        (0usize..8).prop_map(Op::ReceiveAny),
        (0usize..8, 0usize..8).prop_map(|(t, s)| Op::ReceiveFrom(t, s)),
    ]
}

fn pick<T: Copy>(items: &[T], i: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[i % items.len()])
    }
}

fn apply(pools: &mut Pools, queues: &mut [ThreadQueue; 2], op: &Op) {
    let procs: Vec<ProcessId> = pools.processes.live().collect();
    let threads: Vec<ThreadId> = pools.threads.live().collect();

    match *op {
        Op::ProcAlloc(p) => {
            if let Some(parent) = pick(&procs, p) {
                let _ = pools.proc_alloc(parent);
            }
        }
        Op::ProcDelete(p) => {
            if let Some(pid) = pick(&procs, p) {
                let _ = pools.proc_delete(pid);
            }
        }
        Op::ThreadAlloc(p) => {
            if let Some(pid) = pick(&procs, p) {
                let _ = pools.thread_alloc(pid);
            }
        }
        Op::ThreadFree(t) => {
            if let Some(tid) = pick(&threads, t) {
                let _ = pools.thread_free(tid);
            }
        }
        Op::Enqueue(t, q) => {
            if let Some(tid) = pick(&threads, t) {
                let _ = pools.thread_enqueue(tid, &mut queues[q]);
            }
        }
        Op::Dequeue(q) => {
            pools.thread_dequeue(&mut queues[q]);
        }
        Op::Send(a, b, v) => {
            if let (Some(from), Some(to)) = (pick(&threads, a), pick(&threads, b)) {
                let _ = pools.msg_send(from, to, v);
            }
        }
        Op::ReceiveAny(t) => {
            if let Some(tid) = pick(&threads, t) {
                let _ = pools.msg_receive(Selector::Any, tid);
            }
        }
        Op::ReceiveFrom(t, s) => {
            if let (Some(tid), Some(from)) = (pick(&threads, t), pick(&threads, s)) {
                let _ = pools.msg_receive(Selector::From(from), tid);
            }
        }
    }
}

proptest! {
    /// Every reachable state satisfies the structural invariants
    #[test]
    fn invariants_hold_under_random_workload(ops in prop::collection::vec(op(), 0..200)) {
        let mut pools = Pools::new();
        let mut queues = [pools.new_queue(), pools.new_queue()];

        for op in &ops {
            apply(&mut pools, &mut queues, op);
            let violations = check_structural_invariants(&pools);
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", op, violations);
        }
    }

    /// live + free == capacity for every pool, at every step
    #[test]
    fn pool_conservation(ops in prop::collection::vec(op(), 0..200)) {
        let mut pools = Pools::new();
        let mut queues = [pools.new_queue(), pools.new_queue()];

        for op in &ops {
            apply(&mut pools, &mut queues, op);
            let stats = pools.stats();
            prop_assert_eq!(stats.live_processes + stats.free_processes, 6);
            prop_assert_eq!(stats.live_threads + stats.free_threads, 8);
            prop_assert_eq!(stats.live_messages + stats.free_messages, 8);
        }
    }

    /// Non-selective receives return messages in send order
    #[test]
    fn mailbox_is_fifo(values in prop::collection::vec(0usize..1000, 0..8)) {
        let mut pools = Pools::new();
        let root = pools.root();
        let a = pools.thread_alloc(root).unwrap();
        let t = pools.thread_alloc(root).unwrap();

        for &v in &values {
            pools.msg_send(a, t, v).unwrap();
        }
        for &v in &values {
            prop_assert_eq!(pools.msg_receive(Selector::Any, t).map(|r| r.value), Ok(v));
        }
        prop_assert_eq!(pools.msg_receive(Selector::Any, t), Err(KernelError::NotFound));
    }

    /// Selective receive takes the oldest message from that sender and
    /// leaves the others in order
    #[test]
    fn selective_receive_matches_model(
        sends in prop::collection::vec((any::<bool>(), 0usize..1000), 0..8),
        choices in prop::collection::vec(prop::option::of(any::<bool>()), 0..12),
    ) {
        let mut pools = Pools::new();
        let root = pools.root();
        let a = pools.thread_alloc(root).unwrap();
        let b = pools.thread_alloc(root).unwrap();
        let t = pools.thread_alloc(root).unwrap();

        let mut model: VecDeque<(ThreadId, usize)> = VecDeque::new();
        for &(from_a, v) in &sends {
            let from = if from_a { a } else { b };
            pools.msg_send(from, t, v).unwrap();
            model.push_back((from, v));
        }

        for choice in &choices {
            let selector = match choice {
                None => Selector::Any,
                Some(true) => Selector::From(a),
                Some(false) => Selector::From(b),
            };
            let expected = match selector {
                Selector::Any => model.pop_front(),
                Selector::From(s) => model
                    .iter()
                    .position(|&(from, _)| from == s)
                    .and_then(|i| model.remove(i)),
            };
            let got = pools.msg_receive(selector, t).ok().map(|r| (r.sender, r.value));
            prop_assert_eq!(got, expected);
        }
        prop_assert_eq!(pools.threads.mailbox_len(t), model.len());
    }

    /// Scheduling queues pop the most recently pushed thread
    #[test]
    fn queue_is_lifo(count in 0usize..8) {
        let mut pools = Pools::new();
        let root = pools.root();
        let mut ready = pools.new_queue();

        let mut pushed = Vec::new();
        for _ in 0..count {
            let t = pools.thread_alloc(root).unwrap();
            pools.thread_enqueue(t, &mut ready).unwrap();
            pushed.push(t);
        }

        while let Some(expected) = pushed.pop() {
            prop_assert_eq!(pools.thread_dequeue(&mut ready), Some(expected));
        }
        prop_assert_eq!(pools.thread_dequeue(&mut ready), None);
    }

    /// A chain of processes can be unwound leaf-first, and only leaf-first
    #[test]
    fn tree_unwinds_bottom_up(depth in 1usize..6) {
        let mut pools = Pools::new();
        let mut chain = vec![pools.root()];
        for _ in 0..depth {
            let parent = *chain.last().unwrap();
            chain.push(pools.proc_alloc(parent).unwrap());
        }
        if depth == 5 {
            prop_assert_eq!(
                pools.proc_alloc(pools.root()),
                Err(KernelError::PoolExhausted(PoolKind::Process))
            );
        }

        while chain.len() > 1 {
            if chain.len() > 2 {
                prop_assert!(pools.proc_delete(chain[1]).is_err());
            }
            let leaf = chain.pop().unwrap();
            prop_assert_eq!(pools.proc_delete(leaf), Ok(()));
        }
        prop_assert_eq!(pools.stats().live_processes, 1);
    }
}
