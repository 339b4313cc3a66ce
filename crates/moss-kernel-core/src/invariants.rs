//! Structural invariants for the kernel pools
//!
//! Runtime-checkable invariants that should hold after every operation.
//! Used for assertion checking in tests and during development, and by the
//! property tests.
//!
//! # Invariants
//!
//! 1. **Pool Conservation**: live + free == capacity, and the free lists hold
//!    exactly the unallocated slots
//! 2. **Tree Integrity**: every live non-root process sits in its parent's
//!    child list, and the tree reachable from the root is exactly the live set
//! 3. **Thread Ownership**: every live thread sits in its live owner's thread
//!    list, and thread lists hold only threads they own
//! 4. **Mailbox Consistency**: every in-flight message sits in the mailbox of
//!    a live thread
//! 5. **Link Exclusivity**: every link's owner tag matches the list it is
//!    reachable from
//! 6. **Dangling Sender**: in-flight messages name a live sender. This one
//!    is advisory: freeing a sender with outstanding messages is allowed

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::process::ROOT;
use crate::state::KernelPools;
use crate::types::{ListKey, ProcessId, ThreadId};

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all invariants, including the advisory dangling-sender check.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = check_structural_invariants(pools);
    violations.extend(check_dangling_senders(pools));
    violations
}

/// Check the invariants the pools themselves guarantee (1-5).
pub fn check_structural_invariants<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_pool_conservation(pools));
    violations.extend(check_tree_integrity(pools));
    violations.extend(check_thread_ownership(pools));
    violations.extend(check_mailbox_consistency(pools));
    violations.extend(check_link_exclusivity(pools));

    violations
}

/// Panic if any structural invariant is violated.
pub fn assert_invariants<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) {
    let violations = check_structural_invariants(pools);
    if !violations.is_empty() {
        panic!("Invariant violated: {:?}", violations);
    }
}

fn violation(invariant: &'static str, description: String) -> InvariantViolation {
    InvariantViolation {
        invariant,
        description,
    }
}

/// Invariant 1: live + free == capacity, free lists hold exactly the free slots
fn check_pool_conservation<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let live_procs = pools.processes.live().count();
    if live_procs + pools.processes.free_count() != pools.processes.capacity() {
        violations.push(violation(
            "pool_conservation",
            alloc::format!(
                "{} live + {} free processes != capacity {}",
                live_procs,
                pools.processes.free_count(),
                pools.processes.capacity()
            ),
        ));
    }
    for slot in pools.processes.free_slots() {
        if pools.processes.is_live(ProcessId::from_index(slot)) {
            violations.push(violation(
                "pool_conservation",
                alloc::format!("Live process {} is on the free list", slot),
            ));
        }
    }

    let live_threads = pools.threads.live().count();
    if live_threads + pools.threads.free_count() != pools.threads.capacity() {
        violations.push(violation(
            "pool_conservation",
            alloc::format!(
                "{} live + {} free threads != capacity {}",
                live_threads,
                pools.threads.free_count(),
                pools.threads.capacity()
            ),
        ));
    }
    for slot in pools.threads.free_slots() {
        if pools.threads.is_live(ThreadId::from_index(slot)) {
            violations.push(violation(
                "pool_conservation",
                alloc::format!("Live thread {} is on the free list", slot),
            ));
        }
    }

    let in_flight = pools.messages.in_flight().count();
    if in_flight + pools.messages.free_count() != pools.messages.capacity() {
        violations.push(violation(
            "pool_conservation",
            alloc::format!(
                "{} in-flight + {} free messages != capacity {}",
                in_flight,
                pools.messages.free_count(),
                pools.messages.capacity()
            ),
        ));
    }

    violations
}

/// Invariant 2: parent links agree with child lists; everything live hangs off the root
fn check_tree_integrity<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let procs = &pools.processes;

    if !procs.is_live(ROOT) || procs.parent(ROOT).is_some() {
        violations.push(violation(
            "tree_integrity",
            String::from("Root process is missing or has a parent"),
        ));
    }

    for pid in procs.live().filter(|&p| p != ROOT) {
        match procs.parent(pid) {
            None => violations.push(violation(
                "tree_integrity",
                alloc::format!("Process {} has no parent", pid),
            )),
            Some(parent) if !procs.is_live(parent) => violations.push(violation(
                "tree_integrity",
                alloc::format!("Process {} has dead parent {}", pid, parent),
            )),
            Some(parent) => {
                let listed = procs.children(parent).filter(|&c| c == pid).count();
                if listed != 1 {
                    violations.push(violation(
                        "tree_integrity",
                        alloc::format!(
                            "Process {} appears {} times in parent {}'s children",
                            pid,
                            listed,
                            parent
                        ),
                    ));
                }
            }
        }
    }

    // Walk down from the root; `seen` also catches cycles
    let mut seen = vec![false; P];
    let mut stack = vec![ROOT];
    let mut reached = 0usize;
    while let Some(pid) = stack.pop() {
        let Some(mark) = seen.get_mut(pid.index()) else {
            continue;
        };
        if *mark {
            violations.push(violation(
                "tree_integrity",
                alloc::format!("Process {} reached twice from the root", pid),
            ));
            continue;
        }
        *mark = true;
        reached += 1;
        stack.extend(procs.children(pid));
    }
    if reached != procs.live_count() {
        violations.push(violation(
            "tree_integrity",
            alloc::format!(
                "{} processes reachable from root but {} live",
                reached,
                procs.live_count()
            ),
        ));
    }

    violations
}

/// Invariant 3: every live thread belongs to exactly one live process
fn check_thread_ownership<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for tid in pools.threads.live() {
        let Some(owner) = pools.threads.owner(tid) else {
            continue;
        };
        if !pools.processes.is_live(owner) {
            violations.push(violation(
                "thread_ownership",
                alloc::format!("Thread {} owned by dead process {}", tid, owner),
            ));
            continue;
        }
        if pools.threads.owner_link(tid.index()) != Some(ListKey::Threads(owner)) {
            violations.push(violation(
                "thread_ownership",
                alloc::format!("Thread {} is not linked into {}'s thread list", tid, owner),
            ));
        }
    }

    for pid in pools.processes.live() {
        for tid in pools.threads.threads_of(&pools.processes, pid) {
            if pools.threads.owner(tid) != Some(pid) {
                violations.push(violation(
                    "thread_ownership",
                    alloc::format!("Process {} lists thread {} it does not own", pid, tid),
                ));
            }
        }
    }

    violations
}

/// Invariant 4: in-flight messages sit in live mailboxes, and mailboxes hold only them
fn check_mailbox_consistency<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for msg in pools.messages.in_flight() {
        if let Some(holder) = pools.messages.holder(msg) {
            if !pools.threads.is_live(holder) {
                violations.push(violation(
                    "mailbox_consistency",
                    alloc::format!("Message {} queued for dead thread {}", msg, holder),
                ));
            }
        }
    }

    let queued: usize = pools
        .threads
        .live()
        .map(|tid| pools.threads.mailbox_len(tid))
        .sum();
    if queued != pools.messages.live_count() {
        violations.push(violation(
            "mailbox_consistency",
            alloc::format!(
                "{} messages in mailboxes but {} allocated",
                queued,
                pools.messages.live_count()
            ),
        ));
    }

    violations
}

/// Invariant 5: owner tags agree with list reachability
fn check_link_exclusivity<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for slot in pools.processes.free_slots() {
        if pools.processes.sibling_owner(slot) != Some(ListKey::Free) {
            violations.push(violation(
                "link_exclusivity",
                alloc::format!("Free process slot {} carries a live tag", slot),
            ));
        }
    }
    for pid in pools.processes.live() {
        for child in pools.processes.children(pid) {
            if pools.processes.sibling_owner(child.index()) != Some(ListKey::Children(pid)) {
                violations.push(violation(
                    "link_exclusivity",
                    alloc::format!("Child {} of {} carries a foreign tag", child, pid),
                ));
            }
        }
    }

    for slot in pools.threads.free_slots() {
        if pools.threads.owner_link(slot) != Some(ListKey::Free) {
            violations.push(violation(
                "link_exclusivity",
                alloc::format!("Free thread slot {} carries a live tag", slot),
            ));
        }
        if pools.threads.queue_of(ThreadId::from_index(slot)).is_some() {
            violations.push(violation(
                "link_exclusivity",
                alloc::format!("Free thread slot {} is still queued", slot),
            ));
        }
    }

    for slot in pools.messages.free_slots() {
        if pools.messages.link_owner(slot) != Some(ListKey::Free) {
            violations.push(violation(
                "link_exclusivity",
                alloc::format!("Free message slot {} carries a live tag", slot),
            ));
        }
    }
    for tid in pools.threads.live() {
        let Some(mailbox) = pools.threads.mailbox(tid) else {
            continue;
        };
        for slot in pools.messages.mailbox_slots(mailbox) {
            if pools.messages.link_owner(slot) != Some(ListKey::Mailbox(tid)) {
                violations.push(violation(
                    "link_exclusivity",
                    alloc::format!(
                        "Message slot {} in {}'s mailbox carries a foreign tag",
                        slot,
                        tid
                    ),
                ));
            }
        }
    }

    violations
}

/// Invariant 6 (advisory): in-flight messages name live senders
fn check_dangling_senders<const P: usize, const T: usize, const M: usize>(
    pools: &KernelPools<P, T, M>,
) -> Vec<InvariantViolation> {
    pools
        .messages
        .in_flight()
        .filter_map(|msg| {
            let sender = pools.messages.sender(msg)?;
            (!pools.threads.is_live(sender)).then(|| {
                violation(
                    "dangling_sender",
                    alloc::format!("Message {} names freed sender {}", msg, sender),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Selector;

    type SmallPools = KernelPools<6, 6, 6>;

    #[test]
    fn test_fresh_pools_hold_invariants() {
        let pools = SmallPools::new();
        let violations = check_all_invariants(&pools);
        assert!(violations.is_empty(), "Violations: {:?}", violations);
    }

    #[test]
    fn test_invariants_hold_after_mixed_operations() {
        let mut pools = SmallPools::new();
        let root = pools.root();
        let p1 = pools.proc_alloc(root).unwrap();
        let p2 = pools.proc_alloc(p1).unwrap();
        let t1 = pools.thread_alloc(p1).unwrap();
        let t2 = pools.thread_alloc(p2).unwrap();
        let mut ready = pools.new_queue();
        pools.thread_enqueue(t1, &mut ready).unwrap();
        pools.msg_send(t1, t2, 5).unwrap();
        pools.msg_send(t2, t1, 6).unwrap();

        let violations = check_all_invariants(&pools);
        assert!(violations.is_empty(), "Violations: {:?}", violations);

        pools.msg_receive(Selector::Any, t2).unwrap();
        pools.thread_free(t2).unwrap();
        pools.proc_delete(p2).unwrap();

        assert_invariants(&pools);
    }

    #[test]
    fn test_invariants_hold_after_failed_operations() {
        let mut pools = SmallPools::new();
        let root = pools.root();
        let p1 = pools.proc_alloc(root).unwrap();
        let t1 = pools.thread_alloc(p1).unwrap();
        pools.msg_send(t1, t1, 1).unwrap();

        assert!(pools.proc_delete(p1).is_err());
        assert!(pools.proc_delete(root).is_err());
        assert!(pools.thread_free(t1).is_err());

        assert_invariants(&pools);
    }

    #[test]
    fn test_detects_dangling_sender() {
        let mut pools = SmallPools::new();
        let root = pools.root();
        let a = pools.thread_alloc(root).unwrap();
        let b = pools.thread_alloc(root).unwrap();
        pools.msg_send(a, b, 1).unwrap();
        pools.thread_free(a).unwrap();

        // Structurally fine
        assert!(check_structural_invariants(&pools).is_empty());

        let violations = check_all_invariants(&pools);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "dangling_sender");
    }

    #[test]
    fn test_assert_invariants_passes_for_valid_state() {
        let mut pools = SmallPools::new();
        let root = pools.root();
        pools.proc_alloc(root).unwrap();

        // Should not panic
        assert_invariants(&pools);
    }
}
