//! Message pool and per-thread mailboxes
//!
//! A message carries one machine word and a copy of its sender's handle. The
//! handle does not keep the sender alive: a thread may be freed while messages
//! it sent are still queued elsewhere.
//!
//! Sends append at the mailbox tail. Non-selective receives take the head, so
//! arrival order is preserved. A selective receive scans in arrival order and
//! takes the first message from the requested sender, leaving the rest in place.

use crate::error::KernelError;
use crate::list::{LinkTable, List};
use crate::thread::ThreadPool;
use crate::types::{ListKey, MessageId, PoolKind, ThreadId, Word};

#[derive(Clone, Copy, Debug)]
struct MessageRecord {
    sender: ThreadId,
    value: Word,
}

impl MessageRecord {
    const VACANT: Self = Self {
        sender: ThreadId(0),
        value: 0,
    };
}

/// Which message a receive should take
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Oldest message, whoever sent it
    Any,
    /// Oldest message from this sender
    From(ThreadId),
}

/// A message taken out of a mailbox
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Received {
    /// Thread that sent the message
    pub sender: ThreadId,
    /// Payload
    pub value: Word,
}

/// Fixed-capacity message arena.
pub struct MessagePool<const M: usize> {
    records: [MessageRecord; M],
    links: LinkTable<ListKey, M>,
    free: List<ListKey>,
}

impl<const M: usize> MessagePool<M> {
    const NON_EMPTY: () = assert!(M >= 1, "message pool needs at least one slot");

    /// Put every message slot in the free pool
    pub fn new() -> Self {
        let () = Self::NON_EMPTY;

        let mut links = LinkTable::new();
        let mut free = List::new(ListKey::Free);
        for slot in 0..M {
            let linked = links.insert_tail(&mut free, slot);
            debug_assert!(linked.is_ok());
        }

        Self {
            records: [MessageRecord::VACANT; M],
            links,
            free,
        }
    }

    /// Queue `value` from `sender` at the tail of `destination`'s mailbox
    pub fn send<const T: usize>(
        &mut self,
        threads: &mut ThreadPool<T>,
        sender: ThreadId,
        destination: ThreadId,
        value: Word,
    ) -> Result<MessageId, KernelError> {
        if !threads.is_live(sender) {
            return Err(KernelError::InvalidArgument);
        }
        let mailbox = threads
            .mailbox_mut(destination)
            .ok_or(KernelError::InvalidArgument)?;
        let slot = self
            .free
            .head()
            .ok_or(KernelError::PoolExhausted(PoolKind::Message))?;

        self.links.remove(&mut self.free, slot)?;
        self.records[slot] = MessageRecord { sender, value };
        self.links.insert_tail(mailbox, slot)?;

        Ok(MessageId::from_index(slot))
    }

    /// Take one message out of `destination`'s mailbox.
    ///
    /// `Selector::Any` is O(1); `Selector::From` scans the mailbox.
    pub fn receive<const T: usize>(
        &mut self,
        threads: &mut ThreadPool<T>,
        selector: Selector,
        destination: ThreadId,
    ) -> Result<Received, KernelError> {
        let mailbox = threads
            .mailbox_mut(destination)
            .ok_or(KernelError::InvalidArgument)?;

        let slot = match selector {
            Selector::Any => mailbox.head(),
            Selector::From(sender) => self
                .links
                .iter(mailbox)
                .find(|&m| self.records[m].sender == sender),
        }
        .ok_or(KernelError::NotFound)?;

        self.links.remove(mailbox, slot)?;
        let MessageRecord { sender, value } =
            core::mem::replace(&mut self.records[slot], MessageRecord::VACANT);
        self.links.insert_head(&mut self.free, slot)?;

        Ok(Received { sender, value })
    }

    /// Receive through an optional sender slot.
    ///
    /// - `None`: take the oldest message from anyone
    /// - `Some(slot)` holding `None`: take the oldest message and write its
    ///   sender into `slot`
    /// - `Some(slot)` holding `Some(sender)`: take the oldest message from
    ///   `sender`
    ///
    /// On failure `slot` is left as it was.
    pub fn receive_into<const T: usize>(
        &mut self,
        threads: &mut ThreadPool<T>,
        sender: Option<&mut Option<ThreadId>>,
        destination: ThreadId,
    ) -> Result<Word, KernelError> {
        self.receive_slot(threads, sender, destination)
            .map(|r| r.value)
    }

    /// `receive_into` returning the whole message
    pub fn receive_slot<const T: usize>(
        &mut self,
        threads: &mut ThreadPool<T>,
        sender: Option<&mut Option<ThreadId>>,
        destination: ThreadId,
    ) -> Result<Received, KernelError> {
        match sender {
            None => self.receive(threads, Selector::Any, destination),
            Some(slot) => match *slot {
                Some(from) => self.receive(threads, Selector::From(from), destination),
                None => {
                    let received = self.receive(threads, Selector::Any, destination)?;
                    *slot = Some(received.sender);
                    Ok(received)
                }
            },
        }
    }

    /// Messages waiting for `destination`, oldest first, as `(sender, value)`
    pub fn pending<'a, const T: usize>(
        &'a self,
        threads: &'a ThreadPool<T>,
        destination: ThreadId,
    ) -> impl Iterator<Item = (ThreadId, Word)> + 'a {
        threads
            .mailbox(destination)
            .map(|mailbox| self.links.iter(mailbox))
            .into_iter()
            .flatten()
            .map(|m| (self.records[m].sender, self.records[m].value))
    }

    /// Mailbox holding `msg`, if it is in flight
    pub fn holder(&self, msg: MessageId) -> Option<ThreadId> {
        match self.links.owner(msg.index()) {
            Some(ListKey::Mailbox(tid)) => Some(tid),
            _ => None,
        }
    }

    /// Sender of an in-flight message
    pub fn sender(&self, msg: MessageId) -> Option<ThreadId> {
        self.holder(msg).map(|_| self.records[msg.index()].sender)
    }

    /// Every in-flight message, in slot order
    pub fn in_flight(&self) -> impl Iterator<Item = MessageId> + '_ {
        (0..M)
            .map(MessageId::from_index)
            .filter(|&m| self.holder(m).is_some())
    }

    pub const fn capacity(&self) -> usize {
        M
    }

    pub fn live_count(&self) -> usize {
        M - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn link_owner(&self, slot: usize) -> Option<ListKey> {
        self.links.owner(slot)
    }

    pub(crate) fn mailbox_slots<'a>(
        &'a self,
        mailbox: &List<ListKey>,
    ) -> impl Iterator<Item = usize> + 'a {
        self.links.iter(mailbox)
    }

    pub(crate) fn free_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.links.iter(&self.free)
    }
}

impl<const M: usize> Default for MessagePool<M> {
    fn default() -> Self {
        Self::new()
    }
}
