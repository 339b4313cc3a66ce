//! Index-linked intrusive lists
//!
//! A [`LinkTable`] holds one link per arena slot. A [`List`] is a head/tail
//! pair plus a key that is stamped into every member link (the pools use
//! [`ListKey`](crate::types::ListKey)), so each link records which list holds
//! it. Membership is therefore checked instead of trusted:
//!
//! - inserting a node that is already linked fails with [`ListError::AlreadyLinked`]
//! - removing a node from a list that does not hold it fails with [`ListError::NotMember`]
//!
//! Every operation except iteration is O(1) and nothing allocates.

use core::fmt;

/// List operation errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListError {
    /// Node index is outside the table
    OutOfRange,
    /// Node is already a member of some list
    AlreadyLinked,
    /// Node is not a member of the given list
    NotMember,
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            ListError::OutOfRange => "node out of range",
            ListError::AlreadyLinked => "node already linked",
            ListError::NotMember => "node not a member of list",
        };
        f.write_str(what)
    }
}

/// A single intrusive link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link<K> {
    owner: Option<K>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K> Link<K> {
    const UNLINKED: Self = Self {
        owner: None,
        prev: None,
        next: None,
    };
}

/// Head of a list threaded through a [`LinkTable`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct List<K> {
    key: K,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K: Copy + Eq> List<K> {
    /// Create an empty list identified by `key`
    pub const fn new(key: K) -> Self {
        Self {
            key,
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// O(1) emptiness test
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.len
    }

    /// First member, without removing it
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    /// Last member, without removing it
    pub fn tail(&self) -> Option<usize> {
        self.tail
    }
}

/// One link per arena slot.
pub struct LinkTable<K, const N: usize> {
    links: [Link<K>; N],
}

impl<K: Copy + Eq, const N: usize> LinkTable<K, N> {
    /// Create a table with every link detached
    pub fn new() -> Self {
        Self {
            links: [Link::<K>::UNLINKED; N],
        }
    }

    /// Key of the list holding `node`, if any
    pub fn owner(&self, node: usize) -> Option<K> {
        self.links.get(node).and_then(|l| l.owner)
    }

    /// True if `node` is a member of `list`
    pub fn contains(&self, list: &List<K>, node: usize) -> bool {
        self.owner(node) == Some(list.key)
    }

    /// Successor of `node` in its list
    pub fn next(&self, node: usize) -> Option<usize> {
        self.links.get(node).and_then(|l| l.next)
    }

    fn detached(&self, node: usize) -> Result<(), ListError> {
        match self.links.get(node) {
            None => Err(ListError::OutOfRange),
            Some(l) if l.owner.is_some() => Err(ListError::AlreadyLinked),
            Some(_) => Ok(()),
        }
    }

    /// Link `node` in front of the current head
    pub fn insert_head(&mut self, list: &mut List<K>, node: usize) -> Result<(), ListError> {
        self.detached(node)?;

        let old_head = list.head;
        self.links[node] = Link {
            owner: Some(list.key),
            prev: None,
            next: old_head,
        };
        match old_head {
            Some(h) => self.links[h].prev = Some(node),
            None => list.tail = Some(node),
        }
        list.head = Some(node);
        list.len += 1;
        Ok(())
    }

    /// Link `node` after the current tail
    pub fn insert_tail(&mut self, list: &mut List<K>, node: usize) -> Result<(), ListError> {
        self.detached(node)?;

        let old_tail = list.tail;
        self.links[node] = Link {
            owner: Some(list.key),
            prev: old_tail,
            next: None,
        };
        match old_tail {
            Some(t) => self.links[t].next = Some(node),
            None => list.head = Some(node),
        }
        list.tail = Some(node);
        list.len += 1;
        Ok(())
    }

    /// Unlink `node` from `list`
    pub fn remove(&mut self, list: &mut List<K>, node: usize) -> Result<(), ListError> {
        let link = *self.links.get(node).ok_or(ListError::OutOfRange)?;
        if link.owner != Some(list.key) {
            return Err(ListError::NotMember);
        }

        match link.prev {
            Some(p) => self.links[p].next = link.next,
            None => list.head = link.next,
        }
        match link.next {
            Some(n) => self.links[n].prev = link.prev,
            None => list.tail = link.prev,
        }
        self.links[node] = Link::UNLINKED;
        list.len -= 1;
        Ok(())
    }

    /// Unlink and return the head of `list`
    pub fn pop_head(&mut self, list: &mut List<K>) -> Option<usize> {
        let head = list.head?;
        self.remove(list, head).ok()?;
        Some(head)
    }

    /// Iterate the members of `list` from head to tail.
    ///
    /// The iterator copies the head index, so it does not borrow `list`.
    pub fn iter(&self, list: &List<K>) -> Iter<'_, K, N> {
        Iter {
            table: self,
            cursor: list.head,
            remaining: list.len,
        }
    }
}

impl<K: Copy + Eq, const N: usize> Default for LinkTable<K, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward iterator over a list's members
pub struct Iter<'a, K, const N: usize> {
    table: &'a LinkTable<K, N>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, K: Copy + Eq, const N: usize> Iterator for Iter<'a, K, N> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        // `remaining` bounds the walk even if links were corrupted into a cycle
        if self.remaining == 0 {
            return None;
        }
        let node = self.cursor?;
        self.cursor = self.table.next(node);
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Key {
        A,
        B,
    }

    fn members(table: &LinkTable<Key, 8>, list: &List<Key>) -> Vec<usize> {
        table.iter(list).collect()
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = List::new(Key::A);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);
    }

    #[test]
    fn test_insert_head_and_tail_order() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut list = List::new(Key::A);

        table.insert_tail(&mut list, 1).unwrap();
        table.insert_tail(&mut list, 2).unwrap();
        table.insert_head(&mut list, 0).unwrap();

        assert_eq!(members(&table, &list), vec![0, 1, 2]);
        assert_eq!(list.head(), Some(0));
        assert_eq!(list.tail(), Some(2));
        assert_eq!(list.len(), 3);
        assert_eq!(table.owner(1), Some(Key::A));
    }

    #[test]
    fn test_remove_middle_head_tail() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut list = List::new(Key::A);
        for n in 0..4 {
            table.insert_tail(&mut list, n).unwrap();
        }

        table.remove(&mut list, 2).unwrap();
        assert_eq!(members(&table, &list), vec![0, 1, 3]);

        table.remove(&mut list, 0).unwrap();
        assert_eq!(members(&table, &list), vec![1, 3]);
        assert_eq!(list.head(), Some(1));

        table.remove(&mut list, 3).unwrap();
        assert_eq!(members(&table, &list), vec![1]);
        assert_eq!(list.tail(), Some(1));

        table.remove(&mut list, 1).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.tail(), None);
        assert_eq!(table.owner(1), None);
    }

    #[test]
    fn test_double_insert_rejected() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut a = List::new(Key::A);
        let mut b = List::new(Key::B);

        table.insert_head(&mut a, 5).unwrap();
        assert_eq!(table.insert_head(&mut a, 5), Err(ListError::AlreadyLinked));
        assert_eq!(table.insert_tail(&mut b, 5), Err(ListError::AlreadyLinked));
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_remove_from_wrong_list_rejected() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut a = List::new(Key::A);
        let mut b = List::new(Key::B);

        table.insert_head(&mut a, 3).unwrap();
        assert_eq!(table.remove(&mut b, 3), Err(ListError::NotMember));
        assert_eq!(table.remove(&mut b, 4), Err(ListError::NotMember));
        assert_eq!(members(&table, &a), vec![3]);
    }

    #[test]
    fn test_out_of_range() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut list = List::new(Key::A);
        assert_eq!(table.insert_head(&mut list, 8), Err(ListError::OutOfRange));
        assert_eq!(table.remove(&mut list, 99), Err(ListError::OutOfRange));
        assert_eq!(table.owner(99), None);
    }

    #[test]
    fn test_pop_head() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut list = List::new(Key::A);
        table.insert_head(&mut list, 1).unwrap();
        table.insert_head(&mut list, 2).unwrap();

        assert_eq!(table.pop_head(&mut list), Some(2));
        assert_eq!(table.pop_head(&mut list), Some(1));
        assert_eq!(table.pop_head(&mut list), None);
    }

    #[test]
    fn test_relink_after_remove() {
        let mut table: LinkTable<Key, 8> = LinkTable::new();
        let mut a = List::new(Key::A);
        let mut b = List::new(Key::B);

        table.insert_head(&mut a, 0).unwrap();
        table.remove(&mut a, 0).unwrap();
        table.insert_tail(&mut b, 0).unwrap();

        assert!(a.is_empty());
        assert_eq!(table.owner(0), Some(Key::B));
        assert!(table.contains(&b, 0));
        assert!(!table.contains(&a, 0));
    }
}
