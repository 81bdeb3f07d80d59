//! ClientTable: a fixed-capacity registry of connected clients.
//!
//! The bridge serves a small, fixed number of Telnet clients.  The table is
//! allocated once with that many slots and never grows.  Each slot is either
//! [`Slot::Free`] or [`Slot::Occupied`] with the connection it owns, so there
//! is no "unused handle" sentinel that could be mistaken for a live socket.
//!
//! # Ownership (for beginners)
//!
//! The table *owns* its connections.  Releasing a slot moves the connection
//! out and hands it back to the caller; when the caller drops it, the socket
//! inside is closed.  A connection therefore can never be closed twice or used
//! after it was closed: once it has left the table, the table cannot see it.
//!
//! Lookups are linear scans.  With a handful of slots that is faster than any
//! hashing scheme and keeps slot indices stable for the lifetime of a client.

/// One slot of the table.
#[derive(Debug)]
pub enum Slot<C> {
    /// Available for the next accepted connection.
    Free,
    /// Holds a live connection.
    Occupied(C),
}

impl<C> Slot<C> {
    /// Returns `true` if no connection lives in this slot.
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }
}

/// Fixed-capacity table of client connections indexed by slot number.
///
/// # Examples
///
/// ```rust
/// use serial_bridge_core::ClientTable;
///
/// let mut table = ClientTable::with_capacity(2);
/// let a = table.insert("a").unwrap();
/// let _b = table.insert("b").unwrap();
/// assert_eq!(table.insert("c"), Err("c")); // full: the caller gets it back
/// assert_eq!(table.release(a), Some("a"));
/// assert_eq!(table.release(a), None); // releasing twice is a no-op
/// ```
#[derive(Debug)]
pub struct ClientTable<C> {
    slots: Box<[Slot<C>]>,
}

impl<C> ClientTable<C> {
    /// Creates a table with `capacity` free slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Slot::Free).collect();
        Self { slots }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Slot::is_free)
    }

    /// Returns `true` if every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| !s.is_free())
    }

    /// Stores `conn` in the first free slot and returns its index.
    ///
    /// # Errors
    ///
    /// Returns `conn` unchanged when every slot is occupied, so the caller can
    /// close it.
    pub fn insert(&mut self, conn: C) -> Result<usize, C> {
        match self.slots.iter().position(Slot::is_free) {
            Some(index) => {
                self.slots[index] = Slot::Occupied(conn);
                Ok(index)
            }
            None => Err(conn),
        }
    }

    /// Frees slot `index` and returns the connection it held.
    ///
    /// Releasing a free slot, or an index past the end, returns `None` and
    /// changes nothing.
    pub fn release(&mut self, index: usize) -> Option<C> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Free) {
            Slot::Occupied(conn) => Some(conn),
            Slot::Free => None,
        }
    }

    /// Frees every slot and returns the connections in slot order.
    pub fn release_all(&mut self) -> Vec<C> {
        self.slots
            .iter_mut()
            .filter_map(|slot| match std::mem::replace(slot, Slot::Free) {
                Slot::Occupied(conn) => Some(conn),
                Slot::Free => None,
            })
            .collect()
    }

    /// Returns the slot at `index`, if it exists.
    pub fn slot(&self, index: usize) -> Option<&Slot<C>> {
        self.slots.get(index)
    }

    /// Returns the connection in slot `index`, if that slot is occupied.
    pub fn get(&self, index: usize) -> Option<&C> {
        match self.slots.get(index)? {
            Slot::Occupied(conn) => Some(conn),
            Slot::Free => None,
        }
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        match self.slots.get_mut(index)? {
            Slot::Occupied(conn) => Some(conn),
            Slot::Free => None,
        }
    }

    /// Iterates over occupied slots as `(index, connection)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &C)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(conn) => Some((i, conn)),
            Slot::Free => None,
        })
    }

    /// Iterates mutably over occupied slots as `(index, connection)`.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut C)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Occupied(conn) => Some((i, conn)),
                Slot::Free => None,
            })
    }

    /// Calls `visitor` on every occupied slot.
    pub fn for_each<F>(&mut self, mut visitor: F)
    where
        F: FnMut(usize, &mut C),
    {
        for (index, conn) in self.iter_mut() {
            visitor(index, conn);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_empty() {
        let table: ClientTable<u32> = ClientTable::with_capacity(8);
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
        assert!(!table.is_full());
    }

    #[test]
    fn test_insert_uses_first_free_slot() {
        // Arrange
        let mut table = ClientTable::with_capacity(3);
        table.insert(10).unwrap();
        let middle = table.insert(11).unwrap();
        table.insert(12).unwrap();

        // Act: free the middle slot and insert again
        table.release(middle);
        let index = table.insert(13).unwrap();

        // Assert
        assert_eq!(index, middle);
        assert_eq!(table.get(index), Some(&13));
    }

    #[test]
    fn test_insert_into_full_table_returns_connection() {
        let mut table = ClientTable::with_capacity(2);
        table.insert("a").unwrap();
        table.insert("b").unwrap();

        assert!(table.is_full());
        assert_eq!(table.insert("c"), Err("c"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_full_table_leaves_existing_entries_untouched() {
        let mut table = ClientTable::with_capacity(2);
        table.insert("a").unwrap();
        table.insert("b").unwrap();
        let _ = table.insert("c");

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![(0, &"a"), (1, &"b")]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut table = ClientTable::with_capacity(1);
        let index = table.insert(String::from("conn")).unwrap();

        assert_eq!(table.release(index).as_deref(), Some("conn"));
        assert_eq!(table.release(index), None);
        assert_eq!(table.release(index), None);
        assert!(table.slot(index).unwrap().is_free());
    }

    #[test]
    fn test_release_out_of_range_is_noop() {
        let mut table = ClientTable::with_capacity(1);
        table.insert(1).unwrap();
        assert_eq!(table.release(7), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_release_drops_exactly_once() {
        use std::rc::Rc;

        // Arrange: the table holds one clone, we keep the other.
        let tracker = Rc::new(());
        let mut table = ClientTable::with_capacity(1);
        let index = table.insert(Rc::clone(&tracker)).unwrap();
        assert_eq!(Rc::strong_count(&tracker), 2);

        // Act
        drop(table.release(index));
        drop(table.release(index));

        // Assert: only the one clone the table owned was dropped.
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_release_all_empties_table() {
        let mut table = ClientTable::with_capacity(4);
        table.insert('a').unwrap();
        table.insert('b').unwrap();
        table.insert('c').unwrap();
        table.release(1);

        let released = table.release_all();

        assert_eq!(released, vec!['a', 'c']);
        assert!(table.is_empty());
    }

    #[test]
    fn test_for_each_visits_only_occupied_slots() {
        let mut table = ClientTable::with_capacity(4);
        table.insert(1).unwrap();
        table.insert(2).unwrap();
        table.insert(3).unwrap();
        table.release(0);

        let mut visited = Vec::new();
        table.for_each(|index, value| {
            *value *= 10;
            visited.push(index);
        });

        assert_eq!(visited, vec![1, 2]);
        assert_eq!(table.get(1), Some(&20));
        assert_eq!(table.get(2), Some(&30));
    }

    #[test]
    fn test_get_on_free_slot_is_none() {
        let mut table: ClientTable<u8> = ClientTable::with_capacity(2);
        assert_eq!(table.get(0), None);
        assert_eq!(table.get_mut(1), None);
    }

    #[test]
    fn test_zero_capacity_table_rejects_everything() {
        let mut table = ClientTable::with_capacity(0);
        assert!(table.is_full());
        assert_eq!(table.insert(5), Err(5));
    }
}
