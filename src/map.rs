//! An open-addressed hash map from `u32` to `u32`.

use alloc::vec::Vec;

const MIN_CAPACITY: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Slot {
    Empty,
    Deleted,
    Used { key: u32, value: u32 },
}

/// A hash map of `u32` keys to `u32` values.
///
/// Uses open addressing with triangular probing over a power-of-two table.
/// Removed entries leave a tombstone until the next resize.
#[derive(Clone, Debug)]
pub struct Map {
    successful: bool,
    population: usize,
    // Used slots plus tombstones.
    occupancy: usize,
    slots: Vec<Slot>,
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn hash(key: u32) -> usize {
    // Knuth's multiplicative hash.
    key.wrapping_mul(2654435761) as usize
}

impl Map {
    /// Creates a new, empty map.
    pub fn new() -> Self {
        Map {
            successful: true,
            population: 0,
            occupancy: 0,
            slots: Vec::new(),
        }
    }

    /// Checks that all allocations so far succeeded.
    #[inline]
    pub fn successful(&self) -> bool {
        self.successful
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.population
    }

    /// Checks that the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.population == 0
    }

    fn resize(&mut self) -> bool {
        if !self.successful {
            return false;
        }

        let new_capacity = ((self.population + 1) * 4)
            .next_power_of_two()
            .max(MIN_CAPACITY);

        let mut slots = Vec::new();
        if slots.try_reserve_exact(new_capacity).is_err() {
            self.successful = false;
            return false;
        }
        slots.resize(new_capacity, Slot::Empty);

        let old = core::mem::replace(&mut self.slots, slots);
        self.population = 0;
        self.occupancy = 0;
        for slot in old {
            if let Slot::Used { key, value } = slot {
                self.insert_impl(key, value);
            }
        }

        true
    }

    // Returns the slot holding `key` or, when absent, the slot to insert it into.
    fn bucket_for(&self, key: u32) -> usize {
        let mask = self.slots.len() - 1;
        let mut i = hash(key) & mask;
        let mut step = 0;
        let mut tombstone = None;

        loop {
            match self.slots[i] {
                Slot::Empty => return tombstone.unwrap_or(i),
                Slot::Deleted => {
                    if tombstone.is_none() {
                        tombstone = Some(i);
                    }
                }
                Slot::Used { key: k, .. } if k == key => return i,
                Slot::Used { .. } => {}
            }

            step += 1;
            if step > mask {
                // The table is full of tombstones and other keys.
                return tombstone.unwrap_or(i);
            }

            i = (i + step) & mask;
        }
    }

    fn insert_impl(&mut self, key: u32, value: u32) -> Option<u32> {
        let i = self.bucket_for(key);
        match self.slots[i] {
            Slot::Used { value: old, .. } => {
                self.slots[i] = Slot::Used { key, value };
                Some(old)
            }
            Slot::Deleted => {
                self.slots[i] = Slot::Used { key, value };
                self.population += 1;
                None
            }
            Slot::Empty => {
                self.slots[i] = Slot::Used { key, value };
                self.population += 1;
                self.occupancy += 1;
                None
            }
        }
    }

    /// Inserts a value, returning the previous one.
    ///
    /// Nothing is inserted when the map failed to allocate.
    pub fn insert(&mut self, key: u32, value: u32) -> Option<u32> {
        if !self.successful {
            return None;
        }

        // Keep the table at most half full.
        if (self.occupancy + 1) * 2 > self.slots.len() && !self.resize() {
            return None;
        }

        self.insert_impl(key, value)
    }

    /// Returns the value for a key.
    pub fn get(&self, key: u32) -> Option<u32> {
        if self.slots.is_empty() {
            return None;
        }

        match self.slots[self.bucket_for(key)] {
            Slot::Used { key: k, value } if k == key => Some(value),
            _ => None,
        }
    }

    /// Checks that the map has a key.
    #[inline]
    pub fn contains(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: u32) -> Option<u32> {
        if self.slots.is_empty() {
            return None;
        }

        let i = self.bucket_for(key);
        match self.slots[i] {
            Slot::Used { key: k, value } if k == key => {
                self.slots[i] = Slot::Deleted;
                self.population -= 1;
                Some(value)
            }
            _ => None,
        }
    }

    /// Removes all entries while keeping the allocation.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }

        self.population = 0;
        self.occupancy = 0;
    }

    /// Returns an iterator over the entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.slots.iter().filter_map(|slot| match *slot {
            Slot::Used { key, value } => Some((key, value)),
            _ => None,
        })
    }

    /// Returns an iterator over the keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.iter().map(|(_, value)| value)
    }
}
