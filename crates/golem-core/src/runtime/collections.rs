// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dicts, sets and ranges.

use std::fmt;

use rustc_hash::FxHashMap;

use super::value::{HashKey, Value};
use crate::error::ErrorKind;

/// A hash table that remembers insertion order.
#[derive(Debug, Clone)]
pub struct Table<T> {
    entries: Vec<(HashKey, T)>,
    index: FxHashMap<HashKey, usize>,
}

/// Dict storage.
pub type Dict = Table<Value>;

/// Set storage.
pub type Set = Table<()>;

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<T> Table<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &HashKey) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &HashKey) -> Option<&T> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Returns the value stored under `key` for update.
    pub fn get_mut(&mut self, key: &HashKey) -> Option<&mut T> {
        let i = *self.index.get(key)?;
        Some(&mut self.entries[i].1)
    }

    /// Inserts or replaces an entry. A replaced entry keeps its position.
    pub fn insert(&mut self, key: HashKey, value: T) -> Option<T> {
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, key: &HashKey) -> Option<T> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for (_, slot) in self.index.iter_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &HashKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HashKey, &T)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<HashKey> for Set {
    fn from_iter<I: IntoIterator<Item = HashKey>>(iter: I) -> Self {
        let mut set = Set::new();
        for key in iter {
            set.insert(key, ());
        }
        set
    }
}

/// An arithmetic progression of Ints, `start` inclusive and `end`
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    /// First value
    pub start: i64,
    /// Bound, never reached
    pub end: i64,
    /// Distance between values; never zero
    pub step: i64,
}

impl RangeValue {
    /// Creates a range, rejecting a zero step.
    pub fn new(start: i64, end: i64, step: i64) -> Result<Self, ErrorKind> {
        if step == 0 {
            return Err(ErrorKind::invalid_argument("range step must not be zero"));
        }
        Ok(Self { start, end, step })
    }

    /// Number of values in the range.
    pub fn len(&self) -> usize {
        let (start, end, step) = (self.start as i128, self.end as i128, self.step as i128);
        let span = if step > 0 { end - start } else { start - end };
        if span <= 0 {
            return 0;
        }
        let step = step.abs();
        ((span + step - 1) / step) as usize
    }

    /// Returns true if the range has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at position `index`.
    pub fn get(&self, index: usize) -> Option<i64> {
        (index < self.len()).then(|| self.start + self.step * index as i64)
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "range({}, {})", self.start, self.end)
        } else {
            write!(f, "range({}, {}, {})", self.start, self.end, self.step)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: i64) -> HashKey {
        HashKey::Int(n)
    }

    #[test]
    fn test_table_keeps_insertion_order() {
        let mut dict = Dict::new();
        dict.insert(key(3), Value::Int(30));
        dict.insert(key(1), Value::Int(10));
        dict.insert(key(3), Value::Int(31));
        let keys: Vec<_> = dict.keys().cloned().collect();
        assert_eq!(keys, [key(3), key(1)]);
        assert_eq!(dict.get(&key(3)), Some(&Value::Int(31)));
    }

    #[test]
    fn test_table_remove_reindexes() {
        let mut set: Set = [key(1), key(2), key(3)].into_iter().collect();
        assert_eq!(set.remove(&key(1)), Some(()));
        assert!(set.contains(&key(3)));
        assert_eq!(set.len(), 2);
        set.insert(key(4), ());
        assert_eq!(set.remove(&key(3)), Some(()));
        assert!(set.contains(&key(4)));
    }

    #[test]
    fn test_range_len() {
        assert_eq!(RangeValue::new(0, 5, 1).unwrap().len(), 5);
        assert_eq!(RangeValue::new(0, 5, 2).unwrap().len(), 3);
        assert_eq!(RangeValue::new(5, 0, -2).unwrap().len(), 3);
        assert_eq!(RangeValue::new(5, 0, 1).unwrap().len(), 0);
        assert_eq!(RangeValue::new(1, 10, 3).unwrap().get(2), Some(7));
        assert!(RangeValue::new(0, 1, 0).is_err());
    }
}
