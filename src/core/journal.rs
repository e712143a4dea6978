//! Journaled balance map.
//!
//! Every write records the previous value so an aborted operation can restore
//! exactly the entries it touched. `commit` forgets the undo log, `rollback`
//! replays it in reverse.

use std::collections::HashMap;
use std::hash::Hash;

/// `HashMap<K, u128>` with an undo log. Zero balances are not stored.
#[derive(Debug, Clone)]
pub struct JournaledMap<K: Eq + Hash> {
    entries: HashMap<K, u128>,
    undo: Vec<(K, u128)>,
}

impl<K: Eq + Hash> Default for JournaledMap<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            undo: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> JournaledMap<K> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value (zero when absent)
    pub fn get(&self, key: &K) -> u128 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    /// Set a value, recording the previous one
    pub fn set(&mut self, key: K, value: u128) {
        let previous = self.get(&key);
        if previous == value {
            return;
        }
        self.undo.push((key.clone(), previous));
        self.write(key, value);
    }

    /// Forget the undo log, keeping all writes
    pub fn commit(&mut self) {
        self.undo.clear();
    }

    /// Restore every value written since the last commit
    pub fn rollback(&mut self) {
        while let Some((key, previous)) = self.undo.pop() {
            self.write(key, previous);
        }
    }

    /// True when writes are pending commit
    pub fn is_dirty(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Iterate over non-zero entries
    pub fn iter(&self) -> impl Iterator<Item = (&K, &u128)> {
        self.entries.iter()
    }

    /// Number of non-zero entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry is non-zero
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write(&mut self, key: K, value: u128) {
        if value == 0 {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }
}
