use crate::types::catalog_types::IndexMeta;
use crate::types::page_types::Rid;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;

/// Secondary index handle: an ordered map from composite key bytes to the
/// rids carrying that key. Keys compare as plain bytes (the key codec makes
/// byte order equal typed order), duplicates are permitted and distinguished
/// by rid. Rebuilt from the heap when the database is opened.
pub struct IxIndexHandle {
    name: String,
    meta: IndexMeta,
    entries: Mutex<BTreeMap<Vec<u8>, Vec<Rid>>>,
}

impl IxIndexHandle {
    pub fn new(name: String, meta: IndexMeta) -> Self {
        Self {
            name,
            meta,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn insert_entry(&self, key: Vec<u8>, rid: Rid) {
        self.entries.lock().unwrap().entry(key).or_default().push(rid);
    }

    /// Remove the entry (key, rid). Returns whether it existed.
    pub fn delete_entry(&self, key: &[u8], rid: Rid) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let (removed, drained) = match entries.get_mut(key) {
            Some(rids) => {
                let before = rids.len();
                rids.retain(|&r| r != rid);
                (rids.len() != before, rids.is_empty())
            }
            None => (false, false),
        };
        if drained {
            entries.remove(key);
        }
        removed
    }

    /// Equality probe: every rid filed under `key`.
    pub fn get(&self, key: &[u8]) -> Vec<Rid> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Position of the first entry with key >= `key`, counted over the leaf
    /// order of (key, rid) entries.
    pub fn lower_bound(&self, key: &[u8]) -> usize {
        self.entries
            .lock()
            .unwrap()
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
            .map(|(_, rids)| rids.len())
            .sum()
    }

    /// Position one past the last entry with key == `key`.
    pub fn upper_bound(&self, key: &[u8]) -> usize {
        self.entries
            .lock()
            .unwrap()
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .map(|(_, rids)| rids.len())
            .sum()
    }

    pub fn leaf_begin(&self) -> usize {
        0
    }

    pub fn leaf_end(&self) -> usize {
        self.entries.lock().unwrap().values().map(Vec::len).sum()
    }

    /// Forward cursor over positions [lower, upper). The entries are
    /// snapshotted under the handle's mutex; scans run under a table S lock,
    /// so the snapshot cannot go stale mid-scan.
    pub fn scan(&self, lower: usize, upper: usize) -> IxScan {
        let rids: Vec<Rid> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, rids)| rids.iter().copied())
            .skip(lower)
            .take(upper.saturating_sub(lower))
            .collect();
        IxScan { rids, pos: 0 }
    }

    /// Every (key, rid) entry in leaf order.
    pub fn entries(&self) -> Vec<(Vec<u8>, Rid)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(k, rids)| rids.iter().map(|&r| (k.clone(), r)).collect::<Vec<_>>())
            .collect()
    }
}

/// Forward leaf cursor; lazy on the consumer side, single-pass.
pub struct IxScan {
    rids: Vec<Rid>,
    pos: usize,
}

impl IxScan {
    pub fn next(&mut self) {
        if self.pos < self.rids.len() {
            self.pos += 1;
        }
    }

    pub fn rid(&self) -> Rid {
        self.rids[self.pos]
    }

    pub fn is_end(&self) -> bool {
        self.pos >= self.rids.len()
    }
}
