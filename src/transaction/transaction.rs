use crate::types::transaction_types::{LockDataId, TransactionState, WriteRecord};
use std::collections::HashSet;
use std::sync::Mutex;

/// A live transaction. Shared across the lock manager, record manager and
/// executors as `Arc<Transaction>`; every mutable field sits behind its own
/// mutex so the transaction itself needs no external locking.
pub struct Transaction {
    id: u32,
    start_ts: u32,
    state: Mutex<TransactionState>,
    lock_set: Mutex<HashSet<LockDataId>>,
    write_set: Mutex<Vec<WriteRecord>>,
}

impl Transaction {
    pub fn new(id: u32, start_ts: u32) -> Self {
        Self {
            id,
            start_ts,
            state: Mutex::new(TransactionState::Growing),
            lock_set: Mutex::new(HashSet::new()),
            write_set: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn start_ts(&self) -> u32 {
        self.start_ts
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock().unwrap()
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Append one undo entry; entries keep the order the mutations committed in.
    pub fn append_write_record(&self, record: WriteRecord) {
        self.write_set.lock().unwrap().push(record);
    }

    /// Drain the write-set (commit drops it, abort replays it in reverse).
    pub fn take_write_set(&self) -> Vec<WriteRecord> {
        std::mem::take(&mut *self.write_set.lock().unwrap())
    }

    pub fn write_set_snapshot(&self) -> Vec<WriteRecord> {
        self.write_set.lock().unwrap().clone()
    }

    pub fn insert_lock(&self, id: LockDataId) {
        self.lock_set.lock().unwrap().insert(id);
    }

    pub fn erase_lock(&self, id: LockDataId) {
        self.lock_set.lock().unwrap().remove(&id);
    }

    pub fn lock_set_snapshot(&self) -> Vec<LockDataId> {
        self.lock_set.lock().unwrap().iter().copied().collect()
    }

    pub fn locks_held(&self) -> usize {
        self.lock_set.lock().unwrap().len()
    }
}
