use crate::errors::transaction_error::{AbortReason, TransactionAbort};
use crate::transaction::transaction::Transaction;
use crate::types::page_types::Rid;
use crate::types::transaction_types::{LockDataId, LockMode, LockRequest, TransactionState};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Multi-granularity lock manager under strict 2PL with no-wait deadlock
/// prevention: a request is granted, upgrades in place, or aborts the
/// requester. Nothing ever waits beyond the lock-table mutex.
pub struct LockManager {
    lock_table: Mutex<HashMap<LockDataId, LockRequestQueue>>,
}

#[derive(Default)]
struct LockRequestQueue {
    requests: Vec<LockRequest>,
}

/// Compatibility of a requested mode against a held one.
fn compatible(held: LockMode, requested: LockMode) -> bool {
    use LockMode::*;
    match (held, requested) {
        (IntentionShared, Exclusive) => false,
        (IntentionShared, _) => true,
        (IntentionExclusive, IntentionShared) | (IntentionExclusive, IntentionExclusive) => true,
        (IntentionExclusive, _) => false,
        (Shared, IntentionShared) | (Shared, Shared) => true,
        (Shared, _) => false,
        (SharedIntentionExclusive, IntentionShared) => true,
        (SharedIntentionExclusive, _) => false,
        (Exclusive, _) => false,
    }
}

/// Join of a held mode and a newly requested one on the upgrade lattice.
fn upgraded(held: LockMode, requested: LockMode) -> LockMode {
    use LockMode::*;
    match (held, requested) {
        (Exclusive, _) => Exclusive,
        (held, IntentionShared) => held,
        (held, requested) if held == requested => held,
        (Shared, Exclusive) => Exclusive,
        (Shared, _) => SharedIntentionExclusive,
        (IntentionExclusive, Exclusive) => Exclusive,
        (IntentionExclusive, _) => SharedIntentionExclusive,
        (IntentionShared, requested) => requested,
        (SharedIntentionExclusive, Exclusive) => Exclusive,
        (SharedIntentionExclusive, _) => SharedIntentionExclusive,
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            lock_table: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_shared_on_record(
        &self,
        txn: &Transaction,
        rid: Rid,
        fd: i32,
    ) -> Result<(), TransactionAbort> {
        self.lock_internal(txn, LockDataId::Record { fd, rid }, LockMode::Shared)
    }

    pub fn lock_exclusive_on_record(
        &self,
        txn: &Transaction,
        rid: Rid,
        fd: i32,
    ) -> Result<(), TransactionAbort> {
        self.lock_internal(txn, LockDataId::Record { fd, rid }, LockMode::Exclusive)
    }

    pub fn lock_shared_on_table(&self, txn: &Transaction, fd: i32) -> Result<(), TransactionAbort> {
        self.lock_internal(txn, LockDataId::Table { fd }, LockMode::Shared)
    }

    pub fn lock_exclusive_on_table(
        &self,
        txn: &Transaction,
        fd: i32,
    ) -> Result<(), TransactionAbort> {
        self.lock_internal(txn, LockDataId::Table { fd }, LockMode::Exclusive)
    }

    pub fn lock_is_on_table(&self, txn: &Transaction, fd: i32) -> Result<(), TransactionAbort> {
        self.lock_internal(txn, LockDataId::Table { fd }, LockMode::IntentionShared)
    }

    pub fn lock_ix_on_table(&self, txn: &Transaction, fd: i32) -> Result<(), TransactionAbort> {
        self.lock_internal(txn, LockDataId::Table { fd }, LockMode::IntentionExclusive)
    }

    fn lock_internal(
        &self,
        txn: &Transaction,
        id: LockDataId,
        mode: LockMode,
    ) -> Result<(), TransactionAbort> {
        // Strict 2PL: no new locks once the transaction started shrinking.
        if txn.state() == TransactionState::Shrinking {
            return Err(self.refuse(txn, id, mode, AbortReason::LockOnShrinking));
        }

        let mut table = self.lock_table.lock().unwrap();
        let queue = table.entry(id).or_default();

        // Re-entry or upgrade: this transaction already queued on `id`.
        if let Some(pos) = queue.requests.iter().position(|r| r.txn_id == txn.id()) {
            if !queue.requests[pos].granted {
                // No-wait never leaves a waiting self-request behind.
                return Err(self.refuse(txn, id, mode, AbortReason::DeadlockPrevention));
            }
            let held = queue.requests[pos].mode;
            let new_mode = upgraded(held, mode);
            if new_mode == held {
                return Ok(());
            }
            if !self.compatible_with_granted(queue, txn.id(), new_mode) {
                return Err(self.refuse(txn, id, mode, AbortReason::UpgradeConflict));
            }
            queue.requests[pos].mode = new_mode;
            return Ok(());
        }

        // New request: grant immediately or abort, never wait.
        if !self.compatible_with_granted(queue, txn.id(), mode) {
            return Err(self.refuse(txn, id, mode, AbortReason::DeadlockPrevention));
        }
        queue.requests.push(LockRequest {
            txn_id: txn.id(),
            mode,
            granted: true,
        });
        txn.insert_lock(id);
        Ok(())
    }

    fn compatible_with_granted(
        &self,
        queue: &LockRequestQueue,
        self_id: u32,
        requested: LockMode,
    ) -> bool {
        queue
            .requests
            .iter()
            .filter(|r| r.granted && r.txn_id != self_id)
            .all(|r| compatible(r.mode, requested))
    }

    fn refuse(
        &self,
        txn: &Transaction,
        id: LockDataId,
        mode: LockMode,
        reason: AbortReason,
    ) -> TransactionAbort {
        debug!(txn_id = txn.id(), ?id, %mode, %reason, "lock request refused");
        TransactionAbort {
            txn_id: txn.id(),
            reason,
        }
    }

    /// Release every request `txn` holds on `id`. The first unlock of a
    /// growing transaction forces it into shrinking.
    pub fn unlock(&self, txn: &Transaction, id: LockDataId) {
        let mut table = self.lock_table.lock().unwrap();
        let mut drained = false;
        if let Some(queue) = table.get_mut(&id) {
            queue.requests.retain(|r| r.txn_id != txn.id());
            drained = queue.requests.is_empty();
        }
        if drained {
            table.remove(&id);
        }

        txn.erase_lock(id);
        if txn.state() == TransactionState::Growing {
            txn.set_state(TransactionState::Shrinking);
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
