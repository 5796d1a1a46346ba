use crate::engine::Engine;
use crate::errors::engine_error::EngineError;
use crate::index::key::composite_key;
use crate::lock::lock_manager::LockManager;
use crate::log_manager::LogManager;
use crate::transaction::context::Context;
use crate::transaction::transaction::Transaction;
use crate::types::transaction_types::{TransactionState, WriteRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Hands out monotonically increasing transaction ids and timestamps, keeps
/// the process-wide registry of live transactions, and drives commit/abort.
pub struct TransactionManager {
    next_txn_id: AtomicU32,
    next_timestamp: AtomicU32,
    txn_map: Mutex<HashMap<u32, Arc<Transaction>>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_txn_id: AtomicU32::new(1),
            next_timestamp: AtomicU32::new(1),
            txn_map: Mutex::new(HashMap::new()),
        }
    }

    /// Start a transaction. Passing an existing one re-arms it to GROWING;
    /// otherwise a new transaction is allocated and registered.
    pub fn begin(&self, existing: Option<Arc<Transaction>>) -> Arc<Transaction> {
        if let Some(txn) = existing {
            txn.set_state(TransactionState::Growing);
            return txn;
        }

        let id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let start_ts = self.next_timestamp.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(id, start_ts));
        self.txn_map.lock().unwrap().insert(id, Arc::clone(&txn));
        debug!(txn_id = id, start_ts, "begin transaction");
        txn
    }

    pub fn transaction(&self, id: u32) -> Option<Arc<Transaction>> {
        self.txn_map.lock().unwrap().get(&id).cloned()
    }

    /// Commit: release every lock, flush the log, drop the write-set.
    pub fn commit(
        &self,
        txn: &Arc<Transaction>,
        lock_mgr: &LockManager,
        log_mgr: &LogManager,
    ) -> Result<(), EngineError> {
        txn.set_state(TransactionState::Shrinking);
        self.release_all_locks(txn, lock_mgr);

        log_mgr.append_record(&format!("commit {}", txn.id()))?;
        log_mgr.flush_log_to_disk()?;

        txn.take_write_set();
        txn.set_state(TransactionState::Committed);
        self.txn_map.lock().unwrap().remove(&txn.id());
        info!(txn_id = txn.id(), "committed");
        Ok(())
    }

    /// Abort: replay the write-set in reverse as logical undo, then release
    /// locks and flush the log. The state moves to SHRINKING *before* undo so
    /// the record manager stops capturing, and the undo context carries no
    /// transaction so undo never locks or records.
    pub fn abort(
        &self,
        txn: &Arc<Transaction>,
        engine: &Engine,
        lock_mgr: &LockManager,
        log_mgr: &LogManager,
    ) -> Result<(), EngineError> {
        txn.set_state(TransactionState::Shrinking);

        let write_set = txn.take_write_set();
        let undo_ctx = Context::system();
        for record in write_set.iter().rev() {
            self.undo(engine, &undo_ctx, record).map_err(|e| {
                EngineError::Internal(format!(
                    "undo failed for transaction {}: {}",
                    txn.id(),
                    e
                ))
            })?;
        }

        self.release_all_locks(txn, lock_mgr);

        log_mgr.append_record(&format!("abort {}", txn.id()))?;
        log_mgr.flush_log_to_disk()?;

        txn.set_state(TransactionState::Aborted);
        self.txn_map.lock().unwrap().remove(&txn.id());
        info!(txn_id = txn.id(), undone = write_set.len(), "aborted");
        Ok(())
    }

    /// Reverse one write. The heap image is restored from the before-image
    /// and every index on the table is put back in step with the heap, so an
    /// aborted transaction leaves no trace in either.
    fn undo(
        &self,
        engine: &Engine,
        undo_ctx: &Context,
        record: &WriteRecord,
    ) -> Result<(), EngineError> {
        match record {
            WriteRecord::InsertTuple { tab, rid } => {
                let fh = engine.heap(tab)?;
                let rec = fh.get_record(*rid, undo_ctx)?;
                for ih in engine.table_indexes(tab)? {
                    let key = composite_key(ih.meta(), &rec.data);
                    ih.delete_entry(&key, *rid);
                }
                fh.delete_record(*rid, undo_ctx)?;
            }
            WriteRecord::DeleteTuple { tab, rid, before } => {
                // Reinsert at the original rid: index entries and any rids
                // held by other operators stay valid.
                let fh = engine.heap(tab)?;
                fh.insert_record_at(*rid, &before.data)?;
                for ih in engine.table_indexes(tab)? {
                    let key = composite_key(ih.meta(), &before.data);
                    ih.insert_entry(key, *rid);
                }
            }
            WriteRecord::UpdateTuple { tab, rid, before } => {
                let fh = engine.heap(tab)?;
                let current = fh.get_record(*rid, undo_ctx)?;
                for ih in engine.table_indexes(tab)? {
                    let new_key = composite_key(ih.meta(), &current.data);
                    let old_key = composite_key(ih.meta(), &before.data);
                    if new_key != old_key {
                        ih.delete_entry(&new_key, *rid);
                        ih.insert_entry(old_key, *rid);
                    }
                }
                fh.update_record(*rid, &before.data, undo_ctx)?;
            }
        }
        Ok(())
    }

    /// Release the whole lock-set; the set is copied first so `unlock` can
    /// shrink it while we iterate.
    fn release_all_locks(&self, txn: &Arc<Transaction>, lock_mgr: &LockManager) {
        for id in txn.lock_set_snapshot() {
            lock_mgr.unlock(txn, id);
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
