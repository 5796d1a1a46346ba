use crate::lock::lock_manager::LockManager;
use crate::log_manager::LogManager;
use crate::transaction::transaction::Transaction;
use crate::types::transaction_types::TransactionState;
use std::sync::Arc;

/// Execution context threaded through the record manager and the operators.
/// A context without a transaction (undo replay, index backfill) performs no
/// locking and no write-set capture.
pub struct Context<'a> {
    lock_mgr: Option<&'a LockManager>,
    log_mgr: Option<&'a LogManager>,
    txn: Option<Arc<Transaction>>,
}

impl<'a> Context<'a> {
    pub fn new(lock_mgr: &'a LockManager, log_mgr: &'a LogManager, txn: Arc<Transaction>) -> Self {
        Self {
            lock_mgr: Some(lock_mgr),
            log_mgr: Some(log_mgr),
            txn: Some(txn),
        }
    }

    /// Transaction-less context for undo replay and engine-internal reads.
    pub fn system() -> Context<'static> {
        Context {
            lock_mgr: None,
            log_mgr: None,
            txn: None,
        }
    }

    pub fn lock_mgr(&self) -> Option<&'a LockManager> {
        self.lock_mgr
    }

    pub fn log_mgr(&self) -> Option<&'a LogManager> {
        self.log_mgr
    }

    pub fn txn(&self) -> Option<&Arc<Transaction>> {
        self.txn.as_ref()
    }

    /// The single gate for write-set capture. Undo runs with no transaction
    /// and commit/abort run in SHRINKING, so nothing recorded here can ever
    /// be an undo of an undo.
    pub fn should_record_write(&self) -> bool {
        matches!(&self.txn, Some(t) if t.state() == TransactionState::Growing)
    }
}
