use std::fmt;
use thiserror::Error;

/// Why the lock manager refused a request. No-wait never blocks: a refused
/// request aborts the requesting transaction instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    LockOnShrinking,
    DeadlockPrevention,
    UpgradeConflict,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbortReason::LockOnShrinking => "lock request while shrinking",
            AbortReason::DeadlockPrevention => "no-wait conflict with a granted lock",
            AbortReason::UpgradeConflict => "lock upgrade conflict",
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("transaction {txn_id} aborted: {reason}")]
pub struct TransactionAbort {
    pub txn_id: u32,
    pub reason: AbortReason,
}
