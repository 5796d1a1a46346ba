use crate::types::page_types::Rid;
use crate::types::record_types::Record;
use std::fmt;

/// Two-phase locking lifecycle. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

/// Multi-granularity lock modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    IntentionShared,
    IntentionExclusive,
    Shared,
    SharedIntentionExclusive,
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockMode::IntentionShared => "IS",
            LockMode::IntentionExclusive => "IX",
            LockMode::Shared => "S",
            LockMode::SharedIntentionExclusive => "SIX",
            LockMode::Exclusive => "X",
        })
    }
}

/// A lockable object: a whole table or a single record, identified by the
/// owning heap file's id. Equality and hash are structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockDataId {
    Table { fd: i32 },
    Record { fd: i32, rid: Rid },
}

#[derive(Debug)]
pub struct LockRequest {
    pub txn_id: u32,
    pub mode: LockMode,
    pub granted: bool,
}

/// One undoable mutation, appended to the owning transaction's write-set in
/// commit order. Before-images are byte copies taken before the mutation.
#[derive(Debug, Clone)]
pub enum WriteRecord {
    InsertTuple {
        tab: String,
        rid: Rid,
    },
    DeleteTuple {
        tab: String,
        rid: Rid,
        before: Record,
    },
    UpdateTuple {
        tab: String,
        rid: Rid,
        before: Record,
    },
}
