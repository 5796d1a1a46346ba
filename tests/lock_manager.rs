use pennybase::errors::transaction_error::AbortReason;
use pennybase::lock::lock_manager::LockManager;
use pennybase::transaction::transaction::Transaction;
use pennybase::types::page_types::Rid;
use pennybase::types::transaction_types::TransactionState;

fn txn(id: u32) -> Transaction {
    Transaction::new(id, id)
}

const FD: i32 = 0;
const ROW: Rid = Rid { page_no: 1, slot_no: 0 };

#[test]
fn test_shared_row_locks_coexist() {
    let lm = LockManager::new();
    let t1 = txn(1);
    let t2 = txn(2);

    lm.lock_shared_on_record(&t1, ROW, FD).unwrap();
    lm.lock_shared_on_record(&t2, ROW, FD).unwrap();
    assert_eq!(t1.locks_held(), 1);
    assert_eq!(t2.locks_held(), 1);
}

#[test]
fn test_exclusive_conflict_aborts_without_waiting() {
    let lm = LockManager::new();
    let t1 = txn(1);
    let t2 = txn(2);

    lm.lock_shared_on_record(&t1, ROW, FD).unwrap();
    let err = lm.lock_exclusive_on_record(&t2, ROW, FD).unwrap_err();
    assert_eq!(err.txn_id, 2);
    assert_eq!(err.reason, AbortReason::DeadlockPrevention);
    // The refused request leaves no trace.
    assert_eq!(t2.locks_held(), 0);
}

#[test]
fn test_table_mode_compatibility_matrix() {
    // (holder, requester, compatible)
    let cases = [
        ("is", "is", true),
        ("is", "ix", true),
        ("is", "s", true),
        ("is", "x", false),
        ("ix", "is", true),
        ("ix", "ix", true),
        ("ix", "s", false),
        ("s", "is", true),
        ("s", "s", true),
        ("s", "ix", false),
        ("s", "x", false),
        ("x", "is", false),
        ("x", "s", false),
        ("x", "x", false),
    ];

    for (held, requested, ok) in cases {
        let lm = LockManager::new();
        let t1 = txn(1);
        let t2 = txn(2);
        grab(&lm, &t1, held);
        let res = match requested {
            "is" => lm.lock_is_on_table(&t2, FD),
            "ix" => lm.lock_ix_on_table(&t2, FD),
            "s" => lm.lock_shared_on_table(&t2, FD),
            "x" => lm.lock_exclusive_on_table(&t2, FD),
            _ => unreachable!(),
        };
        assert_eq!(res.is_ok(), ok, "held {held}, requested {requested}");
    }
}

fn grab(lm: &LockManager, t: &Transaction, mode: &str) {
    match mode {
        "is" => lm.lock_is_on_table(t, FD).unwrap(),
        "ix" => lm.lock_ix_on_table(t, FD).unwrap(),
        "s" => lm.lock_shared_on_table(t, FD).unwrap(),
        "x" => lm.lock_exclusive_on_table(t, FD).unwrap(),
        _ => unreachable!(),
    }
}

#[test]
fn test_s_to_x_upgrade_succeeds_when_alone() {
    let lm = LockManager::new();
    let t1 = txn(1);

    lm.lock_shared_on_record(&t1, ROW, FD).unwrap();
    lm.lock_exclusive_on_record(&t1, ROW, FD).unwrap();

    // Upgraded in place: still one lock, and it now blocks readers.
    assert_eq!(t1.locks_held(), 1);
    let t2 = txn(2);
    let err = lm.lock_shared_on_record(&t2, ROW, FD).unwrap_err();
    assert_eq!(err.reason, AbortReason::DeadlockPrevention);
}

#[test]
fn test_s_to_x_upgrade_conflicts_with_other_reader() {
    let lm = LockManager::new();
    let t1 = txn(1);
    let t2 = txn(2);

    lm.lock_shared_on_record(&t1, ROW, FD).unwrap();
    lm.lock_shared_on_record(&t2, ROW, FD).unwrap();

    let err = lm.lock_exclusive_on_record(&t1, ROW, FD).unwrap_err();
    assert_eq!(err.reason, AbortReason::UpgradeConflict);
}

#[test]
fn test_is_to_ix_upgrade() {
    let lm = LockManager::new();
    let t1 = txn(1);

    lm.lock_is_on_table(&t1, FD).unwrap();
    lm.lock_ix_on_table(&t1, FD).unwrap();

    // Another IS holder does not block the upgrade (IX and IS agree).
    let lm2 = LockManager::new();
    let t3 = txn(3);
    let t4 = txn(4);
    lm2.lock_is_on_table(&t3, FD).unwrap();
    lm2.lock_is_on_table(&t4, FD).unwrap();
    lm2.lock_ix_on_table(&t3, FD).unwrap();

    // A shared holder does: IX is incompatible with S.
    let lm3 = LockManager::new();
    let t5 = txn(5);
    let t6 = txn(6);
    lm3.lock_is_on_table(&t5, FD).unwrap();
    lm3.lock_shared_on_table(&t6, FD).unwrap();
    let err = lm3.lock_ix_on_table(&t5, FD).unwrap_err();
    assert_eq!(err.reason, AbortReason::UpgradeConflict);
}

#[test]
fn test_ix_plus_s_combines_to_six() {
    let lm = LockManager::new();
    let t1 = txn(1);

    lm.lock_ix_on_table(&t1, FD).unwrap();
    lm.lock_shared_on_table(&t1, FD).unwrap();

    // SIX admits intention readers and nothing else.
    let t2 = txn(2);
    lm.lock_is_on_table(&t2, FD).unwrap();

    let t3 = txn(3);
    assert_eq!(
        lm.lock_ix_on_table(&t3, FD).unwrap_err().reason,
        AbortReason::DeadlockPrevention
    );
    let t4 = txn(4);
    assert_eq!(
        lm.lock_shared_on_table(&t4, FD).unwrap_err().reason,
        AbortReason::DeadlockPrevention
    );
}

#[test]
fn test_weaker_request_keeps_current_mode() {
    let lm = LockManager::new();
    let t1 = txn(1);

    lm.lock_exclusive_on_table(&t1, FD).unwrap();
    // X absorbs everything below it.
    lm.lock_is_on_table(&t1, FD).unwrap();
    lm.lock_ix_on_table(&t1, FD).unwrap();
    lm.lock_shared_on_table(&t1, FD).unwrap();
    assert_eq!(t1.locks_held(), 1);

    let t2 = txn(2);
    assert!(lm.lock_is_on_table(&t2, FD).is_err());
}

#[test]
fn test_shrinking_transaction_cannot_lock() {
    let lm = LockManager::new();
    let t1 = txn(1);

    lm.lock_shared_on_record(&t1, ROW, FD).unwrap();
    t1.set_state(TransactionState::Shrinking);

    let err = lm.lock_shared_on_table(&t1, FD).unwrap_err();
    assert_eq!(err.reason, AbortReason::LockOnShrinking);
}

#[test]
fn test_first_unlock_forces_shrinking() {
    let lm = LockManager::new();
    let t1 = txn(1);

    lm.lock_shared_on_record(&t1, ROW, FD).unwrap();
    let id = t1.lock_set_snapshot()[0];
    lm.unlock(&t1, id);

    assert_eq!(t1.state(), TransactionState::Shrinking);
    assert_eq!(t1.locks_held(), 0);
    assert_eq!(
        lm.lock_shared_on_record(&t1, ROW, FD).unwrap_err().reason,
        AbortReason::LockOnShrinking
    );
}

#[test]
fn test_unlock_frees_the_object_for_others() {
    let lm = LockManager::new();
    let t1 = txn(1);
    let t2 = txn(2);

    lm.lock_exclusive_on_record(&t1, ROW, FD).unwrap();
    assert!(lm.lock_exclusive_on_record(&t2, ROW, FD).is_err());

    for id in t1.lock_set_snapshot() {
        lm.unlock(&t1, id);
    }
    lm.lock_exclusive_on_record(&t2, ROW, FD).unwrap();
}

#[test]
fn test_table_and_record_locks_are_distinct_objects() {
    let lm = LockManager::new();
    let t1 = txn(1);
    let t2 = txn(2);

    // Row X under table IX; a second transaction can still reach the table
    // with IX and a different row with X.
    lm.lock_ix_on_table(&t1, FD).unwrap();
    lm.lock_exclusive_on_record(&t1, ROW, FD).unwrap();

    lm.lock_ix_on_table(&t2, FD).unwrap();
    let other = Rid { page_no: 1, slot_no: 1 };
    lm.lock_exclusive_on_record(&t2, other, FD).unwrap();

    assert!(lm.lock_exclusive_on_record(&t2, ROW, FD).is_err());
}
