use pennybase::consts::catalog_consts::DB_META_FILE;
use pennybase::engine::Engine;
use pennybase::errors::catalog_error::CatalogError;
use pennybase::errors::engine_error::EngineError;
use pennybase::executer::executor::Executor;
use pennybase::executer::index_scan::IndexScanExecutor;
use pennybase::executer::insert::InsertExecutor;
use pennybase::lock::lock_manager::LockManager;
use pennybase::log_manager::LogManager;
use pennybase::transaction::context::Context;
use pennybase::transaction::transaction_manager::TransactionManager;
use pennybase::types::catalog_types::{ColDef, ColType};
use pennybase::types::filter_types::{CompOp, Condition};
use pennybase::types::record_types::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn new_db(dir: &TempDir) -> PathBuf {
    let root = dir.path().join("db");
    Engine::create_db(&root, "testdb").unwrap();
    root
}

fn int_col(name: &str) -> ColDef {
    ColDef {
        name: name.to_string(),
        ty: ColType::Int,
        len: 4,
    }
}

#[test]
fn test_create_db_twice_fails() {
    let dir = TempDir::new().unwrap();
    let root = new_db(&dir);
    let err = Engine::create_db(&root, "testdb").unwrap_err();
    assert!(matches!(err, CatalogError::DatabaseExists(_)), "{err}");
}

#[test]
fn test_open_missing_db_fails() {
    let dir = TempDir::new().unwrap();
    let err = Engine::open(&dir.path().join("nope")).err().unwrap();
    assert!(
        matches!(err, EngineError::Catalog(CatalogError::DatabaseNotFound(_))),
        "{err}"
    );
}

#[test]
fn test_drop_db_removes_directory() {
    let dir = TempDir::new().unwrap();
    let root = new_db(&dir);
    Engine::drop_db(&root).unwrap();
    assert!(!root.exists());
    let err = Engine::drop_db(&root).unwrap_err();
    assert!(matches!(err, CatalogError::DatabaseNotFound(_)), "{err}");
}

#[test]
fn test_catalog_round_trip_is_byte_stable() {
    let dir = TempDir::new().unwrap();
    let root = new_db(&dir);

    let mut engine = Engine::open(&root).unwrap();
    engine
        .create_table("t", vec![int_col("a"), int_col("b")])
        .unwrap();
    engine.create_index("t", &["a".to_string()]).unwrap();
    drop(engine);

    let first = fs::read_to_string(root.join(DB_META_FILE)).unwrap();

    // Re-read and re-write with the state unchanged.
    let engine = Engine::open(&root).unwrap();
    engine.persist().unwrap();
    let second = fs::read_to_string(root.join(DB_META_FILE)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_reopen_preserves_rows_and_rebuilds_indexes() {
    let dir = TempDir::new().unwrap();
    let root = new_db(&dir);

    let lock_mgr = LockManager::new();
    let txn_mgr = TransactionManager::new();
    let log_mgr = LogManager::open(&root.join("db.log")).unwrap();

    {
        let mut engine = Engine::open(&root).unwrap();
        engine.create_table("t", vec![int_col("id")]).unwrap();
        engine.create_index("t", &["id".to_string()]).unwrap();

        let txn = txn_mgr.begin(None);
        let ctx = Context::new(&lock_mgr, &log_mgr, txn.clone());
        for id in [3, 1, 2] {
            let mut ins =
                InsertExecutor::new(&engine, "t", vec![Value::Int(id)], &ctx).unwrap();
            ins.begin().unwrap();
        }
        txn_mgr.commit(&txn, &lock_mgr, &log_mgr).unwrap();
    }

    let engine = Engine::open(&root).unwrap();
    assert!(engine.meta().has_table("t"));

    let txn = txn_mgr.begin(None);
    let ctx = Context::new(&lock_mgr, &log_mgr, txn.clone());
    let conds = vec![Condition::with_val("t", "id", CompOp::Eq, Value::Int(2))];
    let mut scan =
        IndexScanExecutor::new(&engine, "t", conds, &["id".to_string()], &ctx).unwrap();
    scan.begin().unwrap();
    let mut count = 0;
    while !scan.is_end() {
        count += 1;
        scan.next_tuple().unwrap();
    }
    assert_eq!(count, 1);
    txn_mgr.commit(&txn, &lock_mgr, &log_mgr).unwrap();
}

#[test]
fn test_table_and_index_ddl_errors() {
    let dir = TempDir::new().unwrap();
    let root = new_db(&dir);
    let mut engine = Engine::open(&root).unwrap();

    engine.create_table("t", vec![int_col("id")]).unwrap();
    let err = engine.create_table("t", vec![int_col("id")]).unwrap_err();
    assert!(
        matches!(err, EngineError::Catalog(CatalogError::TableExists(_))),
        "{err}"
    );

    engine.create_index("t", &["id".to_string()]).unwrap();
    let err = engine.create_index("t", &["id".to_string()]).unwrap_err();
    assert!(
        matches!(err, EngineError::Catalog(CatalogError::IndexExists(_))),
        "{err}"
    );

    assert!(engine.table("t").unwrap().col("id").unwrap().indexed);

    engine.drop_index("t", &["id".to_string()]).unwrap();
    assert!(engine.index_handle("t", &["id".to_string()]).is_err());
    assert!(!engine.table("t").unwrap().col("id").unwrap().indexed);

    engine.drop_table("t").unwrap();
    assert!(engine.table("t").is_err());
    assert!(!root.join("t.tbl").exists());
}

#[test]
fn test_create_table_rejects_zero_length_column() {
    let dir = TempDir::new().unwrap();
    let root = new_db(&dir);
    let mut engine = Engine::open(&root).unwrap();

    let bad = ColDef {
        name: "c".to_string(),
        ty: ColType::Char,
        len: 0,
    };
    let err = engine.create_table("t", vec![bad]).unwrap_err();
    assert!(
        matches!(err, EngineError::Catalog(CatalogError::Invalid(_))),
        "{err}"
    );
    assert!(!engine.meta().has_table("t"));
}
