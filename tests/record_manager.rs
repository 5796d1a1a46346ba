use pennybase::consts::page_consts::NO_PAGE;
use pennybase::errors::engine_error::EngineError;
use pennybase::lock::lock_manager::LockManager;
use pennybase::log_manager::LogManager;
use pennybase::record::bitmap;
use pennybase::record::file_handle::RmFileHandle;
use pennybase::record::scan::RmScan;
use pennybase::transaction::context::Context;
use pennybase::transaction::transaction::Transaction;
use pennybase::types::page_types::Rid;
use pennybase::types::transaction_types::WriteRecord;
use std::sync::Arc;
use tempfile::TempDir;

const RECORD_SIZE: usize = 512; // 7 records per 4K page with this size

fn open_heap(dir: &TempDir) -> Arc<RmFileHandle> {
    Arc::new(RmFileHandle::create(&dir.path().join("t.tbl"), "t", 0, RECORD_SIZE).unwrap())
}

fn payload(tag: u8) -> Vec<u8> {
    vec![tag; RECORD_SIZE]
}

#[test]
fn test_insert_then_get_returns_payload() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();

    let rid = fh.insert_record(&payload(0xAB), &ctx).unwrap();
    assert_eq!(rid, Rid::new(1, 0));

    let rec = fh.get_record(rid, &ctx).unwrap();
    assert_eq!(rec.data, payload(0xAB));
}

#[test]
fn test_get_missing_record_fails() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();

    fh.insert_record(&payload(1), &ctx).unwrap();

    let err = fh.get_record(Rid::new(1, 1), &ctx).unwrap_err();
    assert!(matches!(err, EngineError::RecordNotFound { .. }), "{err}");

    let err = fh.get_record(Rid::new(5, 0), &ctx).unwrap_err();
    assert!(matches!(err, EngineError::PageNotExist { .. }), "{err}");
}

#[test]
fn test_rids_ascend_and_spill_to_next_page() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();
    let per_page = fh.file_header().num_records_per_page;

    let mut rids = Vec::new();
    for i in 0..=per_page {
        rids.push(fh.insert_record(&payload(i as u8), &ctx).unwrap());
    }

    for (i, rid) in rids.iter().take(per_page as usize).enumerate() {
        assert_eq!(*rid, Rid::new(1, i as i32));
    }
    assert_eq!(rids[per_page as usize], Rid::new(2, 0));
}

#[test]
fn test_freed_slot_is_reused_first() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();

    fh.insert_record(&payload(1), &ctx).unwrap();
    let middle = fh.insert_record(&payload(2), &ctx).unwrap();
    fh.insert_record(&payload(3), &ctx).unwrap();

    fh.delete_record(middle, &ctx).unwrap();
    assert!(!fh.is_record(middle).unwrap());

    let reused = fh.insert_record(&payload(4), &ctx).unwrap();
    assert_eq!(reused, middle);
    assert_eq!(fh.get_record(reused, &ctx).unwrap().data, payload(4));
}

#[test]
fn test_full_page_leaves_free_list_and_rejoins() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();
    let per_page = fh.file_header().num_records_per_page;

    // Fill page 1 completely; a full page must leave the free list.
    for i in 0..per_page {
        fh.insert_record(&payload(i as u8), &ctx).unwrap();
    }
    assert_eq!(fh.file_header().first_free_page_no, NO_PAGE);

    // The next insert allocates page 2.
    let spill = fh.insert_record(&payload(0xEE), &ctx).unwrap();
    assert_eq!(spill.page_no, 2);
    assert_eq!(fh.file_header().first_free_page_no, 2);

    // Deleting from the full page prepends it to the list head.
    fh.delete_record(Rid::new(1, 3), &ctx).unwrap();
    assert_eq!(fh.file_header().first_free_page_no, 1);
    assert_eq!(fh.page_header(1).unwrap().next_free_page_no, 2);

    // The freed slot on page 1 is handed out before page 2 is touched again.
    assert_eq!(fh.insert_record(&payload(0xFF), &ctx).unwrap(), Rid::new(1, 3));
}

#[test]
fn test_free_list_membership_matches_occupancy() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();
    let per_page = fh.file_header().num_records_per_page;

    // Two full pages plus a partial third.
    for i in 0..(2 * per_page + 3) {
        fh.insert_record(&payload(i as u8), &ctx).unwrap();
    }
    fh.delete_record(Rid::new(1, 0), &ctx).unwrap();

    // Walk the chain from the file header.
    let hdr = fh.file_header();
    let mut chain = Vec::new();
    let mut page_no = hdr.first_free_page_no;
    while page_no != NO_PAGE {
        chain.push(page_no);
        page_no = fh.page_header(page_no).unwrap().next_free_page_no;
    }

    // A page is on the chain iff it has a free slot.
    for page_no in 1..hdr.num_pages {
        let on_chain = chain.contains(&page_no);
        let has_room = fh.page_header(page_no).unwrap().num_records < per_page;
        assert_eq!(on_chain, has_room, "page {page_no}");
    }
}

#[test]
fn test_bitmap_popcount_matches_record_count() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();
    let per_page = fh.file_header().num_records_per_page;

    let mut rids = Vec::new();
    for i in 0..(per_page + 4) {
        rids.push(fh.insert_record(&payload(i as u8), &ctx).unwrap());
    }
    for rid in rids.iter().step_by(3) {
        fh.delete_record(*rid, &ctx).unwrap();
    }

    let hdr = fh.file_header();
    for page_no in 1..hdr.num_pages {
        let page_hdr = fh.page_header(page_no).unwrap();
        let map = fh.page_bitmap(page_no).unwrap();
        assert_eq!(
            bitmap::count_set(&map, per_page as usize),
            page_hdr.num_records as usize,
            "page {page_no}"
        );
    }
}

#[test]
fn test_insert_record_at_restores_exact_slot() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();

    fh.insert_record(&payload(1), &ctx).unwrap();
    let rid = fh.insert_record(&payload(2), &ctx).unwrap();
    let before = fh.get_record(rid, &ctx).unwrap();

    fh.delete_record(rid, &ctx).unwrap();
    fh.insert_record_at(rid, &before.data).unwrap();

    assert_eq!(fh.get_record(rid, &ctx).unwrap().data, before.data);
}

#[test]
fn test_insert_record_at_validates_target() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();
    let per_page = fh.file_header().num_records_per_page;

    let rid = fh.insert_record(&payload(1), &ctx).unwrap();

    // Occupied slot.
    let err = fh.insert_record_at(rid, &payload(2)).unwrap_err();
    assert!(matches!(err, EngineError::Internal(_)), "{err}");

    // Slot outside the page.
    let err = fh.insert_record_at(Rid::new(1, per_page), &payload(2)).unwrap_err();
    assert!(matches!(err, EngineError::Internal(_)), "{err}");

    // Page outside the file (the header page included).
    let err = fh.insert_record_at(Rid::new(0, 0), &payload(2)).unwrap_err();
    assert!(matches!(err, EngineError::PageNotExist { .. }), "{err}");
    let err = fh.insert_record_at(Rid::new(9, 0), &payload(2)).unwrap_err();
    assert!(matches!(err, EngineError::PageNotExist { .. }), "{err}");
}

#[test]
fn test_update_overwrites_in_place() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();

    let rid = fh.insert_record(&payload(7), &ctx).unwrap();
    fh.update_record(rid, &payload(8), &ctx).unwrap();

    assert_eq!(fh.get_record(rid, &ctx).unwrap().data, payload(8));
    assert_eq!(fh.file_header().num_pages, 2); // no relocation
}

#[test]
fn test_scan_visits_occupied_slots_in_order() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();
    let per_page = fh.file_header().num_records_per_page;

    let mut rids = Vec::new();
    for i in 0..(per_page * 2 + 2) {
        rids.push(fh.insert_record(&payload(i as u8), &ctx).unwrap());
    }
    for rid in rids.iter().skip(1).step_by(2) {
        fh.delete_record(*rid, &ctx).unwrap();
    }
    let expected: Vec<Rid> = rids.iter().copied().step_by(2).collect();

    let mut seen = Vec::new();
    let mut scan = RmScan::new(Arc::clone(&fh)).unwrap();
    while !scan.is_end() {
        seen.push(scan.rid());
        scan.next().unwrap();
    }

    assert_eq!(seen, expected);
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted);
}

#[test]
fn test_wrong_buffer_length_is_rejected() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let ctx = Context::system();

    let err = fh.insert_record(&vec![0u8; RECORD_SIZE - 1], &ctx).unwrap_err();
    assert!(matches!(err, EngineError::Internal(_)), "{err}");
}

#[test]
fn test_write_set_capture_requires_growing_transaction() {
    let dir = TempDir::new().unwrap();
    let fh = open_heap(&dir);
    let lock_mgr = LockManager::new();
    let log_mgr = LogManager::open(&dir.path().join("db.log")).unwrap();

    let txn = Arc::new(Transaction::new(7, 7));
    let ctx = Context::new(&lock_mgr, &log_mgr, Arc::clone(&txn));

    let rid = fh.insert_record(&payload(1), &ctx).unwrap();
    fh.update_record(rid, &payload(2), &ctx).unwrap();
    fh.delete_record(rid, &ctx).unwrap();

    let ws = txn.write_set_snapshot();
    assert_eq!(ws.len(), 3);
    assert!(matches!(&ws[0], WriteRecord::InsertTuple { rid: r, .. } if *r == rid));
    assert!(
        matches!(&ws[1], WriteRecord::UpdateTuple { rid: r, before, .. } if *r == rid && before.data == payload(1))
    );
    assert!(
        matches!(&ws[2], WriteRecord::DeleteTuple { rid: r, before, .. } if *r == rid && before.data == payload(2))
    );

    // A transaction-less context mutates without capturing anything.
    let system = Context::system();
    let rid2 = fh.insert_record(&payload(9), &system).unwrap();
    fh.delete_record(rid2, &system).unwrap();
    assert_eq!(txn.write_set_snapshot().len(), 3);
}
