use crate::consts::page_consts::{
    FILE_HEADER_PAGE, FILE_HEADER_SIZE, NO_PAGE, PAGE_HEADER_SIZE, PAGE_SIZE,
};
use crate::errors::engine_error::EngineError;
use crate::record::bitmap;
use crate::types::page_types::{FileHeader, PageHeader, Rid};
use crate::types::record_types::Record;
use crate::types::transaction_types::WriteRecord;
use crate::transaction::context::Context;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Mutex;
use tracing::trace;

/// Heap file handle: fixed-length records over slotted pages with a per-page
/// occupancy bitmap and a file-level free-page list threaded through the page
/// headers. Page 0 is the file header; data pages start at 1.
///
/// All structural mutation happens behind the header latch, which stands in
/// for per-page pin/unpin of a buffer layer. Every public call either
/// completes and leaves the invariants intact or returns without mutation.
pub struct RmFileHandle {
    tab_name: String,
    fd: i32, // lock id for this heap file
    file: File,
    hdr: Mutex<FileHeader>,
}

impl RmFileHandle {
    /// Create a fresh heap file: header page only, empty free list.
    pub fn create(path: &Path, tab_name: &str, fd: i32, record_size: usize) -> Result<Self, EngineError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        let hdr = FileHeader::for_record_size(record_size as i32);
        if hdr.num_records_per_page < 1 {
            return Err(EngineError::Internal(format!(
                "record size {} does not fit a page",
                record_size
            )));
        }

        let mut page = vec![0u8; PAGE_SIZE];
        page[..FILE_HEADER_SIZE].copy_from_slice(&hdr.to_bytes());
        file.write_all_at(&page, 0)?;

        Ok(Self {
            tab_name: tab_name.to_string(),
            fd,
            file,
            hdr: Mutex::new(hdr),
        })
    }

    /// Open an existing heap file and cache its header page.
    pub fn open(path: &Path, tab_name: &str, fd: i32) -> Result<Self, EngineError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut buf = [0u8; FILE_HEADER_SIZE];
        file.read_exact_at(&mut buf, 0)?;
        let hdr = FileHeader::from_bytes(&buf);

        Ok(Self {
            tab_name: tab_name.to_string(),
            fd,
            file,
            hdr: Mutex::new(hdr),
        })
    }

    pub fn fd(&self) -> i32 {
        self.fd
    }

    pub fn tab_name(&self) -> &str {
        &self.tab_name
    }

    pub fn file_header(&self) -> FileHeader {
        *self.hdr.lock().unwrap()
    }

    /// Read the record at `rid`. Acquires table IS + record S when the context
    /// carries a transaction and lock manager.
    pub fn get_record(&self, rid: Rid, ctx: &Context) -> Result<Record, EngineError> {
        if let (Some(txn), Some(lock_mgr)) = (ctx.txn(), ctx.lock_mgr()) {
            lock_mgr.lock_is_on_table(txn, self.fd)?;
            lock_mgr.lock_shared_on_record(txn, rid, self.fd)?;
        }

        let hdr = self.hdr.lock().unwrap();
        let page = self.read_page(rid.page_no, &hdr)?;
        self.require_slot(&hdr, &page, rid)?;
        Ok(Record::from_bytes(self.slot(&hdr, &page, rid.slot_no)))
    }

    /// Insert a record into the first free slot of the first free page,
    /// allocating a new page when the free list is empty. Acquires table IX.
    pub fn insert_record(&self, buf: &[u8], ctx: &Context) -> Result<Rid, EngineError> {
        if let (Some(txn), Some(lock_mgr)) = (ctx.txn(), ctx.lock_mgr()) {
            lock_mgr.lock_ix_on_table(txn, self.fd)?;
        }

        let mut hdr = self.hdr.lock().unwrap();
        self.require_record_size(&hdr, buf)?;

        if hdr.first_free_page_no == NO_PAGE {
            self.allocate_page(&mut hdr)?;
        }
        let page_no = hdr.first_free_page_no;
        let mut page = self.read_page(page_no, &hdr)?;
        let mut page_hdr = PageHeader::from_bytes(&page);

        let slot_no = bitmap::first_zero(
            self.page_bitmap_of(&hdr, &page),
            hdr.num_records_per_page as usize,
        )
        .ok_or_else(|| EngineError::Internal("no free slot on free-list page".to_string()))?;

        self.slot_mut(&hdr, &mut page, slot_no as i32)
            .copy_from_slice(buf);
        bitmap::set(self.page_bitmap_mut(&hdr, &mut page), slot_no);
        page_hdr.num_records += 1;

        // A full page leaves the free list.
        if page_hdr.num_records == hdr.num_records_per_page {
            hdr.first_free_page_no = page_hdr.next_free_page_no;
            self.write_file_header(&hdr)?;
        }

        page[..PAGE_HEADER_SIZE].copy_from_slice(&page_hdr.to_bytes());
        self.write_page(page_no, &page)?;
        drop(hdr);

        let rid = Rid::new(page_no, slot_no as i32);
        if ctx.should_record_write() {
            if let Some(txn) = ctx.txn() {
                txn.append_write_record(WriteRecord::InsertTuple {
                    tab: self.tab_name.clone(),
                    rid,
                });
            }
        }
        Ok(rid)
    }

    /// Insert a record back into a specific slot. Undo path: no locks, no
    /// write-set capture; the target slot must be vacant.
    pub fn insert_record_at(&self, rid: Rid, buf: &[u8]) -> Result<(), EngineError> {
        let mut hdr = self.hdr.lock().unwrap();
        self.require_record_size(&hdr, buf)?;

        if rid.page_no <= FILE_HEADER_PAGE || rid.page_no >= hdr.num_pages {
            return Err(EngineError::PageNotExist {
                tab: self.tab_name.clone(),
                page_no: rid.page_no,
            });
        }
        if rid.slot_no < 0 || rid.slot_no >= hdr.num_records_per_page {
            return Err(EngineError::Internal(format!(
                "insert_record_at: invalid slot_no {}",
                rid.slot_no
            )));
        }

        let mut page = self.read_page(rid.page_no, &hdr)?;
        let mut page_hdr = PageHeader::from_bytes(&page);

        if bitmap::is_set(self.page_bitmap_of(&hdr, &page), rid.slot_no as usize) {
            return Err(EngineError::Internal(format!(
                "insert_record_at: slot {} already occupied",
                rid
            )));
        }

        self.slot_mut(&hdr, &mut page, rid.slot_no).copy_from_slice(buf);
        bitmap::set(self.page_bitmap_mut(&hdr, &mut page), rid.slot_no as usize);
        page_hdr.num_records += 1;

        // If the free-list head just filled up, advance it.
        if page_hdr.num_records == hdr.num_records_per_page
            && hdr.first_free_page_no == rid.page_no
        {
            hdr.first_free_page_no = page_hdr.next_free_page_no;
            self.write_file_header(&hdr)?;
        }

        page[..PAGE_HEADER_SIZE].copy_from_slice(&page_hdr.to_bytes());
        self.write_page(rid.page_no, &page)
    }

    /// Delete the record at `rid`. Acquires table IX + record X (upgrading a
    /// held S); captures the before-image while the transaction is growing.
    pub fn delete_record(&self, rid: Rid, ctx: &Context) -> Result<(), EngineError> {
        if let (Some(txn), Some(lock_mgr)) = (ctx.txn(), ctx.lock_mgr()) {
            lock_mgr.lock_ix_on_table(txn, self.fd)?;
            lock_mgr.lock_exclusive_on_record(txn, rid, self.fd)?;
        }

        let mut hdr = self.hdr.lock().unwrap();
        let mut page = self.read_page(rid.page_no, &hdr)?;
        let mut page_hdr = PageHeader::from_bytes(&page);
        self.require_slot(&hdr, &page, rid)?;

        let was_full = page_hdr.num_records == hdr.num_records_per_page;

        if ctx.should_record_write() {
            if let Some(txn) = ctx.txn() {
                txn.append_write_record(WriteRecord::DeleteTuple {
                    tab: self.tab_name.clone(),
                    rid,
                    before: Record::from_bytes(self.slot(&hdr, &page, rid.slot_no)),
                });
            }
        }

        bitmap::reset(self.page_bitmap_mut(&hdr, &mut page), rid.slot_no as usize);
        page_hdr.num_records -= 1;

        // Full → not-full: prepend the page to the free list.
        if was_full {
            page_hdr.next_free_page_no = hdr.first_free_page_no;
            hdr.first_free_page_no = rid.page_no;
            self.write_file_header(&hdr)?;
            trace!(tab = %self.tab_name, page_no = rid.page_no, "page rejoined free list");
        }

        page[..PAGE_HEADER_SIZE].copy_from_slice(&page_hdr.to_bytes());
        self.write_page(rid.page_no, &page)
    }

    /// Overwrite the record at `rid` in place. Acquires table IX + record X;
    /// captures the before-image while the transaction is growing.
    pub fn update_record(&self, rid: Rid, buf: &[u8], ctx: &Context) -> Result<(), EngineError> {
        if let (Some(txn), Some(lock_mgr)) = (ctx.txn(), ctx.lock_mgr()) {
            lock_mgr.lock_ix_on_table(txn, self.fd)?;
            lock_mgr.lock_exclusive_on_record(txn, rid, self.fd)?;
        }

        let hdr = self.hdr.lock().unwrap();
        self.require_record_size(&hdr, buf)?;
        let mut page = self.read_page(rid.page_no, &hdr)?;
        self.require_slot(&hdr, &page, rid)?;

        if ctx.should_record_write() {
            if let Some(txn) = ctx.txn() {
                txn.append_write_record(WriteRecord::UpdateTuple {
                    tab: self.tab_name.clone(),
                    rid,
                    before: Record::from_bytes(self.slot(&hdr, &page, rid.slot_no)),
                });
            }
        }

        self.slot_mut(&hdr, &mut page, rid.slot_no).copy_from_slice(buf);
        self.write_page(rid.page_no, &page)
    }

    /// Whether the slot bit for `rid` is set.
    pub fn is_record(&self, rid: Rid) -> Result<bool, EngineError> {
        let hdr = self.hdr.lock().unwrap();
        if rid.page_no <= FILE_HEADER_PAGE
            || rid.page_no >= hdr.num_pages
            || rid.slot_no < 0
            || rid.slot_no >= hdr.num_records_per_page
        {
            return Ok(false);
        }
        let page = self.read_page(rid.page_no, &hdr)?;
        Ok(bitmap::is_set(
            self.page_bitmap_of(&hdr, &page),
            rid.slot_no as usize,
        ))
    }

    pub fn page_header(&self, page_no: i32) -> Result<PageHeader, EngineError> {
        let hdr = self.hdr.lock().unwrap();
        let page = self.read_page(page_no, &hdr)?;
        Ok(PageHeader::from_bytes(&page))
    }

    pub fn page_bitmap(&self, page_no: i32) -> Result<Vec<u8>, EngineError> {
        let hdr = self.hdr.lock().unwrap();
        let page = self.read_page(page_no, &hdr)?;
        Ok(self.page_bitmap_of(&hdr, &page).to_vec())
    }

    // ---- internals ----

    /// Append a fresh data page and make it the free-list head.
    fn allocate_page(&self, hdr: &mut FileHeader) -> Result<(), EngineError> {
        let page_no = hdr.num_pages;
        let mut page = vec![0u8; PAGE_SIZE];
        let page_hdr = PageHeader {
            num_records: 0,
            next_free_page_no: NO_PAGE,
        };
        page[..PAGE_HEADER_SIZE].copy_from_slice(&page_hdr.to_bytes());
        self.write_page(page_no, &page)?;

        hdr.num_pages += 1;
        hdr.first_free_page_no = page_no;
        self.write_file_header(hdr)?;
        trace!(tab = %self.tab_name, page_no, "allocated heap page");
        Ok(())
    }

    fn read_page(&self, page_no: i32, hdr: &FileHeader) -> Result<Vec<u8>, EngineError> {
        if page_no <= FILE_HEADER_PAGE || page_no >= hdr.num_pages {
            return Err(EngineError::PageNotExist {
                tab: self.tab_name.clone(),
                page_no,
            });
        }
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file
            .read_exact_at(&mut buf, page_no as u64 * PAGE_SIZE as u64)?;
        Ok(buf)
    }

    fn write_page(&self, page_no: i32, buf: &[u8]) -> Result<(), EngineError> {
        self.file
            .write_all_at(buf, page_no as u64 * PAGE_SIZE as u64)?;
        Ok(())
    }

    fn write_file_header(&self, hdr: &FileHeader) -> Result<(), EngineError> {
        self.file.write_all_at(&hdr.to_bytes(), 0)?;
        Ok(())
    }

    fn require_record_size(&self, hdr: &FileHeader, buf: &[u8]) -> Result<(), EngineError> {
        if buf.len() != hdr.record_size as usize {
            return Err(EngineError::Internal(format!(
                "record buffer is {} bytes, table '{}' stores {}",
                buf.len(),
                self.tab_name,
                hdr.record_size
            )));
        }
        Ok(())
    }

    fn require_slot(&self, hdr: &FileHeader, page: &[u8], rid: Rid) -> Result<(), EngineError> {
        if rid.slot_no < 0
            || rid.slot_no >= hdr.num_records_per_page
            || !bitmap::is_set(self.page_bitmap_of(hdr, page), rid.slot_no as usize)
        {
            return Err(EngineError::RecordNotFound {
                page_no: rid.page_no,
                slot_no: rid.slot_no,
            });
        }
        Ok(())
    }

    fn page_bitmap_of<'p>(&self, hdr: &FileHeader, page: &'p [u8]) -> &'p [u8] {
        &page[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + hdr.bitmap_size as usize]
    }

    fn page_bitmap_mut<'p>(&self, hdr: &FileHeader, page: &'p mut [u8]) -> &'p mut [u8] {
        &mut page[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + hdr.bitmap_size as usize]
    }

    fn slot_start(&self, hdr: &FileHeader, slot_no: i32) -> usize {
        PAGE_HEADER_SIZE + hdr.bitmap_size as usize + slot_no as usize * hdr.record_size as usize
    }

    fn slot<'p>(&self, hdr: &FileHeader, page: &'p [u8], slot_no: i32) -> &'p [u8] {
        let start = self.slot_start(hdr, slot_no);
        &page[start..start + hdr.record_size as usize]
    }

    fn slot_mut<'p>(&self, hdr: &FileHeader, page: &'p mut [u8], slot_no: i32) -> &'p mut [u8] {
        let start = self.slot_start(hdr, slot_no);
        &mut page[start..start + hdr.record_size as usize]
    }
}
