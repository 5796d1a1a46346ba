use crate::consts::page_consts::{FIRST_DATA_PAGE, NO_PAGE};
use crate::errors::engine_error::EngineError;
use crate::record::bitmap;
use crate::record::file_handle::RmFileHandle;
use crate::types::page_types::Rid;
use std::sync::Arc;

/// Forward scanner over every occupied slot of a heap file, in ascending
/// (page_no, slot_no) order. Lazy and single-pass; restart by constructing a
/// new scanner.
pub struct RmScan {
    fh: Arc<RmFileHandle>,
    num_pages: i32,
    num_records_per_page: i32,
    rid: Rid,
}

impl RmScan {
    /// Positions on the first occupied slot (or at the end for an empty file).
    pub fn new(fh: Arc<RmFileHandle>) -> Result<Self, EngineError> {
        let hdr = fh.file_header();
        let mut scan = Self {
            fh,
            num_pages: hdr.num_pages,
            num_records_per_page: hdr.num_records_per_page,
            rid: Rid::new(FIRST_DATA_PAGE, -1),
        };
        scan.next()?;
        Ok(scan)
    }

    /// Advance to the next occupied slot, or to the end.
    pub fn next(&mut self) -> Result<(), EngineError> {
        if self.is_end() {
            return Ok(());
        }

        let mut page_no = self.rid.page_no;
        let mut start = (self.rid.slot_no + 1) as usize;
        while page_no < self.num_pages {
            let map = self.fh.page_bitmap(page_no)?;
            if let Some(slot) = bitmap::next_set(&map, start, self.num_records_per_page as usize) {
                self.rid = Rid::new(page_no, slot as i32);
                return Ok(());
            }
            page_no += 1;
            start = 0;
        }

        self.rid = Rid::new(NO_PAGE, -1);
        Ok(())
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn is_end(&self) -> bool {
        self.rid.page_no == NO_PAGE
    }
}
