use crate::engine::Engine;
use crate::errors::engine_error::EngineError;
use crate::executer::executor::{eval_conds, Executor};
use crate::record::file_handle::RmFileHandle;
use crate::record::scan::RmScan;
use crate::transaction::context::Context;
use crate::types::catalog_types::ColMeta;
use crate::types::filter_types::Condition;
use crate::types::page_types::Rid;
use crate::types::record_types::Record;
use std::sync::Arc;

/// Full-table scan filtered by a conjunction of conditions. Rows are read
/// through the record manager, which takes table IS + record S per row; no
/// table-level S lock is taken up front (index scans do that instead).
pub struct SeqScanExecutor<'a> {
    fh: Arc<RmFileHandle>,
    cols: Vec<ColMeta>,
    len: usize,
    conds: Vec<Condition>,
    scan: Option<RmScan>,
    rid: Rid,
    ctx: &'a Context<'a>,
}

impl<'a> SeqScanExecutor<'a> {
    pub fn new(
        engine: &Engine,
        tab_name: &str,
        conds: Vec<Condition>,
        ctx: &'a Context<'a>,
    ) -> Result<Self, EngineError> {
        let tab = engine.table(tab_name)?;
        let cols = tab.cols.clone();
        let len = tab.record_size();
        Ok(Self {
            fh: Arc::clone(engine.heap(tab_name)?),
            cols,
            len,
            conds,
            scan: None,
            rid: Rid::INVALID,
            ctx,
        })
    }

    fn satisfy(&self, rid: Rid) -> Result<bool, EngineError> {
        let rec = self.fh.get_record(rid, self.ctx)?;
        eval_conds(&self.cols, &self.conds, &rec)
    }

    /// Walk the scanner forward until it sits on a matching record.
    fn seek_match(&mut self) -> Result<(), EngineError> {
        loop {
            let rid = match self.scan.as_ref() {
                None => return Ok(()),
                Some(scan) if scan.is_end() => {
                    self.rid = Rid::INVALID;
                    return Ok(());
                }
                Some(scan) => scan.rid(),
            };
            if self.satisfy(rid)? {
                self.rid = rid;
                return Ok(());
            }
            if let Some(scan) = self.scan.as_mut() {
                scan.next()?;
            }
        }
    }
}

impl Executor for SeqScanExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.len
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        self.scan = Some(RmScan::new(Arc::clone(&self.fh))?);
        self.seek_match()
    }

    fn next_tuple(&mut self) -> Result<(), EngineError> {
        if self.is_end() {
            return Ok(());
        }
        if let Some(scan) = self.scan.as_mut() {
            scan.next()?;
        }
        self.seek_match()
    }

    fn is_end(&self) -> bool {
        self.scan.as_ref().map_or(true, |s| s.is_end())
    }

    fn current(&mut self) -> Result<Option<Record>, EngineError> {
        if self.is_end() {
            return Ok(None);
        }
        Ok(Some(self.fh.get_record(self.rid, self.ctx)?))
    }

    fn rid(&self) -> Rid {
        self.rid
    }
}
