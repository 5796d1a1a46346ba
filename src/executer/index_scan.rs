use crate::engine::Engine;
use crate::errors::engine_error::EngineError;
use crate::executer::executor::{eval_conds, Executor};
use crate::index::handle::{IxIndexHandle, IxScan};
use crate::index::key::encode_value;
use crate::record::file_handle::RmFileHandle;
use crate::transaction::context::Context;
use crate::types::catalog_types::{ColMeta, IndexMeta};
use crate::types::filter_types::{CompOp, CondRhs, Condition};
use crate::types::page_types::Rid;
use crate::types::record_types::Record;
use std::sync::Arc;

/// Range scan over a secondary index. When every index column carries an
/// equality-with-constant condition the scan probes
/// [lower_bound(key), upper_bound(key)); otherwise it degrades to the full
/// leaf range. Remaining conditions are applied as a residual filter against
/// the heap record.
pub struct IndexScanExecutor<'a> {
    tab_name: String,
    fh: Arc<RmFileHandle>,
    ih: Arc<IxIndexHandle>,
    index_meta: IndexMeta,
    cols: Vec<ColMeta>,
    len: usize,
    conds: Vec<Condition>,
    scan: Option<IxScan>,
    rid: Rid,
    ctx: &'a Context<'a>,
}

impl<'a> IndexScanExecutor<'a> {
    pub fn new(
        engine: &Engine,
        tab_name: &str,
        mut conds: Vec<Condition>,
        index_col_names: &[String],
        ctx: &'a Context<'a>,
    ) -> Result<Self, EngineError> {
        let tab = engine.table(tab_name)?;
        let index_meta = tab
            .index_meta(index_col_names)
            .ok_or_else(|| {
                crate::errors::catalog_error::CatalogError::IndexNotFound(format!(
                    "{}({})",
                    tab_name,
                    index_col_names.join(", ")
                ))
            })?
            .clone();

        // Normalize each condition so its left side names this table; the
        // operator flips when the sides swap.
        for cond in &mut conds {
            if !cond.lhs.tab.is_empty() && cond.lhs.tab != tab_name {
                let rhs = match &cond.rhs {
                    CondRhs::Col(c) if c.tab == tab_name => c.clone(),
                    _ => {
                        return Err(EngineError::Internal(format!(
                            "condition on '{}' does not reference table '{}'",
                            cond.lhs.tab, tab_name
                        )))
                    }
                };
                let old_lhs = std::mem::replace(&mut cond.lhs, rhs);
                cond.rhs = CondRhs::Col(old_lhs);
                cond.op = cond.op.swapped();
            }
        }

        let cols = tab.cols.clone();
        let len = tab.record_size();
        Ok(Self {
            tab_name: tab_name.to_string(),
            fh: Arc::clone(engine.heap(tab_name)?),
            ih: engine.index_handle(tab_name, index_col_names)?,
            index_meta,
            cols,
            len,
            conds,
            scan: None,
            rid: Rid::INVALID,
            ctx,
        })
    }

    /// Compose an equality probe key by matching every index column, in
    /// order, to an equality-with-constant condition. Returns None if any
    /// column lacks one.
    fn probe_key(&self) -> Result<Option<Vec<u8>>, EngineError> {
        let mut key = Vec::with_capacity(self.index_meta.col_tot_len);
        for col in &self.index_meta.cols {
            let eq = self.conds.iter().find(|cond| {
                cond.op == CompOp::Eq
                    && cond.lhs.col == col.name
                    && (cond.lhs.tab.is_empty() || cond.lhs.tab == self.tab_name)
                    && matches!(cond.rhs, CondRhs::Val(_))
            });
            match eq {
                Some(cond) => {
                    if let CondRhs::Val(val) = &cond.rhs {
                        key.extend_from_slice(&encode_value(col, val)?);
                    }
                }
                None => return Ok(None),
            }
        }
        Ok(Some(key))
    }

    fn satisfy(&self, rid: Rid) -> Result<bool, EngineError> {
        let rec = self.fh.get_record(rid, self.ctx)?;
        eval_conds(&self.cols, &self.conds, &rec)
    }

    /// Advance inside the leaf range to the next rid that still holds a
    /// record and passes the residual filter.
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
            if self.fh.is_record(rid)? && self.satisfy(rid)? {
                self.rid = rid;
                return Ok(());
            }
            if let Some(scan) = self.scan.as_mut() {
                scan.next();
            }
        }
    }
}

impl Executor for IndexScanExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.len
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        // Scanning a range of the table: hold a table-level S lock to keep
        // other transactions from inserting into the range until we finish.
        if let (Some(txn), Some(lock_mgr)) = (self.ctx.txn(), self.ctx.lock_mgr()) {
            lock_mgr.lock_shared_on_table(txn, self.fh.fd())?;
        }

        let (lower, upper) = match self.probe_key()? {
            Some(key) => (self.ih.lower_bound(&key), self.ih.upper_bound(&key)),
            None => (self.ih.leaf_begin(), self.ih.leaf_end()),
        };
        self.scan = Some(self.ih.scan(lower, upper));
        self.seek_match()
    }

    fn next_tuple(&mut self) -> Result<(), EngineError> {
        if self.is_end() {
            return Ok(());
        }
        if let Some(scan) = self.scan.as_mut() {
            scan.next();
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
