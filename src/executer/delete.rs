use crate::engine::Engine;
use crate::errors::engine_error::EngineError;
use crate::executer::executor::Executor;
use crate::index::handle::IxIndexHandle;
use crate::index::key::composite_key;
use crate::record::file_handle::RmFileHandle;
use crate::transaction::context::Context;
use crate::types::catalog_types::{ColMeta, TabMeta};
use crate::types::page_types::Rid;
use crate::types::record_types::Record;
use std::sync::Arc;

/// Delete the given rids (collected by the caller's scan). Each record is
/// read before it is removed: the read takes IS + S and provides the bytes
/// the index keys are composed from, and the following delete upgrades the
/// record lock S → X.
pub struct DeleteExecutor<'a> {
    tab: TabMeta,
    fh: Arc<RmFileHandle>,
    indexes: Vec<Arc<IxIndexHandle>>,
    rids: Vec<Rid>,
    done: bool,
    ctx: &'a Context<'a>,
}

impl<'a> DeleteExecutor<'a> {
    pub fn new(
        engine: &Engine,
        tab_name: &str,
        rids: Vec<Rid>,
        ctx: &'a Context<'a>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            tab: engine.table(tab_name)?.clone(),
            fh: Arc::clone(engine.heap(tab_name)?),
            indexes: engine.table_indexes(tab_name)?,
            rids,
            done: false,
            ctx,
        })
    }
}

impl Executor for DeleteExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.tab.record_size()
    }

    fn cols(&self) -> &[ColMeta] {
        &self.tab.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        for &rid in &self.rids {
            // Fetch the old bytes first; the index keys must exist while the
            // entries are being deleted.
            let rec = self.fh.get_record(rid, self.ctx)?;

            for ih in &self.indexes {
                let key = composite_key(ih.meta(), &rec.data);
                ih.delete_entry(&key, rid);
            }

            self.fh.delete_record(rid, self.ctx)?;
        }
        self.done = true;
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn is_end(&self) -> bool {
        self.done
    }

    fn current(&mut self) -> Result<Option<Record>, EngineError> {
        Ok(None)
    }
}
