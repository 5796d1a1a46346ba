use crate::engine::Engine;
use crate::errors::engine_error::EngineError;
use crate::executer::executor::Executor;
use crate::index::handle::IxIndexHandle;
use crate::index::key::composite_key;
use crate::record::file_handle::RmFileHandle;
use crate::transaction::context::Context;
use crate::types::catalog_types::{ColMeta, TabMeta};
use crate::types::filter_types::SetClause;
use crate::types::page_types::Rid;
use crate::types::record_types::Record;
use std::sync::Arc;

/// Apply set clauses to the given rids. Only the indexes whose key overlaps
/// an assigned column are maintained: old key deleted before the heap write,
/// new key inserted after it, so the heap payload always backs the live key.
pub struct UpdateExecutor<'a> {
    tab: TabMeta,
    fh: Arc<RmFileHandle>,
    affected_indexes: Vec<Arc<IxIndexHandle>>,
    set_clauses: Vec<SetClause>,
    rids: Vec<Rid>,
    done: bool,
    ctx: &'a Context<'a>,
}

impl<'a> UpdateExecutor<'a> {
    pub fn new(
        engine: &Engine,
        tab_name: &str,
        set_clauses: Vec<SetClause>,
        rids: Vec<Rid>,
        ctx: &'a Context<'a>,
    ) -> Result<Self, EngineError> {
        let tab = engine.table(tab_name)?.clone();

        // Every assigned column must exist; this also surfaces typos before
        // any row is touched.
        for sc in &set_clauses {
            tab.col(&sc.col)?;
        }

        let affected_indexes = engine
            .table_indexes(tab_name)?
            .into_iter()
            .filter(|ih| {
                ih.meta()
                    .cols
                    .iter()
                    .any(|ic| set_clauses.iter().any(|sc| sc.col == ic.name))
            })
            .collect();

        Ok(Self {
            fh: Arc::clone(engine.heap(tab_name)?),
            affected_indexes,
            tab,
            set_clauses,
            rids,
            done: false,
            ctx,
        })
    }
}

impl Executor for UpdateExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.tab.record_size()
    }

    fn cols(&self) -> &[ColMeta] {
        &self.tab.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        for &rid in &self.rids {
            let mut rec: Record = self.fh.get_record(rid, self.ctx)?;

            // Old keys come off the affected indexes before the heap changes.
            for ih in &self.affected_indexes {
                let old_key = composite_key(ih.meta(), &rec.data);
                ih.delete_entry(&old_key, rid);
            }

            for sc in &self.set_clauses {
                let col = self.tab.col(&sc.col)?;
                sc.val.write_to(&mut rec.data, col)?;
            }

            self.fh.update_record(rid, &rec.data, self.ctx)?;

            for ih in &self.affected_indexes {
                let new_key = composite_key(ih.meta(), &rec.data);
                ih.insert_entry(new_key, rid);
            }
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
