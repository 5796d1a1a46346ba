use crate::engine::Engine;
use crate::errors::engine_error::EngineError;
use crate::executer::executor::Executor;
use crate::index::handle::IxIndexHandle;
use crate::index::key::composite_key;
use crate::record::file_handle::RmFileHandle;
use crate::transaction::context::Context;
use crate::types::catalog_types::{ColMeta, TabMeta};
use crate::types::page_types::Rid;
use crate::types::record_types::{Record, Value};
use std::sync::Arc;

/// Insert one row given a value per column in table column order. The heap
/// insert takes the table IX lock inside the record manager; every index on
/// the table then receives the (composite key, rid) entry.
pub struct InsertExecutor<'a> {
    tab: TabMeta,
    fh: Arc<RmFileHandle>,
    indexes: Vec<Arc<IxIndexHandle>>,
    values: Vec<Value>,
    rid: Rid,
    done: bool,
    ctx: &'a Context<'a>,
}

impl<'a> InsertExecutor<'a> {
    pub fn new(
        engine: &Engine,
        tab_name: &str,
        values: Vec<Value>,
        ctx: &'a Context<'a>,
    ) -> Result<Self, EngineError> {
        let tab = engine.table(tab_name)?.clone();
        if values.len() != tab.cols.len() {
            return Err(EngineError::Internal(format!(
                "insert into '{}' expects {} values, got {}",
                tab_name,
                tab.cols.len(),
                values.len()
            )));
        }
        Ok(Self {
            fh: Arc::clone(engine.heap(tab_name)?),
            indexes: engine.table_indexes(tab_name)?,
            tab,
            values,
            rid: Rid::INVALID,
            done: false,
            ctx,
        })
    }
}

impl Executor for InsertExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.tab.record_size()
    }

    fn cols(&self) -> &[ColMeta] {
        &self.tab.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        let mut rec = Record::new(self.tab.record_size());
        for (col, val) in self.tab.cols.iter().zip(&self.values) {
            val.write_to(&mut rec.data, col)?;
        }

        let rid = self.fh.insert_record(&rec.data, self.ctx)?;
        for ih in &self.indexes {
            let key = composite_key(ih.meta(), &rec.data);
            ih.insert_entry(key, rid);
        }

        self.rid = rid;
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

    fn rid(&self) -> Rid {
        self.rid
    }
}
