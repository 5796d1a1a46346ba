use crate::errors::engine_error::EngineError;
use crate::executer::executor::{get_col_idx, Executor};
use crate::types::catalog_types::ColMeta;
use crate::types::filter_types::TabCol;
use crate::types::record_types::Record;

/// Column selection and reordering. Output offsets are the packed running
/// sums of the selected column lengths.
pub struct ProjectionExecutor<'a> {
    child: Box<dyn Executor + 'a>,
    cols: Vec<ColMeta>,
    sel_idxs: Vec<usize>,
    len: usize,
}

impl<'a> ProjectionExecutor<'a> {
    pub fn new(
        child: Box<dyn Executor + 'a>,
        sel_cols: &[TabCol],
    ) -> Result<Self, EngineError> {
        let mut cols = Vec::with_capacity(sel_cols.len());
        let mut sel_idxs = Vec::with_capacity(sel_cols.len());
        let mut offset = 0usize;
        for sel in sel_cols {
            let idx = get_col_idx(child.cols(), sel)?;
            let mut col = child.cols()[idx].clone();
            col.offset = offset;
            offset += col.len;
            cols.push(col);
            sel_idxs.push(idx);
        }
        Ok(Self {
            child,
            cols,
            sel_idxs,
            len: offset,
        })
    }
}

impl Executor for ProjectionExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.len
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        self.child.begin()
    }

    fn next_tuple(&mut self) -> Result<(), EngineError> {
        self.child.next_tuple()
    }

    fn is_end(&self) -> bool {
        self.child.is_end()
    }

    fn current(&mut self) -> Result<Option<Record>, EngineError> {
        let Some(input) = self.child.current()? else {
            return Ok(None);
        };
        let mut out = Record::new(self.len);
        let src_cols = self.child.cols();
        for (i, &src_idx) in self.sel_idxs.iter().enumerate() {
            let src = &src_cols[src_idx];
            let dst = &self.cols[i];
            out.data[dst.offset..dst.offset + dst.len]
                .copy_from_slice(&input.data[src.offset..src.offset + src.len]);
        }
        Ok(Some(out))
    }
}
