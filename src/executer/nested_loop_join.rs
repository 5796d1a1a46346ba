use crate::errors::engine_error::EngineError;
use crate::executer::executor::{compare_raw, get_col, op_holds, Executor};
use crate::types::catalog_types::ColMeta;
use crate::types::filter_types::{CondRhs, Condition};
use crate::types::record_types::Record;

/// Tuple-at-a-time nested-loop join. The output schema concatenates the left
/// columns with the right columns, the right offsets shifted by the left
/// tuple length. For each outer tuple the inner side is rewound and drained.
pub struct NestedLoopJoinExecutor<'a> {
    left: Box<dyn Executor + 'a>,
    right: Box<dyn Executor + 'a>,
    cols: Vec<ColMeta>,
    len: usize,
    conds: Vec<Condition>,
    is_end: bool,
}

impl<'a> NestedLoopJoinExecutor<'a> {
    pub fn new(
        left: Box<dyn Executor + 'a>,
        right: Box<dyn Executor + 'a>,
        conds: Vec<Condition>,
    ) -> Self {
        let len = left.tuple_len() + right.tuple_len();
        let mut cols = left.cols().to_vec();
        for col in right.cols() {
            let mut col = col.clone();
            col.offset += left.tuple_len();
            cols.push(col);
        }
        Self {
            left,
            right,
            cols,
            len,
            conds,
            is_end: false,
        }
    }

    /// Does the current (outer, inner) pair satisfy every join condition?
    /// The left side of each condition resolves in the outer schema, a column
    /// right side in the inner schema.
    fn satisfy(&mut self) -> Result<bool, EngineError> {
        if self.left.is_end() || self.right.is_end() {
            return Ok(false);
        }
        let lrec = self
            .left
            .current()?
            .ok_or_else(|| EngineError::Internal("join outer cursor out of sync".to_string()))?;
        let rrec = self
            .right
            .current()?
            .ok_or_else(|| EngineError::Internal("join inner cursor out of sync".to_string()))?;

        for cond in &self.conds {
            let lhs_col = get_col(self.left.cols(), &cond.lhs)?;
            let lhs = &lrec.data[lhs_col.offset..lhs_col.offset + lhs_col.len];
            let ord = match &cond.rhs {
                CondRhs::Col(rhs_ref) => {
                    let rhs_col = get_col(self.right.cols(), rhs_ref)?;
                    let rhs = &rrec.data[rhs_col.offset..rhs_col.offset + rhs_col.len];
                    compare_raw(lhs_col.ty, lhs, rhs)
                }
                CondRhs::Val(val) => {
                    let raw = val.to_raw(lhs_col)?;
                    compare_raw(lhs_col.ty, lhs, &raw)
                }
            };
            if !op_holds(cond.op, ord) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Advance from the current position to the next matching pair: drain the
    /// inner side, then step the outer side and rewind the inner.
    fn seek_match(&mut self) -> Result<(), EngineError> {
        loop {
            if self.left.is_end() {
                self.is_end = true;
                return Ok(());
            }
            while !self.right.is_end() {
                if self.satisfy()? {
                    return Ok(());
                }
                self.right.next_tuple()?;
            }
            self.left.next_tuple()?;
            if self.left.is_end() {
                self.is_end = true;
                return Ok(());
            }
            self.right.begin()?;
        }
    }
}

impl Executor for NestedLoopJoinExecutor<'_> {
    fn tuple_len(&self) -> usize {
        self.len
    }

    fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        self.is_end = false;
        self.left.begin()?;
        if self.left.is_end() {
            self.is_end = true;
            return Ok(());
        }
        self.right.begin()?;
        self.seek_match()
    }

    fn next_tuple(&mut self) -> Result<(), EngineError> {
        if self.is_end {
            return Ok(());
        }
        self.right.next_tuple()?;
        self.seek_match()
    }

    fn is_end(&self) -> bool {
        self.is_end
    }

    fn current(&mut self) -> Result<Option<Record>, EngineError> {
        if self.is_end {
            return Ok(None);
        }
        let lrec = self.left.current()?;
        let rrec = self.right.current()?;
        match (lrec, rrec) {
            (Some(l), Some(r)) => {
                let mut out = Record::new(self.len);
                out.data[..self.left.tuple_len()].copy_from_slice(&l.data);
                out.data[self.left.tuple_len()..].copy_from_slice(&r.data);
                Ok(Some(out))
            }
            _ => Ok(None),
        }
    }
}
