use crate::errors::catalog_error::CatalogError;
use crate::errors::engine_error::EngineError;
use crate::types::catalog_types::{ColMeta, ColType};
use crate::types::filter_types::{CompOp, CondRhs, Condition, TabCol};
use crate::types::page_types::Rid;
use crate::types::record_types::Record;
use std::cmp::Ordering;

/// Pull-based operator. `begin` positions on the first tuple, `next_tuple`
/// advances, `current` materializes the tuple at the cursor. Mutation
/// operators do their work in `begin` and produce no tuples.
pub trait Executor {
    fn tuple_len(&self) -> usize;

    fn cols(&self) -> &[ColMeta];

    fn begin(&mut self) -> Result<(), EngineError>;

    fn next_tuple(&mut self) -> Result<(), EngineError>;

    fn is_end(&self) -> bool;

    fn current(&mut self) -> Result<Option<Record>, EngineError>;

    fn rid(&self) -> Rid {
        Rid::INVALID
    }
}

/// Resolve a column reference to its position in an operator schema. An
/// empty table qualifier matches by name alone.
pub fn get_col_idx(cols: &[ColMeta], target: &TabCol) -> Result<usize, EngineError> {
    cols.iter()
        .position(|c| c.name == target.col && (target.tab.is_empty() || c.tab == target.tab))
        .ok_or_else(|| {
            EngineError::Catalog(CatalogError::ColumnNotFound(format!(
                "{}.{}",
                target.tab, target.col
            )))
        })
}

/// Resolve a column reference in an operator schema.
pub fn get_col<'a>(cols: &'a [ColMeta], target: &TabCol) -> Result<&'a ColMeta, EngineError> {
    get_col_idx(cols, target).map(|i| &cols[i])
}

/// Typed comparison over raw column bytes: INT as i32, FLOAT as f32, CHAR as
/// plain byte comparison over the column length.
pub fn compare_raw(ty: ColType, lhs: &[u8], rhs: &[u8]) -> Ordering {
    match ty {
        ColType::Int => {
            let mut a = [0u8; 4];
            let mut b = [0u8; 4];
            a.copy_from_slice(lhs);
            b.copy_from_slice(rhs);
            i32::from_ne_bytes(a).cmp(&i32::from_ne_bytes(b))
        }
        ColType::Float => {
            let mut a = [0u8; 4];
            let mut b = [0u8; 4];
            a.copy_from_slice(lhs);
            b.copy_from_slice(rhs);
            f32::from_ne_bytes(a).total_cmp(&f32::from_ne_bytes(b))
        }
        ColType::Char => lhs.cmp(rhs),
    }
}

pub fn op_holds(op: CompOp, ord: Ordering) -> bool {
    match op {
        CompOp::Eq => ord == Ordering::Equal,
        CompOp::Ne => ord != Ordering::Equal,
        CompOp::Lt => ord == Ordering::Less,
        CompOp::Gt => ord == Ordering::Greater,
        CompOp::Le => ord != Ordering::Greater,
        CompOp::Ge => ord != Ordering::Less,
    }
}

/// Evaluate a conjunction of conditions against one record. The right-hand
/// side is either a constant serialized to the left column's representation
/// or another column of the same tuple.
pub fn eval_conds(
    cols: &[ColMeta],
    conds: &[Condition],
    rec: &Record,
) -> Result<bool, EngineError> {
    for cond in conds {
        let lhs_col = get_col(cols, &cond.lhs)?;
        let lhs = &rec.data[lhs_col.offset..lhs_col.offset + lhs_col.len];

        let ord = match &cond.rhs {
            CondRhs::Val(val) => {
                let raw = val.to_raw(lhs_col)?;
                compare_raw(lhs_col.ty, lhs, &raw)
            }
            CondRhs::Col(rhs_ref) => {
                let rhs_col = get_col(cols, rhs_ref)?;
                let rhs = &rec.data[rhs_col.offset..rhs_col.offset + rhs_col.len];
                compare_raw(lhs_col.ty, lhs, rhs)
            }
        };

        if !op_holds(cond.op, ord) {
            return Ok(false);
        }
    }
    Ok(true)
}
