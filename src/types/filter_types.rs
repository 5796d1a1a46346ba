use crate::types::record_types::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompOp {
    /// Operator after the two sides of a condition are swapped.
    pub fn swapped(self) -> Self {
        match self {
            CompOp::Eq => CompOp::Eq,
            CompOp::Ne => CompOp::Ne,
            CompOp::Lt => CompOp::Gt,
            CompOp::Gt => CompOp::Lt,
            CompOp::Le => CompOp::Ge,
            CompOp::Ge => CompOp::Le,
        }
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompOp::Eq => "=",
            CompOp::Ne => "<>",
            CompOp::Lt => "<",
            CompOp::Gt => ">",
            CompOp::Le => "<=",
            CompOp::Ge => ">=",
        })
    }
}

/// A possibly table-qualified column reference. An empty `tab` matches any
/// table in the operator's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabCol {
    pub tab: String,
    pub col: String,
}

impl TabCol {
    pub fn new(tab: &str, col: &str) -> Self {
        Self {
            tab: tab.to_string(),
            col: col.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CondRhs {
    Val(Value),
    Col(TabCol),
}

/// One conjunct of a WHERE clause: `lhs op rhs`.
#[derive(Debug, Clone)]
pub struct Condition {
    pub lhs: TabCol,
    pub op: CompOp,
    pub rhs: CondRhs,
}

impl Condition {
    pub fn with_val(tab: &str, col: &str, op: CompOp, val: Value) -> Self {
        Self {
            lhs: TabCol::new(tab, col),
            op,
            rhs: CondRhs::Val(val),
        }
    }

    pub fn with_col(tab: &str, col: &str, op: CompOp, rhs: TabCol) -> Self {
        Self {
            lhs: TabCol::new(tab, col),
            op,
            rhs: CondRhs::Col(rhs),
        }
    }
}

/// One assignment of an UPDATE statement.
#[derive(Debug, Clone)]
pub struct SetClause {
    pub col: String,
    pub val: Value,
}
