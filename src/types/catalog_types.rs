use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::catalog_error::CatalogError;

// Supported column types; tuples are fixed-length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColType {
    Int,   // 4-byte signed integer
    Float, // 4-byte IEEE-754 float
    Char,  // fixed-length byte string
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColType::Int => "INT",
            ColType::Float => "FLOAT",
            ColType::Char => "CHAR",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColMeta {
    pub tab: String,  // owning table name
    pub name: String, // column name
    #[serde(rename = "type")]
    pub ty: ColType,
    pub len: usize,    // byte length within the tuple
    pub offset: usize, // byte offset within the tuple
    pub indexed: bool, // whether some index covers this column
}

/// Column definition as handed to `create_table`; offsets are assigned there.
#[derive(Debug, Clone)]
pub struct ColDef {
    pub name: String,
    pub ty: ColType,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub tab: String,
    pub col_num: usize,
    pub col_tot_len: usize, // total key length = sum of column lengths
    pub cols: Vec<ColMeta>, // indexed columns in declaration order
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabMeta {
    pub name: String,
    pub cols: Vec<ColMeta>,
    pub indexes: Vec<IndexMeta>,
}

impl TabMeta {
    pub fn col(&self, name: &str) -> Result<&ColMeta, CatalogError> {
        self.cols
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CatalogError::ColumnNotFound(format!("{}.{}", self.name, name)))
    }

    /// Find the index whose column names match `col_names` exactly, in order.
    pub fn index_meta(&self, col_names: &[String]) -> Option<&IndexMeta> {
        self.indexes.iter().find(|ix| {
            ix.cols.len() == col_names.len()
                && ix.cols.iter().zip(col_names).all(|(c, n)| c.name == *n)
        })
    }

    pub fn record_size(&self) -> usize {
        self.cols.iter().map(|c| c.len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbMeta {
    pub name: String,
    pub tables: BTreeMap<String, TabMeta>, // map table name → metadata
}

impl DbMeta {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: BTreeMap::new(),
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Result<&TabMeta, CatalogError> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }
}
