use crate::errors::catalog_error::CatalogError;
use crate::errors::transaction_error::TransactionAbort;
use crate::types::catalog_types::ColType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Abort(#[from] TransactionAbort),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page {page_no} does not exist in table '{tab}'")]
    PageNotExist { tab: String, page_no: i32 },

    #[error("record not found at ({page_no}, {slot_no})")]
    RecordNotFound { page_no: i32, slot_no: i32 },

    #[error("type mismatch for column '{col}' (expected {expected})")]
    TypeMismatch { col: String, expected: ColType },

    #[error("internal error: {0}")]
    Internal(String),
}
