use crate::errors::catalog_error::CatalogError;
use crate::types::catalog_types::DbMeta;

/// Structural integrity checks, run on load and before every DDL save.
pub fn validate_db_meta(meta: &DbMeta) -> Result<(), CatalogError> {
    for (name, tab) in &meta.tables {
        if *name != tab.name {
            return Err(CatalogError::Invalid(format!(
                "table key '{}' does not match meta name '{}'",
                name, tab.name
            )));
        }
        if tab.cols.is_empty() {
            return Err(CatalogError::Invalid(format!("table '{}' has no columns", name)));
        }

        // Column offsets must be the packed running sums of the lengths.
        let mut expect_offset = 0usize;
        for col in &tab.cols {
            if col.len == 0 {
                return Err(CatalogError::Invalid(format!(
                    "column '{}.{}' has zero length",
                    name, col.name
                )));
            }
            if col.offset != expect_offset {
                return Err(CatalogError::Invalid(format!(
                    "column '{}.{}' offset {} (expected {})",
                    name, col.name, col.offset, expect_offset
                )));
            }
            expect_offset += col.len;
        }

        for ix in &tab.indexes {
            if ix.tab != *name {
                return Err(CatalogError::Invalid(format!(
                    "index on '{}' claims table '{}'",
                    name, ix.tab
                )));
            }
            if ix.col_num != ix.cols.len() {
                return Err(CatalogError::Invalid(format!(
                    "index on '{}' col_num {} but {} columns",
                    name,
                    ix.col_num,
                    ix.cols.len()
                )));
            }
            let tot: usize = ix.cols.iter().map(|c| c.len).sum();
            if tot != ix.col_tot_len {
                return Err(CatalogError::Invalid(format!(
                    "index on '{}' key length {} (expected {})",
                    name, ix.col_tot_len, tot
                )));
            }
            for col in &ix.cols {
                if tab.col(&col.name).is_err() {
                    return Err(CatalogError::Invalid(format!(
                        "index on '{}' references unknown column '{}'",
                        name, col.name
                    )));
                }
            }
        }
    }
    Ok(())
}
