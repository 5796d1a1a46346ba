use crate::catalog::io::{load_db_meta, save_db_meta_atomic};
use crate::catalog::validate::validate_db_meta;
use crate::consts::catalog_consts::{LOG_FILE, TABLE_FILE_SUFFIX};
use crate::errors::catalog_error::CatalogError;
use crate::errors::engine_error::EngineError;
use crate::index::handle::IxIndexHandle;
use crate::index::key::composite_key;
use crate::record::file_handle::RmFileHandle;
use crate::record::scan::RmScan;
use crate::transaction::context::Context;
use crate::types::catalog_types::{ColDef, ColMeta, ColType, DbMeta, IndexMeta, TabMeta};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Storage manager: owns the catalog, the heap file handles and the index
/// handles of one database. DDL takes `&mut self`; DML goes through shared
/// references (operators borrow handles, never own the manager).
pub struct Engine {
    root: PathBuf,
    meta: DbMeta,
    fhs: HashMap<String, Arc<RmFileHandle>>,
    ihs: HashMap<String, Arc<IxIndexHandle>>,
    next_fd: i32,
}

impl Engine {
    /// Create a database directory with an empty catalog and log file.
    pub fn create_db(root: &Path, name: &str) -> Result<(), CatalogError> {
        if root.exists() {
            return Err(CatalogError::DatabaseExists(
                root.to_string_lossy().into_owned(),
            ));
        }
        fs::create_dir_all(root)?;
        save_db_meta_atomic(root, &DbMeta::empty(name))?;
        fs::File::create(root.join(LOG_FILE))?;
        info!(db = name, "created database");
        Ok(())
    }

    pub fn drop_db(root: &Path) -> Result<(), CatalogError> {
        if !root.is_dir() {
            return Err(CatalogError::DatabaseNotFound(
                root.to_string_lossy().into_owned(),
            ));
        }
        fs::remove_dir_all(root)?;
        Ok(())
    }

    /// Open a database: load and validate the catalog, open every heap file
    /// and rebuild every index from its heap.
    pub fn open(root: &Path) -> Result<Self, EngineError> {
        if !root.is_dir() {
            return Err(CatalogError::DatabaseNotFound(
                root.to_string_lossy().into_owned(),
            )
            .into());
        }
        let meta = load_db_meta(root)?;

        let mut engine = Self {
            root: root.to_path_buf(),
            meta,
            fhs: HashMap::new(),
            ihs: HashMap::new(),
            next_fd: 0,
        };

        let tables: Vec<TabMeta> = engine.meta.tables.values().cloned().collect();
        for tab in &tables {
            let fd = engine.alloc_fd();
            let fh = Arc::new(RmFileHandle::open(
                &engine.table_path(&tab.name),
                &tab.name,
                fd,
            )?);
            engine.fhs.insert(tab.name.clone(), Arc::clone(&fh));

            for index in &tab.indexes {
                let name = Self::ix_name(&tab.name, &index.cols);
                let ih = Self::build_index(&fh, name.clone(), index.clone())?;
                engine.ihs.insert(name, ih);
            }
        }

        info!(db = %engine.meta.name, tables = engine.meta.tables.len(), "opened database");
        Ok(engine)
    }

    pub fn meta(&self) -> &DbMeta {
        &self.meta
    }

    /// Rewrite the catalog file from the in-memory state.
    pub fn persist(&self) -> Result<(), CatalogError> {
        save_db_meta_atomic(&self.root, &self.meta)
    }

    pub fn table(&self, name: &str) -> Result<&TabMeta, CatalogError> {
        self.meta.table(name)
    }

    pub fn heap(&self, name: &str) -> Result<&Arc<RmFileHandle>, CatalogError> {
        self.fhs
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    pub fn index_handle(
        &self,
        tab_name: &str,
        col_names: &[String],
    ) -> Result<Arc<IxIndexHandle>, CatalogError> {
        let tab = self.meta.table(tab_name)?;
        let index = tab.index_meta(col_names).ok_or_else(|| {
            CatalogError::IndexNotFound(format!("{}({})", tab_name, col_names.join(", ")))
        })?;
        let name = Self::ix_name(tab_name, &index.cols);
        self.ihs
            .get(&name)
            .cloned()
            .ok_or(CatalogError::IndexNotFound(name))
    }

    /// Every index handle on `tab_name`, in catalog order.
    pub fn table_indexes(&self, tab_name: &str) -> Result<Vec<Arc<IxIndexHandle>>, CatalogError> {
        let tab = self.meta.table(tab_name)?;
        tab.indexes
            .iter()
            .map(|index| {
                let name = Self::ix_name(tab_name, &index.cols);
                self.ihs
                    .get(&name)
                    .cloned()
                    .ok_or(CatalogError::IndexNotFound(name))
            })
            .collect()
    }

    /// Create a table: assign packed column offsets, create the heap file,
    /// persist the catalog.
    pub fn create_table(&mut self, name: &str, defs: Vec<ColDef>) -> Result<(), EngineError> {
        if self.meta.has_table(name) {
            return Err(CatalogError::TableExists(name.to_string()).into());
        }

        let mut cols = Vec::with_capacity(defs.len());
        let mut offset = 0usize;
        for def in defs {
            let len = match def.ty {
                ColType::Int | ColType::Float => 4,
                ColType::Char => def.len,
            };
            cols.push(ColMeta {
                tab: name.to_string(),
                name: def.name,
                ty: def.ty,
                len,
                offset,
                indexed: false,
            });
            offset += len;
        }

        let tab = TabMeta {
            name: name.to_string(),
            cols,
            indexes: Vec::new(),
        };
        let record_size = tab.record_size();

        self.meta.tables.insert(name.to_string(), tab);
        if let Err(e) = validate_db_meta(&self.meta) {
            self.meta.tables.remove(name);
            return Err(e.into());
        }

        let fd = self.alloc_fd();
        let fh = RmFileHandle::create(&self.table_path(name), name, fd, record_size)?;
        self.fhs.insert(name.to_string(), Arc::new(fh));

        save_db_meta_atomic(&self.root, &self.meta)?;
        info!(table = name, record_size, "created table");
        Ok(())
    }

    /// Drop a table together with its heap file and all of its indexes.
    pub fn drop_table(&mut self, name: &str) -> Result<(), EngineError> {
        let tab = self.meta.table(name)?.clone();
        for index in &tab.indexes {
            self.ihs.remove(&Self::ix_name(name, &index.cols));
        }
        self.fhs.remove(name);
        self.meta.tables.remove(name);

        fs::remove_file(self.table_path(name))?;
        save_db_meta_atomic(&self.root, &self.meta)?;
        info!(table = name, "dropped table");
        Ok(())
    }

    /// Create an index over `col_names` and backfill it from the heap.
    pub fn create_index(&mut self, tab_name: &str, col_names: &[String]) -> Result<(), EngineError> {
        let tab = self.meta.table(tab_name)?;
        if tab.index_meta(col_names).is_some() {
            return Err(CatalogError::IndexExists(format!(
                "{}({})",
                tab_name,
                col_names.join(", ")
            ))
            .into());
        }

        let mut cols = Vec::with_capacity(col_names.len());
        for col_name in col_names {
            cols.push(tab.col(col_name)?.clone());
        }
        let index = IndexMeta {
            tab: tab_name.to_string(),
            col_num: cols.len(),
            col_tot_len: cols.iter().map(|c| c.len).sum(),
            cols,
        };

        let name = Self::ix_name(tab_name, &index.cols);
        let ih = Self::build_index(self.heap(tab_name)?, name.clone(), index.clone())?;
        self.ihs.insert(name.clone(), ih);

        let tab = self
            .meta
            .tables
            .get_mut(tab_name)
            .ok_or_else(|| CatalogError::TableNotFound(tab_name.to_string()))?;
        for col in &mut tab.cols {
            if index.cols.iter().any(|ic| ic.name == col.name) {
                col.indexed = true;
            }
        }
        tab.indexes.push(index);

        save_db_meta_atomic(&self.root, &self.meta)?;
        info!(index = %name, "created index");
        Ok(())
    }

    pub fn drop_index(&mut self, tab_name: &str, col_names: &[String]) -> Result<(), EngineError> {
        let tab = self
            .meta
            .tables
            .get_mut(tab_name)
            .ok_or_else(|| CatalogError::TableNotFound(tab_name.to_string()))?;
        let pos = tab
            .indexes
            .iter()
            .position(|ix| {
                ix.cols.len() == col_names.len()
                    && ix.cols.iter().zip(col_names).all(|(c, n)| c.name == *n)
            })
            .ok_or_else(|| {
                CatalogError::IndexNotFound(format!("{}({})", tab_name, col_names.join(", ")))
            })?;

        let index = tab.indexes.remove(pos);
        self.ihs.remove(&Self::ix_name(tab_name, &index.cols));

        // A column stays flagged only while some remaining index covers it.
        for col in &mut tab.cols {
            col.indexed = tab
                .indexes
                .iter()
                .any(|ix| ix.cols.iter().any(|ic| ic.name == col.name));
        }

        save_db_meta_atomic(&self.root, &self.meta)?;
        Ok(())
    }

    // ---- internals ----

    fn alloc_fd(&mut self) -> i32 {
        let fd = self.next_fd;
        self.next_fd += 1;
        fd
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}{}", name, TABLE_FILE_SUFFIX))
    }

    fn ix_name(tab_name: &str, cols: &[ColMeta]) -> String {
        let names: Vec<&str> = cols.iter().map(|c| c.name.as_str()).collect();
        format!("{}_{}.idx", tab_name, names.join("_"))
    }

    /// Populate a fresh index handle from a full heap scan.
    fn build_index(
        fh: &Arc<RmFileHandle>,
        name: String,
        meta: IndexMeta,
    ) -> Result<Arc<IxIndexHandle>, EngineError> {
        let ih = IxIndexHandle::new(name, meta);
        let ctx = Context::system();
        let mut scan = RmScan::new(Arc::clone(fh))?;
        while !scan.is_end() {
            let rid = scan.rid();
            let rec = fh.get_record(rid, &ctx)?;
            ih.insert_entry(composite_key(ih.meta(), &rec.data), rid);
            scan.next()?;
        }
        Ok(Arc::new(ih))
    }
}
