pub const DB_META_FILE: &str = "db.meta"; // serialized DbMeta, one per database
pub const LOG_FILE: &str = "db.log"; // append-only log file
pub const TABLE_FILE_SUFFIX: &str = ".tbl";
