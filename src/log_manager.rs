use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Append-only log file, one per database. The engine only relies on the log
/// being flushed at commit and abort; record formats beyond the marker lines
/// are not part of the storage contract.
pub struct LogManager {
    file: Mutex<File>,
}

impl LogManager {
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn append_record(&self, line: &str) -> Result<(), std::io::Error> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", line)
    }

    pub fn flush_log_to_disk(&self) -> Result<(), std::io::Error> {
        self.file.lock().unwrap().sync_all()
    }
}
