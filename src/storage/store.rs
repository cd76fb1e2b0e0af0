//! Persistence for the single table.
//!
//! Every command loads the whole table and, when it mutates it, saves the
//! whole table back. Stores do not coordinate concurrent writers: two
//! mutating commands racing on the same store end with the last save.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::csv::{CsvError, CsvReader, CsvWriter};
use super::table::Table;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: CsvError,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Table store lock poisoned")]
    Poisoned,
}

pub trait TableStore {
    /// Current table. A store with no data yields the empty table.
    fn load(&self) -> Result<Table, StoreError>;

    /// Replace the stored table. Readers never observe a partial write.
    fn save(&self, table: &Table) -> Result<(), StoreError>;
}

impl<T: TableStore + ?Sized> TableStore for &T {
    fn load(&self) -> Result<Table, StoreError> {
        (**self).load()
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        (**self).save(table)
    }
}

/// Table kept in a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    delimiter: char,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: ',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl TableStore for CsvStore {
    fn load(&self) -> Result<Table, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no data file, starting empty");
            return Ok(Table::empty());
        }

        let reader = CsvReader::new().with_delimiter(self.delimiter);
        match reader.read_file(&self.path) {
            Ok(table) => {
                debug!(
                    path = %self.path.display(),
                    rows = table.row_count(),
                    columns = table.column_count(),
                    "loaded table"
                );
                Ok(table)
            }
            Err(CsvError::EmptyFile) => Ok(Table::empty()),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.write_err(e))?;

        // Write beside the target and rename over it.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.write_err(e))?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            CsvWriter::new()
                .with_delimiter(self.delimiter)
                .write(table, &mut out)
                .map_err(|e| self.write_err(e))?;
            out.flush().map_err(|e| self.write_err(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.write_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_err(e.error))?;

        debug!(
            path = %self.path.display(),
            rows = table.row_count(),
            "saved table"
        );
        Ok(())
    }
}

/// Store that keeps the table in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new(table: Table) -> Self {
        Self {
            table: Mutex::new(table),
        }
    }

    pub fn snapshot(&self) -> Result<Table, StoreError> {
        self.load()
    }
}

impl TableStore for MemoryStore {
    fn load(&self) -> Result<Table, StoreError> {
        self.table
            .lock()
            .map(|t| t.clone())
            .map_err(|_| StoreError::Poisoned)
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        let mut guard = self.table.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = table.clone();
        Ok(())
    }
}
