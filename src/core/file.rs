// JSON-file table: every primitive re-reads the file; writes lock, rewrite, and rename.
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use tempfile::NamedTempFile;
use tracing::trace;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::table::{self, Column, Table};

type Rows = Vec<(String, String)>;

/// A table stored as a JSON array of `[key, value]` string pairs.
///
/// Mutating primitives hold an exclusive lock on `<file>.lock` for their
/// read-modify-write and replace the file through a rename, so readers see
/// either the old or the new row set. No lock is held between primitives.
#[derive(Clone, Debug)]
pub struct FileTable {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileTable {
    /// Creates an empty table file, parents included.
    ///
    /// Fails with `AlreadyExists` when the file is already there; use
    /// [`FileTable::open_or_create`] to reuse an existing table.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let table = Self::at(path.as_ref());
        if let Some(parent) = table.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new(map_io_error_kind(&err))
                    .with_message("failed to create table directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let _lock = table.lock()?;
        if table.path.exists() {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("table file already exists")
                .with_hint("Open it instead, or remove the file first.")
                .with_path(&table.path));
        }
        table.store(&Rows::new())?;
        Ok(table)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let table = Self::at(path.as_ref());
        fs::metadata(&table.path).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to open table file")
                .with_path(&table.path)
                .with_source(err)
        })?;
        Ok(table)
    }

    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn at(path: &Path) -> Self {
        let mut lock_name = path.as_os_str().to_os_string();
        lock_name.push(".lock");
        Self {
            path: path.to_path_buf(),
            lock_path: PathBuf::from(lock_name),
        }
    }

    fn load(&self) -> Result<Rows> {
        let bytes = fs::read(&self.path).map_err(|err| {
            // A file that vanished after open is a table failure, not a missing key.
            let kind = match map_io_error_kind(&err) {
                ErrorKind::NotFound => ErrorKind::Io,
                kind => kind,
            };
            Error::new(kind)
                .with_message("failed to read table file")
                .with_path(&self.path)
                .with_source(err)
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Rows::new());
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("table file is not a list of [key, value] rows")
                .with_path(&self.path)
                .with_source(err)
        })
    }

    fn store(&self, rows: &Rows) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |err: io::Error| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to write table file")
                .with_path(&self.path)
                .with_source(err)
        };

        let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, rows).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode rows")
                    .with_path(&self.path)
                    .with_source(err)
            })?;
            writer.flush().map_err(io_err)?;
        }
        tmp.persist(&self.path).map_err(|err| io_err(err.error))?;
        Ok(())
    }

    fn lock(&self) -> Result<TableLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|err| {
                Error::new(map_io_error_kind(&err))
                    .with_path(&self.lock_path)
                    .with_source(err)
            })?;
        file.lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_path(&self.lock_path)
                .with_source(err)
        })?;
        Ok(TableLock { file })
    }

    fn modify<R>(&mut self, op: &str, apply: impl FnOnce(&mut Rows) -> Result<R>) -> Result<R> {
        let _lock = self.lock()?;
        let mut rows = self.load()?;
        let out = apply(&mut rows)?;
        self.store(&rows)?;
        trace!(op, rows = rows.len(), path = %self.path.display(), "table write");
        Ok(out)
    }
}

struct TableLock {
    file: File,
}

impl Drop for TableLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl Table for FileTable {
    fn read_all_rows(&self) -> Result<Vec<(String, String)>> {
        let rows = self.load()?;
        trace!(rows = rows.len(), "read_all_rows");
        Ok(rows)
    }

    fn read_column(&self, column: Column) -> Result<Vec<String>> {
        trace!(column = column.index(), "read_column");
        Ok(self
            .load()?
            .into_iter()
            .map(|row| match column {
                Column::Key => row.0,
                Column::Value => row.1,
            })
            .collect())
    }

    fn find_row(&self, value: &str, column: Column) -> Result<Option<usize>> {
        let rows = self.load()?;
        Ok(table::find_in(&rows, value, column))
    }

    fn read_cell(&self, row: usize, column: Column) -> Result<String> {
        let rows = self.load()?;
        let offset = table::row_offset(row, rows.len())?;
        Ok(table::cell(&rows[offset], column).clone())
    }

    fn write_cell(&mut self, row: usize, column: Column, value: &str) -> Result<()> {
        self.modify("write_cell", |rows| {
            let offset = table::row_offset(row, rows.len())?;
            *table::cell_mut(&mut rows[offset], column) = value.to_string();
            Ok(())
        })
    }

    fn append_row(&mut self, key: &str, value: &str) -> Result<()> {
        self.modify("append_row", |rows| {
            rows.push((key.to_string(), value.to_string()));
            Ok(())
        })
    }

    fn delete_row(&mut self, row: usize) -> Result<()> {
        self.modify("delete_row", |rows| {
            let offset = table::row_offset(row, rows.len())?;
            rows.remove(offset);
            Ok(())
        })
    }

    fn clear_all(&mut self) -> Result<()> {
        self.modify("clear_all", |rows| {
            rows.clear();
            Ok(())
        })
    }
}

fn map_io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}
