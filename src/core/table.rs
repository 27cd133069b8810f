// Row-oriented primitives over a two-column ordered table.
use crate::core::error::{Error, ErrorKind, Result};

/// Column of a two-column table. Keys live in column 1, values in column 2.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Column {
    Key,
    Value,
}

impl Column {
    pub fn index(self) -> usize {
        match self {
            Column::Key => 1,
            Column::Value => 2,
        }
    }
}

/// An ordered table of `(key cell, value cell)` rows.
///
/// Rows are numbered from 1 in insertion order. Deleting a row shifts every
/// later row up by one, so a row number only identifies a row until the next
/// deletion. Implementations report their own failures (network, auth, quota,
/// disk) as errors; callers never retry.
pub trait Table {
    /// Snapshot of every row, in row order.
    fn read_all_rows(&self) -> Result<Vec<(String, String)>>;

    fn read_column(&self, column: Column) -> Result<Vec<String>>;

    /// First row whose cell in `column` equals `value`.
    fn find_row(&self, value: &str, column: Column) -> Result<Option<usize>>;

    fn read_cell(&self, row: usize, column: Column) -> Result<String>;

    fn write_cell(&mut self, row: usize, column: Column, value: &str) -> Result<()>;

    fn append_row(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `row` and compacts the rows after it.
    fn delete_row(&mut self, row: usize) -> Result<()>;

    fn clear_all(&mut self) -> Result<()>;
}

impl<T: Table + ?Sized> Table for &mut T {
    fn read_all_rows(&self) -> Result<Vec<(String, String)>> {
        (**self).read_all_rows()
    }

    fn read_column(&self, column: Column) -> Result<Vec<String>> {
        (**self).read_column(column)
    }

    fn find_row(&self, value: &str, column: Column) -> Result<Option<usize>> {
        (**self).find_row(value, column)
    }

    fn read_cell(&self, row: usize, column: Column) -> Result<String> {
        (**self).read_cell(row, column)
    }

    fn write_cell(&mut self, row: usize, column: Column, value: &str) -> Result<()> {
        (**self).write_cell(row, column, value)
    }

    fn append_row(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).append_row(key, value)
    }

    fn delete_row(&mut self, row: usize) -> Result<()> {
        (**self).delete_row(row)
    }

    fn clear_all(&mut self) -> Result<()> {
        (**self).clear_all()
    }
}

impl<T: Table + ?Sized> Table for Box<T> {
    fn read_all_rows(&self) -> Result<Vec<(String, String)>> {
        (**self).read_all_rows()
    }

    fn read_column(&self, column: Column) -> Result<Vec<String>> {
        (**self).read_column(column)
    }

    fn find_row(&self, value: &str, column: Column) -> Result<Option<usize>> {
        (**self).find_row(value, column)
    }

    fn read_cell(&self, row: usize, column: Column) -> Result<String> {
        (**self).read_cell(row, column)
    }

    fn write_cell(&mut self, row: usize, column: Column, value: &str) -> Result<()> {
        (**self).write_cell(row, column, value)
    }

    fn append_row(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).append_row(key, value)
    }

    fn delete_row(&mut self, row: usize) -> Result<()> {
        (**self).delete_row(row)
    }

    fn clear_all(&mut self) -> Result<()> {
        (**self).clear_all()
    }
}

/// Maps a 1-based row number onto a slice index, rejecting out-of-range rows.
pub(crate) fn row_offset(row: usize, len: usize) -> Result<usize> {
    if row == 0 || row > len {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("row out of range (table has {len} rows)"))
            .with_row(row));
    }
    Ok(row - 1)
}

pub(crate) fn cell(row: &(String, String), column: Column) -> &String {
    match column {
        Column::Key => &row.0,
        Column::Value => &row.1,
    }
}

pub(crate) fn cell_mut(row: &mut (String, String), column: Column) -> &mut String {
    match column {
        Column::Key => &mut row.0,
        Column::Value => &mut row.1,
    }
}

pub(crate) fn find_in(rows: &[(String, String)], value: &str, column: Column) -> Option<usize> {
    rows.iter()
        .position(|row| cell(row, column) == value)
        .map(|offset| offset + 1)
}
