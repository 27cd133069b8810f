// In-process table: an ordered vector of rows with the same numbering rules as a sheet.
use crate::core::error::Result;
use crate::core::table::{self, Column, Table};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryTable {
    rows: Vec<(String, String)>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<I, K, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn rows(&self) -> &[(String, String)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Table for MemoryTable {
    fn read_all_rows(&self) -> Result<Vec<(String, String)>> {
        Ok(self.rows.clone())
    }

    fn read_column(&self, column: Column) -> Result<Vec<String>> {
        Ok(self
            .rows
            .iter()
            .map(|row| table::cell(row, column).clone())
            .collect())
    }

    fn find_row(&self, value: &str, column: Column) -> Result<Option<usize>> {
        Ok(table::find_in(&self.rows, value, column))
    }

    fn read_cell(&self, row: usize, column: Column) -> Result<String> {
        let offset = table::row_offset(row, self.rows.len())?;
        Ok(table::cell(&self.rows[offset], column).clone())
    }

    fn write_cell(&mut self, row: usize, column: Column, value: &str) -> Result<()> {
        let offset = table::row_offset(row, self.rows.len())?;
        *table::cell_mut(&mut self.rows[offset], column) = value.to_string();
        Ok(())
    }

    fn append_row(&mut self, key: &str, value: &str) -> Result<()> {
        self.rows.push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn delete_row(&mut self, row: usize) -> Result<()> {
        let offset = table::row_offset(row, self.rows.len())?;
        self.rows.remove(offset);
        Ok(())
    }

    fn clear_all(&mut self) -> Result<()> {
        self.rows.clear();
        Ok(())
    }
}
