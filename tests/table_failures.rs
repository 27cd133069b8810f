// Collaborator failures surface unchanged; nothing is retried or swallowed.
use std::cell::Cell;

use sheetmap::api::{Column, Error, ErrorKind, MemoryTable, Result, SheetMap, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Primitive {
    ReadAll,
    ReadColumn,
    Find,
    ReadCell,
    WriteCell,
    Append,
    Delete,
    Clear,
}

/// Wraps a `MemoryTable` and fails every call to one primitive.
struct FlakyTable {
    inner: MemoryTable,
    failing: Option<Primitive>,
    calls: Cell<usize>,
}

impl FlakyTable {
    fn new(inner: MemoryTable) -> Self {
        Self {
            inner,
            failing: None,
            calls: Cell::new(0),
        }
    }

    fn check(&self, primitive: Primitive) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.failing == Some(primitive) {
            return Err(Error::new(ErrorKind::Table)
                .with_message("quota exceeded")
                .with_source(std::io::Error::other("429 Too Many Requests")));
        }
        Ok(())
    }
}

impl Table for FlakyTable {
    fn read_all_rows(&self) -> Result<Vec<(String, String)>> {
        self.check(Primitive::ReadAll)?;
        self.inner.read_all_rows()
    }

    fn read_column(&self, column: Column) -> Result<Vec<String>> {
        self.check(Primitive::ReadColumn)?;
        self.inner.read_column(column)
    }

    fn find_row(&self, value: &str, column: Column) -> Result<Option<usize>> {
        self.check(Primitive::Find)?;
        self.inner.find_row(value, column)
    }

    fn read_cell(&self, row: usize, column: Column) -> Result<String> {
        self.check(Primitive::ReadCell)?;
        self.inner.read_cell(row, column)
    }

    fn write_cell(&mut self, row: usize, column: Column, value: &str) -> Result<()> {
        self.check(Primitive::WriteCell)?;
        self.inner.write_cell(row, column, value)
    }

    fn append_row(&mut self, key: &str, value: &str) -> Result<()> {
        self.check(Primitive::Append)?;
        self.inner.append_row(key, value)
    }

    fn delete_row(&mut self, row: usize) -> Result<()> {
        self.check(Primitive::Delete)?;
        self.inner.delete_row(row)
    }

    fn clear_all(&mut self) -> Result<()> {
        self.check(Primitive::Clear)?;
        self.inner.clear_all()
    }
}

fn seeded() -> SheetMap<String, String, FlakyTable> {
    let mut map = SheetMap::new(FlakyTable::new(MemoryTable::new()));
    map.set("key1", "value1").expect("set");
    map.set("key2", "value2").expect("set");
    map
}

fn fail(map: &mut SheetMap<String, String, FlakyTable>, primitive: Primitive) {
    map.table_mut().failing = Some(primitive);
}

#[test]
fn lookup_failure_is_not_reported_as_missing_key() {
    let mut map = seeded();
    fail(&mut map, Primitive::Find);

    assert_eq!(map.get("key1").expect_err("get").kind(), ErrorKind::Table);
    assert_eq!(map.contains("key1").expect_err("contains").kind(), ErrorKind::Table);
    assert_eq!(map.get_opt("nope").expect_err("get_opt").kind(), ErrorKind::Table);
    assert_eq!(
        map.get_or("nope", String::new()).expect_err("get_or").kind(),
        ErrorKind::Table
    );
}

#[test]
fn failure_keeps_source_chain() {
    let mut map = seeded();
    fail(&mut map, Primitive::ReadAll);

    let err = map.len().expect_err("len");
    let source = std::error::Error::source(&err).expect("source");
    assert_eq!(source.to_string(), "429 Too Many Requests");
}

#[test]
fn each_operation_propagates_its_primitive_failure() {
    let cases: [(Primitive, fn(&mut SheetMap<String, String, FlakyTable>) -> Result<()>); 7] = [
        (Primitive::ReadColumn, |map| map.keys().map(drop)),
        (Primitive::ReadColumn, |map| map.values().map(drop)),
        (Primitive::ReadAll, |map| map.items().map(drop)),
        (Primitive::WriteCell, |map| map.set("key1", "changed")),
        (Primitive::Append, |map| map.set("key9", "new")),
        (Primitive::Delete, |map| map.delete("key1")),
        (Primitive::Clear, |map| map.clear()),
    ];

    for (primitive, op) in cases {
        let mut map = seeded();
        fail(&mut map, primitive);
        let err = op(&mut map).expect_err("operation should fail");
        assert_eq!(err.kind(), ErrorKind::Table, "{primitive:?}");
    }
}

#[test]
fn failed_write_leaves_mapping_unchanged() {
    let mut map = seeded();
    fail(&mut map, Primitive::Append);
    let err = map
        .set_default("key3", "default".to_string())
        .expect_err("append fails");
    assert_eq!(err.kind(), ErrorKind::Table);

    map.table_mut().failing = None;
    assert!(!map.contains("key3").expect("contains"));
    assert_eq!(map.len().expect("len"), 2);
}

#[test]
fn failed_delete_in_pop_last_keeps_row() {
    let mut map = seeded();
    fail(&mut map, Primitive::Delete);
    assert_eq!(map.pop_last().expect_err("pop").kind(), ErrorKind::Table);

    map.table_mut().failing = None;
    assert_eq!(map.len().expect("len"), 2);
}

#[test]
fn get_is_one_find_and_one_cell_read() {
    let map = seeded();
    map.table().calls.set(0);
    map.get("key2").expect("get");
    assert_eq!(map.table().calls.get(), 2);
}
