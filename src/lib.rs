//! Purpose: Library crate behind the `sheetmap` CLI and integration tests.
//! Exports: `api` (mapping facade, tables, codecs, errors) and `core` (building blocks).
//! Role: Treat a two-column spreadsheet table as a key/value mapping.
//! Invariants: Keys live in column 1 and values in column 2, one row per key.
//! Invariants: The mapping keeps no state of its own; the table is the source of truth.
pub mod api;
pub mod core;
