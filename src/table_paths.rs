//! Purpose: Resolve where the CLI keeps its table file.
//! Exports: `default_table_path`.
//! Role: Single source for the default location used by `--file`.
//! Invariants: Default table file remains `~/.sheetmap/table.json`.
//! Invariants: `--file` and `SHEETMAP_FILE` always take precedence (handled by clap).

use std::path::PathBuf;

pub(crate) fn default_table_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".sheetmap").join("table.json")
}
