//! Purpose: Define the public Rust API boundary for sheetmap.
//! Exports: The mapping facade, table contract, bundled tables, codecs, and errors.
//! Role: Single import path for library users and the CLI.
//! Invariants: Callers never need `core` paths to use a mapping.

mod map;
mod snapshot;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::codec::{Codec, Decode, Describe, Encode, Json, Opaque, PlainText};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::file::FileTable;
pub use crate::core::memory::MemoryTable;
pub use crate::core::table::{Column, Table};
pub use map::{Cells, Items, SheetMap};
pub use snapshot::Snapshot;
