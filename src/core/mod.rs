// Core modules: errors, table primitives, concrete tables, and cell codecs.
pub mod codec;
pub mod error;
pub mod file;
pub mod memory;
pub mod table;
