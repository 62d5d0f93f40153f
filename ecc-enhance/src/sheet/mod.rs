//! Spreadsheet I/O: every cell crosses this boundary as text

mod reader;
mod writer;

pub use reader::{Table, read_table};
pub use writer::write_table;
