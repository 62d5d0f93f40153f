//! Spreadsheet-driven reconciliation between files and the record store
//!
//! - [`registry`]: fixed import header per category
//! - [`import`]: find-or-create-then-merge upsert of a whole file
//! - [`export`]: left join of a listing table against its detail table

pub mod export;
pub mod import;
pub mod registry;

pub use export::export;
pub use import::Reconciler;
