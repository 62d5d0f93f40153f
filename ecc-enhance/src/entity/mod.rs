//! Business categories tracked by the ledger and their record shape

mod kind;
mod record;

pub use kind::*;
pub use record::*;
