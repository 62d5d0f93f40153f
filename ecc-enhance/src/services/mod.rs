// Business logic services layer
//
// Record-level operations shared by every command. The spreadsheet
// import/export path lives in `crate::reconcile`.

pub mod records;
