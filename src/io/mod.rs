//! Input/output helpers.
//!
//! - simulated series exports (CSV) (`export`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
