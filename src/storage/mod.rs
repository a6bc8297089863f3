//! Everything the tracker persists lives in one application directory.
//!  - The day log is a single table, see [day_table::DayTable], accessed through
//!    [day_store::DayStore].
//!  - Planned tasks and the progress index are small JSON documents.
//!  - Every document is rewritten as a whole, see [crate::fs::operations].

pub mod day_store;
pub mod day_table;
pub mod documents;
pub mod entities;
pub mod planned;
pub mod progress_store;
