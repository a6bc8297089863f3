//! Personal daily habit tracker. Every day gets a record of the tasks from a weekly catalog, the
//! user marks each one as actioned, undoable or avoided, and finished days compound into a
//! single progress index.
//!

pub mod catalog;
pub mod cli;
pub mod error;
pub mod fs;
pub mod gate;
pub mod storage;
pub mod tracker;
pub mod utils;
