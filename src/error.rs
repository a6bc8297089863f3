use thiserror::Error;

/// Failures of the tracker that callers are expected to react to. They travel inside
/// [anyhow::Error] and can be recovered with `downcast_ref`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("no day record for {date}")]
    NotFound { date: String },

    #[error("task {key:?} is not part of the record for {date}")]
    InvalidKey { date: String, key: String },

    #[error("a day record for {date} already exists")]
    DuplicateDate { date: String },

    #[error("task {key:?} already has an outcome, undo it first")]
    AlreadyRecorded { key: String },

    #[error("task {key:?} has no outcome to undo")]
    NotRecorded { key: String },

    #[error("the record for {date} has been rolled over and can't be changed")]
    ReadOnlyDay { date: String },

    #[error("task {key:?} is not a plan objective")]
    NotAPlan { key: String },

    #[error("no task catalog at {path}, run `day-tracker init` or import one")]
    MissingCatalog { path: String },

    #[error("invalid task catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("invalid day table: {message}")]
    InvalidTable { message: String },
}
