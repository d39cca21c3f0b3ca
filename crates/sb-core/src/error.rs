//! Error types for the core crate.

/// A schedule time that is not in `HH:MM` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("expected HH:MM, got {0:?}")]
    Malformed(String),
    #[error("time out of range: {0:?}")]
    OutOfRange(String),
}

/// Rejected block list management operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("list name must not be empty")]
    EmptyName,
    #[error("a list named {0:?} already exists")]
    DuplicateName(String),
    #[error("cannot delete the last block list")]
    LastList,
    #[error("unknown block list: {0}")]
    UnknownList(String),
    #[error("invalid website entry: {0:?}")]
    InvalidEntry(String),
    #[error("block list {0} is full")]
    ListFull(String),
}
