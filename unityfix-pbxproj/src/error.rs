use thiserror::Error;

/// The top-level error type for descriptor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The file is not a well-formed OpenStep plist.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The plist parsed but does not look like an Xcode project
    /// (missing `objects` table, dangling references, ...).
    #[error("malformed project: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
