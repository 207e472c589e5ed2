//! Fixture decoding errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed fixture field '{field}' (line {line}, column {column}): {message}")]
    Malformed {
        field: &'static str,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("buffer capacity {capacity} exceeded (attempted {attempted} bytes)")]
    Capacity { capacity: usize, attempted: usize },
}

impl FixtureError {
    pub(crate) fn malformed(
        field: &'static str,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Malformed {
            field,
            line,
            column,
            message: message.into(),
        }
    }

    /// Attach the field name and line number to a decoder error.
    #[must_use]
    pub fn in_field(self, field: &'static str, line: usize) -> Self {
        match self {
            Self::Malformed {
                column, message, ..
            } => Self::Malformed {
                field,
                line,
                column,
                message,
            },
            other => other,
        }
    }
}
