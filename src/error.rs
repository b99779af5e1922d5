//! Errors reported while compiling `.proto` schemas.

use std::error;
use std::fmt;
use std::io;

/// A convenience alias for compiler results.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised while parsing a schema or generating code from it.
///
/// The three kinds are deliberately kept apart: I/O failures propagate
/// unchanged from the underlying operations, `InvalidProto` carries the
/// source position of a parse failure, and `Schema` reports a model that
/// cannot be generated from (an unresolved type reference, a missing
/// post-parse enrichment step, or an unknown target language).
#[derive(Debug)]
pub enum Error {
    /// Failure to open, read, write, or create a file or directory.
    Io(io::Error),
    /// A parse-time failure at a known position in the source file.
    InvalidProto {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },
    /// A model-level failure detected after parsing.
    Schema(String),
}

impl Error {
    /// Creates an `InvalidProto` error; the file name is attached later by
    /// the parser driver, which is the only layer that knows it.
    pub(crate) fn invalid_proto(line: u32, column: u32, message: impl Into<String>) -> Error {
        Error::InvalidProto {
            file: String::new(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Fills in the source file name on `InvalidProto` errors, leaving the
    /// other kinds untouched.
    pub(crate) fn with_file(self, name: &str) -> Error {
        match self {
            Error::InvalidProto {
                line,
                column,
                message,
                ..
            } => Error::InvalidProto {
                file: name.to_string(),
                line,
                column,
                message,
            },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::InvalidProto {
                file,
                line,
                column,
                message,
            } => {
                if file.is_empty() {
                    write!(f, "{}:{}: {}", line, column, message)
                } else {
                    write!(f, "{}:{}:{}: {}", file, line, column, message)
                }
            }
            Error::Schema(message) => write!(f, "schema error: {}", message),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
