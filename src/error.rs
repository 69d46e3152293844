//! Library error types.
//!
use std::fmt;

/// An mcpackv2 `Result`, normally returning an mcpackv2 [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An mcpackv2 error. Covers codec failures and transport failures alike.
#[derive(Debug)]
pub enum Error {
    /// Unmarshaling into a non-pointer, a nil pointer, or an incompatible shape.
    InvalidDestination(String),
    /// A read derived from an announced length would exceed the buffer.
    Truncated,
    /// The top-level parse did not consume the entire buffer.
    UnexpectedTrailing {
        /// Number of bytes left over after a successful top-level parse.
        remaining: usize,
    },
    /// A zero-length key was found inside an OBJECT.
    EmptyKey,
    /// A key whose length including terminator exceeds 255 during encoding.
    KeyTooLong {
        /// The length of the offending key, not including the terminator.
        len: usize,
    },
    /// A tag byte present in the stream that this implementation does not decode.
    UnsupportedTag(u8),
    /// A source-side type that cannot be encoded (map with non-string key, callable, etc.)
    UnsupportedType(&'static str),
    /// Transport-level: the handler wrote to the response twice.
    WriteAfterResponse,
    /// Transport-level: the frame header's magic number did not match.
    BadMagic(u32),
    /// Any underlying I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidDestination(msg) => write!(f, "invalid unmarshal destination: {msg}"),
            Error::Truncated => write!(f, "buffer truncated before announced length"),
            Error::UnexpectedTrailing { remaining } => {
                write!(f, "{remaining} trailing byte(s) after top-level value")
            }
            Error::EmptyKey => write!(f, "empty key inside object"),
            Error::KeyTooLong { len } => write!(f, "key of {len} bytes exceeds maximum of 254"),
            Error::UnsupportedTag(tag) => write!(f, "unsupported tag byte 0x{tag:02x}"),
            Error::UnsupportedType(ty) => write!(f, "cannot encode value of type {ty}"),
            Error::WriteAfterResponse => write!(f, "response has already been written"),
            Error::BadMagic(got) => write!(f, "invalid magic number 0x{got:08x}"),
            Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(err) => err,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
