use std::fmt::Display;

/// Tidestore errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A storage read or write failure. Callers may retry at plan granularity.
    Io(String),
    /// Malformed snapshot, manifest, or data file. Fatal for that snapshot.
    Format(String),
    /// Logical inconsistency in a manifest's ADD/DELETE sequence. Fatal.
    CorruptManifest(String),
    /// No snapshot file exists for the requested id. Fatal to the request,
    /// non-fatal to the process.
    SnapshotNotFound(u64),
    /// A predicate references a field index or type incompatible with the
    /// schema. Reported at plan time.
    FilterTypeMismatch(String),
    /// The operation observed a cancellation request.
    Cancelled,
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "io error: {msg}"),
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::CorruptManifest(msg) => write!(f, "corrupt manifest: {msg}"),
            Error::SnapshotNotFound(id) => write!(f, "snapshot {id} not found"),
            Error::FilterTypeMismatch(msg) => write!(f, "filter type mismatch: {msg}"),
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

/// Constructs an Error::CorruptManifest for the given format string.
#[macro_export]
macro_rules! errcorrupt {
    ($($args:tt)*) => { $crate::error::Error::CorruptManifest(format!($($args)*)).into() };
}

/// Constructs an Error::Format for the given format string.
#[macro_export]
macro_rules! errformat {
    ($($args:tt)*) => { $crate::error::Error::Format(format!($($args)*)).into() };
}

/// A tidestore Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Format(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::Io(err.to_string())
    }
}
