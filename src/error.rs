//! Error types for cache operations.

use std::fmt;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Marker substring some resolvers use for DNS failures.
///
/// Kept as a fallback for store errors that arrive as plain messages.
pub(crate) const NO_SUCH_HOST: &str = "no such host";

/// Classification of a store failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Transport-layer failure: unresolvable host, connection refused,
    /// connect/IO timeout, dropped connection, TLS handshake failure.
    Connectivity,
    /// The store answered but rejected the operation (auth, OOM, wrong type).
    Application,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::Connectivity => write!(f, "connectivity"),
            StoreErrorKind::Application => write!(f, "application"),
        }
    }
}

/// Errors produced by the cache and its backends.
#[derive(Debug)]
pub enum Error {
    /// Bad URL, empty URL, invalid prefix or TTL, failed startup probe.
    ConfigError(String),

    /// The serializer could not encode an entity.
    EncodeError(String),

    /// Stored bytes could not be decoded into an entity.
    DecodeError(String),

    /// The store failed the operation.
    Store {
        kind: StoreErrorKind,
        message: String,
    },

    /// Failure raised by a miss loader.
    Loader(Box<dyn std::error::Error + Send + Sync>),

    /// The operation's context was cancelled.
    Cancelled,

    /// The operation's context deadline passed.
    DeadlineExceeded,

    /// Several independent failures, e.g. from a multi-key delete.
    Multiple(Vec<Error>),
}

impl Error {
    /// Build a store error, classifying it from its message alone.
    ///
    /// Backends with typed errors should prefer [`Error::connectivity`] or
    /// [`Error::application`].
    pub fn store(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if message.contains(NO_SUCH_HOST) {
            StoreErrorKind::Connectivity
        } else {
            StoreErrorKind::Application
        };
        Error::Store { kind, message }
    }

    /// Transport-level store failure.
    pub fn connectivity(message: impl Into<String>) -> Self {
        Error::Store {
            kind: StoreErrorKind::Connectivity,
            message: message.into(),
        }
    }

    /// Store rejected the operation.
    pub fn application(message: impl Into<String>) -> Self {
        Error::Store {
            kind: StoreErrorKind::Application,
            message: message.into(),
        }
    }

    /// Wrap an arbitrary error raised by a loader.
    pub fn loader<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Loader(err.into())
    }

    /// Whether this error is a transport failure the caller cannot fix.
    ///
    /// A joined error is connectivity-class only if every member is.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Store { kind, .. } => *kind == StoreErrorKind::Connectivity,
            Error::Multiple(errors) => {
                !errors.is_empty() && errors.iter().all(Error::is_connectivity)
            }
            _ => false,
        }
    }

    /// Whether this error came from context cancellation or deadline expiry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// Join collected errors: `None` when empty, the error itself when single.
    pub fn join(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Error::EncodeError(msg) => write!(f, "Encode error: {}", msg),
            Error::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Error::Store { kind, message } => write!(f, "Store error ({}): {}", kind, message),
            Error::Loader(err) => write!(f, "Loader error: {}", err),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::DeadlineExceeded => write!(f, "Deadline exceeded"),
            Error::Multiple(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Loader(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_message_classification() {
        let err = Error::store("dial tcp: lookup redis.internal: no such host");
        assert!(err.is_connectivity());

        let err = Error::store("WRONGTYPE Operation against a key holding the wrong kind of value");
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_typed_constructors() {
        assert!(Error::connectivity("connection refused").is_connectivity());
        assert!(!Error::application("NOAUTH Authentication required").is_connectivity());
        assert!(!Error::EncodeError("bad".to_string()).is_connectivity());
    }

    #[test]
    fn test_join() {
        assert!(Error::join(Vec::new()).is_none());

        let single = Error::join(vec![Error::Cancelled]).expect("one error");
        assert!(matches!(single, Error::Cancelled));

        let joined = Error::join(vec![
            Error::application("first"),
            Error::connectivity("second"),
        ])
        .expect("joined error");
        match &joined {
            Error::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Multiple, got {:?}", other),
        }
        assert!(!joined.is_connectivity());

        let message = joined.to_string();
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }

    #[test]
    fn test_multiple_connectivity_requires_all() {
        let joined = Error::Multiple(vec![
            Error::connectivity("refused"),
            Error::connectivity("timed out"),
        ]);
        assert!(joined.is_connectivity());
        assert!(!Error::Multiple(Vec::new()).is_connectivity());
    }

    #[test]
    fn test_loader_source() {
        use std::error::Error as _;

        let err = Error::loader("upstream unavailable");
        assert_eq!(err.to_string(), "Loader error: upstream unavailable");
        assert!(err.source().is_some());
        assert!(Error::DeadlineExceeded.is_cancellation());
    }
}
