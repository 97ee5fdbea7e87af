use std::{error, fmt, io};

/// An enum of all error kinds.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The cache or store was configured with invalid parameters.
    InvalidConfig,
    /// A backing store could not be reached at construction time.
    BackendUnavailable,
    /// An underlying I/O error.
    ///
    /// The built-in stores never surface this kind themselves; it
    /// exists (together with `From<io::Error>`) for caller-supplied
    /// [`Store`](crate::Store) implementations whose constructors do
    /// their own socket or file work.
    IoError,
    /// An entry could not be serialized for an out-of-process store.
    Serialize,
}

/// Represents an error raised by the caching subsystem.
///
/// Runtime backend failures never surface as this type; they are
/// converted into cache misses (see the store documentation). This
/// type is only returned from construction paths.
pub struct CacheError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    IoError(io::Error),
}

/// Library generic result type.
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::IoError(_) => ErrorKind::IoError,
        }
    }

}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> CacheError {
        CacheError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> CacheError {
        CacheError::from((
            ErrorKind::Serialize,
            "serialization error",
            err.to_string(),
        ))
    }
}

#[cfg(feature = "memcached")]
impl From<memcache::MemcacheError> for CacheError {
    fn from(err: memcache::MemcacheError) -> CacheError {
        CacheError::from((
            ErrorKind::BackendUnavailable,
            "memcached error",
            err.to_string(),
        ))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> CacheError {
        CacheError::from((
            ErrorKind::BackendUnavailable,
            "redis error",
            err.to_string(),
        ))
    }
}

impl From<(ErrorKind, &'static str)> for CacheError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> CacheError {
        CacheError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for CacheError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> CacheError {
        CacheError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl error::Error for CacheError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.repr {
            ErrorRepr::IoError(ref err) => Some(err as &dyn error::Error),
            _ => None,
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::WithDescription(_, desc) => desc.fmt(f),
            ErrorRepr::WithDescriptionAndDetail(_, desc, ref detail) => {
                desc.fmt(f)?;
                f.write_str(": ")?;
                detail.fmt(f)
            }
            ErrorRepr::IoError(ref err) => err.fmt(f),
        }
    }
}

impl fmt::Debug for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)?;
        f.write_str(" (")?;
        fmt::Debug::fmt(&self.kind(), f)?;
        f.write_str(")")
    }
}
