use std::time::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input. Raised before any state is touched.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A store or embedder is not initialised or cannot be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("External service '{service}' failed: {source}")]
    ExternalService {
        service: String,
        #[source]
        source: BoxError,
    },

    #[error("Storage error while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn external<E>(service: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::ExternalService { service: service.into(), source: err.into() }
    }

    pub fn storage<E>(context: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Storage { context: context.into(), source: err.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn external_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::external("rerank", io);
        assert!(err.to_string().contains("rerank"));
        let cause = err.source().expect("cause kept");
        assert!(cause.to_string().contains("refused"));
    }

    #[test]
    fn string_errors_convert_into_external() {
        let err = Error::external("generation", "bad status 500");
        assert!(matches!(err, Error::ExternalService { .. }));
        assert!(!err.is_validation());
    }
}
