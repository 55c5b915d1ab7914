//! Error taxonomy for the ingest and query pipeline.
//!
//! Every stage failure surfaces as a [`DoclensError`] with a distinguishable
//! [`ErrorKind`]. Boundary layers (CLI, HTTP) map kinds to exit codes or
//! status codes; the core never substitutes defaults for failures.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Stage of the query path that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Embedding the question.
    Embed,
    /// Nearest-neighbour search over the live index.
    Search,
    /// Answer synthesis by the language model.
    Complete,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStage::Embed => "embed",
            QueryStage::Search => "search",
            QueryStage::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Coarse error classification, stable across error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Load,
    Config,
    Embedding,
    NotFound,
    CorruptIndex,
    NotReady,
    Busy,
    Query,
    ProviderTimeout,
    Provider,
    Storage,
}

impl ErrorKind {
    /// Snake-case name used in JSON error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Load => "load_error",
            ErrorKind::Config => "config_error",
            ErrorKind::Embedding => "embedding_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::CorruptIndex => "corrupt_index",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::Busy => "busy",
            ErrorKind::Query => "query_error",
            ErrorKind::ProviderTimeout => "provider_timeout",
            ErrorKind::Provider => "provider_error",
            ErrorKind::Storage => "storage_error",
        }
    }
}

/// Main error type for doclens operations.
#[derive(Error, Debug)]
pub enum DoclensError {
    /// The source document is missing, unreadable or not parseable.
    #[error("Failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Caller supplied an invalid parameter.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider could not embed a text.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Nothing has been persisted at the location.
    #[error("No index found at {location}")]
    NotFound { location: String },

    /// Persisted data exists but is invalid.
    #[error("Corrupt index at {location}: {reason}")]
    CorruptIndex { location: String, reason: String },

    /// The engine has no live index.
    #[error("No document ingested yet, ingest a document before querying")]
    NotReady,

    /// Another ingest holds the location lock.
    #[error("An ingest is already running for {location}")]
    Busy { location: String },

    /// A stage of the query path failed.
    #[error("Query failed during {stage}: {source}")]
    Query {
        stage: QueryStage,
        #[source]
        source: Box<DoclensError>,
    },

    /// An external provider call exceeded its deadline.
    #[error("{provider} call timed out after {}ms", timeout.as_millis())]
    ProviderTimeout {
        provider: &'static str,
        timeout: Duration,
    },

    /// An external provider call failed for a reason other than timeout.
    #[error("{provider} request failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Reading or writing durable storage failed.
    #[error("Storage error at {location}: {source}")]
    Storage {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for doclens operations.
pub type DoclensResult<T> = Result<T, DoclensError>;

impl DoclensError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DoclensError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        DoclensError::Config(message.into())
    }

    pub fn corrupt(location: impl Into<String>, reason: impl Into<String>) -> Self {
        DoclensError::CorruptIndex {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(location: impl Into<String>, source: std::io::Error) -> Self {
        DoclensError::Storage {
            location: location.into(),
            source,
        }
    }

    /// Wrap an error as a failure of the given query stage.
    pub fn at_stage(self, stage: QueryStage) -> Self {
        DoclensError::Query {
            stage,
            source: Box::new(self),
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DoclensError::Load { .. } => ErrorKind::Load,
            DoclensError::Config(_) => ErrorKind::Config,
            DoclensError::Embedding(_) => ErrorKind::Embedding,
            DoclensError::NotFound { .. } => ErrorKind::NotFound,
            DoclensError::CorruptIndex { .. } => ErrorKind::CorruptIndex,
            DoclensError::NotReady => ErrorKind::NotReady,
            DoclensError::Busy { .. } => ErrorKind::Busy,
            DoclensError::Query { .. } => ErrorKind::Query,
            DoclensError::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            DoclensError::Provider { .. } => ErrorKind::Provider,
            DoclensError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Failing query stage, if this is a query error.
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            DoclensError::Query { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Kind of the innermost cause (looks through query wrappers).
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            DoclensError::Query { source, .. } => source.root_kind(),
            other => other.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_keeps_stage_and_cause() {
        let err = DoclensError::ProviderTimeout {
            provider: "ollama",
            timeout: Duration::from_millis(1500),
        }
        .at_stage(QueryStage::Complete);

        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(err.stage(), Some(QueryStage::Complete));
        assert_eq!(err.root_kind(), ErrorKind::ProviderTimeout);
        assert!(err.to_string().contains("complete"));
        assert!(err.to_string().contains("1500ms"));
    }

    #[test]
    fn test_error_display() {
        let err = DoclensError::Busy {
            location: "vector_store".to_string(),
        };
        assert!(err.to_string().contains("vector_store"));
        assert_eq!(err.kind().as_str(), "busy");
        assert!(err.stage().is_none());
    }
}
