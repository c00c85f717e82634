//! Unified error types for codec and preprocessor operations.

use thiserror::Error;

use crate::memory::MemoryError;

/// Opaque error reported by an external backend module.
///
/// Backends live behind the sandbox boundary; this layer passes their
/// failure reasons through without interpreting them.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for codec operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Operation called with an unusable argument combination.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Resize method name outside the fixed algorithm set.
    #[error("unknown resize algorithm \"{0}\"")]
    UnknownAlgorithm(String),

    /// No registered codec signature matched the input bytes.
    #[error("unrecognized image format")]
    UnrecognizedFormat,

    /// No codec registered under the requested key.
    #[error("unsupported format \"{0}\"")]
    UnsupportedFormat(String),

    /// Sandbox/module setup failed. The failure is not cached; issuing the
    /// operation again re-attempts instantiation.
    #[error("failed to instantiate module {module}")]
    Instantiation {
        module: &'static str,
        #[source]
        source: BackendError,
    },

    /// The backend reported a decode/encode/transform failure. Call-scoped:
    /// the cached module handle stays usable for subsequent calls.
    #[error("module {module} call failed")]
    Backend {
        module: &'static str,
        #[source]
        source: BackendError,
    },

    /// The instantiated module does not expose the expected entry point.
    #[error("module {module} does not export a {export} entry point")]
    MissingExport {
        module: &'static str,
        export: &'static str,
    },

    /// Out-of-range access against sandbox linear memory.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl CodecError {
    /// Wrap a backend instantiation failure.
    pub fn instantiation<E>(module: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CodecError::Instantiation {
            module,
            source: Box::new(source),
        }
    }

    /// Wrap a call-scoped backend failure.
    pub fn backend<E>(module: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CodecError::Backend {
            module,
            source: Box::new(source),
        }
    }
}
