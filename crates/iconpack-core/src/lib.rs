//! Orchestration for iconpack runs.
//!
//! A [`Pipeline`] takes a [`PublishRequest`] through fetch, generation,
//! assembly and publication, and reports a single outcome. Any stage failure
//! aborts the stages after it; the per-run package layout is always removed
//! before the outcome is reported. [`Publisher`] owns the upload and the
//! teardown, tracked by the [`PublishState`] machine.

pub mod config;
pub mod lifecycle;
pub mod pipeline;
pub mod publish;

pub use config::{
    ConfigError, PackageSection, PipelineConfig, DEFAULT_CONFIG_FILE, ENV_FEED_URL,
    ENV_ICON_SERVICE_URL, ENV_WORK_DIR,
};
pub use lifecycle::{validate_transition, PublishState};
pub use pipeline::{ErrorInfo, Pipeline, PublishRequest, PublishResult, RunReport};
pub use publish::{PublishOutcome, Publisher};

use iconpack_codegen::CodegenError;
use iconpack_package::PackageError;
use iconpack_remote::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which stage a failure belongs to; the only part of an error, besides its
/// message, that callers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Config,
    Fetch,
    Generation,
    Assembly,
    Publish,
    Cleanup,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Fetch => "fetch",
            Self::Generation => "generation",
            Self::Assembly => "assembly",
            Self::Publish => "publish",
            Self::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("fetch failed: {0}")]
    Fetch(#[source] RemoteError),
    #[error("generation failed: {0}")]
    Generation(#[from] CodegenError),
    #[error("assembly failed: {0}")]
    Assembly(#[source] PackageError),
    #[error("publish failed: {0}")]
    Publish(#[source] RemoteError),
    #[error("cleanup failed: {0}")]
    Cleanup(#[source] PackageError),
    #[error("invalid publish state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("{primary}; cleanup also failed: {cleanup}")]
    CleanupAfterFailure {
        primary: Box<CoreError>,
        cleanup: Box<CoreError>,
    },
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::InvalidRequest(_) => ErrorClass::Config,
            Self::Fetch(_) => ErrorClass::Fetch,
            Self::Generation(_) => ErrorClass::Generation,
            Self::Assembly(_) => ErrorClass::Assembly,
            Self::Publish(_) | Self::InvalidTransition { .. } => ErrorClass::Publish,
            Self::Cleanup(_) => ErrorClass::Cleanup,
            Self::CleanupAfterFailure { primary, .. } => primary.class(),
        }
    }

    /// Lift an assembler error, keeping a failed teardown visible as its own
    /// cleanup error.
    pub fn from_assembly(e: PackageError) -> Self {
        match e {
            PackageError::CleanupAfterFailure { primary, cleanup } => Self::CleanupAfterFailure {
                primary: Box::new(Self::Assembly(*primary)),
                cleanup: Box::new(Self::Cleanup(*cleanup)),
            },
            other => Self::Assembly(other),
        }
    }

    /// Combine a primary failure with the result of the cleanup that followed it.
    pub fn with_cleanup(self, cleanup: Result<(), PackageError>) -> Self {
        match cleanup {
            Ok(()) => self,
            Err(e) => Self::CleanupAfterFailure {
                primary: Box::new(self),
                cleanup: Box::new(Self::Cleanup(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cleanup_error() -> PackageError {
        PackageError::Cleanup {
            path: PathBuf::from("/tmp/iconpack/acme-run"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
    }

    #[test]
    fn classes_follow_variants() {
        assert_eq!(
            CoreError::InvalidRequest("x".to_owned()).class(),
            ErrorClass::Config
        );
        assert_eq!(
            CoreError::Fetch(RemoteError::NotFound("p".to_owned())).class(),
            ErrorClass::Fetch
        );
        assert_eq!(
            CoreError::Publish(RemoteError::Http("401".to_owned())).class(),
            ErrorClass::Publish
        );
        assert_eq!(CoreError::Cleanup(cleanup_error()).class(), ErrorClass::Cleanup);
    }

    #[test]
    fn compound_error_keeps_primary_class_and_both_messages() {
        let err = CoreError::Publish(RemoteError::Http("HTTP 500".to_owned()))
            .with_cleanup(Err(cleanup_error()));
        assert_eq!(err.class(), ErrorClass::Publish);
        let msg = err.to_string();
        assert!(msg.contains("HTTP 500"));
        assert!(msg.contains("/tmp/iconpack/acme-run"));
    }

    #[test]
    fn with_successful_cleanup_is_identity() {
        let err = CoreError::InvalidRequest("empty".to_owned()).with_cleanup(Ok(()));
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn assembly_compound_is_split() {
        let err = CoreError::from_assembly(PackageError::CleanupAfterFailure {
            primary: Box::new(PackageError::Archive("disk full".to_owned())),
            cleanup: Box::new(cleanup_error()),
        });
        assert_eq!(err.class(), ErrorClass::Assembly);
        match err {
            CoreError::CleanupAfterFailure { cleanup, .. } => {
                assert_eq!(cleanup.class(), ErrorClass::Cleanup);
            }
            other => panic!("expected compound error, got {other:?}"),
        }
    }

    #[test]
    fn error_class_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ErrorClass::Generation).unwrap(),
            "\"generation\""
        );
        assert_eq!(ErrorClass::Cleanup.to_string(), "cleanup");
    }
}
