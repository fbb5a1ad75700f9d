//! Client error taxonomy
//!
//! Every failure is surfaced to the caller as a structured value; the client
//! never logs an error in place of returning it, and never retries on its own
//! (the bring-up health gate is the one explicit exception).

use std::time::Duration;

use tonic::metadata::MetadataMap;
use tonic::{Code, Status};

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Credential material could not be read or parsed, or the endpoint
    /// authority is invalid. Raised at construction, before any network I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A transport or remote-status failure on an individual call.
    #[error(transparent)]
    RemoteCall(#[from] RemoteCallError),

    /// The bring-up health gate exhausted its retry budget.
    #[error("service did not report healthy after {checks} health checks")]
    StartupTimeout { checks: u32 },
}

/// A failed remote call, carrying the gRPC status classification, the detail
/// string, and any metadata the remote side attached to the failure.
///
/// Callers branch on [`RemoteCallError::code`] rather than parsing the
/// message.
#[derive(Debug, thiserror::Error)]
#[error("{operation}: {}: {message}", code_label(.code))]
pub struct RemoteCallError {
    /// The client operation that failed (e.g. "upsert_route").
    pub operation: &'static str,
    /// gRPC status classification (unavailable, unauthenticated,
    /// invalid-argument, deadline-exceeded, internal, ...).
    pub code: Code,
    /// Human-readable detail supplied by the transport or remote side.
    pub message: String,
    /// Protocol-level metadata attached to the failure by the remote side.
    pub metadata: MetadataMap,
}

impl RemoteCallError {
    pub(crate) fn from_status(operation: &'static str, status: Status) -> Self {
        Self {
            operation,
            code: status.code(),
            message: status.message().to_string(),
            metadata: status.metadata().clone(),
        }
    }

    pub(crate) fn unavailable(operation: &'static str, detail: String) -> Self {
        Self {
            operation,
            code: Code::Unavailable,
            message: detail,
            metadata: MetadataMap::new(),
        }
    }

    pub(crate) fn deadline_exceeded(operation: &'static str, timeout: Duration) -> Self {
        Self {
            operation,
            code: Code::DeadlineExceeded,
            message: format!("call exceeded the configured timeout of {:?}", timeout),
            metadata: MetadataMap::new(),
        }
    }

    /// True when the call failed by exceeding its configured timeout.
    pub fn is_deadline_exceeded(&self) -> bool {
        self.code == Code::DeadlineExceeded
    }
}

/// Stable lowercase name for a status classification, for error messages.
fn code_label(code: &Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "cancelled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid-argument",
        Code::DeadlineExceeded => "deadline-exceeded",
        Code::NotFound => "not-found",
        Code::AlreadyExists => "already-exists",
        Code::PermissionDenied => "permission-denied",
        Code::ResourceExhausted => "resource-exhausted",
        Code::FailedPrecondition => "failed-precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out-of-range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data-loss",
        Code::Unauthenticated => "unauthenticated",
    }
}
