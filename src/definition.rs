//! Error definition records and the gRPC to HTTP status mapping.
//!
//! An [`ErrorDefinition`] is one immutable entry in the error taxonomy:
//! numeric code, symbolic name, gRPC status, derived HTTP status, and a
//! human-readable message. Definitions are owned by registry snapshots and
//! copied into error values at construction time; nothing mutates them after
//! the loader builds a snapshot.

use tonic::Code;

/// Code of the `Unknown` sentinel definition.
pub const UNKNOWN_CODE: i32 = 50000;
/// Name of the `Unknown` sentinel definition.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Code of the `ConnectionError` sentinel definition.
pub const CONNECTION_ERROR_CODE: i32 = 50001;
/// Name of the `ConnectionError` sentinel definition.
pub const CONNECTION_ERROR_NAME: &str = "ConnectionError";

/// One entry in the error taxonomy.
///
/// `code` and `name` are each unique within a registry snapshot.
/// `http_status` is derived from `status` via [`http_status`]; the two never
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDefinition {
    /// Numeric code, unique within a snapshot.
    pub code: i32,
    /// Symbolic name, unique within a snapshot.
    pub name: String,
    /// gRPC status carried on the wire.
    pub status: Code,
    /// HTTP status derived from `status`.
    pub http_status: u16,
    /// Human-readable message.
    pub message: String,
}

impl ErrorDefinition {
    /// Create a definition, deriving the HTTP status from `status`.
    pub fn new(
        code: i32,
        name: impl Into<String>,
        status: Code,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            status,
            http_status: http_status(status),
            message: message.into(),
        }
    }

    /// The `Unknown` sentinel: universal fallback for unregistered names
    /// and codes.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_CODE, UNKNOWN_NAME, Code::Unknown, "unknown error")
    }

    /// The `ConnectionError` sentinel: the gRPC peer could not be reached
    /// at all, as opposed to a peer-reported application error.
    pub fn connection_error() -> Self {
        Self::new(
            CONNECTION_ERROR_CODE,
            CONNECTION_ERROR_NAME,
            Code::Unavailable,
            "failed to reach gRPC peer",
        )
    }
}

/// Map a gRPC status code to its HTTP status.
///
/// Fixed, exhaustive table; any status not listed (including `Unknown` and
/// `Unavailable`) maps to 500.
pub fn http_status(code: Code) -> u16 {
    match code {
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => 400,
        Code::Unauthenticated => 401,
        Code::PermissionDenied => 403,
        Code::NotFound => 404,
        Code::Aborted | Code::AlreadyExists => 409,
        Code::ResourceExhausted => 429,
        Code::Cancelled => 499,
        _ => 500,
    }
}
