//! Translation between registry definitions, application error values, and
//! `tonic::Status`.
//!
//! All operations are pure with respect to the registry at the instant of the
//! call: they look up the current snapshot, build a fresh value, and return.
//! Classification lookups are total; an unregistered name or code silently
//! falls back to the `Unknown` sentinel rather than failing.

use std::sync::Arc;

use tonic::{Code, Status};

use crate::definition::{ErrorDefinition, CONNECTION_ERROR_NAME, UNKNOWN_NAME};
use crate::registry::Registry;
use crate::value::{AppError, ErrorInfo, ErrorView, OpaqueCause};

/// Default message prefixes recognized as transport-level connectivity
/// failures. Covers tonic's client-side transport errors and grpc-go peers.
pub const DEFAULT_CONNECT_PREFIXES: &[&str] = &[
    "transport error",
    "error trying to connect",
    "connection error",
];

/// Matches status errors that mean the peer could not be reached at all, as
/// opposed to a peer-reported application error.
///
/// The prefix set is configurable because the exact message is an
/// implementation detail of the transport, not part of the gRPC contract.
#[derive(Debug, Clone)]
pub struct ConnectMatcher {
    prefixes: Vec<String>,
}

impl ConnectMatcher {
    /// Matcher for the given message prefixes. An empty list falls back to
    /// [`DEFAULT_CONNECT_PREFIXES`].
    pub fn new(prefixes: Vec<String>) -> Self {
        if prefixes.is_empty() {
            Self::default()
        } else {
            Self { prefixes }
        }
    }

    /// Whether `status` represents a low-level connectivity failure.
    pub fn matches(&self, status: &Status) -> bool {
        status.code() == Code::Unavailable
            && self
                .prefixes
                .iter()
                .any(|prefix| status.message().starts_with(prefix.as_str()))
    }
}

impl Default for ConnectMatcher {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_CONNECT_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Builds application error values from registry lookups and parses incoming
/// status errors back into them.
#[derive(Clone)]
pub struct Translator {
    registry: Arc<Registry>,
    matcher: ConnectMatcher,
}

impl Translator {
    /// Create a translator over the given registry.
    pub fn new(registry: Arc<Registry>, matcher: ConnectMatcher) -> Self {
        Self { registry, matcher }
    }

    /// Build a status error classified under `name` (fallback `Unknown`).
    ///
    /// The message carries `name` itself so the receiving side can re-resolve
    /// the same definition against its own snapshot.
    pub fn grpc_error(&self, name: &str) -> Status {
        let definition = self.registry.lookup_by_name(name);
        Status::new(definition.status, name)
    }

    /// Build a status error classified by numeric code (fallback `Unknown`).
    ///
    /// The message carries the resolved definition's name.
    pub fn grpc_error_by_code(&self, code: i32) -> Status {
        let definition = self.registry.lookup_by_code(code);
        Status::new(definition.status, definition.name.clone())
    }

    /// Parse an incoming status error into an application error value.
    ///
    /// A connectivity failure (per the configured matcher) classifies as
    /// `ConnectionError` regardless of its message payload; anything else is
    /// resolved by treating the message as a definition name, falling back to
    /// `Unknown`. The status becomes the cause and a fresh stack is captured.
    pub fn parse(&self, status: Status) -> AppError {
        let definition = if self.matcher.matches(&status) {
            self.registry.lookup_by_name(CONNECTION_ERROR_NAME)
        } else {
            self.registry.lookup_by_name(status.message())
        };
        AppError::new(definition, Arc::new(status))
    }

    /// Construct an application error classified under `name` (fallback
    /// `Unknown`). Returns `None` when `info` carries no error.
    pub fn wrap(&self, name: &str, info: impl Into<ErrorInfo>) -> Option<AppError> {
        self.build(self.registry.lookup_by_name(name), info.into())
    }

    /// Construct an application error classified by numeric code (fallback
    /// `Unknown`). Returns `None` when `info` carries no error.
    pub fn wrap_by_code(&self, code: i32, info: impl Into<ErrorInfo>) -> Option<AppError> {
        self.build(self.registry.lookup_by_code(code), info.into())
    }

    fn build(&self, definition: ErrorDefinition, info: ErrorInfo) -> Option<AppError> {
        match info {
            ErrorInfo::None => None,
            ErrorInfo::App(err) => Some(AppError::with_stack(
                definition,
                err.cause_shared(),
                err.stack_shared(),
            )),
            ErrorInfo::Traced(err) => Some(AppError::with_stack(
                definition,
                err.source_shared(),
                err.stack_shared(),
            )),
            ErrorInfo::Cause(cause) => Some(AppError::new(definition, Arc::from(cause))),
            ErrorInfo::Opaque(text) => {
                Some(AppError::new(definition, Arc::new(OpaqueCause(text))))
            }
        }
    }

    /// Classify any error as a read-only view. Total:
    /// `None` yields `None`, an [`AppError`] is borrowed directly, and
    /// anything else is viewed as the `Unknown` sentinel.
    pub fn classify<'a>(
        &self,
        err: Option<&'a (dyn std::error::Error + 'static)>,
    ) -> Option<ErrorView<'a>> {
        let err = err?;
        match err.downcast_ref::<AppError>() {
            Some(app) => Some(ErrorView::App(app)),
            None => Some(ErrorView::Fallback(self.registry.lookup_by_name(UNKNOWN_NAME))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CONNECTION_ERROR_CODE, UNKNOWN_CODE};
    use crate::loader::Loader;
    use crate::store::{DefinitionRecord, MockDefinitionStore};
    use std::io;

    async fn translator_with(records: Vec<DefinitionRecord>) -> (Translator, Arc<Registry>) {
        let registry = Arc::new(Registry::new());
        let store = Arc::new(MockDefinitionStore::with_records(records));
        let loader = Loader::new(store, registry.clone());
        loader.reload().await.expect("reload");
        (
            Translator::new(registry.clone(), ConnectMatcher::default()),
            registry,
        )
    }

    fn sample_records() -> Vec<DefinitionRecord> {
        vec![
            DefinitionRecord::new(40401, "Err_NotFound", Code::NotFound, "missing"),
            DefinitionRecord::new(40999, "Err_Quota", Code::ResourceExhausted, "quota"),
        ]
    }

    fn io_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "disk on fire")
    }

    #[tokio::test]
    async fn test_grpc_error_carries_name_and_status() {
        let (translator, _) = translator_with(sample_records()).await;
        let status = translator.grpc_error("Err_NotFound");
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "Err_NotFound");
    }

    #[tokio::test]
    async fn test_grpc_error_unregistered_uses_unknown_status() {
        let (translator, _) = translator_with(sample_records()).await;
        let status = translator.grpc_error("Err_Nope");
        // Status falls back to Unknown, but the payload stays the caller's
        // name so the peer can resolve it against a newer snapshot.
        assert_eq!(status.code(), Code::Unknown);
        assert_eq!(status.message(), "Err_Nope");
    }

    #[tokio::test]
    async fn test_grpc_error_by_code_carries_definition_name() {
        let (translator, _) = translator_with(sample_records()).await;
        let status = translator.grpc_error_by_code(40999);
        assert_eq!(status.code(), Code::ResourceExhausted);
        assert_eq!(status.message(), "Err_Quota");

        let fallback = translator.grpc_error_by_code(1);
        assert_eq!(fallback.code(), Code::Unknown);
        assert_eq!(fallback.message(), "Unknown");
    }

    #[tokio::test]
    async fn test_parse_round_trip() {
        let (translator, _) = translator_with(sample_records()).await;
        let status = translator.grpc_error("Err_NotFound");
        let err = translator.parse(status);
        assert_eq!(err.code(), 40401);
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.grpc_status(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_parse_unregistered_message_falls_back_to_unknown() {
        let (translator, _) = translator_with(sample_records()).await;
        let err = translator.parse(Status::new(Code::Internal, "Err_Mystery"));
        assert_eq!(err.code(), UNKNOWN_CODE);
        assert!(err.cause().to_string().contains("Err_Mystery"));
    }

    #[tokio::test]
    async fn test_parse_connectivity_failure_yields_connection_error() {
        let (translator, _) = translator_with(sample_records()).await;
        for message in [
            "transport error",
            "error trying to connect: tcp connect error",
            "connection error: desc = \"transport: Error while dialing\"",
        ] {
            let err = translator.parse(Status::new(Code::Unavailable, message));
            assert_eq!(err.code(), CONNECTION_ERROR_CODE, "message: {message}");
            assert_eq!(err.name(), CONNECTION_ERROR_NAME);
        }
    }

    #[tokio::test]
    async fn test_parse_unavailable_without_prefix_is_name_lookup() {
        let (translator, _) = translator_with(sample_records()).await;
        let err = translator.parse(Status::new(Code::Unavailable, "Err_Quota"));
        assert_eq!(err.code(), 40999);
    }

    #[tokio::test]
    async fn test_wrap_nil_is_none() {
        let (translator, _) = translator_with(sample_records()).await;
        assert!(translator.wrap("Err_NotFound", ErrorInfo::None).is_none());
        assert!(translator
            .wrap_by_code(40401, Option::<AppError>::None)
            .is_none());
    }

    #[tokio::test]
    async fn test_wrap_plain_error_captures_stack() {
        let (translator, _) = translator_with(sample_records()).await;
        let err = translator
            .wrap("Err_NotFound", ErrorInfo::from_error(io_error()))
            .expect("wrapped");
        assert_eq!(err.code(), 40401);
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[tokio::test]
    async fn test_wrap_unregistered_name_falls_back_to_unknown() {
        let (translator, _) = translator_with(sample_records()).await;
        let err = translator
            .wrap("Err_Nope", ErrorInfo::from_error(io_error()))
            .expect("wrapped");
        assert_eq!(err.code(), UNKNOWN_CODE);
        assert_eq!(err.name(), "Unknown");
    }

    #[tokio::test]
    async fn test_reclassification_preserves_cause_and_stack() {
        let (translator, _) = translator_with(sample_records()).await;
        let original = translator
            .wrap("Err_NotFound", ErrorInfo::from_error(io_error()))
            .expect("wrapped");
        let reclassified = translator
            .wrap("Err_Quota", original.clone())
            .expect("rewrapped");

        assert_eq!(reclassified.code(), 40999);
        assert!(Arc::ptr_eq(
            &original.cause_shared(),
            &reclassified.cause_shared()
        ));
        assert!(Arc::ptr_eq(
            &original.stack_shared(),
            &reclassified.stack_shared()
        ));
    }

    #[tokio::test]
    async fn test_wrap_traced_error_keeps_stack() {
        let (translator, _) = translator_with(sample_records()).await;
        let traced = crate::value::TracedError::new(io_error());
        let stack = traced.stack_shared();
        let err = translator.wrap("Err_Quota", traced).expect("wrapped");
        assert!(Arc::ptr_eq(&stack, &err.stack_shared()));
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[tokio::test]
    async fn test_wrap_opaque_value_is_stringified() {
        let (translator, _) = translator_with(sample_records()).await;
        let err = translator
            .wrap_by_code(40401, ErrorInfo::opaque(42))
            .expect("wrapped");
        assert_eq!(err.code(), 40401);
        assert_eq!(err.to_string(), "42");
    }

    #[tokio::test]
    async fn test_classify_is_total() {
        let (translator, _) = translator_with(sample_records()).await;
        assert!(translator.classify(None).is_none());

        let app = translator
            .wrap("Err_NotFound", ErrorInfo::from_error(io_error()))
            .expect("wrapped");
        let app_ref: &(dyn std::error::Error + 'static) = &app;
        let view = translator.classify(Some(app_ref)).expect("view");
        assert_eq!(view.code(), 40401);
        assert_eq!(view.http_status(), 404);

        let plain = io_error();
        let plain_ref: &(dyn std::error::Error + 'static) = &plain;
        let view = translator.classify(Some(plain_ref)).expect("view");
        assert_eq!(view.code(), UNKNOWN_CODE);
        assert_eq!(view.http_status(), 500);
    }

    #[test]
    fn test_connect_matcher_requires_unavailable() {
        let matcher = ConnectMatcher::default();
        assert!(matcher.matches(&Status::new(Code::Unavailable, "transport error")));
        assert!(!matcher.matches(&Status::new(Code::Internal, "transport error")));
        assert!(!matcher.matches(&Status::new(Code::Unavailable, "Err_Quota")));
    }

    #[test]
    fn test_connect_matcher_empty_prefixes_uses_defaults() {
        let matcher = ConnectMatcher::new(Vec::new());
        assert!(matcher.matches(&Status::new(Code::Unavailable, "connection error")));
    }
}
