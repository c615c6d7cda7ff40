//! Runtime error values.
//!
//! [`AppError`] is the application-facing error instance: a value copy of its
//! matched definition, the underlying cause, and the backtrace captured when
//! the value was built. Construction always allocates a fresh value and never
//! mutates shared registry state, so concurrent parses cannot race on a
//! sentinel.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::definition::ErrorDefinition;

/// Shared cause type. Causes are reference-counted so reclassification can
/// carry them over verbatim.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Application error value: classification plus cause plus captured stack.
///
/// The definition fields are a value copy of the registry entry that matched
/// at construction time; later reloads do not change existing values.
#[derive(Clone)]
pub struct AppError {
    definition: ErrorDefinition,
    cause: Cause,
    stack: Arc<Backtrace>,
}

impl AppError {
    /// Build a fresh value, capturing the backtrace at the call site.
    pub(crate) fn new(definition: ErrorDefinition, cause: Cause) -> Self {
        Self {
            definition,
            cause,
            stack: Arc::new(Backtrace::capture()),
        }
    }

    /// Build a value reusing an existing cause and stack verbatim.
    pub(crate) fn with_stack(
        definition: ErrorDefinition,
        cause: Cause,
        stack: Arc<Backtrace>,
    ) -> Self {
        Self {
            definition,
            cause,
            stack,
        }
    }

    /// The matched definition.
    pub fn definition(&self) -> &ErrorDefinition {
        &self.definition
    }

    /// Symbolic name of the classification.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Numeric code of the classification.
    pub fn code(&self) -> i32 {
        self.definition.code
    }

    /// gRPC status of the classification.
    pub fn grpc_status(&self) -> tonic::Code {
        self.definition.status
    }

    /// HTTP status of the classification.
    pub fn http_status(&self) -> u16 {
        self.definition.http_status
    }

    /// Human-readable message of the classification.
    pub fn message(&self) -> &str {
        &self.definition.message
    }

    /// The underlying cause.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Backtrace captured when this value (or the value it was reclassified
    /// from) was built.
    pub fn stack(&self) -> &Backtrace {
        &self.stack
    }

    pub(crate) fn cause_shared(&self) -> Cause {
        self.cause.clone()
    }

    pub(crate) fn stack_shared(&self) -> Arc<Backtrace> {
        self.stack.clone()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("definition", &self.definition)
            .field("cause", &self.cause)
            .field("stack", &self.stack)
            .finish()
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref() as &(dyn StdError + 'static))
    }
}

/// An error carrying a captured backtrace but no classification yet.
///
/// Wrapping a `TracedError` carries its cause and stack over verbatim instead
/// of capturing a new stack at the wrap site.
#[derive(Clone)]
pub struct TracedError {
    source: Cause,
    stack: Arc<Backtrace>,
}

impl TracedError {
    /// Wrap an error, capturing the backtrace at the call site.
    pub fn new(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(source),
            stack: Arc::new(Backtrace::capture()),
        }
    }

    /// The captured backtrace.
    pub fn stack(&self) -> &Backtrace {
        &self.stack
    }

    pub(crate) fn source_shared(&self) -> Cause {
        self.source.clone()
    }

    pub(crate) fn stack_shared(&self) -> Arc<Backtrace> {
        self.stack.clone()
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl fmt::Debug for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedError")
            .field("source", &self.source)
            .field("stack", &self.stack)
            .finish()
    }
}

impl StdError for TracedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref() as &(dyn StdError + 'static))
    }
}

/// Stringified stand-in cause for wrapped values that are not themselves
/// errors.
#[derive(Debug)]
pub(crate) struct OpaqueCause(pub(crate) String);

impl fmt::Display for OpaqueCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for OpaqueCause {}

/// Closed set of cause shapes accepted by the wrap constructors.
///
/// Each variant has explicit handling: `None` yields no error at all,
/// `App`/`Traced` carry their cause and stack over verbatim, `Cause` captures
/// a new stack, and `Opaque` retains a stringified value as the cause.
pub enum ErrorInfo {
    /// No error occurred; wrapping yields `None`.
    None,
    /// An already classified value.
    App(AppError),
    /// A cause that already carries a captured stack.
    Traced(TracedError),
    /// A plain error used directly as the cause.
    Cause(Box<dyn StdError + Send + Sync + 'static>),
    /// An arbitrary value, stringified and retained as the cause.
    Opaque(String),
}

impl ErrorInfo {
    /// Wrap any error as a plain cause.
    pub fn from_error(err: impl StdError + Send + Sync + 'static) -> Self {
        ErrorInfo::Cause(Box::new(err))
    }

    /// Stringify a non-error value for retention as the cause.
    pub fn opaque(value: impl fmt::Display) -> Self {
        ErrorInfo::Opaque(value.to_string())
    }
}

impl fmt::Debug for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorInfo::None => f.write_str("None"),
            ErrorInfo::App(err) => f.debug_tuple("App").field(err).finish(),
            ErrorInfo::Traced(err) => f.debug_tuple("Traced").field(err).finish(),
            ErrorInfo::Cause(err) => f.debug_tuple("Cause").field(err).finish(),
            ErrorInfo::Opaque(text) => f.debug_tuple("Opaque").field(text).finish(),
        }
    }
}

impl From<AppError> for ErrorInfo {
    fn from(err: AppError) -> Self {
        ErrorInfo::App(err)
    }
}

impl From<TracedError> for ErrorInfo {
    fn from(err: TracedError) -> Self {
        ErrorInfo::Traced(err)
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for ErrorInfo {
    fn from(err: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        ErrorInfo::Cause(err)
    }
}

impl From<tonic::Status> for ErrorInfo {
    fn from(status: tonic::Status) -> Self {
        ErrorInfo::Cause(Box::new(status))
    }
}

impl From<std::io::Error> for ErrorInfo {
    fn from(err: std::io::Error) -> Self {
        ErrorInfo::Cause(Box::new(err))
    }
}

impl From<String> for ErrorInfo {
    fn from(text: String) -> Self {
        ErrorInfo::Opaque(text)
    }
}

impl From<&str> for ErrorInfo {
    fn from(text: &str) -> Self {
        ErrorInfo::Opaque(text.to_string())
    }
}

impl<T: Into<ErrorInfo>> From<Option<T>> for ErrorInfo {
    fn from(info: Option<T>) -> Self {
        match info {
            Some(inner) => inner.into(),
            None => ErrorInfo::None,
        }
    }
}

/// Read-only classification view over any error.
///
/// Produced by [`Translator::classify`](crate::translate::Translator::classify);
/// total, every accessor answers for both variants.
#[derive(Debug)]
pub enum ErrorView<'a> {
    /// The error is an [`AppError`], borrowed directly.
    App(&'a AppError),
    /// Anything else, viewed as the `Unknown` sentinel definition.
    Fallback(ErrorDefinition),
}

impl ErrorView<'_> {
    /// Numeric code of the classification.
    pub fn code(&self) -> i32 {
        self.definition().code
    }

    /// gRPC status of the classification.
    pub fn grpc_status(&self) -> tonic::Code {
        self.definition().status
    }

    /// HTTP status of the classification.
    pub fn http_status(&self) -> u16 {
        self.definition().http_status
    }

    /// Human-readable message of the classification.
    pub fn message(&self) -> &str {
        &self.definition().message
    }

    /// The viewed definition.
    pub fn definition(&self) -> &ErrorDefinition {
        match self {
            ErrorView::App(err) => err.definition(),
            ErrorView::Fallback(def) => def,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tonic::Code;

    fn io_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "disk on fire")
    }

    #[test]
    fn test_app_error_display_delegates_to_cause() {
        let def = ErrorDefinition::new(40401, "Err_NotFound", Code::NotFound, "missing");
        let err = AppError::new(def, Arc::new(io_error()));
        assert_eq!(err.to_string(), "disk on fire");
        assert_eq!(err.code(), 40401);
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_app_error_source_is_cause() {
        let err = AppError::new(ErrorDefinition::unknown(), Arc::new(io_error()));
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "disk on fire");
    }

    #[test]
    fn test_clone_shares_cause_and_stack() {
        let err = AppError::new(ErrorDefinition::unknown(), Arc::new(io_error()));
        let clone = err.clone();
        assert!(Arc::ptr_eq(&err.cause_shared(), &clone.cause_shared()));
        assert!(Arc::ptr_eq(&err.stack_shared(), &clone.stack_shared()));
    }

    #[test]
    fn test_traced_error_wraps_source() {
        let traced = TracedError::new(io_error());
        assert_eq!(traced.to_string(), "disk on fire");
        assert!(std::error::Error::source(&traced).is_some());
    }

    #[test]
    fn test_error_info_from_option() {
        let none: ErrorInfo = Option::<AppError>::None.into();
        assert!(matches!(none, ErrorInfo::None));

        let some: ErrorInfo = Some("boom").into();
        assert!(matches!(some, ErrorInfo::Opaque(text) if text == "boom"));
    }

    #[test]
    fn test_error_info_opaque_stringifies() {
        let info = ErrorInfo::opaque(42);
        assert!(matches!(info, ErrorInfo::Opaque(text) if text == "42"));
    }

    #[test]
    fn test_error_info_from_status() {
        let info: ErrorInfo = tonic::Status::not_found("nope").into();
        assert!(matches!(info, ErrorInfo::Cause(_)));
    }

    #[test]
    fn test_error_view_fallback_accessors() {
        let view = ErrorView::Fallback(ErrorDefinition::unknown());
        assert_eq!(view.code(), 50000);
        assert_eq!(view.grpc_status(), Code::Unknown);
        assert_eq!(view.http_status(), 500);
        assert_eq!(view.message(), "unknown error");
    }
}
