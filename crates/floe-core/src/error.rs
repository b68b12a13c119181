use crate::{exec::store::StoreError, plan::PlanError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a query-origin invariant violation.
    pub(crate) fn query_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Query,
            message.into(),
        )
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct a render-origin invariant violation.
    pub(crate) fn render_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Render,
            message.into(),
        )
    }

    /// Construct a standardized unsupported-operator error.
    ///
    /// Raised when a relational operator has no translation for the
    /// document-SQL target. Compile-time fatal, never retried.
    pub fn unsupported_operator(operator: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Query,
            format!("operator '{operator}' is not implemented for this query target"),
        )
    }

    /// Construct a standardized translation-failure error.
    ///
    /// Raised at the operators that have no client-side fallback path
    /// (filters, pagination counts, distinct, aggregates).
    pub fn translation_failed(context: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Query,
            format!("{context} could not be translated for the query target"),
        )
    }

    /// Construct a shaper-origin corruption error for malformed rows.
    pub(crate) fn shaper_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Shaper, message.into())
    }

    /// Construct the dedicated empty-sequence condition.
    pub(crate) fn no_elements() -> Self {
        Self::new(
            ErrorClass::NoElements,
            ErrorOrigin::Executor,
            "sequence contains no elements",
        )
    }

    /// Construct the dedicated more-than-one-element condition.
    pub(crate) fn more_than_one_element() -> Self {
        Self::new(
            ErrorClass::MoreThanOneElement,
            ErrorOrigin::Executor,
            "sequence contains more than one element",
        )
    }

    /// Construct the cooperative-cancellation condition.
    pub(crate) fn cancelled() -> Self {
        Self::new(
            ErrorClass::Cancelled,
            ErrorOrigin::Executor,
            "query execution was cancelled",
        )
    }

    #[must_use]
    pub const fn is_no_elements(&self) -> bool {
        matches!(self.class, ErrorClass::NoElements)
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.class, ErrorClass::Cancelled)
    }

    /// True when the error wraps a failure surfaced by the store client.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::Store(_)))
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<PlanError> for InternalError {
    fn from(err: PlanError) -> Self {
        Self {
            class: ErrorClass::InvariantViolation,
            origin: ErrorOrigin::Plan,
            message: err.to_string(),
            detail: Some(ErrorDetail::Plan(Box::new(err))),
        }
    }
}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        Self {
            class: ErrorClass::Internal,
            origin: ErrorOrigin::Store,
            message: err.to_string(),
            detail: Some(ErrorDetail::Store(err)),
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
/// This enum is intentionally extensible.
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    /// Underlying store failure, carried unchanged through interception.
    #[error("{0}")]
    Store(StoreError),

    /// Plan-surface invariant failure.
    #[error("{0}")]
    Plan(Box<PlanError>),
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    Internal,
    Unsupported,
    InvariantViolation,
    NoElements,
    MoreThanOneElement,
    Cancelled,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::NoElements => "no_elements",
            Self::MoreThanOneElement => "more_than_one_element",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Query,
    Plan,
    Render,
    Executor,
    Shaper,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Query => "query",
            Self::Plan => "plan",
            Self::Render => "render",
            Self::Executor => "executor",
            Self::Shaper => "shaper",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}
