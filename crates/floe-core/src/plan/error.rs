use thiserror::Error as ThisError;

///
/// PlanError
///
/// Plan-surface invariant failures. These indicate a compilation that
/// has violated the plan's mutation protocol; they are fatal to the
/// current compilation and never retryable.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PlanError {
    /// A limit is already applied; compound limits require subquery
    /// wrapping, which this target does not support.
    #[error("limit is already applied to this plan")]
    LimitAlreadyApplied,

    /// An offset is already applied.
    #[error("offset is already applied to this plan")]
    OffsetAlreadyApplied,

    /// Offset must be fixed before a limit is set.
    #[error("offset cannot be applied once a limit is set")]
    OffsetAfterLimit,

    /// The target language requires ordering to be fixed before
    /// pagination.
    #[error("ordering cannot change once offset or limit is applied")]
    OrderingAfterPagination,

    /// Ordering over a distinct projection is undefined for this
    /// target.
    #[error("ordering cannot change once distinct is applied")]
    OrderingAfterDistinct,

    /// Distinct cannot be introduced after pagination.
    #[error("distinct cannot be applied once offset or limit is applied")]
    DistinctAfterPagination,

    /// `apply_projection` is a one-way transition and ran twice.
    #[error("projection mapping is already finalized")]
    ProjectionAlreadyResolved,
}
