//! Query materialization: compiled queries, parameter expansion, text
//! binding, and the lazy sync/async runners over a store client.

pub(crate) mod expand;
pub mod runner;
pub mod shaper;
pub mod store;

use crate::{
    error::InternalError,
    exec::{
        shaper::{Shaper, compile_shaper},
        store::QueryText,
    },
    lower::binder::BoundShape,
    plan::{SelectPlan, SqlFunction},
    render,
    value::{ScalarType, Value},
};
use std::{collections::BTreeMap, sync::Arc};

pub use runner::{QueryRunner, RunnerIter, RunnerStream};
pub use shaper::{EntityRow, ExecContext, QueryOutput};
pub use store::{AsyncDocumentStore, DocumentStore, RowIter, RowStream, StoreError};

/// Live parameter values for one execution, keyed by parameter name.
pub type ExecParams = BTreeMap<String, Value>;

///
/// AggregateGuard
///
/// How a single-row aggregate result treats a null (empty-sequence)
/// value: Sum coerces to the type's zero, the others raise the
/// dedicated no-elements condition unless the result type is nullable.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateGuard {
    pub function: SqlFunction,
    pub ty: ScalarType,
}

///
/// RowBound
///
/// Result-cardinality contract of a compiled query, enforced by the
/// runner.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RowBound {
    Many,
    /// At most one row; the plan carries limit 1.
    First,
    /// At most one row, with limit 2 so a second materialized row can
    /// be detected and raised as more-than-one-element.
    Single,
    /// Exactly one aggregate row, guarded per [`AggregateGuard`].
    Aggregate(AggregateGuard),
}

///
/// CompiledQuery
///
/// Output of operator lowering: the frozen plan, the bound output
/// shape, the compiled shaper, and the row-cardinality contract.
/// Immutable once built; safe to share across executions.
///

#[derive(Clone)]
pub struct CompiledQuery {
    plan: Arc<SelectPlan>,
    shape: BoundShape,
    shaper: Shaper,
    bound: RowBound,
    entity: String,
    nullable_result: bool,
}

impl CompiledQuery {
    pub(crate) fn new(
        plan: SelectPlan,
        shape: BoundShape,
        bound: RowBound,
        entity: String,
        nullable_result: bool,
    ) -> Self {
        let shaper = compile_shaper(&plan, &shape);

        Self {
            plan: Arc::new(plan),
            shape,
            shaper,
            bound,
            entity,
            nullable_result,
        }
    }

    #[must_use]
    pub fn plan(&self) -> &SelectPlan {
        &self.plan
    }

    #[must_use]
    pub const fn shape(&self) -> &BoundShape {
        &self.shape
    }

    #[must_use]
    pub const fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    #[must_use]
    pub const fn bound(&self) -> &RowBound {
        &self.bound
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub const fn is_nullable_result(&self) -> bool {
        self.nullable_result
    }

    /// Expand parameters and render the query text for one execution.
    ///
    /// The same path the runner takes; exposed so callers can inspect
    /// or log what would be sent.
    pub fn query_text(&self, params: &ExecParams) -> Result<QueryText, InternalError> {
        let expanded = expand::expand_parameters(&self.plan, params)?;
        render::generate(&expanded, params)
    }
}
