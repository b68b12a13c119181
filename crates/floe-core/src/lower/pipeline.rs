use crate::{
    ROOT_ALIAS,
    error::{ErrorClass, ErrorOrigin, InternalError},
    exec::{AggregateGuard, CompiledQuery, RowBound},
    lower::{
        binder::{BindMode, BoundShape, ProjectionBinder, ProjectionBinding},
        context::{LoweringContext, QueryShape},
        scalar::ScalarTranslator,
    },
    model::{entity::EntityModel, mapping::TypeMapping},
    plan::{
        InListValues, MappedProjection, ObjectExpr, OrderingKey, SelectPlan, ShapePath, SourceRef,
        SqlExpr, SqlFunction,
    },
    query::{expr::Expr, shape::ShapeExpr},
    value::{ScalarKind, ScalarType, Value},
};
use std::sync::Arc;

///
/// QueryOp
///
/// Closed union of relational operators. Every arm either lowers onto
/// the plan or fails with an explicit unsupported-operator error;
/// adding an operator means adding an arm, not changing the mechanism.
///

#[derive(Clone, Debug)]
pub enum QueryOp {
    Where(Expr),
    Select(ShapeExpr),
    OrderBy { key: Expr, descending: bool },
    ThenBy { key: Expr, descending: bool },
    Skip(Expr),
    Take(Expr),
    Distinct,
    Count { filter: Option<Expr> },
    LongCount { filter: Option<Expr> },
    Sum { selector: Option<Expr> },
    Average { selector: Option<Expr> },
    Min { selector: Option<Expr> },
    Max { selector: Option<Expr> },
    First { filter: Option<Expr> },
    Single { filter: Option<Expr> },
    Last { filter: Option<Expr> },
    GroupBy { key: Expr },
    Join { target: String },
    Union,
    Intersect,
    Except,
}

enum TerminalKind {
    First,
    Single,
    Last,
}

///
/// QueryPipeline
///
/// Operator lowering visitor: accumulates operators onto one logical
/// plan, then compiles the finalized plan, bound shape, and shaper.
/// Each operator consumes and returns the pipeline handle.
///

pub struct QueryPipeline {
    ctx: LoweringContext,
    plan: SelectPlan,
    shape: QueryShape,
    model: Arc<EntityModel>,
    server_shape: bool,
    bound: RowBound,
    nullable_result: bool,
}

impl QueryPipeline {
    /// Open a pipeline over an entity root. Polymorphic roots get
    /// their discriminator predicate injected up front.
    #[must_use]
    pub fn for_entity(model: Arc<EntityModel>) -> Self {
        let mut ctx = LoweringContext::new();
        let root = ctx.arena.insert_root(Arc::clone(&model), ROOT_ALIAS);
        let mut plan =
            SelectPlan::for_entity(SourceRef::new(model.container.clone(), ROOT_ALIAS), root);

        if let Some(predicate) = discriminator_predicate(&model) {
            plan.apply_predicate(predicate);
        }

        Self {
            ctx,
            plan,
            shape: QueryShape::Entity {
                projection: root,
                model: Arc::clone(&model),
            },
            model,
            server_shape: true,
            bound: RowBound::Many,
            nullable_result: false,
        }
    }

    #[must_use]
    pub const fn plan(&self) -> &SelectPlan {
        &self.plan
    }

    /// Apply one relational operator.
    pub fn apply(mut self, op: QueryOp) -> Result<Self, InternalError> {
        match op {
            QueryOp::Where(predicate) => {
                // Filtering has no client fallback; the rest of the
                // pipeline assumes predicates are fully pushed down.
                let predicate = self.lower_required(&predicate, "filter predicate")?;
                self.plan.apply_predicate(predicate);
                Ok(self)
            }
            QueryOp::Select(shape) => self.apply_select(&shape),
            QueryOp::OrderBy { key, descending } => {
                let expr = self.lower_required(&key, "ordering key")?;
                self.plan.apply_ordering(OrderingKey { expr, descending })?;
                Ok(self)
            }
            QueryOp::ThenBy { key, descending } => {
                let expr = self.lower_required(&key, "ordering key")?;
                self.plan.append_ordering(OrderingKey { expr, descending })?;
                Ok(self)
            }
            QueryOp::Skip(count) => {
                let expr = self.lower_required(&count, "skip count")?;
                self.plan.apply_offset(expr)?;
                Ok(self)
            }
            QueryOp::Take(count) => {
                let expr = self.lower_required(&count, "take count")?;
                self.plan.apply_limit(expr)?;
                Ok(self)
            }
            QueryOp::Distinct => {
                if !self.server_shape {
                    return Err(InternalError::new(
                        ErrorClass::Unsupported,
                        ErrorOrigin::Query,
                        "DISTINCT over a client-evaluated projection is not supported",
                    ));
                }
                self.plan.apply_distinct()?;
                Ok(self)
            }
            QueryOp::Count { filter } | QueryOp::LongCount { filter } => self.lower_count(filter),
            QueryOp::Sum { selector } => self.lower_aggregate(SqlFunction::Sum, selector),
            QueryOp::Average { selector } => self.lower_aggregate(SqlFunction::Avg, selector),
            QueryOp::Min { selector } => self.lower_aggregate(SqlFunction::Min, selector),
            QueryOp::Max { selector } => self.lower_aggregate(SqlFunction::Max, selector),
            QueryOp::First { filter } => self.lower_terminal(TerminalKind::First, filter),
            QueryOp::Single { filter } => self.lower_terminal(TerminalKind::Single, filter),
            QueryOp::Last { filter } => self.lower_terminal(TerminalKind::Last, filter),
            QueryOp::GroupBy { .. } => Err(InternalError::unsupported_operator("GROUP BY")),
            QueryOp::Join { .. } => Err(InternalError::unsupported_operator("JOIN")),
            QueryOp::Union => Err(InternalError::unsupported_operator("UNION")),
            QueryOp::Intersect => Err(InternalError::unsupported_operator("INTERSECT")),
            QueryOp::Except => Err(InternalError::unsupported_operator("EXCEPT")),
        }
    }

    // ------------------------------------------------------------------
    // Fluent surface
    // ------------------------------------------------------------------

    pub fn filter(self, predicate: Expr) -> Result<Self, InternalError> {
        self.apply(QueryOp::Where(predicate))
    }

    pub fn select(self, shape: ShapeExpr) -> Result<Self, InternalError> {
        self.apply(QueryOp::Select(shape))
    }

    pub fn order_by(self, key: Expr) -> Result<Self, InternalError> {
        self.apply(QueryOp::OrderBy {
            key,
            descending: false,
        })
    }

    pub fn order_by_desc(self, key: Expr) -> Result<Self, InternalError> {
        self.apply(QueryOp::OrderBy {
            key,
            descending: true,
        })
    }

    pub fn then_by(self, key: Expr) -> Result<Self, InternalError> {
        self.apply(QueryOp::ThenBy {
            key,
            descending: false,
        })
    }

    pub fn then_by_desc(self, key: Expr) -> Result<Self, InternalError> {
        self.apply(QueryOp::ThenBy {
            key,
            descending: true,
        })
    }

    pub fn skip(self, count: impl Into<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Skip(count.into()))
    }

    pub fn take(self, count: impl Into<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Take(count.into()))
    }

    pub fn distinct(self) -> Result<Self, InternalError> {
        self.apply(QueryOp::Distinct)
    }

    pub fn count(self) -> Result<Self, InternalError> {
        self.apply(QueryOp::Count { filter: None })
    }

    pub fn long_count(self) -> Result<Self, InternalError> {
        self.apply(QueryOp::LongCount { filter: None })
    }

    pub fn sum(self, selector: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Sum { selector })
    }

    pub fn average(self, selector: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Average { selector })
    }

    pub fn min(self, selector: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Min { selector })
    }

    pub fn max(self, selector: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Max { selector })
    }

    pub fn first_or_default(self, filter: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::First { filter })
    }

    pub fn single_or_default(self, filter: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Single { filter })
    }

    pub fn last_or_default(self, filter: Option<Expr>) -> Result<Self, InternalError> {
        self.apply(QueryOp::Last { filter })
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Finalize projections, freeze the plan, and compile the shaper.
    pub fn compile(mut self) -> Result<CompiledQuery, InternalError> {
        // Entity roots that never saw a Select bind the identity shape.
        let bound = match &self.shape {
            QueryShape::Entity { .. } => {
                let mut binder =
                    ProjectionBinder::new(&mut self.ctx, &mut self.plan, &self.shape);
                let (bound, _) = binder.translate(&ShapeExpr::identity())?;
                bound
            }
            QueryShape::Bound(bound) => bound.clone(),
        };

        self.plan.apply_projection(&self.ctx.arena)?;
        let bound = bound.resolve(&self.plan)?;

        tracing::debug!(
            entity = %self.model.name,
            container = %self.plan.source().container,
            plan = %self.plan,
            "query plan finalized"
        );

        Ok(CompiledQuery::new(
            self.plan,
            bound,
            self.bound,
            self.model.name.clone(),
            self.nullable_result,
        ))
    }

    // ------------------------------------------------------------------
    // Operator lowering internals
    // ------------------------------------------------------------------

    fn lower_scalar(&mut self, expr: &Expr) -> Result<Option<SqlExpr>, InternalError> {
        let ctx = &mut self.ctx;
        let mut translator = ScalarTranslator::new(
            &mut ctx.arena,
            &ctx.member_translators,
            &ctx.method_translators,
            &self.plan,
            &self.shape,
        );
        translator.translate(expr)
    }

    fn lower_required(&mut self, expr: &Expr, what: &str) -> Result<SqlExpr, InternalError> {
        self.lower_scalar(expr)?
            .ok_or_else(|| InternalError::translation_failed(what))
    }

    fn apply_select(mut self, shape: &ShapeExpr) -> Result<Self, InternalError> {
        if shape.is_identity() {
            return Ok(self);
        }

        let (bound, mode) = {
            let mut binder = ProjectionBinder::new(&mut self.ctx, &mut self.plan, &self.shape);
            binder.translate(shape)?
        };
        if mode == BindMode::Client {
            self.server_shape = false;
        }
        self.shape = QueryShape::Bound(bound);

        Ok(self)
    }

    // Aggregates over a distinct or paginated source would need
    // subquery wrapping, which the target does not support.
    fn ensure_aggregate_ready(&self, operator: SqlFunction) -> Result<(), InternalError> {
        if self.plan.is_distinct() || self.plan.limit().is_some() || self.plan.offset().is_some() {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Query,
                format!(
                    "{operator} over a distinct or paginated source is not supported by this query target"
                ),
            ));
        }

        Ok(())
    }

    fn lower_count(mut self, filter: Option<Expr>) -> Result<Self, InternalError> {
        self.ensure_aggregate_ready(SqlFunction::Count)?;
        if let Some(filter) = filter {
            self = self.apply(QueryOp::Where(filter))?;
        }

        // Ordering is irrelevant to a count.
        self.plan.clear_orderings()?;

        let ty = ScalarType::new(ScalarKind::Int);
        let count = SqlExpr::Function {
            function: SqlFunction::Count,
            args: vec![SqlExpr::int_constant(1)],
            ty: ty.clone(),
            mapping: Some(TypeMapping::default_for(&ScalarKind::Int)),
        };
        self.plan.replace_projection_mapping(vec![(
            ShapePath::root(),
            MappedProjection::Scalar(count),
        )])?;

        self.shape = QueryShape::Bound(BoundShape::Scalar {
            binding: ProjectionBinding::Path(ShapePath::root()),
            ty: ty.clone(),
        });
        self.bound = RowBound::Aggregate(AggregateGuard {
            function: SqlFunction::Count,
            ty,
        });

        Ok(self)
    }

    fn lower_aggregate(
        mut self,
        function: SqlFunction,
        selector: Option<Expr>,
    ) -> Result<Self, InternalError> {
        self.ensure_aggregate_ready(function)?;
        if let Some(selector) = selector {
            self = self.apply(QueryOp::Select(ShapeExpr::Scalar(selector)))?;
        }

        let QueryShape::Bound(BoundShape::Scalar {
            binding: ProjectionBinding::Path(path),
            ..
        }) = &self.shape
        else {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Query,
                format!("{function} requires a server-translated scalar selector"),
            ));
        };
        let path = path.clone();

        let mapped = self
            .plan
            .mapped_projection(&path)
            .map_err(InternalError::from)?
            .cloned();
        let Some(MappedProjection::Scalar(inner)) = mapped else {
            return Err(InternalError::query_invariant(
                "aggregate selector is not mapped to a scalar projection",
            ));
        };

        let inner_ty = inner
            .scalar_type()
            .unwrap_or(ScalarType::new(ScalarKind::Int));
        let ty = if function == SqlFunction::Avg {
            ScalarType {
                kind: ScalarKind::Float,
                nullable: inner_ty.nullable,
            }
        } else {
            inner_ty
        };
        let mapping = inner
            .mapping()
            .cloned()
            .or_else(|| Some(TypeMapping::default_for(&ty.kind)));

        let expr = SqlExpr::Function {
            function,
            args: vec![inner],
            ty: ty.clone(),
            mapping,
        };
        self.plan
            .map_projection(path.clone(), MappedProjection::Scalar(expr))?;

        self.shape = QueryShape::Bound(BoundShape::Scalar {
            binding: ProjectionBinding::Path(path),
            ty: ty.clone(),
        });
        self.bound = RowBound::Aggregate(AggregateGuard { function, ty });

        Ok(self)
    }

    fn lower_terminal(
        mut self,
        kind: TerminalKind,
        filter: Option<Expr>,
    ) -> Result<Self, InternalError> {
        if let Some(filter) = filter {
            self = self.apply(QueryOp::Where(filter))?;
        }

        match kind {
            TerminalKind::First => {
                self.plan.apply_limit(SqlExpr::int_constant(1))?;
                self.bound = RowBound::First;
            }
            // Limit 2 so the runner can detect a second row and raise
            // the more-than-one-element condition.
            TerminalKind::Single => {
                self.plan.apply_limit(SqlExpr::int_constant(2))?;
                self.bound = RowBound::Single;
            }
            TerminalKind::Last => {
                self.plan.reverse_orderings()?;
                self.plan.apply_limit(SqlExpr::int_constant(1))?;
                self.bound = RowBound::First;
            }
        }

        // The or-default forms make the result type nullable.
        self.nullable_result = true;

        Ok(self)
    }
}

// Polymorphic roots filter to their concrete discriminator values: an
// equality for a single concrete type, a membership test otherwise.
fn discriminator_predicate(model: &EntityModel) -> Option<SqlExpr> {
    let property = model.discriminator_property.as_ref()?;
    let values = model.concrete_discriminator_values();
    if values.is_empty() {
        return None;
    }

    let kind = values
        .first()
        .and_then(Value::kind)
        .unwrap_or(ScalarKind::Text);
    let mapping = TypeMapping::default_for(&kind);

    let column = model.property(property).map_or_else(
        || SqlExpr::Column {
            object: ObjectExpr::root(ROOT_ALIAS),
            name: property.clone(),
            ty: ScalarType::new(kind.clone()),
            mapping: Some(mapping.clone()),
        },
        |p| SqlExpr::Column {
            object: ObjectExpr::root(ROOT_ALIAS),
            name: p.store_name.clone(),
            ty: p.ty.clone(),
            mapping: Some(p.mapping.clone()),
        },
    );

    if let [value] = values.as_slice() {
        return Some(SqlExpr::equal(
            column,
            SqlExpr::constant_mapped(value.clone(), mapping),
        ));
    }

    Some(SqlExpr::InList {
        item: Box::new(column),
        values: InListValues::Values(
            values
                .into_iter()
                .map(|value| SqlExpr::constant_mapped(value, mapping.clone()))
                .collect(),
        ),
        negated: false,
        mapping: Some(TypeMapping::boolean()),
    })
}
