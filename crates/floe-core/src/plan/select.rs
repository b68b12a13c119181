use crate::{
    error::InternalError,
    plan::{
        error::PlanError,
        expr::SqlExpr,
        projection::{EntityProjectionArena, EntityProjectionId},
    },
};
use std::fmt;

///
/// SourceRef
/// Root source of a plan: container identity plus the document alias.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceRef {
    pub container: String,
    pub alias: String,
}

impl SourceRef {
    #[must_use]
    pub fn new(container: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            alias: alias.into(),
        }
    }
}

///
/// Projection
/// One finalized output column: expression plus rendered alias.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub expr: SqlExpr,
    pub alias: String,
}

impl Projection {
    /// Natural access-path name of the expression, when it has one.
    /// Rendering emits an alias only when it differs from this.
    #[must_use]
    pub fn natural_name(&self) -> Option<&str> {
        match &self.expr {
            SqlExpr::Column { name, .. } => Some(name),
            SqlExpr::Object(object) => Some(object.terminal_name()),
            _ => None,
        }
    }
}

///
/// OrderingKey
///

#[derive(Clone, Debug, PartialEq)]
pub struct OrderingKey {
    pub expr: SqlExpr,
    pub descending: bool,
}

impl OrderingKey {
    #[must_use]
    pub const fn asc(expr: SqlExpr) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    #[must_use]
    pub const fn desc(expr: SqlExpr) -> Self {
        Self {
            expr,
            descending: true,
        }
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            descending: !self.descending,
        }
    }
}

///
/// ShapePath
///
/// Tree path through the requested result shape: record field names and
/// navigation names from the root. The root shape is the empty path.
///

#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct ShapePath(Vec<String>);

impl ShapePath {
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ShapePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$");
        }
        write!(f, "{}", self.0.join("."))
    }
}

///
/// MappedProjection
///
/// Symbolic-phase projection target: a lowered scalar, or an entity
/// projection handle whose object access materializes at finalization.
///

#[derive(Clone, Debug, PartialEq)]
pub enum MappedProjection {
    Scalar(SqlExpr),
    Entity(EntityProjectionId),
}

///
/// ProjectionMapping
///
/// Two-phase mapping from shape positions to projections. Projections
/// stay symbolic until `apply_projection` runs exactly once, after
/// which every lookup resolves to a slot index. Exactly one variant is
/// ever populated.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionMapping {
    Unresolved(Vec<(ShapePath, MappedProjection)>),
    Resolved(Vec<(ShapePath, usize)>),
}

///
/// SelectPlan
///
/// Mutable intermediate representation of one target-store query.
/// Created once per top-level query, mutated in place as operators
/// lower, then logically frozen for execution.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SelectPlan {
    source: SourceRef,
    projections: Vec<Projection>,
    mapping: ProjectionMapping,
    predicate: Option<SqlExpr>,
    orderings: Vec<OrderingKey>,
    offset: Option<SqlExpr>,
    limit: Option<SqlExpr>,
    distinct: bool,
}

impl SelectPlan {
    #[must_use]
    pub const fn for_source(source: SourceRef) -> Self {
        Self {
            source,
            projections: Vec::new(),
            mapping: ProjectionMapping::Unresolved(Vec::new()),
            predicate: None,
            orderings: Vec::new(),
            offset: None,
            limit: None,
            distinct: false,
        }
    }

    /// Plan rooted at an entity source, with the root shape position
    /// mapped to its entity projection up front.
    #[must_use]
    pub(crate) fn for_entity(source: SourceRef, root: EntityProjectionId) -> Self {
        let mut plan = Self::for_source(source);
        plan.mapping = ProjectionMapping::Unresolved(vec![(
            ShapePath::root(),
            MappedProjection::Entity(root),
        )]);

        plan
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn source(&self) -> &SourceRef {
        &self.source
    }

    #[must_use]
    pub const fn predicate(&self) -> Option<&SqlExpr> {
        self.predicate.as_ref()
    }

    #[must_use]
    pub fn orderings(&self) -> &[OrderingKey] {
        &self.orderings
    }

    #[must_use]
    pub const fn offset(&self) -> Option<&SqlExpr> {
        self.offset.as_ref()
    }

    #[must_use]
    pub const fn limit(&self) -> Option<&SqlExpr> {
        self.limit.as_ref()
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    #[must_use]
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// True when the single projection renders through the bare-value
    /// form (`SELECT VALUE expr`): one object or aggregate projection.
    #[must_use]
    pub fn uses_value_form(&self) -> bool {
        if self.projections.len() != 1 {
            return false;
        }
        match &self.projections[0].expr {
            SqlExpr::Object(_) => true,
            SqlExpr::Function { function, .. } => function.is_aggregate(),
            _ => false,
        }
    }

    const fn has_pagination(&self) -> bool {
        self.offset.is_some() || self.limit.is_some()
    }

    // ------------------------------------------------------------------
    // Predicate / distinct
    // ------------------------------------------------------------------

    /// Apply a predicate, AND-ing with any existing predicate.
    /// The syntactic literal `true` is a no-op.
    pub fn apply_predicate(&mut self, predicate: SqlExpr) {
        if predicate.is_true_literal() {
            return;
        }

        self.predicate = match self.predicate.take() {
            Some(existing) => Some(SqlExpr::and(existing, predicate)),
            None => Some(predicate),
        };
    }

    pub fn apply_distinct(&mut self) -> Result<(), PlanError> {
        if self.has_pagination() {
            return Err(PlanError::DistinctAfterPagination);
        }
        self.distinct = true;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    const fn ensure_orderings_mutable(&self) -> Result<(), PlanError> {
        if self.distinct {
            return Err(PlanError::OrderingAfterDistinct);
        }
        if self.has_pagination() {
            return Err(PlanError::OrderingAfterPagination);
        }

        Ok(())
    }

    /// Replace all orderings with one key.
    pub fn apply_ordering(&mut self, key: OrderingKey) -> Result<(), PlanError> {
        self.ensure_orderings_mutable()?;
        self.orderings.clear();
        self.orderings.push(key);

        Ok(())
    }

    /// Append an ordering key unless a structurally equal key exists.
    pub fn append_ordering(&mut self, key: OrderingKey) -> Result<(), PlanError> {
        self.ensure_orderings_mutable()?;
        if self.orderings.iter().any(|k| k.expr == key.expr) {
            return Ok(());
        }
        self.orderings.push(key);

        Ok(())
    }

    pub fn clear_orderings(&mut self) -> Result<(), PlanError> {
        self.ensure_orderings_mutable()?;
        self.orderings.clear();

        Ok(())
    }

    /// Invert every ordering direction; implements `last` semantics
    /// together with a limit of one.
    pub fn reverse_orderings(&mut self) -> Result<(), PlanError> {
        self.ensure_orderings_mutable()?;
        self.orderings = self.orderings.iter().map(OrderingKey::reversed).collect();

        Ok(())
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    pub fn apply_offset(&mut self, offset: SqlExpr) -> Result<(), PlanError> {
        if self.offset.is_some() {
            return Err(PlanError::OffsetAlreadyApplied);
        }
        if self.limit.is_some() {
            return Err(PlanError::OffsetAfterLimit);
        }
        self.offset = Some(offset);

        Ok(())
    }

    pub fn apply_limit(&mut self, limit: SqlExpr) -> Result<(), PlanError> {
        if self.limit.is_some() {
            return Err(PlanError::LimitAlreadyApplied);
        }
        self.limit = Some(limit);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// Add an output projection, deduplicating by structural equality.
    /// Returns the stable slot index; repeated additions of the same
    /// expression return the same index.
    pub fn add_to_projection(&mut self, expr: SqlExpr, alias_hint: &str) -> usize {
        if let Some(index) = self.projections.iter().position(|p| p.expr == expr) {
            return index;
        }

        let alias = self.unique_alias(alias_hint);
        self.projections.push(Projection { expr, alias });

        self.projections.len() - 1
    }

    // Alias uniqueness is case-insensitive; collisions take a numeric
    // suffix deterministically (c, c0, c1, ...).
    fn unique_alias(&self, hint: &str) -> String {
        let taken = |candidate: &str| {
            self.projections
                .iter()
                .any(|p| p.alias.eq_ignore_ascii_case(candidate))
        };

        if !taken(hint) {
            return hint.to_string();
        }

        let mut suffix = 0usize;
        loop {
            let candidate = format!("{hint}{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Symbolic-phase lookup of a mapped projection.
    pub fn mapped_projection(&self, path: &ShapePath) -> Result<Option<&MappedProjection>, PlanError> {
        match &self.mapping {
            ProjectionMapping::Resolved(_) => Err(PlanError::ProjectionAlreadyResolved),
            ProjectionMapping::Unresolved(entries) => Ok(entries
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, mapped)| mapped)),
        }
    }

    /// Symbolic-phase insert or replace of one mapped projection.
    pub fn map_projection(
        &mut self,
        path: ShapePath,
        mapped: MappedProjection,
    ) -> Result<(), PlanError> {
        match &mut self.mapping {
            ProjectionMapping::Resolved(_) => Err(PlanError::ProjectionAlreadyResolved),
            ProjectionMapping::Unresolved(entries) => {
                if let Some(entry) = entries.iter_mut().find(|(p, _)| *p == path) {
                    entry.1 = mapped;
                } else {
                    entries.push((path, mapped));
                }
                Ok(())
            }
        }
    }

    /// Replace the entire symbolic mapping (aggregate rewrites, binder
    /// mode restarts).
    pub fn replace_projection_mapping(
        &mut self,
        entries: Vec<(ShapePath, MappedProjection)>,
    ) -> Result<(), PlanError> {
        match &self.mapping {
            ProjectionMapping::Resolved(_) => Err(PlanError::ProjectionAlreadyResolved),
            ProjectionMapping::Unresolved(_) => {
                self.mapping = ProjectionMapping::Unresolved(entries);
                Ok(())
            }
        }
    }

    /// Finalize symbolic projections into slot indices. One-way; a
    /// second call is an invariant violation.
    pub fn apply_projection(&mut self, arena: &EntityProjectionArena) -> Result<(), PlanError> {
        let entries = match &self.mapping {
            ProjectionMapping::Resolved(_) => return Err(PlanError::ProjectionAlreadyResolved),
            ProjectionMapping::Unresolved(entries) => entries.clone(),
        };

        let mut resolved = Vec::with_capacity(entries.len());
        for (path, mapped) in entries {
            let expr = match mapped {
                MappedProjection::Scalar(expr) => expr,
                MappedProjection::Entity(id) => SqlExpr::Object(arena.node(id).object.clone()),
            };
            let hint = self.alias_hint(&path, &expr);
            let slot = self.add_to_projection(expr, &hint);
            resolved.push((path, slot));
        }

        self.mapping = ProjectionMapping::Resolved(resolved);

        Ok(())
    }

    fn alias_hint(&self, path: &ShapePath, expr: &SqlExpr) -> String {
        if let Some(last) = path.last() {
            return last.to_string();
        }
        match expr {
            SqlExpr::Column { name, .. } => name.clone(),
            SqlExpr::Object(object) => object.terminal_name().to_string(),
            _ => self.source.alias.clone(),
        }
    }

    /// Rewrite every expression position in place; used by the
    /// execution-time parameter expansion, which operates on a clone of
    /// the frozen plan.
    pub(crate) fn rewrite_exprs(
        &mut self,
        rewrite: &mut dyn FnMut(SqlExpr) -> Result<SqlExpr, InternalError>,
    ) -> Result<(), InternalError> {
        if let Some(predicate) = self.predicate.take() {
            self.predicate = Some(rewrite(predicate)?);
        }
        for ordering in &mut self.orderings {
            let expr = std::mem::replace(&mut ordering.expr, SqlExpr::bool_constant(true));
            ordering.expr = rewrite(expr)?;
        }
        for projection in &mut self.projections {
            let expr = std::mem::replace(&mut projection.expr, SqlExpr::bool_constant(true));
            projection.expr = rewrite(expr)?;
        }
        if let Some(offset) = self.offset.take() {
            self.offset = Some(rewrite(offset)?);
        }
        if let Some(limit) = self.limit.take() {
            self.limit = Some(rewrite(limit)?);
        }

        Ok(())
    }

    /// Slot index of a shape position after finalization.
    #[must_use]
    pub fn resolved_slot(&self, path: &ShapePath) -> Option<usize> {
        match &self.mapping {
            ProjectionMapping::Unresolved(_) => None,
            ProjectionMapping::Resolved(entries) => entries
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, slot)| *slot),
        }
    }
}

impl fmt::Display for SelectPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "select[{}{} proj, {} order, offset={}, limit={}] from {}",
            if self.distinct { "distinct, " } else { "" },
            self.projections.len(),
            self.orderings.len(),
            if self.offset.is_some() { "set" } else { "-" },
            if self.limit.is_some() { "set" } else { "-" },
            self.source.container,
        )
    }
}
