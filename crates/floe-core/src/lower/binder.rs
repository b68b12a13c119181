use crate::{
    error::InternalError,
    lower::{context::LoweringContext, context::QueryShape, scalar::ScalarTranslator},
    model::entity::EntityModel,
    plan::{
        EntityProjectionId, MappedProjection, SelectPlan, ShapePath, SqlExpr,
    },
    query::{expr::Expr, expr::HostFn, shape::ShapeExpr},
    value::{ScalarKind, ScalarType, Value},
};
use std::sync::Arc;

///
/// BindMode
///
/// Server mode pushes every leaf into the plan's symbolic mapping;
/// client mode materializes what it can and evaluates the rest locally.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindMode {
    Server,
    Client,
}

///
/// ProjectionBinding
///
/// Where a bound leaf lives: a symbolic shape path before projection
/// finalization, or a concrete projection slot after it (and, in
/// client mode, immediately).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProjectionBinding {
    Path(ShapePath),
    Slot(usize),
}

///
/// BoundEntity
///
/// An entity position in a bound shape: its projection handle, its own
/// binding (absent for embedded children, which ride inside the parent
/// document), and its embedded-navigation sub-shapes.
///

#[derive(Clone, Debug)]
pub struct BoundEntity {
    pub model: Arc<EntityModel>,
    pub projection: EntityProjectionId,
    pub binding: Option<ProjectionBinding>,
    pub navigations: Vec<(String, BoundEntity)>,
}

///
/// BoundShape
///
/// Output of the projection binder: the requested shape with every leaf
/// replaced by a placeholder referencing a plan projection or a
/// client-side evaluation.
///

#[derive(Clone, Debug)]
pub enum BoundShape {
    Entity(BoundEntity),
    Record(Vec<(String, Self)>),
    Scalar {
        binding: ProjectionBinding,
        ty: ScalarType,
    },
    Client(ClientExpr),
}

impl BoundShape {
    /// Rewrite symbolic path bindings into slot bindings after the plan
    /// finalizes its projections.
    pub(crate) fn resolve(self, plan: &SelectPlan) -> Result<Self, InternalError> {
        match self {
            Self::Entity(entity) => Ok(Self::Entity(resolve_entity_binding(entity, plan)?)),
            Self::Record(fields) => Ok(Self::Record(
                fields
                    .into_iter()
                    .map(|(name, shape)| Ok((name, shape.resolve(plan)?)))
                    .collect::<Result<_, InternalError>>()?,
            )),
            Self::Scalar { binding, ty } => Ok(Self::Scalar {
                binding: resolve_binding(binding, plan)?,
                ty,
            }),
            Self::Client(client) => Ok(Self::Client(client)),
        }
    }
}

fn resolve_binding(
    binding: ProjectionBinding,
    plan: &SelectPlan,
) -> Result<ProjectionBinding, InternalError> {
    match binding {
        ProjectionBinding::Slot(slot) => Ok(ProjectionBinding::Slot(slot)),
        ProjectionBinding::Path(path) => plan
            .resolved_slot(&path)
            .map(ProjectionBinding::Slot)
            .ok_or_else(|| {
                InternalError::query_invariant(format!(
                    "projection path '{path}' was never finalized into a slot"
                ))
            }),
    }
}

fn resolve_entity_binding(
    entity: BoundEntity,
    plan: &SelectPlan,
) -> Result<BoundEntity, InternalError> {
    let binding = entity
        .binding
        .map(|binding| resolve_binding(binding, plan))
        .transpose()?;

    Ok(BoundEntity {
        model: entity.model,
        projection: entity.projection,
        binding,
        navigations: entity
            .navigations
            .into_iter()
            .map(|(name, child)| Ok((name, resolve_entity_binding(child, plan)?)))
            .collect::<Result<_, InternalError>>()?,
    })
}

///
/// ClientExpr
///
/// Runtime-evaluated residue of client-mode binding: constants,
/// name-keyed parameter lookups, slot-backed server values, and host
/// calls over those.
///

#[derive(Clone, Debug)]
pub enum ClientExpr {
    Constant(Value),
    ParameterLookup {
        name: String,
    },
    Slot {
        index: usize,
        ty: ScalarType,
    },
    Call {
        function: HostFn,
        object: Option<Box<Self>>,
        args: Vec<Self>,
    },
}

///
/// ProjectionBinder
///
/// Walks a shape expression and binds its leaves to plan projections.
/// Server mode is all-or-nothing: one untranslatable leaf discards the
/// whole walk, and the binder re-runs in client mode.
///

pub(crate) struct ProjectionBinder<'a> {
    ctx: &'a mut LoweringContext,
    plan: &'a mut SelectPlan,
    source: &'a QueryShape,
}

impl<'a> ProjectionBinder<'a> {
    pub(crate) fn new(
        ctx: &'a mut LoweringContext,
        plan: &'a mut SelectPlan,
        source: &'a QueryShape,
    ) -> Self {
        Self { ctx, plan, source }
    }

    pub(crate) fn translate(
        &mut self,
        shape: &ShapeExpr,
    ) -> Result<(BoundShape, BindMode), InternalError> {
        let mut entries = Vec::new();
        if let Some(bound) = self.bind_server(shape, &ShapePath::root(), &mut entries)? {
            self.plan
                .replace_projection_mapping(entries)
                .map_err(InternalError::from)?;
            return Ok((bound, BindMode::Server));
        }

        // Partial server bindings are discarded wholesale; the client
        // walk starts from a clean mapping.
        let bound = self.bind_client(shape, &ShapePath::root())?;
        self.plan
            .replace_projection_mapping(Vec::new())
            .map_err(InternalError::from)?;

        Ok((bound, BindMode::Client))
    }

    // ------------------------------------------------------------------
    // Server mode
    // ------------------------------------------------------------------

    fn bind_server(
        &mut self,
        shape: &ShapeExpr,
        path: &ShapePath,
        entries: &mut Vec<(ShapePath, MappedProjection)>,
    ) -> Result<Option<BoundShape>, InternalError> {
        match shape {
            ShapeExpr::Scalar(expr) => {
                let Some(sql) = self.lower_scalar(expr)? else {
                    return Ok(None);
                };
                let ty = sql
                    .scalar_type()
                    .unwrap_or(ScalarType::nullable(ScalarKind::Text));
                entries.push((path.clone(), MappedProjection::Scalar(sql)));
                Ok(Some(BoundShape::Scalar {
                    binding: ProjectionBinding::Path(path.clone()),
                    ty,
                }))
            }
            ShapeExpr::Entity(expr) => {
                let Some(id) = self.resolve_entity(expr)? else {
                    return Ok(None);
                };
                entries.push((path.clone(), MappedProjection::Entity(id)));
                let entity =
                    self.bound_entity(id, Some(ProjectionBinding::Path(path.clone())));
                Ok(Some(BoundShape::Entity(entity)))
            }
            ShapeExpr::Record(fields) => {
                let mut bound_fields = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    // One failed field aborts the whole construction.
                    let Some(bound) = self.bind_server(field, &path.child(name.as_str()), entries)?
                    else {
                        return Ok(None);
                    };
                    bound_fields.push((name.clone(), bound));
                }
                Ok(Some(BoundShape::Record(bound_fields)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Client mode
    // ------------------------------------------------------------------

    fn bind_client(
        &mut self,
        shape: &ShapeExpr,
        path: &ShapePath,
    ) -> Result<BoundShape, InternalError> {
        match shape {
            ShapeExpr::Scalar(expr) => {
                // Constants and parameters pass through unchanged;
                // parameters become name-keyed runtime lookups.
                if let Some(client) = passthrough_client(expr) {
                    return Ok(BoundShape::Client(client));
                }
                if let Some(sql) = self.lower_scalar(expr)? {
                    let ty = sql
                        .scalar_type()
                        .unwrap_or(ScalarType::nullable(ScalarKind::Text));
                    let slot = self.materialize(sql, path);
                    return Ok(BoundShape::Scalar {
                        binding: ProjectionBinding::Slot(slot),
                        ty,
                    });
                }
                let Some(client) = self.client_expr(expr, path)? else {
                    return Err(InternalError::translation_failed("projection expression"));
                };
                Ok(BoundShape::Client(client))
            }
            ShapeExpr::Entity(expr) => {
                let Some(id) = self.resolve_entity(expr)? else {
                    return Err(InternalError::translation_failed("entity projection"));
                };
                let object = SqlExpr::Object(self.ctx.arena.node(id).object.clone());
                let slot = self.materialize(object, path);
                let entity = self.bound_entity(id, Some(ProjectionBinding::Slot(slot)));
                Ok(BoundShape::Entity(entity))
            }
            ShapeExpr::Record(fields) => Ok(BoundShape::Record(
                fields
                    .iter()
                    .map(|(name, field)| {
                        let bound = self.bind_client(field, &path.child(name.as_str()))?;
                        Ok((name.clone(), bound))
                    })
                    .collect::<Result<_, InternalError>>()?,
            )),
        }
    }

    /// Client-evaluable residue: constants, parameter lookups, and host
    /// calls whose operands are themselves client-evaluable or
    /// server-translatable (the latter become slot references).
    fn client_expr(
        &mut self,
        expr: &Expr,
        path: &ShapePath,
    ) -> Result<Option<ClientExpr>, InternalError> {
        match expr {
            Expr::Constant(value) => Ok(Some(ClientExpr::Constant(value.clone()))),
            Expr::Parameter { name, .. } => Ok(Some(ClientExpr::ParameterLookup {
                name: name.clone(),
            })),
            Expr::Call {
                function,
                object,
                args,
            } if *function != HostFn::Property => {
                let object = match object.as_deref() {
                    Some(object) => match self.client_operand(object, path)? {
                        Some(operand) => Some(Box::new(operand)),
                        None => return Ok(None),
                    },
                    None => None,
                };

                let mut client_args = Vec::with_capacity(args.len());
                for arg in args {
                    let Some(operand) = self.client_operand(arg, path)? else {
                        return Ok(None);
                    };
                    client_args.push(operand);
                }

                Ok(Some(ClientExpr::Call {
                    function: *function,
                    object,
                    args: client_args,
                }))
            }
            _ => Ok(None),
        }
    }

    fn client_operand(
        &mut self,
        expr: &Expr,
        path: &ShapePath,
    ) -> Result<Option<ClientExpr>, InternalError> {
        if let Some(client) = passthrough_client(expr) {
            return Ok(Some(client));
        }
        if let Some(sql) = self.lower_scalar(expr)? {
            let ty = sql
                .scalar_type()
                .unwrap_or(ScalarType::nullable(ScalarKind::Text));
            let slot = self.materialize(sql, path);
            return Ok(Some(ClientExpr::Slot { index: slot, ty }));
        }
        self.client_expr(expr, path)
    }

    // ------------------------------------------------------------------
    // Shared
    // ------------------------------------------------------------------

    fn lower_scalar(&mut self, expr: &Expr) -> Result<Option<SqlExpr>, InternalError> {
        let ctx = &mut *self.ctx;
        let mut translator = ScalarTranslator::new(
            &mut ctx.arena,
            &ctx.member_translators,
            &ctx.method_translators,
            self.plan,
            self.source,
        );
        translator.translate(expr)
    }

    fn resolve_entity(&mut self, expr: &Expr) -> Result<Option<EntityProjectionId>, InternalError> {
        let ctx = &mut *self.ctx;
        let mut translator = ScalarTranslator::new(
            &mut ctx.arena,
            &ctx.member_translators,
            &ctx.method_translators,
            self.plan,
            self.source,
        );
        translator.resolve_entity(expr)
    }

    fn materialize(&mut self, expr: SqlExpr, path: &ShapePath) -> usize {
        let hint = path
            .last()
            .map(str::to_string)
            .unwrap_or_else(|| self.plan.source().alias.clone());
        self.plan.add_to_projection(expr, &hint)
    }

    /// Surface an entity projection and its embedded-navigation
    /// sub-shapes, reusing cached child projections so repeated binds
    /// of the same path return identical handles.
    ///
    /// Embedded navigation graphs are ownership trees; the recursion
    /// bottoms out at models without embedded navigations.
    fn bound_entity(
        &mut self,
        id: EntityProjectionId,
        binding: Option<ProjectionBinding>,
    ) -> BoundEntity {
        let model = Arc::clone(&self.ctx.arena.node(id).model);

        let mut navigations = Vec::new();
        let embedded: Vec<String> = model
            .navigations
            .iter()
            .filter(|n| n.embedded)
            .map(|n| n.name.clone())
            .collect();
        for name in embedded {
            if let Some(child) = self.ctx.arena.navigation(id, &name) {
                navigations.push((name, self.bound_entity(child, None)));
            }
        }

        BoundEntity {
            model,
            projection: id,
            binding,
            navigations,
        }
    }
}

fn passthrough_client(expr: &Expr) -> Option<ClientExpr> {
    match expr {
        Expr::Constant(value) => Some(ClientExpr::Constant(value.clone())),
        Expr::Parameter { name, .. } => Some(ClientExpr::ParameterLookup { name: name.clone() }),
        _ => None,
    }
}
