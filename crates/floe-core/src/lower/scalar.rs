use crate::{
    error::InternalError,
    lower::{
        binder::{BoundShape, ProjectionBinding},
        context::QueryShape,
        members::{MemberTranslator, MethodTranslator},
    },
    model::mapping::TypeMapping,
    plan::{
        EntityProjectionArena, EntityProjectionId, InListValues, MappedProjection, SelectPlan,
        SqlBinaryOp, SqlExpr, SqlUnaryOp,
        expr::{fill_default_mappings, verify_mappings},
    },
    query::expr::{BinaryOp, Expr, HostFn, UnaryOp},
    value::{ScalarKind, ScalarType, Value},
};

///
/// Lowered
///
/// Intermediate result of one lowering step: a plan scalar, or an
/// entity projection handle for object-valued positions.
///

enum Lowered {
    Sql(SqlExpr),
    Entity(EntityProjectionId),
}

///
/// ScalarTranslator
///
/// Recursive visitor from the object-query scalar vocabulary into the
/// plan's. `Ok(None)` means "not translatable server-side"; the caller
/// decides whether that falls back or fails. `Err` is reserved for
/// internal invariant violations.
///

pub(crate) struct ScalarTranslator<'a> {
    arena: &'a mut EntityProjectionArena,
    members: &'a [Box<dyn MemberTranslator>],
    methods: &'a [Box<dyn MethodTranslator>],
    plan: &'a SelectPlan,
    shape: &'a QueryShape,
}

impl<'a> ScalarTranslator<'a> {
    pub(crate) fn new(
        arena: &'a mut EntityProjectionArena,
        members: &'a [Box<dyn MemberTranslator>],
        methods: &'a [Box<dyn MethodTranslator>],
        plan: &'a SelectPlan,
        shape: &'a QueryShape,
    ) -> Self {
        Self {
            arena,
            members,
            methods,
            plan,
            shape,
        }
    }

    /// Lower one scalar expression, verifying the type-mapping
    /// invariant on success.
    pub(crate) fn translate(&mut self, expr: &Expr) -> Result<Option<SqlExpr>, InternalError> {
        let Some(lowered) = self.translate_inner(expr)? else {
            return Ok(None);
        };

        let mut sql = match lowered {
            Lowered::Sql(sql) => sql,
            Lowered::Entity(id) => SqlExpr::Object(self.arena.node(id).object.clone()),
        };

        fill_default_mappings(&mut sql);
        verify_mappings(&sql)?;

        Ok(Some(sql))
    }

    /// Resolve an entity-valued expression to its projection handle.
    pub(crate) fn resolve_entity(
        &mut self,
        expr: &Expr,
    ) -> Result<Option<EntityProjectionId>, InternalError> {
        Ok(match self.translate_inner(expr)? {
            Some(Lowered::Entity(id)) => Some(id),
            _ => None,
        })
    }

    fn translate_inner(&mut self, expr: &Expr) -> Result<Option<Lowered>, InternalError> {
        match expr {
            Expr::Source => self.lower_source(),
            Expr::Constant(value) => Ok(Some(Lowered::Sql(SqlExpr::constant(value.clone())))),
            Expr::Parameter { name, ty } => Ok(Some(Lowered::Sql(SqlExpr::Parameter {
                name: name.clone(),
                ty: ty.clone(),
                mapping: None,
            }))),
            Expr::Member { object, name } => self.lower_member(object, name),
            Expr::Call {
                function: HostFn::Property,
                object,
                args,
            } => {
                // Reserved property-by-name form; routes to member
                // binding rather than the method chain.
                let (Some(object), [Expr::Constant(Value::Text(name))]) =
                    (object.as_deref(), args.as_slice())
                else {
                    return Ok(None);
                };
                self.lower_member(object, name)
            }
            Expr::Call {
                function,
                object,
                args,
            } => self.lower_call(*function, object.as_deref(), args),
            Expr::Binary { op, left, right } => self.lower_binary(*op, left, right),
            Expr::Unary { op, operand } => self.lower_unary(*op, operand),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => self.lower_conditional(test, if_true, if_false),
            Expr::Coalesce { left, right } => {
                // coalesce(l, r) rewrites to (l != null ? l : r); the
                // target language expresses it that way.
                let rewritten = Expr::conditional(
                    Expr::Binary {
                        op: BinaryOp::NotEqual,
                        left: left.clone(),
                        right: Box::new(Expr::Constant(Value::Null)),
                    },
                    left.as_ref().clone(),
                    right.as_ref().clone(),
                );
                self.translate_inner(&rewritten)
            }
            Expr::Cast { operand, target } => self.lower_cast(operand, target),
            Expr::In {
                item,
                collection,
                negated,
            } => self.lower_in(item, collection, *negated),
        }
    }

    fn lower_source(&mut self) -> Result<Option<Lowered>, InternalError> {
        match self.shape {
            QueryShape::Entity { projection, .. } => Ok(Some(Lowered::Entity(*projection))),
            QueryShape::Bound(bound) => self.lower_bound_position(bound),
        }
    }

    fn lower_bound_position(&self, bound: &BoundShape) -> Result<Option<Lowered>, InternalError> {
        match bound {
            BoundShape::Entity(entity) => Ok(Some(Lowered::Entity(entity.projection))),
            BoundShape::Scalar {
                binding: ProjectionBinding::Path(path),
                ..
            } => match self.plan.mapped_projection(path).map_err(InternalError::from)? {
                Some(MappedProjection::Scalar(sql)) => Ok(Some(Lowered::Sql(sql.clone()))),
                Some(MappedProjection::Entity(id)) => Ok(Some(Lowered::Entity(*id))),
                None => Err(InternalError::query_invariant(format!(
                    "bound shape references unmapped projection path '{path}'"
                ))),
            },
            BoundShape::Scalar { .. } | BoundShape::Record(_) | BoundShape::Client(_) => Ok(None),
        }
    }

    fn lower_member(&mut self, object: &Expr, name: &str) -> Result<Option<Lowered>, InternalError> {
        // Member access over a record-shaped element resolves through
        // the symbolic projection mapping, not the schema.
        if matches!(object, Expr::Source)
            && let QueryShape::Bound(BoundShape::Record(fields)) = self.shape
        {
            let Some((_, field)) = fields.iter().find(|(field, _)| field == name) else {
                return Ok(None);
            };
            return self.lower_bound_position(field);
        }

        match self.translate_inner(object)? {
            Some(Lowered::Entity(id)) => {
                if self.arena.node(id).collection {
                    // Scalar access through an embedded array has no
                    // single-document meaning.
                    return Ok(None);
                }
                if let Some(column) = self.arena.column(id, name) {
                    return Ok(Some(Lowered::Sql(column)));
                }
                if let Some(child) = self.arena.navigation(id, name) {
                    return Ok(Some(Lowered::Entity(child)));
                }
                Ok(None)
            }
            Some(Lowered::Sql(instance)) => Ok(self
                .members
                .iter()
                .find_map(|t| t.translate(&instance, name))
                .map(Lowered::Sql)),
            None => Ok(None),
        }
    }

    fn lower_call(
        &mut self,
        function: HostFn,
        object: Option<&Expr>,
        args: &[Expr],
    ) -> Result<Option<Lowered>, InternalError> {
        // Operands lower first; any failure aborts the whole call.
        let instance = match object {
            Some(object) => match self.lower_operand(object)? {
                Some(sql) => Some(sql),
                None => return Ok(None),
            },
            None => None,
        };

        let mut lowered_args = Vec::with_capacity(args.len());
        for arg in args {
            let Some(sql) = self.lower_operand(arg)? else {
                return Ok(None);
            };
            lowered_args.push(sql);
        }

        Ok(self
            .methods
            .iter()
            .find_map(|t| t.translate(function, instance.as_ref(), &lowered_args))
            .map(Lowered::Sql))
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Option<Lowered>, InternalError> {
        let Some(mut left) = self.lower_operand(left)? else {
            return Ok(None);
        };
        let Some(mut right) = self.lower_operand(right)? else {
            return Ok(None);
        };

        let op = lower_binary_op(op);
        let (ty, mapping) = if op.is_comparison() || op.is_logical() {
            if op.is_comparison() {
                // Comparison operands infer each other's mapping,
                // left-to-right precedence.
                let inferred = left.mapping().or_else(|| right.mapping()).cloned();
                if let Some(inferred) = &inferred {
                    left.absorb_mapping(inferred);
                    right.absorb_mapping(inferred);
                }
            }
            (
                ScalarType::new(ScalarKind::Bool),
                Some(TypeMapping::boolean()),
            )
        } else {
            let inferred = left.mapping().or_else(|| right.mapping()).cloned();
            if let Some(inferred) = &inferred {
                left.absorb_mapping(inferred);
                right.absorb_mapping(inferred);
            }
            let ty = left
                .scalar_type()
                .or_else(|| right.scalar_type())
                .unwrap_or(ScalarType::new(ScalarKind::Int));
            (ty, inferred)
        };

        Ok(Some(Lowered::Sql(SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
            mapping,
        })))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Option<Lowered>, InternalError> {
        let Some(operand) = self.lower_operand(operand)? else {
            return Ok(None);
        };

        let lowered = match op {
            UnaryOp::Not => SqlExpr::negation(operand),
            UnaryOp::Negate => {
                let ty = operand
                    .scalar_type()
                    .unwrap_or(ScalarType::new(ScalarKind::Int));
                let mapping = operand.mapping().cloned();
                SqlExpr::Unary {
                    op: SqlUnaryOp::Negate,
                    operand: Box::new(operand),
                    ty,
                    mapping,
                }
            }
        };

        Ok(Some(Lowered::Sql(lowered)))
    }

    fn lower_conditional(
        &mut self,
        test: &Expr,
        if_true: &Expr,
        if_false: &Expr,
    ) -> Result<Option<Lowered>, InternalError> {
        let Some(test) = self.lower_operand(test)? else {
            return Ok(None);
        };
        let Some(mut if_true) = self.lower_operand(if_true)? else {
            return Ok(None);
        };
        let Some(mut if_false) = self.lower_operand(if_false)? else {
            return Ok(None);
        };

        let inferred = if_true.mapping().or_else(|| if_false.mapping()).cloned();
        if let Some(inferred) = &inferred {
            if_true.absorb_mapping(inferred);
            if_false.absorb_mapping(inferred);
        }
        let ty = if_true
            .scalar_type()
            .or_else(|| if_false.scalar_type())
            .unwrap_or(ScalarType::new(ScalarKind::Bool));

        Ok(Some(Lowered::Sql(SqlExpr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            ty,
            mapping: inferred,
        })))
    }

    fn lower_cast(
        &mut self,
        operand: &Expr,
        target: &ScalarType,
    ) -> Result<Option<Lowered>, InternalError> {
        let Some(mut lowered) = self.lower_operand(operand)? else {
            return Ok(None);
        };

        match lowered.scalar_type() {
            // Context-typed operands (nulls) absorb the target mapping.
            None => {
                lowered.absorb_mapping(&TypeMapping::default_for(&target.kind));
                Ok(Some(Lowered::Sql(lowered)))
            }
            // Same underlying kind after nullability unwrap: the cast
            // is a widening artifact and is stripped.
            Some(source) if source.kind == target.kind => Ok(Some(Lowered::Sql(lowered))),
            // Enum-like sources convert through the target's mapping.
            Some(source) if source.kind == ScalarKind::Enum => Ok(Some(Lowered::Sql(retype(
                lowered,
                target.clone(),
                TypeMapping::default_for(&target.kind),
            )))),
            // Any other conversion is a documented gap, not a silent
            // mis-lowering.
            Some(_) => Ok(None),
        }
    }

    fn lower_in(
        &mut self,
        item: &Expr,
        collection: &Expr,
        negated: bool,
    ) -> Result<Option<Lowered>, InternalError> {
        let Some(item) = self.lower_operand(item)? else {
            return Ok(None);
        };
        let item_mapping = item.mapping().cloned();

        let values = match collection {
            Expr::Constant(Value::List(items)) => InListValues::Values(
                items
                    .iter()
                    .map(|value| SqlExpr::Constant {
                        value: value.clone(),
                        mapping: item_mapping.clone(),
                    })
                    .collect(),
            ),
            Expr::Parameter { name, ty } => {
                let mapping = item_mapping.clone().or_else(|| match &ty.kind {
                    ScalarKind::List(item) => Some(TypeMapping::default_for(item)),
                    _ => None,
                });
                InListValues::Parameter {
                    name: name.clone(),
                    mapping,
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(Lowered::Sql(SqlExpr::InList {
            item: Box::new(item),
            values,
            negated,
            mapping: Some(TypeMapping::boolean()),
        })))
    }

    fn lower_operand(&mut self, expr: &Expr) -> Result<Option<SqlExpr>, InternalError> {
        Ok(match self.translate_inner(expr)? {
            Some(Lowered::Sql(sql)) => Some(sql),
            // Object-valued operands have no scalar meaning here.
            Some(Lowered::Entity(_)) | None => None,
        })
    }
}

const fn lower_binary_op(op: BinaryOp) -> SqlBinaryOp {
    match op {
        BinaryOp::Add => SqlBinaryOp::Add,
        BinaryOp::Subtract => SqlBinaryOp::Subtract,
        BinaryOp::Multiply => SqlBinaryOp::Multiply,
        BinaryOp::Divide => SqlBinaryOp::Divide,
        BinaryOp::Modulo => SqlBinaryOp::Modulo,
        BinaryOp::Equal => SqlBinaryOp::Equal,
        BinaryOp::NotEqual => SqlBinaryOp::NotEqual,
        BinaryOp::GreaterThan => SqlBinaryOp::GreaterThan,
        BinaryOp::GreaterThanOrEqual => SqlBinaryOp::GreaterThanOrEqual,
        BinaryOp::LessThan => SqlBinaryOp::LessThan,
        BinaryOp::LessThanOrEqual => SqlBinaryOp::LessThanOrEqual,
        BinaryOp::And => SqlBinaryOp::And,
        BinaryOp::Or => SqlBinaryOp::Or,
    }
}

/// Rebuild a lowered node with a new static type and mapping, used by
/// enum-like cast conversions.
fn retype(expr: SqlExpr, ty: ScalarType, mapping: TypeMapping) -> SqlExpr {
    match expr {
        SqlExpr::Constant { value, .. } => SqlExpr::Constant {
            value,
            mapping: Some(mapping),
        },
        SqlExpr::Parameter { name, .. } => SqlExpr::Parameter {
            name,
            ty,
            mapping: Some(mapping),
        },
        SqlExpr::Column { object, name, .. } => SqlExpr::Column {
            object,
            name,
            ty,
            mapping: Some(mapping),
        },
        SqlExpr::Binary { op, left, right, .. } => SqlExpr::Binary {
            op,
            left,
            right,
            ty,
            mapping: Some(mapping),
        },
        SqlExpr::Unary { op, operand, .. } => SqlExpr::Unary {
            op,
            operand,
            ty,
            mapping: Some(mapping),
        },
        SqlExpr::Function { function, args, .. } => SqlExpr::Function {
            function,
            args,
            ty,
            mapping: Some(mapping),
        },
        SqlExpr::Conditional {
            test,
            if_true,
            if_false,
            ..
        } => SqlExpr::Conditional {
            test,
            if_true,
            if_false,
            ty,
            mapping: Some(mapping),
        },
        other @ (SqlExpr::Object(_) | SqlExpr::InList { .. }) => other,
    }
}
