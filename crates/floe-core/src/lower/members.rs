use crate::{
    model::mapping::TypeMapping,
    plan::{SqlExpr, SqlFunction},
    query::expr::HostFn,
    value::{ScalarKind, ScalarType, Value},
};

///
/// MemberTranslator
///
/// One link in the member-translator chain: maps a host-type member on
/// an already-lowered instance to a store expression. Translators are
/// tried in registration order; the first success wins.
///

pub trait MemberTranslator {
    fn translate(&self, instance: &SqlExpr, member: &str) -> Option<SqlExpr>;
}

///
/// MethodTranslator
///
/// One link in the method-translator chain, keyed by host function
/// identity. Operands arrive already lowered.
///

pub trait MethodTranslator {
    fn translate(
        &self,
        function: HostFn,
        instance: Option<&SqlExpr>,
        args: &[SqlExpr],
    ) -> Option<SqlExpr>;
}

pub(crate) fn default_member_translators() -> Vec<Box<dyn MemberTranslator>> {
    vec![Box::new(TimestampPartTranslator)]
}

pub(crate) fn default_method_translators() -> Vec<Box<dyn MethodTranslator>> {
    vec![Box::new(StringMethodTranslator), Box::new(MathMethodTranslator)]
}

fn kind_of(expr: &SqlExpr) -> Option<ScalarKind> {
    expr.scalar_type().map(|ty| ty.kind)
}

///
/// TimestampPartTranslator
///
/// Maps timestamp part members (`year`, `month`, ...) to the store's
/// DateTimePart function.
///

pub struct TimestampPartTranslator;

impl MemberTranslator for TimestampPartTranslator {
    fn translate(&self, instance: &SqlExpr, member: &str) -> Option<SqlExpr> {
        const PARTS: &[&str] = &["year", "month", "day", "hour", "minute", "second"];

        if kind_of(instance) != Some(ScalarKind::Timestamp) || !PARTS.contains(&member) {
            return None;
        }

        Some(SqlExpr::Function {
            function: SqlFunction::DateTimePart,
            args: vec![
                SqlExpr::constant_mapped(
                    Value::Text(member.to_string()),
                    TypeMapping::default_for(&ScalarKind::Text),
                ),
                instance.clone(),
            ],
            ty: ScalarType::new(ScalarKind::Int),
            mapping: Some(TypeMapping::default_for(&ScalarKind::Int)),
        })
    }
}

///
/// StringMethodTranslator
///
/// Text functions with direct store counterparts.
///

pub struct StringMethodTranslator;

impl MethodTranslator for StringMethodTranslator {
    fn translate(
        &self,
        function: HostFn,
        instance: Option<&SqlExpr>,
        args: &[SqlExpr],
    ) -> Option<SqlExpr> {
        let instance = instance?;
        if kind_of(instance) != Some(ScalarKind::Text) {
            return None;
        }

        let (function, ty) = match function {
            HostFn::Upper => (SqlFunction::Upper, ScalarType::new(ScalarKind::Text)),
            HostFn::Lower => (SqlFunction::Lower, ScalarType::new(ScalarKind::Text)),
            HostFn::Length => (SqlFunction::Length, ScalarType::new(ScalarKind::Int)),
            HostFn::Contains => (SqlFunction::Contains, ScalarType::new(ScalarKind::Bool)),
            HostFn::StartsWith => (SqlFunction::StartsWith, ScalarType::new(ScalarKind::Bool)),
            HostFn::EndsWith => (SqlFunction::EndsWith, ScalarType::new(ScalarKind::Bool)),
            _ => return None,
        };

        let mapping = Some(TypeMapping::default_for(&ty.kind));
        let mut all_args = Vec::with_capacity(args.len() + 1);
        all_args.push(instance.clone());
        all_args.extend(args.iter().cloned());

        Some(SqlExpr::Function {
            function,
            args: all_args,
            ty,
            mapping,
        })
    }
}

///
/// MathMethodTranslator
///
/// Numeric functions with direct store counterparts.
///

pub struct MathMethodTranslator;

impl MethodTranslator for MathMethodTranslator {
    fn translate(
        &self,
        function: HostFn,
        instance: Option<&SqlExpr>,
        args: &[SqlExpr],
    ) -> Option<SqlExpr> {
        let instance = instance?;
        if !args.is_empty() {
            return None;
        }
        let ty = instance.scalar_type()?;
        if !matches!(ty.kind, ScalarKind::Int | ScalarKind::Float) {
            return None;
        }

        let function = match function {
            HostFn::Abs => SqlFunction::Abs,
            HostFn::Ceiling => SqlFunction::Ceiling,
            HostFn::Floor => SqlFunction::Floor,
            HostFn::Round => SqlFunction::Round,
            _ => return None,
        };

        let mapping = instance.mapping().cloned();

        Some(SqlExpr::Function {
            function,
            args: vec![instance.clone()],
            ty,
            mapping,
        })
    }
}
