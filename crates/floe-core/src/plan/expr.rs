use crate::{
    error::InternalError,
    model::mapping::TypeMapping,
    value::{ScalarKind, ScalarType, Value},
};
use derive_more::Display;

///
/// SqlBinaryOp
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SqlBinaryOp {
    #[display("+")]
    Add,
    #[display("-")]
    Subtract,
    #[display("*")]
    Multiply,
    #[display("/")]
    Divide,
    #[display("%")]
    Modulo,
    #[display("=")]
    Equal,
    #[display("!=")]
    NotEqual,
    #[display(">")]
    GreaterThan,
    #[display(">=")]
    GreaterThanOrEqual,
    #[display("<")]
    LessThan,
    #[display("<=")]
    LessThanOrEqual,
    #[display("AND")]
    And,
    #[display("OR")]
    Or,
}

impl SqlBinaryOp {
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
                | Self::LessThan
                | Self::LessThanOrEqual
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

///
/// SqlUnaryOp
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SqlUnaryOp {
    #[display("NOT")]
    Not,
    #[display("-")]
    Negate,
}

///
/// SqlFunction
///
/// Closed set of functions the text generator can render. Adding a
/// store function means adding a variant here and a translator that
/// produces it.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SqlFunction {
    #[display("COUNT")]
    Count,
    #[display("SUM")]
    Sum,
    #[display("AVG")]
    Avg,
    #[display("MIN")]
    Min,
    #[display("MAX")]
    Max,
    #[display("CONTAINS")]
    Contains,
    #[display("STARTSWITH")]
    StartsWith,
    #[display("ENDSWITH")]
    EndsWith,
    #[display("UPPER")]
    Upper,
    #[display("LOWER")]
    Lower,
    #[display("LENGTH")]
    Length,
    #[display("ABS")]
    Abs,
    #[display("CEILING")]
    Ceiling,
    #[display("FLOOR")]
    Floor,
    #[display("ROUND")]
    Round,
    #[display("DateTimePart")]
    DateTimePart,
    #[display("IS_NULL")]
    IsNull,
}

impl SqlFunction {
    #[must_use]
    pub const fn is_aggregate(self) -> bool {
        matches!(
            self,
            Self::Count | Self::Sum | Self::Avg | Self::Min | Self::Max
        )
    }
}

///
/// ObjectExpr
///
/// Structural access path to an object value: the root source reference
/// or an embedded-navigation chain under it. Object access carries no
/// type mapping; it addresses sub-documents, not scalar literals.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ObjectExpr {
    Root { alias: String },
    Nested { object: Box<Self>, name: String },
}

impl ObjectExpr {
    #[must_use]
    pub fn root(alias: impl Into<String>) -> Self {
        Self::Root {
            alias: alias.into(),
        }
    }

    #[must_use]
    pub fn nested(self, name: impl Into<String>) -> Self {
        Self::Nested {
            object: Box::new(self),
            name: name.into(),
        }
    }

    /// The terminal access name: the navigation name for nested access,
    /// the source alias at the root.
    #[must_use]
    pub fn terminal_name(&self) -> &str {
        match self {
            Self::Root { alias } => alias,
            Self::Nested { name, .. } => name,
        }
    }
}

///
/// InListValues
///
/// Right-hand side of a membership test: a finite lowered value list,
/// or a collection-valued parameter expanded at execution time.
///

#[derive(Clone, Debug, PartialEq)]
pub enum InListValues {
    Values(Vec<SqlExpr>),
    Parameter {
        name: String,
        mapping: Option<TypeMapping>,
    },
}

///
/// SqlExpr
///
/// Scalar vocabulary of the logical plan. Closed union; every lowering
/// rule produces exactly these shapes, and the text generator matches
/// them exhaustively.
///

#[derive(Clone, Debug, PartialEq)]
pub enum SqlExpr {
    Constant {
        value: Value,
        mapping: Option<TypeMapping>,
    },
    Parameter {
        name: String,
        ty: ScalarType,
        mapping: Option<TypeMapping>,
    },
    /// Scalar property access on an object access path.
    Column {
        object: ObjectExpr,
        name: String,
        ty: ScalarType,
        mapping: Option<TypeMapping>,
    },
    /// Object-valued sub-document access; structural, never mapped.
    Object(ObjectExpr),
    Binary {
        op: SqlBinaryOp,
        left: Box<Self>,
        right: Box<Self>,
        ty: ScalarType,
        mapping: Option<TypeMapping>,
    },
    Unary {
        op: SqlUnaryOp,
        operand: Box<Self>,
        ty: ScalarType,
        mapping: Option<TypeMapping>,
    },
    Function {
        function: SqlFunction,
        args: Vec<Self>,
        ty: ScalarType,
        mapping: Option<TypeMapping>,
    },
    Conditional {
        test: Box<Self>,
        if_true: Box<Self>,
        if_false: Box<Self>,
        ty: ScalarType,
        mapping: Option<TypeMapping>,
    },
    InList {
        item: Box<Self>,
        values: InListValues,
        negated: bool,
        mapping: Option<TypeMapping>,
    },
}

impl SqlExpr {
    #[must_use]
    pub const fn constant(value: Value) -> Self {
        Self::Constant {
            value,
            mapping: None,
        }
    }

    #[must_use]
    pub const fn constant_mapped(value: Value, mapping: TypeMapping) -> Self {
        Self::Constant {
            value,
            mapping: Some(mapping),
        }
    }

    #[must_use]
    pub const fn bool_constant(value: bool) -> Self {
        Self::constant_mapped(Value::Bool(value), TypeMapping::boolean())
    }

    #[must_use]
    pub fn int_constant(value: i64) -> Self {
        Self::constant_mapped(Value::Int(value), TypeMapping::default_for(&ScalarKind::Int))
    }

    #[must_use]
    pub fn equal(left: Self, right: Self) -> Self {
        Self::Binary {
            op: SqlBinaryOp::Equal,
            left: Box::new(left),
            right: Box::new(right),
            ty: ScalarType::new(ScalarKind::Bool),
            mapping: Some(TypeMapping::boolean()),
        }
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::Binary {
            op: SqlBinaryOp::And,
            left: Box::new(left),
            right: Box::new(right),
            ty: ScalarType::new(ScalarKind::Bool),
            mapping: Some(TypeMapping::boolean()),
        }
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::Binary {
            op: SqlBinaryOp::Or,
            left: Box::new(left),
            right: Box::new(right),
            ty: ScalarType::new(ScalarKind::Bool),
            mapping: Some(TypeMapping::boolean()),
        }
    }

    #[must_use]
    pub fn negation(operand: Self) -> Self {
        Self::Unary {
            op: SqlUnaryOp::Not,
            operand: Box::new(operand),
            ty: ScalarType::new(ScalarKind::Bool),
            mapping: Some(TypeMapping::boolean()),
        }
    }

    #[must_use]
    pub fn is_null_check(item: Self) -> Self {
        Self::Function {
            function: SqlFunction::IsNull,
            args: vec![item],
            ty: ScalarType::new(ScalarKind::Bool),
            mapping: Some(TypeMapping::boolean()),
        }
    }

    /// True for the syntactic boolean literal `true`, which is a no-op
    /// as a predicate.
    #[must_use]
    pub const fn is_true_literal(&self) -> bool {
        matches!(
            self,
            Self::Constant {
                value: Value::Bool(true),
                ..
            }
        )
    }

    /// Type mapping of this node; `None` for structural object access.
    #[must_use]
    pub const fn mapping(&self) -> Option<&TypeMapping> {
        match self {
            Self::Object(_) => None,
            Self::Constant { mapping, .. }
            | Self::Parameter { mapping, .. }
            | Self::Column { mapping, .. }
            | Self::Binary { mapping, .. }
            | Self::Unary { mapping, .. }
            | Self::Function { mapping, .. }
            | Self::Conditional { mapping, .. }
            | Self::InList { mapping, .. } => mapping.as_ref(),
        }
    }

    /// Scalar type of this node; `None` for object access and for
    /// constants whose kind is context-dependent (nulls).
    #[must_use]
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Object(_) => None,
            Self::Constant { value, .. } => value.kind().map(ScalarType::new),
            Self::Parameter { ty, .. }
            | Self::Column { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Unary { ty, .. }
            | Self::Function { ty, .. }
            | Self::Conditional { ty, .. } => Some(ty.clone()),
            Self::InList { .. } => Some(ScalarType::new(ScalarKind::Bool)),
        }
    }

    /// Push an inferred type mapping into this node where none is set.
    ///
    /// Only bare constants and parameters absorb inference; composed
    /// nodes decide their own mapping at construction.
    pub fn absorb_mapping(&mut self, inferred: &TypeMapping) {
        match self {
            Self::Constant { mapping, .. } | Self::Parameter { mapping, .. } => {
                if mapping.is_none() {
                    *mapping = Some(inferred.clone());
                }
            }
            Self::Conditional {
                if_true,
                if_false,
                mapping,
                ..
            } => {
                if mapping.is_none() {
                    *mapping = Some(inferred.clone());
                }
                if_true.absorb_mapping(inferred);
                if_false.absorb_mapping(inferred);
            }
            _ => {}
        }
    }
}

/// Fill default mappings on any remaining unmapped constants and
/// parameters, bottom-up.
pub(crate) fn fill_default_mappings(expr: &mut SqlExpr) {
    match expr {
        SqlExpr::Constant { value, mapping } => {
            if mapping.is_none() {
                *mapping = value.kind().map(|kind| TypeMapping::default_for(&kind));
            }
        }
        SqlExpr::Parameter { ty, mapping, .. } => {
            if mapping.is_none() {
                *mapping = Some(TypeMapping::default_for(&ty.kind));
            }
        }
        SqlExpr::Column { .. } | SqlExpr::Object(_) => {}
        SqlExpr::Binary { left, right, .. } => {
            fill_default_mappings(left);
            fill_default_mappings(right);
        }
        SqlExpr::Unary { operand, .. } => fill_default_mappings(operand),
        SqlExpr::Function { args, .. } => {
            for arg in args {
                fill_default_mappings(arg);
            }
        }
        SqlExpr::Conditional {
            test,
            if_true,
            if_false,
            ..
        } => {
            fill_default_mappings(test);
            fill_default_mappings(if_true);
            fill_default_mappings(if_false);
        }
        SqlExpr::InList { item, values, .. } => {
            fill_default_mappings(item);
            if let InListValues::Values(values) = values {
                for value in values {
                    fill_default_mappings(value);
                }
            }
        }
    }
}

/// Post-lowering verification: every node other than object access must
/// carry a resolved type mapping. A failure here is an internal
/// consistency bug, not a user error.
pub(crate) fn verify_mappings(expr: &SqlExpr) -> Result<(), InternalError> {
    if !matches!(expr, SqlExpr::Object(_)) && expr.mapping().is_none() {
        return Err(InternalError::query_invariant(format!(
            "lowered expression node is missing a type mapping: {expr:?}"
        )));
    }

    match expr {
        SqlExpr::Constant { .. }
        | SqlExpr::Parameter { .. }
        | SqlExpr::Column { .. }
        | SqlExpr::Object(_) => Ok(()),
        SqlExpr::Binary { left, right, .. } => {
            verify_mappings(left)?;
            verify_mappings(right)
        }
        SqlExpr::Unary { operand, .. } => verify_mappings(operand),
        SqlExpr::Function { args, .. } => {
            for arg in args {
                verify_mappings(arg)?;
            }
            Ok(())
        }
        SqlExpr::Conditional {
            test,
            if_true,
            if_false,
            ..
        } => {
            verify_mappings(test)?;
            verify_mappings(if_true)?;
            verify_mappings(if_false)
        }
        SqlExpr::InList { item, values, .. } => {
            verify_mappings(item)?;
            match values {
                InListValues::Values(values) => {
                    for value in values {
                        verify_mappings(value)?;
                    }
                    Ok(())
                }
                InListValues::Parameter { mapping, .. } => {
                    if mapping.is_none() {
                        return Err(InternalError::query_invariant(
                            "membership parameter is missing a type mapping",
                        ));
                    }
                    Ok(())
                }
            }
        }
    }
}
