use crate::value::{ScalarType, Value};
use std::ops::{BitAnd, BitOr};

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    And,
    Or,
}

///
/// UnaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Not,
    Negate,
}

///
/// HostFn
///
/// Closed set of host functions recognized in queries. Whether a
/// function translates to the store or evaluates client-side is decided
/// by the method-translator chain, not here.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostFn {
    /// Reserved property-by-name access form; routed to member binding.
    Property,
    Upper,
    Lower,
    Length,
    Contains,
    StartsWith,
    EndsWith,
    Abs,
    Ceiling,
    Floor,
    Round,
    /// Host-only string formatting; has no store translation.
    TitleCase,
}

///
/// Expr
///
/// Scalar expression over the current query element. `Source` denotes
/// the element itself; member chains navigate properties and embedded
/// navigations of it.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Source,
    Constant(Value),
    Parameter {
        name: String,
        ty: ScalarType,
    },
    Member {
        object: Box<Self>,
        name: String,
    },
    Call {
        function: HostFn,
        object: Option<Box<Self>>,
        args: Vec<Self>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Self>,
    },
    Conditional {
        test: Box<Self>,
        if_true: Box<Self>,
        if_false: Box<Self>,
    },
    Coalesce {
        left: Box<Self>,
        right: Box<Self>,
    },
    Cast {
        operand: Box<Self>,
        target: ScalarType,
    },
    /// Membership test against a collection-valued constant or
    /// parameter.
    In {
        item: Box<Self>,
        collection: Box<Self>,
        negated: bool,
    },
}

impl Expr {
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub fn parameter(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::Parameter {
            name: name.into(),
            ty,
        }
    }

    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Self::Member {
            object: Box::new(self),
            name: name.into(),
        }
    }

    /// Property access by runtime name; binds through the same path as
    /// a member access.
    #[must_use]
    pub fn property_of(object: Self, name: impl Into<String>) -> Self {
        Self::Call {
            function: HostFn::Property,
            object: Some(Box::new(object)),
            args: vec![Self::constant(name.into())],
        }
    }

    #[must_use]
    pub fn call(function: HostFn, object: Option<Self>, args: Vec<Self>) -> Self {
        Self::Call {
            function,
            object: object.map(Box::new),
            args,
        }
    }

    #[must_use]
    pub fn conditional(test: Self, if_true: Self, if_false: Self) -> Self {
        Self::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    #[must_use]
    pub fn coalesce(self, other: Self) -> Self {
        Self::Coalesce {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    #[must_use]
    pub fn cast(self, target: ScalarType) -> Self {
        Self::Cast {
            operand: Box::new(self),
            target,
        }
    }

    #[must_use]
    pub fn is_in(self, collection: Self) -> Self {
        Self::In {
            item: Box::new(self),
            collection: Box::new(collection),
            negated: false,
        }
    }

    #[must_use]
    pub fn not_in(self, collection: Self) -> Self {
        Self::In {
            item: Box::new(self),
            collection: Box::new(collection),
            negated: true,
        }
    }

    fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn eq(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::Equal, self, rhs.into())
    }

    #[must_use]
    pub fn ne(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::NotEqual, self, rhs.into())
    }

    #[must_use]
    pub fn gt(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::GreaterThan, self, rhs.into())
    }

    #[must_use]
    pub fn gte(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::GreaterThanOrEqual, self, rhs.into())
    }

    #[must_use]
    pub fn lt(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::LessThan, self, rhs.into())
    }

    #[must_use]
    pub fn lte(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::LessThanOrEqual, self, rhs.into())
    }

    #[must_use]
    pub fn add(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::Add, self, rhs.into())
    }

    #[must_use]
    pub fn subtract(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::Subtract, self, rhs.into())
    }

    #[must_use]
    pub fn multiply(self, rhs: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::Multiply, self, rhs.into())
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }

    // string helpers

    #[must_use]
    pub fn upper(self) -> Self {
        Self::call(HostFn::Upper, Some(self), Vec::new())
    }

    #[must_use]
    pub fn lower(self) -> Self {
        Self::call(HostFn::Lower, Some(self), Vec::new())
    }

    #[must_use]
    pub fn length(self) -> Self {
        Self::call(HostFn::Length, Some(self), Vec::new())
    }

    #[must_use]
    pub fn contains(self, needle: impl Into<Self>) -> Self {
        Self::call(HostFn::Contains, Some(self), vec![needle.into()])
    }

    #[must_use]
    pub fn starts_with(self, prefix: impl Into<Self>) -> Self {
        Self::call(HostFn::StartsWith, Some(self), vec![prefix.into()])
    }

    #[must_use]
    pub fn title_case(self) -> Self {
        Self::call(HostFn::TitleCase, Some(self), Vec::new())
    }
}

impl BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::binary(BinaryOp::And, self, rhs)
    }
}

impl BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::binary(BinaryOp::Or, self, rhs)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Self::Constant(v)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Self::Constant(Value::Bool(v))
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Self::Constant(Value::Int(v))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Self::Constant(Value::Float(v))
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Self::Constant(Value::Text(v.to_string()))
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        Self::Constant(Value::Text(v))
    }
}

/// Property access on the current element.
#[must_use]
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Source.member(name)
}
