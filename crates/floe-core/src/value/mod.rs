#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::Serialize;
use std::fmt;

///
/// Value
///
/// Host-side scalar vocabulary carried by constants, parameters, and
/// shaped results. Documents themselves stay `serde_json::Value`; this
/// type is the typed side of the boundary.
///
/// Null → the field's value is absent (store NULL).
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Enum(EnumValue),
    /// Ordered list of values.
    /// Used for collection-valued parameters and membership tests.
    List(Vec<Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Scalar kind of this value; `None` for nulls, whose kind is
    /// determined by context (type-mapping inference).
    #[must_use]
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ScalarKind::Bool),
            Self::Int(_) => Some(ScalarKind::Int),
            Self::Float(_) => Some(ScalarKind::Float),
            Self::Text(_) => Some(ScalarKind::Text),
            Self::Timestamp(_) => Some(ScalarKind::Timestamp),
            Self::Enum(_) => Some(ScalarKind::Enum),
            Self::List(items) => {
                let item = items.iter().find_map(Self::kind)?;
                Some(ScalarKind::List(Box::new(item)))
            }
        }
    }

    /// Additive identity for numeric kinds.
    ///
    /// Used by the Sum aggregate to coerce an empty-sequence null into
    /// the result type's zero.
    #[must_use]
    pub fn zero(kind: &ScalarKind) -> Option<Self> {
        match kind {
            ScalarKind::Int => Some(Self::Int(i64::zero())),
            ScalarKind::Float => Some(Self::Float(f64::zero())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Enum(v) => write!(f, "{v}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::List(v)
    }
}

///
/// EnumValue
///
/// A named enum variant as carried through queries. Enums travel by
/// variant name; the store-facing representation is decided by the
/// property's type mapping.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EnumValue {
    pub type_name: String,
    pub variant: String,
}

impl EnumValue {
    #[must_use]
    pub fn new(type_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_name, self.variant)
    }
}

///
/// ScalarKind
///
/// Closed kind surface shared by the schema model, the source AST, and
/// the plan vocabulary. A lossy projection of host types, aligned with
/// `Value` variants.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Enum,
    List(Box<Self>),
}

///
/// ScalarType
/// Scalar kind plus nullability, as tracked through lowering.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ScalarType {
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl ScalarType {
    #[must_use]
    pub const fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn nullable(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    #[must_use]
    pub fn as_nullable(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            nullable: true,
        }
    }

    /// True when two types share the same kind, ignoring nullability.
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}
