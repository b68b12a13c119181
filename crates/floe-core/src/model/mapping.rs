use crate::{
    error::InternalError,
    value::{ScalarKind, Value},
};
use serde::Serialize;
use serde_json::{Number, Value as Json};

///
/// StoreType
///
/// Store-facing type surface of the document dialect. Deliberately
/// small; documents are JSON and everything narrows to these shapes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum StoreType {
    Boolean,
    Number,
    Text,
    Array,
}

///
/// ValueConverter
///
/// Named conversion applied when a host value crosses to the store.
/// The same converter runs for inline literals and for bound
/// parameters, so custom serializations apply identically to both.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ValueConverter {
    EnumToText,
    TimestampToIso8601,
    TimestampToEpochMillis,
}

///
/// TypeMapping
///
/// Store type plus optional value conversion for one scalar position.
/// Every non-structural plan node must carry one before the plan is
/// accepted; the post-lowering verification pass enforces this.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TypeMapping {
    pub store_type: StoreType,
    pub converter: Option<ValueConverter>,
}

impl TypeMapping {
    #[must_use]
    pub const fn new(store_type: StoreType) -> Self {
        Self {
            store_type,
            converter: None,
        }
    }

    #[must_use]
    pub const fn with_converter(store_type: StoreType, converter: ValueConverter) -> Self {
        Self {
            store_type,
            converter: Some(converter),
        }
    }

    /// The fixed mapping for boolean-valued nodes (comparisons,
    /// logical operators, membership tests).
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(StoreType::Boolean)
    }

    /// Default mapping for a scalar kind.
    #[must_use]
    pub fn default_for(kind: &ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Self::new(StoreType::Boolean),
            ScalarKind::Int | ScalarKind::Float => Self::new(StoreType::Number),
            ScalarKind::Text => Self::new(StoreType::Text),
            ScalarKind::Timestamp => {
                Self::with_converter(StoreType::Text, ValueConverter::TimestampToIso8601)
            }
            ScalarKind::Enum => Self::with_converter(StoreType::Text, ValueConverter::EnumToText),
            ScalarKind::List(_) => Self::new(StoreType::Array),
        }
    }

    /// Encode one host value for the store.
    ///
    /// This is the single conversion path shared by literal rendering
    /// and parameter binding.
    pub fn encode(&self, value: &Value) -> Result<Json, InternalError> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Bool(v) => Ok(Json::Bool(*v)),
            Value::Int(v) => Ok(Json::Number(Number::from(*v))),
            Value::Float(v) => Number::from_f64(*v).map(Json::Number).ok_or_else(|| {
                InternalError::render_invariant(format!("non-finite float {v} cannot be encoded"))
            }),
            Value::Text(v) => Ok(Json::String(v.clone())),
            Value::Timestamp(v) => match self.converter {
                Some(ValueConverter::TimestampToEpochMillis) => {
                    Ok(Json::Number(Number::from(v.timestamp_millis())))
                }
                _ => Ok(Json::String(v.to_rfc3339())),
            },
            Value::Enum(v) => Ok(Json::String(v.variant.clone())),
            Value::List(items) => {
                let mut encoded = Vec::with_capacity(items.len());
                for item in items {
                    encoded.push(self.encode(item)?);
                }
                Ok(Json::Array(encoded))
            }
        }
    }
}
