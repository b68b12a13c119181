use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    lower::binder::{BoundShape, ClientExpr, ProjectionBinding},
    model::entity::EntityModel,
    plan::SelectPlan,
    query::expr::HostFn,
    value::{ScalarKind, ScalarType, Value},
};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::{collections::BTreeMap, sync::Arc};

///
/// ExecContext
///
/// Per-execution context handed to the shaper: the live parameter
/// values client-evaluated placeholders read from.
///

#[derive(Clone, Debug, Default)]
pub struct ExecContext {
    pub parameters: BTreeMap<String, Value>,
}

///
/// QueryOutput
///
/// One shaped result value. Entity outputs keep the raw document so a
/// downstream identity-resolution layer can extract property values
/// without re-querying.
///

#[derive(Clone, Debug)]
pub enum QueryOutput {
    Entity(EntityRow),
    Record(Vec<(String, Self)>),
    Scalar(Value),
}

///
/// EntityRow
///
/// A materialized entity: its schema model plus the raw document it
/// was shaped from.
///

#[derive(Clone, Debug)]
pub struct EntityRow {
    pub model: Arc<EntityModel>,
    pub document: Json,
}

impl EntityRow {
    /// Extract one property value from the retained document.
    pub fn property(&self, name: &str) -> Result<Option<Value>, InternalError> {
        let Some(property) = self.model.property(name) else {
            return Ok(None);
        };
        let Some(raw) = self.document.get(&property.store_name) else {
            return Ok(None);
        };

        decode(&property.ty, raw).map(Some)
    }
}

type ShaperFn = Arc<dyn Fn(&ExecContext, &Json) -> Result<QueryOutput, InternalError> + Send + Sync>;

///
/// Shaper
///
/// The compiled shaping function: pure, compiled once per query shape,
/// reused across every row of every execution.
///

#[derive(Clone)]
pub struct Shaper {
    shape: ShaperFn,
}

impl Shaper {
    pub fn shape(&self, ctx: &ExecContext, row: &Json) -> Result<QueryOutput, InternalError> {
        (self.shape)(ctx, row)
    }
}

/// Compile the shaping function for a finalized plan and bound shape.
pub(crate) fn compile_shaper(plan: &SelectPlan, shape: &BoundShape) -> Shaper {
    let aliases: Vec<String> = plan
        .projections()
        .iter()
        .map(|p| p.alias.clone())
        .collect();
    let value_form = plan.uses_value_form();
    let shape = shape.clone();

    Shaper {
        shape: Arc::new(move |ctx, row| shape_value(&shape, ctx, row, &aliases, value_form)),
    }
}

static JSON_NULL: Json = Json::Null;

fn slot_value<'r>(row: &'r Json, aliases: &[String], value_form: bool, slot: usize) -> &'r Json {
    if value_form {
        return row;
    }
    aliases
        .get(slot)
        .and_then(|alias| row.get(alias))
        .unwrap_or(&JSON_NULL)
}

fn bound_slot(binding: &ProjectionBinding) -> Result<usize, InternalError> {
    match binding {
        ProjectionBinding::Slot(slot) => Ok(*slot),
        ProjectionBinding::Path(path) => Err(InternalError::query_invariant(format!(
            "shaper received unresolved projection path '{path}'"
        ))),
    }
}

fn shape_value(
    shape: &BoundShape,
    ctx: &ExecContext,
    row: &Json,
    aliases: &[String],
    value_form: bool,
) -> Result<QueryOutput, InternalError> {
    match shape {
        BoundShape::Entity(entity) => {
            let binding = entity.binding.as_ref().ok_or_else(|| {
                InternalError::query_invariant("top-level entity shape has no projection binding")
            })?;
            let slot = bound_slot(binding)?;
            let document = slot_value(row, aliases, value_form, slot).clone();

            Ok(QueryOutput::Entity(EntityRow {
                model: Arc::clone(&entity.model),
                document,
            }))
        }
        BoundShape::Record(fields) => Ok(QueryOutput::Record(
            fields
                .iter()
                .map(|(name, field)| {
                    Ok((
                        name.clone(),
                        shape_value(field, ctx, row, aliases, value_form)?,
                    ))
                })
                .collect::<Result<_, InternalError>>()?,
        )),
        BoundShape::Scalar { binding, ty } => {
            let slot = bound_slot(binding)?;
            decode(ty, slot_value(row, aliases, value_form, slot)).map(QueryOutput::Scalar)
        }
        BoundShape::Client(client) => {
            eval_client(client, ctx, row, aliases, value_form).map(QueryOutput::Scalar)
        }
    }
}

/// Decode one raw JSON value into the host vocabulary for the expected
/// scalar type. Shape mismatches are store-data corruption.
pub(crate) fn decode(ty: &ScalarType, raw: &Json) -> Result<Value, InternalError> {
    match (raw, &ty.kind) {
        (Json::Null, _) => Ok(Value::Null),
        (Json::Bool(v), ScalarKind::Bool) => Ok(Value::Bool(*v)),
        (Json::Number(n), ScalarKind::Int) => n.as_i64().map(Value::Int).ok_or_else(|| {
            InternalError::shaper_corruption(format!("number {n} does not fit an integer"))
        }),
        (Json::Number(n), ScalarKind::Float) => n.as_f64().map(Value::Float).ok_or_else(|| {
            InternalError::shaper_corruption(format!("number {n} is not representable as float"))
        }),
        (Json::Number(n), ScalarKind::Timestamp) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(Value::Timestamp)
            .ok_or_else(|| {
                InternalError::shaper_corruption(format!("invalid epoch timestamp {n}"))
            }),
        (Json::String(s), ScalarKind::Text | ScalarKind::Enum) => Ok(Value::Text(s.clone())),
        (Json::String(s), ScalarKind::Timestamp) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|err| {
                InternalError::shaper_corruption(format!("invalid timestamp '{s}': {err}"))
            }),
        (Json::Array(items), ScalarKind::List(item_kind)) => {
            let item_ty = ScalarType::nullable((**item_kind).clone());
            items
                .iter()
                .map(|item| decode(&item_ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        (raw, kind) => Err(InternalError::shaper_corruption(format!(
            "value {raw} does not decode as {kind:?}"
        ))),
    }
}

fn eval_client(
    client: &ClientExpr,
    ctx: &ExecContext,
    row: &Json,
    aliases: &[String],
    value_form: bool,
) -> Result<Value, InternalError> {
    match client {
        ClientExpr::Constant(value) => Ok(value.clone()),
        ClientExpr::ParameterLookup { name } => {
            ctx.parameters.get(name).cloned().ok_or_else(|| {
                InternalError::executor_invariant(format!("unknown query parameter '{name}'"))
            })
        }
        ClientExpr::Slot { index, ty } => decode(ty, slot_value(row, aliases, value_form, *index)),
        ClientExpr::Call {
            function,
            object,
            args,
        } => {
            let instance = object
                .as_deref()
                .map(|o| eval_client(o, ctx, row, aliases, value_form))
                .transpose()?;
            let args = args
                .iter()
                .map(|a| eval_client(a, ctx, row, aliases, value_form))
                .collect::<Result<Vec<_>, _>>()?;

            apply_host_fn(*function, instance, &args)
        }
    }
}

fn host_eval_error(message: impl Into<String>) -> InternalError {
    InternalError::new(ErrorClass::Internal, ErrorOrigin::Shaper, message)
}

fn apply_host_fn(
    function: HostFn,
    instance: Option<Value>,
    args: &[Value],
) -> Result<Value, InternalError> {
    let text_instance = || match &instance {
        Some(Value::Text(s)) => Ok(s.clone()),
        other => Err(host_eval_error(format!(
            "host function {function:?} expects a text instance, got {other:?}"
        ))),
    };
    let text_arg = |i: usize| match args.get(i) {
        Some(Value::Text(s)) => Ok(s.clone()),
        other => Err(host_eval_error(format!(
            "host function {function:?} expects a text argument, got {other:?}"
        ))),
    };

    match function {
        HostFn::Upper => Ok(Value::Text(text_instance()?.to_uppercase())),
        HostFn::Lower => Ok(Value::Text(text_instance()?.to_lowercase())),
        HostFn::Length => Ok(Value::Int(text_instance()?.chars().count() as i64)),
        HostFn::Contains => Ok(Value::Bool(text_instance()?.contains(&text_arg(0)?))),
        HostFn::StartsWith => Ok(Value::Bool(text_instance()?.starts_with(&text_arg(0)?))),
        HostFn::EndsWith => Ok(Value::Bool(text_instance()?.ends_with(&text_arg(0)?))),
        HostFn::TitleCase => Ok(Value::Text(title_case(&text_instance()?))),
        HostFn::Abs => match instance {
            Some(Value::Int(v)) => Ok(Value::Int(v.abs())),
            Some(Value::Float(v)) => Ok(Value::Float(v.abs())),
            other => Err(host_eval_error(format!("ABS over non-numeric {other:?}"))),
        },
        HostFn::Ceiling => numeric_unary(instance, f64::ceil, "CEILING"),
        HostFn::Floor => numeric_unary(instance, f64::floor, "FLOOR"),
        HostFn::Round => numeric_unary(instance, f64::round, "ROUND"),
        HostFn::Property => Err(host_eval_error(
            "property-by-name access must bind during lowering",
        )),
    }
}

fn numeric_unary(
    instance: Option<Value>,
    f: fn(f64) -> f64,
    name: &str,
) -> Result<Value, InternalError> {
    match instance {
        Some(Value::Int(v)) => Ok(Value::Int(v)),
        Some(Value::Float(v)) => Ok(Value::Float(f(v))),
        other => Err(host_eval_error(format!("{name} over non-numeric {other:?}"))),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
