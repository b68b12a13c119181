use super::*;
use crate::{
    error::ErrorClass,
    exec::ExecParams,
    model::mapping::TypeMapping,
    plan::{
        EntityProjectionArena, MappedProjection, ObjectExpr, OrderingKey, SelectPlan, ShapePath,
        SourceRef, SqlExpr, SqlFunction,
    },
    value::{ScalarKind, ScalarType, Value},
};

fn col(name: &str, kind: ScalarKind) -> SqlExpr {
    SqlExpr::Column {
        object: ObjectExpr::root("c"),
        name: name.to_string(),
        ty: ScalarType::new(kind.clone()),
        mapping: Some(TypeMapping::default_for(&kind)),
    }
}

fn finalized(mut plan: SelectPlan) -> SelectPlan {
    plan.apply_projection(&EntityProjectionArena::new()).unwrap();
    plan
}

#[test]
fn clause_order_is_filter_then_ordering_then_pagination() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root().child("name"),
        MappedProjection::Scalar(col("name", ScalarKind::Text)),
    )
    .unwrap();
    plan.apply_predicate(SqlExpr::Binary {
        op: crate::plan::SqlBinaryOp::GreaterThan,
        left: Box::new(col("amount", ScalarKind::Int)),
        right: Box::new(SqlExpr::int_constant(10)),
        ty: ScalarType::new(ScalarKind::Bool),
        mapping: Some(TypeMapping::boolean()),
    });
    plan.apply_ordering(OrderingKey::asc(col("name", ScalarKind::Text)))
        .unwrap();
    plan.apply_offset(SqlExpr::int_constant(1)).unwrap();
    plan.apply_limit(SqlExpr::int_constant(2)).unwrap();

    let text = generate(&finalized(plan), &ExecParams::new()).unwrap();

    assert_eq!(
        text.text,
        "SELECT c[\"name\"] FROM root c WHERE (c[\"amount\"] > 10) \
         ORDER BY c[\"name\"] OFFSET 1 LIMIT 2"
    );
}

#[test]
fn bare_limit_defaults_offset_to_zero() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root().child("name"),
        MappedProjection::Scalar(col("name", ScalarKind::Text)),
    )
    .unwrap();
    plan.apply_limit(SqlExpr::int_constant(5)).unwrap();

    let text = generate(&finalized(plan), &ExecParams::new()).unwrap();
    assert!(text.text.ends_with("OFFSET 0 LIMIT 5"));
}

#[test]
fn offset_without_limit_is_a_fatal_rendering_error() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root().child("name"),
        MappedProjection::Scalar(col("name", ScalarKind::Text)),
    )
    .unwrap();
    plan.apply_offset(SqlExpr::int_constant(3)).unwrap();

    let err = generate(&finalized(plan), &ExecParams::new()).unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);
}

#[test]
fn single_object_projection_renders_in_value_form() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root(),
        MappedProjection::Scalar(SqlExpr::Object(ObjectExpr::root("c"))),
    )
    .unwrap();

    let text = generate(&finalized(plan), &ExecParams::new()).unwrap();
    assert_eq!(text.text, "SELECT VALUE c FROM root c");
}

#[test]
fn aggregate_projection_renders_in_value_form() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root(),
        MappedProjection::Scalar(SqlExpr::Function {
            function: SqlFunction::Count,
            args: vec![SqlExpr::int_constant(1)],
            ty: ScalarType::new(ScalarKind::Int),
            mapping: Some(TypeMapping::default_for(&ScalarKind::Int)),
        }),
    )
    .unwrap();

    let text = generate(&finalized(plan), &ExecParams::new()).unwrap();
    assert_eq!(text.text, "SELECT VALUE COUNT(1) FROM root c");
}

#[test]
fn alias_is_emitted_only_when_it_differs_from_the_natural_name() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root().child("name"),
        MappedProjection::Scalar(col("name", ScalarKind::Text)),
    )
    .unwrap();
    plan.map_projection(
        ShapePath::root().child("town"),
        MappedProjection::Scalar(col("city", ScalarKind::Text)),
    )
    .unwrap();

    let text = generate(&finalized(plan), &ExecParams::new()).unwrap();
    assert_eq!(
        text.text,
        "SELECT c[\"name\"], c[\"city\"] AS town FROM root c"
    );
}

#[test]
fn literals_and_parameters_share_the_encoding_path() {
    let mapping = TypeMapping::default_for(&ScalarKind::Text);

    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root().child("name"),
        MappedProjection::Scalar(col("name", ScalarKind::Text)),
    )
    .unwrap();
    plan.apply_predicate(SqlExpr::equal(
        col("name", ScalarKind::Text),
        SqlExpr::Parameter {
            name: "who".to_string(),
            ty: ScalarType::new(ScalarKind::Text),
            mapping: Some(mapping.clone()),
        },
    ));

    let mut params = ExecParams::new();
    params.insert("who".to_string(), Value::from("ice"));

    let text = generate(&finalized(plan.clone()), &params).unwrap();
    assert!(text.text.contains("@who"));
    assert_eq!(text.parameters.len(), 1);

    // Bind the same value as an inline literal; the encoded bytes of
    // the parameter equal the literal text.
    let mut literal_plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    literal_plan
        .map_projection(
            ShapePath::root().child("name"),
            MappedProjection::Scalar(col("name", ScalarKind::Text)),
        )
        .unwrap();
    literal_plan.apply_predicate(SqlExpr::equal(
        col("name", ScalarKind::Text),
        SqlExpr::constant_mapped(Value::from("ice"), mapping),
    ));

    let literal = generate(&finalized(literal_plan), &ExecParams::new()).unwrap();
    assert!(literal.text.contains("\"ice\""));
    assert_eq!(
        serde_json::to_string(&text.parameters[0].1).unwrap(),
        "\"ice\""
    );
}

#[test]
fn unexpanded_membership_parameter_cannot_render() {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.map_projection(
        ShapePath::root().child("name"),
        MappedProjection::Scalar(col("name", ScalarKind::Text)),
    )
    .unwrap();
    plan.apply_predicate(SqlExpr::InList {
        item: Box::new(col("name", ScalarKind::Text)),
        values: crate::plan::InListValues::Parameter {
            name: "names".to_string(),
            mapping: Some(TypeMapping::default_for(&ScalarKind::Text)),
        },
        negated: false,
        mapping: Some(TypeMapping::boolean()),
    });

    let err = generate(&finalized(plan), &ExecParams::new()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}
