mod common;

use common::customer_model;
use floe_core::{
    exec::ExecParams,
    lower::QueryPipeline,
    query::{ShapeExpr, field},
    value::Value,
};

#[test]
fn filter_order_select_paginate_end_to_end() {
    let query = QueryPipeline::for_entity(customer_model())
        .filter(field("amount").gt(10i64))
        .unwrap()
        .order_by(field("name"))
        .unwrap()
        .select(ShapeExpr::scalar(field("name")))
        .unwrap()
        .skip(1i64)
        .unwrap()
        .take(2i64)
        .unwrap()
        .compile()
        .unwrap();

    let plan = query.plan();
    assert!(plan.predicate().is_some());
    assert_eq!(plan.orderings().len(), 1);
    assert!(!plan.orderings()[0].descending);
    assert!(plan.offset().is_some());
    assert!(plan.limit().is_some());
    assert_eq!(plan.projections().len(), 1);

    let text = query.query_text(&ExecParams::new()).unwrap();
    assert_eq!(
        text.text,
        "SELECT c[\"name\"] FROM root c WHERE (c[\"amount\"] > 10) \
         ORDER BY c[\"name\"] OFFSET 1 LIMIT 2"
    );
}

#[test]
fn identity_queries_project_the_whole_document() {
    let query = QueryPipeline::for_entity(customer_model())
        .compile()
        .unwrap();

    let text = query.query_text(&ExecParams::new()).unwrap();
    assert_eq!(text.text, "SELECT VALUE c FROM root c");
}

#[test]
fn record_projections_alias_only_renamed_fields() {
    let query = QueryPipeline::for_entity(customer_model())
        .select(ShapeExpr::record([
            ("name", ShapeExpr::scalar(field("name"))),
            ("town", ShapeExpr::scalar(field("address").member("city"))),
        ]))
        .unwrap()
        .compile()
        .unwrap();

    let text = query.query_text(&ExecParams::new()).unwrap();
    assert_eq!(
        text.text,
        "SELECT c[\"name\"], c[\"address\"][\"city\"] AS town FROM root c"
    );
}

#[test]
fn membership_parameters_expand_at_render_time() {
    use floe_core::value::{ScalarKind, ScalarType};

    let query = QueryPipeline::for_entity(customer_model())
        .filter(field("name").is_in(floe_core::query::Expr::parameter(
            "names",
            ScalarType::new(ScalarKind::List(Box::new(ScalarKind::Text))),
        )))
        .unwrap()
        .compile()
        .unwrap();

    let mut params = ExecParams::new();
    params.insert(
        "names".to_string(),
        Value::List(vec![Value::from("a"), Value::Null, Value::from("b")]),
    );

    let text = query.query_text(&params).unwrap();
    assert!(text.text.contains(" IN (\"a\", \"b\")"));
    assert!(text.text.contains("IS_NULL"));

    // The frozen plan itself is untouched; a second render with other
    // values sees fresh expansion.
    let mut empty = ExecParams::new();
    empty.insert("names".to_string(), Value::List(Vec::new()));
    let text = query.query_text(&empty).unwrap();
    assert!(text.text.contains("false"));
    assert!(!text.text.contains(" IN ("));
}
