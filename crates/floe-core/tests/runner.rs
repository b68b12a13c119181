mod common;

use common::{BrokenIterStore, FailingStore, FakeAsyncStore, FakeStore, customer_model};
use floe_core::{
    error::ErrorClass,
    exec::{ExecParams, QueryOutput, QueryRunner},
    lower::QueryPipeline,
    query::{ShapeExpr, field},
    value::Value,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn scalar_names_query() -> QueryRunner {
    let query = QueryPipeline::for_entity(customer_model())
        .select(ShapeExpr::scalar(field("name")))
        .unwrap()
        .compile()
        .unwrap();

    QueryRunner::new(query, ExecParams::new())
}

fn scalar(output: QueryOutput) -> Value {
    match output {
        QueryOutput::Scalar(value) => value,
        other => panic!("expected a scalar output, got {other:?}"),
    }
}

#[test]
fn execution_is_lazy_until_first_pull() {
    let store = FakeStore::new(vec![json!({"name": "a"}), json!({"name": "b"})]);
    let runner = scalar_names_query();

    let mut iter = runner.iter(&store);
    assert_eq!(store.query_count(), 0);

    let first = iter.next().unwrap().unwrap();
    assert_eq!(store.query_count(), 1);
    assert_eq!(scalar(first), Value::from("a"));

    let rest: Vec<_> = iter.collect();
    assert_eq!(rest.len(), 1);
    assert_eq!(store.query_count(), 1);
}

#[test]
fn each_execution_renders_and_expands_afresh() {
    let store = FakeStore::new(vec![json!({"name": "a"})]);
    let runner = scalar_names_query();

    runner.fetch_all(&store).unwrap();
    runner.fetch_all(&store).unwrap();

    assert_eq!(store.query_count(), 2);
}

#[test]
fn entity_outputs_retain_the_raw_document() {
    let store = FakeStore::new(vec![json!({"id": "1", "name": "ice", "amount": 7})]);
    let query = QueryPipeline::for_entity(customer_model())
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    let outputs = runner.fetch_all(&store).unwrap();
    assert_eq!(outputs.len(), 1);

    let QueryOutput::Entity(row) = &outputs[0] else {
        panic!("expected an entity output");
    };
    assert_eq!(row.property("name").unwrap(), Some(Value::from("ice")));
    assert_eq!(row.property("amount").unwrap(), Some(Value::Int(7)));
    assert_eq!(row.document["id"], json!("1"));
}

#[test]
fn client_fallback_mixes_server_and_local_evaluation() {
    let store = FakeStore::new(vec![json!({"name": "ice age"})]);
    let query = QueryPipeline::for_entity(customer_model())
        .select(ShapeExpr::record([
            ("name", ShapeExpr::scalar(field("name"))),
            ("slug", ShapeExpr::scalar(field("name").title_case())),
        ]))
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    let outputs = runner.fetch_all(&store).unwrap();
    let QueryOutput::Record(fields) = &outputs[0] else {
        panic!("expected a record output");
    };

    assert_eq!(scalar(fields[0].1.clone()), Value::from("ice age"));
    assert_eq!(scalar(fields[1].1.clone()), Value::from("Ice Age"));
}

#[test]
fn parameters_reach_client_evaluated_fields_by_name() {
    let store = FakeStore::new(vec![json!({"name": "ice"})]);
    // The host-only field forces the whole construction into client
    // mode, where the parameter becomes a name-keyed runtime lookup.
    let query = QueryPipeline::for_entity(customer_model())
        .select(ShapeExpr::record([
            ("slug", ShapeExpr::scalar(field("name").title_case())),
            (
                "tag",
                ShapeExpr::scalar(floe_core::query::Expr::parameter(
                    "tag",
                    floe_core::value::ScalarType::new(floe_core::value::ScalarKind::Text),
                )),
            ),
        ]))
        .unwrap()
        .compile()
        .unwrap();

    let mut params = ExecParams::new();
    params.insert("tag".to_string(), Value::from("vip"));
    let runner = QueryRunner::new(query, params);

    let outputs = runner.fetch_all(&store).unwrap();
    let QueryOutput::Record(fields) = &outputs[0] else {
        panic!("expected a record output");
    };
    assert_eq!(scalar(fields[0].1.clone()), Value::from("Ice"));
    assert_eq!(scalar(fields[1].1.clone()), Value::from("vip"));
}

#[test]
fn single_detects_a_second_row() {
    let store = FakeStore::new(vec![json!({"name": "a"}), json!({"name": "b"})]);
    let query = QueryPipeline::for_entity(customer_model())
        .single_or_default(None)
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    let err = runner.fetch_one(&store).unwrap_err();
    assert_eq!(err.class, ErrorClass::MoreThanOneElement);
}

#[test]
fn first_returns_none_over_an_empty_source() {
    let store = FakeStore::new(Vec::new());
    let query = QueryPipeline::for_entity(customer_model())
        .first_or_default(None)
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    assert!(runner.fetch_one(&store).unwrap().is_none());
}

#[test]
fn max_over_an_empty_source_raises_only_on_consumption() {
    let query = QueryPipeline::for_entity(customer_model())
        .max(Some(field("amount")))
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    // Compilation succeeded; the condition is raised at consumption.
    let store = FakeStore::new(Vec::new());
    let err = runner.fetch_scalar(&store).unwrap_err();
    assert!(err.is_no_elements());
}

#[test]
fn sum_coerces_an_empty_source_to_zero() {
    let store = FakeStore::new(Vec::new());
    let query = QueryPipeline::for_entity(customer_model())
        .sum(Some(field("amount")))
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    assert_eq!(runner.fetch_scalar(&store).unwrap(), Value::Int(0));
}

#[test]
fn average_of_a_nullable_selector_stays_null_when_empty() {
    let store = FakeStore::new(Vec::new());
    let query = QueryPipeline::for_entity(customer_model())
        .average(Some(field("score")))
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    assert_eq!(runner.fetch_scalar(&store).unwrap(), Value::Null);
}

#[test]
fn aggregates_read_the_value_form_row() {
    let store = FakeStore::new(vec![json!(42)]);
    let query = QueryPipeline::for_entity(customer_model())
        .max(Some(field("amount")))
        .unwrap()
        .compile()
        .unwrap();
    let runner = QueryRunner::new(query, ExecParams::new());

    assert_eq!(runner.fetch_scalar(&store).unwrap(), Value::Int(42));
}

#[test]
fn store_failures_surface_unchanged() {
    let runner = scalar_names_query();

    let err = runner.iter(&FailingStore).next().unwrap().unwrap_err();
    assert!(err.is_store_failure());
    assert!(err.message.contains("socket reset by peer"));
}

#[test]
fn iteration_failures_abort_only_the_remainder() {
    let store = BrokenIterStore::new(json!({"name": "a"}));
    let runner = scalar_names_query();

    let mut iter = runner.iter(&store);
    assert_eq!(scalar(iter.next().unwrap().unwrap()), Value::from("a"));

    let err = iter.next().unwrap().unwrap_err();
    assert!(err.is_store_failure());

    assert!(iter.next().is_none());
}

#[tokio::test]
async fn async_stream_matches_sync_semantics() {
    let rows = vec![json!({"name": "a"}), json!({"name": "b"})];
    let sync_store = FakeStore::new(rows.clone());
    let async_store = Arc::new(FakeAsyncStore::new(rows));

    let runner = scalar_names_query();
    let sync_outputs = runner.fetch_all(&sync_store).unwrap();

    let stream = runner.stream(async_store, CancellationToken::new());
    let async_outputs = stream.try_collect().await.unwrap();

    assert_eq!(sync_outputs.len(), async_outputs.len());
    for (a, b) in sync_outputs.into_iter().zip(async_outputs) {
        assert_eq!(scalar(a), scalar(b));
    }
}

#[tokio::test]
async fn cancellation_is_checked_at_the_pull_point() {
    let async_store = Arc::new(FakeAsyncStore::new(vec![json!({"name": "a"})]));
    let runner = scalar_names_query();

    let cancel = CancellationToken::new();
    let mut stream = runner.stream(async_store, cancel.clone());
    cancel.cancel();

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(stream.next().await.is_none());
}
