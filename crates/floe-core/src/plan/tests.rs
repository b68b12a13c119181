use super::*;
use crate::{
    model::mapping::TypeMapping,
    value::{ScalarKind, ScalarType, Value},
};
use proptest::prelude::*;

fn plan() -> SelectPlan {
    SelectPlan::for_source(SourceRef::new("things", "c"))
}

fn col(name: &str) -> SqlExpr {
    SqlExpr::Column {
        object: ObjectExpr::root("c"),
        name: name.to_string(),
        ty: ScalarType::new(ScalarKind::Text),
        mapping: Some(TypeMapping::default_for(&ScalarKind::Text)),
    }
}

#[test]
fn second_limit_application_fails() {
    let mut plan = plan();

    plan.apply_offset(SqlExpr::int_constant(1)).unwrap();
    plan.apply_limit(SqlExpr::int_constant(2)).unwrap();

    assert_eq!(
        plan.apply_limit(SqlExpr::int_constant(3)),
        Err(PlanError::LimitAlreadyApplied)
    );
}

#[test]
fn offset_cannot_follow_limit() {
    let mut plan = plan();

    plan.apply_limit(SqlExpr::int_constant(2)).unwrap();

    assert_eq!(
        plan.apply_offset(SqlExpr::int_constant(1)),
        Err(PlanError::OffsetAfterLimit)
    );
}

#[test]
fn second_offset_application_fails() {
    let mut plan = plan();

    plan.apply_offset(SqlExpr::int_constant(1)).unwrap();

    assert_eq!(
        plan.apply_offset(SqlExpr::int_constant(2)),
        Err(PlanError::OffsetAlreadyApplied)
    );
}

#[test]
fn ordering_is_frozen_after_pagination() {
    let mut plan = plan();

    plan.apply_limit(SqlExpr::int_constant(2)).unwrap();

    assert_eq!(
        plan.apply_ordering(OrderingKey::asc(col("name"))),
        Err(PlanError::OrderingAfterPagination)
    );
    assert_eq!(
        plan.reverse_orderings(),
        Err(PlanError::OrderingAfterPagination)
    );
}

#[test]
fn ordering_is_frozen_after_distinct() {
    let mut plan = plan();

    plan.apply_distinct().unwrap();

    assert_eq!(
        plan.apply_ordering(OrderingKey::asc(col("name"))),
        Err(PlanError::OrderingAfterDistinct)
    );
}

#[test]
fn distinct_cannot_follow_pagination() {
    let mut plan = plan();

    plan.apply_offset(SqlExpr::int_constant(1)).unwrap();

    assert_eq!(plan.apply_distinct(), Err(PlanError::DistinctAfterPagination));
}

#[test]
fn apply_ordering_replaces_append_appends() {
    let mut plan = plan();

    plan.apply_ordering(OrderingKey::asc(col("a"))).unwrap();
    plan.apply_ordering(OrderingKey::asc(col("b"))).unwrap();
    assert_eq!(plan.orderings().len(), 1);
    assert_eq!(plan.orderings()[0].expr, col("b"));

    plan.append_ordering(OrderingKey::desc(col("c"))).unwrap();
    assert_eq!(plan.orderings().len(), 2);
}

#[test]
fn append_ordering_deduplicates_structurally_equal_keys() {
    let mut plan = plan();

    plan.apply_ordering(OrderingKey::asc(col("a"))).unwrap();
    plan.append_ordering(OrderingKey::desc(col("a"))).unwrap();

    assert_eq!(plan.orderings().len(), 1);
    assert!(!plan.orderings()[0].descending);
}

#[test]
fn reverse_orderings_inverts_every_direction() {
    let mut plan = plan();

    plan.apply_ordering(OrderingKey::asc(col("x"))).unwrap();
    plan.append_ordering(OrderingKey::desc(col("y"))).unwrap();

    plan.reverse_orderings().unwrap();
    assert!(plan.orderings()[0].descending);
    assert!(!plan.orderings()[1].descending);

    plan.reverse_orderings().unwrap();
    assert!(!plan.orderings()[0].descending);
    assert!(plan.orderings()[1].descending);
}

#[test]
fn projection_addition_is_idempotent() {
    let mut plan = plan();

    let first = plan.add_to_projection(col("name"), "name");
    let second = plan.add_to_projection(col("name"), "name");

    assert_eq!(first, second);
    assert_eq!(plan.projections().len(), 1);
}

#[test]
fn colliding_aliases_take_numeric_suffixes() {
    let mut plan = plan();

    plan.add_to_projection(col("a"), "c");
    plan.add_to_projection(col("b"), "c");
    plan.add_to_projection(col("d"), "c");

    let aliases: Vec<&str> = plan.projections().iter().map(|p| p.alias.as_str()).collect();
    assert_eq!(aliases, vec!["c", "c0", "c1"]);
}

#[test]
fn alias_collisions_are_case_insensitive() {
    let mut plan = plan();

    plan.add_to_projection(col("a"), "name");
    plan.add_to_projection(col("b"), "Name");

    assert_eq!(plan.projections()[1].alias, "Name0");
}

#[test]
fn projection_finalization_is_one_way() {
    let mut plan = plan();
    let arena = EntityProjectionArena::new();

    plan.map_projection(ShapePath::root().child("name"), MappedProjection::Scalar(col("name")))
        .unwrap();

    plan.apply_projection(&arena).unwrap();
    assert_eq!(plan.resolved_slot(&ShapePath::root().child("name")), Some(0));

    assert_eq!(
        plan.apply_projection(&arena),
        Err(PlanError::ProjectionAlreadyResolved)
    );
    assert_eq!(
        plan.mapped_projection(&ShapePath::root()),
        Err(PlanError::ProjectionAlreadyResolved)
    );
}

#[test]
fn true_literal_predicate_is_a_no_op() {
    let mut plan = plan();

    plan.apply_predicate(SqlExpr::bool_constant(true));
    assert!(plan.predicate().is_none());
}

#[test]
fn predicates_accumulate_with_and() {
    let mut plan = plan();

    let first = SqlExpr::equal(col("a"), SqlExpr::constant_mapped(Value::Int(1), TypeMapping::default_for(&ScalarKind::Int)));
    let second = SqlExpr::equal(col("b"), SqlExpr::constant_mapped(Value::Int(2), TypeMapping::default_for(&ScalarKind::Int)));

    plan.apply_predicate(first.clone());
    plan.apply_predicate(second.clone());

    assert_eq!(plan.predicate(), Some(&SqlExpr::and(first, second)));
}

proptest! {
    #[test]
    fn reversing_orderings_twice_is_identity(directions in proptest::collection::vec(any::<bool>(), 1..6)) {
        let mut plan = plan();

        for (i, descending) in directions.iter().enumerate() {
            let key = OrderingKey { expr: col(&format!("k{i}")), descending: *descending };
            plan.append_ordering(key).unwrap();
        }
        let original = plan.orderings().to_vec();

        plan.reverse_orderings().unwrap();
        plan.reverse_orderings().unwrap();

        prop_assert_eq!(plan.orderings(), original.as_slice());
    }

    #[test]
    fn aliases_stay_unique_under_colliding_hints(hints in proptest::collection::vec("[a-c]{1,2}", 1..12)) {
        let mut plan = plan();

        for (i, hint) in hints.iter().enumerate() {
            plan.add_to_projection(col(&format!("p{i}")), hint);
        }

        let mut seen: Vec<String> = Vec::new();
        for projection in plan.projections() {
            let lowered = projection.alias.to_ascii_lowercase();
            prop_assert!(!seen.contains(&lowered));
            seen.push(lowered);
        }
    }
}
