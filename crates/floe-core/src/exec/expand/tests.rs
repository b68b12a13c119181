use super::*;
use crate::{
    plan::{ObjectExpr, SelectPlan, SourceRef, SqlFunction},
    value::{ScalarKind, ScalarType},
};

fn item() -> SqlExpr {
    SqlExpr::Column {
        object: ObjectExpr::root("c"),
        name: "name".to_string(),
        ty: ScalarType::new(ScalarKind::Text),
        mapping: Some(TypeMapping::default_for(&ScalarKind::Text)),
    }
}

fn membership(values: InListValues, negated: bool) -> SqlExpr {
    SqlExpr::InList {
        item: Box::new(item()),
        values,
        negated,
        mapping: Some(TypeMapping::boolean()),
    }
}

fn param_membership(negated: bool) -> SqlExpr {
    membership(
        InListValues::Parameter {
            name: "names".to_string(),
            mapping: Some(TypeMapping::default_for(&ScalarKind::Text)),
        },
        negated,
    )
}

fn expand_predicate(predicate: SqlExpr, params: &ExecParams) -> SqlExpr {
    let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
    plan.apply_predicate(predicate);

    expand_parameters(&plan, params)
        .unwrap()
        .predicate()
        .cloned()
        .unwrap()
}

fn list_param(values: Vec<Value>) -> ExecParams {
    let mut params = ExecParams::new();
    params.insert("names".to_string(), Value::List(values));
    params
}

#[test]
fn empty_collection_rewrites_to_false() {
    let expanded = expand_predicate(param_membership(false), &list_param(Vec::new()));

    assert!(matches!(
        expanded,
        SqlExpr::Constant { value: Value::Bool(false), .. }
    ));
}

#[test]
fn single_null_rewrites_to_a_null_check() {
    let expanded = expand_predicate(param_membership(false), &list_param(vec![Value::Null]));

    assert!(matches!(
        expanded,
        SqlExpr::Function { function: SqlFunction::IsNull, .. }
    ));
}

#[test]
fn mixed_values_rewrite_to_membership_or_null_check() {
    let expanded = expand_predicate(
        param_membership(false),
        &list_param(vec![Value::from("a"), Value::Null, Value::from("b")]),
    );

    let SqlExpr::Binary { op, left, right, .. } = expanded else {
        panic!("expected OR of membership and null-check");
    };
    assert_eq!(op, crate::plan::SqlBinaryOp::Or);

    let SqlExpr::InList { values: InListValues::Values(values), negated, .. } = *left else {
        panic!("expected a finite membership list");
    };
    assert!(!negated);
    assert_eq!(values.len(), 2);
    assert!(matches!(
        *right,
        SqlExpr::Function { function: SqlFunction::IsNull, .. }
    ));
}

#[test]
fn negated_membership_wraps_the_rewrite_in_not() {
    let expanded = expand_predicate(param_membership(true), &list_param(Vec::new()));

    let SqlExpr::Unary { op, operand, .. } = expanded else {
        panic!("expected a negation");
    };
    assert_eq!(op, crate::plan::SqlUnaryOp::Not);
    assert!(matches!(
        *operand,
        SqlExpr::Constant { value: Value::Bool(false), .. }
    ));
}

#[test]
fn constant_lists_are_normalized_too() {
    let mapping = TypeMapping::default_for(&ScalarKind::Text);
    let values = InListValues::Values(vec![
        SqlExpr::constant_mapped(Value::from("a"), mapping.clone()),
        SqlExpr::constant_mapped(Value::Null, mapping),
    ]);

    let expanded = expand_predicate(membership(values, false), &ExecParams::new());

    let SqlExpr::Binary { op, left, .. } = expanded else {
        panic!("expected OR of membership and null-check");
    };
    assert_eq!(op, crate::plan::SqlBinaryOp::Or);
    assert!(matches!(
        *left,
        SqlExpr::InList { values: InListValues::Values(ref v), .. } if v.len() == 1
    ));
}

#[test]
fn missing_collection_parameter_is_an_invariant_failure() {
    let err = {
        let mut plan = SelectPlan::for_source(SourceRef::new("customers", "c"));
        plan.apply_predicate(param_membership(false));
        expand_parameters(&plan, &ExecParams::new()).unwrap_err()
    };

    assert_eq!(err.class, crate::error::ErrorClass::InvariantViolation);
}
