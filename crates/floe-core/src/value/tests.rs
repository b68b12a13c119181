use super::*;

#[test]
fn kind_of_scalars() {
    assert_eq!(Value::Bool(true).kind(), Some(ScalarKind::Bool));
    assert_eq!(Value::Int(3).kind(), Some(ScalarKind::Int));
    assert_eq!(Value::from("ice").kind(), Some(ScalarKind::Text));
    assert_eq!(Value::Null.kind(), None);
}

#[test]
fn list_kind_comes_from_first_non_null_item() {
    let list = Value::List(vec![Value::Null, Value::Int(1), Value::Int(2)]);

    assert_eq!(list.kind(), Some(ScalarKind::List(Box::new(ScalarKind::Int))));
}

#[test]
fn list_of_nulls_has_no_kind() {
    let list = Value::List(vec![Value::Null, Value::Null]);

    assert_eq!(list.kind(), None);
}

#[test]
fn zero_exists_only_for_numeric_kinds() {
    assert_eq!(Value::zero(&ScalarKind::Int), Some(Value::Int(0)));
    assert_eq!(Value::zero(&ScalarKind::Float), Some(Value::Float(0.0)));
    assert_eq!(Value::zero(&ScalarKind::Text), None);
}

#[test]
fn scalar_type_nullability() {
    let ty = ScalarType::new(ScalarKind::Int);
    assert!(!ty.nullable);

    let nullable = ty.as_nullable();
    assert!(nullable.nullable);
    assert!(ty.same_kind(&nullable));
}
