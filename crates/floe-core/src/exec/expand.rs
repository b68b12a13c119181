#[cfg(test)]
mod tests;

use crate::{
    error::InternalError,
    exec::ExecParams,
    model::mapping::TypeMapping,
    plan::{InListValues, SelectPlan, SqlExpr},
    value::Value,
};

/// Expand collection-valued membership tests against the live parameter
/// values, before each execution.
///
/// The frozen plan is never mutated; expansion clones it and rewrites
/// the copy. An empty membership list is never sent to the store as an
/// empty `IN ()`: it resolves locally to a provably-false constant.
pub(crate) fn expand_parameters(
    plan: &SelectPlan,
    params: &ExecParams,
) -> Result<SelectPlan, InternalError> {
    let mut expanded = plan.clone();
    expanded.rewrite_exprs(&mut |expr| expand_expr(expr, params))?;

    Ok(expanded)
}

fn expand_expr(expr: SqlExpr, params: &ExecParams) -> Result<SqlExpr, InternalError> {
    match expr {
        SqlExpr::InList {
            item,
            values,
            negated,
            mapping,
        } => {
            let item = expand_expr(*item, params)?;
            let item_mapping = item.mapping().cloned();
            let (candidates, value_mapping) = membership_values(values, params, item_mapping)?;

            // Null elements are dropped from the finite list but
            // remembered as an explicit null-check.
            let mut non_null = Vec::new();
            let mut saw_null = false;
            for value in candidates {
                if value.is_null() {
                    saw_null = true;
                } else {
                    non_null.push(value);
                }
            }

            let membership = match (non_null.is_empty(), saw_null) {
                (true, false) => SqlExpr::bool_constant(false),
                (false, false) => in_list(item, non_null, &value_mapping, mapping),
                (true, true) => SqlExpr::is_null_check(item),
                (false, true) => {
                    let null_check = SqlExpr::is_null_check(item.clone());
                    SqlExpr::or(in_list(item, non_null, &value_mapping, mapping), null_check)
                }
            };

            Ok(if negated {
                SqlExpr::negation(membership)
            } else {
                membership
            })
        }
        SqlExpr::Binary {
            op,
            left,
            right,
            ty,
            mapping,
        } => Ok(SqlExpr::Binary {
            op,
            left: Box::new(expand_expr(*left, params)?),
            right: Box::new(expand_expr(*right, params)?),
            ty,
            mapping,
        }),
        SqlExpr::Unary {
            op,
            operand,
            ty,
            mapping,
        } => Ok(SqlExpr::Unary {
            op,
            operand: Box::new(expand_expr(*operand, params)?),
            ty,
            mapping,
        }),
        SqlExpr::Function {
            function,
            args,
            ty,
            mapping,
        } => Ok(SqlExpr::Function {
            function,
            args: args
                .into_iter()
                .map(|arg| expand_expr(arg, params))
                .collect::<Result<_, _>>()?,
            ty,
            mapping,
        }),
        SqlExpr::Conditional {
            test,
            if_true,
            if_false,
            ty,
            mapping,
        } => Ok(SqlExpr::Conditional {
            test: Box::new(expand_expr(*test, params)?),
            if_true: Box::new(expand_expr(*if_true, params)?),
            if_false: Box::new(expand_expr(*if_false, params)?),
            ty,
            mapping,
        }),
        leaf @ (SqlExpr::Constant { .. }
        | SqlExpr::Parameter { .. }
        | SqlExpr::Column { .. }
        | SqlExpr::Object(_)) => Ok(leaf),
    }
}

fn membership_values(
    values: InListValues,
    params: &ExecParams,
    item_mapping: Option<TypeMapping>,
) -> Result<(Vec<Value>, Option<TypeMapping>), InternalError> {
    match values {
        InListValues::Values(exprs) => {
            let mut out = Vec::with_capacity(exprs.len());
            let mut mapping = item_mapping;
            for expr in exprs {
                match expr {
                    SqlExpr::Constant {
                        value,
                        mapping: value_mapping,
                    } => {
                        if mapping.is_none() {
                            mapping = value_mapping;
                        }
                        out.push(value);
                    }
                    other => {
                        return Err(InternalError::executor_invariant(format!(
                            "membership list contains a non-constant element: {other:?}"
                        )));
                    }
                }
            }
            Ok((out, mapping))
        }
        InListValues::Parameter { name, mapping } => {
            let value = params.get(&name).ok_or_else(|| {
                InternalError::executor_invariant(format!(
                    "missing collection parameter '{name}'"
                ))
            })?;
            let Value::List(items) = value else {
                return Err(InternalError::executor_invariant(format!(
                    "collection parameter '{name}' is not list-valued"
                )));
            };
            Ok((items.clone(), item_mapping.or(mapping)))
        }
    }
}

fn in_list(
    item: SqlExpr,
    values: Vec<Value>,
    value_mapping: &Option<TypeMapping>,
    mapping: Option<TypeMapping>,
) -> SqlExpr {
    SqlExpr::InList {
        item: Box::new(item),
        values: InListValues::Values(
            values
                .into_iter()
                .map(|value| SqlExpr::Constant {
                    value,
                    mapping: value_mapping.clone(),
                })
                .collect(),
        ),
        negated: false,
        mapping,
    }
}
