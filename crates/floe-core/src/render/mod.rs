//! Text generation for the document-SQL dialect: a finalized plan in,
//! query text plus bound parameters out. Literals and parameters run
//! through the same value-conversion path.

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    exec::{ExecParams, store::QueryText},
    plan::{InListValues, ObjectExpr, SelectPlan, SqlExpr, SqlFunction, SqlUnaryOp},
};

/// Render a finalized plan to query text, binding parameters from the
/// live execution values.
pub(crate) fn generate(plan: &SelectPlan, params: &ExecParams) -> Result<QueryText, InternalError> {
    SqlGenerator::new(plan, params).generate()
}

///
/// SqlGenerator
///
/// Single-pass renderer over the plan's scalar vocabulary. Keeps the
/// clause order fixed: projections, source, filter, ordering, then the
/// combined offset/limit clause.
///

struct SqlGenerator<'a> {
    plan: &'a SelectPlan,
    params: &'a ExecParams,
    text: String,
    parameters: Vec<(String, serde_json::Value)>,
}

impl<'a> SqlGenerator<'a> {
    const fn new(plan: &'a SelectPlan, params: &'a ExecParams) -> Self {
        Self {
            plan,
            params,
            text: String::new(),
            parameters: Vec::new(),
        }
    }

    fn generate(mut self) -> Result<QueryText, InternalError> {
        self.render_projections()?;
        self.render_source();
        self.render_predicate()?;
        self.render_orderings()?;
        self.render_pagination()?;

        Ok(QueryText {
            text: self.text,
            parameters: self.parameters,
        })
    }

    fn render_projections(&mut self) -> Result<(), InternalError> {
        let plan = self.plan;

        self.text.push_str("SELECT ");
        if plan.is_distinct() {
            self.text.push_str("DISTINCT ");
        }

        let projections = plan.projections();
        if projections.is_empty() {
            return Err(InternalError::render_invariant(
                "plan reached rendering with no finalized projections",
            ));
        }

        if plan.uses_value_form() {
            self.text.push_str("VALUE ");
            return self.render_expr(&projections[0].expr);
        }

        for (i, projection) in projections.iter().enumerate() {
            if i > 0 {
                self.text.push_str(", ");
            }
            self.render_expr(&projection.expr)?;
            // Alias only when it differs from the natural access name.
            if projection.natural_name() != Some(projection.alias.as_str()) {
                self.text.push_str(" AS ");
                self.text.push_str(&projection.alias);
            }
        }

        Ok(())
    }

    fn render_source(&mut self) {
        let alias = &self.plan.source().alias;
        self.text.push_str(" FROM root ");
        self.text.push_str(alias);
    }

    fn render_predicate(&mut self) -> Result<(), InternalError> {
        if let Some(predicate) = self.plan.predicate() {
            self.text.push_str(" WHERE ");
            self.render_expr(predicate)?;
        }

        Ok(())
    }

    fn render_orderings(&mut self) -> Result<(), InternalError> {
        let orderings = self.plan.orderings();
        if orderings.is_empty() {
            return Ok(());
        }

        self.text.push_str(" ORDER BY ");
        for (i, key) in orderings.iter().enumerate() {
            if i > 0 {
                self.text.push_str(", ");
            }
            self.render_expr(&key.expr)?;
            if key.descending {
                self.text.push_str(" DESC");
            }
        }

        Ok(())
    }

    // The dialect in scope requires an explicit limit whenever offset
    // is used; a bare offset is a fatal rendering error, and a bare
    // limit defaults its offset to zero.
    fn render_pagination(&mut self) -> Result<(), InternalError> {
        match (self.plan.offset(), self.plan.limit()) {
            (None, None) => Ok(()),
            (Some(_), None) => Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Render,
                "OFFSET requires an explicit LIMIT for this query target",
            )),
            (offset, Some(limit)) => {
                self.text.push_str(" OFFSET ");
                match offset {
                    Some(offset) => self.render_expr(offset)?,
                    None => self.text.push('0'),
                }
                self.text.push_str(" LIMIT ");
                self.render_expr(limit)
            }
        }
    }

    fn render_expr(&mut self, expr: &SqlExpr) -> Result<(), InternalError> {
        match expr {
            SqlExpr::Constant { value, mapping } => {
                let mapping = mapping.as_ref().ok_or_else(|| {
                    InternalError::render_invariant("literal reached rendering without a mapping")
                })?;
                let encoded = mapping.encode(value)?;
                let literal = serde_json::to_string(&encoded).map_err(|err| {
                    InternalError::render_invariant(format!("literal encoding failed: {err}"))
                })?;
                self.text.push_str(&literal);
                Ok(())
            }
            SqlExpr::Parameter { name, mapping, .. } => {
                let mapping = mapping.as_ref().ok_or_else(|| {
                    InternalError::render_invariant("parameter reached rendering without a mapping")
                })?;
                let value = self.params.get(name).ok_or_else(|| {
                    InternalError::render_invariant(format!("missing query parameter '{name}'"))
                })?;
                let bound_name = format!("@{name}");
                if !self.parameters.iter().any(|(n, _)| n == &bound_name) {
                    let encoded = mapping.encode(value)?;
                    self.parameters.push((bound_name.clone(), encoded));
                }
                self.text.push_str(&bound_name);
                Ok(())
            }
            SqlExpr::Column { object, name, .. } => {
                self.render_object(object);
                self.text.push_str("[\"");
                self.text.push_str(name);
                self.text.push_str("\"]");
                Ok(())
            }
            SqlExpr::Object(object) => {
                self.render_object(object);
                Ok(())
            }
            SqlExpr::Binary {
                op, left, right, ..
            } => {
                self.text.push('(');
                self.render_expr(left)?;
                self.text.push(' ');
                self.text.push_str(&op.to_string());
                self.text.push(' ');
                self.render_expr(right)?;
                self.text.push(')');
                Ok(())
            }
            SqlExpr::Unary { op, operand, .. } => {
                match op {
                    SqlUnaryOp::Not => self.text.push_str("NOT ("),
                    SqlUnaryOp::Negate => self.text.push_str("-("),
                }
                self.render_expr(operand)?;
                self.text.push(')');
                Ok(())
            }
            SqlExpr::Function { function, args, .. } => {
                self.text.push_str(&function.to_string());
                self.text.push('(');
                if *function == SqlFunction::Count && args.is_empty() {
                    self.text.push('1');
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.text.push_str(", ");
                    }
                    self.render_expr(arg)?;
                }
                self.text.push(')');
                Ok(())
            }
            SqlExpr::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => {
                self.text.push('(');
                self.render_expr(test)?;
                self.text.push_str(" ? ");
                self.render_expr(if_true)?;
                self.text.push_str(" : ");
                self.render_expr(if_false)?;
                self.text.push(')');
                Ok(())
            }
            SqlExpr::InList {
                item,
                values,
                negated,
                ..
            } => {
                let InListValues::Values(values) = values else {
                    return Err(InternalError::render_invariant(
                        "membership parameter must be expanded before rendering",
                    ));
                };
                if values.is_empty() {
                    return Err(InternalError::render_invariant(
                        "empty membership list must be rewritten before rendering",
                    ));
                }

                self.render_expr(item)?;
                self.text.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.text.push_str(", ");
                    }
                    self.render_expr(value)?;
                }
                self.text.push(')');
                Ok(())
            }
        }
    }

    fn render_object(&mut self, object: &ObjectExpr) {
        match object {
            ObjectExpr::Root { alias } => self.text.push_str(alias),
            ObjectExpr::Nested { object, name } => {
                self.render_object(object);
                self.text.push_str("[\"");
                self.text.push_str(name);
                self.text.push_str("\"]");
            }
        }
    }
}
