use crate::query::expr::Expr;

///
/// ShapeExpr
///
/// Requested result shape of a query: an entity, an anonymous record,
/// or a bare scalar. Shapes say nothing about physical projection;
/// the binder decides that.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeExpr {
    /// An entity-valued expression (the element itself or an embedded
    /// navigation chain).
    Entity(Expr),
    /// Anonymous record construction; field order is preserved.
    Record(Vec<(String, Self)>),
    Scalar(Expr),
}

impl ShapeExpr {
    /// The identity shape: the current element unchanged.
    #[must_use]
    pub const fn identity() -> Self {
        Self::Entity(Expr::Source)
    }

    #[must_use]
    pub fn record(fields: impl IntoIterator<Item = (&'static str, Self)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, shape)| (name.to_string(), shape))
                .collect(),
        )
    }

    #[must_use]
    pub fn scalar(expr: impl Into<Expr>) -> Self {
        Self::Scalar(expr.into())
    }

    /// True when selecting this shape is a no-op.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            Self::Entity(Expr::Source) | Self::Scalar(Expr::Source)
        )
    }
}
