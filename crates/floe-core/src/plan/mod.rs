//! Logical plan: the mutable intermediate representation of one
//! target-store query, plus its scalar vocabulary and projection arena.

pub mod error;
pub mod expr;
pub mod projection;
pub mod select;

#[cfg(test)]
mod tests;

pub use error::PlanError;
pub use expr::{InListValues, ObjectExpr, SqlBinaryOp, SqlExpr, SqlFunction, SqlUnaryOp};
pub use projection::{EntityProjectionArena, EntityProjectionId};
pub use select::{
    MappedProjection, OrderingKey, Projection, ProjectionMapping, SelectPlan, ShapePath, SourceRef,
};
