//! Core runtime for Floe: the object-query AST, the logical plan and
//! its lowering visitors, document-SQL text generation, and the lazy
//! materialization runners.

pub mod error;
pub mod exec;
pub mod lower;
pub mod model;
pub mod plan;
pub mod query;
pub mod render;
pub mod value;

///
/// CONSTANTS
///

/// Alias of the root document reference in generated query text.
///
/// The dialect in scope addresses the source as `FROM root c`; every
/// access path hangs off this alias.
pub const ROOT_ALIAS: &str = "c";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, renderers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        lower::{QueryOp, QueryPipeline},
        model::{EntityModel, NavigationModel, PropertyModel},
        query::{Expr, ShapeExpr, field},
        value::{ScalarKind, ScalarType, Value},
    };
}
