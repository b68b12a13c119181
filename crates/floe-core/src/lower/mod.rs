//! Lowering: object-query vocabulary to plan vocabulary.
//!
//! Three cooperating visitors, mirroring the compilation pipeline:
//! scalar translation (`scalar`), shape binding (`binder`), and
//! operator application (`pipeline`). All of them mutate one
//! `SelectPlan` through its invariant-checked surface.

pub mod binder;
pub mod context;
pub mod members;
pub mod pipeline;
pub mod scalar;


pub use binder::{BindMode, BoundEntity, BoundShape, ClientExpr, ProjectionBinding};
pub use members::{MemberTranslator, MethodTranslator};
pub use pipeline::{QueryOp, QueryPipeline};
