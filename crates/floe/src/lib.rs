//! Floe — a typed object-query compiler and materialization runtime
//! for document stores.
//!
//! This facade re-exports the public surface of `floe-core`. Compose a
//! query with [`QueryPipeline`], compile it, then run it against a
//! [`DocumentStore`] implementation:
//!
//! ```rust,ignore
//! use floe::prelude::*;
//!
//! let query = QueryPipeline::for_entity(customers)
//!     .filter(field("amount").gt(10))?
//!     .order_by(field("name"))?
//!     .select(ShapeExpr::scalar(field("name")))?
//!     .skip(1)?
//!     .take(2)?
//!     .compile()?;
//! ```

pub use floe_core::{
    ROOT_ALIAS, error, exec, lower, model, plan, query, value,
};

pub mod prelude {
    pub use floe_core::{
        exec::{
            AsyncDocumentStore, CompiledQuery, DocumentStore, ExecParams, QueryOutput, QueryRunner,
        },
        prelude::*,
    };
}
