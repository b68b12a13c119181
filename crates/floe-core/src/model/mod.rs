//! Read-only schema description consumed by lowering and shaping.
//!
//! Models are built by the (out-of-scope) convention/configuration layer
//! and handed in as immutable descriptions; nothing in this crate
//! mutates them after construction.

pub mod entity;
pub mod mapping;

pub use entity::{EntityModel, NavigationModel, PropertyModel};
pub use mapping::{StoreType, TypeMapping, ValueConverter};
