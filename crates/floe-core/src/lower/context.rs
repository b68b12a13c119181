use crate::{
    lower::{
        binder::BoundShape,
        members::{
            MemberTranslator, MethodTranslator, default_member_translators,
            default_method_translators,
        },
    },
    model::entity::EntityModel,
    plan::{EntityProjectionArena, EntityProjectionId},
};
use std::sync::Arc;

///
/// LoweringContext
///
/// Per-compilation state shared by the visitors: the entity projection
/// arena and the translator plugin chains. Owned by one pipeline;
/// never shared across compilations.
///

pub(crate) struct LoweringContext {
    pub arena: EntityProjectionArena,
    pub member_translators: Vec<Box<dyn MemberTranslator>>,
    pub method_translators: Vec<Box<dyn MethodTranslator>>,
}

impl LoweringContext {
    pub(crate) fn new() -> Self {
        Self {
            arena: EntityProjectionArena::new(),
            member_translators: default_member_translators(),
            method_translators: default_method_translators(),
        }
    }
}

///
/// QueryShape
///
/// The pipeline's current element shape: the root entity until a
/// projection replaces it, then whatever the binder produced.
///

#[derive(Clone, Debug)]
pub(crate) enum QueryShape {
    Entity {
        projection: EntityProjectionId,
        model: Arc<EntityModel>,
    },
    Bound(BoundShape),
}
