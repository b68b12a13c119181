use crate::{
    model::entity::EntityModel,
    plan::expr::{ObjectExpr, SqlExpr},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// EntityProjectionId
///
/// Arena handle for one entity projection. Handle equality is identity
/// equality: two binds of the same navigation path return the same id,
/// which is what later structural dedup relies on.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct EntityProjectionId(usize);

///
/// EntityProjectionNode
///
/// A schema-described type bound to an access path within the source
/// document, with per-property and per-navigation children cached so
/// repeated binds return the same expression.
///

#[derive(Clone, Debug)]
pub struct EntityProjectionNode {
    pub model: Arc<EntityModel>,
    pub object: ObjectExpr,
    /// True when this projection addresses an embedded object array
    /// rather than a single sub-document.
    pub collection: bool,
    columns: BTreeMap<String, SqlExpr>,
    children: BTreeMap<String, EntityProjectionId>,
}

///
/// EntityProjectionArena
///
/// Owner of every entity projection created during one compilation.
/// Nodes are never removed; ids stay valid for the compilation's
/// lifetime.
///

#[derive(Clone, Debug, Default)]
pub struct EntityProjectionArena {
    nodes: Vec<EntityProjectionNode>,
}

impl EntityProjectionArena {
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn insert_root(&mut self, model: Arc<EntityModel>, alias: &str) -> EntityProjectionId {
        self.push(EntityProjectionNode {
            model,
            object: ObjectExpr::root(alias),
            collection: false,
            columns: BTreeMap::new(),
            children: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn node(&self, id: EntityProjectionId) -> &EntityProjectionNode {
        &self.nodes[id.0]
    }

    /// Bind a scalar property of this projection, returning the cached
    /// column expression when one exists.
    pub fn column(&mut self, id: EntityProjectionId, property: &str) -> Option<SqlExpr> {
        if let Some(cached) = self.nodes[id.0].columns.get(property) {
            return Some(cached.clone());
        }

        let node = &self.nodes[id.0];
        let model = node.model.property(property)?;
        let column = SqlExpr::Column {
            object: node.object.clone(),
            name: model.store_name.clone(),
            ty: model.ty.clone(),
            mapping: Some(model.mapping.clone()),
        };

        self.nodes[id.0]
            .columns
            .insert(property.to_string(), column.clone());

        Some(column)
    }

    /// Bind an embedded navigation of this projection, returning the
    /// cached child projection when one exists. Referenced navigations
    /// are not addressable within the document and return `None`.
    pub fn navigation(
        &mut self,
        id: EntityProjectionId,
        navigation: &str,
    ) -> Option<EntityProjectionId> {
        if let Some(child) = self.nodes[id.0].children.get(navigation) {
            return Some(*child);
        }

        let node = &self.nodes[id.0];
        let model = node.model.navigation(navigation)?;
        if !model.embedded {
            return None;
        }

        let child = EntityProjectionNode {
            model: Arc::clone(&model.target),
            object: node.object.clone().nested(model.store_name.clone()),
            collection: model.collection,
            columns: BTreeMap::new(),
            children: BTreeMap::new(),
        };

        let child_id = self.push(child);
        self.nodes[id.0]
            .children
            .insert(navigation.to_string(), child_id);

        Some(child_id)
    }

    fn push(&mut self, node: EntityProjectionNode) -> EntityProjectionId {
        let id = EntityProjectionId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}
