use crate::{
    model::mapping::TypeMapping,
    value::{ScalarKind, ScalarType, Value},
};
use std::sync::Arc;

///
/// EntityModel
///
/// Runtime description of one object type: scalar properties,
/// navigations, and (for polymorphic hierarchies) the discriminator
/// property and per-type value. Built once by the convention layer;
/// read-only from this crate's perspective.
///

#[derive(Clone, Debug)]
pub struct EntityModel {
    /// Stable external name, used in diagnostics and output shaping.
    pub name: String,
    /// Store container holding documents of this type.
    pub container: String,
    /// Ordered scalar property list (authoritative for binding).
    pub properties: Vec<PropertyModel>,
    /// Navigations to related object types.
    pub navigations: Vec<NavigationModel>,
    /// Discriminator property name, present on polymorphic roots.
    pub discriminator_property: Option<String>,
    /// Discriminator value for this concrete type, absent on
    /// abstract roots.
    pub discriminator_value: Option<Value>,
    /// Concrete types derived from this one.
    pub derived: Vec<Arc<Self>>,
}

impl EntityModel {
    #[must_use]
    pub fn new(name: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: container.into(),
            properties: Vec::new(),
            navigations: Vec::new(),
            discriminator_property: None,
            discriminator_value: None,
            derived: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, property: PropertyModel) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationModel) -> Self {
        self.navigations.push(navigation);
        self
    }

    #[must_use]
    pub fn with_discriminator(mut self, property: impl Into<String>, value: Option<Value>) -> Self {
        self.discriminator_property = Some(property.into());
        self.discriminator_value = value;
        self
    }

    #[must_use]
    pub fn with_derived(mut self, derived: Arc<Self>) -> Self {
        self.derived.push(derived);
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&NavigationModel> {
        self.navigations.iter().find(|n| n.name == name)
    }

    /// Discriminator values of this type and every concrete derived
    /// type, in declaration order.
    #[must_use]
    pub fn concrete_discriminator_values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        if let Some(value) = &self.discriminator_value {
            values.push(value.clone());
        }
        for derived in &self.derived {
            values.extend(derived.concrete_discriminator_values());
        }
        values
    }
}

///
/// PropertyModel
///
/// One scalar property: host name, store-facing name, scalar type, and
/// the type mapping every bound access carries into the plan.
///

#[derive(Clone, Debug)]
pub struct PropertyModel {
    pub name: String,
    pub store_name: String,
    pub ty: ScalarType,
    pub mapping: TypeMapping,
}

impl PropertyModel {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        let name = name.into();
        let mapping = TypeMapping::default_for(&kind);

        Self {
            store_name: name.clone(),
            name,
            ty: ScalarType::new(kind),
            mapping,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.ty.nullable = true;
        self
    }

    #[must_use]
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = store_name.into();
        self
    }

    #[must_use]
    pub fn with_mapping(mut self, mapping: TypeMapping) -> Self {
        self.mapping = mapping;
        self
    }
}

///
/// NavigationModel
///
/// One relationship to another object type. Embedded navigations live
/// as sub-documents of the owner and are addressable in queries;
/// referenced navigations resolve through separate queries and are not
/// translatable here.
///

#[derive(Clone, Debug)]
pub struct NavigationModel {
    pub name: String,
    pub store_name: String,
    pub target: Arc<EntityModel>,
    pub collection: bool,
    pub embedded: bool,
}

impl NavigationModel {
    #[must_use]
    pub fn embedded(name: impl Into<String>, target: Arc<EntityModel>) -> Self {
        let name = name.into();

        Self {
            store_name: name.clone(),
            name,
            target,
            collection: false,
            embedded: true,
        }
    }

    #[must_use]
    pub fn referenced(name: impl Into<String>, target: Arc<EntityModel>) -> Self {
        let name = name.into();

        Self {
            store_name: name.clone(),
            name,
            target,
            collection: false,
            embedded: false,
        }
    }

    #[must_use]
    pub const fn many(mut self) -> Self {
        self.collection = true;
        self
    }

    #[must_use]
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = store_name.into();
        self
    }
}
