use crate::model::{AssociationDef, ContainerRef, Id, Link, ProductType, PropertyDef, PropertyKind, PropertyValue};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read workspace: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse workspace: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read access to product type definitions
pub trait TypeCatalog {
    fn find_type(&self, type_id: &str) -> Option<ProductType>;

    /// The type followed by its supertypes, nearest first. Stops at an
    /// unresolvable supertype or a cycle.
    fn type_hierarchy(&self, product_type: &ProductType) -> Vec<ProductType> {
        let mut chain = vec![product_type.clone()];
        let mut seen = HashSet::from([product_type.id.clone()]);
        let mut next = product_type.supertype.clone();

        while let Some(id) = next {
            if !seen.insert(id.clone()) {
                break;
            }
            match self.find_type(&id) {
                Some(supertype) => {
                    next = supertype.supertype.clone();
                    chain.push(supertype);
                }
                None => break,
            }
        }

        chain
    }

    /// Name to definition map of every property of `kind` visible through the
    /// supertype hierarchy; a subtype declaration shadows its supertype's
    fn properties_by_kind(&self, product_type: &ProductType, kind: PropertyKind) -> BTreeMap<String, PropertyDef> {
        let mut definitions = BTreeMap::new();
        for t in self.type_hierarchy(product_type).iter().rev() {
            for def in t.own_properties(kind) {
                definitions.insert(def.name().to_string(), def.clone());
            }
        }
        definitions
    }

    /// Definition named `name` under any kind, first match in kind iteration order
    fn find_property(&self, product_type: &ProductType, name: &str) -> Option<PropertyDef> {
        PropertyKind::ALL
            .iter()
            .find_map(|kind| self.properties_by_kind(product_type, *kind).remove(name))
    }

    fn find_association(&self, product_type: &ProductType, name: &str) -> Option<AssociationDef> {
        self.type_hierarchy(product_type)
            .iter()
            .find_map(|t| t.own_association(name).cloned())
    }
}

/// Read/write access to the property values and links of product components
/// and their generations.
///
/// Mutations report `Ok(false)` when the addressed container or element no
/// longer exists.
pub trait InstanceStore {
    fn component_ids(&self) -> Vec<Id>;

    /// Id of the product type the container's component instantiates, `None`
    /// if the container does not exist
    fn product_type_of(&self, container: &ContainerRef) -> Option<Id>;

    fn values(&self, container: &ContainerRef) -> Vec<PropertyValue>;

    fn links(&self, container: &ContainerRef) -> Vec<Link>;

    /// Generations of a component in chronological order; empty for a generation
    fn nested_containers(&self, container: &ContainerRef) -> Vec<ContainerRef>;

    fn uses_template(&self, container: &ContainerRef) -> bool;

    /// The template counterpart of the container, `None` if there is no
    /// template or it cannot be resolved
    fn template_container(&self, container: &ContainerRef) -> Option<ContainerRef>;

    /// Inserts a value, replacing the value of the same kind and name
    fn put_value(&self, container: &ContainerRef, value: PropertyValue) -> Result<bool, StoreError>;

    fn remove_value(&self, container: &ContainerRef, kind: PropertyKind, name: &str) -> Result<bool, StoreError>;

    /// Inserts a link, replacing the link with the same id
    fn put_link(&self, container: &ContainerRef, link: Link) -> Result<bool, StoreError>;

    fn remove_link(&self, container: &ContainerRef, link_id: &str) -> Result<bool, StoreError>;

    fn exists(&self, container: &ContainerRef) -> bool {
        self.product_type_of(container).is_some()
    }

    fn value(&self, container: &ContainerRef, kind: PropertyKind, name: &str) -> Option<PropertyValue> {
        self.values(container)
            .into_iter()
            .find(|v| v.kind() == kind && v.name() == name)
    }

    fn value_for(&self, container: &ContainerRef, definition: &PropertyDef) -> Option<PropertyValue> {
        self.value(container, definition.kind(), definition.name())
    }

    fn link(&self, container: &ContainerRef, link_id: &str) -> Option<Link> {
        self.links(container).into_iter().find(|l| l.id == link_id)
    }

    fn is_responsible_for(&self, container: &ContainerRef, changing_over_time: bool) -> bool {
        container.is_responsible_for(changing_over_time)
    }
}

pub trait Store: TypeCatalog + InstanceStore + Send + Sync {}

impl<T: TypeCatalog + InstanceStore + Send + Sync> Store for T {}
