use crate::model::{
    ContainerRef, Id, Link, ProductCmpt, ProductType, PropertyKind, PropertyValue, PropertyValueContainer,
    Workspace,
};
use crate::store::traits::{InstanceStore, StoreError, TypeCatalog};
use parking_lot::RwLock;
use std::path::Path;

/// In-memory workspace store backing both the type catalog and the instance side
#[derive(Debug, Default)]
pub struct MemoryStore {
    workspace: RwLock<Workspace>,
}

impl MemoryStore {
    pub fn new(mut workspace: Workspace) -> Self {
        workspace.normalize();
        Self {
            workspace: RwLock::new(workspace),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clone of the whole workspace
    pub fn snapshot(&self) -> Workspace {
        self.workspace.read().clone()
    }

    pub fn component(&self, id: &str) -> Option<ProductCmpt> {
        self.workspace.read().component(id).cloned()
    }

    pub fn upsert_component(&self, mut component: ProductCmpt) {
        component.sort_generations();
        let mut workspace = self.workspace.write();
        match workspace.component_mut(&component.id) {
            Some(existing) => *existing = component,
            None => workspace.components.push(component),
        }
    }

    pub fn upsert_product_type(&self, product_type: ProductType) {
        let mut workspace = self.workspace.write();
        match workspace.product_types.iter_mut().find(|t| t.id == product_type.id) {
            Some(existing) => *existing = product_type,
            None => workspace.product_types.push(product_type),
        }
    }

    fn read_container<T>(
        &self,
        container: &ContainerRef,
        f: impl FnOnce(&dyn PropertyValueContainer) -> T,
    ) -> Option<T> {
        let workspace = self.workspace.read();
        let component = workspace.component(container.component_id())?;
        component.container(container).map(f)
    }

    fn write_container<T>(
        &self,
        container: &ContainerRef,
        f: impl FnOnce(&mut dyn PropertyValueContainer) -> T,
    ) -> Option<T> {
        let mut workspace = self.workspace.write();
        let component = workspace.component_mut(container.component_id())?;
        component.container_mut(container).map(f)
    }
}

impl TypeCatalog for MemoryStore {
    fn find_type(&self, type_id: &str) -> Option<ProductType> {
        self.workspace.read().product_type(type_id).cloned()
    }
}

impl InstanceStore for MemoryStore {
    fn component_ids(&self) -> Vec<Id> {
        self.workspace.read().component_ids()
    }

    fn product_type_of(&self, container: &ContainerRef) -> Option<Id> {
        let workspace = self.workspace.read();
        let component = workspace.component(container.component_id())?;
        component.container(container)?;
        Some(component.product_type.clone())
    }

    fn values(&self, container: &ContainerRef) -> Vec<PropertyValue> {
        self.read_container(container, |c| c.values().to_vec())
            .unwrap_or_default()
    }

    fn links(&self, container: &ContainerRef) -> Vec<Link> {
        self.read_container(container, |c| c.links().to_vec())
            .unwrap_or_default()
    }

    fn nested_containers(&self, container: &ContainerRef) -> Vec<ContainerRef> {
        let ContainerRef::Component { id } = container else {
            return Vec::new();
        };
        self.workspace
            .read()
            .component(id)
            .map(|c| {
                c.generations
                    .iter()
                    .map(|g| ContainerRef::generation(id.clone(), g.valid_from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn uses_template(&self, container: &ContainerRef) -> bool {
        self.workspace
            .read()
            .component(container.component_id())
            .is_some_and(|c| c.uses_template())
    }

    fn template_container(&self, container: &ContainerRef) -> Option<ContainerRef> {
        let workspace = self.workspace.read();
        let component = workspace.component(container.component_id())?;
        let template = workspace.component(component.template.as_deref()?)?;

        match container {
            ContainerRef::Component { .. } => Some(ContainerRef::component(template.id.clone())),
            ContainerRef::Generation { valid_from, .. } => template
                .generation_effective_on(*valid_from)
                .map(|g| ContainerRef::generation(template.id.clone(), g.valid_from)),
        }
    }

    fn put_value(&self, container: &ContainerRef, value: PropertyValue) -> Result<bool, StoreError> {
        Ok(self
            .write_container(container, |c| c.put_value(value))
            .is_some())
    }

    fn remove_value(&self, container: &ContainerRef, kind: PropertyKind, name: &str) -> Result<bool, StoreError> {
        Ok(self
            .write_container(container, |c| c.remove_value(kind, name))
            .unwrap_or(false))
    }

    fn put_link(&self, container: &ContainerRef, link: Link) -> Result<bool, StoreError> {
        Ok(self.write_container(container, |c| c.put_link(link)).is_some())
    }

    fn remove_link(&self, container: &ContainerRef, link_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .write_container(container, |c| c.remove_link(link_id))
            .unwrap_or(false))
    }
}
