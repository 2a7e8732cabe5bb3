use crate::model::{Id, ProductCmpt, ProductType};
use serde::{Deserialize, Serialize};

/// Snapshot of a model workspace: product types plus the components configured from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub product_types: Vec<ProductType>,
    #[serde(default)]
    pub components: Vec<ProductCmpt>,
}

impl Workspace {
    pub fn new(product_types: Vec<ProductType>, components: Vec<ProductCmpt>) -> Self {
        Self {
            product_types,
            components,
        }
    }

    /// Puts every component's generations back into chronological order
    pub fn normalize(&mut self) {
        self.components.iter_mut().for_each(ProductCmpt::sort_generations);
    }

    pub fn product_type(&self, id: &str) -> Option<&ProductType> {
        self.product_types.iter().find(|t| t.id == id)
    }

    pub fn component(&self, id: &str) -> Option<&ProductCmpt> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut ProductCmpt> {
        self.components.iter_mut().find(|c| c.id == id)
    }

    pub fn component_ids(&self) -> Vec<Id> {
        self.components.iter().map(|c| c.id.clone()).collect()
    }
}
