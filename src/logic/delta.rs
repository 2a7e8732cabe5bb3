use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::classify::MismatchClassifier;
use crate::logic::entries::{DeltaEntry, DeltaType};
use crate::logic::template_links::TemplateLinkReconciler;
use crate::model::{ContainerRef, Id, ProductType};
use crate::store::traits::{InstanceStore, StoreError, TypeCatalog};

#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("{0} does not exist")]
    ContainerNotFound(ContainerRef),
    #[error("product type '{type_id}' of {container} cannot be resolved")]
    ProductTypeNotFound { container: ContainerRef, type_id: Id },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Steps of delta computation; enabled passes always run in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPass {
    Properties,
    Links,
    TemplateLinks,
    NestedContainers,
}

impl ClassificationPass {
    pub const ALL: [ClassificationPass; 4] = [
        ClassificationPass::Properties,
        ClassificationPass::Links,
        ClassificationPass::TemplateLinks,
        ClassificationPass::NestedContainers,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaOptions {
    /// Locale used when plain text becomes localized and vice versa
    pub default_locale: String,
    pub passes: Vec<ClassificationPass>,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            passes: ClassificationPass::ALL.to_vec(),
        }
    }
}

/// Inconsistencies of one container with its product type, plus one child
/// delta per generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    container: ContainerRef,
    product_type: Id,
    entries: Vec<DeltaEntry>,
    children: Vec<Delta>,
}

impl Delta {
    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    pub fn product_type(&self) -> &str {
        &self.product_type
    }

    /// Empty iff there are no own entries and every child is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.iter().all(Delta::is_empty)
    }

    /// Own entries only; children are not flattened in
    pub fn entries(&self) -> &[DeltaEntry] {
        &self.entries
    }

    pub fn entries_of_type(&self, delta_type: DeltaType) -> Vec<&DeltaEntry> {
        self.entries
            .iter()
            .filter(|e| e.delta_type() == delta_type)
            .collect()
    }

    pub fn children(&self) -> &[Delta] {
        &self.children
    }

    /// Number of entries in the whole tree
    pub fn entry_count(&self) -> usize {
        self.entries.len() + self.children.iter().map(Delta::entry_count).sum::<usize>()
    }

    /// Applies own entries, then the children depth-first. Returns the number
    /// of entries applied.
    ///
    /// The delta itself is left untouched; recompute it to see the result.
    pub fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<usize, StoreError> {
        if !self.entries.is_empty() {
            info!("fixing {} entries of {}", self.entries.len(), self.container);
        }
        for entry in &self.entries {
            entry.fix(store)?;
        }
        let mut applied = self.entries.len();
        for child in &self.children {
            applied += child.fix(store)?;
        }
        Ok(applied)
    }
}

/// Builds deltas by running the configured classification passes
#[derive(Debug, Clone, Default)]
pub struct DeltaComputer {
    options: DeltaOptions,
}

impl DeltaComputer {
    pub fn new(options: DeltaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeltaOptions {
        &self.options
    }

    fn enabled(&self, pass: ClassificationPass) -> bool {
        self.options.passes.contains(&pass)
    }

    pub fn compute_delta<C, I>(&self, catalog: &C, instances: &I, container: &ContainerRef) -> Result<Delta, DeltaError>
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        let type_id = instances
            .product_type_of(container)
            .ok_or_else(|| DeltaError::ContainerNotFound(container.clone()))?;
        let product_type = catalog
            .find_type(&type_id)
            .ok_or_else(|| DeltaError::ProductTypeNotFound {
                container: container.clone(),
                type_id: type_id.clone(),
            })?;

        Ok(self.build(catalog, instances, container, &product_type))
    }

    fn build<C, I>(&self, catalog: &C, instances: &I, container: &ContainerRef, product_type: &ProductType) -> Delta
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        let locale = self.options.default_locale.as_str();
        let mut entries = Vec::new();
        let mut children = Vec::new();

        for pass in ClassificationPass::ALL.into_iter().filter(|p| self.enabled(*p)) {
            match pass {
                ClassificationPass::Properties => entries.extend(MismatchClassifier::property_entries(
                    catalog,
                    instances,
                    container,
                    product_type,
                    locale,
                )),
                ClassificationPass::Links => {
                    entries.extend(MismatchClassifier::link_entries(catalog, instances, container, product_type))
                }
                ClassificationPass::TemplateLinks => {
                    entries.extend(TemplateLinkReconciler::reconcile(catalog, instances, container, product_type))
                }
                ClassificationPass::NestedContainers => {
                    children = instances
                        .nested_containers(container)
                        .iter()
                        .map(|nested| self.build(catalog, instances, nested, product_type))
                        .collect();
                }
            }
        }

        debug!("{}: {} entries, {} children", container, entries.len(), children.len());
        Delta {
            container: container.clone(),
            product_type: product_type.id.clone(),
            entries,
            children,
        }
    }
}

/// Delta of `container` with every pass enabled
pub fn compute_delta<S>(store: &S, container: &ContainerRef) -> Result<Delta, DeltaError>
where
    S: TypeCatalog + InstanceStore + ?Sized,
{
    DeltaComputer::default().compute_delta(store, store, container)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub component: Id,
    pub fixed_entries: usize,
}

/// Computes and fixes the delta of every component in the store. Components
/// whose product type cannot be resolved are skipped.
pub fn reconcile_all<S>(computer: &DeltaComputer, store: &S) -> Result<Vec<ReconcileSummary>, DeltaError>
where
    S: TypeCatalog + InstanceStore + ?Sized,
{
    let mut summaries = Vec::new();
    for component in store.component_ids() {
        let container = ContainerRef::component(component.clone());
        let delta = match computer.compute_delta(store, store, &container) {
            Ok(delta) => delta,
            Err(err @ (DeltaError::ProductTypeNotFound { .. } | DeltaError::ContainerNotFound(_))) => {
                warn!("skipping {}: {}", container, err);
                continue;
            }
            Err(err) => return Err(err),
        };
        let fixed_entries = delta.fix(store)?;
        summaries.push(ReconcileSummary {
            component,
            fixed_entries,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AssociationDef, AttributeDef, DataType, Generation, Link, ProductCmpt, PropertyValue, Workspace,
    };
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> MemoryStore {
        let mut motor = ProductType::new("Motor", "Motor");
        let mut rate = AttributeDef::new("rate", DataType::Decimal);
        rate.changing_over_time = true;
        rate.default_value = Some("1.0".to_string());
        motor.properties.push(rate.into());
        motor.associations.push(AssociationDef::new("coverages", "Coverage"));

        let mut cmpt = ProductCmpt::new("p1", "Motor");
        cmpt.links.push(Link::new("assistance", "roadside"));
        cmpt.add_generation(Generation::new(date(2023, 1, 1)));
        cmpt.add_generation(Generation::new(date(2024, 1, 1)));

        let stray = ProductCmpt::new("stray", "Unknown");
        MemoryStore::new(Workspace::new(vec![motor], vec![cmpt, stray]))
    }

    #[test]
    fn test_tree_shape() {
        let store = store();
        let delta = compute_delta(&store, &ContainerRef::component("p1")).unwrap();

        assert_eq!(delta.product_type(), "Motor");
        assert_eq!(delta.entries().len(), 1);
        assert_eq!(delta.entries_of_type(DeltaType::LinkWithoutAssociation).len(), 1);
        assert!(delta.entries_of_type(DeltaType::MissingPropertyValue).is_empty());
        assert_eq!(delta.children().len(), 2);
        assert_eq!(
            delta.children()[0].container(),
            &ContainerRef::generation("p1", date(2023, 1, 1))
        );
        assert_eq!(delta.entry_count(), 3);
    }

    #[test]
    fn test_emptiness_looks_at_children() {
        let store = store();
        let only_generations = DeltaComputer::new(DeltaOptions {
            default_locale: "en".to_string(),
            passes: vec![ClassificationPass::NestedContainers, ClassificationPass::Properties],
        });

        let delta = only_generations
            .compute_delta(&store, &store, &ContainerRef::component("p1"))
            .unwrap();
        assert!(delta.entries().is_empty());
        assert!(!delta.is_empty());

        assert_eq!(delta.fix(&store).unwrap(), 2);
        let after = only_generations
            .compute_delta(&store, &store, &ContainerRef::component("p1"))
            .unwrap();
        assert!(after.is_empty());

        let generation = store.component("p1").unwrap().generations[1].clone();
        match &generation.values[0] {
            PropertyValue::Attribute(v) => assert_eq!(v.holder, crate::model::ValueHolder::single("1.0")),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_errors_are_distinct_from_empty() {
        let store = store();
        assert!(matches!(
            compute_delta(&store, &ContainerRef::component("nope")),
            Err(DeltaError::ContainerNotFound(_))
        ));
        assert!(matches!(
            compute_delta(&store, &ContainerRef::component("stray")),
            Err(DeltaError::ProductTypeNotFound { .. })
        ));
    }

    #[test]
    fn test_reconcile_all_skips_unresolved() {
        let store = store();
        let summaries = reconcile_all(&DeltaComputer::default(), &store).unwrap();

        assert_eq!(
            summaries,
            vec![ReconcileSummary {
                component: "p1".to_string(),
                fixed_entries: 3
            }]
        );
        assert!(compute_delta(&store, &ContainerRef::component("p1")).unwrap().is_empty());
    }

    #[test]
    fn test_delta_serializes() {
        let store = store();
        let delta = compute_delta(&store, &ContainerRef::component("p1")).unwrap();
        let json = serde_json::to_value(&delta).unwrap();

        assert_eq!(json["container"]["container"], "component");
        assert_eq!(json["entries"][0]["delta_type"], "link_without_association");
        assert_eq!(json["children"].as_array().map(Vec::len), Some(2));
    }
}
