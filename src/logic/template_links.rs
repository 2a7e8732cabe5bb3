use log::debug;

use crate::logic::entries::{DeltaEntry, MissingTemplateLink, RemovedTemplateLink};
use crate::model::{ContainerRef, Link, ProductType, TemplateStatus};
use crate::store::traits::{InstanceStore, TypeCatalog};

/// Diffs the links of a template-based container against its template
pub struct TemplateLinkReconciler;

impl TemplateLinkReconciler {
    /// Links are matched by (association, target), never by link id. An
    /// unresolvable template yields no entries.
    ///
    /// Template links are only mirrored when their association still exists
    /// and belongs to the container's temporal partition; the link pass would
    /// remove or move anything else again.
    pub fn reconcile<C, I>(
        catalog: &C,
        instances: &I,
        container: &ContainerRef,
        product_type: &ProductType,
    ) -> Vec<DeltaEntry>
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        if !instances.uses_template(container) {
            return Vec::new();
        }
        let Some(template) = instances.template_container(container) else {
            debug!("template of {} cannot be resolved, skipping template links", container);
            return Vec::new();
        };

        let links = instances.links(container);
        let template_links = instances.links(&template);
        let mut entries = Vec::new();

        for template_link in template_links
            .iter()
            .filter(|l| l.template_status != TemplateStatus::Undefined)
            .filter(|l| Self::belongs_to(catalog, instances, container, product_type, l))
        {
            if !links.iter().any(|l| l.same_target(template_link)) {
                entries.push(DeltaEntry::MissingTemplateLink(MissingTemplateLink {
                    container: container.clone(),
                    template_link: template_link.clone(),
                }));
            }
        }

        for link in links
            .iter()
            .filter(|l| l.template_status == TemplateStatus::Inherited)
        {
            if !template_links.iter().any(|t| t.same_target(link)) {
                entries.push(DeltaEntry::RemovedTemplateLink(RemovedTemplateLink {
                    container: container.clone(),
                    link: link.clone(),
                }));
            }
        }

        entries
    }

    fn belongs_to<C, I>(
        catalog: &C,
        instances: &I,
        container: &ContainerRef,
        product_type: &ProductType,
        link: &Link,
    ) -> bool
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        match catalog.find_association(product_type, &link.association) {
            Some(association) => instances.is_responsible_for(container, association.changing_over_time),
            None => {
                debug!("template link '{}' refers to unknown association '{}'", link.id, link.association);
                false
            }
        }
    }
}
