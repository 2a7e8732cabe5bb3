use std::collections::BTreeMap;

use crate::logic::entries::{
    invalid_texts, DatatypeMismatch, DeltaEntry, HiddenAttributeMismatch, LinkChangingOverTimeMismatch,
    LinkWithoutAssociation, MissingPropertyValue, MultilingualMismatch, PropertyTypeMismatch,
    ValueHolderMismatch, ValueSetMismatch, ValueWithoutProperty,
};
use crate::model::{
    AttributeDef, AttributeValue, ConfigElement, ConfigElementDef, ContainerRef, ProductType, PropertyDef,
    PropertyKind, PropertyValue,
};
use crate::store::traits::{InstanceStore, TypeCatalog};

type DefinitionsByKind = BTreeMap<PropertyKind, BTreeMap<String, PropertyDef>>;

/// Compares the values and links of one container with its product type
pub struct MismatchClassifier;

impl MismatchClassifier {
    /// Property and link entries of `container`; nothing when the type is unresolved
    pub fn classify<C, I>(
        catalog: &C,
        instances: &I,
        container: &ContainerRef,
        product_type: Option<&ProductType>,
        default_locale: &str,
    ) -> Vec<DeltaEntry>
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        let Some(product_type) = product_type else {
            return Vec::new();
        };
        let mut entries = Self::property_entries(catalog, instances, container, product_type, default_locale);
        entries.extend(Self::link_entries(catalog, instances, container, product_type));
        entries
    }

    /// Walks every property kind: missing values first, then the configured values of the kind
    pub fn property_entries<C, I>(
        catalog: &C,
        instances: &I,
        container: &ContainerRef,
        product_type: &ProductType,
        default_locale: &str,
    ) -> Vec<DeltaEntry>
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        let definitions: DefinitionsByKind = PropertyKind::ALL
            .iter()
            .map(|kind| (*kind, catalog.properties_by_kind(product_type, *kind)))
            .collect();
        let values = instances.values(container);
        let mut entries = Vec::new();

        for kind in PropertyKind::ALL {
            let Some(by_name) = definitions.get(&kind) else {
                continue;
            };

            for definition in by_name.values() {
                if !instances.is_responsible_for(container, definition.is_changing_over_time()) {
                    continue;
                }
                if instances.value_for(container, definition).is_some() {
                    continue;
                }
                if Self::reported_as_type_mismatch(catalog, product_type, &definitions, &values, definition) {
                    continue;
                }
                entries.push(DeltaEntry::MissingPropertyValue(MissingPropertyValue {
                    container: container.clone(),
                    definition: definition.clone(),
                    default_locale: default_locale.to_string(),
                }));
            }

            for value in values.iter().filter(|v| v.kind() == kind) {
                match by_name.get(value.name()) {
                    None => entries.push(Self::undeclared_value(catalog, product_type, container, value, default_locale)),
                    Some(definition)
                        if !instances.is_responsible_for(container, definition.is_changing_over_time()) =>
                    {
                        entries.push(DeltaEntry::ValueWithoutProperty(ValueWithoutProperty {
                            container: container.clone(),
                            value: value.clone(),
                        }));
                    }
                    Some(definition) => {
                        entries.extend(Self::value_entries(container, definition, value, default_locale));
                    }
                }
            }
        }

        entries
    }

    /// One entry per link whose association is unknown or lives in the other temporal partition
    pub fn link_entries<C, I>(
        catalog: &C,
        instances: &I,
        container: &ContainerRef,
        product_type: &ProductType,
    ) -> Vec<DeltaEntry>
    where
        C: TypeCatalog + ?Sized,
        I: InstanceStore + ?Sized,
    {
        instances
            .links(container)
            .into_iter()
            .filter_map(|link| match catalog.find_association(product_type, &link.association) {
                None => Some(DeltaEntry::LinkWithoutAssociation(LinkWithoutAssociation {
                    container: container.clone(),
                    link,
                })),
                Some(association) if !instances.is_responsible_for(container, association.changing_over_time) => {
                    Some(DeltaEntry::LinkChangingOverTimeMismatch(LinkChangingOverTimeMismatch {
                        container: container.clone(),
                        association,
                        link,
                    }))
                }
                Some(_) => None,
            })
            .collect()
    }

    /// A same-named value of another kind, undeclared for its own kind, is
    /// reported as a type mismatch against `definition` instead
    fn reported_as_type_mismatch<C: TypeCatalog + ?Sized>(
        catalog: &C,
        product_type: &ProductType,
        definitions: &DefinitionsByKind,
        values: &[PropertyValue],
        definition: &PropertyDef,
    ) -> bool {
        let orphan_exists = values.iter().any(|v| {
            v.kind() != definition.kind()
                && v.name() == definition.name()
                && !definitions
                    .get(&v.kind())
                    .is_some_and(|by_name| by_name.contains_key(v.name()))
        });
        orphan_exists
            && catalog
                .find_property(product_type, definition.name())
                .map(|d| d.kind())
                == Some(definition.kind())
    }

    /// A value with no definition of its own kind: a type mismatch when another
    /// kind declares the name, otherwise an orphan
    fn undeclared_value<C: TypeCatalog + ?Sized>(
        catalog: &C,
        product_type: &ProductType,
        container: &ContainerRef,
        value: &PropertyValue,
        default_locale: &str,
    ) -> DeltaEntry {
        match catalog.find_property(product_type, value.name()) {
            Some(definition) => DeltaEntry::PropertyTypeMismatch(PropertyTypeMismatch {
                container: container.clone(),
                definition,
                value: value.clone(),
                default_locale: default_locale.to_string(),
            }),
            None => DeltaEntry::ValueWithoutProperty(ValueWithoutProperty {
                container: container.clone(),
                value: value.clone(),
            }),
        }
    }

    fn value_entries(
        container: &ContainerRef,
        definition: &PropertyDef,
        value: &PropertyValue,
        default_locale: &str,
    ) -> Vec<DeltaEntry> {
        match (definition, value) {
            (PropertyDef::Attribute(def), PropertyValue::Attribute(attr)) => {
                Self::attribute_entries(container, def, attr, default_locale)
            }
            (PropertyDef::ConfigElement(def), PropertyValue::ConfigElement(element)) => {
                Self::config_element_entries(container, def, element)
            }
            _ => Vec::new(),
        }
    }

    fn attribute_entries(
        container: &ContainerRef,
        definition: &AttributeDef,
        value: &AttributeValue,
        default_locale: &str,
    ) -> Vec<DeltaEntry> {
        let mut entries = Vec::new();

        if value.holder.multiplicity() != definition.multiplicity {
            entries.push(DeltaEntry::ValueHolderMismatch(ValueHolderMismatch {
                container: container.clone(),
                value: value.clone(),
                definition: definition.clone(),
            }));
        }

        let reshaped = value
            .holder
            .to_multiplicity(definition.multiplicity, definition.localization);
        if !reshaped.matches_localization(definition.localization) {
            entries.push(DeltaEntry::MultilingualMismatch(MultilingualMismatch {
                container: container.clone(),
                value: value.clone(),
                definition: definition.clone(),
                default_locale: default_locale.to_string(),
            }));
        }

        if value.hidden != definition.is_hidden() {
            entries.push(DeltaEntry::HiddenAttributeMismatch(HiddenAttributeMismatch {
                container: container.clone(),
                value: value.clone(),
                definition: definition.clone(),
            }));
        }

        // judged on the value as the fixes above will leave it
        let normalized = reshaped.to_localization(definition.localization, default_locale);
        let invalid = invalid_texts(definition, &normalized);
        if !invalid.is_empty() {
            entries.push(DeltaEntry::DatatypeMismatch(DatatypeMismatch {
                container: container.clone(),
                definition: definition.clone().into(),
                value: PropertyValue::Attribute(value.clone()),
                invalid,
            }));
        }

        entries
    }

    fn config_element_entries(
        container: &ContainerRef,
        definition: &ConfigElementDef,
        element: &ConfigElement,
    ) -> Vec<DeltaEntry> {
        let mut entries = Vec::new();

        if !definition.value_set.is_compatible_configuration(&element.value_set) {
            entries.push(DeltaEntry::ValueSetMismatch(ValueSetMismatch {
                container: container.clone(),
                definition: definition.clone(),
                value: element.clone(),
            }));
        }

        if let Some(default) = element
            .default_value
            .as_deref()
            .filter(|d| !definition.datatype.accepts(d))
        {
            entries.push(DeltaEntry::DatatypeMismatch(DatatypeMismatch {
                container: container.clone(),
                definition: definition.clone().into(),
                value: PropertyValue::ConfigElement(element.clone()),
                invalid: vec![default.to_string()],
            }));
        }

        entries
    }
}
