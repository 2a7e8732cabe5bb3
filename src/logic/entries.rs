use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::{
    AssociationDef, AttributeDef, AttributeValue, ConfigElement, ConfigElementDef, ContainerRef, Link,
    PropertyDef, PropertyKind, PropertyValue, TemplateStatus, ValueContent, ValueHolder, ValueSet,
};
use crate::store::traits::{InstanceStore, StoreError};

/// Tag of a delta entry, used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaType {
    MissingPropertyValue,
    ValueWithoutProperty,
    PropertyTypeMismatch,
    ValueSetMismatch,
    ValueHolderMismatch,
    MultilingualMismatch,
    HiddenAttributeMismatch,
    DatatypeMismatch,
    LinkWithoutAssociation,
    LinkChangingOverTimeMismatch,
    MissingTemplateLink,
    RemovedTemplateLink,
}

impl DeltaType {
    pub const ALL: [DeltaType; 12] = [
        DeltaType::MissingPropertyValue,
        DeltaType::ValueWithoutProperty,
        DeltaType::PropertyTypeMismatch,
        DeltaType::ValueSetMismatch,
        DeltaType::ValueHolderMismatch,
        DeltaType::MultilingualMismatch,
        DeltaType::HiddenAttributeMismatch,
        DeltaType::DatatypeMismatch,
        DeltaType::LinkWithoutAssociation,
        DeltaType::LinkChangingOverTimeMismatch,
        DeltaType::MissingTemplateLink,
        DeltaType::RemovedTemplateLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaType::MissingPropertyValue => "missing_property_value",
            DeltaType::ValueWithoutProperty => "value_without_property",
            DeltaType::PropertyTypeMismatch => "property_type_mismatch",
            DeltaType::ValueSetMismatch => "value_set_mismatch",
            DeltaType::ValueHolderMismatch => "value_holder_mismatch",
            DeltaType::MultilingualMismatch => "multilingual_mismatch",
            DeltaType::HiddenAttributeMismatch => "hidden_attribute_mismatch",
            DeltaType::DatatypeMismatch => "datatype_mismatch",
            DeltaType::LinkWithoutAssociation => "link_without_association",
            DeltaType::LinkChangingOverTimeMismatch => "link_changing_over_time_mismatch",
            DeltaType::MissingTemplateLink => "missing_template_link",
            DeltaType::RemovedTemplateLink => "removed_template_link",
        }
    }
}

/// The type declares a property the container has no value for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingPropertyValue {
    pub container: ContainerRef,
    pub definition: PropertyDef,
    pub default_locale: String,
}

impl MissingPropertyValue {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        if store.value_for(&self.container, &self.definition).is_some() {
            debug!("{} already has a value for '{}'", self.container, self.definition.name());
            return Ok(());
        }
        store.put_value(&self.container, self.definition.new_value(&self.default_locale))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("{} '{}' has no value", self.definition.kind(), self.definition.name())
    }
}

/// A configured value whose property the type no longer declares for this container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueWithoutProperty {
    pub container: ContainerRef,
    pub value: PropertyValue,
}

impl ValueWithoutProperty {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        store.remove_value(&self.container, self.value.kind(), self.value.name())?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "{} '{}' has no matching property in the product type",
            self.value.kind(),
            self.value.name()
        )
    }
}

/// A value whose name now belongs to a property of another kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyTypeMismatch {
    pub container: ContainerRef,
    pub definition: PropertyDef,
    pub value: PropertyValue,
    pub default_locale: String,
}

impl PropertyTypeMismatch {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(current) = store.value(&self.container, self.value.kind(), self.value.name()) else {
            debug!("{} no longer holds {} '{}'", self.container, self.value.kind(), self.value.name());
            return Ok(());
        };
        let raw = current.raw_content(&self.default_locale);
        store.remove_value(&self.container, current.kind(), current.name())?;

        let responsible = store.is_responsible_for(&self.container, self.definition.is_changing_over_time());
        if responsible && store.value_for(&self.container, &self.definition).is_none() {
            let replacement = self
                .definition
                .new_value_with_content(raw.as_deref(), &self.default_locale);
            store.put_value(&self.container, replacement)?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "'{}' is configured as {} but the product type declares it as {}",
            self.value.name(),
            self.value.kind(),
            self.definition.kind()
        )
    }
}

/// A configured value set of a different type than the restricted model value set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSetMismatch {
    pub container: ContainerRef,
    pub definition: ConfigElementDef,
    pub value: ConfigElement,
}

impl ValueSetMismatch {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(PropertyValue::ConfigElement(mut element)) =
            store.value(&self.container, PropertyKind::ConfigElement, &self.definition.name)
        else {
            return Ok(());
        };
        if self.definition.value_set.is_compatible_configuration(&element.value_set) {
            debug!("value set of '{}' in {} is already compatible", element.name, self.container);
            return Ok(());
        }
        element.value_set = ValueSet::Unrestricted;
        store.put_value(&self.container, PropertyValue::ConfigElement(element))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "value set of '{}' is {:?} but the product type requires {:?}",
            self.definition.name,
            self.value.value_set.value_set_type(),
            self.definition.value_set.value_set_type()
        )
    }
}

/// Single/multi holder of an attribute value disagrees with the definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueHolderMismatch {
    pub container: ContainerRef,
    pub value: AttributeValue,
    pub definition: AttributeDef,
}

impl ValueHolderMismatch {
    /// Multi to single keeps only the first element.
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(mut value) = current_attribute(store, &self.container, &self.definition.name) else {
            return Ok(());
        };
        if value.holder.multiplicity() == self.definition.multiplicity {
            return Ok(());
        }
        value.holder = value
            .holder
            .to_multiplicity(self.definition.multiplicity, self.definition.localization);
        store.put_value(&self.container, PropertyValue::Attribute(value))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "'{}' is stored as {:?} value but the attribute is {:?}-valued",
            self.definition.name,
            self.value.holder.multiplicity(),
            self.definition.multiplicity
        )
    }
}

/// Plain/localized representation of an attribute value disagrees with the definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultilingualMismatch {
    pub container: ContainerRef,
    pub value: AttributeValue,
    pub definition: AttributeDef,
    pub default_locale: String,
}

impl MultilingualMismatch {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(mut value) = current_attribute(store, &self.container, &self.definition.name) else {
            return Ok(());
        };
        if value.holder.matches_localization(self.definition.localization) {
            return Ok(());
        }
        value.holder = value
            .holder
            .to_localization(self.definition.localization, &self.default_locale);
        store.put_value(&self.container, PropertyValue::Attribute(value))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "'{}' is not stored as {:?} value",
            self.definition.name, self.definition.localization
        )
    }
}

/// Hidden-attribute bookkeeping of a value disagrees with the attribute's visibility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HiddenAttributeMismatch {
    pub container: ContainerRef,
    pub value: AttributeValue,
    pub definition: AttributeDef,
}

impl HiddenAttributeMismatch {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(mut value) = current_attribute(store, &self.container, &self.definition.name) else {
            return Ok(());
        };
        if value.hidden == self.definition.is_hidden() {
            return Ok(());
        }
        value.hidden = self.definition.is_hidden();
        store.put_value(&self.container, PropertyValue::Attribute(value))?;
        Ok(())
    }

    fn description(&self) -> String {
        if self.definition.is_hidden() {
            format!("attribute '{}' is hidden but its value is not marked hidden", self.definition.name)
        } else {
            format!("attribute '{}' is visible but its value is marked hidden", self.definition.name)
        }
    }
}

/// Stored text that the definition's datatype does not accept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatatypeMismatch {
    pub container: ContainerRef,
    pub definition: PropertyDef,
    pub value: PropertyValue,
    /// The offending texts at classification time
    pub invalid: Vec<String>,
}

impl DatatypeMismatch {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(current) = store.value_for(&self.container, &self.definition) else {
            return Ok(());
        };
        let repaired = match (&self.definition, current) {
            (PropertyDef::Attribute(def), PropertyValue::Attribute(mut value)) => {
                let holder = sanitize_holder(def, &value.holder);
                if holder == value.holder {
                    return Ok(());
                }
                value.holder = holder;
                PropertyValue::Attribute(value)
            }
            (PropertyDef::ConfigElement(def), PropertyValue::ConfigElement(mut element)) => {
                if def.datatype.accepts_opt(element.default_value.as_deref()) {
                    return Ok(());
                }
                element.default_value = None;
                PropertyValue::ConfigElement(element)
            }
            _ => return Ok(()),
        };
        store.put_value(&self.container, repaired)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "'{}' holds text not valid for its datatype: {}",
            self.definition.name(),
            self.invalid.iter().join(", ")
        )
    }
}

/// Texts of an attribute value its datatype rejects
pub(crate) fn invalid_texts(definition: &AttributeDef, holder: &ValueHolder) -> Vec<String> {
    holder
        .contents()
        .into_iter()
        .filter_map(ValueContent::plain_text)
        .filter(|text| !definition.datatype.accepts(text))
        .map(str::to_string)
        .collect()
}

/// Resets an invalid single value to the definition's default (when that is
/// valid) and drops invalid elements of a multi value
fn sanitize_holder(definition: &AttributeDef, holder: &ValueHolder) -> ValueHolder {
    let valid = |content: &ValueContent| {
        content
            .plain_text()
            .map_or(true, |text| definition.datatype.accepts(text))
    };
    match holder {
        ValueHolder::Single(content) if !valid(content) => {
            let fallback = definition
                .default_value
                .clone()
                .filter(|d| definition.datatype.accepts(d));
            ValueHolder::Single(ValueContent::Plain(fallback))
        }
        ValueHolder::Single(_) => holder.clone(),
        ValueHolder::Multi(contents) => ValueHolder::Multi(contents.iter().filter(|c| valid(c)).cloned().collect()),
    }
}

/// A link whose association the type does not declare
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkWithoutAssociation {
    pub container: ContainerRef,
    pub link: Link,
}

impl LinkWithoutAssociation {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        store.remove_link(&self.container, &self.link.id)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "link to '{}' refers to unknown association '{}'",
            self.link.target, self.link.association
        )
    }
}

/// A link stored in the wrong temporal partition for its association
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkChangingOverTimeMismatch {
    pub container: ContainerRef,
    pub association: AssociationDef,
    pub link: Link,
}

impl LinkChangingOverTimeMismatch {
    /// Root links of a changing association move to the latest generation,
    /// generation links of a static association move to the root.
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(link) = store.link(&self.container, &self.link.id) else {
            return Ok(());
        };
        if store.is_responsible_for(&self.container, self.association.changing_over_time) {
            return Ok(());
        }

        let root = ContainerRef::component(self.container.component_id().clone());
        let destination = if self.association.changing_over_time {
            store.nested_containers(&root).pop()
        } else {
            Some(root)
        };
        let Some(destination) = destination else {
            debug!(
                "no generation to move link '{}' of {} into",
                link.id, self.container
            );
            return Ok(());
        };

        if !store.links(&destination).iter().any(|l| l.same_target(&link)) {
            store.put_link(&destination, link.clone())?;
        }
        store.remove_link(&self.container, &link.id)?;
        Ok(())
    }

    fn description(&self) -> String {
        let expected = if self.association.changing_over_time {
            "a generation"
        } else {
            "the component"
        };
        format!(
            "link to '{}' of association '{}' belongs to {}",
            self.link.target, self.association.name, expected
        )
    }
}

/// A template link the container neither inherits nor explicitly excludes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingTemplateLink {
    pub container: ContainerRef,
    pub template_link: Link,
}

impl MissingTemplateLink {
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        if store
            .links(&self.container)
            .iter()
            .any(|l| l.same_target(&self.template_link))
        {
            return Ok(());
        }
        store.put_link(&self.container, Link::inherited_from(&self.template_link))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "template link to '{}' of association '{}' is missing",
            self.template_link.target, self.template_link.association
        )
    }
}

/// An inherited link whose counterpart was removed from the template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovedTemplateLink {
    pub container: ContainerRef,
    pub link: Link,
}

impl RemovedTemplateLink {
    /// Marks the link undefined instead of deleting it.
    fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let Some(mut link) = store.link(&self.container, &self.link.id) else {
            return Ok(());
        };
        if link.template_status != TemplateStatus::Inherited {
            return Ok(());
        }
        link.template_status = TemplateStatus::Undefined;
        store.put_link(&self.container, link)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "inherited link to '{}' of association '{}' no longer exists in the template",
            self.link.target, self.link.association
        )
    }
}

/// One typed, fixable inconsistency between a container and its product type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "delta_type", rename_all = "snake_case")]
pub enum DeltaEntry {
    MissingPropertyValue(MissingPropertyValue),
    ValueWithoutProperty(ValueWithoutProperty),
    PropertyTypeMismatch(PropertyTypeMismatch),
    ValueSetMismatch(ValueSetMismatch),
    ValueHolderMismatch(ValueHolderMismatch),
    MultilingualMismatch(MultilingualMismatch),
    HiddenAttributeMismatch(HiddenAttributeMismatch),
    DatatypeMismatch(DatatypeMismatch),
    LinkWithoutAssociation(LinkWithoutAssociation),
    LinkChangingOverTimeMismatch(LinkChangingOverTimeMismatch),
    MissingTemplateLink(MissingTemplateLink),
    RemovedTemplateLink(RemovedTemplateLink),
}

impl DeltaEntry {
    pub fn delta_type(&self) -> DeltaType {
        match self {
            DeltaEntry::MissingPropertyValue(_) => DeltaType::MissingPropertyValue,
            DeltaEntry::ValueWithoutProperty(_) => DeltaType::ValueWithoutProperty,
            DeltaEntry::PropertyTypeMismatch(_) => DeltaType::PropertyTypeMismatch,
            DeltaEntry::ValueSetMismatch(_) => DeltaType::ValueSetMismatch,
            DeltaEntry::ValueHolderMismatch(_) => DeltaType::ValueHolderMismatch,
            DeltaEntry::MultilingualMismatch(_) => DeltaType::MultilingualMismatch,
            DeltaEntry::HiddenAttributeMismatch(_) => DeltaType::HiddenAttributeMismatch,
            DeltaEntry::DatatypeMismatch(_) => DeltaType::DatatypeMismatch,
            DeltaEntry::LinkWithoutAssociation(_) => DeltaType::LinkWithoutAssociation,
            DeltaEntry::LinkChangingOverTimeMismatch(_) => DeltaType::LinkChangingOverTimeMismatch,
            DeltaEntry::MissingTemplateLink(_) => DeltaType::MissingTemplateLink,
            DeltaEntry::RemovedTemplateLink(_) => DeltaType::RemovedTemplateLink,
        }
    }

    pub fn container(&self) -> &ContainerRef {
        match self {
            DeltaEntry::MissingPropertyValue(e) => &e.container,
            DeltaEntry::ValueWithoutProperty(e) => &e.container,
            DeltaEntry::PropertyTypeMismatch(e) => &e.container,
            DeltaEntry::ValueSetMismatch(e) => &e.container,
            DeltaEntry::ValueHolderMismatch(e) => &e.container,
            DeltaEntry::MultilingualMismatch(e) => &e.container,
            DeltaEntry::HiddenAttributeMismatch(e) => &e.container,
            DeltaEntry::DatatypeMismatch(e) => &e.container,
            DeltaEntry::LinkWithoutAssociation(e) => &e.container,
            DeltaEntry::LinkChangingOverTimeMismatch(e) => &e.container,
            DeltaEntry::MissingTemplateLink(e) => &e.container,
            DeltaEntry::RemovedTemplateLink(e) => &e.container,
        }
    }

    /// Name of the offending property, `None` for link entries
    pub fn property_name(&self) -> Option<&str> {
        match self {
            DeltaEntry::MissingPropertyValue(e) => Some(e.definition.name()),
            DeltaEntry::ValueWithoutProperty(e) => Some(e.value.name()),
            DeltaEntry::PropertyTypeMismatch(e) => Some(e.value.name()),
            DeltaEntry::ValueSetMismatch(e) => Some(&e.definition.name),
            DeltaEntry::ValueHolderMismatch(e) => Some(&e.definition.name),
            DeltaEntry::MultilingualMismatch(e) => Some(&e.definition.name),
            DeltaEntry::HiddenAttributeMismatch(e) => Some(&e.definition.name),
            DeltaEntry::DatatypeMismatch(e) => Some(e.definition.name()),
            DeltaEntry::LinkWithoutAssociation(_)
            | DeltaEntry::LinkChangingOverTimeMismatch(_)
            | DeltaEntry::MissingTemplateLink(_)
            | DeltaEntry::RemovedTemplateLink(_) => None,
        }
    }

    /// The offending link, `None` for property entries
    pub fn link(&self) -> Option<&Link> {
        match self {
            DeltaEntry::LinkWithoutAssociation(e) => Some(&e.link),
            DeltaEntry::LinkChangingOverTimeMismatch(e) => Some(&e.link),
            DeltaEntry::MissingTemplateLink(e) => Some(&e.template_link),
            DeltaEntry::RemovedTemplateLink(e) => Some(&e.link),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            DeltaEntry::MissingPropertyValue(e) => e.description(),
            DeltaEntry::ValueWithoutProperty(e) => e.description(),
            DeltaEntry::PropertyTypeMismatch(e) => e.description(),
            DeltaEntry::ValueSetMismatch(e) => e.description(),
            DeltaEntry::ValueHolderMismatch(e) => e.description(),
            DeltaEntry::MultilingualMismatch(e) => e.description(),
            DeltaEntry::HiddenAttributeMismatch(e) => e.description(),
            DeltaEntry::DatatypeMismatch(e) => e.description(),
            DeltaEntry::LinkWithoutAssociation(e) => e.description(),
            DeltaEntry::LinkChangingOverTimeMismatch(e) => e.description(),
            DeltaEntry::MissingTemplateLink(e) => e.description(),
            DeltaEntry::RemovedTemplateLink(e) => e.description(),
        }
    }

    /// Applies the corrective mutation to the container.
    ///
    /// Safe to call repeatedly: once the inconsistency is gone the fix does nothing.
    pub fn fix<S: InstanceStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        match self {
            DeltaEntry::MissingPropertyValue(e) => e.fix(store),
            DeltaEntry::ValueWithoutProperty(e) => e.fix(store),
            DeltaEntry::PropertyTypeMismatch(e) => e.fix(store),
            DeltaEntry::ValueSetMismatch(e) => e.fix(store),
            DeltaEntry::ValueHolderMismatch(e) => e.fix(store),
            DeltaEntry::MultilingualMismatch(e) => e.fix(store),
            DeltaEntry::HiddenAttributeMismatch(e) => e.fix(store),
            DeltaEntry::DatatypeMismatch(e) => e.fix(store),
            DeltaEntry::LinkWithoutAssociation(e) => e.fix(store),
            DeltaEntry::LinkChangingOverTimeMismatch(e) => e.fix(store),
            DeltaEntry::MissingTemplateLink(e) => e.fix(store),
            DeltaEntry::RemovedTemplateLink(e) => e.fix(store),
        }
    }
}

fn current_attribute<S: InstanceStore + ?Sized>(
    store: &S,
    container: &ContainerRef,
    name: &str,
) -> Option<AttributeValue> {
    match store.value(container, PropertyKind::Attribute, name) {
        Some(PropertyValue::Attribute(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, Formula, FormulaDef, Multiplicity, ProductCmpt, ProductType, Visibility, Workspace};
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn store_with(component: ProductCmpt) -> MemoryStore {
        MemoryStore::new(Workspace::new(vec![ProductType::new("Motor", "Motor")], vec![component]))
    }

    fn attribute(name: &str, holder: ValueHolder) -> AttributeValue {
        AttributeValue {
            name: name.to_string(),
            holder,
            hidden: false,
        }
    }

    #[test]
    fn test_value_holder_fix_is_lossy_and_idempotent() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let value = attribute("deductibles", ValueHolder::multi(["100", "250", "500"]));
        cmpt.values.push(PropertyValue::Attribute(value.clone()));
        let store = store_with(cmpt);

        let entry = DeltaEntry::ValueHolderMismatch(ValueHolderMismatch {
            container: ContainerRef::component("p1"),
            value,
            definition: AttributeDef::new("deductibles", DataType::Integer),
        });
        entry.fix(&store).unwrap();
        entry.fix(&store).unwrap();

        let fixed = store.component("p1").unwrap();
        match &fixed.values[0] {
            PropertyValue::Attribute(v) => assert_eq!(v.holder, ValueHolder::single("100")),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_single_to_multi_keeps_content() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let value = attribute("deductibles", ValueHolder::single("100"));
        cmpt.values.push(PropertyValue::Attribute(value.clone()));
        let store = store_with(cmpt);

        let mut definition = AttributeDef::new("deductibles", DataType::Integer);
        definition.multiplicity = Multiplicity::Multi;
        DeltaEntry::ValueHolderMismatch(ValueHolderMismatch {
            container: ContainerRef::component("p1"),
            value,
            definition,
        })
        .fix(&store)
        .unwrap();

        let fixed = store.component("p1").unwrap();
        match &fixed.values[0] {
            PropertyValue::Attribute(v) => assert_eq!(v.holder, ValueHolder::multi(["100"])),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_datatype_fix_falls_back_to_default() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let value = attribute("age", ValueHolder::single("forty"));
        cmpt.values.push(PropertyValue::Attribute(value.clone()));
        let store = store_with(cmpt);

        let mut definition = AttributeDef::new("age", DataType::Integer);
        definition.default_value = Some("18".to_string());
        let entry = DeltaEntry::DatatypeMismatch(DatatypeMismatch {
            container: ContainerRef::component("p1"),
            definition: definition.clone().into(),
            value: PropertyValue::Attribute(value),
            invalid: vec!["forty".to_string()],
        });
        assert_eq!(entry.description(), "'age' holds text not valid for its datatype: forty");
        entry.fix(&store).unwrap();

        let fixed = store.component("p1").unwrap();
        match &fixed.values[0] {
            PropertyValue::Attribute(v) => assert_eq!(v.holder, ValueHolder::single("18")),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_sanitize_drops_invalid_elements() {
        let definition = AttributeDef::new("limits", DataType::Integer);
        let holder = ValueHolder::multi(["1", "x", "3"]);

        assert_eq!(invalid_texts(&definition, &holder), vec!["x".to_string()]);
        assert_eq!(sanitize_holder(&definition, &holder), ValueHolder::multi(["1", "3"]));
    }

    #[test]
    fn test_removed_template_link_marks_undefined() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let link = Link::new("coverages", "theft").with_status(TemplateStatus::Inherited);
        cmpt.links.push(link.clone());
        let store = store_with(cmpt);

        let entry = DeltaEntry::RemovedTemplateLink(RemovedTemplateLink {
            container: ContainerRef::component("p1"),
            link: link.clone(),
        });
        entry.fix(&store).unwrap();
        entry.fix(&store).unwrap();

        let fixed = store.component("p1").unwrap();
        assert_eq!(fixed.links.len(), 1);
        assert_eq!(fixed.links[0].template_status, TemplateStatus::Undefined);
    }

    #[test]
    fn test_fix_on_vanished_container_is_noop() {
        let store = store_with(ProductCmpt::new("p1", "Motor"));
        let entry = DeltaEntry::MissingTemplateLink(MissingTemplateLink {
            container: ContainerRef::component("gone"),
            template_link: Link::new("coverages", "theft"),
        });

        assert!(entry.fix(&store).is_ok());
        assert!(store.component("p1").unwrap().links.is_empty());
    }

    #[test]
    fn test_entry_serializes_with_tag() {
        let entry = DeltaEntry::ValueWithoutProperty(ValueWithoutProperty {
            container: ContainerRef::component("p1"),
            value: PropertyValue::Formula(crate::model::Formula {
                name: "discount".to_string(),
                expression: None,
            }),
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["delta_type"], "value_without_property");
        assert_eq!(json["value"]["name"], "discount");
        assert_eq!(entry.property_name(), Some("discount"));
        assert!(entry.link().is_none());
    }

    fn bonus_formula(changing_over_time: bool) -> PropertyDef {
        FormulaDef {
            name: "bonus".to_string(),
            datatype: DataType::String,
            changing_over_time,
        }
        .into()
    }

    #[test]
    fn test_type_mismatch_leaves_timed_definition_to_generations() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let value = PropertyValue::Attribute(attribute("bonus", ValueHolder::single("0.9")));
        cmpt.values.push(value.clone());
        let store = store_with(cmpt);

        let entry = DeltaEntry::PropertyTypeMismatch(PropertyTypeMismatch {
            container: ContainerRef::component("p1"),
            definition: bonus_formula(true),
            value,
            default_locale: "en".to_string(),
        });
        entry.fix(&store).unwrap();
        entry.fix(&store).unwrap();

        assert!(store.component("p1").unwrap().values.is_empty());
    }

    #[test]
    fn test_type_mismatch_carries_default_locale_text() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let holder = ValueHolder::Single(ValueContent::International(BTreeMap::from([
            ("de".to_string(), "Haus".to_string()),
            ("en".to_string(), "House".to_string()),
        ])));
        let value = PropertyValue::Attribute(attribute("bonus", holder));
        cmpt.values.push(value.clone());
        let store = store_with(cmpt);

        DeltaEntry::PropertyTypeMismatch(PropertyTypeMismatch {
            container: ContainerRef::component("p1"),
            definition: bonus_formula(false),
            value,
            default_locale: "en".to_string(),
        })
        .fix(&store)
        .unwrap();

        assert_eq!(
            store.component("p1").unwrap().values,
            vec![PropertyValue::Formula(Formula {
                name: "bonus".to_string(),
                expression: Some("House".to_string()),
            })]
        );
    }

    #[test]
    fn test_hidden_fix_follows_visibility() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let value = attribute("internal_code", ValueHolder::single("X1"));
        cmpt.values.push(PropertyValue::Attribute(value.clone()));
        let store = store_with(cmpt);

        let mut definition = AttributeDef::new("internal_code", DataType::String);
        definition.visibility = Visibility::Hidden;
        let entry = DeltaEntry::HiddenAttributeMismatch(HiddenAttributeMismatch {
            container: ContainerRef::component("p1"),
            value,
            definition,
        });
        entry.fix(&store).unwrap();
        entry.fix(&store).unwrap();

        match &store.component("p1").unwrap().values[..] {
            [PropertyValue::Attribute(v)] => {
                assert!(v.hidden);
                assert_eq!(v.holder, ValueHolder::single("X1"));
            }
            other => panic!("unexpected values {:?}", other),
        }
    }

    #[test]
    fn test_stale_value_set_fix_keeps_concurrent_edit() {
        let definition = ConfigElementDef {
            name: "age".to_string(),
            datatype: DataType::Integer,
            default_value: None,
            value_set: ValueSet::range("0", "120"),
            changing_over_time: false,
        };
        let stale = ConfigElement {
            name: "age".to_string(),
            default_value: None,
            value_set: ValueSet::enumeration(["10", "20"]),
        };
        let edited = ConfigElement {
            value_set: ValueSet::range("18", "99"),
            ..stale.clone()
        };
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        cmpt.values.push(PropertyValue::ConfigElement(edited.clone()));
        let store = store_with(cmpt);

        DeltaEntry::ValueSetMismatch(ValueSetMismatch {
            container: ContainerRef::component("p1"),
            definition,
            value: stale,
        })
        .fix(&store)
        .unwrap();

        assert_eq!(store.component("p1").unwrap().values, vec![PropertyValue::ConfigElement(edited)]);
    }

    #[test]
    fn test_stale_missing_value_fix_keeps_concurrent_edit() {
        let mut cmpt = ProductCmpt::new("p1", "Motor");
        let edited = PropertyValue::Attribute(attribute("age", ValueHolder::single("42")));
        cmpt.values.push(edited.clone());
        let store = store_with(cmpt);

        let mut definition = AttributeDef::new("age", DataType::Integer);
        definition.default_value = Some("18".to_string());
        DeltaEntry::MissingPropertyValue(MissingPropertyValue {
            container: ContainerRef::component("p1"),
            definition: definition.into(),
            default_locale: "en".to_string(),
        })
        .fix(&store)
        .unwrap();

        assert_eq!(store.component("p1").unwrap().values, vec![edited]);
    }
}
