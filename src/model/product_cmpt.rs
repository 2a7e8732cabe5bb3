use crate::model::{generate_id, Cardinality, Id, Localization, Multiplicity, PropertyKind, ValueSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stored content of a single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueContent {
    Plain(Option<String>),
    /// Text per locale
    International(BTreeMap<String, String>),
}

impl ValueContent {
    pub fn plain(text: impl Into<String>) -> Self {
        ValueContent::Plain(Some(text.into()))
    }

    pub fn from_raw(raw: Option<String>, localization: Localization, default_locale: &str) -> Self {
        match localization {
            Localization::Plain => ValueContent::Plain(raw),
            Localization::Multilingual => ValueContent::International(
                raw.map(|text| BTreeMap::from([(default_locale.to_string(), text)]))
                    .unwrap_or_default(),
            ),
        }
    }

    pub fn localization(&self) -> Localization {
        match self {
            ValueContent::Plain(_) => Localization::Plain,
            ValueContent::International(_) => Localization::Multilingual,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ValueContent::Plain(text) => text.is_none(),
            ValueContent::International(texts) => texts.is_empty(),
        }
    }

    pub fn plain_text(&self) -> Option<&str> {
        match self {
            ValueContent::Plain(text) => text.as_deref(),
            ValueContent::International(_) => None,
        }
    }

    /// Raw text; the default locale wins for localized content, else the first locale
    pub fn text(&self, default_locale: &str) -> Option<&str> {
        match self {
            ValueContent::Plain(text) => text.as_deref(),
            ValueContent::International(texts) => texts
                .get(default_locale)
                .or_else(|| texts.values().next())
                .map(String::as_str),
        }
    }

    /// Converts between plain and localized content. Plain text becomes the
    /// default-locale entry; localized content keeps only its default-locale
    /// (or first) text.
    pub fn to_localization(&self, target: Localization, default_locale: &str) -> ValueContent {
        if self.localization() == target {
            return self.clone();
        }
        let text = self.text(default_locale).map(str::to_string);
        ValueContent::from_raw(text, target, default_locale)
    }
}

/// Single- or multi-valued holder of an attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueHolder {
    Single(ValueContent),
    Multi(Vec<ValueContent>),
}

impl ValueHolder {
    pub fn single(text: impl Into<String>) -> Self {
        ValueHolder::Single(ValueContent::plain(text))
    }

    pub fn multi<I, T>(texts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ValueHolder::Multi(texts.into_iter().map(ValueContent::plain).collect())
    }

    pub fn multiplicity(&self) -> Multiplicity {
        match self {
            ValueHolder::Single(_) => Multiplicity::Single,
            ValueHolder::Multi(_) => Multiplicity::Multi,
        }
    }

    /// Localization of the held content; `None` for an empty multi value
    pub fn localization(&self) -> Option<Localization> {
        self.contents().first().map(|c| c.localization())
    }

    /// Whether every held content has the given localization (vacuously true
    /// for an empty multi value)
    pub fn matches_localization(&self, localization: Localization) -> bool {
        self.contents().iter().all(|c| c.localization() == localization)
    }

    pub fn contents(&self) -> Vec<&ValueContent> {
        match self {
            ValueHolder::Single(content) => vec![content],
            ValueHolder::Multi(contents) => contents.iter().collect(),
        }
    }

    /// Converts between single and multi holders. Single to multi keeps the
    /// content as first element; multi to single keeps only the first element
    /// and drops the rest.
    pub fn to_multiplicity(&self, target: Multiplicity, localization: Localization) -> ValueHolder {
        match (self, target) {
            (ValueHolder::Single(_), Multiplicity::Single) | (ValueHolder::Multi(_), Multiplicity::Multi) => {
                self.clone()
            }
            (ValueHolder::Single(content), Multiplicity::Multi) if content.is_empty() => {
                ValueHolder::Multi(Vec::new())
            }
            (ValueHolder::Single(content), Multiplicity::Multi) => ValueHolder::Multi(vec![content.clone()]),
            (ValueHolder::Multi(contents), Multiplicity::Single) => ValueHolder::Single(
                contents
                    .first()
                    .cloned()
                    .unwrap_or_else(|| ValueContent::from_raw(None, localization, "")),
            ),
        }
    }

    pub fn to_localization(&self, target: Localization, default_locale: &str) -> ValueHolder {
        match self {
            ValueHolder::Single(content) => ValueHolder::Single(content.to_localization(target, default_locale)),
            ValueHolder::Multi(contents) => ValueHolder::Multi(
                contents
                    .iter()
                    .map(|c| c.to_localization(target, default_locale))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub name: String,
    pub holder: ValueHolder,
    /// Bookkeeping flag mirroring the attribute's hidden visibility
    #[serde(default)]
    pub hidden: bool,
}

/// Configured default value and value set of a configurable attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigElement {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub value_set: ValueSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableUsage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRuleConfig {
    pub name: String,
    pub active: bool,
}

/// Configured value of a property, one variant per [`PropertyKind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyValue {
    Attribute(AttributeValue),
    ConfigElement(ConfigElement),
    TableUsage(TableUsage),
    Formula(Formula),
    ValidationRule(ValidationRuleConfig),
}

impl PropertyValue {
    pub fn name(&self) -> &str {
        match self {
            PropertyValue::Attribute(v) => &v.name,
            PropertyValue::ConfigElement(v) => &v.name,
            PropertyValue::TableUsage(v) => &v.name,
            PropertyValue::Formula(v) => &v.name,
            PropertyValue::ValidationRule(v) => &v.name,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Attribute(_) => PropertyKind::Attribute,
            PropertyValue::ConfigElement(_) => PropertyKind::ConfigElement,
            PropertyValue::TableUsage(_) => PropertyKind::TableUsage,
            PropertyValue::Formula(_) => PropertyKind::Formula,
            PropertyValue::ValidationRule(_) => PropertyKind::ValidationRule,
        }
    }

    /// Raw stored content, independent of the value's kind. Localized
    /// attribute content yields its `default_locale` text.
    pub fn raw_content(&self, default_locale: &str) -> Option<String> {
        match self {
            PropertyValue::Attribute(v) => v
                .holder
                .contents()
                .first()
                .and_then(|c| c.text(default_locale))
                .map(str::to_string),
            PropertyValue::ConfigElement(v) => v.default_value.clone(),
            PropertyValue::TableUsage(v) => v.table_content.clone(),
            PropertyValue::Formula(v) => v.expression.clone(),
            PropertyValue::ValidationRule(v) => Some(v.active.to_string()),
        }
    }

    /// Overwrites the raw stored content, keeping the value's shape
    pub fn set_raw_content(&mut self, raw: &str, default_locale: &str) {
        match self {
            PropertyValue::Attribute(v) => {
                let localization = v.holder.localization().unwrap_or_default();
                let content = ValueContent::from_raw(Some(raw.to_string()), localization, default_locale);
                v.holder = match v.holder.multiplicity() {
                    Multiplicity::Single => ValueHolder::Single(content),
                    Multiplicity::Multi => ValueHolder::Multi(vec![content]),
                };
            }
            PropertyValue::ConfigElement(v) => v.default_value = Some(raw.to_string()),
            PropertyValue::TableUsage(v) => v.table_content = Some(raw.to_string()),
            PropertyValue::Formula(v) => v.expression = Some(raw.to_string()),
            PropertyValue::ValidationRule(v) => {
                if let Ok(active) = raw.trim().parse::<bool>() {
                    v.active = active;
                }
            }
        }
    }
}

/// Inheritance status of a link with respect to the component's template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    /// Defined by the component itself
    #[default]
    Defined,
    /// Taken over from the template
    Inherited,
    /// Explicitly excluded from the template's default
    Undefined,
}

/// Instance of an association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: Id,
    /// Name of the association this link instantiates
    pub association: String,
    /// Id of the target product component
    pub target: Id,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub template_status: TemplateStatus,
}

impl Link {
    pub fn new(association: impl Into<String>, target: impl Into<Id>) -> Self {
        Self {
            id: generate_id(),
            association: association.into(),
            target: target.into(),
            cardinality: Cardinality::default(),
            template_status: TemplateStatus::Defined,
        }
    }

    pub fn with_status(mut self, status: TemplateStatus) -> Self {
        self.template_status = status;
        self
    }

    /// A fresh link mirroring `template_link`, marked as inherited
    pub fn inherited_from(template_link: &Link) -> Self {
        Self {
            id: generate_id(),
            association: template_link.association.clone(),
            target: template_link.target.clone(),
            cardinality: template_link.cardinality.clone(),
            template_status: TemplateStatus::Inherited,
        }
    }

    /// Links match by (association, target), not by identity
    pub fn same_target(&self, other: &Link) -> bool {
        self.association == other.association && self.target == other.target
    }
}

/// Common access to the property values and links held by a component or a generation
pub trait PropertyValueContainer {
    fn values(&self) -> &[PropertyValue];
    fn values_mut(&mut self) -> &mut Vec<PropertyValue>;
    fn links(&self) -> &[Link];
    fn links_mut(&mut self) -> &mut Vec<Link>;

    fn find_value(&self, kind: PropertyKind, name: &str) -> Option<&PropertyValue> {
        self.values().iter().find(|v| v.kind() == kind && v.name() == name)
    }

    /// Inserts `value`, replacing a value of the same kind and name
    fn put_value(&mut self, value: PropertyValue) {
        let values = self.values_mut();
        match values
            .iter_mut()
            .find(|v| v.kind() == value.kind() && v.name() == value.name())
        {
            Some(existing) => *existing = value,
            None => values.push(value),
        }
    }

    fn remove_value(&mut self, kind: PropertyKind, name: &str) -> bool {
        let values = self.values_mut();
        let before = values.len();
        values.retain(|v| !(v.kind() == kind && v.name() == name));
        values.len() != before
    }

    fn find_link(&self, link_id: &str) -> Option<&Link> {
        self.links().iter().find(|l| l.id == link_id)
    }

    /// Inserts `link`, replacing a link with the same id
    fn put_link(&mut self, link: Link) {
        let links = self.links_mut();
        match links.iter_mut().find(|l| l.id == link.id) {
            Some(existing) => *existing = link,
            None => links.push(link),
        }
    }

    fn remove_link(&mut self, link_id: &str) -> bool {
        let links = self.links_mut();
        let before = links.len();
        links.retain(|l| l.id != link_id);
        links.len() != before
    }
}

/// Time-bounded generation of a product component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub values: Vec<PropertyValue>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Generation {
    pub fn new(valid_from: NaiveDate) -> Self {
        Self {
            valid_from,
            values: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl PropertyValueContainer for Generation {
    fn values(&self) -> &[PropertyValue] {
        &self.values
    }
    fn values_mut(&mut self) -> &mut Vec<PropertyValue> {
        &mut self.values
    }
    fn links(&self) -> &[Link] {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }
}

/// Configured product instance: the timeless root plus its generations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCmpt {
    pub id: Id,
    /// Id of the product type this component instantiates
    pub product_type: Id,
    /// Id of the template component this component inherits from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Id>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub values: Vec<PropertyValue>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Kept in chronological order
    #[serde(default)]
    pub generations: Vec<Generation>,
}

impl ProductCmpt {
    pub fn new(id: impl Into<Id>, product_type: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            product_type: product_type.into(),
            template: None,
            is_template: false,
            values: Vec::new(),
            links: Vec::new(),
            generations: Vec::new(),
        }
    }

    pub fn uses_template(&self) -> bool {
        self.template.is_some()
    }

    /// Adds a generation, keeping generations ordered by `valid_from`
    pub fn add_generation(&mut self, generation: Generation) {
        let pos = self
            .generations
            .partition_point(|g| g.valid_from < generation.valid_from);
        self.generations.insert(pos, generation);
    }

    /// Restores chronological order after generations were set directly
    pub fn sort_generations(&mut self) {
        self.generations.sort_by_key(|g| g.valid_from);
    }

    pub fn generation(&self, valid_from: NaiveDate) -> Option<&Generation> {
        self.generations.iter().find(|g| g.valid_from == valid_from)
    }

    pub fn generation_mut(&mut self, valid_from: NaiveDate) -> Option<&mut Generation> {
        self.generations.iter_mut().find(|g| g.valid_from == valid_from)
    }

    pub fn latest_generation(&self) -> Option<&Generation> {
        self.generations.last()
    }

    /// Generation in effect on `date`: the latest one starting on or before it
    pub fn generation_effective_on(&self, date: NaiveDate) -> Option<&Generation> {
        self.generations.iter().rev().find(|g| g.valid_from <= date)
    }

    pub fn container(&self, container: &ContainerRef) -> Option<&dyn PropertyValueContainer> {
        match container {
            ContainerRef::Component { .. } => Some(self as &dyn PropertyValueContainer),
            ContainerRef::Generation { valid_from, .. } => self
                .generation(*valid_from)
                .map(|g| g as &dyn PropertyValueContainer),
        }
    }

    pub fn container_mut(&mut self, container: &ContainerRef) -> Option<&mut dyn PropertyValueContainer> {
        match container {
            ContainerRef::Component { .. } => Some(self as &mut dyn PropertyValueContainer),
            ContainerRef::Generation { valid_from, .. } => self
                .generation_mut(*valid_from)
                .map(|g| g as &mut dyn PropertyValueContainer),
        }
    }
}

impl PropertyValueContainer for ProductCmpt {
    fn values(&self) -> &[PropertyValue] {
        &self.values
    }
    fn values_mut(&mut self) -> &mut Vec<PropertyValue> {
        &mut self.values
    }
    fn links(&self) -> &[Link] {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }
}

/// Non-owning handle of a property value container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "container", rename_all = "snake_case")]
pub enum ContainerRef {
    /// Timeless root of a product component
    Component { id: Id },
    /// One time-bounded generation of a product component
    Generation { component_id: Id, valid_from: NaiveDate },
}

impl ContainerRef {
    pub fn component(id: impl Into<Id>) -> Self {
        ContainerRef::Component { id: id.into() }
    }

    pub fn generation(component_id: impl Into<Id>, valid_from: NaiveDate) -> Self {
        ContainerRef::Generation {
            component_id: component_id.into(),
            valid_from,
        }
    }

    pub fn component_id(&self) -> &Id {
        match self {
            ContainerRef::Component { id } => id,
            ContainerRef::Generation { component_id, .. } => component_id,
        }
    }

    pub fn valid_from(&self) -> Option<NaiveDate> {
        match self {
            ContainerRef::Component { .. } => None,
            ContainerRef::Generation { valid_from, .. } => Some(*valid_from),
        }
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, ContainerRef::Generation { .. })
    }

    /// The root owns timeless properties, generations own the ones changing over time
    pub fn is_responsible_for(&self, changing_over_time: bool) -> bool {
        self.is_generation() == changing_over_time
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerRef::Component { id } => write!(f, "component '{}'", id),
            ContainerRef::Generation { component_id, valid_from } => {
                write!(f, "generation {} of component '{}'", valid_from, component_id)
            }
        }
    }
}
