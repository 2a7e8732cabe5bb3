use crate::model::{
    AttributeValue, ConfigElement, DataType, Formula, Id, PropertyValue, TableUsage,
    ValidationRuleConfig, ValueContent, ValueHolder, ValueSet,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed categories of configurable properties a product type can declare.
///
/// Each kind has exactly one matching [`PropertyValue`] variant on the instance side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// Plain product attribute value
    Attribute,
    /// Default value and value set of a configurable attribute
    ConfigElement,
    TableUsage,
    Formula,
    /// Activation toggle of a validation rule
    ValidationRule,
}

impl PropertyKind {
    /// Kind iteration order used by classification and cross-kind lookups
    pub const ALL: [PropertyKind; 5] = [
        PropertyKind::Attribute,
        PropertyKind::ConfigElement,
        PropertyKind::TableUsage,
        PropertyKind::Formula,
        PropertyKind::ValidationRule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Attribute => "attribute",
            PropertyKind::ConfigElement => "config_element",
            PropertyKind::TableUsage => "table_usage",
            PropertyKind::Formula => "formula",
            PropertyKind::ValidationRule => "validation_rule",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    #[default]
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Localization {
    #[default]
    Plain,
    Multilingual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Product attribute whose value is set directly on the product component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub datatype: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    #[serde(default)]
    pub localization: Localization,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub changing_over_time: bool,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            default_value: None,
            multiplicity: Multiplicity::Single,
            localization: Localization::Plain,
            visibility: Visibility::Visible,
            changing_over_time: false,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }

    /// Fresh value holder shaped after this definition and seeded from its default
    pub fn default_holder(&self, default_locale: &str) -> ValueHolder {
        let content = ValueContent::from_raw(self.default_value.clone(), self.localization, default_locale);
        match self.multiplicity {
            Multiplicity::Single => ValueHolder::Single(content),
            Multiplicity::Multi if content.is_empty() => ValueHolder::Multi(Vec::new()),
            Multiplicity::Multi => ValueHolder::Multi(vec![content]),
        }
    }
}

/// Configurable (policy) attribute: the product component configures the
/// default value and narrows the value set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigElementDef {
    pub name: String,
    pub datatype: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub value_set: ValueSet,
    #[serde(default)]
    pub changing_over_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableUsageDef {
    /// Role name of the table structure usage
    pub name: String,
    pub table_structure: String,
    #[serde(default)]
    pub changing_over_time: bool,
}

/// Formula signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDef {
    pub name: String,
    pub datatype: DataType,
    #[serde(default)]
    pub changing_over_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRuleDef {
    pub name: String,
    #[serde(default = "default_true")]
    pub active_by_default: bool,
    #[serde(default)]
    pub changing_over_time: bool,
}

fn default_true() -> bool {
    true
}

/// Property declared by a product type, one variant per [`PropertyKind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyDef {
    Attribute(AttributeDef),
    ConfigElement(ConfigElementDef),
    TableUsage(TableUsageDef),
    Formula(FormulaDef),
    ValidationRule(ValidationRuleDef),
}

impl PropertyDef {
    pub fn name(&self) -> &str {
        match self {
            PropertyDef::Attribute(def) => &def.name,
            PropertyDef::ConfigElement(def) => &def.name,
            PropertyDef::TableUsage(def) => &def.name,
            PropertyDef::Formula(def) => &def.name,
            PropertyDef::ValidationRule(def) => &def.name,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyDef::Attribute(_) => PropertyKind::Attribute,
            PropertyDef::ConfigElement(_) => PropertyKind::ConfigElement,
            PropertyDef::TableUsage(_) => PropertyKind::TableUsage,
            PropertyDef::Formula(_) => PropertyKind::Formula,
            PropertyDef::ValidationRule(_) => PropertyKind::ValidationRule,
        }
    }

    pub fn is_changing_over_time(&self) -> bool {
        match self {
            PropertyDef::Attribute(def) => def.changing_over_time,
            PropertyDef::ConfigElement(def) => def.changing_over_time,
            PropertyDef::TableUsage(def) => def.changing_over_time,
            PropertyDef::Formula(def) => def.changing_over_time,
            PropertyDef::ValidationRule(def) => def.changing_over_time,
        }
    }

    /// Whether raw stored content of another property can be carried over into
    /// a value of this definition
    pub fn accepts(&self, raw: &str) -> bool {
        match self {
            PropertyDef::Attribute(def) => def.datatype.accepts(raw),
            PropertyDef::ConfigElement(def) => def.datatype.accepts(raw),
            PropertyDef::TableUsage(_) | PropertyDef::Formula(_) => true,
            PropertyDef::ValidationRule(_) => DataType::Boolean.accepts(raw),
        }
    }

    /// Creates a new property value of this definition's kind, seeded from the
    /// definition's default where there is one
    pub fn new_value(&self, default_locale: &str) -> PropertyValue {
        match self {
            PropertyDef::Attribute(def) => PropertyValue::Attribute(AttributeValue {
                name: def.name.clone(),
                holder: def.default_holder(default_locale),
                hidden: def.is_hidden(),
            }),
            PropertyDef::ConfigElement(def) => PropertyValue::ConfigElement(ConfigElement {
                name: def.name.clone(),
                default_value: def.default_value.clone(),
                value_set: def.value_set.clone(),
            }),
            PropertyDef::TableUsage(def) => PropertyValue::TableUsage(TableUsage {
                name: def.name.clone(),
                table_content: None,
            }),
            PropertyDef::Formula(def) => PropertyValue::Formula(Formula {
                name: def.name.clone(),
                expression: None,
            }),
            PropertyDef::ValidationRule(def) => PropertyValue::ValidationRule(ValidationRuleConfig {
                name: def.name.clone(),
                active: def.active_by_default,
            }),
        }
    }

    /// Like [`PropertyDef::new_value`], but carries `raw` over when this
    /// definition accepts it
    pub fn new_value_with_content(&self, raw: Option<&str>, default_locale: &str) -> PropertyValue {
        let mut value = self.new_value(default_locale);
        if let Some(raw) = raw.filter(|r| self.accepts(r)) {
            value.set_raw_content(raw, default_locale);
        }
        value
    }
}

impl From<AttributeDef> for PropertyDef {
    fn from(def: AttributeDef) -> Self {
        PropertyDef::Attribute(def)
    }
}

impl From<ConfigElementDef> for PropertyDef {
    fn from(def: ConfigElementDef) -> Self {
        PropertyDef::ConfigElement(def)
    }
}

impl From<TableUsageDef> for PropertyDef {
    fn from(def: TableUsageDef) -> Self {
        PropertyDef::TableUsage(def)
    }
}

impl From<FormulaDef> for PropertyDef {
    fn from(def: FormulaDef) -> Self {
        PropertyDef::Formula(def)
    }
}

impl From<ValidationRuleDef> for PropertyDef {
    fn from(def: ValidationRuleDef) -> Self {
        PropertyDef::ValidationRule(def)
    }
}

/// Association declared by a product type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDef {
    /// Target role name; links refer to the association by this name
    pub name: String,
    /// Id of the target product type
    pub target: Id,
    #[serde(default)]
    pub min_cardinality: u32,
    /// `None` means unbounded (`*`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cardinality: Option<u32>,
    #[serde(default)]
    pub changing_over_time: bool,
    #[serde(default)]
    pub derived_union: bool,
    #[serde(default)]
    pub qualified: bool,
}

impl AssociationDef {
    pub fn new(name: impl Into<String>, target: impl Into<Id>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            min_cardinality: 0,
            max_cardinality: None,
            changing_over_time: false,
            derived_union: false,
            qualified: false,
        }
    }
}

/// Schema-like definition of a product's configurable properties and associations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: Id,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supertype: Option<Id>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

impl ProductType {
    pub fn new(id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supertype: None,
            properties: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Properties declared directly on this type (supertypes excluded)
    pub fn own_properties(&self, kind: PropertyKind) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(move |p| p.kind() == kind)
    }

    pub fn own_association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }
}
