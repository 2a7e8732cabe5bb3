use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Datatype of an attribute as declared by the product type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    String,
    Integer,
    Decimal,
    Boolean,
    /// ISO calendar date (`YYYY-MM-DD`)
    Date,
}

impl DataType {
    /// Whether the stored text is a valid value of this datatype
    pub fn accepts(&self, raw: &str) -> bool {
        match self {
            DataType::String => true,
            DataType::Integer => raw.trim().parse::<i64>().is_ok(),
            DataType::Decimal => raw.trim().parse::<f64>().is_ok(),
            DataType::Boolean => matches!(raw.trim(), "true" | "false"),
            DataType::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok(),
        }
    }

    /// Like [`DataType::accepts`], treating an absent value as valid
    pub fn accepts_opt(&self, raw: Option<&str>) -> bool {
        raw.map_or(true, |r| self.accepts(r))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSetType {
    Unrestricted,
    Range,
    Enum,
}

/// Set of values allowed for an attribute, either declared by the type or
/// configured (narrowed) by a product component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueSet {
    Unrestricted,
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        lower: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upper: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<String>,
    },
    Enum {
        values: Vec<String>,
    },
}

impl Default for ValueSet {
    fn default() -> Self {
        ValueSet::Unrestricted
    }
}

impl ValueSet {
    pub fn range(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        ValueSet::Range {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
            step: None,
        }
    }

    pub fn enumeration<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ValueSet::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn value_set_type(&self) -> ValueSetType {
        match self {
            ValueSet::Unrestricted => ValueSetType::Unrestricted,
            ValueSet::Range { .. } => ValueSetType::Range,
            ValueSet::Enum { .. } => ValueSetType::Enum,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, ValueSet::Unrestricted)
    }

    pub fn is_same_type(&self, other: &ValueSet) -> bool {
        self.value_set_type() == other.value_set_type()
    }

    /// Whether `configured` is an acceptable narrowing of this (model) value set.
    ///
    /// An unrestricted configured set narrows nothing and is always compatible.
    pub fn is_compatible_configuration(&self, configured: &ValueSet) -> bool {
        self.is_unrestricted() || configured.is_unrestricted() || self.is_same_type(configured)
    }
}

/// Cardinality configured on a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    /// `None` means unbounded (`*`)
    pub max: Option<u32>,
    pub default: u32,
}

impl Cardinality {
    pub fn new(min: u32, max: Option<u32>, default: u32) -> Self {
        Self { min, max, default }
    }

    pub fn optional() -> Self {
        Self::new(0, Some(1), 0)
    }

    pub fn mandatory() -> Self {
        Self::new(1, Some(1), 1)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::optional()
    }
}
