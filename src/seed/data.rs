use crate::model::{
    AssociationDef, AttributeDef, AttributeValue, ConfigElement, ConfigElementDef, DataType, Formula, FormulaDef,
    Generation, Link, Localization, Multiplicity, ProductCmpt, ProductType, PropertyDef, PropertyValue,
    TableUsageDef, TemplateStatus, ValidationRuleConfig, ValidationRuleDef, ValueHolder, ValueSet, Visibility, Workspace,
};
use crate::store::MemoryStore;
use chrono::NaiveDate;
use log::info;

pub const DEMO_LOCALE: &str = "en";

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn attribute(name: &str, datatype: DataType) -> AttributeDef {
    AttributeDef::new(name, datatype)
}

fn attribute_value(name: &str, holder: ValueHolder, hidden: bool) -> PropertyValue {
    PropertyValue::Attribute(AttributeValue {
        name: name.to_string(),
        holder,
        hidden,
    })
}

/// Root of the product hierarchy
fn product_type() -> ProductType {
    let mut product = ProductType::new("Product", "Product");
    let mut currency = attribute("currency", DataType::String);
    currency.default_value = Some("EUR".to_string());
    product.properties.push(currency.into());
    product
}

fn motor_product_type() -> ProductType {
    let mut motor = ProductType::new("MotorProduct", "Motor Insurance");
    motor.supertype = Some("Product".to_string());

    let mut premium = attribute("premium", DataType::Decimal);
    premium.default_value = Some("100.0".to_string());
    premium.changing_over_time = true;

    let mut max_age = attribute("max_age", DataType::Integer);
    max_age.default_value = Some("80".to_string());

    let mut deductibles = attribute("deductibles", DataType::Integer);
    deductibles.multiplicity = Multiplicity::Multi;

    let mut marketing_name = attribute("marketing_name", DataType::String);
    marketing_name.localization = Localization::Multilingual;

    let mut internal_code = attribute("internal_code", DataType::String);
    internal_code.visibility = Visibility::Hidden;

    let vehicle_limit = attribute("vehicle_limit", DataType::Integer);

    let driver_age = ConfigElementDef {
        name: "driver_age".to_string(),
        datatype: DataType::Integer,
        default_value: Some("25".to_string()),
        value_set: ValueSet::range("18", "99"),
        changing_over_time: false,
    };
    let rates = TableUsageDef {
        name: "rates".to_string(),
        table_structure: "MotorRateTable".to_string(),
        changing_over_time: true,
    };
    let bonus_factor = FormulaDef {
        name: "bonus_factor".to_string(),
        datatype: DataType::Decimal,
        changing_over_time: false,
    };
    let check_age = ValidationRuleDef {
        name: "check_age".to_string(),
        active_by_default: true,
        changing_over_time: false,
    };

    motor.properties = vec![
        premium.into(),
        max_age.into(),
        deductibles.into(),
        marketing_name.into(),
        internal_code.into(),
        vehicle_limit.into(),
        driver_age.into(),
        rates.into(),
        bonus_factor.into(),
        check_age.into(),
    ];

    motor.associations.push(AssociationDef::new("coverages", "Coverage"));
    let mut bonus_levels = AssociationDef::new("bonus_levels", "BonusLevel");
    bonus_levels.changing_over_time = true;
    bonus_levels.max_cardinality = Some(1);
    motor.associations.push(bonus_levels);

    motor
}

/// A component holding exactly the values and links its type asks for
fn consistent_motor_product(id: &str, definitions: &[PropertyDef]) -> ProductCmpt {
    let mut cmpt = ProductCmpt::new(id, "MotorProduct");
    let mut generation = Generation::new(date(2023, 1, 1));

    for definition in definitions {
        let value = definition.new_value(DEMO_LOCALE);
        if definition.is_changing_over_time() {
            generation.values.push(value);
        } else {
            cmpt.values.push(value);
        }
    }

    cmpt.links.push(Link::new("coverages", "coverage-theft"));
    generation.links.push(Link::new("bonus_levels", "bonus-sf1"));
    cmpt.add_generation(generation);
    cmpt
}

/// A template-based component that drifted from its type in every supported way
fn drifted_motor_product() -> ProductCmpt {
    let mut cmpt = ProductCmpt::new("motor-2024", "MotorProduct");
    cmpt.template = Some("motor-template".to_string());

    cmpt.values = vec![
        attribute_value("currency", ValueHolder::single("EUR"), false),
        // formulas were never declared for this name
        PropertyValue::Formula(Formula {
            name: "discount".to_string(),
            expression: Some("premium * 0.1".to_string()),
        }),
        // declared as formula since
        attribute_value("bonus_factor", ValueHolder::single("0.85"), false),
        PropertyValue::ConfigElement(ConfigElement {
            name: "driver_age".to_string(),
            default_value: Some("30".to_string()),
            value_set: ValueSet::enumeration(["25", "30", "40"]),
        }),
        attribute_value("deductibles", ValueHolder::single("250"), false),
        attribute_value("marketing_name", ValueHolder::single("Motor Comfort"), false),
        attribute_value("internal_code", ValueHolder::single("MC-24"), false),
        attribute_value("vehicle_limit", ValueHolder::single("unlimited"), false),
        PropertyValue::ValidationRule(ValidationRuleConfig {
            name: "check_age".to_string(),
            active: true,
        }),
    ];

    cmpt.links = vec![
        Link::new("assistance", "roadside-assistance"),
        Link::new("bonus_levels", "bonus-sf1"),
        Link::new("coverages", "coverage-fire").with_status(TemplateStatus::Inherited),
        Link::new("coverages", "coverage-glass").with_status(TemplateStatus::Inherited),
    ];

    cmpt.add_generation(Generation::new(date(2024, 1, 1)));
    cmpt
}

fn motor_template() -> ProductCmpt {
    let mut template = ProductCmpt::new("motor-template", "MotorProduct");
    template.is_template = true;
    template.links = vec![
        Link::new("coverages", "coverage-theft"),
        Link::new("coverages", "coverage-glass"),
    ];
    template.add_generation(Generation::new(date(2023, 1, 1)));
    template
}

/// Motor insurance workspace: a consistent product, a template, a product
/// drifted from both, and a component whose type no longer exists
pub fn demo_workspace() -> Workspace {
    let product = product_type();
    let motor = motor_product_type();
    let coverage = ProductType::new("Coverage", "Coverage");
    let bonus_level = ProductType::new("BonusLevel", "Bonus Level");

    let mut definitions: Vec<PropertyDef> = product.properties.clone();
    definitions.extend(motor.properties.iter().cloned());

    let components = vec![
        ProductCmpt::new("coverage-theft", "Coverage"),
        ProductCmpt::new("coverage-fire", "Coverage"),
        ProductCmpt::new("coverage-glass", "Coverage"),
        ProductCmpt::new("bonus-sf1", "BonusLevel"),
        consistent_motor_product("motor-2023", &definitions),
        motor_template(),
        drifted_motor_product(),
        ProductCmpt::new("legacy-home", "HomeProduct"),
    ];

    Workspace::new(vec![product, motor, coverage, bonus_level], components)
}

/// Loads the demo workspace into `store`, replacing components and types with the same ids
pub fn load_seed_data(store: &MemoryStore) {
    let workspace = demo_workspace();
    info!(
        "Loading demo workspace: {} product types, {} components",
        workspace.product_types.len(),
        workspace.components.len()
    );
    for product_type in workspace.product_types {
        store.upsert_product_type(product_type);
    }
    for component in workspace.components {
        store.upsert_component(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{compute_delta, DeltaType};
    use crate::model::ContainerRef;
    use std::collections::HashSet;

    fn all_types(delta: &crate::logic::Delta, out: &mut HashSet<DeltaType>) {
        out.extend(delta.entries().iter().map(|e| e.delta_type()));
        for child in delta.children() {
            all_types(child, out);
        }
    }

    #[test]
    fn test_consistent_product_has_empty_delta() {
        let store = MemoryStore::new(demo_workspace());
        let delta = compute_delta(&store, &ContainerRef::component("motor-2023")).unwrap();
        assert!(delta.is_empty(), "unexpected entries: {:?}", delta);
    }

    #[test]
    fn test_drifted_product_covers_every_delta_type() {
        let store = MemoryStore::new(demo_workspace());
        let delta = compute_delta(&store, &ContainerRef::component("motor-2024")).unwrap();

        let mut seen = HashSet::new();
        all_types(&delta, &mut seen);
        for delta_type in DeltaType::ALL {
            assert!(seen.contains(&delta_type), "{} not exercised", delta_type.as_str());
        }
    }

    #[test]
    fn test_load_seed_data_is_repeatable() {
        let store = MemoryStore::default();
        load_seed_data(&store);
        load_seed_data(&store);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.product_types.len(), 4);
        assert_eq!(snapshot.components.len(), demo_workspace().components.len());
        assert!(snapshot.component("motor-template").is_some_and(|c| c.is_template));
    }
}
