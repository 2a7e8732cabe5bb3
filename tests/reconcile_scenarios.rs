use chrono::NaiveDate;
use product_delta::{
    compute_delta, demo_workspace, reconcile_all, AssociationDef, AttributeDef, AttributeValue, ConfigElement, ConfigElementDef,
    ContainerRef, DataType, Delta, DeltaComputer, DeltaType, Formula, FormulaDef, Generation, Link, MemoryStore,
    ProductCmpt, ProductType, PropertyKind, PropertyValue, TemplateStatus, ValueHolder, ValueSet, Workspace,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn root(id: &str) -> ContainerRef {
    ContainerRef::component(id)
}

fn all_entries(delta: &Delta) -> Vec<DeltaType> {
    let mut types: Vec<_> = delta.entries().iter().map(|e| e.delta_type()).collect();
    for child in delta.children() {
        types.extend(all_entries(child));
    }
    types
}

fn premium_type() -> ProductType {
    let mut motor = ProductType::new("Motor", "Motor");
    let mut premium = AttributeDef::new("premium", DataType::Decimal);
    premium.default_value = Some("100.0".to_string());
    motor.properties.push(premium.into());
    motor
}

#[test]
fn test_missing_property_gets_default() {
    let store = MemoryStore::new(Workspace::new(vec![premium_type()], vec![ProductCmpt::new("p1", "Motor")]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    let missing = delta.entries_of_type(DeltaType::MissingPropertyValue);
    assert_eq!(delta.entries().len(), 1);
    assert_eq!(missing[0].property_name(), Some("premium"));

    delta.fix(&store).unwrap();
    let value = store
        .component("p1")
        .and_then(|c| c.values.into_iter().find(|v| v.name() == "premium"))
        .unwrap();
    assert_eq!(value.raw_content("en"), Some("100.0".to_string()));
}

#[test]
fn test_orphaned_value_is_removed() {
    let mut cmpt = ProductCmpt::new("p1", "Motor");
    cmpt.values.push(PropertyValue::Formula(Formula {
        name: "discount".to_string(),
        expression: Some("0.1".to_string()),
    }));
    cmpt.values.push(PropertyValue::Attribute(AttributeValue {
        name: "premium".to_string(),
        holder: ValueHolder::single("120.0"),
        hidden: false,
    }));
    let store = MemoryStore::new(Workspace::new(vec![premium_type()], vec![cmpt]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    assert_eq!(all_entries(&delta), vec![DeltaType::ValueWithoutProperty]);

    delta.fix(&store).unwrap();
    let names: Vec<_> = store
        .component("p1")
        .map(|c| c.values.iter().map(|v| v.name().to_string()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["premium".to_string()]);
}

#[test]
fn test_value_set_narrowing_becomes_unrestricted() {
    let mut motor = ProductType::new("Motor", "Motor");
    motor.properties.push(
        ConfigElementDef {
            name: "age".to_string(),
            datatype: DataType::Integer,
            default_value: None,
            value_set: ValueSet::range("0", "120"),
            changing_over_time: false,
        }
        .into(),
    );
    let mut cmpt = ProductCmpt::new("p1", "Motor");
    cmpt.values.push(PropertyValue::ConfigElement(ConfigElement {
        name: "age".to_string(),
        default_value: None,
        value_set: ValueSet::enumeration(["10", "20", "30"]),
    }));
    let store = MemoryStore::new(Workspace::new(vec![motor], vec![cmpt]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    assert_eq!(all_entries(&delta), vec![DeltaType::ValueSetMismatch]);

    delta.fix(&store).unwrap();
    let cmpt = store.component("p1").unwrap();
    match value_set_of(&cmpt, "age") {
        Some(value_set) => assert!(value_set.is_unrestricted()),
        None => panic!("age is gone"),
    }
    assert!(compute_delta(&store, &root("p1")).unwrap().is_empty());
}

fn value_set_of(cmpt: &ProductCmpt, name: &str) -> Option<ValueSet> {
    cmpt.values.iter().find_map(|v| match v {
        PropertyValue::ConfigElement(e) if e.name == name => Some(e.value_set.clone()),
        _ => None,
    })
}

#[test]
fn test_missing_template_link_is_inherited() {
    let mut template = ProductCmpt::new("T", "Motor");
    template.is_template = true;
    template.links.push(Link::new("coverages", "X"));
    let mut cmpt = ProductCmpt::new("p1", "Motor");
    cmpt.template = Some("T".to_string());

    let mut motor = premium_type();
    motor.properties.clear();
    motor.associations.push(AssociationDef::new("coverages", "Coverage"));
    let store = MemoryStore::new(Workspace::new(vec![motor], vec![template, cmpt]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    assert_eq!(all_entries(&delta), vec![DeltaType::MissingTemplateLink]);

    delta.fix(&store).unwrap();
    let links = store.component("p1").unwrap().links;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target, "X");
    assert_eq!(links[0].template_status, TemplateStatus::Inherited);
    assert!(compute_delta(&store, &root("p1")).unwrap().is_empty());
}

#[test]
fn test_template_links_outside_partition_converge() {
    let mut motor = ProductType::new("Motor", "Motor");
    motor.associations.push(AssociationDef::new("coverages", "Coverage"));
    let mut bonus = AssociationDef::new("bonus_levels", "BonusLevel");
    bonus.changing_over_time = true;
    motor.associations.push(bonus);

    let mut template = ProductCmpt::new("T", "Motor");
    template.is_template = true;
    template.links.push(Link::new("coverages", "X"));
    template.links.push(Link::new("bonus_levels", "sf1"));
    template.links.push(Link::new("assistance", "roadside"));
    template.add_generation(Generation::new(date(2023, 1, 1)));
    let mut cmpt = ProductCmpt::new("p1", "Motor");
    cmpt.template = Some("T".to_string());
    cmpt.add_generation(Generation::new(date(2024, 1, 1)));
    let store = MemoryStore::new(Workspace::new(vec![motor], vec![template, cmpt]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    assert_eq!(all_entries(&delta), vec![DeltaType::MissingTemplateLink]);

    delta.fix(&store).unwrap();
    assert!(compute_delta(&store, &root("p1")).unwrap().is_empty());
    let links = store.component("p1").unwrap().links;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].association, "coverages");
}

#[test]
fn test_type_mismatch_reported_once_and_converted() {
    let mut motor = ProductType::new("Motor", "Motor");
    motor.properties.push(
        FormulaDef {
            name: "bonus".to_string(),
            datatype: DataType::Decimal,
            changing_over_time: false,
        }
        .into(),
    );
    let mut cmpt = ProductCmpt::new("p1", "Motor");
    cmpt.values.push(PropertyValue::Attribute(AttributeValue {
        name: "bonus".to_string(),
        holder: ValueHolder::single("0.9"),
        hidden: false,
    }));
    let store = MemoryStore::new(Workspace::new(vec![motor], vec![cmpt]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    let entries = all_entries(&delta);
    assert_eq!(entries, vec![DeltaType::PropertyTypeMismatch]);

    delta.fix(&store).unwrap();
    let cmpt = store.component("p1").unwrap();
    assert_eq!(cmpt.values.len(), 1);
    assert_eq!(cmpt.values[0].kind(), PropertyKind::Formula);
    assert_eq!(cmpt.values[0].raw_content("en"), Some("0.9".to_string()));
}

#[test]
fn test_link_moves_to_latest_generation() {
    let mut motor = ProductType::new("Motor", "Motor");
    let mut bonus = AssociationDef::new("bonus_levels", "BonusLevel");
    bonus.changing_over_time = true;
    motor.associations.push(bonus);

    let mut cmpt = ProductCmpt::new("p1", "Motor");
    cmpt.links.push(Link::new("bonus_levels", "sf1"));
    cmpt.add_generation(Generation::new(date(2023, 1, 1)));
    cmpt.add_generation(Generation::new(date(2024, 1, 1)));
    let store = MemoryStore::new(Workspace::new(vec![motor], vec![cmpt]));

    let delta = compute_delta(&store, &root("p1")).unwrap();
    assert_eq!(all_entries(&delta), vec![DeltaType::LinkChangingOverTimeMismatch]);

    delta.fix(&store).unwrap();
    delta.fix(&store).unwrap();
    let cmpt = store.component("p1").unwrap();
    assert!(cmpt.links.is_empty());
    assert!(cmpt.generations[0].links.is_empty());
    assert_eq!(cmpt.generations[1].links.len(), 1);
    assert!(compute_delta(&store, &root("p1")).unwrap().is_empty());
}

#[test]
fn test_demo_workspace_converges_idempotently() {
    let store = MemoryStore::new(demo_workspace());
    let container = root("motor-2024");

    let first = compute_delta(&store, &container).unwrap();
    assert!(!first.is_empty());
    first.fix(&store).unwrap();
    let after_first = store.snapshot();

    let second = compute_delta(&store, &container).unwrap();
    assert!(second.is_empty(), "not converged: {:?}", all_entries(&second));

    // a stale delta degrades to no-ops
    first.fix(&store).unwrap();
    second.fix(&store).unwrap();
    assert_eq!(store.snapshot(), after_first);
}

#[test]
fn test_emptiness_matches_tree() {
    let store = MemoryStore::new(demo_workspace());
    for id in ["motor-2023", "motor-2024", "motor-template"] {
        let delta = compute_delta(&store, &root(id)).unwrap();
        let own_and_children_empty =
            delta.entries().is_empty() && delta.children().iter().all(|c| all_entries(c).is_empty());
        assert_eq!(delta.is_empty(), own_and_children_empty, "{}", id);
        assert_eq!(delta.entry_count(), all_entries(&delta).len());
    }
}

#[test]
fn test_reconcile_whole_workspace() {
    let store = MemoryStore::new(demo_workspace());
    let computer = DeltaComputer::default();

    let summaries = reconcile_all(&computer, &store).unwrap();
    assert!(summaries.iter().all(|s| s.component != "legacy-home"));
    assert!(summaries
        .iter()
        .any(|s| s.component == "motor-2024" && s.fixed_entries > 0));

    let again = reconcile_all(&computer, &store).unwrap();
    assert!(again.iter().all(|s| s.fixed_entries == 0));
}
