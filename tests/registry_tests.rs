//! Registry behaviour tests
//!
//! Exercises the registry the way the type-management service and the
//! entity read/write paths use it.

use std::sync::Arc;
use std::thread;

use serde_json::json;
use type_registry::fqn::{self, CustomPropertyFqn};
use type_registry::{CustomProperty, RegistryError, Type, TypeCategory, TypeRegistry};

fn load_fixture(registry: &TypeRegistry) {
    let types: Vec<Type> =
        serde_json::from_str(include_str!("fixtures/catalog_types.json")).unwrap();
    for ty in types {
        registry.validate_and_add_type(ty).unwrap();
    }
}

fn table_with(property: &str, property_type: &str) -> Type {
    Type::entity("table").with_custom_property(CustomProperty::new(property, property_type))
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_schema_for_registered_property() {
    let registry = TypeRegistry::new();
    registry
        .add_type(Type::property_type("string", json!({"type": "string"})))
        .unwrap();
    registry.add_type(table_with("owner", "string")).unwrap();

    let schema = registry.get_schema("table", "owner").unwrap();
    assert_eq!(schema.source(), &json!({"type": "string"}));
}

#[test]
fn test_validation_names_missing_type_and_property() {
    let registry = TypeRegistry::new();
    let err = registry
        .validate_custom_properties(&table_with("owner", "ghost"))
        .unwrap_err();

    match &err {
        RegistryError::InvalidReference { type_name, property } => {
            assert_eq!(type_name, "ghost");
            assert_eq!(property, "owner");
        }
        other => panic!("Expected InvalidReference, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("ghost"));
    assert!(message.contains("owner"));
}

#[test]
fn test_removing_referenced_type_conflicts() {
    let registry = TypeRegistry::new();
    registry
        .add_type(Type::property_type("string", json!({"type": "string"})))
        .unwrap();
    registry.add_type(table_with("owner", "string")).unwrap();

    let err = registry.remove_type("string").unwrap_err();
    assert!(matches!(err, RegistryError::RemovalConflict { .. }));
    assert!(err.to_string().contains("table.customProperties.owner"));

    // Registry is untouched
    assert!(registry.lookup("string").is_ok());
    assert!(registry.get_custom_property("table", "owner").is_ok());
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_lookup_returns_committed_type_until_overwritten() {
    let registry = TypeRegistry::new();
    let first = Type::property_type("string", json!({"type": "string"}));
    registry.add_type(first.clone()).unwrap();
    assert_eq!(*registry.lookup("string").unwrap(), first);

    let second = Type::property_type("string", json!({"type": "string", "minLength": 1}))
        .with_description("Non-empty string");
    registry.add_type(second.clone()).unwrap();
    assert_eq!(*registry.lookup("string").unwrap(), second);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_every_declared_property_has_its_type_schema() {
    let registry = TypeRegistry::new();
    load_fixture(&registry);

    for name in registry.type_names() {
        let ty = registry.lookup(&name).unwrap();
        for property in &ty.custom_properties {
            let schema = registry.get_schema(&ty.name, &property.name).unwrap();
            let property_type = registry.lookup(&property.property_type.name).unwrap();
            assert_eq!(schema.source(), &property_type.schema);
        }
    }
}

#[test]
fn test_validation_succeeds_without_custom_properties() {
    let registry = TypeRegistry::new();
    assert!(registry.validate_custom_properties(&Type::entity("table")).is_ok());
}

#[test]
fn test_validation_fails_only_on_missing_references() {
    let registry = TypeRegistry::new();
    load_fixture(&registry);

    let good = Type::entity("topic")
        .with_custom_property(CustomProperty::new("owner", "string"))
        .with_custom_property(CustomProperty::new("partitions", "integer"));
    assert!(registry.validate_custom_properties(&good).is_ok());

    let bad = good.with_custom_property(CustomProperty::new("sla", "duration"));
    assert!(matches!(
        registry.validate_custom_properties(&bad),
        Err(RegistryError::InvalidReference { ref type_name, ref property })
            if type_name == "duration" && property == "sla"
    ));
}

#[test]
fn test_validation_reports_first_missing_reference() {
    let registry = TypeRegistry::new();
    load_fixture(&registry);

    let topic = Type::entity("topic")
        .with_custom_property(CustomProperty::new("owner", "string"))
        .with_custom_property(CustomProperty::new("sla", "duration"))
        .with_custom_property(CustomProperty::new("tier", "ghost"));

    match registry.validate_custom_properties(&topic) {
        Err(RegistryError::InvalidReference { type_name, property }) => {
            assert_eq!(type_name, "duration");
            assert_eq!(property, "sla");
        }
        other => panic!("Expected InvalidReference, got {:?}", other),
    }
}

#[test]
fn test_declared_description_is_kept() {
    let registry = TypeRegistry::new();
    load_fixture(&registry);

    let topic = Type::entity("topic").with_custom_property(
        CustomProperty::new("owner", "string").with_description("Team that owns the topic"),
    );
    registry.validate_and_add_type(topic).unwrap();

    let owner = registry.get_custom_property("topic", "owner").unwrap();
    assert_eq!(owner.description.as_deref(), Some("Team that owns the topic"));
    assert_eq!(
        serde_json::to_value(&*owner).unwrap(),
        json!({
            "name": "owner",
            "propertyType": { "name": "string" },
            "description": "Team that owns the topic"
        })
    );
}

#[test]
fn test_fqn_layout_is_three_segments() {
    let fqn = CustomPropertyFqn::new("table", "owner");
    assert_eq!(fqn.to_string(), "table.customProperties.owner");
    assert_eq!(fqn.marker(), "customProperties");

    let segments = fqn::split(&fqn.to_string()).unwrap();
    assert_eq!(segments, vec!["table", "customProperties", "owner"]);
    assert_eq!(TypeRegistry::property_name("table.customProperties.owner").unwrap(), "owner");
}

// =============================================================================
// Catalog fixture
// =============================================================================

#[test]
fn test_fixture_loads_and_validates_values() {
    let registry = TypeRegistry::new();
    load_fixture(&registry);

    assert_eq!(registry.len(), 5);
    assert_eq!(registry.lookup("table").unwrap().category, TypeCategory::Entity);

    let properties: Vec<String> = registry
        .custom_properties_of("table")
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(properties, vec!["notes", "owner", "retentionDays"]);

    assert!(registry.validate_value("table", "retentionDays", &json!(30)).is_ok());
    match registry.validate_value("table", "retentionDays", &json!("thirty")) {
        Err(RegistryError::InvalidValue { fqn, errors }) => {
            assert_eq!(fqn, "table.customProperties.retentionDays");
            assert!(!errors.is_empty());
        }
        other => panic!("Expected InvalidValue, got {:?}", other),
    }
    assert!(matches!(
        registry.validate_value("table", "unknown", &json!(1)),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn test_same_property_name_on_different_entities() {
    let registry = TypeRegistry::new();
    load_fixture(&registry);

    registry.remove_type("dashboard").unwrap();
    assert!(registry.get_schema("dashboard", "owner").is_err());
    assert!(registry.get_schema("table", "owner").is_ok());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_adds_then_lookups() {
    const N: usize = 64;
    let registry = Arc::new(TypeRegistry::new());
    registry
        .add_type(Type::property_type("string", json!({"type": "string"})))
        .unwrap();

    let writers: Vec<_> = (0..N)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let ty = Type::entity(format!("entity{i}"))
                    .with_custom_property(CustomProperty::new("owner", "string"));
                registry.validate_and_add_type(ty).unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let readers: Vec<_> = (0..N)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let name = format!("entity{i}");
                assert_eq!(registry.lookup(&name).unwrap().name, name);
                assert!(registry.get_schema(&name, "owner").is_ok());
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(registry.len(), N + 1);
}

#[test]
fn test_readers_see_properties_of_visible_types() {
    let registry = Arc::new(TypeRegistry::new());
    registry
        .add_type(Type::property_type("string", json!({"type": "string"})))
        .unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..200 {
                let ty = Type::entity(format!("entity{i}"))
                    .with_custom_property(CustomProperty::new("owner", "string"));
                registry.add_type(ty).unwrap();
            }
        })
    };

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..2000 {
                for name in registry.type_names() {
                    if name.starts_with("entity") {
                        assert!(registry.get_schema(&name, "owner").is_ok());
                    }
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn test_reset_isolates_shared_instance() {
    let registry = Arc::new(TypeRegistry::new());
    load_fixture(&registry);
    registry.reset();

    assert!(registry.is_empty());
    assert!(registry.get_schema("table", "owner").is_err());
    load_fixture(&registry);
    assert_eq!(registry.len(), 5);
}
