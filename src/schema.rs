//! Type definitions and compiled property schemas

use std::fmt;

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};

/// Kind of type definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    /// Entity types (table, dashboard, ...) that carry custom properties
    Entity,
    /// Property value types (string, integer, markdown, ...)
    #[default]
    Field,
}

/// Reference from a custom property to the type of its values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTypeRef {
    pub name: String,
}

impl PropertyTypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An extension attribute declared on an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProperty {
    pub name: String,
    pub property_type: PropertyTypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomProperty {
    pub fn new(name: impl Into<String>, property_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyTypeRef::new(property_type),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named entity type or property type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Type {
    /// Globally unique name (e.g., "table", "string")
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: TypeCategory,
    /// JSON Schema for instance values; `null` when the type has none
    #[serde(default)]
    pub schema: Value,
    /// Custom properties declared directly on this type, in declaration order
    #[serde(default)]
    pub custom_properties: Vec<CustomProperty>,
}

impl Type {
    /// Create a property type with a value schema
    pub fn property_type(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            category: TypeCategory::Field,
            schema,
            custom_properties: Vec::new(),
        }
    }

    /// Create an entity type without custom properties
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            category: TypeCategory::Entity,
            schema: Value::Null,
            custom_properties: Vec::new(),
        }
    }

    pub fn with_custom_property(mut self, property: CustomProperty) -> Self {
        self.custom_properties.push(property);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A property type's schema compiled for validating custom property values.
///
/// Keeps the source document next to the compiled validator.
pub struct CompiledSchema {
    type_name: String,
    source: Value,
    compiled: JSONSchema,
}

impl CompiledSchema {
    /// Compile the schema of a property type
    pub fn compile(property_type: &Type) -> Result<Self> {
        let compiled =
            JSONSchema::compile(&property_type.schema).map_err(|e| RegistryError::InvalidSchema {
                type_name: property_type.name.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            type_name: property_type.name.clone(),
            source: property_type.schema.clone(),
            compiled,
        })
    }

    /// Name of the property type this schema came from
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The schema document as declared on the property type
    pub fn source(&self) -> &Value {
        &self.source
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }

    /// Validate an instance, collecting every error message
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), Vec<String>> {
        self.compiled
            .validate(instance)
            .map_err(|errors| errors.map(|e| e.to_string()).collect())
    }
}

impl PartialEq<Value> for CompiledSchema {
    fn eq(&self, other: &Value) -> bool {
        self.source == *other
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("type_name", &self.type_name)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_deserializes_catalog_document() {
        let doc = json!({
            "name": "table",
            "category": "entity",
            "customProperties": [
                { "name": "owner", "propertyType": { "name": "string" }, "description": "Team" }
            ]
        });
        let ty: Type = serde_json::from_value(doc).unwrap();
        assert_eq!(ty.category, TypeCategory::Entity);
        assert_eq!(ty.schema, Value::Null);
        assert_eq!(ty.custom_properties.len(), 1);
        assert_eq!(ty.custom_properties[0].property_type.name, "string");
        assert_eq!(ty.custom_properties[0].description.as_deref(), Some("Team"));
    }

    #[test]
    fn test_missing_custom_properties_is_empty() {
        let ty: Type = serde_json::from_value(json!({ "name": "string", "schema": {"type": "string"} })).unwrap();
        assert!(ty.custom_properties.is_empty());
        assert_eq!(ty.category, TypeCategory::Field);
    }

    #[test]
    fn test_compiled_schema_validates() {
        let schema = CompiledSchema::compile(&Type::property_type("integer", json!({"type": "integer"}))).unwrap();
        assert_eq!(schema.type_name(), "integer");
        assert!(schema == json!({"type": "integer"}));
        assert!(schema.is_valid(&json!(42)));
        assert!(!schema.is_valid(&json!("forty-two")));
        let errors = schema.validate(&json!("forty-two")).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_compile_rejects_bad_schema() {
        let result = CompiledSchema::compile(&Type::property_type("broken", json!({"type": 12})));
        assert!(matches!(result, Err(RegistryError::InvalidSchema { .. })));
    }
}
