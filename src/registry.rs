//! Type Registry
//!
//! Tracks entity and property types, the custom properties declared on entity
//! types, and the schema compiled for each custom property.
//!
//! Reads go straight to the sharded stores. Writes serialize on one commit
//! lock, resolve and compile everything off to the side, then publish in the
//! order schema cache, custom property store, type store. A reader that can
//! see a type can therefore also see its custom properties and schemas.
//!
//! Windows a concurrent reader can still observe:
//! - for a single FQN, the new schema shortly before the property entry;
//! - on overwrite, properties the new definition dropped, for a moment after
//!   the new type is visible, until they are unregistered;
//! - when a property type is overwritten, a dependent property's refreshed
//!   schema before [`TypeRegistry::lookup`] returns the new property type.
//!
//! Two reference indexes, maintained under the commit lock, map an entity
//! type to the properties it owns and a property type to the properties typed
//! by it, so writes never scan the property store.
//!
//! Removal refuses while a custom property owned by another type still uses
//! the type as its property type. Properties owned by the removed type go
//! with it. Overwriting a property type recompiles the schemas cached for
//! every custom property that uses it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::fqn::{self, CustomPropertyFqn};
use crate::schema::{CompiledSchema, CustomProperty, Type};
use crate::store::{CustomPropertyStore, ReferenceIndex, SchemaCache, ShardedStore, TypeStore};

/// A custom property resolved and compiled, waiting to be published
struct StagedProperty {
    fqn: CustomPropertyFqn,
    property: Arc<CustomProperty>,
    schema: Arc<CompiledSchema>,
}

/// Registry of types, custom properties and their compiled schemas.
///
/// Build one per process and share it behind an [`Arc`].
pub struct TypeRegistry {
    types: Box<TypeStore>,
    properties: Box<CustomPropertyStore>,
    schemas: Box<SchemaCache>,
    /// Entity type -> FQNs of the properties it owns
    owned: ReferenceIndex,
    /// Property type -> FQNs of the properties typed by it
    dependents: ReferenceIndex,
    commit: Mutex<()>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create an empty registry with default store sizing
    pub fn new() -> Self {
        Self::with_stores(
            Box::new(ShardedStore::new()),
            Box::new(ShardedStore::new()),
            Box::new(ShardedStore::new()),
        )
    }

    /// Create an empty registry sized from configuration
    pub fn with_config(config: &RegistryConfig) -> Result<Self> {
        config.store.validate()?;
        Ok(Self::with_stores(
            Box::new(ShardedStore::with_config(&config.store)),
            Box::new(ShardedStore::with_config(&config.store)),
            Box::new(ShardedStore::with_config(&config.store)),
        ))
    }

    /// Create a registry over caller-provided store backends
    pub fn with_stores(
        types: Box<TypeStore>,
        properties: Box<CustomPropertyStore>,
        schemas: Box<SchemaCache>,
    ) -> Self {
        Self {
            types,
            properties,
            schemas,
            owned: ReferenceIndex::new(),
            dependents: ReferenceIndex::new(),
            commit: Mutex::new(()),
        }
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        // The lock guards no data, so a poisoned lock is still usable.
        self.commit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// FQN of a custom property
    pub fn custom_property_fqn(entity_type: &str, property_name: &str) -> CustomPropertyFqn {
        CustomPropertyFqn::new(entity_type, property_name)
    }

    /// `<entityType>.customProperties`
    pub fn custom_property_fqn_prefix(entity_type: &str) -> String {
        fqn::custom_property_prefix(entity_type)
    }

    /// Property name of a custom property FQN
    pub fn property_name(property_fqn: &str) -> Result<String> {
        fqn::property_name(property_fqn)
    }

    // ------------------------------------------------------------------
    // Type store
    // ------------------------------------------------------------------

    /// Get a type by name
    pub fn lookup(&self, name: &str) -> Result<Arc<Type>> {
        self.types
            .get(&name.to_string())
            .ok_or_else(|| RegistryError::type_not_found(name))
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(&name.to_string())
    }

    /// Names of all registered types, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.entries().into_iter().map(|(name, _)| name).collect();
        names.sort();
        names
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Insert or overwrite a type and register its custom properties.
    ///
    /// Nothing is published unless every declared property resolves to a
    /// registered type whose schema compiles. Custom properties registered
    /// for this type but no longer declared are dropped.
    pub fn add_type(&self, ty: Type) -> Result<Arc<Type>> {
        let _guard = self.write_lock();
        self.commit_type(ty)
    }

    /// Validate then commit a type in one step
    pub fn validate_and_add_type(&self, ty: Type) -> Result<Arc<Type>> {
        let _guard = self.write_lock();
        self.validate_custom_properties(&ty)?;
        self.commit_type(ty)
    }

    /// Remove a type and the custom properties it owns.
    ///
    /// Fails with [`RegistryError::RemovalConflict`] while another type's
    /// custom property uses `name` as its property type.
    pub fn remove_type(&self, name: &str) -> Result<Arc<Type>> {
        let _guard = self.write_lock();

        if !self.contains_type(name) {
            return Err(RegistryError::type_not_found(name));
        }

        let dependents: Vec<String> = self
            .dependents
            .get(name)
            .into_iter()
            .filter(|fqn| fqn.entity_type() != name)
            .map(|fqn| fqn.to_string())
            .collect();
        if !dependents.is_empty() {
            warn!(type_name = name, dependents = ?dependents, "Refusing to delete referenced type");
            return Err(RegistryError::RemovalConflict {
                type_name: name.to_string(),
                dependents,
            });
        }

        let removed = self
            .types
            .remove(&name.to_string())
            .ok_or_else(|| RegistryError::type_not_found(name))?;
        info!(type_name = name, "Deleted type");

        for fqn in self.owned_property_fqns(name) {
            self.unregister(&fqn);
        }

        Ok(removed)
    }

    fn commit_type(&self, ty: Type) -> Result<Arc<Type>> {
        fqn::validate_name(&ty.name)?;
        let staged = self.stage(&ty)?;
        let refreshed = self.restage_dependents(&ty)?;

        let declared: HashSet<&CustomPropertyFqn> = staged.iter().map(|s| &s.fqn).collect();
        let stale: Vec<CustomPropertyFqn> = self
            .owned_property_fqns(&ty.name)
            .into_iter()
            .filter(|fqn| !declared.contains(fqn))
            .collect();

        for entry in staged.iter().chain(&refreshed) {
            self.publish(entry);
        }

        let ty = Arc::new(ty);
        self.types.insert(ty.name.clone(), Arc::clone(&ty));
        info!(
            type_name = %ty.name,
            custom_properties = ty.custom_properties.len(),
            "Updated type"
        );

        for fqn in &stale {
            self.unregister(fqn);
        }

        Ok(ty)
    }

    /// Resolve and compile every custom property declared on `ty`
    fn stage(&self, ty: &Type) -> Result<Vec<StagedProperty>> {
        ty.custom_properties
            .iter()
            .map(|property| {
                fqn::validate_name(&property.name)?;
                let property_type = self.resolve_property_type(ty, property)?;
                let schema = CompiledSchema::compile(&property_type)?;
                Ok(StagedProperty {
                    fqn: CustomPropertyFqn::new(&ty.name, &property.name),
                    property: Arc::new(property.clone()),
                    schema: Arc::new(schema),
                })
            })
            .collect()
    }

    /// Recompile cached schemas of other types' properties that use `ty`
    fn restage_dependents(&self, ty: &Type) -> Result<Vec<StagedProperty>> {
        let dependents: Vec<_> = self
            .dependents
            .get(&ty.name)
            .into_iter()
            .filter(|fqn| fqn.entity_type() != ty.name)
            .filter_map(|fqn| self.properties.get(&fqn).map(|property| (fqn, property)))
            .collect();
        if dependents.is_empty() {
            return Ok(Vec::new());
        }

        let schema = Arc::new(CompiledSchema::compile(ty)?);
        Ok(dependents
            .into_iter()
            .map(|(fqn, property)| StagedProperty {
                fqn,
                property,
                schema: Arc::clone(&schema),
            })
            .collect())
    }

    /// Find the type a custom property points at.
    ///
    /// The target must be registered. A type whose property refers to the type
    /// itself compiles against the definition being committed.
    fn resolve_property_type(&self, owner: &Type, property: &CustomProperty) -> Result<Arc<Type>> {
        let target = &property.property_type.name;
        let registered = self
            .types
            .get(target)
            .ok_or_else(|| RegistryError::InvalidReference {
                type_name: target.clone(),
                property: property.name.clone(),
            })?;
        if *target == owner.name {
            Ok(Arc::new(owner.clone()))
        } else {
            Ok(registered)
        }
    }

    fn publish(&self, entry: &StagedProperty) {
        let fqn = &entry.fqn;
        self.schemas.insert(fqn.clone(), Arc::clone(&entry.schema));
        let previous = self.properties.insert(fqn.clone(), Arc::clone(&entry.property));

        let property_type = &entry.property.property_type.name;
        if let Some(previous) = previous {
            if previous.property_type.name != *property_type {
                self.dependents.remove(&previous.property_type.name, fqn);
            }
        }
        self.dependents.add(property_type, fqn.clone());
        self.owned.add(fqn.entity_type(), fqn.clone());
        debug!(fqn = %entry.fqn, property_type = %entry.schema.type_name(), "Added custom property");
    }

    fn unregister(&self, fqn: &CustomPropertyFqn) {
        if let Some(property) = self.properties.remove(fqn) {
            self.dependents.remove(&property.property_type.name, fqn);
        }
        self.owned.remove(fqn.entity_type(), fqn);
        self.schemas.remove(fqn);
        debug!(fqn = %fqn, "Removed custom property");
    }

    fn owned_property_fqns(&self, entity_type: &str) -> Vec<CustomPropertyFqn> {
        self.owned.get(entity_type)
    }

    // ------------------------------------------------------------------
    // Custom properties and schemas
    // ------------------------------------------------------------------

    /// Register one custom property on a registered entity type.
    ///
    /// The property type must already be registered; otherwise nothing is
    /// stored and [`RegistryError::InvalidReference`] is returned. The owning
    /// type's own declaration list is not modified, so the property only lives
    /// until the owner is next upserted: [`add_type`](Self::add_type) drops
    /// every owned property the new definition does not declare.
    pub fn register(
        &self,
        entity_type: &str,
        property_name: &str,
        property: CustomProperty,
    ) -> Result<CustomPropertyFqn> {
        let _guard = self.write_lock();

        fqn::validate_name(property_name)?;
        let owner = self.lookup(entity_type)?;
        let property_type = self.resolve_property_type(&owner, &property)?;
        let schema = CompiledSchema::compile(&property_type)?;

        let entry = StagedProperty {
            fqn: CustomPropertyFqn::new(entity_type, property_name),
            property: Arc::new(property),
            schema: Arc::new(schema),
        };
        self.publish(&entry);
        Ok(entry.fqn)
    }

    /// Compiled schema of a custom property
    pub fn get_schema(&self, entity_type: &str, property_name: &str) -> Result<Arc<CompiledSchema>> {
        let fqn = CustomPropertyFqn::new(entity_type, property_name);
        self.schemas
            .get(&fqn)
            .ok_or_else(|| RegistryError::schema_not_found(fqn.to_string()))
    }

    pub fn get_custom_property(&self, entity_type: &str, property_name: &str) -> Result<Arc<CustomProperty>> {
        let fqn = CustomPropertyFqn::new(entity_type, property_name);
        self.properties
            .get(&fqn)
            .ok_or_else(|| RegistryError::property_not_found(fqn.to_string()))
    }

    /// Custom properties registered for an entity type, sorted by name
    pub fn custom_properties_of(&self, entity_type: &str) -> Vec<(String, Arc<CustomProperty>)> {
        self.owned
            .get(entity_type)
            .into_iter()
            .filter_map(|fqn| {
                let property = self.properties.get(&fqn)?;
                Some((fqn.property_name().to_string(), property))
            })
            .collect()
    }

    /// Check a custom property value of an entity instance
    pub fn validate_value(&self, entity_type: &str, property_name: &str, value: &Value) -> Result<()> {
        let schema = self.get_schema(entity_type, property_name)?;
        schema.validate(value).map_err(|errors| RegistryError::InvalidValue {
            fqn: CustomPropertyFqn::new(entity_type, property_name).to_string(),
            errors,
        })
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check that every custom property declared on `ty` names a registered type.
    ///
    /// Call before [`add_type`](Self::add_type), or use
    /// [`validate_and_add_type`](Self::validate_and_add_type).
    pub fn validate_custom_properties(&self, ty: &Type) -> Result<()> {
        for property in &ty.custom_properties {
            if !self.contains_type(&property.property_type.name) {
                return Err(RegistryError::InvalidReference {
                    type_name: property.property_type.name.clone(),
                    property: property.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Drop every type, custom property and schema
    pub fn reset(&self) {
        let _guard = self.write_lock();
        self.types.clear();
        self.properties.clear();
        self.schemas.clear();
        self.owned.clear();
        self.dependents.clear();
        info!("Reset type registry");
    }
}
