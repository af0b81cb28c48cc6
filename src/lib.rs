//! Type Registry
//!
//! In-memory registry backing an extensible catalog type system: entity types,
//! property types, the custom properties declared on entity types, and the
//! JSON Schema compiled for each custom property.
//!
//! ## Features
//!
//! - **Upsert semantics**: re-registering a type overwrites it, last writer wins
//! - **Reference checks**: custom properties must name a registered property type
//! - **Schema cache**: one compiled schema per custom property, kept in step with its type
//! - **Guarded removal**: a type still used by another type's custom property cannot be removed
//! - **Concurrent access**: sharded stores, readers never take a registry-wide lock
//!
//! ## Keys
//!
//! ```text
//! types:              "string"                      -> Type
//!                     "table"                       -> Type
//! custom properties:  "table.customProperties.owner" -> CustomProperty
//! schemas:            "table.customProperties.owner" -> CompiledSchema (of "string")
//! ```

pub mod config;
pub mod error;
pub mod fqn;
pub mod registry;
pub mod schema;
pub mod store;

pub use config::{LoggingConfig, RegistryConfig, StoreConfig};
pub use error::{RegistryError, Result};
pub use fqn::CustomPropertyFqn;
pub use registry::TypeRegistry;
pub use schema::{CompiledSchema, CustomProperty, PropertyTypeRef, Type, TypeCategory};
pub use store::{ShardedStore, Store};
