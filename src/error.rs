//! Error types for the type registry

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Type registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Type {type_name} not found for custom property {property}")]
    InvalidReference { type_name: String, property: String },

    #[error("Cannot remove type {type_name}: still referenced by custom properties {}", dependents.join(", "))]
    RemovalConflict {
        type_name: String,
        dependents: Vec<String>,
    },

    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Invalid custom property FQN {fqn:?}: {reason}")]
    InvalidFqn { fqn: String, reason: String },

    #[error("Schema of type {type_name} does not compile: {message}")]
    InvalidSchema { type_name: String, message: String },

    #[error("Value rejected by {fqn}: {}", errors.join("; "))]
    InvalidValue { fqn: String, errors: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    pub(crate) fn type_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Type",
            name: name.into(),
        }
    }

    pub(crate) fn property_not_found(fqn: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Custom property",
            name: fqn.into(),
        }
    }

    pub(crate) fn schema_not_found(fqn: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Schema",
            name: fqn.into(),
        }
    }
}
