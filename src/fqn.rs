//! Fully qualified names for custom properties
//!
//! A custom property is addressed as `<entityType>.customProperties.<property>`.
//! Segments that contain the delimiter are wrapped in double quotes, so
//! `"my.table".customProperties.owner` names property `owner` of entity type
//! `my.table`. The three-segment layout is shared with anything that persists
//! or compares these strings, so it must not change.

use std::fmt;

use crate::error::{RegistryError, Result};

/// Segment delimiter
pub const DELIMITER: char = '.';

/// Literal middle segment of every custom property FQN
pub const CUSTOM_PROPERTIES: &str = "customProperties";

const QUOTE: char = '"';

/// Check that a type or property name can be encoded in an FQN
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty",
        });
    }
    if name.contains(QUOTE) {
        return Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason: "name must not contain '\"'",
        });
    }
    Ok(())
}

fn quote(segment: &str) -> String {
    if segment.contains(DELIMITER) {
        format!("{QUOTE}{segment}{QUOTE}")
    } else {
        segment.to_string()
    }
}

/// Join segments into an FQN, quoting any segment that contains the delimiter
pub fn build<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| quote(s.as_ref()))
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Split an FQN into its unquoted segments
pub fn split(fqn: &str) -> Result<Vec<String>> {
    let invalid = |reason: &str| RegistryError::InvalidFqn {
        fqn: fqn.to_string(),
        reason: reason.to_string(),
    };

    let mut raw = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in fqn.chars() {
        match c {
            QUOTE => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            DELIMITER if !in_quotes => raw.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(invalid("unbalanced quotes"));
    }
    raw.push(current);

    raw.into_iter()
        .map(|segment| {
            let unquoted = match segment
                .strip_prefix(QUOTE)
                .and_then(|s| s.strip_suffix(QUOTE))
            {
                Some(inner) => inner.to_string(),
                None => segment,
            };
            if unquoted.is_empty() {
                Err(invalid("empty segment"))
            } else if unquoted.contains(QUOTE) {
                Err(invalid("quote inside segment"))
            } else {
                Ok(unquoted)
            }
        })
        .collect()
}

/// Prefix shared by every custom property FQN of an entity type
pub fn custom_property_prefix(entity_type: &str) -> String {
    build(&[entity_type, CUSTOM_PROPERTIES])
}

/// Structured key of a custom property: owning entity type plus property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomPropertyFqn {
    entity_type: String,
    property_name: String,
}

impl CustomPropertyFqn {
    pub fn new(entity_type: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            property_name: property_name.into(),
        }
    }

    /// Parse `<entityType>.customProperties.<property>`
    pub fn parse(fqn: &str) -> Result<Self> {
        let segments = split(fqn)?;
        if segments.len() != 3 {
            return Err(RegistryError::InvalidFqn {
                fqn: fqn.to_string(),
                reason: format!("expected 3 segments, found {}", segments.len()),
            });
        }
        if segments[1] != CUSTOM_PROPERTIES {
            return Err(RegistryError::InvalidFqn {
                fqn: fqn.to_string(),
                reason: format!("second segment must be {CUSTOM_PROPERTIES:?}"),
            });
        }
        let mut segments = segments.into_iter();
        let entity_type = segments.next().unwrap_or_default();
        let property_name = segments.nth(1).unwrap_or_default();
        Ok(Self::new(entity_type, property_name))
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Always [`CUSTOM_PROPERTIES`]
    pub fn marker(&self) -> &'static str {
        CUSTOM_PROPERTIES
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }
}

impl fmt::Display for CustomPropertyFqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build(&[
            self.entity_type.as_str(),
            CUSTOM_PROPERTIES,
            self.property_name.as_str(),
        ]))
    }
}

/// Property name (third segment) of a custom property FQN
pub fn property_name(fqn: &str) -> Result<String> {
    CustomPropertyFqn::parse(fqn).map(|parsed| parsed.property_name)
}
