//! # Stack file assembly
//!
//! A stack file is built from three independently collected lists of named
//! entities. Each list is flattened into a mapping keyed by entity name and
//! rendered as its own top-level YAML section.

use crate::config::GenerationConfig;
use crate::error::{GeneratorError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// Empty-string values left behind by bare keys, e.g. `backend: ''`
static EMPTY_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r#":\s['"]{2}"#).unwrap());

pub const SECTIONS: [&str; 3] = ["networks", "volumes", "services"];

/// A volume, network or service record identified by its `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    #[serde(deserialize_with = "scalar_name")]
    pub name: String,
    #[serde(flatten)]
    pub properties: Mapping,
}

impl NamedEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Mapping::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(Value::from(key), value.into());
        self
    }
}

/// Entity lists as collected by the caller. `None` entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackDefinition {
    #[serde(default, deserialize_with = "entity_list")]
    pub networks: Vec<Option<NamedEntity>>,
    #[serde(default, deserialize_with = "entity_list")]
    pub volumes: Vec<Option<NamedEntity>>,
    #[serde(default, deserialize_with = "entity_list")]
    pub services: Vec<Option<NamedEntity>>,
}

impl StackDefinition {
    fn section(&self, label: &str) -> &[Option<NamedEntity>] {
        match label {
            "networks" => &self.networks,
            "volumes" => &self.volumes,
            _ => &self.services,
        }
    }

    fn section_mut(&mut self, label: &str) -> &mut Vec<Option<NamedEntity>> {
        match label {
            "networks" => &mut self.networks,
            "volumes" => &mut self.volumes,
            _ => &mut self.services,
        }
    }
}

/// Lists that are not sequences are treated as empty; falsy items become `None`.
fn entity_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Option<NamedEntity>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Sequence(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    items
        .into_iter()
        .map(|item| {
            if is_falsy(&item) {
                Ok(None)
            } else {
                serde_yaml::from_value(item)
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        })
        .collect()
}

/// Numbers and booleans are accepted as names and kept in their string form.
fn scalar_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("entity name must be a scalar, got {:?}", value)))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Merge entities into one mapping keyed by name.
///
/// Entities without properties map to an empty string so they render as a
/// bare key. A repeated name overwrites the earlier entry in place. Returns
/// `None` when nothing is left.
pub fn flatten_by_name(entities: &[Option<NamedEntity>]) -> Option<Mapping> {
    let mut merged = Mapping::new();
    for entity in entities.iter().flatten() {
        let body = if entity.properties.is_empty() {
            Value::String(String::new())
        } else {
            Value::Mapping(entity.properties.clone())
        };
        merged.insert(Value::String(entity.name.clone()), body);
    }

    (!merged.is_empty()).then_some(merged)
}

/// Render one top-level section, or just its label when it is empty
pub fn render_section(label: &str, flattened: Option<Mapping>) -> Result<String> {
    let Some(entries) = flattened else {
        return Ok(format!("{}:", label));
    };

    let mut document = Mapping::new();
    document.insert(Value::from(label), Value::Mapping(entries));
    let yaml = serde_yaml::to_string(&document)?;

    Ok(EMPTY_MARKER.replace_all(yaml.trim_end(), ":").into_owned())
}

/// Generate a stack file from entity lists
pub fn generate(stack: &StackDefinition, config: &GenerationConfig) -> Result<String> {
    let mut output = String::new();
    output.push_str(&config.header);
    output.push_str("\n\n");
    output.push_str(&format!("version: \"{}\"\n\n", config.compose_version));

    for label in SECTIONS {
        let section = render_section(label, flatten_by_name(stack.section(label)))?;
        output.push_str(&section);
        output.push_str("\n\n");
    }

    Ok(output)
}

/// Read an existing stack file back into entity lists, one entity per key
pub fn parse_stackfile(content: &str) -> Result<StackDefinition> {
    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| GeneratorError::InvalidStackfile(format!("YAML parsing error: {}", e)))?;

    let root = match document {
        Value::Mapping(root) => root,
        Value::Null => Mapping::new(),
        _ => {
            return Err(GeneratorError::InvalidStackfile(
                "top level must be a mapping".to_string(),
            )
            .into())
        }
    };

    let mut stack = StackDefinition::default();
    for label in SECTIONS {
        let entries = match root.get(label) {
            None | Some(Value::Null) => continue,
            Some(Value::Mapping(entries)) => entries,
            Some(_) => {
                return Err(GeneratorError::InvalidStackfile(format!(
                    "'{}' must be a mapping",
                    label
                ))
                .into())
            }
        };

        let section = stack.section_mut(label);
        for (key, body) in entries {
            let name = scalar_to_string(key).ok_or_else(|| {
                GeneratorError::InvalidStackfile(format!("{} key must be a scalar", label))
            })?;
            let properties = match body {
                Value::Mapping(properties) => properties.clone(),
                Value::Null => Mapping::new(),
                Value::String(s) if s.is_empty() => Mapping::new(),
                _ => {
                    return Err(GeneratorError::InvalidStackfile(format!(
                        "{} '{}' must be a mapping",
                        label, name
                    ))
                    .into())
                }
            };
            section.push(Some(NamedEntity { name, properties }));
        }
    }

    Ok(stack)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
