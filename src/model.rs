//! Typed view of the source document.
//!
//! Only `components.schemas` matters to the compiler. Every node is either an
//! inline [`Schema`] or a [`Reference`], never both, which the
//! [`SchemaOrRef`] sum type enforces by construction. The variant is picked by
//! the presence of `$ref`, after the node has been read as one plain struct, so
//! a malformed keyword deep inside a schema still reports its full path.
pub mod reference;
pub mod schema;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::error::LoadError;
use crate::path_de::{from_str_with_path, Format};

pub use reference::{Reference, Resolution, SchemaPath};
pub use schema::{AdditionalProperties, Schema, SchemaType};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub openapi: Option<String>,
    #[serde(default)]
    pub info: Option<Info>,
    #[serde(default)]
    pub components: Components,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Named component registry. Duplicate keys in the source collapse to the last one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaOrRef>,
}

#[derive(Debug, Clone)]
pub enum SchemaOrRef {
    Reference(Reference),
    Schema(Box<Schema>),
}

/// Wire form of a node: the schema keywords plus the `$ref` siblings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Node {
    #[serde(rename = "$ref")]
    pointer: Option<String>,
    #[serde(rename = "x-package")]
    package: Option<String>,
    #[serde(rename = "type")]
    kind: Option<SchemaType>,
    format: Option<String>,
    description: Option<String>,
    #[serde(default)]
    properties: IndexMap<String, SchemaOrRef>,
    #[serde(rename = "x-properties-order", default)]
    explicit_order: Vec<String>,
    items: Option<SchemaOrRef>,
    #[serde(default)]
    all_of: Vec<SchemaOrRef>,
    #[serde(default)]
    one_of: Vec<SchemaOrRef>,
    #[serde(default)]
    any_of: Vec<SchemaOrRef>,
    additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<serde_json::Value>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    pub fn from_yaml_str(src: &str) -> Result<Self, LoadError> {
        from_str_with_path(src, Format::Yaml)
    }

    pub fn from_json_str(src: &str) -> Result<Self, LoadError> {
        from_str_with_path(src, Format::Json)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let src = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        from_str_with_path(&src, Format::from_path(path))
    }

    /// Top-level schema names in ascending order.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Walk `components.schemas` down a property chain. Inline schemas only:
    /// a reference in the middle of the chain ends the walk.
    pub fn lookup(&self, path: &SchemaPath) -> Option<&SchemaOrRef> {
        let mut node = self.components.schemas.get(&path.root)?;
        for property in &path.properties {
            node = node.as_schema()?.properties.get(property)?;
        }
        Some(node)
    }
}

impl<'de> Deserialize<'de> for SchemaOrRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = Node::deserialize(deserializer)?;
        if let Some(pointer) = node.pointer {
            return Ok(SchemaOrRef::Reference(Reference {
                pointer,
                description: node.description,
                package: node.package,
                resolution: None,
            }));
        }
        Ok(Schema {
            kind: node.kind,
            format: node.format,
            description: node.description,
            properties: node.properties,
            explicit_order: node.explicit_order,
            items: node.items,
            all_of: node.all_of,
            one_of: node.one_of,
            any_of: node.any_of,
            additional_properties: node.additional_properties,
            enum_values: node.enum_values,
        }
        .into())
    }
}

impl SchemaOrRef {
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrRef::Schema(schema) => Some(schema),
            SchemaOrRef::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            SchemaOrRef::Reference(reference) => Some(reference),
            SchemaOrRef::Schema(_) => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            SchemaOrRef::Reference(reference) => reference.description.as_deref(),
            SchemaOrRef::Schema(schema) => schema.description.as_deref(),
        }
    }
}

impl From<Schema> for SchemaOrRef {
    fn from(schema: Schema) -> Self {
        SchemaOrRef::Schema(Box::new(schema))
    }
}

impl From<Reference> for SchemaOrRef {
    fn from(reference: Reference) -> Self {
        SchemaOrRef::Reference(reference)
    }
}
