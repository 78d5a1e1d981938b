use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, value::MapAccessDeserializer, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::SchemaOrRef;

/// The `type` keyword. Anything outside the standard set is kept verbatim so
/// callers can feed their own scalar names straight through to the output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Custom(String),
}

impl From<String> for SchemaType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "object" => Self::Object,
            "array" => Self::Array,
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            _ => Self::Custom(raw),
        }
    }
}

impl SchemaType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Custom(name) => name,
        }
    }
}

/// `additionalProperties` is either a flag or a value schema.
#[derive(Debug, Clone)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(SchemaOrRef),
}

/// One inline schema node. Only the keywords the compiler consumes are modelled;
/// everything else in the source document is ignored on load.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// `type`
    pub kind: Option<SchemaType>,
    pub format: Option<String>,
    pub description: Option<String>,
    /// Unordered as far as the output is concerned; see [`Schema::ordered_properties`].
    pub properties: IndexMap<String, SchemaOrRef>,
    /// `x-properties-order`
    pub explicit_order: Vec<String>,
    pub items: Option<SchemaOrRef>,
    pub all_of: Vec<SchemaOrRef>,
    pub one_of: Vec<SchemaOrRef>,
    pub any_of: Vec<SchemaOrRef>,
    pub additional_properties: Option<AdditionalProperties>,
    /// `enum`; arbitrary scalars until lowering checks them.
    pub enum_values: Option<Vec<serde_json::Value>>,
}

impl<'de> Deserialize<'de> for AdditionalProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FlagOrSchema;

        impl<'de> Visitor<'de> for FlagOrSchema {
            type Value = AdditionalProperties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean or a schema")
            }

            fn visit_bool<E: de::Error>(self, flag: bool) -> Result<Self::Value, E> {
                Ok(AdditionalProperties::Bool(flag))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                SchemaOrRef::deserialize(MapAccessDeserializer::new(map)).map(AdditionalProperties::Schema)
            }
        }

        deserializer.deserialize_any(FlagOrSchema)
    }
}

impl Schema {
    pub fn is(&self, kind: &SchemaType) -> bool {
        self.kind.as_ref() == Some(kind)
    }

    /// Property names in output order: `x-properties-order` when given,
    /// otherwise ascending by name. Never the map's own order.
    pub fn ordered_properties(&self) -> Vec<&str> {
        if !self.explicit_order.is_empty() {
            return self.explicit_order.iter().map(String::as_str).collect();
        }
        let mut keys: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Every direct child slot that may hold a reference, in a fixed order.
    pub(crate) fn children_mut(&mut self) -> impl Iterator<Item = &mut SchemaOrRef> {
        let additional = match &mut self.additional_properties {
            Some(AdditionalProperties::Schema(value)) => Some(value),
            _ => None,
        };
        self.properties
            .values_mut()
            .chain(self.items.iter_mut())
            .chain(self.all_of.iter_mut())
            .chain(self.one_of.iter_mut())
            .chain(self.any_of.iter_mut())
            .chain(additional)
    }
}
