use serde_json::Value;

use crate::error::CompileError;
use crate::ir::{normalize_ident, Enum};
use crate::model::{Schema, SchemaType};

use super::Lowering;

impl<'a> Lowering<'a> {
    /// Values keep their declared order; ordinals start at 0.
    pub(super) fn lower_enum(&self, name: &str, schema: &'a Schema, values: &'a [Value]) -> Result<Enum, CompileError> {
        let invalid = |reason: String| CompileError::InvalidEnumShape { schema: name.to_string(), reason };

        if !schema.is(&SchemaType::String) {
            let found = schema.kind.as_ref().map(SchemaType::as_str).unwrap_or("no type");
            return Err(invalid(format!("type must be string, found {found}")));
        }

        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value {
                Value::String(text) => out.push(text.clone()),
                Value::Null => continue, // nullable enums list null as a value
                other => return Err(invalid(format!("value {other} is not a string"))),
            }
        }
        if out.is_empty() {
            return Err(invalid("no values".to_string()));
        }

        let prefix = self
            .options
            .enum_name_prefix
            .then(|| format!("{}_", normalize_ident(name).to_uppercase()));

        Ok(Enum {
            name: name.to_string(),
            values: out,
            prefix,
            comment: schema.description.clone(),
        })
    }
}
