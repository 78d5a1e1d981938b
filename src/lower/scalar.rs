// Basic types
// OpenAPI refines `number`/`integer` through `format`; proto3 has one type per width:
// type  = "double" | "float" | "int32" | "int64" | "uint32" | "uint64"
//       | "sint32" | "sint64" | "fixed32" | "fixed64" | "sfixed32" | "sfixed64"
//       | "bool" | "string" | "bytes" | messageType | enumType

use crate::ir::TypeName;
use crate::model::{Schema, SchemaType};

const INTEGER_FORMATS: &[&str] = &[
    "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32", "fixed64", "sfixed32", "sfixed64",
];

/// `None` when the node has no `type` at all.
pub fn type_name(schema: &Schema) -> Option<TypeName> {
    let format = schema.format.as_deref();
    let name = match schema.kind.as_ref()? {
        SchemaType::Number => match format {
            Some("float") => "float",
            _ => "double",
        },
        SchemaType::Integer => match format {
            Some(width) if INTEGER_FORMATS.contains(&width) => width,
            _ => "int32",
        },
        SchemaType::Boolean => "bool",
        SchemaType::String => match format {
            Some("binary") => "bytes",
            _ => "string",
        },
        // object/array only reach here through a caller that skipped the shape rules
        other => other.as_str(),
    };
    Some(TypeName { name: name.to_string() })
}
