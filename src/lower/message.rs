use crate::error::CompileError;
use crate::ir::{hoist, normalize_ident, strip_namespace, Decl, Field, Message, Union};
use crate::model::{Resolution, Schema, SchemaOrRef, SchemaType};

use super::{Lowering, ALTERNATIVE_NAME};

/// Wrap what a field cannot hold directly (a repeated marker or a map) into a
/// single-field message. Anything else comes back untouched.
pub fn boxed(name: &str, decl: Decl, comment: Option<&str>) -> Decl {
    let (wrapper, field) = match &decl {
        Decl::Repeated(_) => (format!("{name}Array"), "Items"),
        Decl::Map(_) => (format!("{name}Map"), "Entries"),
        _ => return decl,
    };
    let mut message = Message::new(wrapper, comment);
    let ty = hoist(decl, &mut message.nested);
    message.fields.push(Field { name: field.to_string(), number: 1, ty, comment: None });
    Decl::Message(message)
}

impl<'a> Lowering<'a> {
    pub(super) fn lower_object(&mut self, name: &str, schema: &'a Schema) -> Result<Message, CompileError> {
        let mut message = Message::new(name, schema.description.as_deref());
        self.append_properties(&mut message, schema)?;
        Ok(message)
    }

    /// `allOf`: one message, one numbering sequence across all members.
    pub(super) fn lower_composition(&mut self, name: &str, schema: &'a Schema) -> Result<Message, CompileError> {
        let mut message = Message::new(name, schema.description.as_deref());
        for (position, member) in schema.all_of.iter().enumerate() {
            let object = self.composition_member(name, position + 1, member)?;
            self.append_properties(&mut message, object)?;
        }
        Ok(message)
    }

    /// `oneOf`: a wrapper holding one oneof field per alternative.
    pub(super) fn lower_union(&mut self, name: &str, schema: &'a Schema) -> Result<Union, CompileError> {
        let mut union = Union::new(name, schema.description.as_deref());
        for alternative in &schema.one_of {
            let ty = self.lower(ALTERNATIVE_NAME, alternative)?;
            // oneof members can be neither repeated nor maps
            let ty = boxed(ALTERNATIVE_NAME, ty, None);
            let field = format!("{}Value", strip_namespace(&ty.name()));
            if union.fields.iter().any(|f| normalize_ident(&f.name) == normalize_ident(&field)) {
                return Err(CompileError::DuplicateAlternative { schema: name.to_string(), field });
            }
            let ty = hoist(ty, &mut union.nested);
            let number = union.fields.len() as u32 + 1;
            union.fields.push(Field {
                name: field,
                number,
                ty,
                comment: alternative.description().map(str::to_string),
            });
        }
        Ok(union)
    }

    /// Follow a member down to the object it stands for.
    fn composition_member(
        &self,
        name: &str,
        position: usize,
        member: &'a SchemaOrRef,
    ) -> Result<&'a Schema, CompileError> {
        let mut node = member;
        let mut seen: Vec<&str> = Vec::new();
        loop {
            let reference = match node {
                SchemaOrRef::Schema(schema) if schema.is(&SchemaType::Object) => return Ok(schema),
                SchemaOrRef::Schema(schema) => {
                    let found = schema.kind.as_ref().map(SchemaType::as_str).unwrap_or("untyped");
                    return Err(CompileError::InvalidCompositionMember {
                        schema: name.to_string(),
                        member: position,
                        reason: format!("is {found}, not an object"),
                    });
                }
                SchemaOrRef::Reference(reference) => reference,
            };
            if seen.contains(&reference.pointer.as_str()) {
                return Err(CompileError::CyclicReference {
                    schema: name.to_string(),
                    pointer: reference.pointer.clone(),
                });
            }
            seen.push(&reference.pointer);
            let unresolved = || CompileError::UnresolvedReference {
                schema: name.to_string(),
                pointer: reference.pointer.clone(),
            };
            node = match &reference.resolution {
                Some(Resolution::Local { target, .. }) => self.document.lookup(target).ok_or_else(unresolved)?,
                Some(Resolution::External { .. }) => {
                    return Err(CompileError::InvalidCompositionMember {
                        schema: name.to_string(),
                        member: position,
                        reason: format!("`{}` lives in another document", reference.pointer),
                    });
                }
                None => return Err(unresolved()),
            };
        }
    }

    /// Append `schema`'s properties as fields of `message`, numbering on from
    /// the fields already there. A name already taken keeps its first field.
    pub(super) fn append_properties(&mut self, message: &mut Message, schema: &'a Schema) -> Result<(), CompileError> {
        if !schema.explicit_order.is_empty() {
            let skipped: Vec<&String> = schema
                .properties
                .keys()
                .filter(|key| !schema.explicit_order.contains(*key))
                .collect();
            for property in skipped {
                self.warn(format!("{}: `{property}` is not in x-properties-order, skipped", message.name));
            }
        }

        for property in schema.ordered_properties() {
            let node = schema.properties.get(property).ok_or_else(|| CompileError::UnknownOrderedProperty {
                schema: message.name.clone(),
                property: property.to_string(),
            })?;
            if message.has_field(property) {
                self.warn(format!("{}: duplicate field `{property}`, keeping the first", message.name));
                continue;
            }
            let ty = self.lower(&format!("{}_{property}", message.name), node)?;
            let ty = hoist(ty, &mut message.nested);
            let number = message.next_number();
            message.fields.push(Field {
                name: property.to_string(),
                number,
                ty,
                comment: node.description().map(str::to_string),
            });
        }
        Ok(())
    }
}
