//! Schema → declaration IR.
//!
//! [`Lowering::lower`] is a single match over [`Shape`], the closed set of
//! schema shapes in dispatch precedence order. Lowering never touches a parent
//! declaration: it returns the new node and the caller decides whether it is
//! top-level or gets hoisted into an enclosing message (see [`crate::ir::hoist`]).
pub mod enumeration;
pub mod message;
pub mod scalar;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CompileError, Diagnostic};
use crate::ir::{normalize_ident, Decl, OpenMap};
use crate::model::{AdditionalProperties, Document, Reference, Resolution, Schema, SchemaOrRef, SchemaType};
use crate::options::GenerationOptions;

pub use message::boxed;

/// Base name for every `oneOf` alternative.
pub const ALTERNATIVE_NAME: &str = "Variant";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// What a node compiles as. Earlier variants take precedence.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Reference(&'a Reference),
    Union(&'a Schema),
    Composition(&'a Schema),
    OpenMap(&'a Schema, &'a AdditionalProperties),
    Object(&'a Schema),
    Array(&'a Schema),
    Enum(&'a Schema, &'a [Value]),
    Scalar(&'a Schema),
}

/// External packages used so far: package → import path, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    by_package: IndexMap<String, String>,
}

/// Result of lowering one top-level schema.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub decl: Decl,
    pub imports: Imports,
    pub warnings: Vec<Diagnostic>,
}

/// Per-schema lowering state. One instance per top-level schema, so a failed
/// schema leaves no trace in the document-wide accumulators.
pub struct Lowering<'a> {
    document: &'a Document,
    options: &'a GenerationOptions,
    schema: String,
    imports: Imports,
    following: Vec<&'a str>,
    warnings: Vec<Diagnostic>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Shape<'a> {
    pub fn of(node: &'a SchemaOrRef) -> Self {
        match node {
            SchemaOrRef::Reference(reference) => Shape::Reference(reference),
            SchemaOrRef::Schema(schema) => Shape::of_schema(schema),
        }
    }

    pub fn of_schema(schema: &'a Schema) -> Self {
        if !schema.one_of.is_empty() {
            return Shape::Union(schema);
        }
        if !schema.all_of.is_empty() {
            return Shape::Composition(schema);
        }
        if let Some(additional) = &schema.additional_properties {
            return Shape::OpenMap(schema, additional);
        }
        match (&schema.kind, &schema.enum_values) {
            (Some(SchemaType::Object), _) => Shape::Object(schema),
            (Some(SchemaType::Array), _) => Shape::Array(schema),
            (Some(SchemaType::String) | None, Some(values)) => Shape::Enum(schema, values),
            _ => Shape::Scalar(schema),
        }
    }

    /// Shapes that become a named declaration; references to them stay by-name.
    pub fn declares(&self) -> bool {
        matches!(self, Shape::Union(_) | Shape::Composition(_) | Shape::Object(_) | Shape::Enum(..))
    }
}

impl Imports {
    /// First use of a package wins; later uses are no-ops.
    pub fn record(&mut self, package: &str, path: &str) {
        if !self.by_package.contains_key(package) {
            self.by_package.insert(package.to_string(), path.to_string());
        }
    }

    pub fn merge(&mut self, other: Imports) {
        for (package, path) in other.by_package {
            self.record(&package, &path);
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.by_package.values().map(String::as_str)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.by_package.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_package.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_package.is_empty()
    }
}

/// Lower the top-level schema `name` of an already-resolved document.
pub fn lower_schema(document: &Document, options: &GenerationOptions, name: &str) -> Option<Result<Lowered, CompileError>> {
    let node = document.components.schemas.get(name)?;
    Some(Lowering::new(document, options, name).lower_top_level(node))
}

impl<'a> Lowering<'a> {
    pub fn new(document: &'a Document, options: &'a GenerationOptions, schema: &str) -> Self {
        Self {
            document,
            options,
            schema: schema.to_string(),
            imports: Imports::default(),
            following: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Lower a top-level node. Arrays and maps cannot stand alone in the
    /// output, so they are boxed (or rejected when boxing is off).
    pub fn lower_top_level(mut self, node: &'a SchemaOrRef) -> Result<Lowered, CompileError> {
        debug!(schema = %self.schema, "lowering");
        let name = self.schema.clone();
        let decl = self.lower(&name, node)?;
        let decl = match decl {
            Decl::Repeated(_) | Decl::Map(_) if !self.options.box_top_level => {
                let shape = if decl.is_repeated() { "array" } else { "open map" };
                return Err(CompileError::UnsupportedTopLevelShape { schema: name, shape });
            }
            other => boxed(&name, other, node.description()),
        };
        Ok(Lowered { decl, imports: self.imports, warnings: self.warnings })
    }

    pub fn lower(&mut self, name: &str, node: &'a SchemaOrRef) -> Result<Decl, CompileError> {
        match Shape::of(node) {
            Shape::Reference(reference) => self.lower_reference(name, reference),
            Shape::Union(schema) => self.lower_union(name, schema).map(Decl::Union),
            Shape::Composition(schema) => self.lower_composition(name, schema).map(Decl::Message),
            Shape::OpenMap(schema, additional) => self.lower_open_map(name, schema, additional),
            Shape::Object(schema) => self.lower_object(name, schema).map(Decl::Message),
            Shape::Array(schema) => self.lower_array(name, schema),
            Shape::Enum(schema, values) => self.lower_enum(name, schema, values).map(Decl::Enum),
            Shape::Scalar(schema) => scalar::type_name(schema)
                .map(Decl::TypeName)
                .ok_or_else(|| CompileError::UntypedSchema { schema: name.to_string() }),
        }
    }

    fn lower_reference(&mut self, name: &str, reference: &'a Reference) -> Result<Decl, CompileError> {
        match &reference.resolution {
            Some(Resolution::External { package, name: target, import }) => {
                self.imports.record(package, import);
                let package = self.options.package_name(package);
                Ok(Decl::type_name(format!("{package}.{}", normalize_ident(target))))
            }
            Some(Resolution::Local { name: canonical, target }) => {
                let Some(node) = self.document.lookup(target) else {
                    return Ok(self.placeholder(reference));
                };
                if let SchemaOrRef::Schema(schema) = node {
                    if Shape::of_schema(schema).declares() {
                        return Ok(Decl::type_name(canonical.clone()));
                    }
                }
                // scalars, arrays, maps and reference chains are inlined
                self.follow(name, reference, node)
            }
            None => Ok(self.placeholder(reference)),
        }
    }

    fn follow(&mut self, name: &str, reference: &'a Reference, node: &'a SchemaOrRef) -> Result<Decl, CompileError> {
        if self.following.contains(&reference.pointer.as_str()) {
            return Err(CompileError::CyclicReference {
                schema: name.to_string(),
                pointer: reference.pointer.clone(),
            });
        }
        self.following.push(&reference.pointer);
        let out = self.lower(name, node);
        self.following.pop();
        out
    }

    /// Best effort for a reference the resolver could not bind: the pointer's
    /// last segment, which is right whenever the target exists elsewhere.
    fn placeholder(&self, reference: &Reference) -> Decl {
        debug!(pointer = %reference.pointer, "unresolved reference emitted by name");
        Decl::type_name(normalize_ident(reference.trailing_name()))
    }

    fn lower_array(&mut self, name: &str, schema: &'a Schema) -> Result<Decl, CompileError> {
        let items = schema
            .items
            .as_ref()
            .ok_or_else(|| CompileError::MissingItems { schema: name.to_string() })?;
        let elem = format!("{name}Elem");
        let item = self.lower(&elem, items)?;
        Ok(Decl::Repeated(Box::new(boxed(&elem, item, None))))
    }

    fn lower_open_map(
        &mut self,
        name: &str,
        schema: &'a Schema,
        additional: &'a AdditionalProperties,
    ) -> Result<Decl, CompileError> {
        if !schema.is(&SchemaType::Object) {
            let found = schema.kind.as_ref().map(SchemaType::as_str).unwrap_or("no type");
            return Err(CompileError::InvalidOpenMapShape {
                schema: name.to_string(),
                reason: format!("schema must be an object, found {found}"),
            });
        }
        let value = match additional {
            AdditionalProperties::Schema(value) => value,
            AdditionalProperties::Bool(flag) => {
                return Err(CompileError::InvalidOpenMapShape {
                    schema: name.to_string(),
                    reason: format!("`{flag}` carries no value schema"),
                });
            }
        };
        if !schema.properties.is_empty() {
            self.warn(format!("{name}: properties next to additionalProperties are ignored"));
        }
        let elem = format!("{name}Elem");
        let value = self.lower(&elem, value)?;
        Ok(Decl::Map(OpenMap {
            name: name.to_string(),
            key: "string".to_string(),
            value: Box::new(boxed(&elem, value, None)),
        }))
    }

    fn warn(&mut self, message: String) {
        warn!(schema = %self.schema, "{message}");
        self.warnings.push(Diagnostic::warning(&self.schema, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, Message, TypeName};
    use crate::resolve::resolve_document;

    pub(crate) fn lower(src: &str, name: &str, options: &GenerationOptions) -> Result<Lowered, CompileError> {
        let mut document = Document::from_yaml_str(src).unwrap();
        resolve_document(&mut document, None);
        lower_schema(&document, options, name).unwrap()
    }

    pub(crate) fn message(decl: &Decl) -> &Message {
        match decl {
            Decl::Message(m) => m,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    fn field_types(m: &Message) -> Vec<(String, String, bool)> {
        m.fields.iter().map(|f: &Field| (f.name.clone(), f.ty.name(), f.ty.is_repeated())).collect()
    }

    const SHAPES: &str = r##"
components:
  schemas:
    Pet:
      type: object
      properties:
        name: { type: string }
        tag: { $ref: '#/components/schemas/Tag' }
        owner: { $ref: '#/components/schemas/Owner' }
        ids: { $ref: '#/components/schemas/Ids' }
        labels: { $ref: '#/components/schemas/Labels' }
        missing: { $ref: '#/components/schemas/Missing' }
    Tag: { type: string, format: binary }
    Owner:
      type: object
      properties:
        id: { type: integer }
    Ids:
      type: array
      items: { type: integer, format: int64 }
    Labels:
      type: object
      additionalProperties: { type: string }
    Alias: { $ref: '#/components/schemas/Tag' }
    LoopA: { $ref: '#/components/schemas/LoopB' }
    LoopB: { $ref: '#/components/schemas/LoopA' }
    Untyped: { description: anything }
    BadMap:
      type: string
      additionalProperties: { type: string }
    FlagMap:
      type: object
      additionalProperties: true
    NoItems: { type: array }
"##;

    #[test]
    fn shape_precedence() {
        let doc = Document::from_yaml_str(
            "components:\n  schemas:\n    X:\n      type: object\n      oneOf: [{type: string}]\n      allOf: [{type: object}]\n      additionalProperties: {type: string}\n",
        )
        .unwrap();
        assert!(matches!(Shape::of(&doc.components.schemas["X"]), Shape::Union(_)));
        let enum_without_type = Document::from_yaml_str("components:\n  schemas:\n    E:\n      enum: [a]\n").unwrap();
        assert!(matches!(Shape::of(&enum_without_type.components.schemas["E"]), Shape::Enum(..)));
        let integer_enum = Document::from_yaml_str("components:\n  schemas:\n    E:\n      type: integer\n      enum: [1, 2]\n").unwrap();
        assert!(matches!(Shape::of(&integer_enum.components.schemas["E"]), Shape::Scalar(_)));
    }

    #[test]
    fn references_to_declarations_stay_by_name_and_scalars_inline() {
        let lowered = lower(SHAPES, "Pet", &GenerationOptions::default()).unwrap();
        let pet = message(&lowered.decl);
        assert!(pet.nested.is_empty());
        assert_eq!(
            field_types(pet),
            vec![
                ("ids".into(), "int64".into(), true),
                ("labels".into(), "map<string, string>".into(), false),
                ("missing".into(), "Missing".into(), false),
                ("name".into(), "string".into(), false),
                ("owner".into(), "Owner".into(), false),
                ("tag".into(), "bytes".into(), false),
            ]
        );
        let numbers: Vec<u32> = pet.fields.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn alias_of_scalar_declares_nothing() {
        let lowered = lower(SHAPES, "Alias", &GenerationOptions::default()).unwrap();
        assert_eq!(lowered.decl, Decl::TypeName(TypeName { name: "bytes".into() }));
    }

    #[test]
    fn pure_reference_cycles_are_errors() {
        let err = lower(SHAPES, "LoopA", &GenerationOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::CyclicReference { .. }), "{err}");
    }

    #[test]
    fn shape_errors_are_values() {
        let opts = GenerationOptions::default();
        assert!(matches!(lower(SHAPES, "Untyped", &opts), Err(CompileError::UntypedSchema { .. })));
        assert!(matches!(lower(SHAPES, "BadMap", &opts), Err(CompileError::InvalidOpenMapShape { .. })));
        assert!(matches!(lower(SHAPES, "FlagMap", &opts), Err(CompileError::InvalidOpenMapShape { .. })));
        assert!(matches!(lower(SHAPES, "NoItems", &opts), Err(CompileError::MissingItems { .. })));
    }

    #[test]
    fn top_level_arrays_and_maps_are_boxed() {
        let opts = GenerationOptions::default();
        let ids = lower(SHAPES, "Ids", &opts).unwrap();
        let ids = message(&ids.decl);
        assert_eq!(ids.name, "IdsArray");
        assert_eq!(field_types(ids), vec![("Items".into(), "int64".into(), true)]);
        assert_eq!(ids.fields[0].number, 1);

        let labels = lower(SHAPES, "Labels", &opts).unwrap();
        let labels = message(&labels.decl);
        assert_eq!(labels.name, "LabelsMap");
        assert_eq!(field_types(labels), vec![("Entries".into(), "map<string, string>".into(), false)]);
    }

    #[test]
    fn boxing_can_be_disabled() {
        let opts = GenerationOptions { box_top_level: false, ..GenerationOptions::default() };
        let err = lower(SHAPES, "Ids", &opts).unwrap_err();
        assert_eq!(err, CompileError::UnsupportedTopLevelShape { schema: "Ids".into(), shape: "array" });
    }

    #[test]
    fn external_references_qualify_and_record_imports() {
        let src = r##"
components:
  schemas:
    Price:
      type: object
      properties:
        amount: { $ref: 'common.yaml#/components/schemas/Money' }
        currency: { $ref: 'common.yaml#/components/schemas/Currency' }
        stamp: { $ref: 'time.yaml#/components/schemas/Stamp', x-package: google.protobuf }
"##;
        let mut opts = GenerationOptions::default();
        opts.package_renames.insert("common".into(), "acme.common".into());
        let lowered = lower(src, "Price", &opts).unwrap();
        let price = message(&lowered.decl);
        assert_eq!(price.fields[0].ty.name(), "acme.common.Money");
        assert_eq!(price.fields[1].ty.name(), "acme.common.Currency");
        assert_eq!(price.fields[2].ty.name(), "google.protobuf.Stamp");
        assert_eq!(lowered.imports.packages().collect::<Vec<_>>(), vec!["common", "google.protobuf"]);
        assert_eq!(lowered.imports.paths().collect::<Vec<_>>(), vec!["common.proto", "time.proto"]);
    }
}
