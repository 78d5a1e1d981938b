//! `$ref` resolution.
//!
//! Two passes so that cycles between schemas are harmless:
//! 1. [`build_index`] registers every top-level schema and, recursively, every
//!    nested `properties` entry under its JSON pointer.
//! 2. [`resolve`] walks the references reachable from the chosen roots and
//!    binds each one to an index entry. Binding only records a name and a
//!    location, never a compiled form.
//!
//! Sub-level indexing follows `properties` only; nodes under `items`, `allOf`,
//! `oneOf` or `anyOf` cannot be the target of a pointer.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::error::Diagnostic;
use crate::ir::normalize_ident;
use crate::model::{Document, Reference, Resolution, SchemaOrRef, SchemaPath};

pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Canonical display name, qualified for nested entries (`Pet.Pet_owner`).
    pub name: String,
    pub target: SchemaPath,
}

/// Pointer → entry.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl NameIndex {
    pub fn get(&self, pointer: &str) -> Option<&IndexEntry> {
        self.entries.get(pointer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    pub resolved: usize,
    pub external: usize,
    pub diagnostics: Vec<Diagnostic>,
}

// ------------------------------- Pass 1 ---------------------------------- //

pub fn build_index(document: &Document) -> NameIndex {
    let mut index = NameIndex::default();
    for (name, node) in &document.components.schemas {
        let pointer = format!("{COMPONENTS_PREFIX}{}", escape_segment(name));
        let path = SchemaPath::root(name.clone());
        let display = normalize_ident(name);
        index.entries.insert(pointer.clone(), IndexEntry { name: display.clone(), target: path.clone() });
        index_properties(&mut index, node, &pointer, &display, name, &path);
    }
    debug!(entries = index.len(), "built reference index");
    index
}

/// `local` is the raw name the compiler gives this node's declaration; each
/// display segment is its emitted identifier, so the qualified name links to
/// what actually gets declared.
fn index_properties(
    index: &mut NameIndex,
    node: &SchemaOrRef,
    pointer: &str,
    display: &str,
    local: &str,
    path: &SchemaPath,
) {
    let Some(schema) = node.as_schema() else { return };
    for (property, child) in &schema.properties {
        let child_pointer = format!("{pointer}/properties/{}", escape_segment(property));
        let child_local = format!("{local}_{property}");
        let child_display = format!("{display}.{}", normalize_ident(&child_local));
        let child_path = path.child(property);
        index.entries.insert(
            child_pointer.clone(),
            IndexEntry { name: child_display.clone(), target: child_path.clone() },
        );
        index_properties(index, child, &child_pointer, &child_display, &child_local, &child_path);
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

// ------------------------------- Pass 2 ---------------------------------- //

/// Bind every reference reachable from `roots` (all top-level schemas when
/// `None`). With explicit roots, every top-level schema a bound reference
/// lands in is walked too. Misses are reported, never fatal.
pub fn resolve(document: &mut Document, index: &NameIndex, roots: Option<&[String]>) -> ResolveReport {
    let mut report = ResolveReport::default();
    let mut queue: VecDeque<String> = match roots {
        Some(roots) => roots.iter().cloned().collect(),
        None => document.components.schemas.keys().cloned().collect(),
    };
    let mut visited = BTreeSet::new();

    while let Some(root) = queue.pop_front() {
        if !visited.insert(root.clone()) {
            continue;
        }
        let Some(node) = document.components.schemas.get_mut(&root) else {
            warn!(schema = %root, "filtered schema does not exist");
            report.diagnostics.push(Diagnostic::warning(&root, "no such schema in components"));
            continue;
        };
        let mut reached = Vec::new();
        resolve_node(node, index, &root, &mut report, &mut reached);
        if roots.is_some() {
            queue.extend(reached.into_iter().filter(|name| !visited.contains(name)));
        }
    }
    report
}

/// Build the index and resolve in one go.
pub fn resolve_document(document: &mut Document, roots: Option<&[String]>) -> ResolveReport {
    let index = build_index(document);
    resolve(document, &index, roots)
}

fn resolve_node(
    node: &mut SchemaOrRef,
    index: &NameIndex,
    schema: &str,
    report: &mut ResolveReport,
    reached: &mut Vec<String>,
) {
    match node {
        SchemaOrRef::Reference(reference) => bind(reference, index, schema, report, reached),
        SchemaOrRef::Schema(inner) => {
            for child in inner.children_mut() {
                resolve_node(child, index, schema, report, reached);
            }
        }
    }
}

fn bind(
    reference: &mut Reference,
    index: &NameIndex,
    schema: &str,
    report: &mut ResolveReport,
    reached: &mut Vec<String>,
) {
    // already bound: keep the first binding
    if let Some(resolution) = &reference.resolution {
        if let Resolution::Local { target, .. } = resolution {
            reached.push(target.root.clone());
        }
        return;
    }

    if let Some(external) = reference.external_resolution() {
        debug!(pointer = %reference.pointer, "external reference");
        reference.resolution = Some(external);
        report.external += 1;
        return;
    }

    match index.get(&reference.pointer) {
        Some(entry) => {
            debug!(pointer = %reference.pointer, name = %entry.name, "resolved");
            reached.push(entry.target.root.clone());
            reference.resolution = Some(Resolution::Local {
                name: entry.name.clone(),
                target: entry.target.clone(),
            });
            report.resolved += 1;
        }
        None => {
            warn!(schema, pointer = %reference.pointer, "cannot resolve reference");
            report.diagnostics.push(Diagnostic::warning(
                schema,
                format!("unresolved reference `{}`", reference.pointer),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(src: &str) -> Document {
        Document::from_yaml_str(src).unwrap()
    }

    const CYCLIC: &str = r##"
components:
  schemas:
    Node:
      type: object
      properties:
        next: { $ref: '#/components/schemas/Node' }
        owner:
          type: object
          properties:
            address:
              type: object
              properties:
                city: { type: string }
        tags:
          type: array
          items: { $ref: '#/components/schemas/Tag' }
    Tag:
      type: string
    Lonely:
      type: object
      properties:
        ghost: { $ref: '#/components/schemas/Ghost' }
        city: { $ref: '#/components/schemas/Node/properties/owner/properties/address' }
"##;

    fn resolution_of<'a>(document: &'a Document, path: &SchemaPath) -> Option<&'a Resolution> {
        document.lookup(path)?.as_reference()?.resolution.as_ref()
    }

    #[test]
    fn index_covers_nested_properties_only() {
        let d = doc(CYCLIC);
        let index = build_index(&d);
        assert_eq!(index.get("#/components/schemas/Node").unwrap().name, "Node");
        let address = index
            .get("#/components/schemas/Node/properties/owner/properties/address")
            .unwrap();
        assert_eq!(address.name, "Node.Node_owner.Node_owner_address");
        assert_eq!(address.target, SchemaPath::root("Node").child("owner").child("address"));
        // items are not indexed
        assert!(index.get("#/components/schemas/Node/properties/tags/items").is_none());
    }

    #[test]
    fn self_references_and_nested_pointers_bind() {
        let mut d = doc(CYCLIC);
        let report = resolve_document(&mut d, None);
        assert_eq!(report.resolved, 3);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].message.contains("Ghost"));

        match resolution_of(&d, &SchemaPath::root("Node").child("next")) {
            Some(Resolution::Local { name, target }) => {
                assert_eq!(name, "Node");
                assert_eq!(target, &SchemaPath::root("Node"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match resolution_of(&d, &SchemaPath::root("Lonely").child("city")) {
            Some(Resolution::Local { name, .. }) => assert_eq!(name, "Node.Node_owner.Node_owner_address"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(resolution_of(&d, &SchemaPath::root("Lonely").child("ghost")).is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut d = doc(CYCLIC);
        let index = build_index(&d);
        resolve(&mut d, &index, None);
        let before = resolution_of(&d, &SchemaPath::root("Node").child("next")).cloned();
        let again = resolve(&mut d, &index, None);
        assert_eq!(again.resolved, 0);
        assert_eq!(resolution_of(&d, &SchemaPath::root("Node").child("next")).cloned(), before);
    }

    #[test]
    fn filtered_roots_pull_in_referenced_schemas() {
        let src = r##"
components:
  schemas:
    A:
      type: object
      properties:
        b: { $ref: '#/components/schemas/B' }
    B:
      type: array
      items: { $ref: '#/components/schemas/C' }
    C:
      type: object
      properties:
        x: { type: string }
    D:
      type: object
      properties:
        c: { $ref: '#/components/schemas/C' }
"##;
        let mut d = doc(src);
        let report = resolve_document(&mut d, Some(&["A".to_string()]));
        assert_eq!(report.resolved, 2);
        let items = d.components.schemas["B"].as_schema().unwrap().items.as_ref().unwrap();
        assert!(items.as_reference().unwrap().is_resolved());
        // D is neither filtered nor reachable
        assert!(resolution_of(&d, &SchemaPath::root("D").child("c")).is_none());
    }

    #[test]
    fn external_pointers_bypass_the_index() {
        let mut d = doc(
            "components:\n  schemas:\n    Price:\n      type: object\n      properties:\n        amount: { $ref: 'common.yaml#/components/schemas/Money' }\n",
        );
        let report = resolve_document(&mut d, None);
        assert_eq!(report.external, 1);
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            resolution_of(&d, &SchemaPath::root("Price").child("amount")),
            Some(&Resolution::External {
                package: "common".into(),
                name: "Money".into(),
                import: "common.proto".into(),
            })
        );
    }

    #[test]
    fn canonical_names_are_emitted_identifiers() {
        let d = doc(
            "components:\n  schemas:\n    v1.Pod:\n      type: object\n      properties:\n        owner-info:\n          type: object\n",
        );
        let index = build_index(&d);
        assert_eq!(index.get("#/components/schemas/v1.Pod").unwrap().name, "v1_Pod");
        let nested = index.get("#/components/schemas/v1.Pod/properties/owner-info").unwrap();
        assert_eq!(nested.name, "v1_Pod.v1_Pod_owner_info");
        assert_eq!(nested.target, SchemaPath::root("v1.Pod").child("owner-info"));
    }
}
