use std::path::Path;

use crate::ir::normalize_ident;

/// Location of a node inside `components.schemas`: the top-level name followed
/// by the chain of `properties` keys leading down to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPath {
    pub root: String,
    pub properties: Vec<String>,
}

impl SchemaPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self { root: name.into(), properties: Vec::new() }
    }

    pub fn child(&self, property: &str) -> Self {
        let mut properties = self.properties.clone();
        properties.push(property.to_string());
        Self { root: self.root.clone(), properties }
    }
}

/// What a `$ref` was bound to by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Points into the current document.
    Local { name: String, target: SchemaPath },
    /// Points into another document, compiled into another proto package.
    External { package: String, name: String, import: String },
}

/// A `$ref` node. `resolution` stays `None` until the resolver binds it, and
/// once bound it never changes.
#[derive(Debug, Clone)]
pub struct Reference {
    /// `$ref`
    pub pointer: String,
    pub description: Option<String>,
    /// `x-package`: overrides the package derived from the external document's file name.
    pub package: Option<String>,
    pub resolution: Option<Resolution>,
}

impl Reference {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self { pointer: pointer.into(), description: None, package: None, resolution: None }
    }

    /// `(document, fragment)`; the document part is empty for local pointers.
    pub fn split(&self) -> (&str, &str) {
        match self.pointer.split_once('#') {
            Some((document, fragment)) => (document, fragment),
            None => (self.pointer.as_str(), ""),
        }
    }

    pub fn is_external(&self) -> bool {
        !self.split().0.is_empty()
    }

    /// Last segment of the pointer, e.g. `Pet` for `#/components/schemas/Pet`.
    pub fn trailing_name(&self) -> &str {
        let (document, fragment) = self.split();
        let path = if fragment.is_empty() { document } else { fragment };
        path.rsplit('/').find(|segment| !segment.is_empty()).unwrap_or(path)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Binding for a pointer into another document. `None` for local pointers.
    pub(crate) fn external_resolution(&self) -> Option<Resolution> {
        if !self.is_external() {
            return None;
        }
        let (document, _) = self.split();
        let document = document.trim_start_matches("./");
        let stem = Path::new(document)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| document.to_string());
        let package = self.package.clone().unwrap_or_else(|| normalize_ident(&stem));
        let import = Path::new(document).with_extension("proto").to_string_lossy().into_owned();
        Some(Resolution::External { package, name: self.trailing_name().to_string(), import })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_pointer_splits_into_fragment() {
        let r = Reference::new("#/components/schemas/Pet");
        assert_eq!(r.split(), ("", "/components/schemas/Pet"));
        assert!(!r.is_external());
        assert_eq!(r.trailing_name(), "Pet");
        assert_eq!(r.external_resolution(), None);
    }

    #[test]
    fn external_pointer_derives_package_and_import() {
        let r = Reference::new("./defs/common-types.yaml#/components/schemas/Money");
        assert_eq!(
            r.external_resolution(),
            Some(Resolution::External {
                package: "common_types".into(),
                name: "Money".into(),
                import: "defs/common-types.proto".into(),
            })
        );
    }

    #[test]
    fn explicit_package_wins_over_file_stem() {
        let mut r = Reference::new("common.yaml#/components/schemas/Money");
        r.package = Some("acme.common".into());
        match r.external_resolution() {
            Some(Resolution::External { package, import, .. }) => {
                assert_eq!(package, "acme.common");
                assert_eq!(import, "common.proto");
            }
            other => panic!("expected external resolution, got {other:?}"),
        }
    }
}
