// Declaration IR for codegen. No source-document types here.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    TypeName(TypeName),      // scalar or by-name link, declares nothing
    Enum(Enum),
    Map(OpenMap),            // map<string, value>, declares nothing itself
    Repeated(Box<Decl>),     // marker, only valid as a field type
    Message(Message),
    Union(Union),            // wrapper message around a oneof
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub values: Vec<String>,   // ordinal = position
    pub prefix: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenMap {
    pub name: String,
    pub key: String,
    pub value: Box<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub nested: Vec<Decl>,     // owned, declared before the fields
    pub fields: Vec<Field>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    pub name: String,
    pub nested: Vec<Decl>,
    pub fields: Vec<Field>,    // one per alternative
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub number: u32,
    pub ty: Decl,              // after hoisting: TypeName, Map or Repeated(TypeName)
    pub comment: Option<String>,
}

impl Decl {
    pub fn type_name(name: impl Into<String>) -> Self {
        Decl::TypeName(TypeName { name: name.into() })
    }

    /// Name as it appears in a field's type position.
    pub fn name(&self) -> String {
        match self {
            Decl::TypeName(t) => t.name.clone(),
            Decl::Enum(e) => e.name.clone(),
            Decl::Map(m) => format!("map<{}, {}>", m.key, m.value.name()),
            Decl::Repeated(inner) => inner.name(),
            Decl::Message(m) => m.name.clone(),
            Decl::Union(u) => u.name.clone(),
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, Decl::Repeated(_))
    }

    /// Whether this node produces declaration text of its own.
    pub fn is_declaration(&self) -> bool {
        matches!(self, Decl::Enum(_) | Decl::Message(_) | Decl::Union(_))
    }
}

impl Message {
    pub fn new(name: impl Into<String>, comment: Option<&str>) -> Self {
        Self { name: name.into(), nested: Vec::new(), fields: Vec::new(), comment: comment.map(str::to_string) }
    }

    pub fn next_number(&self) -> u32 {
        self.fields.len() as u32 + 1
    }

    /// Compares emitted identifiers, so `owner-info` and `owner_info` collide.
    pub fn has_field(&self, name: &str) -> bool {
        let ident = normalize_ident(name);
        self.fields.iter().any(|f| normalize_ident(&f.name) == ident)
    }
}

impl Union {
    pub fn new(name: impl Into<String>, comment: Option<&str>) -> Self {
        Self { name: name.into(), nested: Vec::new(), fields: Vec::new(), comment: comment.map(str::to_string) }
    }
}

/// Move every owned declaration inside a field type into `nested`, leaving
/// by-name links behind. The caller owns the nested list.
pub fn hoist(decl: Decl, nested: &mut Vec<Decl>) -> Decl {
    match decl {
        Decl::Enum(_) | Decl::Message(_) | Decl::Union(_) => {
            let link = Decl::type_name(normalize_ident(&decl.name()));
            nested.push(decl);
            link
        }
        Decl::Repeated(inner) => Decl::Repeated(Box::new(hoist(*inner, nested))),
        Decl::Map(mut map) => {
            map.value = Box::new(hoist(*map.value, nested));
            Decl::Map(map)
        }
        Decl::TypeName(_) => decl,
    }
}

// ---- identifiers ----

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Make a source name usable as a single proto identifier: `v1.Pod` → `v1_Pod`.
pub fn normalize_ident(name: &str) -> String {
    let cleaned = NON_IDENT.replace_all(name, "_");
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{cleaned}")
    } else {
        cleaned.into_owned()
    }
}

/// Normalize a type reference segment by segment. Only names the compiler
/// joins itself (`package.Name`, `Parent.Nested`) should reach this with dots.
pub fn normalize_name(name: &str) -> String {
    name.split('.').map(normalize_ident).collect::<Vec<_>>().join(".")
}

/// Drop a namespace qualifier: `acme.common.Money` → `Money`.
pub fn strip_namespace(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}
