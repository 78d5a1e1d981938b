//! proto3 text from the declaration IR.
//!
//! Output layout:
//! ```text
//! syntax = "proto3";
//! package <package>;
//! option <raw line>;
//! import "<path>";
//!
//! message Outer {
//! 	message Inner { ... }   // nested first
//! 	repeated Inner items = 1;
//! }
//! ```
//! Indentation is one tab per nesting level.
use crate::ir::{normalize_ident, normalize_name, Decl, Enum, Field, Message, Union};

/// Name of the oneof block inside a union wrapper.
pub const ONEOF_NAME: &str = "choice";

#[derive(Debug, Default)]
pub struct Codegen {
    out: String,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header<'i>(&mut self, package: Option<&str>, options: &[String], imports: impl IntoIterator<Item = &'i str>) {
        self.line(0, "syntax = \"proto3\";");
        if let Some(package) = package.filter(|p| !p.is_empty()) {
            self.line(0, &format!("package {package};"));
        }
        for option in options {
            self.line(0, &format!("option {};", option.trim().trim_end_matches(';')));
        }
        for import in imports {
            self.line(0, &format!("import \"{import}\";"));
        }
    }

    /// Emit a top-level node. Nodes that only name a type produce nothing.
    pub fn emit(&mut self, decl: &Decl) {
        if decl.is_declaration() {
            self.out.push('\n');
            self.declare(decl, 0);
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn declare(&mut self, decl: &Decl, depth: usize) {
        match decl {
            Decl::Message(message) => self.message(message, depth),
            Decl::Union(union) => self.union(union, depth),
            Decl::Enum(enumeration) => self.enumeration(enumeration, depth),
            // used inline by name only
            Decl::TypeName(_) | Decl::Map(_) | Decl::Repeated(_) => {}
        }
    }

    fn message(&mut self, message: &Message, depth: usize) {
        self.comment(depth, message.comment.as_deref());
        self.line(depth, &format!("message {} {{", normalize_ident(&message.name)));
        for nested in &message.nested {
            self.declare(nested, depth + 1);
        }
        for field in &message.fields {
            self.field(field, depth + 1);
        }
        self.line(depth, "}");
    }

    fn union(&mut self, union: &Union, depth: usize) {
        self.comment(depth, union.comment.as_deref());
        self.line(depth, &format!("message {} {{", normalize_ident(&union.name)));
        for nested in &union.nested {
            self.declare(nested, depth + 1);
        }
        self.line(depth + 1, &format!("oneof {ONEOF_NAME} {{"));
        for field in &union.fields {
            self.field(field, depth + 2);
        }
        self.line(depth + 1, "}");
        self.line(depth, "}");
    }

    fn enumeration(&mut self, enumeration: &Enum, depth: usize) {
        self.comment(depth, enumeration.comment.as_deref());
        self.line(depth, &format!("enum {} {{", normalize_ident(&enumeration.name)));
        let prefix = enumeration.prefix.as_deref().unwrap_or("");
        for (ordinal, value) in enumeration.values.iter().enumerate() {
            self.line(depth + 1, &format!("{prefix}{} = {ordinal};", normalize_ident(value)));
        }
        self.line(depth, "}");
    }

    fn field(&mut self, field: &Field, depth: usize) {
        let repeated = if field.ty.is_repeated() { "repeated " } else { "" };
        let mut text = format!(
            "{repeated}{} {} = {};",
            type_ref(&field.ty),
            normalize_ident(&field.name),
            field.number
        );
        if let Some(comment) = field.comment.as_deref().and_then(flatten_comment) {
            text.push_str(&format!(" /* {comment} */"));
        }
        self.line(depth, &text);
    }

    fn comment(&mut self, depth: usize, comment: Option<&str>) {
        if let Some(comment) = comment.and_then(flatten_comment) {
            self.line(depth, &format!("/* {comment} */"));
        }
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}

/// Type as written in a field declaration.
fn type_ref(decl: &Decl) -> String {
    match decl {
        Decl::Repeated(inner) => type_ref(inner),
        Decl::Map(map) => format!("map<{}, {}>", map.key, type_ref(&map.value)),
        other => normalize_name(&other.name()),
    }
}

/// One line, no comment terminator inside.
fn flatten_comment(text: &str) -> Option<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        None
    } else {
        Some(flat.replace("*/", "* /"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::OpenMap;
    use pretty_assertions::assert_eq;

    fn field(name: &str, number: u32, ty: Decl) -> Field {
        Field { name: name.into(), number, ty, comment: None }
    }

    fn render(decl: &Decl) -> String {
        let mut cg = Codegen::new();
        cg.emit(decl);
        cg.into_string()
    }

    #[test]
    fn header_lines_come_in_order() {
        let mut cg = Codegen::new();
        cg.header(
            Some("acme.pets"),
            &["go_package = \"acme/pets\";".to_string()],
            ["common.proto", "time.proto"],
        );
        assert_eq!(
            cg.into_string(),
            "syntax = \"proto3\";\npackage acme.pets;\noption go_package = \"acme/pets\";\nimport \"common.proto\";\nimport \"time.proto\";\n"
        );
    }

    #[test]
    fn message_declares_nested_before_fields() {
        let mut pet = Message::new("Pet", Some("a pet\n  with  spaces */ here"));
        pet.nested.push(Decl::Enum(Enum {
            name: "Pet_kind".into(),
            values: vec!["cat".into(), "dog-like".into()],
            prefix: Some("PET_KIND_".into()),
            comment: None,
        }));
        pet.fields.push(field("kind", 1, Decl::type_name("Pet_kind")));
        pet.fields.push(field("tags", 2, Decl::Repeated(Box::new(Decl::type_name("string")))));
        pet.fields.push(Field {
            comment: Some("free-form".into()),
            ..field(
                "labels",
                3,
                Decl::Map(OpenMap {
                    name: "Pet_labels".into(),
                    key: "string".into(),
                    value: Box::new(Decl::type_name("string")),
                }),
            )
        });

        assert_eq!(
            render(&Decl::Message(pet)),
            "\n/* a pet with spaces * / here */\nmessage Pet {\n\tenum Pet_kind {\n\t\tPET_KIND_cat = 0;\n\t\tPET_KIND_dog_like = 1;\n\t}\n\tPet_kind kind = 1;\n\trepeated string tags = 2;\n\tmap<string, string> labels = 3; /* free-form */\n}\n"
        );
    }

    #[test]
    fn union_renders_a_oneof_block() {
        let mut union = Union::new("Shape", None);
        union.nested.push(Decl::Message(Message::new("Variant", None)));
        union.fields.push(field("VariantValue", 1, Decl::type_name("Variant")));
        union.fields.push(field("stringValue", 2, Decl::type_name("string")));
        assert_eq!(
            render(&Decl::Union(union)),
            "\nmessage Shape {\n\tmessage Variant {\n\t}\n\toneof choice {\n\t\tVariant VariantValue = 1;\n\t\tstring stringValue = 2;\n\t}\n}\n"
        );
    }

    #[test]
    fn type_only_nodes_emit_nothing() {
        assert_eq!(render(&Decl::type_name("string")), "");
        assert_eq!(render(&Decl::Repeated(Box::new(Decl::type_name("Pet")))), "");
    }
}
