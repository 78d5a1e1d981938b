//! OpenAPI `components.schemas` → proto3.
//!
//! Pipeline: [`model`] (typed document) → [`resolve`] (bind `$ref`s) →
//! [`lower`] (schema shapes → declaration [`ir`]) → [`codegen`] (text).
//! [`compile`] drives the whole thing for one document.
pub mod codegen;
pub mod compile;
pub mod error;
pub mod ir;
pub mod lower;
pub mod model;
pub mod options;
pub mod path_de;
pub mod resolve;

pub use compile::{compile_document, to_proto, CompiledDocument};
pub use error::{CompileError, Diagnostic, LoadError, Severity};
pub use model::Document;
pub use options::{GenerationOptions, RunMode};
