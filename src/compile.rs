//! Whole-document driver: resolve, lower every selected top-level schema in
//! name order, render.
use tracing::{info, warn};

use crate::codegen::Codegen;
use crate::error::{CompileError, Diagnostic};
use crate::ir::Decl;
use crate::lower::{Imports, Lowering};
use crate::model::Document;
use crate::options::GenerationOptions;
use crate::resolve::resolve_document;

#[derive(Debug, Clone, Default)]
pub struct CompiledDocument {
    /// One entry per successfully lowered schema, in ascending name order.
    pub declarations: Vec<Decl>,
    pub imports: Imports,
    pub diagnostics: Vec<Diagnostic>,
    /// Schemas skipped in lenient mode.
    pub failures: Vec<CompileError>,
}

/// Resolve and lower `document`. In strict mode the first failing schema is
/// returned as the error; in lenient mode it is recorded and skipped.
pub fn compile_document(document: &mut Document, options: &GenerationOptions) -> Result<CompiledDocument, CompileError> {
    let filter = options.node_filter.as_deref();
    let report = resolve_document(document, filter);
    let mut out = CompiledDocument { diagnostics: report.diagnostics, ..CompiledDocument::default() };

    let document = &*document;
    let names: Vec<&str> = match filter {
        Some(filter) => {
            let mut names: Vec<&str> = filter
                .iter()
                .map(String::as_str)
                .filter(|name| document.components.schemas.contains_key(*name))
                .collect();
            names.sort_unstable();
            names.dedup();
            names
        }
        None => document.schema_names(),
    };

    for name in names {
        let Some(node) = document.components.schemas.get(name) else { continue };
        match Lowering::new(document, options, name).lower_top_level(node) {
            Ok(lowered) => {
                out.imports.merge(lowered.imports);
                out.diagnostics.extend(lowered.warnings);
                out.declarations.push(lowered.decl);
            }
            Err(err) if options.strict() => return Err(err),
            Err(err) => {
                warn!(schema = name, error = %err, "skipping schema");
                out.diagnostics.push(Diagnostic::error(name, err.to_string()));
                out.failures.push(err);
            }
        }
    }

    info!(
        declarations = out.declarations.len(),
        failed = out.failures.len(),
        imports = out.imports.len(),
        "compiled document"
    );
    Ok(out)
}

impl CompiledDocument {
    pub fn render(&self, options: &GenerationOptions) -> String {
        let mut cg = Codegen::new();
        cg.header(options.package.as_deref(), &options.raw_option_lines, self.imports.paths());
        for decl in &self.declarations {
            cg.emit(decl);
        }
        cg.into_string()
    }
}

/// Compile and render in one go.
pub fn to_proto(document: &mut Document, options: &GenerationOptions) -> Result<(String, CompiledDocument), CompileError> {
    let compiled = compile_document(document, options)?;
    Ok((compiled.render(options), compiled))
}
