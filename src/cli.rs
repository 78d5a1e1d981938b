//! Minimal CLI: compile (proto | check)
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::info;

use oas_proto::{compile_document, CompiledDocument, Diagnostic, Document, GenerationOptions, RunMode, Severity};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile the schemas of OpenAPI documents into proto3 message/enum declarations
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile and emit .proto text
    Proto(ProtoOut),
    /// compile without writing anything, report diagnostics
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs (.yaml/.yml/.json). May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct GenerationSettings {
    /// YAML/JSON file with generation options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// proto package name, e.g. foo.bar
    #[arg(short, long)]
    package: Option<String>,

    /// extra `option ...;` line for the header (repeatable)
    #[arg(long = "option", value_name = "LINE")]
    options: Vec<String>,

    /// prefix enum values with the upper-cased enum name
    #[arg(long, default_value_t = false)]
    enum_prefix: bool,

    /// rename an external package: PKG=NEW (repeatable)
    #[arg(long = "rename", value_name = "PKG=NEW", value_parser = parse_rename)]
    renames: Vec<(String, String)>,

    /// compile only these top-level schemas (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// stop at the first schema that fails to compile
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// reject top-level arrays and maps instead of boxing them
    #[arg(long, default_value_t = false)]
    no_box: bool,
}

#[derive(clap::Parser, Debug)]
struct ProtoOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generation: GenerationSettings,

    /// output .proto file (stdout if omitted); single input only
    #[arg(short, long, conflicts_with = "out_dir")]
    out: Option<PathBuf>,

    /// write `<input stem>.proto` per input into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// run protoc on the written file(s), generating into DIR
    #[arg(long, value_name = "DIR")]
    build: Option<PathBuf>,

    /// protoc generator used with --build (`--<lang>_out`)
    #[arg(long, default_value = "go")]
    lang: String,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generation: GenerationSettings,
}

/// One input after compilation.
struct Compiled {
    path: PathBuf,
    text: String,
    document: CompiledDocument,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Compile every input independently; results keep input order.
    fn compile_all(&self, options: &GenerationOptions) -> Result<Vec<Compiled>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        source_paths
            .into_par_iter()
            .map(|path| compile_file(path, options))
            .collect()
    }
}

impl GenerationSettings {
    fn options(&self) -> Result<GenerationOptions> {
        let mut options = match &self.config {
            Some(path) => GenerationOptions::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => GenerationOptions::default(),
        };
        if self.package.is_some() {
            options.package = self.package.clone();
        }
        options.raw_option_lines.extend(self.options.iter().cloned());
        options.enum_name_prefix |= self.enum_prefix;
        options.package_renames.extend(self.renames.iter().cloned());
        if !self.only.is_empty() {
            options.node_filter = Some(self.only.clone());
        }
        if self.strict {
            options.mode = RunMode::Strict;
        }
        if self.no_box {
            options.box_top_level = false;
        }
        Ok(options)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Proto(target) => {
                let options = target.generation.options()?;
                let compiled = target.input_settings.compile_all(&options)?;
                for unit in &compiled {
                    report(&unit.path, &unit.document.diagnostics);
                }

                let written = match (&target.out, &target.out_dir) {
                    (Some(out), _) => {
                        let [unit] = compiled.as_slice() else {
                            bail!("--out takes a single input, got {}; use --out-dir", compiled.len());
                        };
                        write_file(out, &unit.text)?;
                        vec![out.clone()]
                    }
                    (None, Some(dir)) => {
                        let inputs: Vec<&Path> = compiled.iter().map(|unit| unit.path.as_path()).collect();
                        let targets = out_dir_targets(dir, &inputs)?;
                        for (unit, out) in compiled.iter().zip(&targets) {
                            write_file(out, &unit.text)?;
                        }
                        targets
                    }
                    (None, None) => {
                        for unit in &compiled {
                            print!("{}", unit.text);
                        }
                        Vec::new()
                    }
                };

                if let Some(build) = &target.build {
                    if written.is_empty() {
                        bail!("--build needs --out or --out-dir");
                    }
                    for proto in &written {
                        run_protoc(proto, build, &target.lang)?;
                    }
                }
                Ok(())
            }
            Command::Check(target) => {
                let options = target.generation.options()?;
                let compiled = target.input_settings.compile_all(&options)?;
                let mut failed = 0;
                for unit in &compiled {
                    report(&unit.path, &unit.document.diagnostics);
                    failed += unit.document.failures.len();
                    let status = if unit.document.failures.is_empty() { "ok".green() } else { "failed".red() };
                    eprintln!(
                        "{} {}: {} declaration(s), {} skipped",
                        status,
                        unit.path.display(),
                        unit.document.declarations.len(),
                        unit.document.failures.len()
                    );
                }
                if failed > 0 {
                    bail!("{failed} schema(s) failed to compile");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn compile_file(path: PathBuf, options: &GenerationOptions) -> Result<Compiled> {
    let mut document = Document::load(&path).with_context(|| format!("failed to load {}", path.display()))?;
    let compiled = compile_document(&mut document, options)
        .with_context(|| format!("failed to compile {}", path.display()))?;
    let text = compiled.render(options);
    Ok(Compiled { path, text, document: compiled })
}

fn report(path: &Path, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let level = match diagnostic.severity {
            Severity::Warning => "warning".yellow(),
            Severity::Error => "error".red(),
        };
        eprintln!("{level}: {}: [{}] {}", path.display(), diagnostic.schema, diagnostic.message);
    }
}

/// `<dir>/<input stem>.proto` per input; two inputs landing on one file is an error.
fn out_dir_targets(dir: &Path, inputs: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut claimed: BTreeMap<PathBuf, &Path> = BTreeMap::new();
    let mut targets = Vec::with_capacity(inputs.len());
    for &input in inputs {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let out = dir.join(stem).with_extension("proto");
        if let Some(first) = claimed.insert(out.clone(), input) {
            bail!(
                "{} and {} would both be written to {}",
                first.display(),
                input.display(),
                out.display()
            );
        }
        targets.push(out);
    }
    Ok(targets)
}

fn write_file(out: &Path, text: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
}

/// Hand a written file to protoc.
fn run_protoc(proto: &Path, out_dir: &Path, lang: &str) -> Result<()> {
    let proto_path = proto.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    info!(file = %proto.display(), "running protoc");
    let output = Process::new("protoc")
        .arg(format!("--{lang}_out={}", out_dir.display()))
        .arg(format!("--proto_path={}", proto_path.display()))
        .arg(proto)
        .output()
        .context("failed to run protoc")?;
    if !output.status.success() {
        bail!(
            "protoc failed on {}: {}",
            proto.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

fn parse_rename(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => Ok((from.to_string(), to.to_string())),
        _ => Err(format!("expected PKG=NEW, got `{raw}`")),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = glob::glob(pattern)
                .with_context(|| format!("bad glob pattern: {pattern}"))?
                .collect::<Result<Vec<_>, _>>()?;
            if matched.is_empty() {
                bail!("glob pattern matched no files: {pattern}");
            }
            matched.sort();
            out.append(&mut matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
