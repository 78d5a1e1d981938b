//! Golden-file runner for `tests/fixtures`.
//!
//! ```text
//! cargo run -p dev-test-runner                  # compare
//! cargo run -p dev-test-runner -- --bless       # rewrite expected .proto files
//! cargo run -p dev-test-runner -- --filter pet  # only matching cases
//! ```
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use oas_proto::{to_proto, Document, GenerationOptions};
use pretty_assertions::StrComparison;
use regex::Regex;
use serde::Serialize;

#[derive(Parser, Debug)]
struct Args {
    /// fixture directory
    #[arg(long, default_value = "tests/fixtures")]
    dir: PathBuf,
    /// overwrite expected output with what the compiler produces now
    #[arg(long, default_value_t = false)]
    bless: bool,
    /// only run cases whose name matches this regex
    #[arg(long)]
    filter: Option<Regex>,
    /// write a JSON summary here
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Pass,
    Fail,
    Blessed,
    Error,
}

#[derive(Debug, Serialize)]
struct CaseReport {
    case: String,
    outcome: Outcome,
    diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let args = Args::parse();
    let cases = match collect_cases(&args.dir, args.filter.as_ref()) {
        Ok(cases) => cases,
        Err(error) => {
            eprintln!("{} {}: {error}", "error:".red().bold(), args.dir.display());
            std::process::exit(2);
        }
    };

    let reports: Vec<CaseReport> = cases.iter().map(|case| run_case(case, args.bless)).collect();

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Fail | Outcome::Error))
        .count();
    println!("{} case(s), {} failed", reports.len(), failed);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&reports).unwrap_or_default();
        if let Err(error) = std::fs::write(path, json) {
            eprintln!("{} {}: {error}", "error:".red().bold(), path.display());
        }
    }
    if failed > 0 {
        std::process::exit(1);
    }
}

fn collect_cases(dir: &Path, filter: Option<&Regex>) -> std::io::Result<Vec<PathBuf>> {
    let mut cases = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !name.ends_with(".yaml") || name.ends_with(".options.yaml") {
            continue;
        }
        if filter.is_some_and(|re| !re.is_match(name)) {
            continue;
        }
        cases.push(path);
    }
    cases.sort();
    Ok(cases)
}

fn run_case(case: &Path, bless: bool) -> CaseReport {
    let name = case.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
    let expected_path = case.with_extension("proto");

    let produced = compile(case);
    let (text, diagnostics) = match produced {
        Ok(ok) => ok,
        Err(error) => {
            println!("{} {name}: {error}", "ERROR".red().bold());
            return CaseReport { case: name, outcome: Outcome::Error, diagnostics: Vec::new(), error: Some(error) };
        }
    };

    let outcome = if bless {
        match std::fs::write(&expected_path, &text) {
            Ok(()) => Outcome::Blessed,
            Err(error) => {
                println!("{} {name}: {error}", "ERROR".red().bold());
                return CaseReport { case: name, outcome: Outcome::Error, diagnostics, error: Some(error.to_string()) };
            }
        }
    } else {
        let expected = std::fs::read_to_string(&expected_path).unwrap_or_default();
        if expected == text {
            Outcome::Pass
        } else {
            println!("{}", StrComparison::new(&expected, &text));
            Outcome::Fail
        }
    };

    let label = match outcome {
        Outcome::Pass => "PASS".green(),
        Outcome::Blessed => "BLESSED".cyan(),
        _ => "FAIL".red(),
    };
    println!("{label} {name}");
    CaseReport { case: name, outcome, diagnostics, error: None }
}

fn compile(case: &Path) -> Result<(String, Vec<String>), String> {
    let options_path = case.with_extension("options.yaml");
    let options = if options_path.exists() {
        GenerationOptions::load(&options_path).map_err(|e| e.to_string())?
    } else {
        GenerationOptions::default()
    };
    let mut document = Document::load(case).map_err(|e| e.to_string())?;
    let (text, compiled) = to_proto(&mut document, &options).map_err(|e| e.to_string())?;
    let diagnostics = compiled.diagnostics.iter().map(ToString::to_string).collect();
    Ok((text, diagnostics))
}
