//! Every `tests/fixtures/<case>.yaml` must compile to `<case>.proto`.
//! An optional `<case>.options.yaml` holds the generation options.
use std::path::{Path, PathBuf};

use oas_proto::{to_proto, Document, GenerationOptions};
use pretty_assertions::assert_eq;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn cases() -> Vec<PathBuf> {
    let mut cases: Vec<PathBuf> = std::fs::read_dir(fixtures())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            name.ends_with(".yaml") && !name.ends_with(".options.yaml")
        })
        .collect();
    cases.sort();
    cases
}

fn compile(case: &Path) -> String {
    let options_path = case.with_extension("options.yaml");
    let options = if options_path.exists() {
        GenerationOptions::load(&options_path).unwrap()
    } else {
        GenerationOptions::default()
    };
    let mut document = Document::load(case).unwrap();
    to_proto(&mut document, &options).unwrap().0
}

#[test]
fn fixtures_match_expected_output() {
    let cases = cases();
    assert!(!cases.is_empty(), "no fixtures found");
    for case in cases {
        let expected = std::fs::read_to_string(case.with_extension("proto")).unwrap();
        assert_eq!(compile(&case), expected, "fixture {}", case.display());
    }
}

#[test]
fn fixtures_compile_deterministically() {
    for case in cases() {
        assert_eq!(compile(&case), compile(&case), "fixture {}", case.display());
    }
}
