//! Knobs threaded through one compilation run.
use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::path_de::{from_str_with_path, Format};

/// What the orchestrator does when a top-level schema fails to compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Stop at the first failing schema.
    Strict,
    /// Report the failure and keep going with the next schema.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GenerationOptions {
    /// Prefix every enum value with `<ENUM_NAME>_`.
    pub enum_name_prefix: bool,
    /// External package → package name used in the output.
    pub package_renames: BTreeMap<String, String>,
    /// Compile only these top-level schemas (plus whatever they reference for resolution).
    pub node_filter: Option<Vec<String>>,
    /// Emitted verbatim as `option <line>;`.
    pub raw_option_lines: Vec<String>,
    pub package: Option<String>,
    pub mode: RunMode,
    /// Wrap top-level arrays and maps into single-field messages.
    pub box_top_level: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            enum_name_prefix: false,
            package_renames: BTreeMap::new(),
            node_filter: None,
            raw_option_lines: Vec::new(),
            package: None,
            mode: RunMode::Lenient,
            box_top_level: true,
        }
    }
}

impl GenerationOptions {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let src = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        from_str_with_path(&src, Format::from_path(path))
    }

    /// Output package name for an external package.
    pub fn package_name<'a>(&'a self, package: &'a str) -> &'a str {
        self.package_renames.get(package).map(String::as_str).unwrap_or(package)
    }

    pub fn strict(&self) -> bool {
        self.mode == RunMode::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_fields_are_kebab_case() {
        let opts: GenerationOptions = from_str_with_path(
            "enum-name-prefix: true\npackage-renames:\n  common: acme.common\nnode-filter: [Pet]\nmode: strict\n",
            Format::Yaml,
        )
        .unwrap();
        assert!(opts.enum_name_prefix);
        assert!(opts.strict());
        assert!(opts.box_top_level);
        assert_eq!(opts.node_filter, Some(vec!["Pet".to_string()]));
        assert_eq!(opts.package_name("common"), "acme.common");
        assert_eq!(opts.package_name("other"), "other");
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let err = from_str_with_path::<GenerationOptions>("enum-prefix: true\n", Format::Yaml);
        assert!(err.is_err());
    }
}
