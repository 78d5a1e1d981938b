//! Deserialization with document-path context in error messages.
use serde::de::DeserializeOwned;

use crate::error::LoadError;

/// Source syntax of a document or config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.json` is JSON; everything else is read as YAML (a JSON superset).
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

pub fn from_str_with_path<T: DeserializeOwned>(src: &str, format: Format) -> Result<T, LoadError> {
    match format {
        Format::Json => {
            let de = &mut serde_json::Deserializer::from_str(src);
            serde_path_to_error::deserialize::<_, T>(de).map_err(|err| LoadError::Syntax {
                path: err.path().to_string(),
                message: err.into_inner().to_string(),
            })
        }
        Format::Yaml => {
            let de = serde_yaml::Deserializer::from_str(src);
            serde_path_to_error::deserialize::<_, T>(de).map_err(|err| LoadError::Syntax {
                path: err.path().to_string(),
                message: err.into_inner().to_string(),
            })
        }
    }
}
