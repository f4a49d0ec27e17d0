//! Structured-data formats, parsing and serialization.

use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::error::{ImprintError, ImprintResult};
use crate::keypath::KeyPath;

/// Serialization format of a structured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Format implied by a file extension, if recognized.
    pub fn from_extension(path: &Path) -> Option<Format> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yaml") | Some("yml") => Some(Format::Yaml),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses structured content into a document.
///
/// With an explicit format only that format is tried. Without one, JSON is
/// tried first and YAML second, and a failure reports both attempts. `path`
/// is only used for error messages.
pub fn parse_data(content: &str, format: Option<Format>, path: &str) -> ImprintResult<(Value, Format)> {
    match format {
        Some(Format::Json) => match serde_json::from_str(content) {
            Ok(data) => Ok((data, Format::Json)),
            Err(err) => Err(ImprintError::parse(path, format!("not valid JSON: {err}"))),
        },
        Some(Format::Yaml) => match serde_yaml::from_str(content) {
            Ok(data) => Ok((data, Format::Yaml)),
            Err(err) => Err(ImprintError::parse(path, format!("not valid YAML: {err}"))),
        },
        None => {
            let json_err = match serde_json::from_str(content) {
                Ok(data) => return Ok((data, Format::Json)),
                Err(err) => err,
            };
            match serde_yaml::from_str(content) {
                Ok(data) => Ok((data, Format::Yaml)),
                Err(yaml_err) => Err(ImprintError::parse(
                    path,
                    format!("not valid JSON ({json_err}) nor YAML ({yaml_err})"),
                )),
            }
        }
    }
}

/// Serializes a document in the given format.
///
/// Each path in `sort_keys` that addresses an object gets its keys sorted
/// alphabetically (shallow). The root path sorts the document's own top
/// level. Everything else keeps its insertion order, so key order in user
/// files survives round trips.
pub fn serialize_data(
    value: &Value,
    format: Format,
    sort_keys: &[KeyPath],
    path: &str,
) -> ImprintResult<String> {
    let sorted;
    let value = if sort_keys.is_empty() {
        value
    } else {
        sorted = sorted_copy(value, sort_keys);
        &sorted
    };

    match format {
        Format::Json => serde_json::to_string_pretty(value)
            .map_err(|err| ImprintError::serialize(path, err.to_string())),
        Format::Yaml => {
            serde_yaml::to_string(value).map_err(|err| ImprintError::serialize(path, err.to_string()))
        }
    }
}

/// Resolves the format to serialize a file in: recognized extension first,
/// then the parseable content of whatever file currently occupies the path.
pub fn detect_format(path: &Path, rel: &str) -> ImprintResult<Format> {
    if let Some(format) = Format::from_extension(path) {
        return Ok(format);
    }
    if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|err| ImprintError::io("read", rel, err))?;
        let (_, format) = parse_data(&content, None, rel)?;
        return Ok(format);
    }
    Err(ImprintError::unknown_format(rel))
}

fn sorted_copy(value: &Value, sort_keys: &[KeyPath]) -> Value {
    let mut copy = value.clone();
    let mut paths: Vec<&KeyPath> = sort_keys.iter().collect();
    paths.sort_by_key(|path| path.to_string());

    for path in paths {
        if let Some(node) = path.get_mut(&mut copy) {
            sort_object_keys(node);
        }
    }
    copy
}

fn sort_object_keys(value: &mut Value) {
    if let Value::Object(map) = value {
        let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        map.extend(entries);
    }
}
