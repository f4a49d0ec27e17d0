//! Content fingerprints used to detect user edits.
//!
//! A fingerprint recorded at write time and compared at the next run is how
//! the engine decides whether a tracked file still holds what it wrote.
//! Structured documents are hashed by parsed value so reformatting is not an
//! edit; source files get a whitespace cleanup first; everything else hashes
//! raw bytes. This is a change detector, not a security control.

use std::path::Path;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{ImprintError, ImprintResult};
use crate::format::{self, Format};

/// Extensions hashed after whitespace normalization instead of structured
/// parsing.
const SOURCE_EXTENSIONS: &[&str] = &["js", "ts", "rs"];

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of a structured document.
///
/// Hashes the deep-key-sorted canonical JSON rendering together with the
/// format the document was read in: whitespace and key order never matter,
/// but the same data re-encoded in a different format is a detectable
/// change.
pub fn hash_value(value: &Value, format: Format) -> String {
    let canonical = canonical_json(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hasher.update(format.name().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fingerprints the file at `path`.
///
/// Non-UTF-8 content hashes as raw bytes. Source-like files hash their
/// normalized text. Content that parses to a JSON/YAML object or array
/// hashes by value; scalars and unparseable text fall back to raw bytes.
/// `rel` is the project-relative name used in error messages.
pub fn file_fingerprint(path: &Path, rel: &str) -> ImprintResult<String> {
    let bytes = std::fs::read(path).map_err(|err| ImprintError::io("read", rel, err))?;

    let Ok(text) = std::str::from_utf8(&bytes) else {
        return Ok(hash_bytes(&bytes));
    };

    if is_source_like(path) {
        return Ok(hash_bytes(normalize_source(text).as_bytes()));
    }

    match format::parse_data(text, None, rel) {
        Ok((value, format)) if value.is_object() || value.is_array() => {
            Ok(hash_value(&value, format))
        }
        _ => Ok(hash_bytes(&bytes)),
    }
}

/// Recognizes lowercase-hex SHA-256 strings when classifying registry
/// values that could be either a hash or a symlink target.
pub(crate) fn is_hash_like(text: &str) -> bool {
    text.len() == 64 && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_source_like(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, child) in entries {
                sorted.insert(key.clone(), canonical_json(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}

/// CRLF to LF, per-line trailing whitespace stripped, trailing blank lines
/// collapsed to a single final newline.
fn normalize_source(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_bytes_is_stable_hex() {
        let hash = hash_bytes(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_bytes(b"hello"));
        assert_ne!(hash, hash_bytes(b"hello!"));
        assert!(is_hash_like(&hash));
    }

    #[test]
    fn test_value_hash_ignores_key_order() {
        let a = json!({ "a": 1, "b": { "y": 2, "x": 3 } });
        let b = json!({ "b": { "x": 3, "y": 2 }, "a": 1 });
        assert_eq!(hash_value(&a, Format::Json), hash_value(&b, Format::Json));
    }

    #[test]
    fn test_value_hash_distinguishes_format() {
        let value = json!({ "a": 1 });
        assert_ne!(hash_value(&value, Format::Json), hash_value(&value, Format::Yaml));
    }

    #[test]
    fn test_fingerprint_ignores_json_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");

        std::fs::write(&file, "{\"a\":1,\"b\":2}").unwrap();
        let compact = file_fingerprint(&file, "data.json").unwrap();

        std::fs::write(&file, "{\n  \"b\": 2,\n  \"a\": 1\n}\n").unwrap();
        let pretty = file_fingerprint(&file, "data.json").unwrap();

        assert_eq!(compact, pretty);
    }

    #[test]
    fn test_fingerprint_detects_format_change() {
        let dir = tempfile::tempdir().unwrap();
        let json_file = dir.path().join("conf.json");
        let yaml_file = dir.path().join("conf.yaml");

        std::fs::write(&json_file, "{\"a\": 1}").unwrap();
        std::fs::write(&yaml_file, "a: 1\n").unwrap();

        assert_ne!(
            file_fingerprint(&json_file, "conf.json").unwrap(),
            file_fingerprint(&yaml_file, "conf.yaml").unwrap()
        );
    }

    #[test]
    fn test_fingerprint_source_ignores_trailing_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mod.rs");

        std::fs::write(&file, "fn main() {}\n").unwrap();
        let clean = file_fingerprint(&file, "mod.rs").unwrap();

        std::fs::write(&file, "fn main() {}   \r\n\n\n").unwrap();
        let messy = file_fingerprint(&file, "mod.rs").unwrap();

        assert_eq!(clean, messy);
    }

    #[test]
    fn test_fingerprint_plain_text_uses_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");

        std::fs::write(&file, "hello").unwrap();
        let a = file_fingerprint(&file, "notes.txt").unwrap();
        std::fs::write(&file, "hello ").unwrap();
        let b = file_fingerprint(&file, "notes.txt").unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_is_hash_like_rejects_other_strings() {
        assert!(!is_hash_like("/usr/lib/node/config.json"));
        assert!(!is_hash_like("ABCDEF"));
        assert!(!is_hash_like(&"a".repeat(63)));
        assert!(is_hash_like(&"a".repeat(64)));
    }
}
