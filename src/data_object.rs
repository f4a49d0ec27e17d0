//! In-memory structured document with key-level edit protection.
//!
//! A [`DataObject`] wraps one parsed data file together with three states of
//! it: the live document, the `snapshot` taken when the file was read, and
//! the `original` content from before the tool first touched the file. The
//! original is reconstructed at load time by replaying the reverse
//! operations recorded in the registry against the snapshot; operations
//! whose guard no longer matches are kept aside as "unapplied" instead of
//! overwriting values the user changed.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ImprintError, ImprintResult};
use crate::format::Format;
use crate::keypath::KeyPath;
use crate::logger::Logger;
use crate::patch::{self, PatchOp};

/// Construction input assembled by the engine.
pub(crate) struct DataObjectParams {
    pub track: bool,
    /// The file was created by this session; there is no pre-tool content.
    pub new_created: bool,
    /// Short path used in log lines.
    pub name: String,
    pub format: Format,
    /// Reverse operations recorded in the registry, if any.
    pub operations: Option<Vec<PatchOp>>,
    pub sort_keys: Vec<KeyPath>,
    pub logger: Arc<dyn Logger>,
}

/// Structured document of a tracked data file.
///
/// Obtained from [`Imprint::data_object`](crate::Imprint::data_object).
/// Mutations go through [`set`](Self::set) and [`remove`](Self::remove),
/// which skip values that still belong to the user unless forced.
pub struct DataObject {
    data: Value,
    snapshot: Value,
    original: Value,
    operations: Option<Vec<PatchOp>>,
    unapplied: Vec<PatchOp>,
    track: bool,
    name: String,
    format: Format,
    sort_keys: Vec<KeyPath>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObject")
            .field("data", &self.data)
            .field("snapshot", &self.snapshot)
            .field("original", &self.original)
            .field("operations", &self.operations)
            .field("unapplied", &self.unapplied)
            .field("track", &self.track)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("sort_keys", &self.sort_keys)
            .finish_non_exhaustive()
    }
}

impl DataObject {
    pub(crate) fn new(data: Value, params: DataObjectParams) -> Self {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        // A newly created file has no pre-tool state: snapshot and original
        // start empty and nothing is replayed.
        let replay = params.track && !params.new_created;
        let snapshot = if replay {
            data.clone()
        } else {
            Value::Object(Map::new())
        };
        let mut original = snapshot.clone();
        let mut unapplied = Vec::new();
        if replay {
            if let Some(ops) = params.operations.as_deref() {
                unapplied = patch::apply(&mut original, ops);
            }
        }
        if params.track {
            params.logger.debug(&format!(
                "[Load Data] {}: original {}, unapplied ops {}",
                params.name,
                original,
                unapplied.len(),
            ));
        }

        Self {
            data,
            snapshot,
            original,
            operations: params.operations,
            unapplied,
            track: params.track,
            name: params.name,
            format: params.format,
            sort_keys: params.sort_keys,
            logger: params.logger,
        }
    }

    /// Live document.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Content from before the tool first touched the file.
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// Document as it was read from disk at load time.
    pub fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    /// Format the document is serialized in.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Key paths whose object entries are sorted on serialization.
    pub fn sort_keys(&self) -> &[KeyPath] {
        &self.sort_keys
    }

    /// Whether the live document differs from the loaded snapshot.
    pub fn is_changed(&self) -> bool {
        self.data != self.snapshot
    }

    /// Recorded operations that could not be replayed at load time because
    /// the user changed the guarded value.
    pub fn unapplied(&self) -> &[PatchOp] {
        &self.unapplied
    }

    /// Returns the value at `path`, if present.
    pub fn get<P: Into<KeyPath>>(&self, path: P) -> Option<&Value> {
        path.into().get(&self.data)
    }

    /// True when any of the given paths exists in the live document.
    pub fn has<I, K>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPath>,
    {
        paths
            .into_iter()
            .any(|path| path.into().exists_in(&self.data))
    }

    /// True when any of the given sub paths exists under `path`.
    pub fn has_sub_prop<P, I, K>(&self, path: P, sub_paths: I) -> bool
    where
        P: Into<KeyPath>,
        I: IntoIterator<Item = K>,
        K: Into<KeyPath>,
    {
        match path.into().get(&self.data) {
            Some(target) => sub_paths.into_iter().any(|sub| sub.into().exists_in(target)),
            None => false,
        }
    }

    /// Stores `value` at `path`. When tracking is on and the current value
    /// still belongs to the user, the write is skipped with a warning unless
    /// `force` is set.
    pub fn set<P: Into<KeyPath>>(
        &mut self,
        path: P,
        value: Value,
        force: bool,
    ) -> ImprintResult<&mut Self> {
        let path = path.into();
        if path.is_root() {
            return Err(ImprintError::invalid_argument(
                "cannot set the document root",
            ));
        }

        let shown = display_value(&value);
        let will_change = !self.track || force || self.may_change(&path);
        if will_change {
            path.set(&mut self.data, value);
        }
        self.log_mutation(
            will_change,
            &format!(
                "{}Set Key]  \"{}\" to \"{}\" in {}",
                if will_change { "[" } else { "[Not " },
                path,
                shown,
                self.name
            ),
        );
        Ok(self)
    }

    /// Applies every entry of an object as a [`set`](Self::set), using each
    /// key as a dot-chained path.
    pub fn set_object(&mut self, entries: Value, force: bool) -> ImprintResult<&mut Self> {
        let Value::Object(map) = entries else {
            return Err(ImprintError::invalid_argument(
                "set_object takes an object value",
            ));
        };
        for (key, value) in map {
            self.set(key, value, force)?;
        }
        Ok(self)
    }

    /// Removes the given paths from the live document. Paths missing from
    /// the document are skipped silently; the edit protection guard applies
    /// per path.
    pub fn remove<I, K>(&mut self, paths: I, force: bool) -> ImprintResult<&mut Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPath>,
    {
        for path in paths {
            self.remove_one(path.into(), force)?;
        }
        Ok(self)
    }

    fn remove_one(&mut self, path: KeyPath, force: bool) -> ImprintResult<()> {
        if path.is_root() {
            return Err(ImprintError::invalid_argument(
                "cannot remove the document root",
            ));
        }
        if !path.exists_in(&self.data) {
            return Ok(());
        }

        let will_change = !self.track || force || self.may_change(&path);
        if will_change {
            path.remove(&mut self.data);
        }
        self.log_mutation(
            will_change,
            &format!(
                "{}Remove Key] \"{}\" from {}",
                if will_change { "[" } else { "[Not " },
                path,
                self.name
            ),
        );
        Ok(())
    }

    /// A path may change when the original never had it, or when the live
    /// value already differs from the original one. Equality means the value
    /// is still the user's pre-tool state: load-time replay leaves user
    /// overrides in `original`, so hand-edited values compare equal too.
    fn may_change(&self, path: &KeyPath) -> bool {
        match path.get(&self.original) {
            Some(original_value) => path.get(&self.data) != Some(original_value),
            None => true,
        }
    }

    fn log_mutation(&self, changed: bool, message: &str) {
        if changed {
            self.logger.info(message);
        } else {
            self.logger.warn(message);
        }
    }

    /// Operations that bring the live document back to the loaded snapshot.
    pub fn diff_from_snapshot(&self) -> Vec<PatchOp> {
        patch::diff(&self.data, &self.snapshot)
    }

    /// Operations that bring the live document back to the pre-tool
    /// original. `compact` recomputes one consolidated diff; otherwise the
    /// operations recorded at load time are kept as-is and the snapshot diff
    /// is appended, preserving the uncompacted history.
    pub fn diff_from_original(&self, compact: bool) -> Vec<PatchOp> {
        if compact {
            patch::diff(&self.data, &self.original)
        } else {
            let mut ops = self.operations.clone().unwrap_or_default();
            ops.extend(self.diff_from_snapshot());
            ops
        }
    }

    /// Resets the live document and the snapshot to the pre-tool original
    /// and returns the operations that could not be replayed at load time.
    /// Repeated resets leave the document unchanged and report clean.
    pub fn reset(&mut self) -> Vec<PatchOp> {
        let unapplied = std::mem::take(&mut self.unapplied);
        self.data = self.original.clone();
        self.snapshot = self.original.clone();
        self.operations = None;
        unapplied
    }
}

/// String values are logged bare, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NullLogger;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "name": "app",
            "color": { "name": "red", "codes": [1, 2, 3, 4] },
            "is": true
        })
    }

    fn data_object(data: Value, track: bool, operations: Option<Vec<PatchOp>>) -> DataObject {
        DataObject::new(
            data,
            DataObjectParams {
                track,
                new_created: false,
                name: "data.json".to_owned(),
                format: Format::Json,
                operations,
                sort_keys: Vec::new(),
                logger: Arc::new(NullLogger),
            },
        )
    }

    #[test]
    fn test_set_new_key_is_applied() {
        let mut data = data_object(fixture(), true, None);
        data.set("scripts.build", json!("tsc"), false).unwrap();
        assert_eq!(data.get("scripts.build"), Some(&json!("tsc")));
        assert!(data.is_changed());
    }

    #[test]
    fn test_set_user_value_is_skipped_unless_forced() {
        let mut data = data_object(fixture(), true, None);
        data.set("color.name", json!("blue"), false).unwrap();
        assert_eq!(data.get("color.name"), Some(&json!("red")));

        data.set("color.name", json!("blue"), true).unwrap();
        assert_eq!(data.get("color.name"), Some(&json!("blue")));
    }

    #[test]
    fn test_untracked_object_applies_everything() {
        let mut data = data_object(fixture(), false, None);
        data.set("color.name", json!("blue"), false).unwrap();
        assert_eq!(data.get("color.name"), Some(&json!("blue")));
    }

    #[test]
    fn test_set_root_is_an_error() {
        let mut data = data_object(fixture(), true, None);
        assert!(data.set(KeyPath::root(), json!(1), false).is_err());
    }

    #[test]
    fn test_set_object_applies_each_entry() {
        let mut data = data_object(json!({}), false, None);
        data.set_object(json!({ "a.b": 1, "c": 2 }), false).unwrap();
        assert_eq!(data.data(), &json!({ "a": { "b": 1 }, "c": 2 }));
    }

    #[test]
    fn test_remove_splices_array_element() {
        let mut data = data_object(fixture(), false, None);
        data.remove(["color.codes.1"], false).unwrap();
        assert_eq!(data.get("color.codes"), Some(&json!([1, 3, 4])));
    }

    #[test]
    fn test_remove_missing_path_is_silent() {
        let mut data = data_object(fixture(), true, None);
        data.remove(["nope.deeper"], false).unwrap();
        assert_eq!(data.data(), &fixture());
    }

    #[test]
    fn test_remove_user_value_needs_force() {
        let mut data = data_object(fixture(), true, None);
        data.remove(["is"], false).unwrap();
        assert_eq!(data.get("is"), Some(&json!(true)));

        data.remove(["is"], true).unwrap();
        assert_eq!(data.get("is"), None);
    }

    #[test]
    fn test_has_is_any_of() {
        let data = data_object(fixture(), true, None);
        assert!(data.has(["color.name", "missing"]));
        assert!(!data.has(["missing", "also.missing"]));
    }

    #[test]
    fn test_has_sub_prop() {
        let data = data_object(fixture(), true, None);
        assert!(data.has_sub_prop("color", ["codes"]));
        assert!(!data.has_sub_prop("color", ["shade"]));
        assert!(!data.has_sub_prop("missing", ["codes"]));
    }

    #[test]
    fn test_replay_reconstructs_original() {
        // The tool added "x" in an earlier session; the registry holds the
        // reverse operations.
        let ops = vec![
            PatchOp::Test {
                path: "/x".to_owned(),
                value: json!("tool"),
            },
            PatchOp::Remove {
                path: "/x".to_owned(),
            },
        ];
        let mut data = data_object(json!({ "x": "tool", "user": "kept" }), true, Some(ops));
        assert_eq!(data.original(), &json!({ "user": "kept" }));
        assert!(data.unapplied().is_empty());

        // "x" is tool territory, "user" is not.
        data.set("x", json!("updated"), false).unwrap();
        data.set("user", json!("altered"), false).unwrap();
        assert_eq!(data.get("x"), Some(&json!("updated")));
        assert_eq!(data.get("user"), Some(&json!("kept")));
    }

    #[test]
    fn test_user_edit_of_tool_value_becomes_unapplied() {
        let ops = vec![
            PatchOp::Test {
                path: "/x".to_owned(),
                value: json!("tool"),
            },
            PatchOp::Remove {
                path: "/x".to_owned(),
            },
        ];
        let mut data = data_object(json!({ "x": "edited" }), true, Some(ops));
        assert_eq!(data.unapplied().len(), 2);
        assert_eq!(data.original(), &json!({ "x": "edited" }));

        // The edited value now counts as the user's, so it is protected.
        data.set("x", json!("again"), false).unwrap();
        assert_eq!(data.get("x"), Some(&json!("edited")));

        let unapplied = data.reset();
        assert_eq!(unapplied.len(), 2);
        assert!(data.reset().is_empty());
    }

    #[test]
    fn test_reset_restores_original() {
        let mut data = data_object(fixture(), true, None);
        data.set("color.name", json!("blue"), true).unwrap();
        assert!(data.is_changed());

        let unapplied = data.reset();
        assert!(unapplied.is_empty());
        assert_eq!(data.data(), &fixture());
        assert_eq!(data.snapshot(), &fixture());
        assert!(!data.is_changed());
    }

    #[test]
    fn test_diff_from_original_round_trips() {
        let mut data = data_object(fixture(), true, None);
        data.set("color.name", json!("blue"), true).unwrap();
        data.set("extra", json!(42), false).unwrap();

        let mut live = data.data().clone();
        let unapplied = patch::apply(&mut live, &data.diff_from_original(true));
        assert!(unapplied.is_empty());
        assert_eq!(&live, data.original());
    }

    #[test]
    fn test_new_created_file_has_empty_original() {
        let data = DataObject::new(
            json!({ "a": 1 }),
            DataObjectParams {
                track: true,
                new_created: true,
                name: "fresh.json".to_owned(),
                format: Format::Json,
                operations: None,
                sort_keys: Vec::new(),
                logger: Arc::new(NullLogger),
            },
        );
        assert_eq!(data.original(), &json!({}));
        assert_eq!(data.snapshot(), &json!({}));
        assert!(data.is_changed());
    }

    #[test]
    fn test_null_data_becomes_empty_object() {
        let data = data_object(Value::Null, true, None);
        assert_eq!(data.data(), &json!({}));
    }
}
