//! Recorded document operations: diffing and guarded replay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded operation over a structured document.
///
/// `path` is an RFC 6901 JSON pointer. The registry stores, per data file,
/// the exact operations that turn the current document back into its
/// pre-engine state. Every destructive step is preceded by a `test` op
/// pinning the value it is about to replace or remove, so replay can tell
/// when the user has since changed that value and leave it alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Test { path: String, value: Value },
    Replace { path: String, value: Value },
    Add { path: String, value: Value },
    Remove { path: String },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Test { path, .. }
            | PatchOp::Replace { path, .. }
            | PatchOp::Add { path, .. }
            | PatchOp::Remove { path } => path,
        }
    }
}

/// Computes the operations that transform `current` into `target`.
///
/// Objects are compared key by key; arrays and scalars are treated as
/// atomic values. A changed value yields `test` + `replace`, a key present
/// only in `current` yields `test` + `remove`, and a key present only in
/// `target` yields a plain `add` (re-adding an equal value later is a
/// no-op, so it needs no guard).
pub fn diff(current: &Value, target: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_into(current, target, "", &mut ops);
    ops
}

fn diff_into(current: &Value, target: &Value, pointer: &str, ops: &mut Vec<PatchOp>) {
    if current == target {
        return;
    }

    match (current, target) {
        (Value::Object(c), Value::Object(t)) => {
            for (key, cv) in c {
                let child = join_pointer(pointer, key);
                match t.get(key) {
                    Some(tv) if cv == tv => {}
                    Some(tv) if cv.is_object() && tv.is_object() => diff_into(cv, tv, &child, ops),
                    Some(tv) => {
                        ops.push(PatchOp::Test {
                            path: child.clone(),
                            value: cv.clone(),
                        });
                        ops.push(PatchOp::Replace {
                            path: child,
                            value: tv.clone(),
                        });
                    }
                    None => {
                        ops.push(PatchOp::Test {
                            path: child.clone(),
                            value: cv.clone(),
                        });
                        ops.push(PatchOp::Remove { path: child });
                    }
                }
            }
            for (key, tv) in t {
                if !c.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: join_pointer(pointer, key),
                        value: tv.clone(),
                    });
                }
            }
        }
        _ => {
            ops.push(PatchOp::Test {
                path: pointer.to_owned(),
                value: current.clone(),
            });
            ops.push(PatchOp::Replace {
                path: pointer.to_owned(),
                value: target.clone(),
            });
        }
    }
}

/// Applies `ops` to `doc` in order and returns the ops that could not be
/// applied.
///
/// A `test` op guards the op immediately after it: when the assertion
/// fails, both are skipped and reported. A standalone `add` whose value is
/// already in place is a clean no-op; an `add` finding a different value at
/// the path is reported unapplied.
pub fn apply(doc: &mut Value, ops: &[PatchOp]) -> Vec<PatchOp> {
    let mut unapplied = Vec::new();
    let mut idx = 0;

    while idx < ops.len() {
        match &ops[idx] {
            PatchOp::Test { path, value } => {
                let guarded = ops.get(idx + 1);
                if doc.pointer(path) == Some(value) {
                    if let Some(op) = guarded {
                        if !apply_one(doc, op) {
                            unapplied.push(ops[idx].clone());
                            unapplied.push(op.clone());
                        }
                    }
                } else {
                    unapplied.push(ops[idx].clone());
                    if let Some(op) = guarded {
                        unapplied.push(op.clone());
                    }
                }
                idx += if guarded.is_some() { 2 } else { 1 };
            }
            op => {
                if !apply_one(doc, op) {
                    unapplied.push(op.clone());
                }
                idx += 1;
            }
        }
    }

    unapplied
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> bool {
    match op {
        PatchOp::Test { path, value } => doc.pointer(path) == Some(value),
        PatchOp::Replace { path, value } => match doc.pointer_mut(path) {
            Some(slot) => {
                *slot = value.clone();
                true
            }
            None => false,
        },
        PatchOp::Add { path, value } => add_value(doc, path, value),
        PatchOp::Remove { path } => remove_value(doc, path),
    }
}

fn add_value(doc: &mut Value, path: &str, value: &Value) -> bool {
    match doc.pointer(path) {
        Some(existing) if existing == value => return true,
        Some(_) => return false,
        None => {}
    }

    let Some((parent, token)) = split_pointer(path) else {
        *doc = value.clone();
        return true;
    };

    match doc.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.insert(token, value.clone());
            true
        }
        Some(Value::Array(items)) => {
            if token == "-" {
                items.push(value.clone());
                return true;
            }
            match token.parse::<usize>() {
                Ok(idx) if idx <= items.len() => {
                    items.insert(idx, value.clone());
                    true
                }
                _ => false,
            }
        }
        _ => false,
    }
}

fn remove_value(doc: &mut Value, path: &str) -> bool {
    let Some((parent, token)) = split_pointer(path) else {
        return false;
    };

    match doc.pointer_mut(parent) {
        Some(Value::Object(map)) => map.remove(&token).is_some(),
        Some(Value::Array(items)) => match token.parse::<usize>() {
            Ok(idx) if idx < items.len() => {
                items.remove(idx);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn join_pointer(base: &str, key: &str) -> String {
    format!("{base}/{}", key.replace('~', "~0").replace('/', "~1"))
}

fn split_pointer(path: &str) -> Option<(&str, String)> {
    let idx = path.rfind('/')?;
    let token = path[idx + 1..].replace("~1", "/").replace("~0", "~");
    Some((&path[..idx], token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_added_key_becomes_guarded_remove() {
        let ops = diff(&json!({ "x": "y" }), &json!({}));
        assert_eq!(
            ops,
            vec![
                PatchOp::Test {
                    path: "/x".into(),
                    value: json!("y")
                },
                PatchOp::Remove { path: "/x".into() },
            ]
        );
    }

    #[test]
    fn test_diff_changed_key_becomes_guarded_replace() {
        let ops = diff(&json!({ "a": 1 }), &json!({ "a": 2 }));
        assert_eq!(
            ops,
            vec![
                PatchOp::Test {
                    path: "/a".into(),
                    value: json!(1)
                },
                PatchOp::Replace {
                    path: "/a".into(),
                    value: json!(2)
                },
            ]
        );
    }

    #[test]
    fn test_diff_missing_key_becomes_add() {
        let ops = diff(&json!({}), &json!({ "a": 1 }));
        assert_eq!(
            ops,
            vec![PatchOp::Add {
                path: "/a".into(),
                value: json!(1)
            }]
        );
    }

    #[test]
    fn test_diff_recurses_into_objects() {
        let ops = diff(
            &json!({ "outer": { "keep": 1, "change": 2 } }),
            &json!({ "outer": { "keep": 1, "change": 3 } }),
        );
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].path(), "/outer/change");
    }

    #[test]
    fn test_diff_treats_arrays_atomically() {
        let ops = diff(&json!({ "a": [1, 2] }), &json!({ "a": [1] }));
        assert_eq!(
            ops,
            vec![
                PatchOp::Test {
                    path: "/a".into(),
                    value: json!([1, 2])
                },
                PatchOp::Replace {
                    path: "/a".into(),
                    value: json!([1])
                },
            ]
        );
    }

    #[test]
    fn test_apply_round_trips_diff() {
        let original = json!({ "name": "pkg", "scripts": { "build": "tsc" } });
        let mut edited = original.clone();
        edited["scripts"]["build"] = json!("cargo build");
        edited["extra"] = json!(true);

        let ops = diff(&edited, &original);
        let mut doc = edited;
        let unapplied = apply(&mut doc, &ops);

        assert!(unapplied.is_empty());
        assert_eq!(doc, original);
    }

    #[test]
    fn test_apply_collects_failed_guard_with_its_op() {
        // Recorded against value 1, but the document has been changed to 9.
        let ops = vec![
            PatchOp::Test {
                path: "/a".into(),
                value: json!(1),
            },
            PatchOp::Remove { path: "/a".into() },
            PatchOp::Test {
                path: "/b".into(),
                value: json!(2),
            },
            PatchOp::Remove { path: "/b".into() },
        ];
        let mut doc = json!({ "a": 9, "b": 2 });
        let unapplied = apply(&mut doc, &ops);

        assert_eq!(doc, json!({ "a": 9 }));
        assert_eq!(unapplied.len(), 2);
        assert_eq!(unapplied[0].path(), "/a");
    }

    #[test]
    fn test_apply_add_over_equal_value_is_clean() {
        let ops = vec![PatchOp::Add {
            path: "/a".into(),
            value: json!(1),
        }];
        let mut doc = json!({ "a": 1 });
        assert!(apply(&mut doc, &ops).is_empty());

        let mut conflicting = json!({ "a": 2 });
        let unapplied = apply(&mut conflicting, &ops);
        assert_eq!(unapplied, ops);
        assert_eq!(conflicting, json!({ "a": 2 }));
    }

    #[test]
    fn test_pointer_escaping_round_trips() {
        let ops = diff(&json!({ "a/b": { "c~d": 1 } }), &json!({}));
        assert_eq!(ops[0].path(), "/a~1b");

        let mut doc = json!({ "a/b": { "c~d": 1 } });
        assert!(apply(&mut doc, &ops).is_empty());
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn test_op_wire_format() {
        let op = PatchOp::Test {
            path: "/x".into(),
            value: json!("y"),
        };
        assert_eq!(
            serde_json::to_string(&op).unwrap(),
            r#"{"op":"test","path":"/x","value":"y"}"#
        );

        let remove: PatchOp = serde_json::from_str(r#"{"op":"remove","path":"/x"}"#).unwrap();
        assert_eq!(remove, PatchOp::Remove { path: "/x".into() });
    }
}
