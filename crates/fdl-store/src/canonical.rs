//! Canonical JSON encoding for deterministic serialization.
//!
//! The encoding is a function of content only:
//! - Object keys sorted by byte-wise (code point) comparison, at every depth
//! - No whitespace; `,` and `:` separators
//! - UTF-8 text emitted as-is; only `"`, `\` and control characters escaped
//!
//! Key order is enforced by the encoder itself rather than by `serde_json`'s
//! map type, so the output does not change if some other crate in the build
//! enables `preserve_order`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::atomic;
use crate::config::SyncMode;
use crate::error::StoreResult;

/// Encode a serializable value to canonical JSON bytes.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> StoreResult<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Encode a serializable value to a canonical JSON string.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> StoreResult<String> {
    let bytes = to_canonical_vec(value)?;
    // The encoder only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Canonical encoding followed by a single `\n`.
pub fn to_canonical_line<T: Serialize + ?Sized>(value: &T) -> StoreResult<Vec<u8>> {
    let mut bytes = to_canonical_vec(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write the canonical encoding of `value` plus a trailing newline to
/// `path`, unless `path` already exists. Parent directories are created as
/// needed. Returns `true` when this call created the document.
pub fn write_document_new<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    sync_mode: SyncMode,
) -> StoreResult<bool> {
    atomic::write_new(path, &to_canonical_line(value)?, sync_mode)
}

/// Append one canonical line to an already-open file (opened in append mode).
pub fn append_line_to<T: Serialize + ?Sized>(
    mut file: &File,
    value: &T,
    sync_mode: SyncMode,
) -> StoreResult<()> {
    // One write call per line keeps the record contiguous under O_APPEND.
    file.write_all(&to_canonical_line(value)?)?;
    if sync_mode.syncs() {
        file.sync_data()?;
    }
    Ok(())
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> StoreResult<()> {
    match value {
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            buf.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                serde_json::to_writer(&mut *buf, key)?;
                buf.push(b':');
                encode_value_to(buf, item)?;
            }
            buf.push(b'}');
        }
        // Scalars have exactly one compact rendering.
        scalar => serde_json::to_writer(&mut *buf, scalar)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use proptest::prelude::*;
    use serde_json::{json, Map};

    #[test]
    fn keys_are_sorted_at_every_depth() {
        let value = json!({"b": 1, "a": {"z": true, "m": null}, "c": [ {"y": 1, "x": 2} ]});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"a":{"m":null,"z":true},"b":1,"c":[{"x":2,"y":1}]}"#
        );
    }

    #[test]
    fn non_ascii_is_not_escaped() {
        let value = json!({"loja": "Padaria São João", "total": "€12"});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"loja":"Padaria São João","total":"€12"}"#
        );
    }

    #[test]
    fn control_characters_are_escaped() {
        let value = json!({"text": "line1\nline2\t\"quoted\"\\"});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"text":"line1\nline2\t\"quoted\"\\"}"#
        );
    }

    #[test]
    fn struct_field_order_does_not_leak() {
        #[derive(Serialize)]
        struct Unsorted {
            zeta: u8,
            alpha: u8,
        }
        assert_eq!(
            to_canonical_string(&Unsorted { zeta: 1, alpha: 2 }).unwrap(),
            r#"{"alpha":2,"zeta":1}"#
        );
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let mut forward = Map::new();
        forward.insert("receipt_id".into(), json!("rcpt_1234"));
        forward.insert("schema".into(), json!("fdl.receipt.manifest.v1"));
        forward.insert("content".into(), json!({"sha256": "abc", "object_path": "o"}));

        let mut backward = Map::new();
        backward.insert("content".into(), json!({"object_path": "o", "sha256": "abc"}));
        backward.insert("schema".into(), json!("fdl.receipt.manifest.v1"));
        backward.insert("receipt_id".into(), json!("rcpt_1234"));

        assert_eq!(
            to_canonical_vec(&forward).unwrap(),
            to_canonical_vec(&backward).unwrap()
        );
    }

    #[test]
    fn write_document_new_adds_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/manifest.json");
        let value = json!({"b": 2, "a": 1});
        assert!(write_document_new(&path, &value, SyncMode::OsDefault).unwrap());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text, format!("{}\n", to_canonical_string(&value).unwrap()));
    }

    #[test]
    fn write_document_new_keeps_first_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        assert!(write_document_new(&path, &json!({"v": 1}), SyncMode::OsDefault).unwrap());
        assert!(!write_document_new(&path, &json!({"v": 2}), SyncMode::OsDefault).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"v\":1}\n");
    }

    #[test]
    fn append_line_to_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        append_line_to(&file, &json!({"n": 1}), SyncMode::OsDefault).unwrap();
        append_line_to(&file, &json!({"n": 2}), SyncMode::EveryWrite).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"n\":1}\n{\"n\":2}\n");
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zé€ ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn canonical_bytes_parse_back_to_same_value(value in arb_json()) {
            let bytes = to_canonical_vec(&value).unwrap();
            let parsed: Value = serde_json::from_slice(&bytes).unwrap();
            prop_assert_eq!(parsed, value);
        }

        #[test]
        fn reversed_insertion_encodes_identically(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<u32>(), 0..8)
        ) {
            let forward: Map<String, Value> =
                entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let backward: Map<String, Value> =
                entries.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();
            prop_assert_eq!(
                to_canonical_vec(&forward).unwrap(),
                to_canonical_vec(&backward).unwrap()
            );
        }
    }
}
