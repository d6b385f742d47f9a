//! Data normalization: CSV/JSON/YAML files → a uniform [`CardSequence`].
//!
//! ## Why normalize at all?
//!
//! Card data arrives in whatever shape the deck author found convenient — a
//! spreadsheet export with repeated columns, a hand-written YAML list, a JSON
//! dump from another tool. Everything downstream (templates, filenames,
//! quantities) wants one predictable record shape. This module is the single
//! place where the mess is resolved; past it, the [`FieldValue`] union holds.
//!
//! ## CSV specifics
//!
//! Spreadsheets encode list-valued fields as repeated columns
//! (`name,color,color`). The parser renames duplicate headers to synthetic
//! names (`color_1`, `color_2`, …), and the merge step collapses each
//! synthetic column back into an ordered list under the original name,
//! skipping empty cells. CSV cells are all text, so a shallow coercion pass
//! then recovers booleans (literal `TRUE`/`FALSE`) and numbers; coercion
//! does not recurse into merged lists.
//!
//! JSON and YAML are trusted to carry correct types already — they get no
//! coercion, only enforcement of the value union at the boundary.

use crate::error::CardpressError;
use crate::record::{CardRecord, CardSequence, FieldValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Parse a data file into cards, dispatching on the file extension
/// (case-insensitive).
///
/// Returns `Ok(None)` when the extension maps to no known parser — callers
/// must treat that as a fatal configuration error. Malformed content is an
/// error in its own right.
pub async fn normalize(path: &Path) -> Result<Option<CardSequence>, CardpressError> {
    match extension_of(path).as_str() {
        "csv" => {
            let text = read_to_string(path).await?;
            parse_csv_text(&text, path).map(Some)
        }
        "json" | "yml" | "yaml" => normalize_sync(path),
        _ => Ok(None),
    }
}

/// Synchronous variant for the structural formats (JSON/YAML) only.
///
/// CSV is deliberately excluded — tabular parsing is only reachable through
/// the async [`normalize`]. Returns `Ok(None)` for `.csv` and unknown
/// extensions alike.
pub fn normalize_sync(path: &Path) -> Result<Option<CardSequence>, CardpressError> {
    match parse_structural_sync(path)? {
        Some(value) => records_from_value(value, path).map(Some),
        None => Ok(None),
    }
}

/// Synchronously parse a JSON/YAML file into a raw value tree, without the
/// record conversion.
///
/// This is the entry point for config-file loading, which wants a flat
/// mapping of settings rather than a sequence of cards. Returns `Ok(None)`
/// for unsupported extensions.
pub fn parse_structural_sync(path: &Path) -> Result<Option<Value>, CardpressError> {
    let parse = |text: String| -> Result<Value, CardpressError> {
        match extension_of(path).as_str() {
            "json" => serde_json::from_str(&text).map_err(|e| CardpressError::MalformedData {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }),
            _ => serde_yaml::from_str(&text).map_err(|e| CardpressError::MalformedData {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }),
        }
    };

    match extension_of(path).as_str() {
        "json" | "yml" | "yaml" => {
            let text =
                std::fs::read_to_string(path).map_err(|source| CardpressError::DataRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            parse(text).map(Some)
        }
        _ => Ok(None),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

async fn read_to_string(path: &Path) -> Result<String, CardpressError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CardpressError::DataRead {
            path: path.to_path_buf(),
            source,
        })
}

// ── Tabular (CSV) parsing ────────────────────────────────────────────────

/// A duplicate header and the original column name it shadows.
struct RenamedHeader {
    synthetic: String,
    original: String,
}

/// An intermediate cell: raw text, or an already-merged list.
enum Cell {
    One(String),
    Many(Vec<String>),
}

fn parse_csv_text(text: &str, path: &Path) -> Result<CardSequence, CardpressError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| malformed(path, e))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let (names, renamed) = rename_duplicate_headers(&headers);

    let mut cards = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| malformed(path, e))?;

        let mut cells: BTreeMap<String, Cell> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = row.get(i).unwrap_or_default().to_string();
                (name.clone(), Cell::One(value))
            })
            .collect();

        merge_renamed(&mut cells, &renamed);

        let card: CardRecord = cells
            .into_iter()
            .filter_map(|(name, cell)| coerce_cell(cell).map(|value| (name, value)))
            .collect();
        if !card.is_empty() {
            cards.push(card);
        }
    }

    debug!("parsed {} cards from {}", cards.len(), path.display());
    Ok(cards)
}

/// Assign synthetic names to duplicate headers, keeping the first occurrence
/// under its own name. Returns the effective per-column names and the
/// synthetic→original pairs in column order.
fn rename_duplicate_headers(headers: &[String]) -> (Vec<String>, Vec<RenamedHeader>) {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    let mut renamed = Vec::new();

    for header in headers {
        if !names.contains(header) {
            names.push(header.clone());
            continue;
        }
        let mut suffix = 1;
        let mut synthetic = format!("{header}_{suffix}");
        while names.contains(&synthetic) || headers.contains(&synthetic) {
            suffix += 1;
            synthetic = format!("{header}_{suffix}");
        }
        renamed.push(RenamedHeader {
            synthetic: synthetic.clone(),
            original: header.clone(),
        });
        names.push(synthetic);
    }

    (names, renamed)
}

/// Collapse each synthetic column into an ordered list under its original
/// name.
///
/// For every pair the original's value (when non-empty) is appended first,
/// then the synthetic's; the synthetic key is always removed. A row where
/// only the duplicate column carries data still yields a single-element
/// list. When neither column has data the field stays absent.
fn merge_renamed(cells: &mut BTreeMap<String, Cell>, renamed: &[RenamedHeader]) {
    for pair in renamed {
        let extra = match cells.remove(&pair.synthetic) {
            Some(Cell::One(s)) if !s.is_empty() => Some(s),
            _ => None,
        };

        let mut values = match cells.remove(&pair.original) {
            Some(Cell::Many(list)) => list,
            Some(Cell::One(s)) if !s.is_empty() => vec![s],
            _ => Vec::new(),
        };

        if values.is_empty() && extra.is_none() {
            continue;
        }
        values.extend(extra);
        cells.insert(pair.original.clone(), Cell::Many(values));
    }
}

/// Shallow type coercion for one CSV cell. `None` drops the field.
///
/// Literal `TRUE`/`FALSE` become booleans, numeric text becomes a number
/// (integers preferred over floats), everything else stays text. Merged
/// lists pass through untouched — coercion does not recurse.
fn coerce_cell(cell: Cell) -> Option<FieldValue> {
    match cell {
        Cell::Many(list) if list.is_empty() => None,
        Cell::Many(list) => Some(FieldValue::List(list)),
        Cell::One(raw) => coerce_scalar(&raw),
    }
}

fn coerce_scalar(raw: &str) -> Option<FieldValue> {
    if raw.is_empty() {
        return None;
    }
    if raw == "TRUE" {
        return Some(FieldValue::Bool(true));
    }
    if raw == "FALSE" {
        return Some(FieldValue::Bool(false));
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Some(FieldValue::Number(int.into()));
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Some(FieldValue::Number(number));
        }
    }
    Some(FieldValue::Text(raw.to_string()))
}

// ── Structural (JSON/YAML) parsing ───────────────────────────────────────

/// Convert a parsed value tree into cards.
///
/// Accepts a top-level array of records, or an object of records whose
/// values are taken in source order (the `preserve_order` serde_json
/// feature keeps object iteration faithful to the file).
fn records_from_value(value: Value, path: &Path) -> Result<CardSequence, CardpressError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| record_from_value(item, path, i))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .enumerate()
            .map(|(i, (_, item))| record_from_value(item, path, i))
            .collect(),
        _ => Err(CardpressError::MalformedData {
            path: path.to_path_buf(),
            detail: "expected an array of records or an object of records".to_string(),
        }),
    }
}

fn record_from_value(value: Value, path: &Path, index: usize) -> Result<CardRecord, CardpressError> {
    let Value::Object(map) = value else {
        return Err(CardpressError::MalformedData {
            path: path.to_path_buf(),
            detail: format!("record {index} is not a mapping"),
        });
    };

    let mut card = CardRecord::default();
    for (name, value) in map {
        if let Some(field) = field_from_value(value, path, index, &name)? {
            card.insert(name, field);
        }
    }
    Ok(card)
}

/// Enforce the field-value union at the boundary. `None` omits the field
/// (nulls, empty strings, empty lists — the sparseness invariant).
fn field_from_value(
    value: Value,
    path: &Path,
    index: usize,
    name: &str,
) -> Result<Option<FieldValue>, CardpressError> {
    let nested = |kind: &str| CardpressError::MalformedData {
        path: path.to_path_buf(),
        detail: format!(
            "record {index}, field '{name}': {kind} values are not supported; \
             card fields are scalars or lists of scalars"
        ),
    };

    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(FieldValue::Bool(b))),
        Value::Number(n) => Ok(Some(FieldValue::Number(n))),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(FieldValue::Text(s))),
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => {}
                    Value::String(s) if s.is_empty() => {}
                    Value::String(s) => list.push(s),
                    Value::Bool(b) => list.push(b.to_string()),
                    Value::Number(n) => list.push(n.to_string()),
                    Value::Array(_) | Value::Object(_) => return Err(nested("nested")),
                }
            }
            Ok(if list.is_empty() {
                None
            } else {
                Some(FieldValue::List(list))
            })
        }
        Value::Object(_) => Err(nested("mapping")),
    }
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> CardpressError {
    CardpressError::MalformedData {
        path: path.to_path_buf(),
        detail: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn csv(text: &str) -> CardSequence {
        parse_csv_text(text, &PathBuf::from("test.csv")).unwrap()
    }

    fn json(text: &str) -> CardSequence {
        records_from_value(
            serde_json::from_str(text).unwrap(),
            &PathBuf::from("test.json"),
        )
        .unwrap()
    }

    #[test]
    fn duplicate_columns_merge_into_list() {
        let cards = csv("name,color,color\nA,red,blue\n");
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].get("name"),
            Some(&FieldValue::Text("A".to_string()))
        );
        assert_eq!(
            cards[0].get("color"),
            Some(&FieldValue::List(vec!["red".into(), "blue".into()]))
        );
        // the synthetic key never survives
        assert_eq!(cards[0].get("color_1"), None);
    }

    #[test]
    fn duplicate_merge_skips_empty_cells() {
        let cards = csv("name,color,color\nA,red,\n");
        assert_eq!(
            cards[0].get("color"),
            Some(&FieldValue::List(vec!["red".into()]))
        );
    }

    #[test]
    fn only_duplicate_column_has_data() {
        let cards = csv("name,color,color\nA,,blue\n");
        assert_eq!(
            cards[0].get("color"),
            Some(&FieldValue::List(vec!["blue".into()]))
        );
    }

    #[test]
    fn three_duplicate_columns_keep_order() {
        let cards = csv("color,color,color\nred,green,blue\n");
        assert_eq!(
            cards[0].get("color"),
            Some(&FieldValue::List(vec![
                "red".into(),
                "green".into(),
                "blue".into()
            ]))
        );
    }

    #[test]
    fn empty_values_are_pruned() {
        let cards = csv("name,age\nA,\n");
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].get("name"),
            Some(&FieldValue::Text("A".to_string()))
        );
        assert_eq!(cards[0].get("age"), None);
    }

    #[test]
    fn scalar_coercion() {
        let cards = csv("flag,no,count,label\nTRUE,FALSE,42,foo\n");
        assert_eq!(cards[0].get("flag"), Some(&FieldValue::Bool(true)));
        assert_eq!(cards[0].get("no"), Some(&FieldValue::Bool(false)));
        assert_eq!(cards[0].get("count"), Some(&FieldValue::Number(42.into())));
        assert_eq!(
            cards[0].get("label"),
            Some(&FieldValue::Text("foo".to_string()))
        );
    }

    #[test]
    fn coercion_keeps_floats_and_rejects_lowercase_booleans() {
        let cards = csv("hp,flag\n1.5,true\n");
        assert_eq!(
            cards[0].get("hp"),
            Some(&FieldValue::Number(
                serde_json::Number::from_f64(1.5).unwrap()
            ))
        );
        // only the literal upper-case spellings coerce
        assert_eq!(
            cards[0].get("flag"),
            Some(&FieldValue::Text("true".to_string()))
        );
    }

    #[test]
    fn coercion_is_shallow_over_merged_lists() {
        let cards = csv("cost,cost\n1,2\n");
        assert_eq!(
            cards[0].get("cost"),
            Some(&FieldValue::List(vec!["1".into(), "2".into()]))
        );
    }

    #[test]
    fn empty_rows_are_dropped() {
        let cards = csv("name,age\nA,30\n,\nB,40\n");
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].get("name"), Some(&FieldValue::Text("B".into())));
    }

    #[test]
    fn short_rows_are_padded() {
        let cards = csv("name,age\nA\n");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].get("age"), None);
    }

    #[test]
    fn json_array_of_records() {
        let cards = json(r#"[{"name": "A", "hp": 3}, {"name": "B", "flying": true}]"#);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].get("hp"), Some(&FieldValue::Number(3.into())));
        assert_eq!(cards[1].get("flying"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn json_object_of_records_keeps_source_order() {
        let cards = json(r#"{"zeta": {"name": "Z"}, "alpha": {"name": "A"}}"#);
        assert_eq!(cards[0].get("name"), Some(&FieldValue::Text("Z".into())));
        assert_eq!(cards[1].get("name"), Some(&FieldValue::Text("A".into())));
    }

    #[test]
    fn structural_omits_null_and_empty_fields() {
        let cards = json(r#"[{"name": "A", "subtitle": "", "note": null, "tags": []}]"#);
        assert_eq!(cards[0].len(), 1);
    }

    #[test]
    fn structural_accepts_string_lists() {
        let cards = json(r#"[{"colors": ["red", "", "blue"]}]"#);
        assert_eq!(
            cards[0].get("colors"),
            Some(&FieldValue::List(vec!["red".into(), "blue".into()]))
        );
    }

    #[test]
    fn structural_rejects_nested_mappings() {
        let value: Value = serde_json::from_str(r#"[{"stats": {"hp": 3}}]"#).unwrap();
        let err = records_from_value(value, &PathBuf::from("test.json"));
        assert!(matches!(err, Err(CardpressError::MalformedData { .. })));
    }

    #[test]
    fn structural_has_no_coercion() {
        let cards = json(r#"[{"flag": "TRUE", "count": "42"}]"#);
        assert_eq!(cards[0].get("flag"), Some(&FieldValue::Text("TRUE".into())));
        assert_eq!(cards[0].get("count"), Some(&FieldValue::Text("42".into())));
    }

    #[test]
    fn yaml_parses_like_json() {
        let value: Value = serde_yaml::from_str("- name: A\n  hp: 3\n- name: B\n").unwrap();
        let cards = records_from_value(value, &PathBuf::from("test.yml")).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].get("hp"), Some(&FieldValue::Number(3.into())));
    }

    #[test]
    fn normalization_is_idempotent_over_json() {
        let text = r#"[{"name": "A", "hp": 3, "colors": ["red", "blue"]}]"#;
        assert_eq!(json(text), json(text));
    }

    #[tokio::test]
    async fn unsupported_extension_yields_none() {
        // extension dispatch happens before any file I/O
        let result = normalize(&PathBuf::from("cards.txt")).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn sync_variant_excludes_csv() {
        let result = normalize_sync(&PathBuf::from("cards.csv")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn renamed_headers_avoid_existing_names() {
        let headers = vec!["color".to_string(), "color_1".to_string(), "color".to_string()];
        let (names, renamed) = rename_duplicate_headers(&headers);
        assert_eq!(names[0], "color");
        assert_eq!(names[1], "color_1");
        // second duplicate of "color" must not collide with the real color_1
        assert_eq!(names[2], "color_2");
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].original, "color");
    }
}
