//! The normalized card data model.
//!
//! Input files are heterogeneous — CSV cells are all text, JSON and YAML
//! carry native types, duplicate CSV columns become lists — but everything
//! downstream of the normalizer sees exactly one shape: a sparse, string-keyed
//! record whose values are drawn from a small union. The union is enforced
//! once, at the normalization boundary; the renderer and orchestrator never
//! have to defend against surprise shapes.
//!
//! ## Sparseness invariant
//!
//! Absent and empty fields are *omitted*, never stored as `""`, `null`, or
//! `[]`. Templates rely on this: `{% if card.rarity %}` distinguishes "field
//! present" from "field missing" without a separate emptiness check.

use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap};

/// One field value of a normalized card record.
///
/// Numbers are kept as [`serde_json::Number`] so that integers survive as
/// integers — a card with `id: 7` must render as `card_7.png`, not
/// `card_7.0.png`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean, from a JSON/YAML bool or a literal CSV `TRUE`/`FALSE` cell.
    Bool(bool),
    /// Integer or float.
    Number(serde_json::Number),
    /// Plain text.
    Text(String),
    /// Ordered list of non-empty strings, e.g. merged duplicate CSV columns.
    List(Vec<String>),
}

impl FieldValue {
    /// The value as text, when it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One card: a sparse mapping from field name to [`FieldValue`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CardRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl CardRecord {
    /// True when the record holds no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: String, value: FieldValue) {
        self.fields.insert(name, value);
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    /// Repeat count for PDF assembly: the value under `key` when it is
    /// numeric, 1 otherwise (absent, non-numeric, negative, or fractional).
    pub fn quantity(&self, key: &str) -> usize {
        match self.fields.get(key) {
            Some(FieldValue::Number(n)) => n.as_u64().map(|v| v as usize).unwrap_or(1),
            _ => 1,
        }
    }

    /// Best-effort display label for progress diagnostics: the `name` field
    /// when present and textual.
    pub fn display_name(&self) -> Option<&str> {
        self.fields.get("name").and_then(FieldValue::as_text)
    }
}

impl FromIterator<(String, FieldValue)> for CardRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        CardRecord {
            fields: iter.into_iter().collect(),
        }
    }
}

/// All cards of one run, in source-file order.
///
/// Order is load-bearing: PNG filenames may embed the index and the PDF sheet
/// lays out rasters in sequence order.
pub type CardSequence = Vec<CardRecord>;
