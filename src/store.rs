//! Labeled example tables and the immutable example store.
//!
//! [`ExampleTable`] is the loose tabular shape handed over by whatever
//! ingested the data (spreadsheet export, JSON dump): arbitrary column
//! names, optional cells. [`ExampleStore`] is the validated form the
//! classifiers consume: an ordered list of [`LabeledExample`]s that never
//! changes after construction.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::types::{Intent, LabeledExample};
use crate::{PatisserieError, Result};

/// Canonical name of the utterance column.
pub const TEXT_COLUMN: &str = "text";
/// Canonical name of the label column.
pub const INTENT_COLUMN: &str = "intent";

/// Raw rows with named columns. Missing cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ExampleTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Its width must match the column count.
    pub fn push_row<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let row: Vec<Option<String>> = cells.into_iter().map(|c| c.map(Into::into)).collect();
        if row.len() != self.columns.len() {
            return Err(PatisserieError::InvalidInput(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Build a table from JSON objects. Columns appear in first-seen order;
    /// `null` cells are treated as missing and non-string scalars are
    /// stringified.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| match record.get(column) {
                        None | Some(Value::Null) => None,
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(other) => Some(other.to_string()),
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Parse a JSON array of row objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<Map<String, Value>> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Read a JSON array of row objects from disk.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PatisserieError::DataError(format!("failed to read dataset {path:?}: {e}"))
        })?;
        Self::from_json_str(&content)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lowercase and trim every column name.
    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().to_lowercase();
        }
    }

    /// Normalise column names, then map the usual export variants onto the
    /// canonical names: anything mentioning "category" or "intent" becomes
    /// `intent`, anything mentioning "sentence" or "text" becomes `text`.
    pub fn canonicalize_columns(&mut self) {
        self.normalize_columns();
        for column in &mut self.columns {
            if column.contains("category") || column.contains(INTENT_COLUMN) {
                *column = INTENT_COLUMN.to_string();
            } else if column.contains("sentence") || column.contains(TEXT_COLUMN) {
                *column = TEXT_COLUMN.to_string();
            }
        }
    }

    /// Index of the first column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate `(text, intent)` cell pairs using the canonical column names.
    ///
    /// Fails if either column is absent.
    pub fn labeled_cells(&self) -> Result<impl Iterator<Item = (Option<&str>, Option<&str>)>> {
        let text_idx = self.require_column(TEXT_COLUMN)?;
        let intent_idx = self.require_column(INTENT_COLUMN)?;
        Ok(self
            .rows
            .iter()
            .map(move |row| (row[text_idx].as_deref(), row[intent_idx].as_deref())))
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            PatisserieError::InvalidInput(format!(
                "dataset has no '{name}' column (columns: {})",
                self.columns.join(", ")
            ))
        })
    }
}

impl From<&ExampleStore> for ExampleTable {
    fn from(store: &ExampleStore) -> Self {
        Self {
            columns: vec![TEXT_COLUMN.to_string(), INTENT_COLUMN.to_string()],
            rows: store
                .iter()
                .map(|ex| vec![Some(ex.text.clone()), Some(ex.intent.as_str().to_string())])
                .collect(),
        }
    }
}

/// Ordered, immutable collection of labeled examples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleStore {
    examples: Vec<LabeledExample>,
}

impl ExampleStore {
    pub fn new(examples: Vec<LabeledExample>) -> Self {
        Self { examples }
    }

    /// Validate a table into a store.
    ///
    /// Column names are canonicalised first; a table still lacking `text`
    /// or `intent` is refused. Rows with a missing or blank text, or an
    /// intent outside the five known labels, are skipped with a warning.
    pub fn from_table(mut table: ExampleTable) -> Result<Self> {
        table.canonicalize_columns();

        let mut examples = Vec::with_capacity(table.len());
        let mut skipped = 0usize;
        for (text, intent) in table.labeled_cells()? {
            let text = text.map(str::trim).filter(|t| !t.is_empty());
            let intent = intent.and_then(|i| i.parse::<Intent>().ok());
            match (text, intent) {
                (Some(text), Some(intent)) => examples.push(LabeledExample::new(text, intent)),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "skipped rows without usable text or intent");
        }
        info!(examples = examples.len(), "example store loaded");

        Ok(Self { examples })
    }

    /// Load and validate a JSON dataset.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_table(ExampleTable::from_json_path(path)?)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LabeledExample> {
        self.examples.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledExample> {
        self.examples.iter()
    }

    pub fn as_slice(&self) -> &[LabeledExample] {
        &self.examples
    }

    /// Texts in store order, for batch embedding.
    pub fn texts(&self) -> Vec<&str> {
        self.examples.iter().map(|ex| ex.text.as_str()).collect()
    }
}

impl FromIterator<LabeledExample> for ExampleStore {
    fn from_iter<T: IntoIterator<Item = LabeledExample>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ExampleStore {
    type Item = &'a LabeledExample;
    type IntoIter = std::slice::Iter<'a, LabeledExample>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_export_column_names() {
        let mut table = ExampleTable::new([" Sentence ", "CATEGORY"]);
        table.canonicalize_columns();
        assert_eq!(table.columns(), ["text", "intent"]);
    }

    #[test]
    fn store_refuses_table_without_intent_column() {
        let mut table = ExampleTable::new(["text", "label"]);
        table.push_row([Some("merhaba"), Some("greeting")]).unwrap();
        let err = ExampleStore::from_table(table).unwrap_err();
        assert!(err.to_string().contains("intent"));
    }

    #[test]
    fn store_skips_unusable_rows() {
        let table = ExampleTable::from_json_str(
            r#"[
                {"Text": "merhaba", "Intent": "greeting"},
                {"Text": "   ", "Intent": "greeting"},
                {"Text": "bir sütlaç", "Intent": "order"},
                {"Text": null, "Intent": "goodbye"},
                {"Text": "görüşürüz", "Intent": "Goodbye "}
            ]"#,
        )
        .unwrap();

        let store = ExampleStore::from_table(table).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().intent, Intent::Greeting);
        assert_eq!(store.get(1).unwrap().text, "görüşürüz");
        assert_eq!(store.get(1).unwrap().intent, Intent::Goodbye);
    }

    #[test]
    fn push_row_checks_width() {
        let mut table = ExampleTable::new(["text", "intent"]);
        assert!(table.push_row([Some("only one")]).is_err());
    }

    #[test]
    fn store_round_trips_through_table() {
        let store: ExampleStore = [
            LabeledExample::new("merhaba", Intent::Greeting),
            LabeledExample::new("hoşça kal", Intent::Goodbye),
        ]
        .into_iter()
        .collect();

        let again = ExampleStore::from_table(ExampleTable::from(&store)).unwrap();
        assert_eq!(again, store);
    }

    #[test]
    fn records_keep_first_seen_column_order() {
        let table = ExampleTable::from_json_str(
            r#"[{"intent": "greeting", "text": "selam"}, {"text": "x", "id": 3}]"#,
        )
        .unwrap();
        assert_eq!(table.columns(), ["intent", "text", "id"]);
        assert_eq!(table.len(), 2);
    }
}
