use std::any::type_name;

use arrow::{
    array::{Array, AsArray},
    record_batch::RecordBatch,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::grant::GrantRow;

#[derive(Debug, thiserror::Error)]
pub enum JsonTableError {
    #[error("expected JsonResult.value to be an array of rows, got: {0}")]
    NotAnArray(&'static str),

    #[error("expected row {row} to be an array, got: {got}")]
    RowNotAnArray { row: usize, got: &'static str },

    #[error("column not in result: {0}")]
    UnknownColumn(String),

    #[error("column {col} (index {idx}) missing in row {row}")]
    MissingCell { col: String, idx: usize, row: usize },

    #[error("failed to parse column {col} in row {row} as type {type}: {source}")]
    DeserializeTypedCell {
        col: String,
        r#type: String,
        row: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// View over a query result's row.
pub struct RecordRef<'a> {
    schema: &'a [snowflake_api::FieldSchema],
    row: &'a [Value],
    row_idx: usize,
}

impl<'a> RecordRef<'a> {
    fn col_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let idx = self.col_index(name)?;
        self.row.get(idx)
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, JsonTableError> {
        let Some(v) = self.get(name) else { return Ok(None) };

        Ok(Some(T::deserialize(v).map_err(|e| JsonTableError::DeserializeTypedCell {
            r#type: type_name::<T>().to_string(),
            col: name.to_string(),
            row: self.row_idx,
            source: e,
        })?))
    }

    /// Like get(), but errors if not present
    pub fn require(&self, name: &str) -> Result<&'a Value, JsonTableError> {
        let idx = self
            .col_index(name)
            .ok_or_else(|| JsonTableError::UnknownColumn(name.to_string()))?;

        self.row.get(idx).ok_or_else(|| JsonTableError::MissingCell {
            col: name.to_string(),
            idx,
            row: self.row_idx,
        })
    }

    pub fn require_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, JsonTableError> {
        let v = self.require(name)?;
        serde_json::from_value(v.clone()).map_err(|e| JsonTableError::DeserializeTypedCell {
            r#type: type_name::<T>().to_string(),
            col: name.to_string(),
            row: self.row_idx,
            source: e,
        })
    }

    /// First of `names` present in the result, as a string.
    /// `SHOW GRANTS` and `SHOW FUTURE GRANTS` disagree on some column names.
    pub fn require_any_as_string(&self, names: &[&str]) -> Result<String, JsonTableError> {
        let Some(name) = names.iter().find(|n| self.col_index(n).is_some()) else {
            return Err(JsonTableError::UnknownColumn(names.join(" | ")));
        };
        self.require_as(name)
    }
}

pub struct RecordsIter<'a> {
    schema: &'a [snowflake_api::FieldSchema],
    rows: std::slice::Iter<'a, Value>,
    row_idx: usize,
}

impl<'a> Iterator for RecordsIter<'a> {
    type Item = Result<RecordRef<'a>, JsonTableError>;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.rows.next()?;
        let idx = self.row_idx;
        self.row_idx += 1;

        match v.as_array() {
            Some(arr) => Some(Ok(RecordRef {
                schema: self.schema,
                row: arr.as_slice(),
                row_idx: idx,
            })),
            None => Some(Err(JsonTableError::RowNotAnArray {
                row: idx,
                got: json_kind(v),
            })),
        }
    }
}

/// Helper because serde_json::Value doesn't expose a simple "kind()".
fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub trait JsonResultExt {
    fn iter_records(&self) -> Result<RecordsIter<'_>, JsonTableError>;
}

impl JsonResultExt for snowflake_api::JsonResult {
    fn iter_records(&self) -> Result<RecordsIter<'_>, JsonTableError> {
        let rows = self
            .value
            .as_array()
            .ok_or(JsonTableError::NotAnArray(json_kind(&self.value)))?;

        Ok(RecordsIter {
            schema: &self.schema,
            rows: rows.iter(),
            row_idx: 0,
        })
    }
}

/// grant_option comes back as `"true"`/`"false"` text, or occasionally as a bool.
fn grant_option_from_value(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

impl TryFrom<&RecordRef<'_>> for GrantRow {
    type Error = JsonTableError;

    fn try_from(row: &RecordRef<'_>) -> Result<Self, Self::Error> {
        Ok(GrantRow {
            privilege: row.require_as("privilege")?,
            granted_on: row.require_any_as_string(&["granted_on", "grant_on"])?,
            granted_to: row.require_any_as_string(&["granted_to", "grant_to"])?,
            grantee_name: row.require_as("grantee_name")?,
            grant_option: grant_option_from_value(row.get("grant_option")),
        })
    }
}

pub fn grant_rows_from_json(json_result: &snowflake_api::JsonResult) -> Result<Vec<GrantRow>, JsonTableError> {
    let mut rows = Vec::new();
    for row in json_result.iter_records()? {
        rows.push(GrantRow::try_from(&row?)?);
    }
    Ok(rows)
}

fn arrow_string(batch: &RecordBatch, names: &[&str], row: usize) -> Option<String> {
    let idx = names.iter().find_map(|n| batch.schema().index_of(n).ok())?;
    let column = batch.column(idx);
    if column.is_null(row) {
        return None;
    }
    if let Some(strings) = column.as_string_opt::<i32>() {
        return Some(strings.value(row).to_string());
    }
    column.as_boolean_opt().map(|bools| bools.value(row).to_string())
}

pub fn grant_rows_from_arrow(batches: &[RecordBatch]) -> Result<Vec<GrantRow>, JsonTableError> {
    let mut rows = Vec::new();
    let mut row_idx = 0;

    for batch in batches {
        for i in 0..batch.num_rows() {
            let require = |names: &[&str]| {
                arrow_string(batch, names, i).ok_or_else(|| JsonTableError::MissingCell {
                    col: names.join(" | "),
                    idx: i,
                    row: row_idx,
                })
            };

            rows.push(GrantRow {
                privilege: require(&["privilege"])?,
                granted_on: require(&["granted_on", "grant_on"])?,
                granted_to: require(&["granted_to", "grant_to"])?,
                grantee_name: require(&["grantee_name"])?,
                grant_option: arrow_string(batch, &["grant_option"], i)
                    .is_some_and(|s| s.eq_ignore_ascii_case("true")),
            });
            row_idx += 1;
        }
    }

    Ok(rows)
}
