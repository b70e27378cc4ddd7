//! Statement parameters and result rows.

use crate::DbError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value as Json};
use std::sync::Arc;

/// A SQLite value, bound as a statement parameter or read from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Non-finite reals have no JSON form and become `null`.
impl From<&Value> for Json {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Json::Null,
            Value::Integer(i) => Json::from(*i),
            Value::Real(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Text(s) => Json::String(s.clone()),
        }
    }
}

/// Blobs are read back as lossy UTF-8 text.
#[cfg(target_arch = "wasm32")]
impl From<spin_sdk::sqlite::Value> for Value {
    fn from(value: spin_sdk::sqlite::Value) -> Self {
        use spin_sdk::sqlite::Value as Sqlite;
        match value {
            Sqlite::Null => Value::Null,
            Sqlite::Integer(i) => Value::Integer(i),
            Sqlite::Real(f) => Value::Real(f),
            Sqlite::Text(s) => Value::Text(s),
            Sqlite::Blob(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl From<Value> for spin_sdk::sqlite::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Integer(i) => Self::Integer(i),
            Value::Real(f) => Self::Real(f),
            Value::Text(s) => Self::Text(s),
        }
    }
}

/// One result row. Rows of a [`QueryResult`] share its column names.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .zip(&self.values)
            .find_map(|(name, value)| (name == column).then_some(value))
    }

    /// The row as a JSON object keyed by column name.
    pub fn to_json(&self) -> Map<String, Json> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().map(Json::from))
            .collect()
    }

    /// Deserialize the row into `T`, matching fields to column names.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DbError> {
        Ok(serde_json::from_value(Json::Object(self.to_json()))?)
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl QueryResult {
    /// Build a result from column names and each row's values in column order.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| Row {
                columns: Arc::clone(&columns),
                values,
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Deserialize the first row, if there is one.
    pub fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DbError> {
        self.first().map(Row::deserialize).transpose()
    }
}
