use anyhow::Result;
use serde_json::Value;

use crate::mapping::{ColumnValue, Row};

pub mod jsonl;

pub use self::jsonl::JsonlSink;

/// One materialized row, tagged with the table and the tag that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub table: String,
    pub key: String,
    pub value: String,
    pub id: i64,
    /// Member id for relation member rows.
    pub member: Option<i64>,
    pub row: Row,
}

pub fn column_json(value: Option<ColumnValue>) -> Value {
    match value {
        None => Value::Null,
        Some(ColumnValue::String(val)) => Value::String(val),
        Some(ColumnValue::Integer(val)) => Value::from(val),
        Some(ColumnValue::Float(val)) => Value::from(val),
        Some(ColumnValue::Bool(val)) => Value::Bool(val),
        Some(ColumnValue::Json(val)) => val,
    }
}

pub trait RowSink: Send {
    fn add_row(&mut self, row: TableRow) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
