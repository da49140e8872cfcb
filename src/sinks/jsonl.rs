use super::{RowSink, TableRow, column_json};
use anyhow::Result;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonlSink {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl JsonlSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn stdout() -> Result<Self> {
        Ok(Self::from_writer(Box::new(std::io::stdout())))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

impl RowSink for JsonlSink {
    fn add_row(&mut self, row: TableRow) -> Result<()> {
        let mut line = Map::new();
        line.insert("table".to_string(), Value::String(row.table));
        line.insert("key".to_string(), Value::String(row.key));
        line.insert("value".to_string(), Value::String(row.value));
        line.insert("id".to_string(), Value::from(row.id));
        if let Some(member) = row.member {
            line.insert("member".to_string(), Value::from(member));
        }
        let values = row.row.into_iter().map(column_json).collect();
        line.insert("row".to_string(), Value::Array(values));

        serde_json::to_writer(&mut self.writer, &Value::Object(line))?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
