//! Dataset contract and the in-memory driver.
//!
//! Real drivers (delimited text, OGC services, JDBC-style sources,
//! shapefiles) are host collaborators; the interpreter fetches rows
//! through the [`Dataset`] trait only. [`MemoryDataset`] backs tests and
//! the CLI's `internal` dataset type.

use core_value::Value;
use core_value::error::{MapyrusError, Result};

/// An open tabular/geographic data source.
pub trait Dataset {
    fn field_names(&self) -> &[String];
    /// Next row, or `None` when exhausted.
    fn fetch(&mut self) -> Result<Option<super::Row>>;
    fn close(&mut self);
}

/// Opens datasets by type name; installed into the interpreter by the host.
pub trait DatasetFactory {
    fn open(&self, kind: &str, name: &str, extras: &str) -> Result<Box<dyn Dataset>>;
}

/// Rows held in memory, consumed front to back.
pub struct MemoryDataset {
    fields: Vec<String>,
    rows: std::collections::VecDeque<super::Row>,
}

impl MemoryDataset {
    pub fn new(fields: Vec<String>, rows: Vec<super::Row>) -> Self {
        Self {
            fields,
            rows: rows.into(),
        }
    }
}

impl Dataset for MemoryDataset {
    fn field_names(&self) -> &[String] {
        &self.fields
    }

    fn fetch(&mut self) -> Result<Option<super::Row>> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.rows.clear();
    }
}

/// Factory serving named in-memory tables; `open` parses the extras string
/// as whitespace-separated `field=value` pairs when the named table is not
/// registered, giving scripts a one-row inline table for testing.
#[derive(Default)]
pub struct MemoryDatasetFactory {
    tables: std::collections::HashMap<String, (Vec<String>, Vec<super::Row>)>,
}

impl MemoryDatasetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, fields: Vec<String>, rows: Vec<super::Row>) {
        self.tables.insert(name.to_string(), (fields, rows));
    }
}

impl DatasetFactory for MemoryDatasetFactory {
    fn open(&self, kind: &str, name: &str, extras: &str) -> Result<Box<dyn Dataset>> {
        if kind != "internal" {
            return Err(MapyrusError::InvalidFormat(format!(
                "unknown dataset type {kind}"
            )));
        }
        if let Some((fields, rows)) = self.tables.get(name) {
            return Ok(Box::new(MemoryDataset::new(fields.clone(), rows.clone())));
        }
        let mut fields = Vec::new();
        let mut row = Vec::new();
        for pair in extras.split_whitespace() {
            if let Some((field, value)) = pair.split_once('=') {
                fields.push(field.to_string());
                row.push(Value::Str(value.to_string()));
            }
        }
        if fields.is_empty() {
            return Err(MapyrusError::InvalidFormat(format!(
                "no dataset named {name}"
            )));
        }
        Ok(Box::new(MemoryDataset::new(fields, vec![row])))
    }
}
