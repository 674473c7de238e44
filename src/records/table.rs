//! CSV source loading. Rows become ordered key -> value maps keyed by the
//! header row; empty cells load as null so downstream rules can tell
//! "missing" from "empty string" the same way for every source.

use std::path::Path;

use serde_json::Value;

use crate::context::Context;

/// One tabular source: header order plus one row-map per data row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Context>,
}

impl Table {
    pub fn from_path(path: &Path) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = Context::new();
            for (i, header) in headers.iter().enumerate() {
                let cell = record.get(i).unwrap_or("");
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                row.insert(header.clone(), value);
            }
            rows.push(row);
        }

        Ok(Table { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Find a header by substring, tolerating variants with trailing
    /// whitespace or sort-direction arrows appended by the export tool.
    pub fn find_header(&self, needle: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.contains(needle))
            .map(String::as_str)
    }

    /// Register a derived column so later collision checks see it. Values
    /// are inserted per-row by the caller.
    pub fn add_header(&mut self, name: &str) {
        if !self.has_header(name) {
            self.headers.push(name.to_string());
        }
    }

    pub fn rows(&self) -> &[Context] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Context] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Context> {
        self.rows
    }

    /// Trim whitespace around every value in a column, in place. Join keys
    /// arrive padded from some exports.
    pub fn trim_column(&mut self, name: &str) {
        if !self.has_header(name) {
            return;
        }
        for row in &mut self.rows {
            if let Some(Value::String(s)) = row.get_mut(name) {
                let trimmed = s.trim().to_string();
                *s = trimmed;
            }
        }
    }
}
