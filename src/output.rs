//! Terminal and file output for the command line tool
//!
//! # Features
//!
//! * Table, JSON and YAML rendering of any serializable value
//! * Coloured status lines on stderr
//! * Spinner for network steps
//! * Row views for bulk status and result listings

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::ValueEnum;
use colored::*;
use comfy_table::Table;
use derive_more::{Display, Error, From};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{BulkOutcome, BulkRequestHandle, BulkResult, BulkStatus};
use crate::dns::bulk_results::BulkEntry;

#[derive(Debug, Display, From, Error)]
pub enum OutputError {
    Io(io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

/// Output formatter
pub struct OutputFormatter {
    format: OutputFormat,
    suppress: bool,
    out_file: Option<PathBuf>,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, no_color: bool, suppress: bool, out_file: Option<PathBuf>) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            format,
            suppress,
            out_file,
        }
    }

    pub fn render(&self, data: &Value) -> Result<String, OutputError> {
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(data)?,
            OutputFormat::Yaml => serde_yaml::to_string(data)?,
            OutputFormat::Table => render_table(data),
        };
        Ok(rendered)
    }

    /// Renders `data` to the output file, or stdout unless suppressed.
    pub fn emit<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), OutputError> {
        let rendered = self.render(&serde_json::to_value(data)?)?;

        match &self.out_file {
            Some(path) => {
                fs::write(path, rendered)?;
                self.print_info(&format!("Output written to {}", path.display()));
            }
            None if !self.suppress => println!("{}", rendered),
            None => {}
        }
        Ok(())
    }

    pub fn print_success(&self, message: &str) {
        if !self.suppress {
            eprintln!("{} {}", "✓".green().bold(), message);
        }
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    pub fn print_warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        if !self.suppress {
            eprintln!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    /// Spinner on stderr; hidden when output is suppressed.
    pub fn show_progress(&self, message: &str) -> ProgressBar {
        if self.suppress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

fn render_table(data: &Value) -> String {
    let mut table = Table::new();

    if let Some(array) = data.as_array() {
        if let Some(first) = array.first().and_then(Value::as_object) {
            let headers: Vec<String> = first.keys().cloned().collect();
            table.set_header(&headers);

            for item in array {
                if let Some(obj) = item.as_object() {
                    let row: Vec<String> = headers
                        .iter()
                        .map(|h| obj.get(h).map(value_to_string).unwrap_or_default())
                        .collect();
                    table.add_row(row);
                }
            }
        }
    } else if let Some(obj) = data.as_object() {
        table.set_header(vec!["Key", "Value"]);
        for (key, value) in obj {
            table.add_row(vec![key.clone(), value_to_string(value)]);
        }
    } else {
        return value_to_string(data);
    }

    table.to_string()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(value_to_string).collect::<Vec<_>>().join("\n"),
        _ => value.to_string(),
    }
}

fn format_expiry(raw: &str, parsed: Option<chrono::DateTime<Utc>>) -> String {
    match parsed {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => raw.to_string(),
    }
}

/// One row per request ID, failed lookups included
pub fn status_rows(entries: &[BulkEntry<BulkStatus>]) -> Value {
    let rows: Vec<Value> = entries
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(status) => json!({
                "requestId": entry.request_id,
                "complete": status.is_complete,
                "submitted": status.zones_submitted,
                "succeeded": status.success_count,
                "failed": status.failure_count,
                "expires": format_expiry(&status.expiration_date, status.expires_at()),
                "error": Value::Null,
            }),
            Err(e) => json!({
                "requestId": entry.request_id,
                "complete": Value::Null,
                "submitted": Value::Null,
                "succeeded": Value::Null,
                "failed": Value::Null,
                "expires": Value::Null,
                "error": e.to_string(),
            }),
        })
        .collect();
    Value::Array(rows)
}

/// One row per zone, plus one row per request ID whose lookup failed
pub fn result_rows(entries: &[BulkEntry<BulkResult>]) -> Value {
    let mut rows = Vec::new();
    for entry in entries {
        match &entry.outcome {
            Ok(result) => {
                for (zone, outcome) in result.outcomes() {
                    let (status, reason) = match outcome {
                        BulkOutcome::Succeeded => ("succeeded", String::new()),
                        BulkOutcome::Failed { reason } => ("failed", reason),
                    };
                    rows.push(json!({
                        "requestId": entry.request_id,
                        "zone": zone,
                        "outcome": status,
                        "reason": reason,
                    }));
                }
            }
            Err(e) => rows.push(json!({
                "requestId": entry.request_id,
                "zone": Value::Null,
                "outcome": "unavailable",
                "reason": e.to_string(),
            })),
        }
    }
    Value::Array(rows)
}

/// Default name of the file bulk submissions record their handles in
pub fn default_handles_path() -> PathBuf {
    PathBuf::from(format!("Bulk_Submit_Request_Status_{}.json", Utc::now().timestamp()))
}

/// Writes bulk request handles as JSON so they can be polled later.
pub fn write_handles(path: &Path, handles: &[BulkRequestHandle]) -> Result<(), OutputError> {
    let body = serde_json::to_string_pretty(&json!({ "requests": handles }))?;
    fs::write(path, body)?;
    Ok(())
}
