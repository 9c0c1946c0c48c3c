//! # Output Rendering
//!
//! Shapes a [`BatchResult`] for consumers: a single JSON document or
//! line-oriented `key=value` text with `.`-joined paths. Metric groups are
//! emitted verbatim; a failed device carries a single `error` field with the
//! error's classification text, never a stack trace.

use crate::record::{BatchResult, DeviceReport, MetricValue};
use serde_json::{json, Map, Value};

/// Supported rendering formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn report_to_json(report: &DeviceReport) -> Value {
    let mut obj = Map::new();
    obj.insert("serial".to_string(), json!(report.serial));
    for group in &report.result.groups {
        let mut metrics = Map::new();
        for (key, value) in &group.metrics {
            metrics.insert(key.clone(), json!(value));
        }
        obj.insert(group.name.clone(), Value::Object(metrics));
    }
    if let Some(error) = &report.result.error {
        obj.insert("error".to_string(), json!(error.to_string()));
    }
    Value::Object(obj)
}

/// Shapes the batch as one JSON array, one object per device in input order.
pub fn to_json(batch: &BatchResult) -> Value {
    Value::Array(batch.iter().map(report_to_json).collect())
}

fn format_value(value: &MetricValue) -> String {
    match value {
        MetricValue::Float(f) => format!("{f}"),
        MetricValue::Text(s) => s.clone(),
    }
}

/// Renders the batch as `serial.group.metric=value` lines, one per metric,
/// in read order, with a trailing error line for failed devices.
pub fn to_text(batch: &BatchResult) -> String {
    let mut out = String::new();
    for report in batch.iter() {
        for group in &report.result.groups {
            for (key, value) in &group.metrics {
                out.push_str(&format!(
                    "{}.{}.{}={}\n",
                    report.serial,
                    group.name,
                    key,
                    format_value(value)
                ));
            }
        }
        if let Some(error) = &report.result.error {
            out.push_str(&format!("{}.error={}\n", report.serial, error));
        }
    }
    out
}

/// Renders the batch in the requested format.
pub fn render(batch: &BatchResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format!("{}\n", to_json(batch)),
        OutputFormat::Text => to_text(batch),
    }
}
