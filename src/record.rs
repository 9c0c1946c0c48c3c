//! # Meter Reading Records
//!
//! Normalized result types produced by a polling run: metric values grouped
//! under named metric groups, one result per device, assembled into an
//! ordered batch.

use crate::error::MercuryError;
use serde::Serialize;

/// A single normalized metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Numeric value (volts, amperes, watts, hertz, kilowatt-hours)
    Float(f64),
    /// Textual value (firmware info and similar)
    Text(String),
}

/// Ordered metric-name -> value pairs produced by one codec read.
pub type Metrics = Vec<(String, MetricValue)>;

/// A named group of metrics, e.g. `info` or `energy_tarif_0`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroup {
    pub name: String,
    pub metrics: Metrics,
}

impl MetricGroup {
    pub fn new(name: &str) -> Self {
        MetricGroup {
            name: name.to_string(),
            metrics: Vec::new(),
        }
    }

    /// Appends a numeric metric.
    pub fn push(&mut self, key: &str, value: f64) {
        self.metrics.push((key.to_string(), MetricValue::Float(value)));
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// The outcome of polling a single device.
///
/// Holds the metric groups read before any failure, in read order, plus the
/// classified error if the device's sequence did not complete. Both may be
/// present at once (partial result).
#[derive(Debug, Default)]
pub struct DeviceResult {
    pub groups: Vec<MetricGroup>,
    pub error: Option<MercuryError>,
}

impl DeviceResult {
    /// A result that failed before producing any metric group.
    pub fn failed(error: MercuryError) -> Self {
        DeviceResult {
            groups: Vec::new(),
            error: Some(error),
        }
    }

    /// Appends metrics under the given group name, merging into an existing
    /// group of the same name (the frequency read merges into `info`).
    pub fn push_metrics(&mut self, name: &str, metrics: Metrics) {
        if let Some(group) = self.groups.iter_mut().find(|g| g.name == name) {
            group.metrics.extend(metrics);
        } else {
            self.groups.push(MetricGroup {
                name: name.to_string(),
                metrics,
            });
        }
    }

    pub fn push_group(&mut self, group: MetricGroup) {
        self.push_metrics(&group.name.clone(), group.metrics);
    }

    pub fn group(&self, name: &str) -> Option<&MetricGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// One device's slot in a batch: the input serial plus its result.
#[derive(Debug)]
pub struct DeviceReport {
    pub serial: u32,
    pub result: DeviceResult,
}

/// Ordered per-device results of one polling run.
///
/// Invariant: one report per input serial, in input order. A device failure
/// never removes its slot.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub reports: Vec<DeviceReport>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceReport> {
        self.reports.iter()
    }
}
