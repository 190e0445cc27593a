//! InfluxDB line protocol rendering
//!
//! One line per point:
//!
//! ```text
//! measurement[,tag=value...] field=value[,field=value...] timestamp
//! ```
//!
//! Grouped mode folds every point sharing a timestamp into a single line under a
//! fixed measurement, prefixing each field key with the tail of the point's
//! measurement name.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write;

use super::batch::WriteBatch;
use super::point::{FieldValue, Fields, Tags};
use crate::utils::time::{TimeUnit, now_millis};

/// Renders a [`WriteBatch`] as line protocol text
#[derive(Debug, Clone, Default)]
pub struct LineProtocolSerializer {
    measurement_prefix: String,
}

impl LineProtocolSerializer {
    pub fn new(measurement_prefix: impl Into<String>) -> Self {
        Self {
            measurement_prefix: measurement_prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.measurement_prefix
    }

    /// Render one line per point; point tags override batch tags on key collision
    pub fn serialize(&self, batch: &WriteBatch) -> String {
        let now = now_millis();
        let mut out = String::new();
        for point in batch.points() {
            let tags = merge_tags(batch.tags(), point.tags());
            self.write_line(
                &mut out,
                point.measurement(),
                &tags,
                point.fields(),
                point.timestamp().unwrap_or(now),
                batch.precision(),
            );
        }
        out
    }

    /// Render one line per distinct timestamp under `group_measurement`
    pub fn serialize_grouped(&self, batch: &WriteBatch, group_measurement: &str) -> String {
        let now = now_millis();
        let mut by_time: BTreeMap<i64, Fields> = BTreeMap::new();
        for point in batch.points() {
            let fields = by_time.entry(point.timestamp().unwrap_or(now)).or_default();
            let measurement = point.measurement();
            let tail = measurement
                .split_once('.')
                .map_or(measurement, |(_, tail)| tail);
            for (key, value) in point.fields() {
                fields.insert(format!("{tail}.{key}"), value.clone());
            }
        }

        let mut out = String::new();
        for (timestamp, fields) in &by_time {
            self.write_line(
                &mut out,
                group_measurement,
                batch.tags(),
                fields,
                *timestamp,
                batch.precision(),
            );
        }
        out
    }

    fn write_line(
        &self,
        out: &mut String,
        measurement: &str,
        tags: &Tags,
        fields: &Fields,
        timestamp: i64,
        precision: TimeUnit,
    ) {
        escape_measurement(out, &self.measurement_prefix);
        escape_measurement(out, measurement);

        for (key, value) in tags {
            out.push(',');
            escape_key(out, key);
            out.push('=');
            escape_key(out, value);
        }
        out.push(' ');

        let mut first = true;
        for (key, value) in fields.iter().filter(|(_, v)| v.is_finite()) {
            if !first {
                out.push(',');
            }
            first = false;
            escape_key(out, key);
            out.push('=');
            write_value(out, value);
        }

        out.push(' ');
        let _ = write!(out, "{}", precision.from_millis(timestamp));
        out.push('\n');
    }
}

fn merge_tags<'a>(global: &'a Tags, own: &'a Tags) -> Cow<'a, Tags> {
    if global.is_empty() {
        return Cow::Borrowed(own);
    }
    let mut merged = global.clone();
    merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    Cow::Owned(merged)
}

/// Measurement names escape space and comma
fn escape_measurement(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, ' ' | ',') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Tag keys, tag values and field keys escape space, comma and equals
fn escape_key(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, ' ' | ',' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn write_value(out: &mut String, value: &FieldValue) {
    match value {
        FieldValue::String(s) => {
            out.push('"');
            for c in s.chars() {
                if c == '"' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
        FieldValue::Integer(v) => {
            let _ = write!(out, "{v}");
        }
        FieldValue::Float(v) => write_float(out, *v),
        FieldValue::Boolean(v) => out.push_str(if *v { "true" } else { "false" }),
    }
}

/// Plain decimal, shortest round-trip digits, always with a fractional part
fn write_float(out: &mut String, value: f64) {
    let start = out.len();
    let _ = write!(out, "{value}");
    if !out[start..].contains('.') {
        out.push_str(".0");
    }
}
