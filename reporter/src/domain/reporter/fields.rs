//! Field extraction per metric kind
//!
//! Turns snapshot values into point fields and implements the last-dot
//! grouping used for gauges and counters.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::point::{FieldValue, Fields};
use crate::domain::snapshot::{
    Distribution, HistogramSnapshot, MeterSnapshot, Rates, TimerSnapshot,
};
use crate::utils::time::TimeUnit;

pub const FIELD_COUNT: &str = "count";
pub const FIELD_VALUE: &str = "value";

/// Split `name` at its last dot into `(measurement, field)`.
///
/// No dot yields field `value`; a field spelled `time` in any case becomes
/// `time_` so it does not collide with the timestamp column.
pub fn split_group_name(name: &str) -> (&str, String) {
    match name.rfind('.') {
        Some(idx) => {
            let field = &name[idx + 1..];
            let field = if field.eq_ignore_ascii_case("time") {
                "time_".to_string()
            } else {
                field.to_string()
            };
            (&name[..idx], field)
        }
        None => (name, FIELD_VALUE.to_string()),
    }
}

/// Bucket values by measurement, dropping non-finite ones.
///
/// Buckets left without any value are omitted.
pub fn group_by_last_dot<'a, I>(entries: I) -> BTreeMap<String, Fields>
where
    I: IntoIterator<Item = (&'a str, FieldValue)>,
{
    let mut groups: BTreeMap<String, Fields> = BTreeMap::new();
    for (name, value) in entries {
        let (measurement, field) = split_group_name(name);
        let Some(value) = value.sanitized() else {
            continue;
        };
        groups
            .entry(measurement.to_string())
            .or_default()
            .insert(field, value);
    }
    groups
}

pub fn histogram_fields(histogram: &HistogramSnapshot) -> Fields {
    let d = &histogram.distribution;
    let mut fields = Fields::new();
    fields.insert(FIELD_COUNT.to_string(), histogram.count.into());
    fields.insert("min".to_string(), d.min.into());
    fields.insert("max".to_string(), d.max.into());
    insert_percentiles(&mut fields, d, |v| v);
    fields
}

pub fn meter_fields(meter: &MeterSnapshot, rate_unit: TimeUnit) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_COUNT.to_string(), meter.count.into());
    insert_rates(&mut fields, &meter.rates, rate_unit);
    fields
}

pub fn timer_fields(timer: &TimerSnapshot, duration_unit: TimeUnit, rate_unit: TimeUnit) -> Fields {
    let d = &timer.distribution;
    let convert = |nanos: f64| duration_unit.convert_duration(nanos);

    let mut fields = Fields::new();
    fields.insert(FIELD_COUNT.to_string(), timer.count.into());
    fields.insert("min".to_string(), convert(d.min as f64).into());
    fields.insert("max".to_string(), convert(d.max as f64).into());
    insert_percentiles(&mut fields, d, convert);
    insert_rates(&mut fields, &timer.rates, rate_unit);
    fields
}

/// Keep only allow-listed fields; `None` keeps everything
pub fn retain_included(fields: &mut Fields, include: Option<&BTreeSet<String>>) {
    if let Some(include) = include {
        fields.retain(|key, _| include.contains(key));
    }
}

fn insert_percentiles(fields: &mut Fields, d: &Distribution, convert: impl Fn(f64) -> f64) {
    let values = [
        ("mean", d.mean),
        ("stddev", d.stddev),
        ("p50", d.median),
        ("p75", d.p75),
        ("p95", d.p95),
        ("p98", d.p98),
        ("p99", d.p99),
        ("p999", d.p999),
    ];
    for (key, value) in values {
        fields.insert(key.to_string(), convert(value).into());
    }
}

fn insert_rates(fields: &mut Fields, rates: &Rates, rate_unit: TimeUnit) {
    let values = [
        ("m1_rate", rates.m1),
        ("m5_rate", rates.m5),
        ("m15_rate", rates.m15),
        ("mean_rate", rates.mean),
    ];
    for (key, value) in values {
        fields.insert(key.to_string(), rate_unit.convert_rate(value).into());
    }
}
