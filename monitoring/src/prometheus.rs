//! Prometheus text format exporter.
//!
//! Encodes a [`MetricsSnapshot`] into the [Prometheus exposition format](https://prometheus.io/docs/instrumenting/exposition_formats/)
//! (text/plain; version=0.0.4).

use {
    crate::{MetricFamily, MetricValue, MetricsSnapshot},
    std::fmt::Write,
};

/// Encode a metrics snapshot into Prometheus text exposition format.
pub fn encode(snap: &MetricsSnapshot) -> String {
    let mut out = String::with_capacity(snap.families.len().saturating_mul(128));
    for family in &snap.families {
        write_family(&mut out, family);
    }
    out
}

fn write_family(out: &mut String, family: &MetricFamily) {
    let name = family.name;
    let kind = match family.value {
        MetricValue::Counter(_) => "counter",
        MetricValue::Gauge(_) => "gauge",
        MetricValue::Histogram { .. } => "histogram",
    };
    // writing to a String cannot fail
    let _ = writeln!(out, "# HELP {name} {}", family.help);
    let _ = writeln!(out, "# TYPE {name} {kind}");

    match &family.value {
        MetricValue::Counter(value) => {
            let _ = writeln!(out, "{name} {value}");
        }
        MetricValue::Gauge(value) => {
            let _ = writeln!(out, "{name} {value}");
        }
        MetricValue::Histogram {
            buckets,
            sum,
            count,
        } => {
            for (bound, cumulative_count) in buckets.iter().filter(|(b, _)| b.is_finite()) {
                let _ = writeln!(out, "{name}_bucket{{le=\"{bound}\"}} {cumulative_count}");
            }
            let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{name}_sum {sum}");
            let _ = writeln!(out, "{name}_count {count}");
        }
    }
    out.push('\n');
}
