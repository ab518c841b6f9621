//! Derived comparison data for chart rendering.
//!
//! Everything here is computed from a [`Snapshot`]; nothing is written back
//! into it. Missing inputs never produce placeholders: a comparison with a
//! design lacking the metric is skipped, and a trade-off point is emitted
//! only when both the error rate and the saving exist.

use crate::record::MetricsRecord;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A snapshot metric that can be compared across designs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AreaCell,
    AreaTotal,
    PowerInternal,
    PowerSwitching,
    PowerLeakage,
    PowerTotal,
    TimingWns,
    ErrorRatePercent,
    MeanErrorDistance,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::AreaCell => "area_cell",
            Metric::AreaTotal => "area_total",
            Metric::PowerInternal => "power_internal",
            Metric::PowerSwitching => "power_switching",
            Metric::PowerLeakage => "power_leakage",
            Metric::PowerTotal => "power_total",
            Metric::TimingWns => "timing_wns",
            Metric::ErrorRatePercent => "error_rate_percent",
            Metric::MeanErrorDistance => "mean_error_distance",
        }
    }

    /// Axis label for charts.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::AreaCell => "Cell Area (units from report)",
            Metric::AreaTotal => "Total Area (units from report)",
            Metric::PowerInternal => "Internal Power (units from report)",
            Metric::PowerSwitching => "Switching Power (units from report)",
            Metric::PowerLeakage => "Leakage Power (units from report)",
            Metric::PowerTotal => "Total Power (units from report)",
            Metric::TimingWns => "Worst Negative Slack (ns)",
            Metric::ErrorRatePercent => "Error Rate (%)",
            Metric::MeanErrorDistance => "Mean Error Distance",
        }
    }

    /// Whether a smaller value is the better one.
    pub fn lower_is_better(&self) -> bool {
        !matches!(self, Metric::TimingWns)
    }

    pub fn value(&self, record: &MetricsRecord) -> Option<f64> {
        match self {
            Metric::AreaCell => record.area_cell,
            Metric::AreaTotal => record.area_total,
            Metric::PowerInternal => record.power_internal,
            Metric::PowerSwitching => record.power_switching,
            Metric::PowerLeakage => record.power_leakage,
            Metric::PowerTotal => record.power_total,
            Metric::TimingWns => record.timing_wns,
            Metric::ErrorRatePercent => record.error_rate_percent,
            Metric::MeanErrorDistance => record.mean_error_distance,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage saving of `variant` relative to `baseline`.
///
/// `(baseline - variant) / baseline * 100`; positive means the variant uses
/// less. `None` when either value is missing or the baseline is zero.
pub fn saving(baseline: Option<f64>, variant: Option<f64>) -> Option<f64> {
    let (b, v) = (baseline?, variant?);
    if b == 0.0 {
        return None;
    }
    Some((b - v) / b * 100.0)
}

/// One design's value in a comparison series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignValue {
    pub design: String,
    pub value: f64,
}

/// Values of one metric for every design in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub metric: Metric,
    pub label: String,
    pub lower_is_better: bool,
    pub values: Vec<DesignValue>,
}

/// Series of `metric` across all designs, or `None` if any design lacks it.
pub fn comparison(snapshot: &Snapshot, metric: Metric) -> Option<Comparison> {
    if snapshot.is_empty() {
        return None;
    }
    let values = snapshot
        .records()
        .map(|r| {
            metric.value(r).map(|value| DesignValue {
                design: r.design_id.clone(),
                value,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Comparison {
        metric,
        label: metric.label().to_string(),
        lower_is_better: metric.lower_is_better(),
        values,
    })
}

/// Saving of one design against the baseline for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saving {
    pub design: String,
    pub metric: Metric,
    pub saving_percent: f64,
}

/// Defined savings of every non-baseline design for each metric.
pub fn savings(snapshot: &Snapshot, baseline: &str, metrics: &[Metric]) -> Vec<Saving> {
    let Some(base) = snapshot.get(baseline) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for record in snapshot.records().filter(|r| r.design_id != baseline) {
        for &metric in metrics {
            if let Some(pct) = saving(metric.value(base), metric.value(record)) {
                out.push(Saving {
                    design: record.design_id.clone(),
                    metric,
                    saving_percent: pct,
                });
            }
        }
    }
    out
}

/// An (error rate, saving) pair for one approximate design and metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffPoint {
    pub design: String,
    pub metric: Metric,
    pub error_rate_percent: f64,
    pub saving_percent: f64,
}

/// Error-vs-saving pairs; designs missing either value are left out.
pub fn tradeoff_pairs(
    snapshot: &Snapshot,
    baseline: &str,
    metrics: &[Metric],
) -> Vec<TradeoffPoint> {
    savings(snapshot, baseline, metrics)
        .into_iter()
        .filter_map(|s| {
            let error_rate = snapshot.get(&s.design)?.error_rate_percent?;
            Some(TradeoffPoint {
                design: s.design,
                metric: s.metric,
                error_rate_percent: error_rate,
                saving_percent: s.saving_percent,
            })
        })
        .collect()
}

/// A design plotted on two metrics at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub design: String,
    pub x: f64,
    pub y: f64,
}

/// `(x, y)` per design, or `None` if any design lacks either metric.
pub fn scatter(snapshot: &Snapshot, x: Metric, y: Metric) -> Option<Vec<ScatterPoint>> {
    if snapshot.is_empty() {
        return None;
    }
    snapshot
        .records()
        .map(|r| {
            Some(ScatterPoint {
                design: r.design_id.clone(),
                x: x.value(r)?,
                y: y.value(r)?,
            })
        })
        .collect()
}

/// Everything the chart renderer consumes besides the snapshot itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffReport {
    pub generated_at: DateTime<Utc>,
    pub baseline: String,
    pub comparisons: Vec<Comparison>,
    pub savings: Vec<Saving>,
    pub pairs: Vec<TradeoffPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_vs_timing: Option<Vec<ScatterPoint>>,
}

impl TradeoffReport {
    /// Derive comparisons for `metrics` plus timing, savings and trade-off
    /// pairs against `baseline`.
    pub fn build(snapshot: &Snapshot, baseline: &str, metrics: &[Metric]) -> Self {
        if snapshot.get(baseline).is_none() {
            tracing::warn!(baseline, "baseline design not in snapshot, no savings computed");
        }

        let mut compared: Vec<Metric> = metrics.to_vec();
        if !compared.contains(&Metric::TimingWns) {
            compared.push(Metric::TimingWns);
        }
        let comparisons = compared
            .into_iter()
            .filter_map(|m| {
                let c = comparison(snapshot, m);
                if c.is_none() {
                    tracing::info!(
                        metric = %m,
                        "skipping comparison: metric not found for all designs"
                    );
                }
                c
            })
            .collect();

        let power_vs_timing = scatter(snapshot, Metric::PowerTotal, Metric::TimingWns);
        if power_vs_timing.is_none() {
            tracing::info!("skipping power vs timing: metrics not found for all designs");
        }

        Self {
            generated_at: Utc::now(),
            baseline: baseline.to_string(),
            comparisons,
            savings: savings(snapshot, baseline, metrics),
            pairs: tradeoff_pairs(snapshot, baseline, metrics),
            power_vs_timing,
        }
    }
}
