/// Per-design metrics record and the named fields extractors can fill.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three synthesis report kinds read for every design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Area,
    Power,
    Timing,
}

impl ReportKind {
    /// All report kinds, in processing order.
    pub const ALL: [ReportKind; 3] = [ReportKind::Area, ReportKind::Power, ReportKind::Timing];

    /// Suffix used in report file names (`<stem>_<suffix>.rpt`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Area => "area",
            ReportKind::Power => "power",
            ReportKind::Timing => "timing",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric field that can be extracted directly from report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AreaCell,
    AreaTotal,
    PowerInternal,
    PowerSwitching,
    PowerLeakage,
    TimingWns,
}

impl Field {
    /// Snapshot key for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::AreaCell => "area_cell",
            Field::AreaTotal => "area_total",
            Field::PowerInternal => "power_internal",
            Field::PowerSwitching => "power_switching",
            Field::PowerLeakage => "power_leakage",
            Field::TimingWns => "timing_wns",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics collected for one design variant.
///
/// Every metric is optional: a field is present only when some report
/// exposed it (or, for the quality pair, when it was supplied externally).
/// Field order here is the key order in the persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(rename = "design", default)]
    pub design_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_cell: Option<f64>,
    /// Direct total area, or `area_cell` when the report has no total.
    /// The fallback is an approximation, not a measured total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_internal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_switching: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_leakage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_total: Option<f64>,
    /// Representative slack; negative when timing is violated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_wns: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_error_distance: Option<f64>,
}

impl MetricsRecord {
    /// Empty record tagged with a design id.
    pub fn new(design_id: impl Into<String>) -> Self {
        Self {
            design_id: design_id.into(),
            ..Default::default()
        }
    }

    /// Store a value for an extractable field. Never clears a field.
    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::AreaCell => &mut self.area_cell,
            Field::AreaTotal => &mut self.area_total,
            Field::PowerInternal => &mut self.power_internal,
            Field::PowerSwitching => &mut self.power_switching,
            Field::PowerLeakage => &mut self.power_leakage,
            Field::TimingWns => &mut self.timing_wns,
        };
        *slot = Some(value);
    }

    /// True when no metric at all has been recorded.
    pub fn is_empty(&self) -> bool {
        self.area_cell.is_none()
            && self.area_total.is_none()
            && self.power_internal.is_none()
            && self.power_switching.is_none()
            && self.power_leakage.is_none()
            && self.power_total.is_none()
            && self.timing_wns.is_none()
            && self.error_rate_percent.is_none()
            && self.mean_error_distance.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_empty() {
        let r = MetricsRecord::new("exact");
        assert_eq!(r.design_id, "exact");
        assert!(r.is_empty());
    }

    #[test]
    fn set_fields() {
        let mut r = MetricsRecord::new("exact");
        r.set(Field::AreaCell, 120.5);
        r.set(Field::TimingWns, -0.12);
        assert_eq!(r.area_cell, Some(120.5));
        assert_eq!(r.timing_wns, Some(-0.12));
        assert_eq!(r.area_total, None);
        assert!(!r.is_empty());
    }

    #[test]
    fn serialized_record_omits_absent_fields() {
        let mut r = MetricsRecord::new("approx_v1");
        r.area_cell = Some(80.0);
        let json = serde_json::to_value(&r).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["design"], "approx_v1");
        assert_eq!(obj["area_cell"], 80.0);
        assert!(!obj.contains_key("area_total"));
        assert!(!obj.contains_key("error_rate_percent"));
    }

    #[test]
    fn serialized_key_order_is_fixed() {
        let r = MetricsRecord {
            design_id: "exact".to_string(),
            area_cell: Some(1.0),
            area_total: Some(1.0),
            power_internal: Some(1.0),
            power_switching: Some(1.0),
            power_leakage: Some(1.0),
            power_total: Some(3.0),
            timing_wns: Some(0.5),
            error_rate_percent: None,
            mean_error_distance: None,
        };
        let text = serde_json::to_string(&r).unwrap();
        let positions: Vec<usize> = [
            "\"design\"",
            "\"area_cell\"",
            "\"area_total\"",
            "\"power_internal\"",
            "\"power_switching\"",
            "\"power_leakage\"",
            "\"power_total\"",
            "\"timing_wns\"",
        ]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn names_match_snapshot_keys() {
        assert_eq!(Field::PowerLeakage.to_string(), "power_leakage");
        assert_eq!(ReportKind::Power.to_string(), "power");
        assert_eq!(ReportKind::ALL.len(), 3);
    }
}
