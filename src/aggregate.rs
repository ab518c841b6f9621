//! Metrics aggregation: run the report extractor for every configured design
//! and fold in externally supplied error-quality metrics.

use crate::extract::{self, Dialect, ReportOutcome};
use crate::record::{MetricsRecord, ReportKind};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Whether a design is the exact baseline or an approximate variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignKind {
    Exact,
    Approximate,
}

/// One design variant and where its reports live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub id: String,
    pub kind: DesignKind,
    /// Report directory, relative to the reports base directory.
    pub dir: PathBuf,
    /// File-stem prefix shared by the design's reports.
    pub stem: String,
}

impl Design {
    pub fn new(
        id: impl Into<String>,
        kind: DesignKind,
        dir: impl Into<PathBuf>,
        stem: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// `<base_dir>/<dir>/<stem>_<kind>.rpt`
    pub fn report_path(&self, base_dir: &Path, kind: ReportKind) -> PathBuf {
        base_dir
            .join(&self.dir)
            .join(format!("{}_{}.rpt", self.stem, kind.as_str()))
    }
}

/// Error-quality metrics of an approximate design, measured outside synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Share of input vectors producing a wrong output, in percent.
    pub error_rate_percent: f64,
    pub mean_error_distance: f64,
}

/// Per-design outcome of each report, kept for the run summary.
pub type ReportLog = BTreeMap<String, Vec<(ReportKind, ReportOutcome)>>;

/// Build one record per design from its area, power and timing reports.
///
/// Each (design, report kind) pair is handled independently; a missing or
/// unreadable report only leaves that report's fields unset.
pub fn extract_designs(
    designs: &[Design],
    base_dir: &Path,
    dialect: &Dialect,
) -> (Vec<MetricsRecord>, ReportLog) {
    let mut records = Vec::with_capacity(designs.len());
    let mut log = ReportLog::new();

    for design in designs {
        tracing::info!(design = %design.id, "processing design");
        let mut record = MetricsRecord::new(&design.id);
        let mut outcomes = Vec::with_capacity(ReportKind::ALL.len());

        for kind in ReportKind::ALL {
            let path = design.report_path(base_dir, kind);
            let outcome = extract::parse_report(&path, kind, &mut record, dialect);
            outcomes.push((kind, outcome));
        }

        if record.is_empty() {
            tracing::warn!(design = %design.id, "no metrics found in any report");
        } else {
            tracing::debug!(design = %design.id, ?record, "metrics found");
        }
        log.insert(design.id.clone(), outcomes);
        records.push(record);
    }

    (records, log)
}

/// Copy quality metrics into the records of approximate designs.
///
/// The exact baseline never receives quality fields. An approximate design
/// without an entry in `quality` is logged and left without them.
pub fn merge_quality(
    records: &mut [MetricsRecord],
    designs: &[Design],
    quality: &BTreeMap<String, QualityMetrics>,
) {
    for record in records.iter_mut() {
        let Some(design) = designs.iter().find(|d| d.id == record.design_id) else {
            continue;
        };
        if design.kind != DesignKind::Approximate {
            continue;
        }
        match quality.get(&design.id) {
            Some(q) => {
                record.error_rate_percent = Some(q.error_rate_percent);
                record.mean_error_distance = Some(q.mean_error_distance);
                tracing::info!(
                    design = %design.id,
                    error_rate_percent = q.error_rate_percent,
                    mean_error_distance = q.mean_error_distance,
                    "added error metrics"
                );
            }
            None => {
                tracing::warn!(
                    design = %design.id,
                    "no error metrics supplied for approximate design"
                );
            }
        }
    }
}

/// Full aggregation pass: extract every design, merge quality metrics, and
/// collect the records into a snapshot ready to persist.
pub fn aggregate(
    designs: &[Design],
    base_dir: &Path,
    dialect: &Dialect,
    quality: &BTreeMap<String, QualityMetrics>,
) -> (Snapshot, ReportLog) {
    let (mut records, log) = extract_designs(designs, base_dir, dialect);
    merge_quality(&mut records, designs, quality);
    (records.into_iter().collect(), log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn designs() -> Vec<Design> {
        vec![
            Design::new("exact", DesignKind::Exact, "exact", "exact"),
            Design::new(
                "approx_v1",
                DesignKind::Approximate,
                "approximate_v1",
                "approx_compressor_8_2_v1",
            ),
        ]
    }

    fn write_report(base: &Path, design: &Design, kind: ReportKind, text: &str) {
        let path = design.report_path(base, kind);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn quality() -> BTreeMap<String, QualityMetrics> {
        let mut q = BTreeMap::new();
        q.insert(
            "approx_v1".to_string(),
            QualityMetrics {
                error_rate_percent: 10.156,
                mean_error_distance: 0.117,
            },
        );
        q
    }

    fn populate(base: &Path) -> Vec<Design> {
        let designs = designs();
        write_report(base, &designs[0], ReportKind::Area, "Total cell area:   100.0\n");
        write_report(
            base,
            &designs[0],
            ReportKind::Power,
            "Cell Internal Power = 4.0 uW (80%)\nNet Switching Power = 1.0 uW (20%)\n",
        );
        write_report(base, &designs[0], ReportKind::Timing, "slack (MET)   0.12\n");
        write_report(base, &designs[1], ReportKind::Area, "Total cell area:   80.0\n");
        write_report(
            base,
            &designs[1],
            ReportKind::Power,
            "Cell Internal Power = 3.0 uW (75%)\nNet Switching Power = 1.0 uW (25%)\n",
        );
        write_report(
            base,
            &designs[1],
            ReportKind::Timing,
            "slack (VIOLATED)  -0.05\nslack (MET)  0.30\n",
        );
        designs
    }

    #[test]
    fn report_path_follows_naming_convention() {
        let d = &designs()[1];
        assert_eq!(
            d.report_path(Path::new("syn/reports"), ReportKind::Timing),
            PathBuf::from("syn/reports/approximate_v1/approx_compressor_8_2_v1_timing.rpt")
        );
    }

    #[test]
    fn aggregate_full_set() {
        let dir = TempDir::new().unwrap();
        let designs = populate(dir.path());
        let (snapshot, log) = aggregate(&designs, dir.path(), &Dialect::default(), &quality());

        let exact = snapshot.get("exact").unwrap();
        assert_eq!(exact.area_cell, Some(100.0));
        assert_eq!(exact.area_total, Some(100.0));
        assert_eq!(exact.power_total, Some(5.0));
        assert_eq!(exact.timing_wns, Some(0.12));
        assert_eq!(exact.error_rate_percent, None);
        assert_eq!(exact.mean_error_distance, None);

        let approx = snapshot.get("approx_v1").unwrap();
        assert_eq!(approx.area_total, Some(80.0));
        assert_eq!(approx.power_total, Some(4.0));
        assert_eq!(approx.timing_wns, Some(-0.05));
        assert_eq!(approx.error_rate_percent, Some(10.156));
        assert_eq!(approx.mean_error_distance, Some(0.117));

        assert_eq!(log["exact"].len(), 3);
        assert!(log["exact"]
            .iter()
            .all(|(_, o)| matches!(o, ReportOutcome::Parsed { .. })));
    }

    #[test]
    fn missing_report_does_not_block_other_kinds() {
        let dir = TempDir::new().unwrap();
        let designs = designs();
        write_report(dir.path(), &designs[0], ReportKind::Timing, "slack (MET) 0.2\n");

        let (snapshot, log) = aggregate(&designs, dir.path(), &Dialect::default(), &quality());
        let exact = snapshot.get("exact").unwrap();
        assert_eq!(exact.area_total, None);
        assert_eq!(exact.power_total, None);
        assert_eq!(exact.timing_wns, Some(0.2));

        assert_eq!(
            log["exact"],
            vec![
                (ReportKind::Area, ReportOutcome::Missing),
                (ReportKind::Power, ReportOutcome::Missing),
                (ReportKind::Timing, ReportOutcome::Parsed { fields: 1 }),
            ]
        );
    }

    #[test]
    fn no_reports_at_all_still_yields_records() {
        let dir = TempDir::new().unwrap();
        let (snapshot, _) = aggregate(&designs(), dir.path(), &Dialect::default(), &quality());
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get("exact").unwrap().is_empty());
        // Quality metrics still merge for the approximate variant.
        assert_eq!(
            snapshot.get("approx_v1").unwrap().error_rate_percent,
            Some(10.156)
        );
    }

    #[test]
    fn quality_never_applied_to_exact_design() {
        let mut records = vec![MetricsRecord::new("exact")];
        let mut q = quality();
        q.insert(
            "exact".to_string(),
            QualityMetrics {
                error_rate_percent: 0.0,
                mean_error_distance: 0.0,
            },
        );
        merge_quality(&mut records, &designs(), &q);
        assert_eq!(records[0].error_rate_percent, None);
        assert_eq!(records[0].mean_error_distance, None);
    }

    #[test]
    fn missing_quality_entry_leaves_fields_unset() {
        let mut records = vec![
            MetricsRecord::new("exact"),
            MetricsRecord::new("approx_v1"),
        ];
        merge_quality(&mut records, &designs(), &BTreeMap::new());
        assert_eq!(records[1].error_rate_percent, None);
        assert_eq!(records[1].mean_error_distance, None);
    }

    #[test]
    fn persisted_snapshot_reloads_identically() {
        let dir = TempDir::new().unwrap();
        let designs = populate(dir.path());
        let (snapshot, _) = aggregate(&designs, dir.path(), &Dialect::default(), &quality());
        let path = dir.path().join("results").join("synthesis_results.json");
        crate::snapshot::ensure_parent_dir(&path).unwrap();
        snapshot.write(&path).unwrap();
        assert_eq!(Snapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let designs = populate(dir.path());
        let (first, _) = aggregate(&designs, dir.path(), &Dialect::default(), &quality());
        let (second, _) = aggregate(&designs, dir.path(), &Dialect::default(), &quality());
        assert_eq!(first, second);
    }
}
