use crate::aggregate::ReportLog;
use crate::extract::ReportOutcome;
use crate::snapshot::Snapshot;
use crate::tradeoff::{self, Metric};

/// Columns shown for every design, in order.
const COLUMNS: [Metric; 6] = [
    Metric::AreaTotal,
    Metric::PowerTotal,
    Metric::TimingWns,
    Metric::ErrorRatePercent,
    Metric::MeanErrorDistance,
    Metric::AreaCell,
];

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "-".to_string(),
    }
}

/// Render the snapshot as a plain-text table, followed by savings against
/// `baseline` and any reports that yielded nothing.
pub fn generate_summary(
    snapshot: &Snapshot,
    log: Option<&ReportLog>,
    baseline: &str,
    metrics: &[Metric],
) -> String {
    if snapshot.is_empty() {
        return "No designs in snapshot.\n".to_string();
    }

    let id_width = snapshot
        .records()
        .map(|r| r.design_id.len())
        .max()
        .unwrap_or(0)
        .max("design".len());

    let mut out = format!("{:<id_width$}", "design");
    for metric in COLUMNS {
        out.push_str(&format!("  {:>19}", metric.as_str()));
    }
    out.push('\n');

    for record in snapshot.records() {
        out.push_str(&format!("{:<id_width$}", record.design_id));
        for metric in COLUMNS {
            out.push_str(&format!("  {:>19}", cell(metric.value(record))));
        }
        out.push('\n');
    }

    let savings = tradeoff::savings(snapshot, baseline, metrics);
    if !savings.is_empty() {
        out.push_str(&format!("\nSavings vs {baseline}:\n"));
        for s in &savings {
            out.push_str(&format!(
                "  {:<id_width$}  {:<12} {:>8.2}%\n",
                s.design,
                s.metric.as_str(),
                s.saving_percent
            ));
        }
    }

    if let Some(log) = log {
        let problems: Vec<String> = log
            .iter()
            .flat_map(|(design, outcomes)| {
                outcomes.iter().filter_map(move |(kind, outcome)| match outcome {
                    ReportOutcome::Missing => Some(format!("  {design} {kind}: missing")),
                    ReportOutcome::Unreadable => Some(format!("  {design} {kind}: unreadable")),
                    ReportOutcome::Parsed { fields: 0 } => {
                        Some(format!("  {design} {kind}: no recognised fields"))
                    }
                    ReportOutcome::Parsed { .. } => None,
                })
            })
            .collect();
        if !problems.is_empty() {
            out.push_str("\nReports without metrics:\n");
            for line in problems {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }

    out
}
