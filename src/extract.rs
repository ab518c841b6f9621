//! Report extraction: pull named numeric fields out of synthesis report text.
//!
//! A [`Dialect`] is a set of [`FieldExtractor`]s keyed by (report kind, field).
//! Supporting another tool's report format means building another dialect,
//! not branching inside [`parse_report`].
//!
//! Two combination rules run after the raw fields are found:
//! - area: a report with a cell area but no total area yields
//!   `area_total = area_cell` (an approximation, not a measured total);
//! - power: the components found in one report are summed into
//!   `power_total` when the sum is positive.

use crate::record::{Field, MetricsRecord, ReportKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// Unsigned decimal with optional exponent.
const UNSIGNED: &str = r"(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static CELL_AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"Total cell area:\s+({UNSIGNED})")).unwrap());
static TOTAL_AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"Total area:\s+({UNSIGNED})")).unwrap());
static INTERNAL_POWER: LazyLock<Regex> = LazyLock::new(|| power_pattern("Cell Internal Power"));
static SWITCHING_POWER: LazyLock<Regex> = LazyLock::new(|| power_pattern("Net Switching Power"));
static LEAKAGE_POWER: LazyLock<Regex> = LazyLock::new(|| power_pattern("Cell Leakage Power"));
static VIOLATED_SLACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"slack \(VIOLATED\)\s+(-?{UNSIGNED})")).unwrap());
static MET_SLACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"slack \(MET\)\s+(-?{UNSIGNED})")).unwrap());

/// `<label> = <value> [unit] (<share>)`. The unit is accepted but not converted.
fn power_pattern(label: &str) -> Regex {
    Regex::new(&format!(
        r"{label}\s+=\s+({UNSIGNED})(?:\s*[A-Za-z]+)?\s+\("
    ))
    .unwrap()
}

/// How a representative slack is chosen when a timing report lists several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlackSelection {
    /// First entry in text order (reports normally list the worst path first).
    #[default]
    First,
    /// Numerically smallest entry.
    Worst,
}

/// Errors raised while extracting a single report.
#[derive(Debug)]
pub enum ExtractError {
    Io(std::io::Error),
    BadNumber { field: Field, raw: String },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "I/O error: {e}"),
            ExtractError::BadNumber { field, raw } => {
                write!(f, "unparseable value {raw:?} for {field}")
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Io(e) => Some(e),
            ExtractError::BadNumber { .. } => None,
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e)
    }
}

/// Finds one named numeric field in report text.
pub trait FieldExtractor: Send + Sync {
    /// Report kind this extractor reads.
    fn report_kind(&self) -> ReportKind;

    /// Field this extractor produces.
    fn field(&self) -> Field;

    /// Search the full report text.
    ///
    /// `Ok(None)` means the field is simply not in this report.
    fn extract(&self, text: &str) -> Result<Option<f64>, ExtractError>;
}

fn parse_capture(field: Field, raw: &str) -> Result<f64, ExtractError> {
    raw.parse::<f64>().map_err(|_| ExtractError::BadNumber {
        field,
        raw: raw.to_string(),
    })
}

/// Field taken from the first capture of a single regex.
pub struct RegexField {
    kind: ReportKind,
    field: Field,
    pattern: &'static Regex,
}

impl RegexField {
    pub fn new(kind: ReportKind, field: Field, pattern: &'static Regex) -> Self {
        Self {
            kind,
            field,
            pattern,
        }
    }
}

impl FieldExtractor for RegexField {
    fn report_kind(&self) -> ReportKind {
        self.kind
    }

    fn field(&self) -> Field {
        self.field
    }

    fn extract(&self, text: &str) -> Result<Option<f64>, ExtractError> {
        match self.pattern.captures(text).and_then(|c| c.get(1)) {
            Some(m) => parse_capture(self.field, m.as_str()).map(Some),
            None => Ok(None),
        }
    }
}

/// Worst-slack extractor: violated entries take precedence over met ones.
pub struct SlackField {
    violated: &'static Regex,
    met: &'static Regex,
    selection: SlackSelection,
}

impl SlackField {
    pub fn new(violated: &'static Regex, met: &'static Regex, selection: SlackSelection) -> Self {
        Self {
            violated,
            met,
            selection,
        }
    }

    fn search(&self, pattern: &Regex, text: &str) -> Result<Option<f64>, ExtractError> {
        match self.selection {
            SlackSelection::First => match pattern.captures(text).and_then(|c| c.get(1)) {
                Some(m) => parse_capture(Field::TimingWns, m.as_str()).map(Some),
                None => Ok(None),
            },
            SlackSelection::Worst => {
                let mut worst: Option<f64> = None;
                for caps in pattern.captures_iter(text) {
                    let Some(m) = caps.get(1) else { continue };
                    let value = parse_capture(Field::TimingWns, m.as_str())?;
                    worst = Some(worst.map_or(value, |w| w.min(value)));
                }
                Ok(worst)
            }
        }
    }
}

impl FieldExtractor for SlackField {
    fn report_kind(&self) -> ReportKind {
        ReportKind::Timing
    }

    fn field(&self) -> Field {
        Field::TimingWns
    }

    fn extract(&self, text: &str) -> Result<Option<f64>, ExtractError> {
        if let Some(v) = self.search(self.violated, text)? {
            return Ok(Some(v));
        }
        self.search(self.met, text)
    }
}

/// A named set of field extractors for one report format.
pub struct Dialect {
    name: String,
    extractors: Vec<Box<dyn FieldExtractor>>,
}

impl Dialect {
    /// Empty dialect; populate with [`Dialect::with`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extractors: Vec::new(),
        }
    }

    /// Add (or replace) the extractor for its (report kind, field) key.
    pub fn with(mut self, extractor: Box<dyn FieldExtractor>) -> Self {
        let key = (extractor.report_kind(), extractor.field());
        self.extractors.retain(|e| (e.report_kind(), e.field()) != key);
        self.extractors.push(extractor);
        self
    }

    /// Synopsys Design Compiler `report_area` / `report_power` / `report_timing` output.
    pub fn synopsys(selection: SlackSelection) -> Self {
        Dialect::new("synopsys")
            .with(Box::new(RegexField::new(
                ReportKind::Area,
                Field::AreaCell,
                &CELL_AREA,
            )))
            .with(Box::new(RegexField::new(
                ReportKind::Area,
                Field::AreaTotal,
                &TOTAL_AREA,
            )))
            .with(Box::new(RegexField::new(
                ReportKind::Power,
                Field::PowerInternal,
                &INTERNAL_POWER,
            )))
            .with(Box::new(RegexField::new(
                ReportKind::Power,
                Field::PowerSwitching,
                &SWITCHING_POWER,
            )))
            .with(Box::new(RegexField::new(
                ReportKind::Power,
                Field::PowerLeakage,
                &LEAKAGE_POWER,
            )))
            .with(Box::new(SlackField::new(
                &VIOLATED_SLACK,
                &MET_SLACK,
                selection,
            )))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields this dialect can extract from a report of `kind`.
    pub fn fields(&self, kind: ReportKind) -> Vec<Field> {
        self.extractors
            .iter()
            .filter(|e| e.report_kind() == kind)
            .map(|e| e.field())
            .collect()
    }

    /// Run every extractor for `kind` over `text`.
    ///
    /// A field whose capture cannot be parsed is logged and skipped; the
    /// remaining fields are still returned.
    pub fn extract_text(&self, kind: ReportKind, text: &str) -> Vec<(Field, f64)> {
        let mut found = Vec::new();
        for extractor in self.extractors.iter().filter(|e| e.report_kind() == kind) {
            match extractor.extract(text) {
                Ok(Some(value)) => found.push((extractor.field(), value)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        dialect = %self.name,
                        kind = %kind,
                        "skipping unparseable report field"
                    );
                }
            }
        }
        found
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::synopsys(SlackSelection::default())
    }
}

/// Store extracted fields in `record` and apply the area/power combination rules.
///
/// Only fields present in `found` are written; nothing is cleared.
pub fn apply_fields(record: &mut MetricsRecord, found: &[(Field, f64)]) {
    let mut power_sum = 0.0;
    let mut cell_area = None;
    let mut direct_total = false;

    for &(field, value) in found {
        record.set(field, value);
        match field {
            Field::AreaCell => cell_area = Some(value),
            Field::AreaTotal => direct_total = true,
            Field::PowerInternal | Field::PowerSwitching | Field::PowerLeakage => {
                power_sum += value;
            }
            Field::TimingWns => {}
        }
    }

    if let Some(cell) = cell_area {
        if !direct_total && record.area_total.is_none() {
            tracing::debug!(
                design = %record.design_id,
                area_cell = cell,
                "no total area reported, approximating with cell area"
            );
            record.area_total = Some(cell);
        }
    }

    if power_sum > 0.0 {
        record.power_total = Some(power_sum);
    }
}

/// What happened when a single report file was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// File does not exist.
    Missing,
    /// File exists but could not be read.
    Unreadable,
    /// File was scanned; `fields` is the number of fields found (possibly 0).
    Parsed { fields: usize },
}

/// Extract one report file into `record`.
///
/// Never fails: a missing or unreadable file is logged and leaves the
/// record untouched, and a report with no recognised fields is a normal
/// outcome.
pub fn parse_report(
    path: &Path,
    kind: ReportKind,
    record: &mut MetricsRecord,
    dialect: &Dialect,
) -> ReportOutcome {
    let text = match read_report(path) {
        Ok(text) => text,
        Err(ExtractError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                path = %path.display(),
                design = %record.design_id,
                kind = %kind,
                "report file not found"
            );
            return ReportOutcome::Missing;
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                design = %record.design_id,
                kind = %kind,
                "failed to read report file"
            );
            return ReportOutcome::Unreadable;
        }
    };

    let found = dialect.extract_text(kind, &text);
    apply_fields(record, &found);
    tracing::debug!(
        path = %path.display(),
        design = %record.design_id,
        kind = %kind,
        fields = found.len(),
        "parsed report"
    );
    ReportOutcome::Parsed {
        fields: found.len(),
    }
}

/// Read a report, replacing invalid UTF-8 rather than rejecting the file.
fn read_report(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
