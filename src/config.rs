use crate::aggregate::{Design, DesignKind, QualityMetrics};
use crate::extract::SlackSelection;
use crate::tradeoff::Metric;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "synthmetrics.toml";

/// Top-level configuration loaded from synthmetrics.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub reports: ReportsConfig,
    pub output: OutputConfig,
    pub extraction: ExtractionConfig,
    pub tradeoff: TradeoffConfig,
    pub designs: Vec<Design>,
    /// Error-quality metrics keyed by approximate design id.
    pub quality: BTreeMap<String, QualityMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub snapshot: PathBuf,
    pub tradeoffs: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub slack_selection: SlackSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeoffConfig {
    /// Baseline design id; defaults to the single exact design.
    pub baseline: Option<String>,
    pub metrics: Vec<Metric>,
}

// --- Default implementations ---

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            reports: ReportsConfig::default(),
            output: OutputConfig::default(),
            extraction: ExtractionConfig::default(),
            tradeoff: TradeoffConfig::default(),
            designs: vec![
                Design::new("exact", DesignKind::Exact, "exact", "exact"),
                Design::new(
                    "approx_v1",
                    DesignKind::Approximate,
                    "approximate_v1",
                    "approx_compressor_8_2_v1",
                ),
            ],
            quality: BTreeMap::new(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("syn/reports"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from("scripts/results/synthesis_results.json"),
            tradeoffs: PathBuf::from("scripts/results/tradeoffs.json"),
        }
    }
}

impl Default for TradeoffConfig {
    fn default() -> Self {
        Self {
            baseline: None,
            metrics: vec![Metric::AreaTotal, Metric::PowerTotal],
        }
    }
}

/// Content written by `--init`.
pub const DEFAULT_CONFIG: &str = "\
# synthmetrics configuration

[reports]
base_dir = \"syn/reports\"

[output]
snapshot = \"scripts/results/synthesis_results.json\"
tradeoffs = \"scripts/results/tradeoffs.json\"

[extraction]
# \"first\": first slack entry in report order, \"worst\": smallest slack
slack_selection = \"first\"

[tradeoff]
metrics = [\"area_total\", \"power_total\"]

# Reports are read from <base_dir>/<dir>/<stem>_{area,power,timing}.rpt
[[designs]]
id = \"exact\"
kind = \"exact\"
dir = \"exact\"
stem = \"exact\"

[[designs]]
id = \"approx_v1\"
kind = \"approximate\"
dir = \"approximate_v1\"
stem = \"approx_compressor_8_2_v1\"

# Error metrics from the testbench simulation log; replace with measured values.
[quality.approx_v1]
error_rate_percent = 10.156
mean_error_distance = 0.117
";

impl SynthConfig {
    /// Load and validate the config at `path`.
    ///
    /// A missing file yields the built-in defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write [`DEFAULT_CONFIG`] to `path` unless a file already exists.
    ///
    /// Returns `Ok(true)` if the file was created.
    pub fn init(path: &Path) -> std::io::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, DEFAULT_CONFIG)?;
        Ok(true)
    }

    /// Check design ids, the baseline and the quality values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.designs.is_empty() {
            return Err(ConfigError::Invalid("no designs configured".to_string()));
        }

        let mut seen = HashSet::new();
        for design in &self.designs {
            if design.id.trim().is_empty() {
                return Err(ConfigError::Invalid("design id must not be empty".to_string()));
            }
            if design.stem.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "design {}: stem must not be empty",
                    design.id
                )));
            }
            if !seen.insert(design.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate design id {}",
                    design.id
                )));
            }
        }

        match &self.tradeoff.baseline {
            Some(id) => {
                if !seen.contains(id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "baseline {id} is not a configured design"
                    )));
                }
            }
            None => {
                let exact = self
                    .designs
                    .iter()
                    .filter(|d| d.kind == DesignKind::Exact)
                    .count();
                if exact != 1 {
                    return Err(ConfigError::Invalid(format!(
                        "expected exactly one exact design, found {exact}; set tradeoff.baseline"
                    )));
                }
            }
        }

        for (id, q) in &self.quality {
            if !(0.0..=100.0).contains(&q.error_rate_percent) {
                return Err(ConfigError::Invalid(format!(
                    "quality.{id}: error_rate_percent {} is outside [0, 100]",
                    q.error_rate_percent
                )));
            }
            if !q.mean_error_distance.is_finite() || q.mean_error_distance < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "quality.{id}: mean_error_distance {} must be non-negative",
                    q.mean_error_distance
                )));
            }
            match self.designs.iter().find(|d| &d.id == id) {
                None => tracing::warn!(design = %id, "quality metrics for unknown design ignored"),
                Some(d) if d.kind == DesignKind::Exact => {
                    tracing::warn!(design = %id, "quality metrics for exact design ignored")
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Baseline design id for savings.
    pub fn baseline(&self) -> Option<&str> {
        self.tradeoff.baseline.as_deref().or_else(|| {
            self.designs
                .iter()
                .find(|d| d.kind == DesignKind::Exact)
                .map(|d| d.id.as_str())
        })
    }
}

/// Errors from loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let config = SynthConfig::default();
        config.validate().unwrap();
        assert_eq!(config.baseline(), Some("exact"));
        assert!(config.quality.is_empty());
        assert_eq!(config.extraction.slack_selection, SlackSelection::First);
    }

    #[test]
    fn init_template_parses() {
        let config = SynthConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.designs, SynthConfig::default().designs);
        assert_eq!(config.reports, ReportsConfig::default());
        assert_eq!(config.output, OutputConfig::default());
        let q = config.quality["approx_v1"];
        assert_eq!(q.error_rate_percent, 10.156);
        assert_eq!(q.mean_error_distance, 0.117);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = SynthConfig::parse(
            r#"
[reports]
base_dir = "build/reports"

[extraction]
slack_selection = "worst"
"#,
        )
        .unwrap();
        assert_eq!(config.reports.base_dir, PathBuf::from("build/reports"));
        assert_eq!(config.extraction.slack_selection, SlackSelection::Worst);
        assert_eq!(config.designs.len(), 2);
        assert_eq!(config.tradeoff.metrics, vec![Metric::AreaTotal, Metric::PowerTotal]);
    }

    #[test]
    fn custom_designs_replace_defaults() {
        let config = SynthConfig::parse(
            r#"
[[designs]]
id = "baseline"
kind = "exact"
dir = "base"
stem = "mult8"

[[designs]]
id = "trunc4"
kind = "approximate"
dir = "trunc4"
stem = "mult8_trunc4"
"#,
        )
        .unwrap();
        assert_eq!(config.designs.len(), 2);
        assert_eq!(config.baseline(), Some("baseline"));
    }

    #[test]
    fn duplicate_design_ids_rejected() {
        let err = SynthConfig::parse(
            r#"
[[designs]]
id = "exact"
kind = "exact"
dir = "a"
stem = "a"

[[designs]]
id = "exact"
kind = "approximate"
dir = "b"
stem = "b"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn two_exact_designs_need_explicit_baseline() {
        let text = r#"
[[designs]]
id = "exact_a"
kind = "exact"
dir = "a"
stem = "a"

[[designs]]
id = "exact_b"
kind = "exact"
dir = "b"
stem = "b"
"#;
        assert!(SynthConfig::parse(text).is_err());

        let with_baseline = format!("[tradeoff]\nbaseline = \"exact_b\"\n{text}");
        let config = SynthConfig::parse(&with_baseline).unwrap();
        assert_eq!(config.baseline(), Some("exact_b"));
    }

    #[test]
    fn unknown_baseline_rejected() {
        let err = SynthConfig::parse("[tradeoff]\nbaseline = \"golden\"\n").unwrap_err();
        assert!(err.to_string().contains("golden"));
    }

    #[test]
    fn error_rate_out_of_range_rejected() {
        let err = SynthConfig::parse(
            "[quality.approx_v1]\nerror_rate_percent = 140.0\nmean_error_distance = 0.1\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn negative_mean_error_distance_rejected() {
        let err = SynthConfig::parse(
            "[quality.approx_v1]\nerror_rate_percent = 1.0\nmean_error_distance = -0.5\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_slack_selection_is_parse_error() {
        let err = SynthConfig::parse("[extraction]\nslack_selection = \"median\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = SynthConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[reports\n").unwrap();
        let err = SynthConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn init_writes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        assert!(SynthConfig::init(&path).unwrap());
        std::fs::write(&path, "# edited\n").unwrap();
        assert!(!SynthConfig::init(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");
    }

    #[test]
    fn resolved_config_serializes_to_toml() {
        let text = toml::to_string_pretty(&SynthConfig::default()).unwrap();
        let back: SynthConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, SynthConfig::default());
    }
}
