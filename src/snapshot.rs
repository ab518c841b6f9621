/// Snapshot file: the design_id -> metrics mapping written after each run.
///
/// Written atomically: serialize into a temp file in the destination
/// directory, then rename over the target, so a failed write leaves any
/// previous snapshot intact.
use crate::record::MetricsRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// All design records of one aggregation run, keyed (and ordered) by design id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: BTreeMap<String, MetricsRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, replacing any previous record for the same design.
    pub fn insert(&mut self, record: MetricsRecord) {
        self.records.insert(record.design_id.clone(), record);
    }

    pub fn get(&self, design_id: &str) -> Option<&MetricsRecord> {
        self.records.get(design_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in design-id order.
    pub fn records(&self) -> impl Iterator<Item = &MetricsRecord> {
        self.records.values()
    }

    /// Atomically write the snapshot as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), SnapshotError> {
        write_json_atomic(path, self)
    }

    /// Load a snapshot previously written by [`Snapshot::write`].
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SnapshotError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| SnapshotError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        for (id, record) in snapshot.records.iter_mut() {
            if record.design_id.is_empty() {
                record.design_id = id.clone();
            }
        }
        Ok(snapshot)
    }
}

impl FromIterator<MetricsRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = MetricsRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// Create the parent directory of an output file if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<(), SnapshotError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| SnapshotError::CreateDir {
                path: dir.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

/// Serialize `value` with 4-space indentation and atomically replace `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| SnapshotError::Serialize { source: e })?;
    buf.push(b'\n');

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| SnapshotError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;
    tmp.write_all(&buf).map_err(|e| SnapshotError::Write {
        path: tmp.path().to_path_buf(),
        source: e,
    })?;
    tmp.persist(path).map_err(|e| SnapshotError::Rename {
        to: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// Errors from snapshot file operations.
#[derive(Debug)]
pub enum SnapshotError {
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize {
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Rename {
        to: PathBuf,
        source: std::io::Error,
    },
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::CreateDir { path, source } => {
                write!(
                    f,
                    "failed to create output directory {}: {source}",
                    path.display()
                )
            }
            SnapshotError::Serialize { source } => {
                write!(f, "failed to serialize snapshot: {source}")
            }
            SnapshotError::Write { path, source } => {
                write!(f, "failed to write temp file in {}: {source}", path.display())
            }
            SnapshotError::Rename { to, source } => {
                write!(f, "failed to replace {}: {source}", to.display())
            }
            SnapshotError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            SnapshotError::Parse { path, source } => {
                write!(f, "failed to decode JSON from {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::CreateDir { source, .. } => Some(source),
            SnapshotError::Serialize { source } => Some(source),
            SnapshotError::Write { source, .. } => Some(source),
            SnapshotError::Rename { source, .. } => Some(source),
            SnapshotError::Read { source, .. } => Some(source),
            SnapshotError::Parse { source, .. } => Some(source),
        }
    }
}
