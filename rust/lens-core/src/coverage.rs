//! Per-file coverage summaries supplied by an external reporter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LensError, LensResult};

/// Statement coverage of one source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub percentage: f64,
    pub total_statements: u64,
    pub covered_statements: u64,
}

impl CoverageSummary {
    /// Summary from raw counts; an empty file counts as fully covered.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "statement counts stay far below 2^52"
    )]
    pub fn from_counts(total_statements: u64, covered_statements: u64) -> Self {
        let percentage = if total_statements == 0 {
            100.0
        } else {
            covered_statements as f64 * 100.0 / total_statements as f64
        };
        Self {
            percentage,
            total_statements,
            covered_statements,
        }
    }
}

/// Source of coverage data keyed by absolute source path.
pub trait CoverageSource: Send + Sync + std::fmt::Debug {
    fn summary(&self, path: &Path) -> Option<CoverageSummary>;

    /// Raw reporter payload for the file, passed through untouched.
    fn details(&self, _path: &Path) -> Option<Value> {
        None
    }
}

/// Accepted per-file entry shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileEntry {
    /// `{"percentage"?, "totalStatements", "coveredStatements", "details"?}`
    Summary {
        #[serde(rename = "totalStatements")]
        total_statements: u64,
        #[serde(rename = "coveredStatements")]
        covered_statements: u64,
        percentage: Option<f64>,
        details: Option<Value>,
    },
    /// Istanbul `coverage-summary.json` entry.
    Istanbul { statements: IstanbulCounts },
}

#[derive(Debug, Deserialize)]
struct IstanbulCounts {
    total: u64,
    covered: u64,
    pct: Option<f64>,
}

#[derive(Debug, Clone)]
struct FileCoverage {
    summary: CoverageSummary,
    details: Option<Value>,
}

impl From<FileEntry> for FileCoverage {
    fn from(entry: FileEntry) -> Self {
        match entry {
            FileEntry::Summary {
                total_statements,
                covered_statements,
                percentage,
                details,
            } => {
                let mut summary = CoverageSummary::from_counts(total_statements, covered_statements);
                if let Some(percentage) = percentage {
                    summary.percentage = percentage;
                }
                Self { summary, details }
            }
            FileEntry::Istanbul { statements } => {
                let mut summary = CoverageSummary::from_counts(statements.total, statements.covered);
                if let Some(pct) = statements.pct {
                    summary.percentage = pct;
                }
                Self {
                    summary,
                    details: None,
                }
            }
        }
    }
}

/// Coverage loaded once from a report file.
#[derive(Debug, Clone, Default)]
pub struct StaticCoverage {
    files: HashMap<PathBuf, FileCoverage>,
}

impl StaticCoverage {
    /// Decode a report: a JSON object keyed by absolute file path.
    ///
    /// Istanbul's aggregate `total` key is ignored.
    pub fn from_json(json: &str) -> LensResult<Self> {
        let entries: HashMap<String, Value> =
            serde_json::from_str(json).map_err(|e| LensError::InvalidCoverage(e.to_string()))?;

        let mut files = HashMap::with_capacity(entries.len());
        for (path, entry) in entries {
            if path == "total" {
                continue;
            }
            let entry: FileEntry = serde_json::from_value(entry).map_err(|e| {
                LensError::InvalidCoverage(format!("entry for '{path}': {e}"))
            })?;
            files.insert(PathBuf::from(path), entry.into());
        }
        Ok(Self { files })
    }

    pub fn load(path: &Path) -> LensResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| LensError::read(path, &e))?;
        let coverage = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), files = coverage.len(), "Coverage report loaded");
        Ok(coverage)
    }

    /// Add or replace one file's entry.
    pub fn insert(&mut self, path: impl Into<PathBuf>, summary: CoverageSummary, details: Option<Value>) {
        self.files
            .insert(path.into(), FileCoverage { summary, details });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl CoverageSource for StaticCoverage {
    fn summary(&self, path: &Path) -> Option<CoverageSummary> {
        self.files.get(path).map(|f| f.summary)
    }

    fn details(&self, path: &Path) -> Option<Value> {
        self.files.get(path).and_then(|f| f.details.clone())
    }
}
