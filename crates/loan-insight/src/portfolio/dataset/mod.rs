//! Loan dataset ingest: schema validation, flag normalization, and source resolution.

mod parser;

pub use parser::REQUIRED_COLUMNS;

use super::domain::LoanRecord;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read loan dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid loan dataset CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("loan dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("line {line}: column {column} has unexpected value '{value}' (expected Yes/No or 0/1)")]
    InvalidFlag {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: column {column} has non-finite value '{value}'")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("loan dataset not found locally at {} and remote fetch is disabled", .path.display())]
    NotFoundLocally { path: PathBuf },
    #[error("loan dataset not found locally at {} and remote fetch failed: {reason}", .path.display())]
    RemoteFetchFailed { path: PathBuf, reason: String },
}

/// Identity of a loaded dataset, used to key any cache held by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DatasetVersion {
    pub source: String,
    pub rows: usize,
}

/// Read-only, cheaply clonable handle over the loaded loan records.
#[derive(Debug, Clone)]
pub struct LoanDataset {
    version: DatasetVersion,
    records: Arc<[LoanRecord]>,
}

impl LoanDataset {
    pub fn new(source: impl Into<String>, records: Vec<LoanRecord>) -> Self {
        let version = DatasetVersion {
            source: source.into(),
            rows: records.len(),
        };
        Self {
            version,
            records: records.into(),
        }
    }

    pub fn from_reader<R: Read>(
        source: impl Into<String>,
        reader: R,
    ) -> Result<Self, DatasetError> {
        let records = parser::parse_records(reader)?;
        Ok(Self::new(source, records))
    }

    pub fn version(&self) -> &DatasetVersion {
        &self.version
    }

    pub fn records(&self) -> &[LoanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Remote acquisition hook used when the dataset is absent locally.
pub trait DatasetFetcher: Send + Sync {
    fn fetch(&self, path: &Path) -> Result<Box<dyn Read + Send>, String>;
}

/// Resolves a configured dataset path, falling back to a registered fetcher.
pub struct DatasetLoader {
    path: PathBuf,
    fetcher: Option<Arc<dyn DatasetFetcher>>,
}

impl DatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fetcher: None,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn DatasetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LoanDataset, DatasetError> {
        let source = self.path.display().to_string();

        if self.path.is_file() {
            let file = std::fs::File::open(&self.path)?;
            let dataset = LoanDataset::from_reader(source, file)?;
            info!(path = %self.path.display(), rows = dataset.len(), "loan dataset loaded");
            return Ok(dataset);
        }

        let Some(fetcher) = &self.fetcher else {
            return Err(DatasetError::NotFoundLocally {
                path: self.path.clone(),
            });
        };

        let reader = fetcher
            .fetch(&self.path)
            .map_err(|reason| DatasetError::RemoteFetchFailed {
                path: self.path.clone(),
                reason,
            })?;
        let dataset = LoanDataset::from_reader(source, reader)?;
        info!(path = %self.path.display(), rows = dataset.len(), "loan dataset fetched remotely");
        Ok(dataset)
    }
}
