use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use nback_core::SessionResult;

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only record of finished sessions, in insertion order
pub trait HistoryStore {
    fn append(&mut self, result: SessionResult) -> Result<(), HistoryError>;
    fn list(&self) -> Result<Vec<SessionResult>, HistoryError>;
    fn clear(&mut self) -> Result<(), HistoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    results: Vec<SessionResult>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, result: SessionResult) -> Result<(), HistoryError> {
        self.results.push(result);
        Ok(())
    }

    fn list(&self) -> Result<Vec<SessionResult>, HistoryError> {
        Ok(self.results.clone())
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.results.clear();
        Ok(())
    }
}

/// Whole history kept as one pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, results: &[SessionResult]) -> Result<(), HistoryError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, results)?;
        writer.flush()?;
        Ok(())
    }
}

impl HistoryStore for JsonFileHistory {
    fn append(&mut self, result: SessionResult) -> Result<(), HistoryError> {
        let mut results = self.list()?;
        results.push(result);
        self.write_all(&results)
    }

    fn list(&self) -> Result<Vec<SessionResult>, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.write_all(&[])
    }
}
