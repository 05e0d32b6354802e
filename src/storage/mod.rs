// src/storage/mod.rs
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use clap::ValueEnum;
use serde::Serialize;
use crate::extractors::models::{AnswerRecord, DocumentScan};
use crate::utils::error::StorageError;

/// How extracted records are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `name,category,queryIndex,answer` lines
    #[default]
    Csv,
    /// Pretty-printed JSON array
    Json,
}

/// Newline-joined record lines, final line unterminated.
pub fn serialize(records: &[AnswerRecord]) -> String {
    records
        .iter()
        .map(AnswerRecord::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render(records: &[AnswerRecord], format: OutputFormat) -> Result<String, StorageError> {
    match format {
        OutputFormat::Csv => Ok(serialize(records)),
        OutputFormat::Json => serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::SerializationError(e.to_string())),
    }
}

/// Per-document counters written to the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    pub category: String,
    pub markers_seen: usize,
    pub markers_matched: usize,
    pub cells_visited: usize,
    pub records: usize,
}

impl DocumentSummary {
    pub fn from_scan(source: impl Into<String>, scan: &DocumentScan) -> Self {
        Self {
            source: source.into(),
            category: scan.category.clone(),
            markers_seen: scan.markers_seen,
            markers_matched: scan.markers_matched,
            cells_visited: scan.cells_visited,
            records: scan.records.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub documents: Vec<DocumentSummary>,
    pub failed_documents: usize,
    pub total_records: usize,
    pub extraction_timestamp: String,
}

impl RunSummary {
    pub fn new(documents: Vec<DocumentSummary>, failed_documents: usize) -> Self {
        let total_records = documents.iter().map(|d| d.records).sum();
        Self {
            documents,
            failed_documents,
            total_records,
            extraction_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Writes rendered records to a file, or to stdout when no path is set.
pub struct StorageManager {
    output: Option<PathBuf>,
}

impl StorageManager {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    /// Writes `rendered` verbatim. Returns the file path when one was used.
    pub fn write_records(&self, rendered: &str) -> Result<Option<PathBuf>, StorageError> {
        match &self.output {
            Some(path) => {
                ensure_parent_dir(path)?;
                fs::write(path, rendered)
                    .map_err(StorageError::IoError)?;
                tracing::info!("Saved records to {}", path.display());
                Ok(Some(path.clone()))
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                write_to(&mut handle, rendered)?;
                Ok(None)
            }
        }
    }

    /// Saves the run summary as pretty JSON.
    pub fn save_summary(&self, path: &Path, summary: &RunSummary) -> Result<PathBuf, StorageError> {
        ensure_parent_dir(path)?;

        let summary_str = serde_json::to_string_pretty(summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(path, summary_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved run summary to {}", path.display());

        Ok(path.to_path_buf())
    }
}

fn write_to<W: Write>(writer: &mut W, rendered: &str) -> Result<(), StorageError> {
    writer.write_all(rendered.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(StorageError::IoError)?;
        }
    }
    Ok(())
}
