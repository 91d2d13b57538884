// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::portal::client::ScrapeReport;
use crate::portal::models::NoticeRecord;
use crate::utils::error::StorageError;

pub const DEFAULT_OUTPUT_PATH: &str = "./data/licitacoes.json";

/// `OUTPUT_PATH` if set, otherwise `./data/licitacoes.json`.
pub fn default_output_path() -> PathBuf {
    std::env::var("OUTPUT_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
}

/// `data/licitacoes.json` -> `data/licitacoes_20240131T120000Z.json`
pub fn timestamped_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "licitacoes".to_string());
    let stamp = at.format("%Y%m%dT%H%M%SZ");
    let filename = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };
    path.with_file_name(filename)
}

fn ensure_parent_dir(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(StorageError::IoError)
        }
        _ => Ok(()),
    }
}

/// Writes the whole collection as an indented JSON array, replacing any existing file.
pub fn save_records(path: &Path, records: &[NoticeRecord]) -> Result<PathBuf, StorageError> {
    ensure_parent_dir(path)?;

    let json = serde_json::to_string_pretty(records)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    fs::write(path, json).map_err(StorageError::IoError)?;

    tracing::info!("Saved {} records to {}", records.len(), path.display());
    Ok(path.to_path_buf())
}

pub fn load_records(path: &Path) -> Result<Vec<NoticeRecord>, StorageError> {
    let content = fs::read_to_string(path).map_err(StorageError::IoError)?;
    let records: Vec<NoticeRecord> = serde_json::from_str(&content)
        .map_err(|e| StorageError::SerializationError(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Sidecar path next to the output: `licitacoes.json` -> `licitacoes.meta.json`.
pub fn metadata_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "licitacoes".to_string());
    output.with_file_name(format!("{}.meta.json", stem))
}

/// Saves a summary of the scrape cycle that produced `output`.
pub fn save_run_metadata(
    output: &Path,
    base_url_template: &str,
    report: &ScrapeReport,
    record_count: usize,
    finished_at: DateTime<Utc>,
) -> Result<PathBuf, StorageError> {
    let file_path = metadata_path(output);
    ensure_parent_dir(&file_path)?;

    let skipped: Vec<serde_json::Value> = report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            crate::portal::client::PageOutcome::Skipped { page, reason } => {
                Some(serde_json::json!({ "page": page, "reason": reason.to_string() }))
            }
            crate::portal::client::PageOutcome::Fetched { .. } => None,
        })
        .collect();

    let metadata = serde_json::json!({
        "output": output.display().to_string(),
        "base_url_template": base_url_template,
        "pages_requested": report.outcomes.len(),
        "pages_fetched": report.pages_fetched(),
        "pages_skipped": skipped,
        "record_count": record_count,
        "finished_at": finished_at.to_rfc3339(),
    });

    let metadata_str = serde_json::to_string_pretty(&metadata)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

    tracing::debug!("Saved run metadata to {}", file_path.display());
    Ok(file_path)
}
