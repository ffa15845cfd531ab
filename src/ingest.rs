use crate::deduplication::{Admission, Deduplicator};
use crate::errors::PipelineError;
use crate::types::RawListing;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Deduped records of one run plus the bookkeeping of how they were reached.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<RawListing>,
    pub files_read: usize,
    pub skipped_files: Vec<PathBuf>,
    /// Batch elements that were not JSON objects.
    pub malformed: usize,
    pub placeholders: usize,
    pub missing_link: usize,
    pub duplicates: usize,
}

/// Reads every `*.json` batch in `dir`, in sorted path order, and dedups by link.
pub fn ingest_dir(dir: &Path) -> Result<IngestReport, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::InputDirMissing(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    ingest_files(&files)
}

/// Files are processed in the order given; callers wanting reproducible
/// output pass them sorted.
pub fn ingest_files(files: &[PathBuf]) -> Result<IngestReport, PipelineError> {
    let mut report = IngestReport::default();
    let mut dedup = Deduplicator::new();

    for path in files {
        let Some(batch) = read_batch(path) else {
            report.skipped_files.push(path.clone());
            continue;
        };
        report.files_read += 1;
        debug!("[Ingest] {} listing(s) in {}", batch.len(), path.display());

        for value in batch {
            let Some(listing) = RawListing::from_value(value) else {
                report.malformed += 1;
                continue;
            };
            match dedup.offer(listing) {
                Admission::Accepted => {}
                Admission::Placeholder => report.placeholders += 1,
                Admission::MissingLink => report.missing_link += 1,
                Admission::Duplicate => report.duplicates += 1,
            }
        }
    }

    report.records = dedup.into_records();
    info!(
        "[Ingest] {} unique listing(s) from {} file(s) ({} skipped, {} malformed, {} duplicate, {} placeholder, {} without link)",
        report.records.len(),
        report.files_read,
        report.skipped_files.len(),
        report.malformed,
        report.duplicates,
        report.placeholders,
        report.missing_link
    );
    Ok(report)
}

/// A file is only skipped when it is not a JSON array; odd field types inside
/// the array are dealt with per record.
fn read_batch(path: &Path) -> Option<Vec<Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("[Ingest] Skipping unreadable file {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<Vec<Value>>(&text) {
        Ok(batch) => Some(batch),
        Err(e) => {
            warn!("[Ingest] Skipping invalid JSON {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn skips_corrupt_and_foreign_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"name":"2018 Honda Fit","price":"$9,000","miles":"60K miles","link":"x","location":"Provo, UT"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "[]").unwrap();

        let report = ingest_dir(dir.path()).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.files_read, 1);
        assert_eq!(report.skipped_files, vec![dir.path().join("b.json")]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            ingest_dir(&missing),
            Err(PipelineError::InputDirMissing(_))
        ));
    }

    #[test]
    fn unknown_fields_survive_for_the_archive() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"name":"2018 Honda Fit","title":"2018 Honda Fit","link":"x","seller":"pat"}]"#,
        )
        .unwrap();
        let report = ingest_dir(dir.path()).unwrap();
        let listing = &report.records[0];
        assert_eq!(listing.title.as_deref(), Some("2018 Honda Fit"));
        assert_eq!(listing.original.get("seller").and_then(|v| v.as_str()), Some("pat"));
    }

    #[test]
    fn odd_field_types_do_not_sink_the_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[
                {"name":"2018 Honda Fit","price":"$9,000","miles":"60K miles","link":"x"},
                {"name":"2017 Honda Fit","price":"$8,500","miles":60000,"link":"y","location":null},
                "stray"
            ]"#,
        )
        .unwrap();

        let report = ingest_dir(dir.path()).unwrap();
        assert!(report.skipped_files.is_empty());
        assert_eq!(report.files_read, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[1].miles.as_deref(), Some("60000"));
        assert_eq!(report.records[1].location, None);
    }
}
