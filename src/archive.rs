use crate::errors::PipelineError;
use crate::types::RawListing;
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const RUN_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn run_stamp(run_at: &DateTime<Local>) -> String {
    run_at.format(RUN_STAMP_FORMAT).to_string()
}

/// Creates `dir/<stem>.<ext>` without ever replacing an existing file; on a
/// name clash `_1`, `_2`, ... is appended to the stem.
pub(crate) fn create_write_once(dir: &Path, stem: &str, ext: &str) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.{}", stem, ext)
        } else {
            format!("{}_{}.{}", stem, attempt, ext)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Writes the run's deduped listings to `all_records_<stamp>.json`, each as
/// the object it was read from.
pub fn archive_records(
    dir: &Path,
    records: &[RawListing],
    run_at: &DateTime<Local>,
) -> Result<PathBuf, PipelineError> {
    let stem = format!("all_records_{}", run_stamp(run_at));
    let (file, path) = create_write_once(dir, &stem, "json").map_err(|source| PipelineError::Archive {
        path: dir.join(format!("{}.json", stem)),
        source,
    })?;

    let write = || -> io::Result<()> {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    };
    write().map_err(|source| PipelineError::Archive { path: path.clone(), source })?;

    info!("[Archive] Archived {} record(s) to {}", records.len(), path.display());
    Ok(path)
}
