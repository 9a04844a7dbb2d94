use crate::errors::BenchResult;
use crate::reporting::RunRecord;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Owns the in-progress [`RunRecord`] and writes it exactly once.
///
/// [`RecordWriter::finish`] performs the write. If the writer is dropped
/// before that (an early return or an unwinding panic) the record is written
/// from `Drop` instead, with whatever it holds at that point.
pub struct RecordWriter {
    path: PathBuf,
    record: RunRecord,
    written: bool,
}

impl RecordWriter {
    pub fn new(path: impl Into<PathBuf>, record: RunRecord) -> Self {
        Self {
            path: path.into(),
            record,
            written: false,
        }
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut RunRecord {
        &mut self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the record and hand it back.
    pub fn finish(mut self) -> BenchResult<RunRecord> {
        self.written = true;
        write_jsonl(&self.path, &self.record)?;
        tracing::info!("wrote run record to {}", self.path.display());
        Ok(std::mem::take(&mut self.record))
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        if self.written {
            return;
        }
        self.written = true;
        if let Err(e) = write_jsonl(&self.path, &self.record) {
            tracing::error!("failed to write run record to {}: {}", self.path.display(), e);
        }
    }
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent(path: &Path) -> BenchResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Truncate `path` and write `record` as one JSON object plus a newline.
pub fn write_jsonl(path: &Path, record: &RunRecord) -> BenchResult<()> {
    ensure_parent(path)?;
    let line = serde_json::to_string(record)?;
    let mut file = File::create(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_single_line(path: &Path) -> RunRecord {
        let content = fs::read_to_string(path).unwrap();
        assert!(content.ends_with('\n'));
        assert_eq!(content.lines().count(), 1);
        serde_json::from_str(content.trim_end()).unwrap()
    }

    #[test]
    fn finish_writes_once_into_new_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("run.jsonl");

        let mut writer = RecordWriter::new(&path, RunRecord::default());
        writer.record_mut().method = "sindy".to_string();
        writer.record_mut().t_fit_ns.push(42);
        let record = writer.finish().unwrap();

        let on_disk = read_single_line(&path);
        assert_eq!(on_disk, record);
        assert_eq!(on_disk.t_fit_ns, [42]);
    }

    #[test]
    fn dropping_without_finish_still_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        {
            let mut writer = RecordWriter::new(&path, RunRecord::default());
            writer.record_mut().system = "lorenz".to_string();
        }
        assert_eq!(read_single_line(&path).system, "lorenz");
    }

    #[test]
    fn existing_file_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        fs::write(&path, "old line\nanother\n").unwrap();
        RecordWriter::new(&path, RunRecord::default()).finish().unwrap();
        read_single_line(&path);
    }

    #[test]
    fn optional_fields_are_omitted_until_set() {
        let json = serde_json::to_value(RunRecord::default()).unwrap();
        assert!(json.get("X_shape").is_none());
        assert!(json.get("traceback").is_none());
        assert!(json.get("error_type").unwrap().is_null());
    }
}
