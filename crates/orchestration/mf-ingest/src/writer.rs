//! Parquet output files, one per completed batch.

use mf_error::{MfError, Result, WriteError};
use mf_types::HourlyTable;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Deterministic output file name for a batch.
    pub fn file_name(partition_key: &str, batch_index: u64) -> String {
        format!("{partition_key}_batch_{batch_index:03}.parquet")
    }

    pub fn output_path(&self, partition_key: &str, batch_index: u64) -> PathBuf {
        self.output_dir.join(Self::file_name(partition_key, batch_index))
    }

    /// Write one batch's aggregated table as a parquet file.
    ///
    /// Writes to a temp file and renames into place, so an existing
    /// file at the target path (an orphan from an interrupted run) is
    /// replaced whole rather than appended to or truncated mid-write.
    pub fn write(
        &self,
        partition_key: &str,
        batch_index: u64,
        table: &HourlyTable,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| MfError::Write(WriteError::Io(e.to_string())))?;

        let target = self.output_path(partition_key, batch_index);
        let tmp = target.with_extension("parquet.tmp");

        self.write_file(&tmp, table)?;
        fs::rename(&tmp, &target)
            .map_err(|e| MfError::Write(WriteError::Io(e.to_string())))?;

        debug!(
            path = %target.display(),
            rows = table.num_rows(),
            "wrote batch output"
        );
        Ok(target)
    }

    fn write_file(&self, path: &Path, table: &HourlyTable) -> Result<()> {
        let file =
            File::create(path).map_err(|e| MfError::Write(WriteError::Io(e.to_string())))?;

        let mut writer = ArrowWriter::try_new(file, table.schema(), None)
            .map_err(|e| MfError::Write(WriteError::Serialize(e.to_string())))?;
        writer
            .write(table.record_batch())
            .map_err(|e| MfError::Write(WriteError::Serialize(e.to_string())))?;
        writer
            .close()
            .map_err(|e| MfError::Write(WriteError::Serialize(e.to_string())))?;

        Ok(())
    }
}
