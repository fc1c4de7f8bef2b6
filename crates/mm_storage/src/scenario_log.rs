#![forbid(unsafe_code)]

//! JSON Lines scenario log: one [`ScenarioRecord`] per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use mm_kernel_contracts::scenario::ScenarioRecord;
use mm_kernel_contracts::Validate;
use tracing::debug;

use crate::StorageError;

#[derive(Debug)]
pub struct ScenarioLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    appended: u64,
    unflushed: u64,
}

impl ScenarioLogWriter {
    /// Creates (or truncates) the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| StorageError::io(&path, e))?;
        Ok(Self::from_file(path, file))
    }

    /// Opens the log at `path` for appending, creating it when missing.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            writer: BufWriter::new(file),
            appended: 0,
            unflushed: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this writer.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Records appended since the last checkpoint.
    pub fn unflushed(&self) -> u64 {
        self.unflushed
    }

    pub fn append(&mut self, record: &ScenarioRecord) -> Result<(), StorageError> {
        record.validate()?;
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.appended += 1;
        self.unflushed += 1;
        Ok(())
    }

    /// Flushes buffered lines and syncs them to disk.
    pub fn checkpoint(&mut self) -> Result<(), StorageError> {
        self.writer
            .flush()
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|e| StorageError::io(&self.path, e))?;
        debug!(path = %self.path.display(), records = self.appended, "scenario log checkpoint");
        self.unflushed = 0;
        Ok(())
    }
}

/// Reads every line of the log at `path`.
///
/// Opening or reading the file fails the whole log; a line that is not UTF-8,
/// not JSON, or not a valid record fails only itself. Blank lines are skipped.
pub fn read_scenario_log(
    path: impl AsRef<Path>,
) -> Result<Vec<Result<ScenarioRecord, StorageError>>, StorageError> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|e| StorageError::io(path, e))?;
    if !meta.is_file() {
        return Err(StorageError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    read_scenario_lines(BufReader::new(file), path)
}

/// Same as [`read_scenario_log`] over any buffered reader.
pub fn read_scenario_lines<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> Result<Vec<Result<ScenarioRecord, StorageError>>, StorageError> {
    let mut out = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| StorageError::io(origin, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let Ok(line) = std::str::from_utf8(&buf) else {
            out.push(Err(StorageError::NotUtf8 { line: line_no }));
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }
        out.push(parse_line(line_no, line));
    }
    Ok(out)
}

fn parse_line(line: usize, text: &str) -> Result<ScenarioRecord, StorageError> {
    let record: ScenarioRecord = serde_json::from_str(text)
        .map_err(|source| StorageError::MalformedLine { line, source })?;
    record
        .validate()
        .map_err(|violation| StorageError::InvalidRecord { line, violation })?;
    Ok(record)
}
