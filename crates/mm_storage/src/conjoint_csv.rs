#![forbid(unsafe_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use mm_kernel_contracts::conjoint::{ConjointRow, CONJOINT_COLUMNS};
use mm_kernel_contracts::Validate;

use crate::StorageError;

/// Conjoint table writer. The header goes out once, on construction.
pub struct ConjointCsvWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: u64,
}

impl ConjointCsvWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
        Self::from_writer(file)
    }
}

impl<W: Write> ConjointCsvWriter<W> {
    pub fn from_writer(writer: W) -> Result<Self, StorageError> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        inner.write_record(CONJOINT_COLUMNS)?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write_row(&mut self, row: &ConjointRow) -> Result<(), StorageError> {
        row.validate()?;
        self.inner.write_record(row.to_cells())?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_rows<'a, I>(&mut self, rows: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = &'a ConjointRow>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.inner
            .flush()
            .map_err(|e| StorageError::Csv(csv::Error::from(e)))
    }

    pub fn into_inner(self) -> Result<W, StorageError> {
        self.inner
            .into_inner()
            .map_err(|e| StorageError::Csv(csv::Error::from(e.into_error())))
    }
}
