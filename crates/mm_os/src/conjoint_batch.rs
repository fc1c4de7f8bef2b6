#![forbid(unsafe_code)]

use mm_engines::classify::classify;
use mm_engines::conjoint::{ConjointEncoder, ConjointEncoderConfig, ConjointError};
use mm_kernel_contracts::conjoint::ConjointRow;
use mm_kernel_contracts::scenario::{ResponseLabel, ScenarioRecord};
use mm_storage::StorageError;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BatchRecordError {
    #[error(transparent)]
    Read(#[from] StorageError),
    #[error(transparent)]
    Encode(#[from] ConjointError),
}

/// Conjoint rows of a whole log, plus what did not make it in.
#[derive(Debug, Default)]
pub struct ConjointBatch {
    pub rows: Vec<ConjointRow>,
    /// Scenarios that passed the response filter, encoded or not.
    pub retained: usize,
    /// Unparseable or unanswered scenarios.
    pub dropped: usize,
    /// `(position in input, error)` for records that could not be read or encoded.
    pub failures: Vec<(usize, BatchRecordError)>,
}

#[derive(Debug, Clone)]
pub struct ConjointBatchConverter {
    encoder: ConjointEncoder,
}

impl ConjointBatchConverter {
    pub fn new(config: ConjointEncoderConfig) -> Self {
        Self {
            encoder: ConjointEncoder::new(config),
        }
    }

    pub fn convert<I>(&self, records: I) -> ConjointBatch
    where
        I: IntoIterator<Item = ScenarioRecord>,
    {
        self.convert_lines(records.into_iter().map(Ok))
    }

    /// Like [`Self::convert`], over log lines that may have failed to read.
    pub fn convert_lines<I>(&self, lines: I) -> ConjointBatch
    where
        I: IntoIterator<Item = Result<ScenarioRecord, StorageError>>,
    {
        let mut batch = ConjointBatch::default();
        for (position, line) in lines.into_iter().enumerate() {
            let mut record = match line {
                Ok(r) => r,
                Err(err) => {
                    warn!(position, error = %err, "skipping unreadable scenario record");
                    batch.failures.push((position, err.into()));
                    continue;
                }
            };
            if record.chat_response.is_none() {
                batch.dropped += 1;
                continue;
            }
            let label = classify(record.chat_response.as_deref());
            record.label = Some(label);
            if label == ResponseLabel::Unparseable {
                batch.dropped += 1;
                continue;
            }

            let index = batch.retained;
            batch.retained += 1;
            match self.encoder.encode(index, &record) {
                Ok(rows) => batch.rows.extend(rows),
                Err(err) => {
                    warn!(position, error = %err, "skipping unencodable scenario record");
                    batch.failures.push((position, err.into()));
                }
            }
        }
        info!(
            rows = batch.rows.len(),
            retained = batch.retained,
            dropped = batch.dropped,
            failures = batch.failures.len(),
            "conjoint conversion finished"
        );
        batch
    }
}

/// Converts with the default session metadata.
pub fn convert_records<I>(records: I) -> ConjointBatch
where
    I: IntoIterator<Item = ScenarioRecord>,
{
    ConjointBatchConverter::new(ConjointEncoderConfig::mvp_v1()).convert(records)
}
