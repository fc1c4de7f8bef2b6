#![forbid(unsafe_code)]

use mm_kernel_contracts::scenario::ScenarioRecord;
use sha2::{Digest, Sha256};

use crate::StorageError;

/// Lowercase hex SHA-256 over the record's JSON with response and label cleared.
///
/// Two records fingerprint equal iff the generated scenario is identical,
/// whatever the decision-maker said about it.
pub fn scenario_fingerprint(record: &ScenarioRecord) -> Result<String, StorageError> {
    let canonical = serde_json::to_vec(&record.without_response())?;
    let digest = Sha256::digest(&canonical);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
