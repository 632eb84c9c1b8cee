use std::{fs, path::Path};

use crate::{
    errors::{Result, SplitError},
    ledger::{SplitLedger, CURRENT_SCHEMA_VERSION},
    storage::json_backend::replace_file,
};

/// Writes a whole-ledger snapshot, staging to a temporary file first.
pub fn save_ledger_to_file(ledger: &SplitLedger, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(ledger)?;
    replace_file(path, &json)
}

/// Loads a snapshot, rejecting schema versions newer than this build.
pub fn load_ledger_from_file(path: &Path) -> Result<SplitLedger> {
    let data = fs::read_to_string(path)?;
    let ledger: SplitLedger = serde_json::from_str(&data)?;
    if ledger.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(SplitError::Storage(format!(
            "ledger schema v{} is newer than supported v{}",
            ledger.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(ledger)
}
