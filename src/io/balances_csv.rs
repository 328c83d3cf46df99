//! CSV output of final account balances

use crate::types::AccountSnapshot;
use std::io::Write;

/// Write account balances as CSV
///
/// Emits a header row `account,name,balance` followed by one row per account,
/// sorted by account id for deterministic output.
///
/// # Arguments
///
/// * `snapshots` - Account snapshots to write
/// * `output` - Writer for the CSV output
///
/// # Returns
///
/// * `Ok(())` - If all rows were written and flushed
/// * `Err(String)` - If serialization or I/O failed
pub fn write_balances_csv(
    snapshots: &[AccountSnapshot],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    let mut sorted = snapshots.to_vec();
    sorted.sort_by_key(|snapshot| snapshot.id);

    for snapshot in &sorted {
        writer
            .serialize(snapshot)
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    // An empty list still gets its header
    if sorted.is_empty() {
        writer
            .write_record(["account", "name", "balance"])
            .map_err(|e| format!("Failed to write CSV header: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
