//! Payment report: terminal outcome of every attempted entry for one
//! cycle. Written to `done/` when the batch fully settled, to `failed/`
//! otherwise; the failed variant is parsed back by the retry pass.
//!
//! Merged entries are expanded: the payment row itself plus one audit
//! row per constituent, tagged with the parent destination. Only rows
//! without a parent are payment units and only those are parsed back.

use {
    crate::error::{Result, StoreError},
    log::info,
    payout_model::{EntryType, PaymentStatus, RewardLog},
    std::path::Path,
};

const HEADER: [&str; 7] = ["address", "type", "amount", "fee", "hash", "paid", "parent"];
const NONE: &str = "None";

fn record(entry: &RewardLog, parent: Option<&str>) -> [String; 7] {
    [
        entry.payment_address.clone(),
        entry.kind.code().to_string(),
        entry.amount.to_string(),
        (entry.delegator_transaction_fee + entry.delegate_transaction_fee).to_string(),
        entry.hash.clone().unwrap_or_else(|| NONE.to_string()),
        entry.paid.code().to_string(),
        parent.unwrap_or(NONE).to_string(),
    ]
}

pub fn write_payment_report(path: &Path, entries: &[RewardLog]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;

    for entry in entries {
        writer.write_record(record(entry, None))?;
        for constituent in &entry.parents {
            // Constituents inherit the merged row's outcome.
            let mut audit = constituent.clone();
            audit.paid = entry.paid;
            audit.hash = entry.hash.clone();
            writer.write_record(record(&audit, Some(&entry.payment_address)))?;
        }
    }

    writer.flush()?;
    info!("payment report written to {}", path.display());
    Ok(())
}

/// Rebuild payment units from a failed report. Audit rows (those with
/// a parent) are skipped; the retry pass re-pays the merged unit, not
/// its constituents.
pub fn parse_payment_report(path: &Path, cycle: u64) -> Result<Vec<RewardLog>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut entries = Vec::new();

    for row in reader.records() {
        let row = row?;
        let field = |idx: usize| -> Result<&str> {
            row.get(idx).ok_or_else(|| StoreError::BadRow {
                file: path.to_path_buf(),
                reason: format!("missing column {idx}"),
            })
        };

        if field(6)? != NONE {
            continue;
        }

        let address = field(0)?;
        let kind = EntryType::from_code(field(1)?).ok_or_else(|| StoreError::BadRow {
            file: path.to_path_buf(),
            reason: format!("unknown entry type '{}'", row.get(1).unwrap_or_default()),
        })?;
        let amount: u64 = field(2)?.parse().map_err(|_| StoreError::BadRow {
            file: path.to_path_buf(),
            reason: format!("bad amount '{}'", row.get(2).unwrap_or_default()),
        })?;
        let paid = PaymentStatus::from_code(field(5)?).ok_or_else(|| StoreError::BadRow {
            file: path.to_path_buf(),
            reason: format!("unknown status '{}'", row.get(5).unwrap_or_default()),
        })?;

        let mut entry = RewardLog::new(address, kind, 0, 0);
        entry.cycle = cycle;
        entry.amount = amount;
        entry.payable = true;
        entry.paid = paid;
        let hash = field(4)?;
        entry.hash = (hash != NONE).then(|| hash.to_string());
        entries.push(entry);
    }

    Ok(entries)
}
