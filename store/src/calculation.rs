//! Calculation report: the allocator's full output for one cycle, one
//! row per entry, preceded by a baker summary row. Written before the
//! batch is enqueued so the numbers that were paid are always on disk.

use {
    crate::error::Result,
    log::info,
    payout_model::RewardLog,
    std::path::Path,
};

const HEADER: [&str; 14] = [
    "address",
    "type",
    "staked_balance",
    "current_balance",
    "ratio",
    "fee_ratio",
    "amount",
    "fee_amount",
    "fee_rate",
    "payable",
    "skipped",
    "atphase",
    "desc",
    "payment_address",
];

/// Row code for the baker summary line.
const BAKER_TYPE: &str = "B";

pub fn write_calculation_report(
    path: &Path,
    entries: &[RewardLog],
    total_amount: u64,
    baking_address: &str,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;

    let total_staked: u64 = entries.iter().map(|e| e.staking_balance).sum();
    writer.write_record([
        baking_address,
        BAKER_TYPE,
        &total_staked.to_string(),
        "0",
        "1.0000000000",
        "0.0000000000",
        &total_amount.to_string(),
        "0",
        "0.000000",
        "0",
        "0",
        "-1",
        "Baker",
        "None",
    ])?;

    for entry in entries {
        writer.write_record([
            entry.address.as_str(),
            entry.kind.code(),
            &entry.staking_balance.to_string(),
            &entry.current_balance.to_string(),
            &format!("{:.10}", entry.ratio),
            &format!("{:.10}", entry.service_fee_ratio),
            &entry.amount.to_string(),
            &entry.service_fee_amount.to_string(),
            &format!("{:.6}", entry.service_fee_rate),
            if entry.payable { "1" } else { "0" },
            if entry.skipped { "1" } else { "0" },
            &entry
                .skip_phase
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-1".to_string()),
            if entry.skip_reason.is_empty() {
                "None"
            } else {
                entry.skip_reason.as_str()
            },
            entry.payment_address.as_str(),
        ])?;
    }

    writer.flush()?;
    info!("calculation report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, payout_model::EntryType};

    #[test]
    fn test_baker_summary_row_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("600.csv");

        let mut entry = RewardLog::new("tz1abc", EntryType::Delegator, 1_000, 500);
        entry.ratio = 0.8;
        entry.amount = 800;
        entry.payable = true;
        write_calculation_report(&path, &[entry], 1_000, "tz1baker").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("address,type,"));
        assert!(lines.next().unwrap().starts_with("tz1baker,B,1000,"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("tz1abc,D,1000,500,0.8000000000,"));
        assert!(row.contains(",800,"));
    }

    #[test]
    fn test_skipped_entry_records_phase_and_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("601.csv");

        let mut entry = RewardLog::new("tz1gone", EntryType::Delegator, 10, 0);
        entry.skip("Skipped by configuration. ", 1);
        write_calculation_report(&path, &[entry], 0, "tz1baker").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let row = content.lines().last().unwrap();
        assert!(row.contains(",1,1,"));
        assert!(row.contains("Skipped by configuration"));
    }
}
