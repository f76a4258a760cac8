// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Flat table export
//
// One row per trace record with a fixed column order:
// agent_id, timestamp, level, message, category
//
// The category column is derived at write time with the built-in taxonomy and
// is ignored when a table is loaded back.

use std::path::Path;

use crate::domain::classification::FailureClassifier;
use crate::domain::trace::{wire_timestamp, AgentId, LogLevel, TraceRecord};

pub const COLUMNS: [&str; 5] = ["agent_id", "timestamp", "level", "message", "category"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Table I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

/// Write `records` to `path`, overwriting it. Uses the built-in classifier.
pub fn save_as_table(records: &[TraceRecord], path: &Path) -> Result<(), ExportError> {
    save_as_table_with(records, path, &FailureClassifier::default())
}

pub fn save_as_table_with(
    records: &[TraceRecord],
    path: &Path,
    classifier: &FailureClassifier,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COLUMNS)?;
    for record in records {
        let timestamp = wire_timestamp::format(&record.timestamp());
        let category = classifier.classify(record.message());
        writer.write_record([
            record.agent_id().as_str(),
            timestamp.as_str(),
            record.level().as_str(),
            record.message(),
            category.label(),
        ])?;
    }
    writer.flush()?;
    tracing::info!(rows = records.len(), path = %path.display(), "Saved trace table");
    Ok(())
}

/// Read a table written by [`save_as_table`].
pub fn load_table(path: &Path) -> Result<Vec<TraceRecord>, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize, ExportError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ExportError::InvalidRow {
                row: 0,
                reason: format!("missing column '{}'", name),
            })
    };
    let (agent_col, ts_col, level_col, msg_col) =
        (column("agent_id")?, column("timestamp")?, column("level")?, column("message")?);

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let line = index + 1;
        let invalid = |reason: String| ExportError::InvalidRow { row: line, reason };

        let field = |col: usize| row.get(col).unwrap_or_default();
        let agent_id = AgentId::new(field(agent_col)).map_err(|e| invalid(e.to_string()))?;
        let timestamp = wire_timestamp::parse(field(ts_col)).map_err(invalid)?;
        let level = match field(level_col) {
            "" => LogLevel::Info,
            raw => raw.parse::<LogLevel>().map_err(|e| invalid(e.to_string()))?,
        };

        records.push(TraceRecord::new(agent_id, timestamp, level, field(msg_col)));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<TraceRecord> {
        vec![
            TraceRecord::new(
                AgentId::new("product_manager").unwrap(),
                Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
                LogLevel::Info,
                "Starting requirements analysis",
            ),
            TraceRecord::new(
                AgentId::new("architect").unwrap(),
                Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 5).unwrap(),
                LogLevel::Error,
                "System too complex, \"timeout\"\nretry later",
            ),
        ]
    }

    #[test]
    fn test_column_order_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mas_logs.csv");

        save_as_table(&sample(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "product_manager");
        assert_eq!(&rows[0][1], "2026-01-01T09:00:00.000000Z");
        assert_eq!(&rows[0][2], "INFO");
        assert_eq!(&rows[0][4], "Requirements Analysis Error");
        assert_eq!(&rows[1][4], "Architecture Design Error");
    }

    #[test]
    fn test_load_reads_back_saved_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mas_logs.csv");
        let records = sample();

        save_as_table(&records, &path).unwrap();
        assert_eq!(load_table(&path).unwrap(), records);
    }

    #[test]
    fn test_load_reports_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "agent_id,timestamp,level,message,category\npm,not-a-time,INFO,hi,Other\n",
        )
        .unwrap();

        assert!(matches!(
            load_table(&path),
            Err(ExportError::InvalidRow { row: 1, .. })
        ));
    }
}
