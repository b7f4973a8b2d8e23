use anyhow::{Context as AnyhowContext, Result};
use orgtree_core::FlatRecord;
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Accepted snapshot layouts: a bare array or `{ "records": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    List(Vec<FlatRecord>),
    Wrapped { records: Vec<FlatRecord> },
}

/// Read a JSON record snapshot from a file, or stdin when `source` is `-`
pub(crate) fn read_records(source: &Path) -> Result<Vec<FlatRecord>> {
    let raw = if source == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read records from stdin")?;
        buf
    } else {
        fs::read_to_string(source)
            .with_context(|| format!("Failed to read records {}", source.display()))?
    };

    let records = parse_records(&raw)
        .with_context(|| format!("Invalid record snapshot {}", source.display()))?;
    log::info!("Loaded {} records from {}", records.len(), source.display());
    Ok(records)
}

pub(crate) fn parse_records(raw: &str) -> Result<Vec<FlatRecord>> {
    let snapshot: Snapshot = serde_json::from_str(raw)?;
    Ok(match snapshot {
        Snapshot::List(records) | Snapshot::Wrapped { records } => records,
    })
}
