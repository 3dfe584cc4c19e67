// =============================================================================
// processor.rs — ONE accounts.json IN, A PILE OF ENRICHED RECORDS OUT
// =============================================================================
//
// For each file:
// 1. Read the whole thing. These files are small; streaming would be theatre.
// 2. Parse it. It must be a JSON array of objects.
// 3. Label every object with the parent directory name.
// 4. Tag every object with the chain ID of the grandparent directory, if the
//    chain table knows it. If it doesn't, the records go out untagged and we
//    grumble about it in the logs.
//
// Order in == order out. Nothing is written back to disk.
// =============================================================================

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::chains;
use crate::error::{json_kind, CombineError, Result};
use crate::models::{EnrichedRecord, SourceRecord};
use crate::walker::AccountsFile;

/// One accounts.json after enrichment, with the label and chain that went
/// into every record.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub label: String,
    pub chain_id: Option<u64>,
    pub records: Vec<EnrichedRecord>,
}

/// Read, parse and enrich one accounts.json.
pub fn process_file(file: &AccountsFile) -> Result<ProcessedFile> {
    let content = fs::read_to_string(&file.path).map_err(|source| CombineError::FileRead {
        path: file.path.clone(),
        source,
    })?;

    let rows = parse_accounts(&content, &file.path)?;
    let chain_id = resolve_chain(file);

    debug!(
        path = %file.path.display(),
        label = file.parent_name(),
        chain_id = ?chain_id,
        rows = rows.len(),
        "Processed accounts file"
    );

    Ok(ProcessedFile {
        label: file.parent_name().to_string(),
        chain_id,
        records: enrich(rows, file.parent_name(), chain_id),
    })
}

/// The chain ID for a file's grandparent directory. Unknown or missing
/// grandparents produce a warning and `None`.
pub fn resolve_chain(file: &AccountsFile) -> Option<u64> {
    match file.grandparent_name() {
        Some(explorer) => {
            let chain_id = chains::chain_id_for(explorer);
            if chain_id.is_none() {
                warn!(
                    path = %file.path.display(),
                    explorer = explorer,
                    "Explorer directory not in the chain table — records will have no chainId"
                );
            }
            chain_id
        }
        None => {
            warn!(
                path = %file.path.display(),
                depth = file.depth(),
                "accounts.json sits directly in the data root — records will have no chainId"
            );
            None
        }
    }
}

/// Parse file content as a JSON array of objects.
pub fn parse_accounts(content: &str, path: &Path) -> Result<Vec<SourceRecord>> {
    let value: Value = serde_json::from_str(content).map_err(|source| CombineError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(CombineError::NotAnArray {
                path: path.to_path_buf(),
                found: json_kind(&other),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(fields),
            other => Err(CombineError::ElementNotObject {
                path: path.to_path_buf(),
                index,
                found: json_kind(&other),
            }),
        })
        .collect()
}

/// Attach `label` and `chain_id` to every record, preserving order.
pub fn enrich(rows: Vec<SourceRecord>, label: &str, chain_id: Option<u64>) -> Vec<EnrichedRecord> {
    rows.into_iter()
        .map(|fields| EnrichedRecord::new(fields, label, chain_id))
        .collect()
}
