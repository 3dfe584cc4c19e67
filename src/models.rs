// =============================================================================
// models.rs — THE SHAPES OUR ROWS TAKE ON THE WAY TO THE DATABASE
// =============================================================================
//
// Three stages of a row's life:
//
// 1. SourceRecord  — whatever the scraper wrote. We don't judge. We don't
//                    validate. We copy.
// 2. EnrichedRecord — the source fields plus `label` (parent directory) and
//                    `chainId` (grandparent directory, via the chain table).
// 3. AccountDbRow  — the strictly typed row the accounts table wants. Only
//                    records with a chain ID and an address make it this far.
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One object from an accounts.json file, fields untouched.
pub type SourceRecord = Map<String, Value>;

/// Field names the combiner owns. Source values under these keys are replaced.
pub const LABEL_FIELD: &str = "label";
pub const CHAIN_ID_FIELD: &str = "chainId";

/// A source record plus the two fields derived from where its file lives.
///
/// Serializes as a single flat object: `{ ...source, "label": .., "chainId": .. }`
/// with `chainId` omitted when the explorer directory was not recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub fields: SourceRecord,

    pub label: String,

    #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl EnrichedRecord {
    /// Enrich a source record. Any `label`/`chainId` the scraper wrote is
    /// dropped in favor of the derived values, even when the chain is unknown.
    pub fn new(mut fields: SourceRecord, label: impl Into<String>, chain_id: Option<u64>) -> Self {
        fields.remove(LABEL_FIELD);
        fields.remove(CHAIN_ID_FIELD);
        Self {
            fields,
            label: label.into(),
            chain_id,
        }
    }

    /// The account address, when the scraper wrote one as a string.
    pub fn address(&self) -> Option<&str> {
        self.fields.get("address").and_then(Value::as_str)
    }

    /// The explorer's name tag, when present.
    pub fn name_tag(&self) -> Option<&str> {
        self.fields.get("nameTag").and_then(Value::as_str)
    }
}

/// The accounts table row, minus the generated id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDbRow {
    pub chain_id: u64,
    pub address: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_tag: Option<String>,
}

/// Why an enriched record can't become a database row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("record labelled '{label}' has no chain ID")]
    UnresolvedChain { label: String },

    #[error("record labelled '{label}' has no string address")]
    MissingAddress { label: String },
}

impl TryFrom<&EnrichedRecord> for AccountDbRow {
    type Error = RowError;

    fn try_from(record: &EnrichedRecord) -> Result<Self, Self::Error> {
        let chain_id = record.chain_id.ok_or_else(|| RowError::UnresolvedChain {
            label: record.label.clone(),
        })?;
        let address = record.address().ok_or_else(|| RowError::MissingAddress {
            label: record.label.clone(),
        })?;

        Ok(AccountDbRow {
            chain_id,
            address: address.to_string(),
            label: record.label.clone(),
            name_tag: record.name_tag().map(str::to_string),
        })
    }
}

/// What to do when a single accounts.json goes bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// First error aborts the run and no records are returned.
    #[default]
    FailFast,
    /// Bad files are recorded in the report and skipped.
    Isolate,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => write!(f, "fail-fast"),
            FailurePolicy::Isolate => write!(f, "isolate"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(FailurePolicy::FailFast),
            "isolate" => Ok(FailurePolicy::Isolate),
            other => Err(format!("unknown failure policy '{other}' (expected fail-fast or isolate)")),
        }
    }
}

/// The per-file verdict collected into the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Combined {
        path: PathBuf,
        label: String,
        chain_id: Option<u64>,
        records: usize,
    },
    Failed {
        path: PathBuf,
        reason: String,
    },
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: Value) -> SourceRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_derived_fields_override_source_fields() {
        let record = EnrichedRecord::new(
            source(json!({"address": "0xabc", "label": "stale", "chainId": 999})),
            "0x-protocol",
            None,
        );
        assert_eq!(record.label, "0x-protocol");
        assert_eq!(record.chain_id, None);
        assert!(!record.fields.contains_key("label"));
        assert!(!record.fields.contains_key("chainId"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"address": "0xabc", "label": "0x-protocol"}));
    }

    #[test]
    fn test_serializes_flat_with_chain_id() {
        let record = EnrichedRecord::new(
            source(json!({"address": "0xabc", "nameTag": "Foo", "extra": [1, 2]})),
            "0x-protocol",
            Some(1),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            json!({
                "address": "0xabc",
                "nameTag": "Foo",
                "extra": [1, 2],
                "label": "0x-protocol",
                "chainId": 1
            })
        );

        let back: EnrichedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_db_row_from_complete_record() {
        let record = EnrichedRecord::new(
            source(json!({"address": "0xabc", "nameTag": "Foo"})),
            "0x-protocol",
            Some(8453),
        );
        let row = AccountDbRow::try_from(&record).unwrap();
        assert_eq!(
            row,
            AccountDbRow {
                chain_id: 8453,
                address: "0xabc".to_string(),
                label: "0x-protocol".to_string(),
                name_tag: Some("Foo".to_string()),
            }
        );
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"chainId": 8453, "address": "0xabc", "label": "0x-protocol", "nameTag": "Foo"})
        );
    }

    #[test]
    fn test_db_row_requires_chain_and_address() {
        let unmapped = EnrichedRecord::new(source(json!({"address": "0xdef"})), "some-label", None);
        assert_eq!(
            AccountDbRow::try_from(&unmapped),
            Err(RowError::UnresolvedChain { label: "some-label".to_string() })
        );

        let no_address = EnrichedRecord::new(source(json!({"address": 42})), "lst", Some(1));
        assert_eq!(
            AccountDbRow::try_from(&no_address),
            Err(RowError::MissingAddress { label: "lst".to_string() })
        );
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("fail-fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert_eq!(" Isolate ".parse::<FailurePolicy>(), Ok(FailurePolicy::Isolate));
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::FailFast);
        assert_eq!(FailurePolicy::Isolate.to_string(), "isolate");
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = FileOutcome::Failed {
            path: PathBuf::from("data/etherscan/x/accounts.json"),
            reason: "invalid JSON".to_string(),
        };
        assert!(outcome.is_failure());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"status": "failed", "path": "data/etherscan/x/accounts.json", "reason": "invalid JSON"})
        );
    }
}
