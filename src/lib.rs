// =============================================================================
// anyscan_labels — ACCOUNT LABELS, COMBINED
// =============================================================================
//
// The scrapers leave a tree of accounts.json files behind, one per explorer
// and label:
//
//   data/<explorer>/<label>/accounts.json
//
// This crate walks that tree and turns it into one dataset where every row
// knows its label (from the parent directory) and its chain ID (from the
// explorer directory). Single-threaded, synchronous, read-only.
// =============================================================================

pub mod chains;
pub mod cli;
pub mod combiner;
pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod models;
pub mod processor;
pub mod walker;

pub use chains::chain_id_for;
pub use combiner::{combine, CombineReport, CombinedDataset, Combiner};
pub use error::CombineError;
pub use models::{AccountDbRow, EnrichedRecord, FailurePolicy, FileOutcome};
