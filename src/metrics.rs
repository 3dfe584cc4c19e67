// ═══════════════════════════════════════════════════════════════
// METRICS - Because if you can't count it, it didn't get combined
// ═══════════════════════════════════════════════════════════════
//
// Per-run counters. The combine is single-threaded, so plain integers do
// the job; the snapshot is serializable and lands in the run report.
//
// Duplicates are COUNTED here, never removed. The same address can carry
// several labels on the same chain and the accounts table wants all of them.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use serde::Serialize;

use crate::models::EnrichedRecord;

/// The metrics snapshot - what gets serialized to JSON
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub files_discovered: u64,
    pub files_combined: u64,
    pub files_failed: u64,
    pub records_emitted: u64,
    pub records_without_chain: u64,
    pub records_without_address: u64,
    /// chain ID → record count
    pub records_per_chain: BTreeMap<u64, u64>,
    /// (chainId, address) pairs seen more than once
    pub duplicate_chain_addresses: u64,
    pub elapsed_ms: u64,
}

/// Running counters for one combine.
#[derive(Debug)]
pub struct CombineMetrics {
    files_discovered: u64,
    files_combined: u64,
    files_failed: u64,
    records_emitted: u64,
    records_without_chain: u64,
    records_without_address: u64,
    records_per_chain: BTreeMap<u64, u64>,
    seen_chain_addresses: HashSet<(u64, String)>,
    duplicate_chain_addresses: u64,
    start_time: Instant,
}

impl CombineMetrics {
    pub fn new() -> Self {
        Self {
            files_discovered: 0,
            files_combined: 0,
            files_failed: 0,
            records_emitted: 0,
            records_without_chain: 0,
            records_without_address: 0,
            records_per_chain: BTreeMap::new(),
            seen_chain_addresses: HashSet::new(),
            duplicate_chain_addresses: 0,
            start_time: Instant::now(),
        }
    }

    pub fn increment_discovered(&mut self) {
        self.files_discovered += 1;
    }

    pub fn increment_failed(&mut self) {
        self.files_failed += 1;
    }

    /// Account for a successfully processed file's records.
    pub fn record_file(&mut self, records: &[EnrichedRecord]) {
        self.files_combined += 1;

        for record in records {
            self.records_emitted += 1;

            let address = record.address();
            if address.is_none() {
                self.records_without_address += 1;
            }

            let Some(chain_id) = record.chain_id else {
                self.records_without_chain += 1;
                continue;
            };
            *self.records_per_chain.entry(chain_id).or_insert(0) += 1;

            if let Some(address) = address {
                // addresses are hex; 0xABC and 0xabc are the same account
                let key = (chain_id, address.to_lowercase());
                if !self.seen_chain_addresses.insert(key) {
                    self.duplicate_chain_addresses += 1;
                }
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_discovered: self.files_discovered,
            files_combined: self.files_combined,
            files_failed: self.files_failed,
            records_emitted: self.records_emitted,
            records_without_chain: self.records_without_chain,
            records_without_address: self.records_without_address,
            records_per_chain: self.records_per_chain.clone(),
            duplicate_chain_addresses: self.duplicate_chain_addresses,
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }
}

impl Default for CombineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
