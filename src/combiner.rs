// =============================================================================
// combiner.rs — THE WHOLE TREE, ONE DATASET
// =============================================================================
//
// Walk the data root, process every accounts.json, concatenate everything in
// walk order. That's it. That's the job.
//
// Failure handling comes in two flavours:
//
//   FailFast (default) — the first unreadable directory, unreadable file or
//                        bad JSON aborts the run. No partial dataset leaks out.
//   Isolate            — bad files and unreadable subdirectories become
//                        `FileOutcome::Failed` entries in the report and the
//                        walk keeps going. An unreadable ROOT is still fatal.
//
// Either way every run gets a report: a run id, timestamps, one outcome per
// file, and the metrics snapshot.
// =============================================================================

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::{CombineMetrics, MetricsSnapshot};
use crate::models::{EnrichedRecord, FailurePolicy, FileOutcome};
use crate::processor;
use crate::walker::AccountsWalker;

/// Everything that happened during one combine.
#[derive(Debug, Clone, Serialize)]
pub struct CombineReport {
    pub run_id: Uuid,
    pub root: PathBuf,
    pub policy: FailurePolicy,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<FileOutcome>,
    pub metrics: MetricsSnapshot,
}

impl CombineReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// The combined dataset and the report describing how it was built.
#[derive(Debug, Clone)]
pub struct CombinedDataset {
    pub records: Vec<EnrichedRecord>,
    pub report: CombineReport,
}

/// Combines every accounts.json under a root directory.
#[derive(Debug, Clone)]
pub struct Combiner {
    root: PathBuf,
    policy: FailurePolicy,
}

impl Combiner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the combine. Under `FailFast` any error is returned as-is and no
    /// records survive; under `Isolate` only an unreadable root is an error.
    pub fn combine(&self) -> Result<CombinedDataset> {
        let run_id = Uuid::new_v4();
        let span = info_span!("combine", run_id = %run_id);
        let _guard = span.enter();

        let started_at = Utc::now();
        info!(root = %self.root.display(), policy = %self.policy, "Combining accounts files");

        let walker = AccountsWalker::new(&self.root)?;
        let mut metrics = CombineMetrics::new();
        let mut outcomes = Vec::new();
        let mut records = Vec::new();

        for found in walker.walk() {
            let processed = found.and_then(|file| {
                metrics.increment_discovered();
                processor::process_file(&file).map(|processed| (file, processed))
            });

            match processed {
                Ok((file, processed)) => {
                    metrics.record_file(&processed.records);
                    outcomes.push(FileOutcome::Combined {
                        path: file.path,
                        label: processed.label,
                        chain_id: processed.chain_id,
                        records: processed.records.len(),
                    });
                    records.extend(processed.records);
                }
                Err(err) => match self.policy {
                    FailurePolicy::FailFast => {
                        // the caller reports it
                        debug!(path = %err.path().display(), error = %err, "Combine aborted");
                        return Err(err);
                    }
                    FailurePolicy::Isolate => {
                        warn!(path = %err.path().display(), error = %err, "Skipping failed path");
                        metrics.increment_failed();
                        outcomes.push(FileOutcome::Failed {
                            path: err.path().clone(),
                            reason: error_chain(&err),
                        });
                    }
                },
            }
        }

        let report = CombineReport {
            run_id,
            root: walker.root().to_path_buf(),
            policy: self.policy,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            metrics: metrics.snapshot(),
        };

        info!(
            files = report.metrics.files_combined,
            failed = report.metrics.files_failed,
            records = report.metrics.records_emitted,
            without_chain = report.metrics.records_without_chain,
            duplicates = report.metrics.duplicate_chain_addresses,
            elapsed_ms = report.metrics.elapsed_ms,
            "Combine finished"
        );

        Ok(CombinedDataset { records, report })
    }
}

/// Fail-fast combine of `root`, records only.
pub fn combine(root: impl AsRef<Path>) -> Result<Vec<EnrichedRecord>> {
    Combiner::new(root.as_ref())
        .combine()
        .map(|dataset| dataset.records)
}

/// "outer: inner: innermost" for the report.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CombineError;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// A small but realistic data tree: 2 + 1 + 3 + 1 records.
    fn sample_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "etherscan/0x-protocol/accounts.json",
            r#"[{"address":"0xabc","nameTag":"Foo"},{"address":"0xdef"}]"#,
        );
        write(dir.path(), "Basescan/aerodrome/accounts.json", r#"[{"address":"0x111","nameTag":"Aero"}]"#);
        write(
            dir.path(),
            "optimism/velodrome/accounts.json",
            r#"[{"address":"0x1"},{"address":"0x2"},{"address":"0x3"}]"#,
        );
        write(dir.path(), "unknownsite/some-label/accounts.json", r#"[{"address":"0xdef"}]"#);
        write(dir.path(), "etherscan/0x-protocol/raw.html", "<html></html>");
        dir
    }

    fn canonical(records: &[EnrichedRecord]) -> Vec<String> {
        let mut rows: Vec<String> = records
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect();
        rows.sort();
        rows
    }

    #[test]
    fn test_single_etherscan_file() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "etherscan/0x-protocol/accounts.json",
            r#"[{"address":"0xabc","nameTag":"Foo"}]"#,
        );

        let records = combine(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            serde_json::to_value(&records[0]).unwrap(),
            json!({"address": "0xabc", "nameTag": "Foo", "label": "0x-protocol", "chainId": 1})
        );
    }

    #[test]
    fn test_unknown_site_does_not_fail() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "unknownsite/some-label/accounts.json", r#"[{"address":"0xdef"}]"#);

        let records = combine(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "some-label");
        assert_eq!(records[0].chain_id, None);
        assert_eq!(records[0].address(), Some("0xdef"));
    }

    #[test]
    fn test_record_count_is_sum_of_array_lengths() {
        let dir = sample_tree();
        let records = combine(dir.path()).unwrap();
        assert_eq!(records.len(), 7);
    }

    #[test]
    fn test_labels_and_chains_follow_directories() {
        let dir = sample_tree();
        let records = combine(dir.path()).unwrap();

        let by_label: HashMap<&str, Vec<&EnrichedRecord>> =
            records.iter().fold(HashMap::new(), |mut acc, r| {
                acc.entry(r.label.as_str()).or_default().push(r);
                acc
            });

        assert_eq!(by_label["0x-protocol"].len(), 2);
        assert!(by_label["0x-protocol"].iter().all(|r| r.chain_id == Some(1)));
        assert!(by_label["aerodrome"].iter().all(|r| r.chain_id == Some(8453)));
        assert!(by_label["velodrome"].iter().all(|r| r.chain_id == Some(10)));
        assert!(by_label["some-label"].iter().all(|r| r.chain_id.is_none()));
    }

    #[test]
    fn test_records_from_one_file_stay_contiguous_and_ordered() {
        let dir = sample_tree();
        let records = combine(dir.path()).unwrap();

        let velodrome: Vec<(usize, &str)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.label == "velodrome")
            .map(|(i, r)| (i, r.address().unwrap()))
            .collect();
        assert_eq!(
            velodrome.iter().map(|(_, a)| *a).collect::<Vec<_>>(),
            vec!["0x1", "0x2", "0x3"]
        );
        assert_eq!(velodrome[2].0 - velodrome[0].0, 2);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "etherscan/aave/accounts.json", r#"[{"address":"0xabc"}]"#);
        write(dir.path(), "etherscan/lending/accounts.json", r#"[{"address":"0xabc"}]"#);

        let dataset = Combiner::new(dir.path()).combine().unwrap();
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.report.metrics.duplicate_chain_addresses, 1);
    }

    #[test]
    fn test_combine_is_idempotent() {
        let dir = sample_tree();
        let first = combine(dir.path()).unwrap();
        let second = combine(dir.path()).unwrap();
        assert_eq!(canonical(&first), canonical(&second));
    }

    #[test]
    fn test_invalid_json_fails_the_whole_combine() {
        let dir = sample_tree();
        write(dir.path(), "gnosis/broken/accounts.json", r#"[{"address": "0x9""#);

        let err = combine(dir.path()).unwrap_err();
        assert!(matches!(err, CombineError::Parse { .. }));
        assert!(err.path().ends_with("gnosis/broken/accounts.json"));
    }

    #[test]
    fn test_non_array_fails_the_whole_combine() {
        let dir = sample_tree();
        write(dir.path(), "celo/wrapped/accounts.json", r#"{"address":"0x9"}"#);

        let err = combine(dir.path()).unwrap_err();
        assert!(matches!(err, CombineError::NotAnArray { .. }));
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let err = combine(dir.path().join("data")).unwrap_err();
        assert!(matches!(err, CombineError::DirectoryRead { .. }));
    }

    #[test]
    fn test_missing_root_fails_even_when_isolating() {
        let dir = TempDir::new().unwrap();
        let err = Combiner::new(dir.path().join("data"))
            .with_policy(FailurePolicy::Isolate)
            .combine()
            .unwrap_err();
        assert!(matches!(err, CombineError::DirectoryRead { .. }));
    }

    #[test]
    fn test_isolate_skips_bad_files_and_reports_them() {
        let dir = sample_tree();
        write(dir.path(), "gnosis/broken/accounts.json", "not json at all");

        let dataset = Combiner::new(dir.path())
            .with_policy(FailurePolicy::Isolate)
            .combine()
            .unwrap();

        assert_eq!(dataset.records.len(), 7);
        assert!(dataset.report.has_failures());

        let failures: Vec<_> = dataset.report.failures().collect();
        assert_eq!(failures.len(), 1);
        match failures[0] {
            FileOutcome::Failed { path, reason } => {
                assert!(path.ends_with("gnosis/broken/accounts.json"));
                assert!(reason.starts_with("invalid JSON in"));
            }
            other => panic!("expected a failure, got {other:?}"),
        }

        let metrics = &dataset.report.metrics;
        assert_eq!(metrics.files_discovered, 5);
        assert_eq!(metrics.files_combined, 4);
        assert_eq!(metrics.files_failed, 1);
    }

    #[test]
    fn test_report_lists_every_combined_file() {
        let dir = sample_tree();
        let dataset = Combiner::new(dir.path()).combine().unwrap();
        let report = &dataset.report;

        assert_eq!(report.policy, FailurePolicy::FailFast);
        assert_eq!(report.outcomes.len(), 4);
        assert!(!report.has_failures());
        assert!(report.finished_at >= report.started_at);
        assert_eq!(report.metrics.records_emitted, 7);
        assert_eq!(report.metrics.records_without_chain, 1);

        let total: usize = report
            .outcomes
            .iter()
            .map(|o| match o {
                FileOutcome::Combined { records, .. } => *records,
                FileOutcome::Failed { .. } => 0,
            })
            .sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn test_file_directly_in_root_uses_root_name_and_no_chain() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("etherscan");
        write(&root, "accounts.json", r#"[{"address":"0x1"}]"#);
        write(&root, "aave/accounts.json", r#"[{"address":"0x2"}]"#);

        let records = combine(&root).unwrap();
        assert_eq!(records.len(), 2);

        let top = records.iter().find(|r| r.address() == Some("0x1")).unwrap();
        assert_eq!(top.label, "etherscan");
        assert_eq!(top.chain_id, None);

        // one level down, the root itself is the explorer directory
        let nested = records.iter().find(|r| r.address() == Some("0x2")).unwrap();
        assert_eq!(nested.label, "aave");
        assert_eq!(nested.chain_id, Some(1));
    }

    #[test]
    fn test_report_chain_matches_record_chain() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("Optimism");
        write(&root, "velodrome/accounts.json", r#"[{"address":"0x1"}]"#);

        let dataset = Combiner::new(&root).combine().unwrap();
        assert_eq!(dataset.records[0].chain_id, Some(10));
        match &dataset.report.outcomes[0] {
            FileOutcome::Combined { label, chain_id, .. } => {
                assert_eq!(label, "velodrome");
                assert_eq!(*chain_id, dataset.records[0].chain_id);
            }
            other => panic!("expected a combined file, got {other:?}"),
        }
    }

    /// Locks `etherscan/locked` and returns `None` when permissions are not
    /// enforced (running as root).
    #[cfg(unix)]
    fn tree_with_locked_dir() -> Option<TempDir> {
        use std::os::unix::fs::PermissionsExt;

        let dir = sample_tree();
        let locked = dir.path().join("etherscan/locked");
        write(&locked, "hidden/accounts.json", r#"[{"address":"0x9"}]"#);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            unlock(&dir);
            return None;
        }
        Some(dir)
    }

    #[cfg(unix)]
    fn unlock(dir: &TempDir) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir.path().join("etherscan/locked"), fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_fails_fast() {
        let Some(dir) = tree_with_locked_dir() else {
            return;
        };
        let result = combine(dir.path());
        unlock(&dir);

        let err = result.unwrap_err();
        assert!(matches!(err, CombineError::DirectoryRead { .. }));
        assert!(err.path().ends_with("etherscan/locked"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_isolated() {
        let Some(dir) = tree_with_locked_dir() else {
            return;
        };
        let result = Combiner::new(dir.path())
            .with_policy(FailurePolicy::Isolate)
            .combine();
        unlock(&dir);

        let dataset = result.unwrap();
        assert_eq!(dataset.records.len(), 7);
        let failures: Vec<_> = dataset.report.failures().collect();
        assert_eq!(failures.len(), 1);
        match failures[0] {
            FileOutcome::Failed { path, reason } => {
                assert!(path.ends_with("etherscan/locked"));
                assert!(reason.starts_with("failed to read directory"));
            }
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(dataset.report.metrics.files_failed, 1);
    }

    #[test]
    fn test_empty_tree_yields_empty_dataset() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("etherscan/empty")).unwrap();

        let dataset = Combiner::new(dir.path()).combine().unwrap();
        assert!(dataset.records.is_empty());
        assert!(dataset.report.outcomes.is_empty());
    }
}
