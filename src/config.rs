// =============================================================================
// config.rs — KNOBS
// =============================================================================
//
// Everything is an ANYSCAN_* environment variable with a default that works
// out of the box next to the scrapers' data/ directory. A .env file is
// honoured if one exists. Command-line flags (see cli.rs) are layered on top.
//
// A value that doesn't parse is not fatal: we fall back to the default and
// remember the complaint, which main logs once tracing is up.
// =============================================================================

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::export::OutputFormat;
use crate::models::FailurePolicy;

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Runtime configuration for one combine.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the scraped data tree.
    /// Default: data
    pub data_dir: PathBuf,

    /// Where the dataset goes. None = stdout.
    pub output: Option<PathBuf>,

    /// `records` (enriched, nothing dropped) or `rows` (accounts table shape).
    pub output_format: OutputFormat,

    /// Pretty-print JSON output. Default: true
    pub pretty: bool,

    /// `fail-fast` or `isolate`.
    pub failure_policy: FailurePolicy,

    /// Optional path for the JSON run report.
    pub report_path: Option<PathBuf>,

    /// Default tracing filter when RUST_LOG is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Settings that were present but unparseable, as human-readable notes.
    pub rejected: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output: None,
            output_format: OutputFormat::default(),
            pretty: true,
            failure_policy: FailurePolicy::default(),
            report_path: None,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            rejected: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment (after `.env`).
    pub fn from_env() -> Self {
        // no .env is perfectly fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. `from_env` is this over
    /// `std::env`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let mut rejected = Vec::new();

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let output_format = parse_setting(&lookup, "ANYSCAN_OUTPUT_FORMAT", defaults.output_format, &mut rejected);
        let pretty = match non_empty("ANYSCAN_PRETTY") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                rejected.push(format!("ANYSCAN_PRETTY={raw} is not a boolean, using {}", defaults.pretty));
                defaults.pretty
            }),
            None => defaults.pretty,
        };
        let failure_policy =
            parse_setting(&lookup, "ANYSCAN_FAILURE_POLICY", defaults.failure_policy, &mut rejected);
        let log_format = parse_setting(&lookup, "ANYSCAN_LOG_FORMAT", defaults.log_format, &mut rejected);

        Config {
            data_dir: non_empty("ANYSCAN_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            output: non_empty("ANYSCAN_OUTPUT").map(PathBuf::from),
            output_format,
            pretty,
            failure_policy,
            report_path: non_empty("ANYSCAN_REPORT").map(PathBuf::from),
            log_level: non_empty("ANYSCAN_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            rejected,
        }
    }
}

/// Parse `key` with `FromStr`, falling back to `default` and noting why.
fn parse_setting<T, F>(lookup: &F, key: &str, default: T, rejected: &mut Vec<String>) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            rejected.push(format!("{key}: {e}, using {default}"));
            default
        }),
        None => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
