// =============================================================================
// cli.rs — FLAGS FOR HUMANS
// =============================================================================
//
// The environment (config.rs) is the baseline; anything passed here wins.
// =============================================================================

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::export::OutputFormat;
use crate::models::FailurePolicy;

/// Combine scraped explorer account labels into one chain-tagged dataset.
#[derive(Debug, Parser)]
#[command(name = "anyscan_labels", version, about)]
pub struct Cli {
    /// Root of the scraped data tree [env: ANYSCAN_DATA_DIR]
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write the dataset here instead of stdout [env: ANYSCAN_OUTPUT]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// records | rows [env: ANYSCAN_OUTPUT_FORMAT]
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    /// Skip bad files and report them instead of aborting
    #[arg(long)]
    pub isolate_failures: bool,

    /// Write the JSON run report here [env: ANYSCAN_REPORT]
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Print the explorer → chain ID table and exit
    #[arg(long)]
    pub list_chains: bool,
}

impl Cli {
    /// Layer the flags that were actually given over `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(format) = self.format {
            config.output_format = format;
        }
        if self.compact {
            config.pretty = false;
        }
        if self.isolate_failures {
            config.failure_policy = FailurePolicy::Isolate;
        }
        if let Some(report) = &self.report {
            config.report_path = Some(report.clone());
        }
        if self.debug {
            config.log_level = "debug".to_string();
        }
    }
}
