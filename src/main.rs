//  █████╗ ███╗   ██╗██╗   ██╗███████╗ ██████╗ █████╗ ███╗   ██╗
// ██╔══██╗████╗  ██║╚██╗ ██╔╝██╔════╝██╔════╝██╔══██╗████╗  ██║
// ███████║██╔██╗ ██║ ╚████╔╝ ███████╗██║     ███████║██╔██╗ ██║
// ██╔══██║██║╚██╗██║  ╚██╔╝  ╚════██║██║     ██╔══██║██║╚██╗██║
// ██║  ██║██║ ╚████║   ██║   ███████║╚██████╗██║  ██║██║ ╚████║
// ╚═╝  ╚═╝╚═╝  ╚═══╝   ╚═╝   ╚══════╝ ╚═════╝╚═╝  ╚═╝╚═╝  ╚═══╝
//
// L A B E L S
//
// Every explorer scrape, one dataset, every row tagged with its chain.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use anyscan_labels::chains;
use anyscan_labels::cli::Cli;
use anyscan_labels::combiner::Combiner;
use anyscan_labels::config::{Config, LogFormat};
use anyscan_labels::export;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // stdout belongs to the dataset; logs go to stderr
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_ansi(true).init(),
    }
}

fn print_chain_table() {
    println!("{:<12} {:>8}", "explorer", "chain id");
    for (explorer, chain_id) in chains::known_explorers() {
        println!("{:<12} {:>8}", explorer, chain_id);
    }
}

fn run(config: &Config) -> Result<()> {
    info!(
        data_dir = %config.data_dir.display(),
        format = %config.output_format,
        policy = %config.failure_policy,
        "🔗 anyscan label combiner starting"
    );

    let dataset = Combiner::new(&config.data_dir)
        .with_policy(config.failure_policy)
        .combine()
        .with_context(|| format!("failed to combine accounts under {}", config.data_dir.display()))?;

    if let Some(report_path) = &config.report_path {
        export::write_report(report_path, &dataset.report)?;
    }

    export::write_dataset_to(
        config.output.as_deref(),
        &dataset.records,
        config.output_format,
        config.pretty,
    )?;

    let failed = dataset.report.metrics.files_failed;
    if failed > 0 {
        error!(
            failed = failed,
            combined = dataset.report.metrics.files_combined,
            "Some accounts files were skipped — see the warnings above or the run report"
        );
    }

    debug!(run_id = %dataset.report.run_id, "Done");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    cli.apply(&mut config);

    if cli.list_chains {
        print_chain_table();
        return ExitCode::SUCCESS;
    }

    init_tracing(&config);
    for note in &config.rejected {
        warn!("Ignoring bad setting: {}", note);
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
