use crate::cli::ProcessArgs;
use crate::config::builder::build_config;
use crate::config::models::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use gnnprep::engine::deadline::CancellationToken;
use gnnprep::engine::progress::ProgressReporter;
use gnnprep::workflows::collection::ProcessReport;
use tracing::{info, warn};

pub async fn run(args: ProcessArgs, threads: Option<usize>) -> Result<()> {
    info!("Building run configuration from {:?}", &args.manifest);
    let AppConfig {
        collection,
        process,
    } = build_config(&args, threads)?;
    info!(
        queries = collection.len(),
        workers = process.worker_count,
        features = ?process.plan.names(),
        "Configuration resolved."
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the queries in flight...");
                cancel.cancel();
            }
        })
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Processing {} queries...", collection.len());
    info!("Invoking the query collection workflow...");

    let result =
        tokio::task::block_in_place(|| collection.process(&process, &reporter, &cancel));
    interrupt.abort();
    let report = result?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &ProcessReport) {
    if !report.failures.is_empty() {
        warn!("{} queries failed.", report.failures.len());
        println!("Warning: {} queries produced no graph:", report.failures.len());
        for failure in &report.failures {
            println!("  {} [{}]: {}", failure.id, failure.kind, failure.message);
        }
    }

    println!(
        "✓ {} graph(s) written to {} archive(s):",
        report.records_written,
        report.output_paths.len()
    );
    for path in &report.output_paths {
        println!("  {}", path.display());
    }
}
