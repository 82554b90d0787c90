//! mf-ingest CLI
//!
//! Resumable single-partition ingestion for meterflow.

use clap::Parser;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    run::init_logging(args.log_level)?;

    let summary = run::execute(args).await?;

    // Machine-readable summary on stdout; human recap on stderr
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let stats = &summary.stats;
    eprintln!();
    eprintln!("Ingestion completed:");
    eprintln!("  Batches total:     {}", stats.batches_total);
    eprintln!("  Batches skipped:   {}", stats.batches_skipped);
    eprintln!("  Batches completed: {}", stats.batches_completed);
    eprintln!("  Batches empty:     {}", stats.batches_empty);
    eprintln!("  Batches failed:    {}", stats.batches_failed);
    eprintln!("  Rows written:      {}", stats.rows_written);
    eprintln!("  Paths dropped:     {}", stats.paths_dropped);
    if let Some(duration) = stats.duration() {
        let secs = duration.num_milliseconds() as f64 / 1000.0;
        eprintln!("  Duration:          {secs:.2}s");
    }

    // Failed batches stay pending; signal the caller to re-run
    if stats.batches_failed > 0 {
        std::process::exit(4);
    }

    Ok(())
}
