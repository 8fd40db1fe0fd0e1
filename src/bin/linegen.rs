use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use linesort::constants::{DEFAULT_OUTPUT_FILE_NAME, DEFAULT_TARGET_BYTES};
use linesort::generate::{GenerateConfig, Generator};
use linesort::utils;

#[derive(Parser)]
#[command(name = "linegen")]
#[command(about = "Generates synthetic '{number}. {text}' files for sort testing")]
struct Args {
    /// Output file
    #[arg(default_value = DEFAULT_OUTPUT_FILE_NAME)]
    output: PathBuf,

    /// Target file size in bytes
    #[arg(default_value_t = DEFAULT_TARGET_BYTES)]
    target_bytes: u64,

    /// Number of producer tasks (default: one per hardware thread)
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    utils::setup_logging(args.verbose)?;

    let mut config = GenerateConfig {
        target_bytes: args.target_bytes,
        ..Default::default()
    };
    if let Some(threads) = args.threads {
        config.producer_count = threads;
    }

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Cancellation requested, stopping... partial output stays in place");
            cancel_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    if args.verbose {
        println!(
            "🚀 Generating {} into {} with {} producers",
            utils::format_bytes(config.target_bytes),
            args.output.display(),
            config.producer_count
        );
    }

    let start_time = Instant::now();

    let generator = Generator::new(config)?.with_cancel_flag(cancel_flag);
    let stats = generator.run(&args.output).await?;

    let elapsed = start_time.elapsed().as_secs_f64();
    println!(
        "✨ Wrote {} ({} records, {} batches) to {}",
        utils::format_bytes(stats.bytes_written),
        stats.records_written,
        stats.batches_written,
        args.output.display()
    );
    println!(
        "⏱️ Total time: {} ({}/s)",
        utils::format_duration(elapsed),
        utils::format_bytes((stats.bytes_written as f64 / elapsed.max(f64::EPSILON)) as u64)
    );

    Ok(())
}
