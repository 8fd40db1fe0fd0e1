use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use linesort::constants::*;
use linesort::sort::{SortConfig, SortProcessor};
use linesort::{utils, Error};

#[derive(Parser)]
#[command(name = "linesort")]
#[command(about = "Sorts huge '{number}. {text}' files with bounded memory via external merge sort")]
struct Args {
    /// File to sort
    input: PathBuf,

    /// Destination for the sorted output
    output: PathBuf,

    /// Directory for chunk files (default: a unique directory under the system temp dir)
    temp_dir: Option<PathBuf>,

    /// In-memory chunk budget in megabytes
    chunk_size_mb: Option<usize>,

    /// Configuration file; created with defaults when missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let wants_output = matches!(
                err.kind(),
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
            );
            let _ = err.print();
            return if wants_output {
                ExitCode::from(EXIT_SUCCESS)
            } else {
                ExitCode::from(EXIT_USAGE)
            };
        }
    };

    if let Err(err) = utils::setup_logging(args.verbose) {
        eprintln!("⚠️ Failed to set up logging: {}", err);
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("❌ {}", err);
            return ExitCode::from(EXIT_UNEXPECTED);
        }
    };

    if let Some(temp_dir) = &args.temp_dir {
        config.temp_directory = temp_dir.clone();
    }
    if let Some(chunk_size_mb) = args.chunk_size_mb {
        config.max_chunk_bytes = chunk_size_mb.saturating_mul(BYTES_PER_MB);
    }
    config.verbose |= args.verbose;

    // Cooperative SIGINT handling: first ctrl-c requests a graceful stop.
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Cancellation requested, stopping...");
            cancel_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    if config.verbose {
        println!("🚀 Sorting {} -> {}", args.input.display(), args.output.display());
        println!(
            "💾 Chunk budget: {}",
            utils::format_bytes(config.max_chunk_bytes as u64)
        );
        println!("📁 Temp directory: {}", config.temp_directory.display());
    }

    let start_time = Instant::now();

    let mut processor = match SortProcessor::new(config) {
        Ok(processor) => processor.with_cancel_flag(cancel_flag.clone()),
        Err(err) => {
            eprintln!("❌ {}", err);
            return ExitCode::from(EXIT_UNEXPECTED);
        }
    };

    match processor.sort(&args.input, &args.output).await {
        Ok(stats) => {
            if cancel_flag.load(Ordering::Relaxed) {
                println!("⚠️ Sort cancelled; partial output removed");
                return ExitCode::from(EXIT_CANCELLED);
            }

            println!(
                "✨ Sorted {} records into {}",
                stats.records_written,
                args.output.display()
            );
            if stats.invalid_lines > 0 {
                println!("⚠️ Skipped {} unparseable lines", stats.invalid_lines);
            }
            println!(
                "⏱️ Total time: {} ({} chunks)",
                utils::format_duration(start_time.elapsed().as_secs_f64()),
                stats.chunks_created
            );

            ExitCode::from(EXIT_SUCCESS)
        }
        Err(err @ Error::InputMissing(_)) => {
            eprintln!("❌ {}", err);
            ExitCode::from(EXIT_INPUT_MISSING)
        }
        Err(err @ Error::DiskFull(_)) => {
            eprintln!("❌ {}", err);
            eprintln!("💡 Free up space or point temp_dir at a larger volume");
            ExitCode::from(EXIT_IO_ERROR)
        }
        Err(err @ Error::Io(_)) => {
            eprintln!("❌ {}", err);
            ExitCode::from(EXIT_IO_ERROR)
        }
        Err(Error::Cancelled) => {
            println!("⚠️ Sort cancelled; partial output removed");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => {
            eprintln!("❌ {}", err);
            ExitCode::from(EXIT_UNEXPECTED)
        }
    }
}

fn load_config(args: &Args) -> linesort::Result<SortConfig> {
    let Some(path) = &args.config else {
        return Ok(SortConfig::default());
    };

    if path.exists() {
        SortConfig::from_file(path)
    } else {
        println!("Config file not found, creating default: {}", path.display());
        let config = SortConfig::default();
        config.to_file(path)?;
        Ok(config)
    }
}
