use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::constants::{CHUNK_FILE_EXTENSION, CHUNK_FILE_PREFIX};
use crate::error::{Error, Result};
use crate::sort::chunk::ChunkSplitter;
use crate::sort::merger::ChunkMerger;
use crate::sort::{SortConfig, SortStats};

/// Orchestrates the two sort phases: split into sorted chunks, then k-way
/// merge into the output file. Temp files are owned by the processor for the
/// duration of the run and removed on every exit path.
pub struct SortProcessor {
    config: SortConfig,
    cancel_flag: Arc<AtomicBool>,
}

impl SortProcessor {
    pub fn new(config: SortConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_cancel_flag(mut self, cancel_flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = cancel_flag;
        self
    }

    pub async fn sort(&mut self, input: &Path, output: &Path) -> Result<SortStats> {
        if !input.exists() {
            return Err(Error::InputMissing(input.to_path_buf()));
        }

        validate_path_argument(output, "output path")?;
        validate_path_argument(&self.config.temp_directory, "temp directory")?;

        std::fs::create_dir_all(&self.config.temp_directory)?;

        let result = self.run_phases(input, output).await;
        self.cleanup();

        match result {
            Ok(stats) => Ok(stats),
            Err(Error::Cancelled) => {
                // Cancellation is not an error for the caller; a partial
                // output must not survive it.
                remove_output(output);
                Ok(SortStats::default())
            }
            Err(err) => Err(err),
        }
    }

    async fn run_phases(&self, input: &Path, output: &Path) -> Result<SortStats> {
        let splitter = ChunkSplitter::new(
            self.config.max_chunk_bytes,
            self.config.io_buffer_size_bytes(),
            self.config.temp_directory.clone(),
        );

        let split = splitter.split(input, &self.cancel_flag).await?;

        let mut stats = SortStats {
            lines_read: split.lines_read,
            records_sorted: split.records_parsed,
            invalid_lines: split.invalid_lines,
            chunks_created: split.chunk_paths.len(),
            records_written: 0,
        };

        if split.chunk_paths.is_empty() {
            // Nothing parsed; the contract is still an output file.
            drop(File::create(output)?);
            return Ok(stats);
        }

        let merger = ChunkMerger::new(self.config.io_buffer_size_bytes());
        stats.records_written = merger
            .merge(&split.chunk_paths, output, &self.cancel_flag)
            .await?;

        if self.cancelled() {
            return Err(Error::Cancelled);
        }

        Ok(stats)
    }

    fn cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Removes every `chunk_*.tmp` in the temp directory, then the directory
    /// itself when empty. Failures are logged, never propagated.
    fn cleanup(&self) {
        let temp_dir = &self.config.temp_directory;

        match std::fs::read_dir(temp_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if is_chunk_file(&entry.path()) {
                        if let Err(err) = std::fs::remove_file(entry.path()) {
                            warn!(
                                "failed to remove chunk file {}: {}",
                                entry.path().display(),
                                err
                            );
                        }
                    }
                }
            }
            Err(err) => {
                warn!("failed to scan temp directory {}: {}", temp_dir.display(), err);
                return;
            }
        }

        // Only succeeds when the directory is empty; anything else in it is
        // not ours to delete.
        let _ = std::fs::remove_dir(temp_dir);
    }
}

fn is_chunk_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(CHUNK_FILE_PREFIX) && name.ends_with(CHUNK_FILE_EXTENSION))
        .unwrap_or(false)
}

fn validate_path_argument(path: &Path, what: &str) -> Result<()> {
    let text = path.as_os_str().to_string_lossy();
    if text.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be blank", what)));
    }
    Ok(())
}

fn remove_output(output: &Path) {
    if output.exists() {
        if let Err(err) = std::fs::remove_file(output) {
            warn!("failed to remove partial output {}: {}", output.display(), err);
        }
    }
}
