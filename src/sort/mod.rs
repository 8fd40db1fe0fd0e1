pub mod chunk;
pub mod config;
pub mod merger;
pub mod processor;


pub use chunk::{ChunkSplitter, SplitResult};
pub use config::SortConfig;
pub use merger::ChunkMerger;
pub use processor::SortProcessor;

use std::path::Path;

use crate::error::Result;

#[derive(Debug, Default, Clone)]
pub struct SortStats {
    pub lines_read: u64,
    pub records_sorted: u64,
    pub invalid_lines: u64,
    pub chunks_created: usize,
    pub records_written: u64,
}

/// Sorts `input` into `output` with a one-shot processor.
pub async fn sort_file(input: &Path, output: &Path, config: SortConfig) -> Result<SortStats> {
    let mut processor = SortProcessor::new(config)?;
    processor.sort(input, output).await
}
