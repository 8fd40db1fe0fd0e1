use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::constants::{CHUNK_FILE_EXTENSION, CHUNK_FILE_PREFIX};
use crate::error::{Error, Result};
use crate::record::{strip_line_terminator, Record};

/// Outcome of the chunking phase.
#[derive(Debug, Default)]
pub struct SplitResult {
    /// Sorted chunk files in creation order.
    pub chunk_paths: Vec<PathBuf>,
    pub lines_read: u64,
    pub records_parsed: u64,
    pub invalid_lines: u64,
}

/// Streams the input line by line and flushes sorted chunks whenever the
/// in-memory estimate reaches the budget.
pub struct ChunkSplitter {
    max_chunk_bytes: usize,
    io_buffer_size: usize,
    temp_directory: PathBuf,
}

impl ChunkSplitter {
    pub fn new(max_chunk_bytes: usize, io_buffer_size: usize, temp_directory: PathBuf) -> Self {
        Self {
            max_chunk_bytes,
            io_buffer_size,
            temp_directory,
        }
    }

    pub async fn split(&self, input: &Path, cancel: &AtomicBool) -> Result<SplitResult> {
        let file = File::open(input)?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, file);

        let mut result = SplitResult::default();
        let mut chunk: Vec<Record> = Vec::new();
        let mut estimate = 0usize;
        let mut chunk_id = 0usize;
        let mut line = String::new();

        loop {
            if cancel.load(Ordering::Relaxed) {
                // The in-progress chunk is abandoned; flushed files stay on
                // disk for the orchestrator's cleanup.
                return Err(Error::Cancelled);
            }

            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break, // EOF
                Ok(_) => {
                    result.lines_read += 1;
                    let stripped = strip_line_terminator(&line);

                    match Record::parse(stripped) {
                        Some(record) => {
                            estimate += record.estimated_size();
                            chunk.push(record);
                            result.records_parsed += 1;

                            if estimate >= self.max_chunk_bytes {
                                let path = self.flush_chunk(chunk_id, &mut chunk, cancel)?;
                                result.chunk_paths.push(path);
                                chunk_id += 1;
                                estimate = 0;
                            }
                        }
                        None => {
                            result.invalid_lines += 1;
                            warn!("skipping unparseable line {}", result.lines_read);
                        }
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    // Not UTF-8; skip forward to the next newline and carry on.
                    result.lines_read += 1;
                    result.invalid_lines += 1;
                    warn!("skipping non-UTF-8 line {}", result.lines_read);
                    skip_to_newline(&mut reader)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !chunk.is_empty() {
            let path = self.flush_chunk(chunk_id, &mut chunk, cancel)?;
            result.chunk_paths.push(path);
        }

        debug!(
            chunks = result.chunk_paths.len(),
            records = result.records_parsed,
            invalid = result.invalid_lines,
            "chunking complete"
        );

        Ok(result)
    }

    /// Sorts the chunk and writes it to `chunk_{id}.tmp`. The vector is
    /// drained but keeps its capacity for the next chunk.
    fn flush_chunk(
        &self,
        chunk_id: usize,
        records: &mut Vec<Record>,
        cancel: &AtomicBool,
    ) -> Result<PathBuf> {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        records.par_sort();

        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let path = self.chunk_path(chunk_id);
        let file = File::create(&path)?;
        let mut writer = BufWriter::with_capacity(self.io_buffer_size, file);

        for record in records.drain(..) {
            writeln!(writer, "{}", record.raw)?;
        }

        writer.flush()?;
        debug!("flushed chunk {} to {}", chunk_id, path.display());

        Ok(path)
    }

    fn chunk_path(&self, chunk_id: usize) -> PathBuf {
        self.temp_directory.join(format!(
            "{}{}{}",
            CHUNK_FILE_PREFIX, chunk_id, CHUNK_FILE_EXTENSION
        ))
    }
}

fn skip_to_newline(reader: &mut BufReader<File>) -> Result<()> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read_exact(&mut byte) {
            Ok(_) => {
                if byte[0] == b'\n' {
                    return Ok(());
                }
            }
            Err(_) => return Ok(()), // EOF
        }
    }
}
