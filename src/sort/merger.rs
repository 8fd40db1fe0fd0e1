use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tracing::{debug, warn};

use crate::constants::{BYTES_PER_KB, MERGE_OUTPUT_BUFFER_SIZE_KB};
use crate::error::{Error, Result};
use crate::record::{strip_line_terminator, Record};

/// The next pending record of one chunk reader.
#[derive(Debug)]
struct MergeCursor {
    record: Record,
    reader_id: usize,
}

impl PartialEq for MergeCursor {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Eq for MergeCursor {}

impl PartialOrd for MergeCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record.cmp(&other.record)
    }
}

/// Streaming k-way merge of sorted chunk files via a min-heap of cursors.
pub struct ChunkMerger {
    io_buffer_size: usize,
}

impl ChunkMerger {
    pub fn new(io_buffer_size: usize) -> Self {
        Self { io_buffer_size }
    }

    /// Writes the merged contents of `chunk_paths` to `output`. Returns the
    /// number of records written. An empty path list produces an empty file.
    pub async fn merge(
        &self,
        chunk_paths: &[PathBuf],
        output: &Path,
        cancel: &AtomicBool,
    ) -> Result<u64> {
        let output_file = File::create(output)?;
        let mut writer = BufWriter::with_capacity(
            MERGE_OUTPUT_BUFFER_SIZE_KB * BYTES_PER_KB,
            output_file,
        );

        if chunk_paths.is_empty() {
            writer.flush()?;
            return Ok(0);
        }

        // Reader handles live in an indexed table; a closed cursor simply
        // releases its slot. Dropping the table closes whatever is still open
        // on any exit path.
        let mut readers: Vec<Option<BufReader<File>>> = Vec::with_capacity(chunk_paths.len());
        for path in chunk_paths {
            let file = File::open(path)?;
            readers.push(Some(BufReader::with_capacity(self.io_buffer_size, file)));
        }

        let mut heap: BinaryHeap<Reverse<MergeCursor>> =
            BinaryHeap::with_capacity(readers.len());

        for reader_id in 0..readers.len() {
            match advance_reader(&mut readers[reader_id], reader_id)? {
                Some(record) => heap.push(Reverse(MergeCursor { record, reader_id })),
                None => readers[reader_id] = None,
            }
        }

        let mut records_written = 0u64;

        while let Some(Reverse(cursor)) = heap.pop() {
            if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }

            writeln!(writer, "{}", cursor.record.raw)?;
            records_written += 1;

            let reader_id = cursor.reader_id;
            match advance_reader(&mut readers[reader_id], reader_id)? {
                Some(record) => heap.push(Reverse(MergeCursor { record, reader_id })),
                None => readers[reader_id] = None,
            }
        }

        writer.flush()?;
        debug!(
            chunks = chunk_paths.len(),
            records = records_written,
            "merge complete"
        );

        Ok(records_written)
    }
}

/// Reads the next line of one chunk reader. Returns `None` at EOF and on the
/// first line that fails to parse: chunks are written sorted, so a bad line
/// means the tail of that reader cannot be trusted and it is abandoned.
fn advance_reader(
    reader: &mut Option<BufReader<File>>,
    reader_id: usize,
) -> Result<Option<Record>> {
    let Some(reader) = reader.as_mut() else {
        return Ok(None);
    };

    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Ok(None),
        Ok(_) => {
            let stripped = strip_line_terminator(&line);
            match Record::parse(stripped) {
                Some(record) => Ok(Some(record)),
                None => {
                    warn!("chunk reader {} hit an unparseable line, dropping its tail", reader_id);
                    Ok(None)
                }
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
            warn!("chunk reader {} hit non-UTF-8 data, dropping its tail", reader_id);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
