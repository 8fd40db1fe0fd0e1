use bytes::{BufMut, BytesMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::info;

use crate::constants::{BYTES_PER_MB, PROGRESS_STEPS};
use crate::error::{Error, Result};
use crate::generate::{GenerateConfig, GenerateStats};
use crate::record::Record;
use crate::utils::format_bytes;

/// Single consumer: drains batches in receive order and writes them to disk
/// until the target size is reached, then trips the shared cancellation flag
/// so the producers stop.
pub(crate) async fn run_writer(
    mut rx: mpsc::Receiver<Vec<Record>>,
    path: PathBuf,
    config: GenerateConfig,
    cancel: Arc<AtomicBool>,
) -> Result<GenerateStats> {
    let result = drain_batches(&mut rx, &path, &config, &cancel).await;

    // Producers must stop no matter how the writer exits.
    cancel.store(true, Ordering::Relaxed);

    result
}

async fn drain_batches(
    rx: &mut mpsc::Receiver<Vec<Record>>,
    path: &std::path::Path,
    config: &GenerateConfig,
    cancel: &AtomicBool,
) -> Result<GenerateStats> {
    if config.target_bytes == 0 {
        return Err(Error::InvalidArgument(
            "target size must be positive".to_string(),
        ));
    }

    let file = File::create(path).await?;
    let mut writer = BufWriter::with_capacity(config.io_buffer_size_bytes(), file);

    let progress_interval = (config.target_bytes / PROGRESS_STEPS).max(BYTES_PER_MB as u64);
    let mut next_progress = progress_interval;

    let mut stats = GenerateStats::default();
    let mut encode_buf = BytesMut::new();
    let mut target_reached = false;

    while let Some(batch) = rx.recv().await {
        encode_buf.clear();

        for record in &batch {
            encode_buf.extend_from_slice(record.raw.as_bytes());
            encode_buf.put_u8(b'\n');
            stats.records_written += 1;

            // Cut off at the first line that carries the file past the
            // target; the rest of the batch is dropped.
            if stats.bytes_written + encode_buf.len() as u64 >= config.target_bytes {
                target_reached = true;
                break;
            }
        }

        writer.write_all(&encode_buf).await?;
        stats.bytes_written += encode_buf.len() as u64;
        stats.batches_written += 1;

        if stats.bytes_written >= next_progress {
            info!(
                "generated {} of {}",
                format_bytes(stats.bytes_written),
                format_bytes(config.target_bytes)
            );
            while next_progress <= stats.bytes_written {
                next_progress += progress_interval;
            }
        }

        if target_reached {
            cancel.store(true, Ordering::Relaxed);
            break;
        }
    }

    writer.flush().await?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_config(target_bytes: u64) -> GenerateConfig {
        GenerateConfig {
            target_bytes,
            lines_per_batch: 10,
            channel_capacity: 4,
            producer_count: 1,
            ..Default::default()
        }
    }

    fn batch_of(records: &[(i64, &str)]) -> Vec<Record> {
        records
            .iter()
            .map(|(number, text)| Record::new(*number, text.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_rejects_zero_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let (_tx, rx) = mpsc::channel::<Vec<Record>>(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let result = run_writer(rx, path, small_config(0), cancel.clone()).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(cancel.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_stops_at_target_and_signals_cancel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let (tx, rx) = mpsc::channel(8);
        let cancel = Arc::new(AtomicBool::new(false));

        let target = 32u64;
        let writer = tokio::spawn(run_writer(rx, path.clone(), small_config(target), cancel.clone()));

        // Each "1. aaaa" line is 8 bytes on disk.
        loop {
            let batch = batch_of(&[(1, "aaaa"), (1, "aaaa"), (1, "aaaa")]);
            if tx.send(batch).await.is_err() {
                break;
            }
            tokio::task::yield_now().await;
        }
        drop(tx);

        let stats = writer.await.unwrap().unwrap();
        assert!(cancel.load(Ordering::Relaxed));

        let size = std::fs::metadata(&path).unwrap().len();
        assert_eq!(size, stats.bytes_written);
        assert!(size >= target);
        assert!(size < target + 8); // within one line of the target
    }

    #[tokio::test]
    async fn test_writes_batches_in_receive_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let (tx, rx) = mpsc::channel(4);
        let cancel = Arc::new(AtomicBool::new(false));

        let writer = tokio::spawn(run_writer(
            rx,
            path.clone(),
            small_config(BYTES_PER_MB as u64),
            cancel,
        ));

        tx.send(batch_of(&[(2, "second"), (1, "first")])).await.unwrap();
        tx.send(batch_of(&[(3, "third")])).await.unwrap();
        drop(tx);

        let stats = writer.await.unwrap().unwrap();
        assert_eq!(stats.records_written, 3);
        assert_eq!(stats.batches_written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "2. second\n1. first\n3. third\n");
    }
}
