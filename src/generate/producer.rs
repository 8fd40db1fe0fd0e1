use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::constants::{MAX_RANDOM_NUMBER, MIN_TEXT_LENGTH, REUSE_ONE_IN};
use crate::error::Result;
use crate::generate::GenerateConfig;
use crate::record::Record;

/// Decides whether the next slot reuses the text of an already generated
/// record. Receives the number of records generated so far in the batch and
/// returns the index to reuse, or `None` for a fresh record.
pub type ReusePolicy = fn(&mut SmallRng, usize) -> Option<usize>;

/// Roughly one record in 500 repeats the text of the most recent one.
pub fn default_reuse_policy(rng: &mut SmallRng, count: usize) -> Option<usize> {
    if count > 0 && rng.gen_ratio(1, REUSE_ONE_IN) {
        Some(count - 1)
    } else {
        None
    }
}

/// One producer task: fills batches from a reusable scratch buffer and sends
/// right-sized copies into the channel until cancelled or the channel closes.
pub(crate) async fn run_producer(
    id: usize,
    tx: mpsc::Sender<Vec<Record>>,
    cancel: Arc<AtomicBool>,
    config: GenerateConfig,
    reuse: ReusePolicy,
) -> Result<u64> {
    let mut rng = SmallRng::from_entropy();
    let mut scratch: Vec<Record> = Vec::with_capacity(config.lines_per_batch);
    let mut batches_sent = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        scratch.clear();
        while scratch.len() < config.lines_per_batch {
            if cancel.load(Ordering::Relaxed) {
                break; // a partial batch is still worth sending
            }

            let record = match reuse(&mut rng, scratch.len()) {
                Some(index) if index < scratch.len() => {
                    let text = scratch[index].text.clone();
                    Record::new(random_number(&mut rng), text)
                }
                _ => random_record(&mut rng, config.max_text_length),
            };
            scratch.push(record);
        }

        if scratch.is_empty() {
            break;
        }

        // The copy is sized to its contents; the scratch keeps its capacity
        // and is ready again before the send suspends.
        let batch = scratch.clone();
        if tx.send(batch).await.is_err() {
            break; // writer side gone
        }
        batches_sent += 1;

        tokio::task::yield_now().await;
    }

    debug!("producer {} sent {} batches", id, batches_sent);
    Ok(batches_sent)
}

fn random_record(rng: &mut SmallRng, max_text_length: usize) -> Record {
    let length = rng.gen_range(MIN_TEXT_LENGTH..=max_text_length);
    let text: String = (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    Record::new(random_number(rng), text)
}

fn random_number(rng: &mut SmallRng) -> i64 {
    rng.gen_range(1..=MAX_RANDOM_NUMBER)
}
