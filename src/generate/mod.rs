pub mod config;
pub mod producer;
pub mod writer;

pub use config::GenerateConfig;
pub use producer::{default_reuse_policy, ReusePolicy};

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::generate::producer::run_producer;
use crate::generate::writer::run_writer;
use crate::record::Record;

#[derive(Debug, Default, Clone)]
pub struct GenerateStats {
    pub bytes_written: u64,
    pub records_written: u64,
    pub batches_written: u64,
}

/// Drives the generation pipeline: N producer tasks feeding one writer task
/// through a bounded channel. The writer owns the stop condition; producers
/// observe it through the shared flag.
pub struct Generator {
    config: GenerateConfig,
    cancel_flag: Arc<AtomicBool>,
    reuse: ReusePolicy,
}

impl Generator {
    pub fn new(config: GenerateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            reuse: default_reuse_policy,
        })
    }

    pub fn with_cancel_flag(mut self, cancel_flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = cancel_flag;
        self
    }

    pub fn with_reuse_policy(mut self, reuse: ReusePolicy) -> Self {
        self.reuse = reuse;
        self
    }

    pub async fn run(&self, output: &Path) -> Result<GenerateStats> {
        let (tx, rx) = mpsc::channel::<Vec<Record>>(self.config.channel_capacity);

        let writer = tokio::spawn(run_writer(
            rx,
            output.to_path_buf(),
            self.config.clone(),
            self.cancel_flag.clone(),
        ));

        let mut producers = JoinSet::new();
        for id in 0..self.config.producer_count {
            producers.spawn(run_producer(
                id,
                tx.clone(),
                self.cancel_flag.clone(),
                self.config.clone(),
                self.reuse,
            ));
        }

        let mut producer_error: Option<Error> = None;
        while let Some(joined) = producers.join_next().await {
            match joined {
                Ok(Ok(_batches)) => {}
                Ok(Err(err)) => {
                    self.cancel_flag.store(true, Ordering::Relaxed);
                    producer_error.get_or_insert(err);
                }
                Err(join_err) => {
                    self.cancel_flag.store(true, Ordering::Relaxed);
                    producer_error
                        .get_or_insert(Error::Io(io::Error::new(io::ErrorKind::Other, join_err)));
                }
            }
        }

        // All producer senders are gone; dropping ours completes the channel
        // and lets the writer drain whatever is still in flight.
        drop(tx);

        let stats = writer
            .await
            .map_err(|join_err| Error::Io(io::Error::new(io::ErrorKind::Other, join_err)))??;

        if let Some(err) = producer_error {
            return Err(err);
        }

        Ok(stats)
    }
}

/// Generates a file with a one-shot pipeline.
pub async fn generate_file(output: &Path, config: GenerateConfig) -> Result<GenerateStats> {
    Generator::new(config)?.run(output).await
}
