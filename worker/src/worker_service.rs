use fleetinv_services::{IngestError, Outcome, UnitConfig, process_message};
use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::queue::{MessageSource, QueueMessage};

pub struct WorkerService {
    source: Box<dyn MessageSource>,
    db: DatabaseConnection,
    unit_config: UnitConfig,
    config: Config,
}

impl WorkerService {
    pub fn new(source: Box<dyn MessageSource>, db: DatabaseConnection, config: Config) -> Self {
        let unit_config = config.unit_config();
        Self {
            source,
            db,
            unit_config,
            config,
        }
    }

    pub async fn start(&self) {
        log::info!("Worker service starting with configuration:");
        log::info!("  - Poll interval: {:?}", self.config.poll_interval);
        log::info!("  - Receive batch: {}", self.config.receive_batch);
        log::info!("  - Spool directory: {}", self.config.spool_dir.display());
        log::info!("  - Scratch root: {}", self.config.scratch_root.display());
        log::info!("  - Excluded repos: {}", self.config.excluded_repos.len());

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match self.source.receive(self.config.receive_batch).await {
                Ok(messages) => {
                    if !messages.is_empty() {
                        log::debug!("received {} messages", messages.len());
                    }
                    for message in messages {
                        self.handle_message(message).await;
                    }
                }
                Err(err) => {
                    log::warn!("Failed to receive messages: {}", err);
                }
            }
        }
    }

    /// One message, end-to-end. Processed and dropped messages are
    /// acknowledged; a malformed message is left on the source for
    /// inspection.
    async fn handle_message(&self, message: QueueMessage) {
        match process_message(&self.db, &self.unit_config, &message.body).await {
            Ok(Outcome::Processed) => {
                log::info!("processed message {}", message.receipt);
                self.acknowledge(&message.receipt).await;
            }
            Ok(Outcome::Dropped) => {
                log::info!("dropped message {} (excluded repository)", message.receipt);
                self.acknowledge(&message.receipt).await;
            }
            Err(IngestError::Malformed(why)) => {
                log::error!(
                    "message {} is malformed, leaving it on the queue: {}",
                    message.receipt,
                    why
                );
            }
            Err(err) => {
                log::error!(
                    "message {} could not be finalized, leaving it on the queue: {}",
                    message.receipt,
                    err
                );
            }
        }
    }

    async fn acknowledge(&self, receipt: &str) {
        if let Err(err) = self.source.acknowledge(receipt).await {
            log::warn!("Failed to acknowledge message {}: {}", receipt, err);
        }
    }
}
