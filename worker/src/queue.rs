use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// One message as handed over by the transport, identified by the receipt
/// needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub receipt: String,
    pub body: String,
}

/// Where inbound messages come from. The transport itself lives outside this
/// service; implementations only have to honor the contract that a message
/// stays available until it is acknowledged.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn receive(&self, max: usize) -> Result<Vec<QueueMessage>>;
    async fn acknowledge(&self, receipt: &str) -> Result<()>;
}

/// Spool-directory source: the transport drops one JSON file per message
/// into a directory; acknowledging removes the file. Unacknowledged
/// messages stay in place for inspection or redelivery.
pub struct SpoolDirSource {
    dir: PathBuf,
}

impl SpoolDirSource {
    pub fn new(dir: PathBuf) -> Self {
        SpoolDirSource { dir }
    }
}

#[async_trait]
impl MessageSource for SpoolDirSource {
    async fn receive(&self, max: usize) -> Result<Vec<QueueMessage>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("cannot read spool directory {}", self.dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        // Oldest first: publishers name files monotonically.
        names.sort();
        names.truncate(max);

        let mut messages = Vec::with_capacity(names.len());
        for name in names {
            let path = self.dir.join(&name);
            let body = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("cannot read message {}", path.display()))?;
            messages.push(QueueMessage {
                receipt: name,
                body,
            });
        }
        Ok(messages)
    }

    async fn acknowledge(&self, receipt: &str) -> Result<()> {
        let path = self.dir.join(receipt);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("cannot remove acknowledged message {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_stay_until_acknowledged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("001.json"), r#"{"a":1}"#).unwrap();
        std::fs::write(dir.path().join("002.json"), r#"{"b":2}"#).unwrap();
        std::fs::write(dir.path().join("ignore.txt"), "not a message").unwrap();

        let source = SpoolDirSource::new(dir.path().to_path_buf());
        let messages = source.receive(10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].receipt, "001.json");

        // Not acknowledged: still delivered on the next poll.
        let again = source.receive(10).await.unwrap();
        assert_eq!(again.len(), 2);

        source.acknowledge("001.json").await.unwrap();
        let remaining = source.receive(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].receipt, "002.json");
    }

    #[tokio::test]
    async fn receive_respects_the_batch_bound() {
        let dir = tempfile::tempdir().unwrap();
        for n in 0..5 {
            std::fs::write(dir.path().join(format!("{n:03}.json")), "{}").unwrap();
        }
        let source = SpoolDirSource::new(dir.path().to_path_buf());
        let messages = source.receive(3).await.unwrap();
        assert_eq!(messages.len(), 3);
    }
}
