use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;

use prople_quorum_core::relay::{Postage, RelayError, TransportBuilder};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const OUTBOX_KEY_ID: &str = "outbox";

fn transport_error(err: AppError) -> RelayError {
    RelayError::TransportError(err.to_string())
}

/// `Outbox` delivers postages into a local per recipient mailbox
///
/// Messages wait there until an operator or a forwarding process hands them
/// over to the recipient agent, then they are taken out.
#[derive(Clone)]
pub struct Outbox {
    db: Runner,
}

impl Outbox {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }

    fn key(postage: &Postage) -> String {
        format!(
            "{}:{}:{:020}:{}",
            OUTBOX_KEY_ID,
            postage.dest,
            postage.created_at.timestamp_micros(),
            postage.id
        )
    }

    /// Waiting postages for `dest`, or for every recipient, oldest first
    pub async fn pending(&self, dest: Option<&str>) -> Result<Vec<Postage>, RelayError> {
        let prefix = match dest {
            Some(dest) => format!("{}:{}:", OUTBOX_KEY_ID, dest),
            None => format!("{}:", OUTBOX_KEY_ID),
        };

        let entries = self.db.list(prefix).await.map_err(transport_error)?;
        let mut postages = entries
            .iter()
            .map(|(_, value)| from_bytes::<Postage>(value))
            .collect::<Result<Vec<Postage>, AppError>>()
            .map_err(transport_error)?;

        postages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(postages)
    }

    /// Remove a handed over postage, false when it was already taken
    pub async fn take(&self, postage: &Postage) -> Result<bool, RelayError> {
        self.db
            .remove(Self::key(postage))
            .await
            .map_err(transport_error)
    }
}

#[async_trait]
impl TransportBuilder for Outbox {
    async fn deliver(&self, postage: &Postage) -> Result<(), RelayError> {
        let value = to_bytes(postage).map_err(transport_error)?;
        self.db
            .save(Self::key(postage), value)
            .await
            .map_err(transport_error)?;

        debug!(
            "[outbox:deliver] dest: {} | topic: {} | said: {}",
            postage.dest, postage.topic, postage.said
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::common::helpers::testdb::open_runner;

    #[tokio::test]
    async fn test_pending_per_recipient() {
        let (_dir, db) = open_runner();
        let outbox = Outbox::new(db);

        let to_alice = Postage::new("ESaid", "EBob", "EAlice", "multisig", b"msg".to_vec());
        let to_carol = Postage::new("ESaid", "EBob", "ECarol", "multisig", b"msg".to_vec());
        outbox.deliver(&to_alice).await.unwrap();
        outbox.deliver(&to_carol).await.unwrap();

        assert_eq!(outbox.pending(None).await.unwrap().len(), 2);

        let waiting = outbox.pending(Some("EAlice")).await.unwrap();
        assert_eq!(waiting, vec![to_alice.clone()]);

        assert!(outbox.take(&to_alice).await.unwrap());
        assert!(!outbox.take(&to_alice).await.unwrap());
        assert!(outbox.pending(Some("EAlice")).await.unwrap().is_empty())
    }
}
