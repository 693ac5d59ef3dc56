use rst_common::with_logging::log::{debug, info, warn};

use crate::codec::{messagize, Attachment, Serder};

use super::types::{Postage, PostageRepoBuilder, RelayError, TransportBuilder};

/// `Poster` relays signed messages to other agents
///
/// Sending only queues, delivery happens in [`Poster::process`]. A failed
/// delivery looks the same as a slow one, the postage simply stays pending.
#[derive(Clone)]
pub struct Poster<TRepo, TTransport>
where
    TRepo: PostageRepoBuilder,
    TTransport: TransportBuilder,
{
    repo: TRepo,
    transport: TTransport,
}

impl<TRepo, TTransport> Poster<TRepo, TTransport>
where
    TRepo: PostageRepoBuilder,
    TTransport: TransportBuilder,
{
    pub fn new(repo: TRepo, transport: TTransport) -> Self {
        Self { repo, transport }
    }

    pub async fn send(
        &self,
        src: &str,
        dest: &str,
        topic: &str,
        serder: &Serder,
        attachment: &Attachment,
    ) -> Result<Postage, RelayError> {
        let said = serder.require_said()?;
        let message = messagize(serder, attachment)?;
        let postage = Postage::new(&said, src, dest, topic, message);

        self.repo.save_postage(&postage).await?;
        debug!("[poster:send] said: {said} | src: {src} | dest: {dest} | topic: {topic}");
        Ok(postage)
    }

    /// Try to deliver every pending postage once, returns how many got delivered
    pub async fn process(&self) -> Result<usize, RelayError> {
        let postages = self.repo.list_postages().await?;

        let mut delivered = 0;
        for mut postage in postages.into_iter().filter(|postage| !postage.delivered) {
            match self.transport.deliver(&postage).await {
                Ok(_) => {
                    postage.delivered = true;
                    self.repo.save_postage(&postage).await?;
                    delivered += 1;

                    info!(
                        "[poster:process] delivered: {} | dest: {}",
                        postage.said, postage.dest
                    );
                }
                Err(err) => {
                    warn!(
                        "[poster:process] delivery failed: {} | dest: {} | error: {err}",
                        postage.said, postage.dest
                    );
                }
            }
        }

        Ok(delivered)
    }

    /// Whether a postage of `said` to `dest` was ever queued, delivered or not
    pub async fn queued(&self, said: &str, dest: &str) -> Result<bool, RelayError> {
        let postages = self.repo.postages_by_said(said).await?;
        Ok(postages.iter().any(|postage| postage.dest == dest))
    }

    /// True once at least one postage exists for `said` and all of them are delivered
    pub async fn sent(&self, said: &str) -> Result<bool, RelayError> {
        let postages = self.repo.postages_by_said(said).await?;
        Ok(!postages.is_empty() && postages.iter().all(|postage| postage.delivered))
    }
}
