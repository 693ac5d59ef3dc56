use rst_common::standard::async_trait::async_trait;

use prople_quorum_core::notification::{Notice, NoticeID, NotificationError, NotificationRepoBuilder};

use crate::db::record::{from_bytes, to_bytes};
use crate::db::{AppError, Runner};

const NOTICE_KEY_ID: &str = "notice";

fn repo_error(err: AppError) -> NotificationError {
    NotificationError::RepoError(err.to_string())
}

#[derive(Clone)]
pub struct NoticeRepository {
    db: Runner,
}

impl NoticeRepository {
    pub fn new(db: Runner) -> Self {
        Self { db }
    }

    fn key(id: &str) -> String {
        format!("{}:{}", NOTICE_KEY_ID, id)
    }
}

#[async_trait]
impl NotificationRepoBuilder for NoticeRepository {
    async fn save_notice(&self, notice: &Notice) -> Result<(), NotificationError> {
        let value = to_bytes(notice).map_err(repo_error)?;
        self.db
            .save(Self::key(notice.id.as_ref()), value)
            .await
            .map_err(repo_error)
    }

    /// Oldest first, notices created in the same instant keep their id order
    async fn list_notices(&self) -> Result<Vec<Notice>, NotificationError> {
        let entries = self
            .db
            .list(format!("{}:", NOTICE_KEY_ID))
            .await
            .map_err(repo_error)?;

        let mut notices = entries
            .iter()
            .map(|(_, value)| from_bytes::<Notice>(value))
            .collect::<Result<Vec<Notice>, AppError>>()
            .map_err(repo_error)?;

        notices.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(notices)
    }

    async fn get_notice(&self, id: &NoticeID) -> Result<Option<Notice>, NotificationError> {
        let value = self
            .db
            .get(Self::key(id.as_ref()))
            .await
            .map_err(repo_error)?;

        value
            .map(|bytes| from_bytes::<Notice>(&bytes))
            .transpose()
            .map_err(repo_error)
    }

    async fn remove_notice(&self, id: &NoticeID) -> Result<bool, NotificationError> {
        self.db
            .remove(Self::key(id.as_ref()))
            .await
            .map_err(repo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::{json, Value};
    use rst_common::with_tokio::tokio;

    use prople_quorum_core::codec::Ked;

    use crate::common::helpers::testdb::open_runner;

    fn notice(route: &str) -> Notice {
        let mut attrs = Ked::new();
        attrs.insert("r".to_string(), Value::from(route));
        attrs.insert("d".to_string(), json!("ESaid"));
        Notice::new(attrs)
    }

    #[tokio::test]
    async fn test_notices_listed_oldest_first() {
        let (_dir, db) = open_runner();
        let repo = NoticeRepository::new(db);

        let mut first = notice("/multisig/icp");
        first.created_at = "2024-01-01T00:00:00Z".parse().unwrap();
        let second = notice("/multisig/ixn");
        repo.save_notice(&second).await.unwrap();
        repo.save_notice(&first).await.unwrap();

        let notices = repo.list_notices().await.unwrap();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].id, first.id);
        assert_eq!(notices[1].route(), Some("/multisig/ixn"))
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_dir, db) = open_runner();
        let repo = NoticeRepository::new(db);

        let saved = notice("/multisig/rpy");
        repo.save_notice(&saved).await.unwrap();

        let loaded = repo.get_notice(&saved.id).await.unwrap();
        assert_eq!(loaded, Some(saved.clone()));

        assert!(repo.remove_notice(&saved.id).await.unwrap());
        assert!(!repo.remove_notice(&saved.id).await.unwrap());
        assert!(repo.get_notice(&saved.id).await.unwrap().is_none())
    }
}
