use prople_quorum_core::confirm::Components;

use crate::db::Runner;
use crate::keeper::Keeper;
use crate::outbox::Outbox;
use crate::repositories::{
    ContactRepository, EscrowRepository, ExchangeRepository, NoticeRepository,
    PostageRepository, RegistryRepository, SchemaRepository,
};

/// Every durable collaborator of an agent, sharing one database
#[derive(Clone)]
pub struct Storage {
    keeper: Keeper,
    escrow: EscrowRepository,
    notices: NoticeRepository,
    postages: PostageRepository,
    outbox: Outbox,
    exchanges: ExchangeRepository,
    registries: RegistryRepository,
    schemas: SchemaRepository,
    contacts: ContactRepository,
}

impl Storage {
    pub fn new(db: Runner, passcode: &str) -> Self {
        Self {
            keeper: Keeper::new(db.clone(), passcode),
            escrow: EscrowRepository::new(db.clone()),
            notices: NoticeRepository::new(db.clone()),
            postages: PostageRepository::new(db.clone()),
            outbox: Outbox::new(db.clone()),
            exchanges: ExchangeRepository::new(db.clone()),
            registries: RegistryRepository::new(db.clone()),
            schemas: SchemaRepository::new(db.clone()),
            contacts: ContactRepository::new(db),
        }
    }

    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn contact_repo(&self) -> &ContactRepository {
        &self.contacts
    }

    pub fn schema_repo(&self) -> &SchemaRepository {
        &self.schemas
    }

    pub fn registry_repo(&self) -> &RegistryRepository {
        &self.registries
    }
}

impl Components for Storage {
    type Store = Keeper;
    type Escrow = EscrowRepository;
    type Notices = NoticeRepository;
    type Postages = PostageRepository;
    type Transport = Outbox;
    type Exchanges = ExchangeRepository;
    type Registries = RegistryRepository;
    type Schemas = SchemaRepository;
    type Contacts = ContactRepository;

    fn store(&self) -> Self::Store {
        self.keeper.clone()
    }

    fn escrow(&self) -> Self::Escrow {
        self.escrow.clone()
    }

    fn notices(&self) -> Self::Notices {
        self.notices.clone()
    }

    fn postages(&self) -> Self::Postages {
        self.postages.clone()
    }

    fn transport(&self) -> Self::Transport {
        self.outbox.clone()
    }

    fn exchanges(&self) -> Self::Exchanges {
        self.exchanges.clone()
    }

    fn registries(&self) -> Self::Registries {
        self.registries.clone()
    }

    fn schemas(&self) -> Self::Schemas {
        self.schemas.clone()
    }

    fn contacts(&self) -> Self::Contacts {
        self.contacts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    use prople_quorum_core::confirm::{
        ConfirmError, Confirmer, DecisionProvider, Inbound, Proposer, Summary,
    };
    use prople_quorum_core::escrow::{EscrowKey, Tracker};
    use prople_quorum_core::group::{
        cancellation, Counselor, GroupInits, Habery, HaberyBuilder, WaitPolicy, Waiter,
    };
    use prople_quorum_core::notification::{Notice, NotificationRepoBuilder};

    use crate::common::helpers::testdb::open_runner;

    #[derive(Clone)]
    struct Approve;

    #[async_trait]
    impl DecisionProvider for Approve {
        async fn approve(&self, _summary: &Summary) -> Result<bool, ConfirmError> {
            Ok(true)
        }

        async fn alias(&self, _prompt: &str) -> Result<String, ConfirmError> {
            Ok("team".to_string())
        }

        async fn registry_name(&self, _prompt: &str) -> Result<String, ConfirmError> {
            Err(ConfirmError::Decision("no registry expected".to_string()))
        }

        async fn discard(&self, _notice: &Notice) -> Result<bool, ConfirmError> {
            Ok(false)
        }

        async fn report(&self, _message: &str) {}
    }

    fn confirmer(storage: &Storage) -> Confirmer<Storage, Approve> {
        let (_handle, cancel) = cancellation();
        let policy = WaitPolicy {
            tick: Duration::from_millis(10),
            timeout: Some(Duration::from_secs(5)),
        };

        Confirmer::new(storage, Approve, Waiter::new(policy, cancel))
    }

    /// Hand every message waiting in the outbox of `from` over to `to`
    async fn forward(from: &Storage, to: &Storage, dest: &str) -> Vec<Notice> {
        let mut notices = Vec::new();
        for postage in from.outbox().pending(Some(dest)).await.unwrap() {
            let notice = Inbound::new(to).ingest(&postage.message).await.unwrap();
            notices.extend(notice);
            from.outbox().take(&postage).await.unwrap();
        }

        notices
    }

    #[tokio::test]
    async fn test_two_agents_complete_group_inception() {
        let (_dir_a, db_a) = open_runner();
        let (_dir_b, db_b) = open_runner();
        let alice = Storage::new(db_a, "alice-pass");
        let bob = Storage::new(db_b, "bob-pass");

        let alice_pre = alice.keeper().create_local("alice").await.unwrap().pre;
        let bob_pre = bob.keeper().create_local("bob").await.unwrap().pre;

        let alice_kel = alice.keeper().clone_pre_iter(&alice_pre).await.unwrap();
        let bob_kel = bob.keeper().clone_pre_iter(&bob_pre).await.unwrap();
        bob.keeper().import_kel(&alice_kel).await.unwrap();
        alice.keeper().import_kel(&bob_kel).await.unwrap();

        let smids = vec![alice_pre.clone(), bob_pre.clone()];
        let inits = GroupInits {
            isith: json!("2"),
            nsith: json!("2"),
            est_only: false,
            dnd: false,
            toad: 0,
            wits: Vec::new(),
            delpre: None,
        };

        let ghab = Proposer::new(&alice)
            .incept("team", &alice_pre, &smids, &smids, inits)
            .await
            .unwrap();

        let notices = forward(&alice, &bob, &bob_pre).await;
        assert_eq!(notices.len(), 1);

        let report = confirmer(&bob).run_once().await.unwrap();
        assert_eq!(report.completed, vec![notices[0].id.clone()]);
        assert!(bob.notices().list_notices().await.unwrap().is_empty());

        let state = bob.keeper().key_state(&ghab.pre).await.unwrap().unwrap();
        assert_eq!(state.sn, 0);
        assert_eq!(state.keys.len(), 2);

        let echoed = forward(&bob, &alice, &alice_pre).await;
        assert_eq!(echoed.len(), 1);

        let report = confirmer(&alice).run_once().await.unwrap();
        assert_eq!(report.completed, vec![echoed[0].id.clone()]);

        let counselor = Counselor::new(
            Habery::new(alice.store()),
            Tracker::new(alice.escrow()),
        );
        counselor.process().await.unwrap();
        assert!(counselor
            .complete(&EscrowKey::new(&ghab.pre, 0))
            .await
            .unwrap());

        let committed = alice.keeper().key_state(&ghab.pre).await.unwrap().unwrap();
        assert_eq!(committed.said, state.said)
    }
}
