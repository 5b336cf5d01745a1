//! Elemental Duel core - ledger, clock and storage primitives
//!
//! This library provides the collaborator interfaces a duel engine settles
//! against (mana ledger, token ownership, ranking points, rewards), an
//! injectable time source, and SQLite persistence for duel records.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod storage;
pub mod types;

pub use clock::{ManualClock, SystemClock, TimeSource};
pub use error::{CoreError, Result};
pub use ledger::Gateway;
pub use memory::MemoryLedger;
pub use storage::{DuelStore, Storage, StoredDuel};
pub use types::{AssetId, LedgerEvent, LedgerEventKind, Mana, PlayerId, TicketClass};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn stored(state: &str) -> StoredDuel {
        StoredDuel {
            id: Uuid::new_v4(),
            state: state.to_string(),
            starter: "alice".to_string(),
            opponent: None,
            record: "{}".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duel_store_roundtrip_on_disk() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("duels.db");

        let duel = stored("AwaitingOpponent");
        {
            let storage = Storage::new(&db_path).await.unwrap();
            DuelStore::new(&storage).save_duel(&duel).await.unwrap();
        }

        let storage = Storage::new(&db_path).await.unwrap();
        let store = DuelStore::new(&storage);
        let loaded = store.load_duels().await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, duel.id);
        assert_eq!(loaded[0].starter, "alice");
        assert_eq!(loaded[0].opponent, None);
        assert_eq!(loaded[0].updated_at.timestamp(), duel.updated_at.timestamp());
    }

    #[tokio::test]
    async fn test_duel_store_replace_and_delete() {
        let storage = Storage::in_memory().await.unwrap();
        let store = DuelStore::new(&storage);

        let mut duel = stored("AwaitingOpponent");
        store.save_duel(&duel).await.unwrap();

        duel.state = "AwaitingReveals".to_string();
        duel.opponent = Some("bob".to_string());
        store.save_duel(&duel).await.unwrap();

        let loaded = store.load_duels().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].state, "AwaitingReveals");
        assert_eq!(loaded[0].opponent.as_deref(), Some("bob"));

        store.delete_duel(duel.id).await.unwrap();
        assert!(store.load_duels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_reports_unusable_directory() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Storage::new(&blocker.join("duels.db")).await;
        assert!(matches!(result, Err(CoreError::Io(_))));
    }
}
