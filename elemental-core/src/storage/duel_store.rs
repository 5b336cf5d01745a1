use crate::error::{CoreError, Result};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted duel row. `record` holds the engine's serialized duel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDuel {
    pub id: Uuid,
    pub state: String,
    pub starter: String,
    pub opponent: Option<String>,
    pub record: String,
    pub updated_at: DateTime<Utc>,
}

pub struct DuelStore<'a> {
    storage: &'a Storage,
}

impl<'a> DuelStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_duel(&self, duel: &StoredDuel) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO duels (id, state, starter, opponent, record, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                duel.id.to_string(),
                duel.state,
                duel.starter,
                duel.opponent,
                duel.record,
                duel.updated_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    pub async fn load_duels(&self) -> Result<Vec<StoredDuel>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, state, starter, opponent, record, updated_at
             FROM duels ORDER BY updated_at ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let updated_at: i64 = row.get(5)?;
            Ok((
                id,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                updated_at,
            ))
        })?;

        let mut duels = Vec::new();
        for row in rows {
            let (id, state, starter, opponent, record, updated_at) = row?;
            let id = Uuid::parse_str(&id)
                .map_err(|e| CoreError::internal(format!("Corrupt duel id '{}': {}", id, e)))?;

            duels.push(StoredDuel {
                id,
                state,
                starter,
                opponent,
                record,
                updated_at: DateTime::from_timestamp(updated_at, 0).unwrap_or_else(Utc::now),
            });
        }

        Ok(duels)
    }

    pub async fn delete_duel(&self, id: Uuid) -> Result<()> {
        let conn = self.storage.get_connection().await;
        conn.execute("DELETE FROM duels WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }
}
