//! SQLite 会话存储
//!
//! 每个会话一行，状态整体存 JSON 文本，INSERT OR REPLACE 整份覆盖。
//! 过期清理不在这层做，交给外部 TTL 策略。

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::dialogue::DialogueState;
use crate::error::AgentError;
use crate::session::SessionStore;

/// SQLite 会话存储：单连接 + 互斥锁
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                state      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<DialogueState>, AgentError> {
        let conn = self.conn.lock().expect("session db lock poisoned");
        let row: Option<String> = conn
            .query_row(
                "SELECT state FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AgentError::SessionStore(e.to_string()))?;

        match row {
            Some(json) => {
                let state = serde_json::from_str(&json)
                    .map_err(|e| AgentError::SessionStore(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session_id: &str, state: &DialogueState) -> Result<(), AgentError> {
        let json =
            serde_json::to_string(state).map_err(|e| AgentError::SessionStore(e.to_string()))?;
        let conn = self.conn.lock().expect("session db lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO sessions (session_id, state, updated_at) VALUES (?1, ?2, ?3)",
            params![session_id, json, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| AgentError::SessionStore(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::PendingModificationStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_roundtrip_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::new(dir.path().join("sessions.db")).unwrap();

        let mut state = DialogueState::new(Uuid::new_v4());
        store.save("s1", &state).await.unwrap();

        state.pending_modification_status = Some(PendingModificationStatus::Executed);
        store.save("s1", &state).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(
            loaded.pending_modification_status,
            Some(PendingModificationStatus::Executed)
        );
        assert!(store.load("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let order_id = Uuid::new_v4();
        {
            let store = SqliteSessionStore::new(&path).unwrap();
            store
                .save("s1", &DialogueState::new(order_id))
                .await
                .unwrap();
        }
        let store = SqliteSessionStore::new(&path).unwrap();
        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.order_id, order_id);
    }
}
