//! 内存会话存储（测试与单机 demo 用）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dialogue::DialogueState;
use crate::error::AgentError;
use crate::session::SessionStore;

/// 内存会话存储：HashMap + 读写锁
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, DialogueState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前会话数
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<DialogueState>, AgentError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, state: &DialogueState) -> Result<(), AgentError> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let store = MemorySessionStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemorySessionStore::new();
        let state = DialogueState::new(Uuid::new_v4());
        store.save("s1", &state).await.unwrap();
        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.order_id, state.order_id);
    }
}
