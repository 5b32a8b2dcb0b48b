//! 会话检查点存储抽象层
//!
//! 每轮开始 load、结束 save，整份覆盖，不做增量更新。
//! 会话状态在两轮之间只存在于这里（显式传值，无模块级可变单例）。

pub mod memory;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use crate::dialogue::DialogueState;
use crate::error::AgentError;

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取检查点；会话不存在时返回 None
    async fn load(&self, session_id: &str) -> Result<Option<DialogueState>, AgentError>;

    /// 整份覆盖写入检查点
    async fn save(&self, session_id: &str, state: &DialogueState) -> Result<(), AgentError>;
}

/// 创建会话存储
///
/// 提供了 db_path 时用 SQLite 持久化；打不开则告警并退回内存存储
pub fn create_session_store(db_path: Option<&Path>) -> Arc<dyn SessionStore> {
    if let Some(path) = db_path {
        match SqliteSessionStore::new(path) {
            Ok(store) => {
                tracing::info!("Using persistent session store: {:?}", path);
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("Failed to create persistent store, falling back to memory: {}", e);
            }
        }
    }

    tracing::info!("Using in-memory session store");
    Arc::new(MemorySessionStore::new())
}
