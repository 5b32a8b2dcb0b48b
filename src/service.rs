//! 回合服务
//!
//! 对外的会话入口：每轮 load → step → save → 应答。
//! 每个会话一把异步互斥锁，保证同一会话最多一轮在途；
//! 不同会话互不阻塞。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dialogue::{DialogueState, DialogueStateMachine};
use crate::error::AgentError;
use crate::session::SessionStore;

/// 单轮 token 用量（按空白分词计数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TurnUsage {
    fn from_texts(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = prompt.split_whitespace().count() as u64;
        let completion_tokens = completion.split_whitespace().count() as u64;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// 单轮应答
#[derive(Debug, Clone)]
pub struct TurnResponse {
    pub session_id: String,
    pub response: String,
    pub usage: TurnUsage,
}

/// 回合服务：状态机 + 会话存储 + 每会话回合锁
pub struct AgentService {
    machine: DialogueStateMachine,
    sessions: Arc<dyn SessionStore>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentService {
    pub fn new(machine: DialogueStateMachine, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            machine,
            sessions,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// 处理一条入站消息
    ///
    /// 未提供会话 ID 时新建会话；提供了不存在的 ID 则报 UnknownSession。
    pub async fn handle(
        &self,
        message: &str,
        session_id: Option<&str>,
        order_id: Uuid,
    ) -> Result<TurnResponse, AgentError> {
        let (session_id, is_new) = match session_id {
            Some(id) => (id.to_string(), false),
            None => (format!("session-{}", Uuid::new_v4().simple()), true),
        };

        tracing::info!(
            "Processing message for session {}, order {}: {:.100}",
            session_id,
            order_id,
            message
        );

        let turn_lock = {
            let mut locks = self.turn_locks.lock().await;
            locks
                .entry(session_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _turn = turn_lock.lock().await;

        let mut state = match self.sessions.load(&session_id).await? {
            Some(state) => state,
            None if is_new => DialogueState::new(order_id),
            None => return Err(AgentError::UnknownSession(session_id)),
        };

        let response = self.machine.step(&mut state, message).await;
        self.sessions.save(&session_id, &state).await?;

        tracing::info!("Generated response: {:.100}", response);

        let usage = TurnUsage::from_texts(message, &response);
        Ok(TurnResponse {
            session_id,
            response,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_word_counts() {
        let usage = TurnUsage::from_texts("change it to 75", "Done! I've updated it.");
        assert_eq!(usage.prompt_tokens, 4);
        assert_eq!(usage.completion_tokens, 4);
        assert_eq!(usage.total_tokens, 8);
    }
}
