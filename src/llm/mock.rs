//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! MockLlmClient 固定回 UNCLEAR 意图，便于无 Key 时跑通对话循环；
//! ScriptedLlmClient 按脚本顺序出队应答，供状态机测试精确控制预言机输出。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// Mock 客户端：固定返回 UNCLEAR 意图 JSON
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        Ok(r#"{"intent": "UNCLEAR"}"#.to_string())
    }
}

/// 脚本化客户端：每次 complete 弹出队首应答；脚本耗尽时返回错误
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    /// 追加一条脚本应答
    pub fn push(&self, reply: impl Into<String>) {
        self.replies
            .lock()
            .expect("script queue poisoned")
            .push_back(reply.into());
    }

    /// 剩余未消费的脚本应答数
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("script queue poisoned").len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        self.replies
            .lock()
            .expect("script queue poisoned")
            .pop_front()
            .ok_or_else(|| "scripted replies exhausted".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_order() {
        let client = ScriptedLlmClient::new(["a", "b"]);
        assert_eq!(client.complete(&[]).await.unwrap(), "a");
        assert_eq!(client.complete(&[]).await.unwrap(), "b");
        assert!(client.complete(&[]).await.is_err());
    }
}
