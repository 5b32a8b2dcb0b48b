//! Agent 错误类型
//!
//! 仅覆盖无法转化为对话回复的系统级失败（配置、会话存储、未知会话）。
//! 领域校验失败（行项目不存在、库存不足等）见 store::OrderError，
//! 由状态机转为面向用户的解释文本，不会走到这里。

use thiserror::Error;

/// 回合服务层可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// 调用方引用了不存在的会话 ID
    #[error("Unknown session: {0}")]
    UnknownSession(String),
}
