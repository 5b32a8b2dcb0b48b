//! Clerk - Rust B2B 订单客服智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **oracle**: 理解预言机（意图分类 / 修改请求抽取 / 确认答复解释）
//! - **policy**: 订单变更策略评估（规则文档 + LLM 判定）
//! - **store**: 订单与库存存储（行项目变更、预留/释放台账）
//! - **dialogue**: 多轮对话状态机（核心：确认 → 策略 → 执行）
//! - **session**: 会话检查点存储（内存 / SQLite）
//! - **service**: 回合服务（加载检查点 → step → 保存 → 应答）
//! - **prompts**: 系统提示词加载（文件覆盖 + 内置默认）

pub mod config;
pub mod dialogue;
pub mod error;
pub mod llm;
pub mod oracle;
pub mod policy;
pub mod prompts;
pub mod service;
pub mod session;
pub mod store;

pub use error::AgentError;
pub use service::{AgentService, TurnResponse};
