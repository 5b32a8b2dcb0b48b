//! 策略层：订单生命周期内哪些变更被允许、附什么条件

pub mod oracle;
pub mod types;

pub use oracle::PolicyOracle;
pub use types::{ChangeType, PolicyDecision, PolicyEvaluationResult};
