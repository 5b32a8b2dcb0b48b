//! 会话状态：每轮读入、改写、整体回存
//!
//! 状态机不是单个枚举，而是 pending_modification_status 与
//! policy_confirmation_status 两个标志的合取，每轮从持久化标志重新判定。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oracle::PendingModification;
use crate::policy::PolicyEvaluationResult;
use crate::store::EnrichedOrder;

/// 当前待确认修改的生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingModificationStatus {
    Pending,
    Executed,
    Cancelled,
}

/// 策略条件（额外费用/延期）的用户确认状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyConfirmationStatus {
    Pending,
    Accepted,
    Rejected,
}

/// 单个会话的检查点：SessionStore 独占持有，step 拿到副本改完交回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueState {
    pub order_id: Uuid,
    /// 最近一条用户原始消息
    #[serde(default)]
    pub last_message: String,
    /// 最近一次取单的快照
    #[serde(default)]
    pub order_details: Option<EnrichedOrder>,
    #[serde(default)]
    pub pending_modification: Option<PendingModification>,
    #[serde(default)]
    pub pending_modification_id: Option<String>,
    #[serde(default)]
    pub pending_modification_status: Option<PendingModificationStatus>,
    /// 仅在确认往返期间存活
    #[serde(default)]
    pub policy_evaluation: Option<PolicyEvaluationResult>,
    #[serde(default)]
    pub policy_confirmation_status: Option<PolicyConfirmationStatus>,
}

impl DialogueState {
    pub fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            last_message: String::new(),
            order_details: None,
            pending_modification: None,
            pending_modification_id: None,
            pending_modification_status: None,
            policy_evaluation: None,
            policy_confirmation_status: None,
        }
    }

    /// 清掉待确认修改并落终态；策略字段一并清空
    pub fn close_pending(&mut self, status: PendingModificationStatus) {
        self.pending_modification = None;
        self.pending_modification_status = Some(status);
        self.policy_evaluation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut state = DialogueState::new(Uuid::new_v4());
        state.last_message = "change it to 75".to_string();
        state.pending_modification_status = Some(PendingModificationStatus::Pending);

        let json = serde_json::to_string(&state).unwrap();
        let loaded: DialogueState = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.order_id, state.order_id);
        assert_eq!(
            loaded.pending_modification_status,
            Some(PendingModificationStatus::Pending)
        );
    }
}
