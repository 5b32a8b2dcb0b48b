//! 理解预言机的结构化输出契约
//!
//! LLM 输出先按这些 Schema 解析校验（parse, don't trust），不合法的值不会进入会话状态。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 顶层意图，对话状态机按此路由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    OrderInquiry,
    OrderChange,
    Confirmation,
    PolicyConfirmation,
    OffTopic,
    Unclear,
}

impl Intent {
    /// 裸 token 形式解析（分类提示词要求只输出 token）
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "ORDER_INQUIRY" => Self::OrderInquiry,
            "ORDER_CHANGE" => Self::OrderChange,
            "CONFIRMATION" => Self::Confirmation,
            "POLICY_CONFIRMATION" => Self::PolicyConfirmation,
            "OFF_TOPIC" => Self::OffTopic,
            "UNCLEAR" => Self::Unclear,
            _ => return None,
        })
    }
}

/// 意图分类的 JSON 输出形式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassificationOutput {
    pub intent: Intent,
}

/// 支持的订单修改动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModificationAction {
    Modify,
    RemoveItem,
    Unsupported,
}

fn default_action() -> ModificationAction {
    ModificationAction::Unsupported
}

/// 待确认的订单修改：抽取产生，确认纠正可覆写，拒绝/取消/执行后清除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PendingModification {
    #[serde(default = "default_action")]
    pub action: ModificationAction,
    /// 行项目 ID（可选；与三元组二选一定位）
    #[serde(default)]
    pub line_item_id: Option<String>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub size_name: String,
    #[serde(default)]
    pub color_name: String,
    #[serde(default)]
    pub current_quantity: Option<u32>,
    #[serde(default)]
    pub new_quantity: Option<u32>,
    #[serde(default)]
    pub new_size: Option<String>,
    #[serde(default)]
    pub new_color: Option<String>,
    /// action 为 unsupported 时的原因
    #[serde(default)]
    pub reason: Option<String>,
}

impl PendingModification {
    /// 构造期校验：非 unsupported 动作必须带齐定位字段；
    /// modify 至少一个 new_*，remove_item 不允许任何 new_*
    pub fn validate(&self) -> Result<(), String> {
        if self.action == ModificationAction::Unsupported {
            return Ok(());
        }

        if self.product_name.is_empty() {
            return Err("product_name is required for supported modifications".to_string());
        }
        if self.size_name.is_empty() {
            return Err("size_name is required for supported modifications".to_string());
        }
        if self.color_name.is_empty() {
            return Err("color_name is required for supported modifications".to_string());
        }

        match self.action {
            ModificationAction::Modify => {
                if self.new_quantity.is_none()
                    && self.new_size.is_none()
                    && self.new_color.is_none()
                {
                    return Err(
                        "At least one of new_quantity/new_size/new_color is required for modify"
                            .to_string(),
                    );
                }
            }
            ModificationAction::RemoveItem => {
                if self.new_quantity.is_some()
                    || self.new_size.is_some()
                    || self.new_color.is_some()
                {
                    return Err("remove_item must not include new_* fields".to_string());
                }
            }
            ModificationAction::Unsupported => {}
        }

        Ok(())
    }
}

/// 确认答复的四种解释
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationInterpretation {
    Confirmed,
    Rejected,
    Correction,
    Unclear,
}

/// 确认答复解释的结构化输出
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfirmationInterpretationOutput {
    pub interpretation: ConfirmationInterpretation,
    #[serde(default)]
    pub corrected_quantity: Option<u32>,
    #[serde(default)]
    pub corrected_size: Option<String>,
    #[serde(default)]
    pub corrected_color: Option<String>,
    /// 调试用的简短理由
    #[serde(default)]
    pub reasoning: String,
}

impl ConfirmationInterpretationOutput {
    /// 解析失败后的安全默认值
    pub fn unclear(reasoning: impl Into<String>) -> Self {
        Self {
            interpretation: ConfirmationInterpretation::Unclear,
            corrected_quantity: None,
            corrected_size: None,
            corrected_color: None,
            reasoning: reasoning.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_modify() -> PendingModification {
        PendingModification {
            action: ModificationAction::Modify,
            line_item_id: None,
            product_name: "Gildan T-Shirt".to_string(),
            size_name: "Small".to_string(),
            color_name: "Navy".to_string(),
            current_quantity: Some(50),
            new_quantity: Some(75),
            new_size: None,
            new_color: None,
            reason: None,
        }
    }

    #[test]
    fn test_modify_requires_new_field() {
        let mut m = base_modify();
        m.new_quantity = None;
        assert!(m.validate().is_err());
        m.new_size = Some("Large".to_string());
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_remove_item_forbids_new_fields() {
        let mut m = base_modify();
        m.action = ModificationAction::RemoveItem;
        assert!(m.validate().is_err());
        m.new_quantity = None;
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_missing_identifier_rejected() {
        let mut m = base_modify();
        m.color_name = String::new();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_unsupported_skips_checks() {
        let m = PendingModification {
            action: ModificationAction::Unsupported,
            line_item_id: None,
            product_name: String::new(),
            size_name: String::new(),
            color_name: String::new(),
            current_quantity: None,
            new_quantity: None,
            new_size: None,
            new_color: None,
            reason: Some("address change".to_string()),
        };
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_intent_token_roundtrip() {
        assert_eq!(Intent::from_token("ORDER_CHANGE"), Some(Intent::OrderChange));
        assert_eq!(Intent::from_token("order_change"), None);
    }
}
