//! 策略评估的输入输出类型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 可请求的订单变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    QuantityIncrease,
    QuantityDecrease,
    SizeChange,
    ColorChange,
    ArtworkChange,
    AddressChange,
    Cancellation,
    RemoveItem,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuantityIncrease => "quantity_increase",
            Self::QuantityDecrease => "quantity_decrease",
            Self::SizeChange => "size_change",
            Self::ColorChange => "color_change",
            Self::ArtworkChange => "artwork_change",
            Self::AddressChange => "address_change",
            Self::Cancellation => "cancellation",
            Self::RemoveItem => "remove_item",
        }
    }
}

/// 策略评估结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Allowed,
    Conditional,
    Denied,
}

/// 策略评估结果：decision 为 conditional 时附带费用/延期条件，denied 时附带原因
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    pub decision: PolicyDecision,
    pub change_type: String,
    pub order_status: String,
    #[serde(default)]
    pub cost_impact: Option<Decimal>,
    #[serde(default)]
    pub cost_description: Option<String>,
    #[serde(default)]
    pub delivery_impact_days: Option<i32>,
    #[serde(default)]
    pub delivery_description: Option<String>,
    #[serde(default)]
    pub denial_reason: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub escalate_to_support: bool,
}
