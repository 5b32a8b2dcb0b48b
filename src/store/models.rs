//! 订单域数据模型
//!
//! OrderRecord / LineItemRecord 是存储内部表示；EnrichedOrder 是对外视图，
//! 行项目已与产品、尺码、颜色名展开，可直接序列化进提示词上下文与会话检查点。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 订单生命周期状态；SHIPPED / CANCELLED / RETURNED 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Approved,
    InProduction,
    ReadyToShip,
    Shipped,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::InProduction => "IN_PRODUCTION",
            Self::ReadyToShip => "READY_TO_SHIP",
            Self::Shipped => "SHIPPED",
            Self::Cancelled => "CANCELLED",
            Self::Returned => "RETURNED",
        }
    }

    /// 终态订单的行项目不可再变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Shipped | Self::Cancelled | Self::Returned)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产品目录项
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub base_price: Decimal,
}

/// 尺码目录项
#[derive(Debug, Clone)]
pub struct SizeRecord {
    pub id: Uuid,
    pub name: String,
}

/// 颜色目录项
#[derive(Debug, Clone)]
pub struct ColorRecord {
    pub id: Uuid,
    pub name: String,
}

/// 状态流转记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// 订单记录（存储内部）
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub history: Vec<StatusHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 行项目记录（存储内部）
#[derive(Debug, Clone)]
pub struct LineItemRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub inventory_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// 对外订单视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedOrder {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub line_items: Vec<EnrichedLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnrichedOrder {
    /// 大小写不敏感地按 (产品, 尺码, 颜色) 三元组找行项目
    pub fn find_item_by_names(
        &self,
        product: &str,
        size: &str,
        color: &str,
    ) -> Option<&EnrichedLineItem> {
        self.line_items.iter().find(|item| {
            item.product_name.eq_ignore_ascii_case(product)
                && item.size.eq_ignore_ascii_case(size)
                && item.color.eq_ignore_ascii_case(color)
        })
    }
}

/// 对外行项目视图（已展开名称）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedLineItem {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub product_name: String,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}
