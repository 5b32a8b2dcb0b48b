//! 订单与库存存储层
//!
//! 对话层眼里这是一个事务化的订单+库存存储：取单、改行项目、删行项目、
//! 预留/释放。失败都是类型化的 OrderError 值，不抛异常式控制流。

pub mod inventory;
pub mod models;
pub mod orders;

pub use inventory::{InventoryError, InventoryLedger, InventorySlot};
pub use models::{
    ColorRecord, EnrichedLineItem, EnrichedOrder, LineItemRecord, OrderRecord, OrderStatus,
    ProductRecord, SizeRecord, StatusHistoryEntry,
};
pub use orders::{LineItemSelector, ModifyLineItem, OrderError, OrderStore};
