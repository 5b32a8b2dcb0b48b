//! 订单存储：行项目变更与移除
//!
//! 状态机确认通过后调用这里执行变更。所有失败以 OrderError 值返回，
//! 由对话层转成面向客户的解释文本；InvalidSize / InvalidColor 的 Display
//! 会枚举该产品可选项，可直接回给客户。
//!
//! 终态订单（SHIPPED / CANCELLED / RETURNED）在本层直接拒绝变更；
//! 其余状态的准入由 agent 层的策略预言机把关，这里不重复整张策略表。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::store::inventory::{InventoryError, InventoryLedger};
use crate::store::models::{
    ColorRecord, EnrichedLineItem, EnrichedOrder, LineItemRecord, OrderRecord, OrderStatus,
    ProductRecord, SizeRecord, StatusHistoryEntry,
};

/// 订单操作错误
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error(
        "Could not find line item matching criteria. line_item_id={line_item_id:?}, \
         product={product:?}, size={size:?}, color={color:?}"
    )]
    LineItemNotFound {
        line_item_id: Option<Uuid>,
        product: Option<String>,
        size: Option<String>,
        color: Option<String>,
    },

    #[error("Size '{requested}' is not available for this product. Available sizes: {available}")]
    InvalidSize { requested: String, available: String },

    #[error("Color '{requested}' is not available for this product. Available colors: {available}")]
    InvalidColor { requested: String, available: String },

    #[error("Insufficient inventory. Available: {available}, Requested: {requested}")]
    InsufficientInventory { available: u32, requested: u32 },

    #[error(
        "Cannot remove line item. Order must have at least {minimum} total items. \
         Remaining after removal: {remaining}"
    )]
    BelowMinimumQuantity { minimum: u32, remaining: u32 },

    #[error("Order must have at least {minimum} total items. Found: {found}")]
    OrderTooSmall { minimum: u32, found: u32 },

    #[error("No changes are possible for an order in {0} status")]
    ModificationNotAllowed(OrderStatus),

    #[error("store inconsistency: {0}")]
    Inconsistent(String),
}

impl From<InventoryError> for OrderError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::Insufficient {
                available,
                requested,
            } => Self::InsufficientInventory {
                available,
                requested,
            },
            InventoryError::SlotNotFound(id) => {
                Self::Inconsistent(format!("inventory slot {} missing", id))
            }
        }
    }
}

/// 行项目定位方式：ID 或 (产品, 尺码, 颜色) 三元组
#[derive(Debug, Clone)]
pub enum LineItemSelector {
    ById(Uuid),
    ByNames {
        product: String,
        size: String,
        color: String,
    },
}

/// 一次行项目修改请求；三个字段至少一个非空
#[derive(Debug, Clone, Default)]
pub struct ModifyLineItem {
    pub new_quantity: Option<u32>,
    pub new_size_name: Option<String>,
    pub new_color_name: Option<String>,
}

#[derive(Default)]
struct StoreInner {
    orders: HashMap<Uuid, OrderRecord>,
    line_items: HashMap<Uuid, LineItemRecord>,
}

/// 订单存储：目录（只读）+ 订单表 + 库存台账
pub struct OrderStore {
    ledger: Arc<InventoryLedger>,
    min_order_quantity: u32,
    products: HashMap<Uuid, ProductRecord>,
    sizes: HashMap<Uuid, SizeRecord>,
    colors: HashMap<Uuid, ColorRecord>,
    inner: Mutex<StoreInner>,
}

impl OrderStore {
    pub fn new(ledger: Arc<InventoryLedger>, min_order_quantity: u32) -> Self {
        Self {
            ledger,
            min_order_quantity,
            products: HashMap::new(),
            sizes: HashMap::new(),
            colors: HashMap::new(),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger> {
        &self.ledger
    }

    fn guard(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("order store lock poisoned")
    }

    // --- 目录登记（组建阶段，&mut self） ---

    pub fn add_product(&mut self, name: &str, base_price: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.products.insert(
            id,
            ProductRecord {
                id,
                name: name.to_string(),
                base_price,
            },
        );
        id
    }

    pub fn add_size(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.sizes.insert(
            id,
            SizeRecord {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_color(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.colors.insert(
            id,
            ColorRecord {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// 登记某 (产品, 颜色, 尺码) 的库存槽位
    pub fn add_inventory(
        &mut self,
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
        available_qty: u32,
    ) -> Uuid {
        self.ledger
            .insert_slot(product_id, color_id, size_id, available_qty)
    }

    // --- 订单操作 ---

    /// 创建订单：整单件数达标后按槽位整体预留库存
    pub fn create_order(
        &self,
        status: OrderStatus,
        items: &[(Uuid, u32)],
    ) -> Result<Uuid, OrderError> {
        let total_quantity: u32 = items.iter().map(|(_, q)| q).sum();
        if total_quantity < self.min_order_quantity {
            return Err(OrderError::OrderTooSmall {
                minimum: self.min_order_quantity,
                found: total_quantity,
            });
        }

        self.ledger.reserve_many(items)?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut inner = self.guard();
        let mut total_amount = Decimal::ZERO;

        for (inventory_id, quantity) in items {
            let slot = self
                .ledger
                .get(*inventory_id)
                .ok_or_else(|| OrderError::Inconsistent(format!("slot {} missing", inventory_id)))?;
            let product = self
                .products
                .get(&slot.product_id)
                .ok_or_else(|| OrderError::Inconsistent(format!("product {} missing", slot.product_id)))?;
            let item_id = Uuid::new_v4();
            inner.line_items.insert(
                item_id,
                LineItemRecord {
                    id: item_id,
                    order_id,
                    inventory_id: *inventory_id,
                    quantity: *quantity,
                    unit_price: product.base_price,
                },
            );
            total_amount += product.base_price * Decimal::from(*quantity);
        }

        inner.orders.insert(
            order_id,
            OrderRecord {
                id: order_id,
                status,
                total_amount,
                history: vec![StatusHistoryEntry {
                    status,
                    changed_at: now,
                    note: Some("order created".to_string()),
                }],
                created_at: now,
                updated_at: now,
            },
        );

        Ok(order_id)
    }

    /// 推进订单状态并记一条流转历史
    pub fn set_status(&self, order_id: Uuid, status: OrderStatus) -> Result<(), OrderError> {
        let mut inner = self.guard();
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        order.status = status;
        order.updated_at = Utc::now();
        order.history.push(StatusHistoryEntry {
            status,
            changed_at: order.updated_at,
            note: None,
        });
        Ok(())
    }

    pub fn status_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>, OrderError> {
        let inner = self.guard();
        let order = inner
            .orders
            .get(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        Ok(order.history.clone())
    }

    /// 订单 + 行项目的展开视图
    pub fn get_enriched_order(&self, order_id: Uuid) -> Result<EnrichedOrder, OrderError> {
        let inner = self.guard();
        let order = inner
            .orders
            .get(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let mut line_items = Vec::new();
        for item in inner.line_items.values().filter(|li| li.order_id == order_id) {
            line_items.push(self.enrich_item(item)?);
        }
        line_items.sort_by_key(|li| li.id);

        Ok(EnrichedOrder {
            id: order.id,
            status: order.status,
            total_amount: order.total_amount,
            line_items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }

    fn enrich_item(&self, item: &LineItemRecord) -> Result<EnrichedLineItem, OrderError> {
        let slot = self
            .ledger
            .get(item.inventory_id)
            .ok_or_else(|| OrderError::Inconsistent(format!("slot {} missing", item.inventory_id)))?;
        let product = self
            .products
            .get(&slot.product_id)
            .ok_or_else(|| OrderError::Inconsistent(format!("product {} missing", slot.product_id)))?;
        let size = self
            .sizes
            .get(&slot.size_id)
            .ok_or_else(|| OrderError::Inconsistent(format!("size {} missing", slot.size_id)))?;
        let color = self
            .colors
            .get(&slot.color_id)
            .ok_or_else(|| OrderError::Inconsistent(format!("color {} missing", slot.color_id)))?;

        Ok(EnrichedLineItem {
            id: item.id,
            inventory_id: item.inventory_id,
            product_name: product.name.clone(),
            size: size.name.clone(),
            color: color.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
    }

    /// 按选择器定位行项目
    pub fn find_line_item(
        &self,
        order_id: Uuid,
        selector: &LineItemSelector,
    ) -> Result<EnrichedLineItem, OrderError> {
        let order = self.get_enriched_order(order_id)?;
        let found = match selector {
            LineItemSelector::ById(id) => order.line_items.iter().find(|li| li.id == *id),
            LineItemSelector::ByNames {
                product,
                size,
                color,
            } => order.find_item_by_names(product, size, color),
        };
        found.cloned().ok_or_else(|| match selector {
            LineItemSelector::ById(id) => OrderError::LineItemNotFound {
                line_item_id: Some(*id),
                product: None,
                size: None,
                color: None,
            },
            LineItemSelector::ByNames {
                product,
                size,
                color,
            } => OrderError::LineItemNotFound {
                line_item_id: None,
                product: Some(product.clone()),
                size: Some(size.clone()),
                color: Some(color.clone()),
            },
        })
    }

    /// 产品可选尺码（有库存槽位的），按名称排序去重
    pub fn available_sizes_for_product(&self, product_id: Uuid) -> Vec<SizeRecord> {
        let mut seen = Vec::new();
        for slot in self.ledger.slots_for_product(product_id) {
            if let Some(size) = self.sizes.get(&slot.size_id) {
                if !seen.iter().any(|s: &SizeRecord| s.id == size.id) {
                    seen.push(size.clone());
                }
            }
        }
        seen.sort_by(|a, b| a.name.cmp(&b.name));
        seen
    }

    /// 产品可选颜色（有库存槽位的），按名称排序去重
    pub fn available_colors_for_product(&self, product_id: Uuid) -> Vec<ColorRecord> {
        let mut seen = Vec::new();
        for slot in self.ledger.slots_for_product(product_id) {
            if let Some(color) = self.colors.get(&slot.color_id) {
                if !seen.iter().any(|c: &ColorRecord| c.id == color.id) {
                    seen.push(color.clone());
                }
            }
        }
        seen.sort_by(|a, b| a.name.cmp(&b.name));
        seen
    }

    /// 修改行项目的数量、尺码或颜色
    ///
    /// 仅数量：delta > 0 需检查可用量并整体预留；delta ≤ 0 无条件释放。
    /// 换尺码/颜色：解析目标槽位（不存在则报 InvalidSize / InvalidColor 并枚举可选项），
    /// 整体换槽预留，单价跟随产品基准价。任一路径后订单总额按行项目全量重算。
    pub fn modify_line_item(
        &self,
        order_id: Uuid,
        line_item_id: Uuid,
        request: &ModifyLineItem,
    ) -> Result<EnrichedOrder, OrderError> {
        {
            let mut inner = self.guard();
            let order = inner
                .orders
                .get(&order_id)
                .ok_or(OrderError::OrderNotFound(order_id))?;
            if order.status.is_terminal() {
                return Err(OrderError::ModificationNotAllowed(order.status));
            }

            let item = inner
                .line_items
                .get(&line_item_id)
                .filter(|li| li.order_id == order_id)
                .ok_or(OrderError::LineItemNotFound {
                    line_item_id: Some(line_item_id),
                    product: None,
                    size: None,
                    color: None,
                })?;
            let old_quantity = item.quantity;
            let old_inventory_id = item.inventory_id;

            let old_slot = self.ledger.get(old_inventory_id).ok_or_else(|| {
                OrderError::Inconsistent(format!("slot {} missing", old_inventory_id))
            })?;

            let needs_new_inventory =
                request.new_size_name.is_some() || request.new_color_name.is_some();

            if needs_new_inventory {
                let target_size_id = match &request.new_size_name {
                    Some(name) => self.resolve_size(old_slot.product_id, name)?,
                    None => old_slot.size_id,
                };
                let target_color_id = match &request.new_color_name {
                    Some(name) => self.resolve_color(old_slot.product_id, name)?,
                    None => old_slot.color_id,
                };
                let target_quantity = request.new_quantity.unwrap_or(old_quantity);

                let new_slot = self
                    .ledger
                    .find_slot(old_slot.product_id, target_color_id, target_size_id)
                    .ok_or_else(|| {
                        self.missing_slot_error(&old_slot.product_id, request)
                    })?;

                self.ledger
                    .transfer(old_slot.id, new_slot.id, old_quantity, target_quantity)?;

                let product = self.products.get(&old_slot.product_id).ok_or_else(|| {
                    OrderError::Inconsistent(format!("product {} missing", old_slot.product_id))
                })?;

                let item = inner
                    .line_items
                    .get_mut(&line_item_id)
                    .expect("line item verified above");
                item.inventory_id = new_slot.id;
                item.quantity = target_quantity;
                item.unit_price = product.base_price;
            } else if let Some(new_quantity) = request.new_quantity {
                if new_quantity > old_quantity {
                    self.ledger
                        .reserve(old_inventory_id, new_quantity - old_quantity)?;
                } else if new_quantity < old_quantity {
                    self.ledger
                        .release(old_inventory_id, old_quantity - new_quantity)?;
                }
                let item = inner
                    .line_items
                    .get_mut(&line_item_id)
                    .expect("line item verified above");
                item.quantity = new_quantity;
            }

            Self::recompute_total(&mut inner, order_id);
        }

        self.get_enriched_order(order_id)
    }

    /// 移除行项目：剩余件数不得低于整单最低件数；整笔预留释放回可用
    pub fn remove_line_item(
        &self,
        order_id: Uuid,
        line_item_id: Uuid,
    ) -> Result<EnrichedOrder, OrderError> {
        {
            let mut inner = self.guard();
            let order = inner
                .orders
                .get(&order_id)
                .ok_or(OrderError::OrderNotFound(order_id))?;
            if order.status.is_terminal() {
                return Err(OrderError::ModificationNotAllowed(order.status));
            }

            let item = inner
                .line_items
                .get(&line_item_id)
                .filter(|li| li.order_id == order_id)
                .ok_or(OrderError::LineItemNotFound {
                    line_item_id: Some(line_item_id),
                    product: None,
                    size: None,
                    color: None,
                })?;
            let inventory_id = item.inventory_id;
            let quantity = item.quantity;

            let remaining: u32 = inner
                .line_items
                .values()
                .filter(|li| li.order_id == order_id && li.id != line_item_id)
                .map(|li| li.quantity)
                .sum();
            if remaining < self.min_order_quantity {
                return Err(OrderError::BelowMinimumQuantity {
                    minimum: self.min_order_quantity,
                    remaining,
                });
            }

            self.ledger.release(inventory_id, quantity)?;
            inner.line_items.remove(&line_item_id);
            Self::recompute_total(&mut inner, order_id);
        }

        self.get_enriched_order(order_id)
    }

    /// 订单总额永远按行项目全量重算，不做增量调整
    fn recompute_total(inner: &mut StoreInner, order_id: Uuid) {
        let total: Decimal = inner
            .line_items
            .values()
            .filter(|li| li.order_id == order_id)
            .map(|li| li.unit_price * Decimal::from(li.quantity))
            .sum();
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.total_amount = total;
            order.updated_at = Utc::now();
        }
    }

    fn resolve_size(&self, product_id: Uuid, name: &str) -> Result<Uuid, OrderError> {
        let available = self.available_sizes_for_product(product_id);
        available
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.id)
            .ok_or_else(|| OrderError::InvalidSize {
                requested: name.to_string(),
                available: available
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    fn resolve_color(&self, product_id: Uuid, name: &str) -> Result<Uuid, OrderError> {
        let available = self.available_colors_for_product(product_id);
        available
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
            .ok_or_else(|| OrderError::InvalidColor {
                requested: name.to_string(),
                available: available
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// 目标组合没有库存槽位时：按请求里改了什么报尺码或颜色无效
    fn missing_slot_error(&self, product_id: &Uuid, request: &ModifyLineItem) -> OrderError {
        if let Some(name) = &request.new_size_name {
            let available = self.available_sizes_for_product(*product_id);
            OrderError::InvalidSize {
                requested: name.clone(),
                available: available
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        } else {
            let name = request.new_color_name.clone().unwrap_or_default();
            let available = self.available_colors_for_product(*product_id);
            OrderError::InvalidColor {
                requested: name,
                available: available
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        store: OrderStore,
        order_id: Uuid,
        item_id: Uuid,
        navy_small: Uuid,
        navy_large: Uuid,
    }

    /// Gildan T-Shirt / Navy+Red / Small+Large，Navy Small 行项目 50 件 @ 4.99
    fn fixture() -> Fixture {
        let ledger = Arc::new(InventoryLedger::new());
        let mut store = OrderStore::new(ledger, 10);

        let tee = store.add_product("Gildan T-Shirt", Decimal::new(499, 2));
        let small = store.add_size("Small");
        let large = store.add_size("Large");
        let navy = store.add_color("Navy");
        let red = store.add_color("Red");

        let navy_small = store.add_inventory(tee, navy, small, 200);
        let navy_large = store.add_inventory(tee, navy, large, 100);
        store.add_inventory(tee, red, small, 80);

        let order_id = store
            .create_order(OrderStatus::Created, &[(navy_small, 50)])
            .unwrap();
        let item_id = store.get_enriched_order(order_id).unwrap().line_items[0].id;

        Fixture {
            store,
            order_id,
            item_id,
            navy_small,
            navy_large,
        }
    }

    #[test]
    fn test_create_reserves_inventory() {
        let f = fixture();
        let slot = f.store.ledger().get(f.navy_small).unwrap();
        assert_eq!((slot.available_qty, slot.reserved_qty), (150, 50));
        let order = f.store.get_enriched_order(f.order_id).unwrap();
        assert_eq!(order.total_amount, Decimal::new(24950, 2));
    }

    #[test]
    fn test_quantity_increase_moves_delta() {
        let f = fixture();
        let request = ModifyLineItem {
            new_quantity: Some(75),
            ..Default::default()
        };
        let order = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap();
        let slot = f.store.ledger().get(f.navy_small).unwrap();
        assert_eq!((slot.available_qty, slot.reserved_qty), (125, 75));
        assert_eq!(order.line_items[0].quantity, 75);
        assert_eq!(order.total_amount, Decimal::new(37425, 2));
    }

    #[test]
    fn test_quantity_decrease_releases_delta() {
        let f = fixture();
        let request = ModifyLineItem {
            new_quantity: Some(30),
            ..Default::default()
        };
        let order = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap();
        let slot = f.store.ledger().get(f.navy_small).unwrap();
        assert_eq!((slot.available_qty, slot.reserved_qty), (170, 30));
        assert_eq!(order.total_amount, Decimal::new(14970, 2));
    }

    #[test]
    fn test_quantity_increase_insufficient_fails_clean() {
        let f = fixture();
        let request = ModifyLineItem {
            new_quantity: Some(500),
            ..Default::default()
        };
        let err = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap_err();
        assert!(matches!(err, OrderError::InsufficientInventory { .. }));
        let slot = f.store.ledger().get(f.navy_small).unwrap();
        assert_eq!((slot.available_qty, slot.reserved_qty), (150, 50));
    }

    #[test]
    fn test_size_change_transfers_between_slots() {
        let f = fixture();
        let request = ModifyLineItem {
            new_size_name: Some("Large".to_string()),
            ..Default::default()
        };
        let order = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap();

        let old = f.store.ledger().get(f.navy_small).unwrap();
        let new = f.store.ledger().get(f.navy_large).unwrap();
        assert_eq!((old.available_qty, old.reserved_qty), (200, 0));
        assert_eq!((new.available_qty, new.reserved_qty), (50, 50));
        assert_eq!(order.line_items[0].size, "Large");
        assert_eq!(order.line_items[0].inventory_id, f.navy_large);
    }

    #[test]
    fn test_invalid_size_enumerates_options() {
        let f = fixture();
        let request = ModifyLineItem {
            new_size_name: Some("XXL".to_string()),
            ..Default::default()
        };
        let err = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("'XXL'"));
        assert!(text.contains("Large"));
        assert!(text.contains("Small"));
    }

    #[test]
    fn test_missing_slot_combination_reports_invalid_option() {
        let f = fixture();
        // Red 只有 Small 槽位：Red+Large 组合没有库存槽位
        let request = ModifyLineItem {
            new_size_name: Some("Large".to_string()),
            new_color_name: Some("Red".to_string()),
            ..Default::default()
        };
        let err = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidSize { .. }));
    }

    #[test]
    fn test_remove_below_minimum_refused() {
        let f = fixture();
        let err = f
            .store
            .remove_line_item(f.order_id, f.item_id)
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::BelowMinimumQuantity {
                minimum: 10,
                remaining: 0
            }
        ));
        // 无任何变更
        let slot = f.store.ledger().get(f.navy_small).unwrap();
        assert_eq!(slot.reserved_qty, 50);
        assert_eq!(
            f.store
                .get_enriched_order(f.order_id)
                .unwrap()
                .line_items
                .len(),
            1
        );
    }

    #[test]
    fn test_remove_releases_and_recomputes() {
        let f = fixture();
        // 双行订单：Navy Small 50 + Navy Large 40
        let order_id = f
            .store
            .create_order(OrderStatus::Created, &[(f.navy_small, 50), (f.navy_large, 40)])
            .unwrap();
        let order = f.store.get_enriched_order(order_id).unwrap();
        let small_item = order.find_item_by_names("Gildan T-Shirt", "Small", "Navy").unwrap().clone();

        let reserved_before = f.store.ledger().get(f.navy_small).unwrap().reserved_qty;
        let order = f.store.remove_line_item(order_id, small_item.id).unwrap();

        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].size, "Large");
        let slot = f.store.ledger().get(f.navy_small).unwrap();
        assert_eq!(slot.reserved_qty, reserved_before - 50);
        assert_eq!(order.total_amount, Decimal::new(19960, 2));
    }

    #[test]
    fn test_terminal_status_refuses_mutation() {
        let f = fixture();
        f.store.set_status(f.order_id, OrderStatus::Shipped).unwrap();
        let request = ModifyLineItem {
            new_quantity: Some(10),
            ..Default::default()
        };
        let err = f
            .store
            .modify_line_item(f.order_id, f.item_id, &request)
            .unwrap_err();
        assert!(matches!(err, OrderError::ModificationNotAllowed(_)));
    }

    #[test]
    fn test_find_line_item_by_names_case_insensitive() {
        let f = fixture();
        let selector = LineItemSelector::ByNames {
            product: "gildan t-shirt".to_string(),
            size: "SMALL".to_string(),
            color: "navy".to_string(),
        };
        let item = f.store.find_line_item(f.order_id, &selector).unwrap();
        assert_eq!(item.id, f.item_id);
    }

    #[test]
    fn test_status_history_appends() {
        let f = fixture();
        f.store
            .set_status(f.order_id, OrderStatus::Approved)
            .unwrap();
        let history = f.store.status_history(f.order_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, OrderStatus::Approved);
    }
}
