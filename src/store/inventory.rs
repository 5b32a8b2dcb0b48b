//! 库存台账
//!
//! 每个 (产品, 颜色, 尺码) 槽位维护 available/reserved 两个计数器。
//! 所有检查再更新都在同一把锁内完成，单次 reserve/release 前后
//! available + reserved 守恒；换槽位的 transfer 同样在一次持锁中完成，
//! 不存在两个槽位都扣或都不扣的中间态。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use uuid::Uuid;

/// 单个库存槽位
#[derive(Debug, Clone)]
pub struct InventorySlot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub color_id: Uuid,
    pub size_id: Uuid,
    pub available_qty: u32,
    pub reserved_qty: u32,
}

/// 台账操作错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("inventory slot {0} not found")]
    SlotNotFound(Uuid),

    #[error("Insufficient inventory. Available: {available}, Requested: {requested}")]
    Insufficient { available: u32, requested: u32 },
}

/// 库存台账：槽位表 + 单把互斥锁
#[derive(Default)]
pub struct InventoryLedger {
    slots: Mutex<HashMap<Uuid, InventorySlot>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Uuid, InventorySlot>> {
        self.slots.lock().expect("inventory ledger lock poisoned")
    }

    /// 登记槽位，返回其 ID
    pub fn insert_slot(
        &self,
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
        available_qty: u32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.guard().insert(
            id,
            InventorySlot {
                id,
                product_id,
                color_id,
                size_id,
                available_qty,
                reserved_qty: 0,
            },
        );
        id
    }

    pub fn get(&self, id: Uuid) -> Option<InventorySlot> {
        self.guard().get(&id).cloned()
    }

    /// 按 (产品, 颜色, 尺码) 查槽位
    pub fn find_slot(&self, product_id: Uuid, color_id: Uuid, size_id: Uuid) -> Option<InventorySlot> {
        self.guard()
            .values()
            .find(|s| s.product_id == product_id && s.color_id == color_id && s.size_id == size_id)
            .cloned()
    }

    /// 产品的全部槽位（用于枚举可选尺码/颜色）
    pub fn slots_for_product(&self, product_id: Uuid) -> Vec<InventorySlot> {
        self.guard()
            .values()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect()
    }

    /// 预留 qty：available 不足时整体失败，不做部分变更
    pub fn reserve(&self, slot_id: Uuid, qty: u32) -> Result<(), InventoryError> {
        let mut slots = self.guard();
        let slot = slots
            .get_mut(&slot_id)
            .ok_or(InventoryError::SlotNotFound(slot_id))?;
        if slot.available_qty < qty {
            return Err(InventoryError::Insufficient {
                available: slot.available_qty,
                requested: qty,
            });
        }
        slot.available_qty -= qty;
        slot.reserved_qty += qty;
        Ok(())
    }

    /// 批量预留：先全部校验再全部应用，任一不足则不动任何槽位
    pub fn reserve_many(&self, requests: &[(Uuid, u32)]) -> Result<(), InventoryError> {
        let mut slots = self.guard();
        let mut needed: HashMap<Uuid, u32> = HashMap::new();
        for (slot_id, qty) in requests {
            *needed.entry(*slot_id).or_default() += qty;
        }
        for (slot_id, qty) in &needed {
            let slot = slots
                .get(slot_id)
                .ok_or(InventoryError::SlotNotFound(*slot_id))?;
            if slot.available_qty < *qty {
                return Err(InventoryError::Insufficient {
                    available: slot.available_qty,
                    requested: *qty,
                });
            }
        }
        for (slot_id, qty) in &needed {
            let slot = slots.get_mut(slot_id).expect("slot verified above");
            slot.available_qty -= qty;
            slot.reserved_qty += qty;
        }
        Ok(())
    }

    /// 释放预留：夹到当前 reserved，保证守恒且不会失败
    pub fn release(&self, slot_id: Uuid, qty: u32) -> Result<(), InventoryError> {
        let mut slots = self.guard();
        let slot = slots
            .get_mut(&slot_id)
            .ok_or(InventoryError::SlotNotFound(slot_id))?;
        let moved = qty.min(slot.reserved_qty);
        slot.reserved_qty -= moved;
        slot.available_qty += moved;
        Ok(())
    }

    /// 换槽位：释放旧槽位 release_qty 并在新槽位预留 reserve_qty，单次持锁完成。
    /// 新槽位可用量不足时不动任何槽位。
    pub fn transfer(
        &self,
        from: Uuid,
        to: Uuid,
        release_qty: u32,
        reserve_qty: u32,
    ) -> Result<(), InventoryError> {
        let mut slots = self.guard();

        if !slots.contains_key(&from) {
            return Err(InventoryError::SlotNotFound(from));
        }

        if from == to {
            // 同槽位：先释放后预留的净效果
            let slot = slots.get_mut(&from).expect("slot verified above");
            let freed = release_qty.min(slot.reserved_qty);
            let available_after = slot.available_qty + freed;
            if available_after < reserve_qty {
                return Err(InventoryError::Insufficient {
                    available: slot.available_qty,
                    requested: reserve_qty,
                });
            }
            slot.reserved_qty = slot.reserved_qty - freed + reserve_qty;
            slot.available_qty = available_after - reserve_qty;
            return Ok(());
        }

        let target = slots.get(&to).ok_or(InventoryError::SlotNotFound(to))?;
        if target.available_qty < reserve_qty {
            return Err(InventoryError::Insufficient {
                available: target.available_qty,
                requested: reserve_qty,
            });
        }

        let old = slots.get_mut(&from).expect("slot verified above");
        let moved = release_qty.min(old.reserved_qty);
        old.reserved_qty -= moved;
        old.available_qty += moved;

        let new = slots.get_mut(&to).expect("slot verified above");
        new.available_qty -= reserve_qty;
        new.reserved_qty += reserve_qty;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(ledger: &InventoryLedger, ids: &[Uuid]) -> u32 {
        ids.iter()
            .map(|id| {
                let s = ledger.get(*id).unwrap();
                s.available_qty + s.reserved_qty
            })
            .sum()
    }

    #[test]
    fn test_reserve_and_release_conserve() {
        let ledger = InventoryLedger::new();
        let slot = ledger.insert_slot(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 100);

        ledger.reserve(slot, 30).unwrap();
        let s = ledger.get(slot).unwrap();
        assert_eq!((s.available_qty, s.reserved_qty), (70, 30));

        ledger.release(slot, 10).unwrap();
        let s = ledger.get(slot).unwrap();
        assert_eq!((s.available_qty, s.reserved_qty), (80, 20));
        assert_eq!(totals(&ledger, &[slot]), 100);
    }

    #[test]
    fn test_reserve_insufficient_no_mutation() {
        let ledger = InventoryLedger::new();
        let slot = ledger.insert_slot(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 5);

        let err = ledger.reserve(slot, 6).unwrap_err();
        assert_eq!(
            err,
            InventoryError::Insufficient {
                available: 5,
                requested: 6
            }
        );
        let s = ledger.get(slot).unwrap();
        assert_eq!((s.available_qty, s.reserved_qty), (5, 0));
    }

    #[test]
    fn test_transfer_conserves_across_slots() {
        let ledger = InventoryLedger::new();
        let product = Uuid::new_v4();
        let from = ledger.insert_slot(product, Uuid::new_v4(), Uuid::new_v4(), 100);
        let to = ledger.insert_slot(product, Uuid::new_v4(), Uuid::new_v4(), 40);
        ledger.reserve(from, 50).unwrap();

        let before = totals(&ledger, &[from, to]);
        ledger.transfer(from, to, 50, 35).unwrap();
        assert_eq!(totals(&ledger, &[from, to]), before);

        let f = ledger.get(from).unwrap();
        let t = ledger.get(to).unwrap();
        assert_eq!((f.available_qty, f.reserved_qty), (100, 0));
        assert_eq!((t.available_qty, t.reserved_qty), (5, 35));
    }

    #[test]
    fn test_transfer_insufficient_target_untouched() {
        let ledger = InventoryLedger::new();
        let product = Uuid::new_v4();
        let from = ledger.insert_slot(product, Uuid::new_v4(), Uuid::new_v4(), 100);
        let to = ledger.insert_slot(product, Uuid::new_v4(), Uuid::new_v4(), 10);
        ledger.reserve(from, 50).unwrap();

        assert!(ledger.transfer(from, to, 50, 35).is_err());
        let f = ledger.get(from).unwrap();
        let t = ledger.get(to).unwrap();
        assert_eq!((f.available_qty, f.reserved_qty), (50, 50));
        assert_eq!((t.available_qty, t.reserved_qty), (10, 0));
    }

    #[test]
    fn test_reserve_many_all_or_nothing() {
        let ledger = InventoryLedger::new();
        let product = Uuid::new_v4();
        let a = ledger.insert_slot(product, Uuid::new_v4(), Uuid::new_v4(), 10);
        let b = ledger.insert_slot(product, Uuid::new_v4(), Uuid::new_v4(), 3);

        assert!(ledger.reserve_many(&[(a, 5), (b, 5)]).is_err());
        assert_eq!(ledger.get(a).unwrap().reserved_qty, 0);
        assert_eq!(ledger.get(b).unwrap().reserved_qty, 0);

        ledger.reserve_many(&[(a, 5), (b, 3)]).unwrap();
        assert_eq!(ledger.get(a).unwrap().reserved_qty, 5);
        assert_eq!(ledger.get(b).unwrap().reserved_qty, 3);
    }
}
