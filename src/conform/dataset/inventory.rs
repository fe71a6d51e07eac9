// ==========================================
// 零售数仓一致性引擎 - 库存快照一致性规则
// ==========================================
// 依据: Field_Rules_v0.2.md - inventory_snapshots
// 口径: 期末 = 期初 + 入库 - 售出；低于安全线打 BELOW_THRESHOLD
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::engine::Conformable;
use crate::conform::field_parser::{parse_row, FieldRule, FieldType};
use crate::conform::normalizer::{normalize, vocab};
use crate::conform::reconciler::Reconciler;
use crate::domain::record::RawRecord;
use crate::domain::types::{Dataset, FlagSet, QualityFlag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// InventoryClean - 库存快照（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryClean {
    pub snapshot_date: Option<NaiveDate>,   // 粒度组成
    pub store_id: Option<String>,           // 粒度组成
    pub product_id: Option<String>,         // 粒度组成
    pub beginning_inventory: Option<i64>,   // 期初库存
    pub received_quantity: Option<i64>,     // 入库量
    pub sold_quantity: Option<i64>,         // 售出量
    pub reported_ending: Option<i64>,       // 上报期末（仅审计）
    pub ending_inventory: Option<i64>,      // 采信期末（能重算则重算）
    pub safety_stock: i64,                  // 安全库存线（缺失按 0）
    pub stock_status: Option<String>,       // 受控词表
}

/// 库存快照字段规则表
const INVENTORY_RULES: &[FieldRule] = &[
    FieldRule::required("snapshot_date", FieldType::Date),
    FieldRule::required("store_id", FieldType::Reference),
    FieldRule::required("product_id", FieldType::Reference),
    FieldRule::optional("beginning_inventory", FieldType::Quantity),
    FieldRule::optional("received_quantity", FieldType::Quantity),
    FieldRule::optional("sold_quantity", FieldType::Quantity),
    FieldRule::required("ending_inventory", FieldType::Quantity),
    FieldRule::optional("safety_stock", FieldType::Quantity),
    FieldRule::optional("stock_status", FieldType::Text),
];

pub struct InventoryConformer;

impl Conformable for InventoryConformer {
    type Clean = InventoryClean;
    const DATASET: Dataset = Dataset::InventorySnapshots;

    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, mut flags) = parse_row(raw, INVENTORY_RULES);
        let reconciler = Reconciler::new(config.reconciliation_tolerance);

        let beginning = row.int("beginning_inventory");
        let received = row.int("received_quantity");
        let sold = row.int("sold_quantity");
        let reported_ending = row.int("ending_inventory");

        // 三项齐备才能重算；否则采信上报期末
        let ending_inventory = match (beginning, received, sold) {
            (Some(b), Some(r), Some(s)) => {
                let calculated = reconciler.ending_inventory(b, r, s);
                Some(reconciler.check_count(calculated, reported_ending, &mut flags))
            }
            _ => reported_ending,
        };

        let safety_stock = row.int("safety_stock").unwrap_or(0);
        if let Some(ending) = ending_inventory {
            if ending < safety_stock {
                flags.insert(QualityFlag::BelowThreshold);
            }
        }

        let snapshot_date = row.date("snapshot_date");
        let store_id = row.text("store_id");
        let product_id = row.text("product_id");

        // 自然键: 日期|门店|商品
        let natural_key = match (&snapshot_date, &store_id, &product_id) {
            (Some(date), Some(store), Some(product)) => {
                Some(format!("{}|{}|{}", date.format("%Y%m%d"), store, product))
            }
            _ => None,
        };

        let clean = InventoryClean {
            snapshot_date,
            store_id,
            product_id,
            beginning_inventory: beginning,
            received_quantity: received,
            sold_quantity: sold,
            reported_ending,
            ending_inventory,
            safety_stock,
            stock_status: normalize(row.text("stock_status").as_deref(), vocab::STOCK_STATUS),
        };

        (clean, natural_key, flags)
    }
}
