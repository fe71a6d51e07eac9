// ==========================================
// 零售数仓一致性引擎 - 原始批次
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 批次交付约定
// 约定: 落地区每批一个目录，八类数据集各一个 CSV；缺文件按空数据集
// ==========================================

use crate::domain::record::RawRecord;
use crate::landing::{load_optional_csv, LandingResult};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

/// 八类数据集在落地区的约定文件名
pub const PRODUCTS_FILE: &str = "products.csv";
pub const STORES_FILE: &str = "stores.csv";
pub const POS_TRANSACTIONS_FILE: &str = "pos_transactions.csv";
pub const POS_LINE_ITEMS_FILE: &str = "pos_line_items.csv";
pub const ECOM_ORDERS_FILE: &str = "ecom_orders.csv";
pub const ECOM_LINE_ITEMS_FILE: &str = "ecom_line_items.csv";
pub const INVENTORY_SNAPSHOTS_FILE: &str = "inventory_snapshots.csv";
pub const RETURNS_FILE: &str = "returns.csv";

// ==========================================
// RawBatches - 一个批次的全部原始数据集
// ==========================================
#[derive(Debug)]
pub struct RawBatches {
    pub batch_id: String,
    pub loaded_at: DateTime<Utc>,
    pub products: Vec<RawRecord>,
    pub stores: Vec<RawRecord>,
    pub pos_transactions: Vec<RawRecord>,
    pub pos_line_items: Vec<RawRecord>,
    pub ecom_orders: Vec<RawRecord>,
    pub ecom_line_items: Vec<RawRecord>,
    pub inventory_snapshots: Vec<RawRecord>,
    pub returns: Vec<RawRecord>,
}

impl RawBatches {
    /// 空批次（测试与增量场景用）
    pub fn empty(batch_id: &str, loaded_at: DateTime<Utc>) -> Self {
        RawBatches {
            batch_id: batch_id.to_string(),
            loaded_at,
            products: Vec::new(),
            stores: Vec::new(),
            pos_transactions: Vec::new(),
            pos_line_items: Vec::new(),
            ecom_orders: Vec::new(),
            ecom_line_items: Vec::new(),
            inventory_snapshots: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// 从落地区目录装载整批
    pub fn load_from_dir(
        dir: &Path,
        batch_id: &str,
        loaded_at: DateTime<Utc>,
    ) -> LandingResult<Self> {
        let batches = RawBatches {
            batch_id: batch_id.to_string(),
            loaded_at,
            products: load_optional_csv(dir, PRODUCTS_FILE, batch_id, loaded_at)?,
            stores: load_optional_csv(dir, STORES_FILE, batch_id, loaded_at)?,
            pos_transactions: load_optional_csv(dir, POS_TRANSACTIONS_FILE, batch_id, loaded_at)?,
            pos_line_items: load_optional_csv(dir, POS_LINE_ITEMS_FILE, batch_id, loaded_at)?,
            ecom_orders: load_optional_csv(dir, ECOM_ORDERS_FILE, batch_id, loaded_at)?,
            ecom_line_items: load_optional_csv(dir, ECOM_LINE_ITEMS_FILE, batch_id, loaded_at)?,
            inventory_snapshots: load_optional_csv(
                dir,
                INVENTORY_SNAPSHOTS_FILE,
                batch_id,
                loaded_at,
            )?,
            returns: load_optional_csv(dir, RETURNS_FILE, batch_id, loaded_at)?,
        };

        info!(
            batch_id = batch_id,
            total_rows = batches.total_rows(),
            "落地区批次装载完成"
        );
        Ok(batches)
    }

    /// 批内原始行总数
    pub fn total_rows(&self) -> usize {
        self.products.len()
            + self.stores.len()
            + self.pos_transactions.len()
            + self.pos_line_items.len()
            + self.ecom_orders.len()
            + self.ecom_line_items.len()
            + self.inventory_snapshots.len()
            + self.returns.len()
    }
}
