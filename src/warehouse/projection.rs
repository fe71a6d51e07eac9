// ==========================================
// 零售数仓一致性引擎 - 分析投影
// ==========================================
// 依据: dimensional_model_v0.1.md - 下游消费视图
// 职责: 星型模型之上的只读聚合查询，不写任何表
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 低于安全线的库存行（补货预警视图）
#[derive(Debug, Clone, PartialEq)]
pub struct AtRiskInventoryRow {
    pub date_key: i64,
    pub product_id: String,
    pub product_name: Option<String>,
    pub store_id: String,
    pub ending_inventory: i64,
    pub safety_stock: i64,
}

/// 按日销售汇总行（跨源合并）
#[derive(Debug, Clone, PartialEq)]
pub struct DailySalesRow {
    pub date_key: i64,
    pub source_system: String,
    pub line_count: i64,
    pub total_quantity: i64,
    pub total_amount: f64,
}

/// 隔离区按数据集汇总行
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantineSummaryRow {
    pub dataset: String,
    pub flag: String,
    pub record_count: i64,
}

// ==========================================
// Projections
// ==========================================
pub struct Projections {
    conn: Arc<Mutex<Connection>>,
}

impl Projections {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 期末库存低于安全线的快照行（按缺口降序）
    pub fn at_risk_inventory(&self) -> RepositoryResult<Vec<AtRiskInventoryRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT f.date_key, p.product_id, p.product_name, s.store_id,
                   f.ending_inventory, f.safety_stock
            FROM fact_inventory_snapshot f
            JOIN dim_product p ON p.product_key = f.product_key
            JOIN dim_store s ON s.store_key = f.store_key
            WHERE f.below_safety_stock = 1
            ORDER BY (f.safety_stock - f.ending_inventory) DESC, p.product_id, s.store_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AtRiskInventoryRow {
                date_key: row.get(0)?,
                product_id: row.get(1)?,
                product_name: row.get(2)?,
                store_id: row.get(3)?,
                ending_inventory: row.get(4)?,
                safety_stock: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// 按日、按源系统的销售明细汇总（金额取重算行总额）
    pub fn daily_sales_summary(&self) -> RepositoryResult<Vec<DailySalesRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT date_key, source_system, COUNT(*), SUM(quantity), SUM(line_total)
            FROM fact_sales_line
            GROUP BY date_key, source_system
            ORDER BY date_key, source_system
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DailySalesRow {
                date_key: row.get(0)?,
                source_system: row.get(1)?,
                line_count: row.get(2)?,
                total_quantity: row.get(3)?,
                total_amount: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// 隔离区按数据集与标志汇总（运行后体检用）
    pub fn quarantine_summary(&self) -> RepositoryResult<Vec<QuarantineSummaryRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT dataset, flag, COUNT(*)
            FROM quarantine_record
            GROUP BY dataset, flag
            ORDER BY dataset, flag
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(QuarantineSummaryRow {
                dataset: row.get(0)?,
                flag: row.get(1)?,
                record_count: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
