// ==========================================
// 零售数仓一致性引擎 - 事实 Repository
// ==========================================
// 依据: dimensional_model_v0.1.md - 事实表持久化
// 职责: 事实表与隔离区的逐批重建（DELETE + INSERT 单事务）
// 红线: 粒度 UNIQUE 约束冲突按错误上抛，不做 OR REPLACE 静默覆盖
//       （内存去重已保证不冲突；冲突即管线缺陷）
// ==========================================

use crate::domain::fact::{
    EcomOrderFact, InventorySnapshotFact, PosTransactionFact, QuarantinedRecord, ReturnFact,
    SalesLineFact,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// FactRepository
// ==========================================
pub struct FactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FactRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// POS 交易事实重建
    pub fn replace_pos_transactions(
        &self,
        facts: &[PosTransactionFact],
    ) -> RepositoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM fact_pos_transaction", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO fact_pos_transaction (
                    transaction_id, date_key, store_key, payment_method,
                    gross_amount, discount_amount, tax_amount, net_amount,
                    batch_id, record_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for f in facts {
                stmt.execute(params![
                    f.transaction_id,
                    f.date_key,
                    f.store_key,
                    f.payment_method,
                    f.gross_amount,
                    f.discount_amount,
                    f.tax_amount,
                    f.net_amount,
                    f.batch_id,
                    f.record_seq,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 电商订单事实重建
    pub fn replace_ecom_orders(&self, facts: &[EcomOrderFact]) -> RepositoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM fact_ecom_order", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO fact_ecom_order (
                    order_id, date_key, channel, device_type, order_status,
                    payment_method, gross_amount, discount_amount, shipping_fee,
                    net_revenue, batch_id, record_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for f in facts {
                stmt.execute(params![
                    f.order_id,
                    f.date_key,
                    f.channel,
                    f.device_type,
                    f.order_status,
                    f.payment_method,
                    f.gross_amount,
                    f.discount_amount,
                    f.shipping_fee,
                    f.net_revenue,
                    f.batch_id,
                    f.record_seq,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 统一销售明细事实重建
    pub fn replace_sales_lines(&self, facts: &[SalesLineFact]) -> RepositoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM fact_sales_line", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO fact_sales_line (
                    source_system, transaction_ref, line_number, date_key,
                    product_key, store_key, quantity, unit_price,
                    discount_amount, line_total, batch_id, record_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for f in facts {
                stmt.execute(params![
                    f.source_system.to_db_str(),
                    f.transaction_ref,
                    f.line_number,
                    f.date_key,
                    f.product_key,
                    f.store_key,
                    f.quantity,
                    f.unit_price,
                    f.discount_amount,
                    f.line_total,
                    f.batch_id,
                    f.record_seq,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 库存快照事实重建
    pub fn replace_inventory_snapshots(
        &self,
        facts: &[InventorySnapshotFact],
    ) -> RepositoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM fact_inventory_snapshot", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO fact_inventory_snapshot (
                    date_key, product_key, store_key, beginning_inventory,
                    received_quantity, sold_quantity, ending_inventory,
                    safety_stock, stock_status, below_safety_stock,
                    batch_id, record_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for f in facts {
                stmt.execute(params![
                    f.date_key,
                    f.product_key,
                    f.store_key,
                    f.beginning_inventory,
                    f.received_quantity,
                    f.sold_quantity,
                    f.ending_inventory,
                    f.safety_stock,
                    f.stock_status,
                    f.below_safety_stock,
                    f.batch_id,
                    f.record_seq,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 退货事实重建
    pub fn replace_returns(&self, facts: &[ReturnFact]) -> RepositoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM fact_return", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO fact_return (
                    return_id, date_key, product_key, store_key, original_ref,
                    quantity, refund_amount, return_reason, return_channel,
                    batch_id, record_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )?;
            for f in facts {
                stmt.execute(params![
                    f.return_id,
                    f.date_key,
                    f.product_key,
                    f.store_key,
                    f.original_ref,
                    f.quantity,
                    f.refund_amount,
                    f.return_reason,
                    f.return_channel,
                    f.batch_id,
                    f.record_seq,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 隔离区重建（全部数据集的隔离记录一次写入）
    pub fn replace_quarantine(&self, records: &[QuarantinedRecord]) -> RepositoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM quarantine_record", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO quarantine_record (
                    dataset, natural_key, reason, flag, batch_id, record_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for q in records {
                stmt.execute(params![
                    q.dataset.to_db_str(),
                    q.natural_key,
                    q.reason,
                    q.flag.to_db_str(),
                    q.batch_id,
                    q.record_seq,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }
}
