// ==========================================
// 零售数仓一致性引擎 - 管线编排器
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 批次运行主流程
// 流程: 一致性转换 → 清洗层落库 → 维度刷新 → 事实装配 → 隔离回写
// 红线: 单写者批处理；同库重跑产出逐字节一致（维度键表持久，
//       清洗层 / 事实 / 隔离区逐批整体重建）
// 红线: 隔离记录必须回写标志到清洗行，留痕闭环
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::dataset::{
    EcomLineConformer, EcomOrderConformer, InventoryConformer, PosLineConformer,
    PosTransactionConformer, ProductConformer, ReturnConformer, StoreConformer,
};
use crate::conform::ConformanceEngine;
use crate::domain::fact::QuarantinedRecord;
use crate::domain::record::CleanRecord;
use crate::domain::types::Dataset;
use crate::pipeline::batches::RawBatches;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::repository::{CleanRepository, DimensionRepository, FactRepository};
use crate::warehouse::{
    build_date_dimensions, build_product_dimensions, build_store_dimensions, DimensionResolver,
    FactAssembler,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

// ==========================================
// RunSummary - 单批运行汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub batch_id: String,
    pub raw_rows: usize,             // 原始行总数
    pub clean_rows: usize,           // 清洗行总数（守恒: == raw_rows）
    pub dim_products: usize,         // 本批刷新的商品维度行
    pub dim_stores: usize,           // 本批刷新的门店维度行
    pub dim_dates: usize,            // 本批刷新的日期维度行
    pub fact_pos_transactions: usize,
    pub fact_ecom_orders: usize,
    pub fact_sales_lines: usize,
    pub fact_inventory_snapshots: usize,
    pub fact_returns: usize,
    pub quarantined: usize,          // 隔离留痕行数
}

// ==========================================
// PipelineRunner - 批次管线
// ==========================================
pub struct PipelineRunner {
    conn: Arc<Mutex<Connection>>,
    config: ConformanceConfig,
}

impl PipelineRunner {
    pub fn new(conn: Arc<Mutex<Connection>>, config: ConformanceConfig) -> Self {
        PipelineRunner { conn, config }
    }

    /// 执行单批全流程
    #[instrument(skip_all, fields(batch_id = %batches.batch_id))]
    pub fn run(&self, batches: &RawBatches) -> PipelineResult<RunSummary> {
        let engine = ConformanceEngine::new(self.config.clone());
        let clean_repo = CleanRepository::new(Arc::clone(&self.conn));
        let dim_repo = DimensionRepository::new(Arc::clone(&self.conn));
        let fact_repo = FactRepository::new(Arc::clone(&self.conn));

        // ===== 阶段 1: 一致性转换（主数据先行） =====
        let products = engine.conform_batch::<ProductConformer>(&batches.products)?;
        let stores = engine.conform_batch::<StoreConformer>(&batches.stores)?;
        let pos_transactions =
            engine.conform_batch::<PosTransactionConformer>(&batches.pos_transactions)?;
        let pos_lines = engine.conform_batch::<PosLineConformer>(&batches.pos_line_items)?;
        let ecom_orders = engine.conform_batch::<EcomOrderConformer>(&batches.ecom_orders)?;
        let ecom_lines = engine.conform_batch::<EcomLineConformer>(&batches.ecom_line_items)?;
        let inventory =
            engine.conform_batch::<InventoryConformer>(&batches.inventory_snapshots)?;
        let returns = engine.conform_batch::<ReturnConformer>(&batches.returns)?;
        info!("阶段 1 完成: 一致性转换");

        // ===== 阶段 2: 清洗层落库（1:1 整体重建） =====
        let mut clean_rows = 0;
        clean_rows += clean_repo.replace_dataset(Dataset::Products, &products)?;
        clean_rows += clean_repo.replace_dataset(Dataset::Stores, &stores)?;
        clean_rows += clean_repo.replace_dataset(Dataset::PosTransactions, &pos_transactions)?;
        clean_rows += clean_repo.replace_dataset(Dataset::PosLineItems, &pos_lines)?;
        clean_rows += clean_repo.replace_dataset(Dataset::EcomOrders, &ecom_orders)?;
        clean_rows += clean_repo.replace_dataset(Dataset::EcomLineItems, &ecom_lines)?;
        clean_rows += clean_repo.replace_dataset(Dataset::InventorySnapshots, &inventory)?;
        clean_rows += clean_repo.replace_dataset(Dataset::Returns, &returns)?;

        // 行数守恒核对: 逐数据集落库计数之和必须等于原始行数
        let mut persisted: i64 = 0;
        for dataset in Dataset::all() {
            persisted += clean_repo.count(dataset)?;
        }
        if persisted as usize != batches.total_rows() {
            return Err(PipelineError::Other(anyhow::anyhow!(
                "清洗层行数守恒被破坏: raw={} persisted={}",
                batches.total_rows(),
                persisted
            )));
        }
        info!(clean_rows, "阶段 2 完成: 清洗层落库");

        // ===== 阶段 3: 维度刷新（键表持久，SCD Type 1） =====
        let mut product_resolver =
            DimensionResolver::with_existing(dim_repo.load_product_key_map()?);
        let mut store_resolver = DimensionResolver::with_existing(dim_repo.load_store_key_map()?);

        let product_dims =
            build_product_dimensions(&products, &mut product_resolver, batches.loaded_at);
        let store_dims = build_store_dimensions(&stores, &mut store_resolver, batches.loaded_at);

        let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
        collect_dates(&pos_transactions, &mut dates, |v| v.transaction_date);
        collect_dates(&pos_lines, &mut dates, |v| v.transaction_date);
        collect_dates(&ecom_orders, &mut dates, |v| v.order_date);
        collect_dates(&ecom_lines, &mut dates, |v| v.order_date);
        collect_dates(&inventory, &mut dates, |v| v.snapshot_date);
        collect_dates(&returns, &mut dates, |v| v.return_date);
        let date_dims = build_date_dimensions(&dates);

        let dim_products = dim_repo.upsert_products(&product_dims)?;
        let dim_stores = dim_repo.upsert_stores(&store_dims)?;
        let dim_dates = dim_repo.upsert_dates(&date_dims)?;
        info!(dim_products, dim_stores, dim_dates, "阶段 3 完成: 维度刷新");

        // ===== 阶段 4: 事实装配与落库（逐批整体重建） =====
        let assembler = FactAssembler::new(&product_resolver, &store_resolver);
        let pos_txn_out = assembler.assemble_pos_transactions(&pos_transactions);
        let ecom_order_out = assembler.assemble_ecom_orders(&ecom_orders);
        let sales_line_out = assembler.assemble_sales_lines(&pos_lines, &ecom_lines);
        let inventory_out = assembler.assemble_inventory_snapshots(&inventory);
        let return_out = assembler.assemble_returns(&returns);

        let fact_pos_transactions = fact_repo.replace_pos_transactions(&pos_txn_out.facts)?;
        let fact_ecom_orders = fact_repo.replace_ecom_orders(&ecom_order_out.facts)?;
        let fact_sales_lines = fact_repo.replace_sales_lines(&sales_line_out.facts)?;
        let fact_inventory_snapshots =
            fact_repo.replace_inventory_snapshots(&inventory_out.facts)?;
        let fact_returns = fact_repo.replace_returns(&return_out.facts)?;
        info!(
            fact_pos_transactions,
            fact_ecom_orders,
            fact_sales_lines,
            fact_inventory_snapshots,
            fact_returns,
            "阶段 4 完成: 事实装配落库"
        );

        // ===== 阶段 5: 隔离留痕 + 清洗行标志回写 =====
        let mut quarantined: Vec<QuarantinedRecord> = Vec::new();
        quarantined.extend(pos_txn_out.quarantined);
        quarantined.extend(ecom_order_out.quarantined);
        quarantined.extend(sales_line_out.quarantined);
        quarantined.extend(inventory_out.quarantined);
        quarantined.extend(return_out.quarantined);

        fact_repo.replace_quarantine(&quarantined)?;
        for q in &quarantined {
            clean_repo.append_flag(q.dataset, &q.batch_id, q.record_seq, q.flag)?;
        }
        info!(quarantined = quarantined.len(), "阶段 5 完成: 隔离留痕");

        Ok(RunSummary {
            batch_id: batches.batch_id.clone(),
            raw_rows: batches.total_rows(),
            clean_rows,
            dim_products,
            dim_stores,
            dim_dates,
            fact_pos_transactions,
            fact_ecom_orders,
            fact_sales_lines,
            fact_inventory_snapshots,
            fact_returns,
            quarantined: quarantined.len(),
        })
    }
}

/// 从 current 清洗记录里收集日期（日期维度刷新依据）
fn collect_dates<T>(
    records: &[CleanRecord<T>],
    dates: &mut BTreeSet<NaiveDate>,
    extract: impl Fn(&T) -> Option<NaiveDate>,
) {
    for record in records.iter().filter(|r| r.current) {
        if let Some(date) = extract(&record.values) {
            dates.insert(date);
        }
    }
}
