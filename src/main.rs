// ==========================================
// 零售数仓一致性引擎 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 用法: retail-conformance <落地区目录> <数据库路径> [配置文件]
// ==========================================

use anyhow::{bail, Context};
use chrono::Utc;
use retail_conformance::repository::init_schema;
use retail_conformance::warehouse::Projections;
use retail_conformance::{db, logging, ConformanceConfig, PipelineRunner, RawBatches};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    info!("==================================================");
    info!("{}", retail_conformance::APP_NAME);
    info!("系统版本: {}", retail_conformance::VERSION);
    info!("==================================================");

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("用法: {} <落地区目录> <数据库路径> [配置文件]", args[0]);
    }
    let data_dir = Path::new(&args[1]);
    let db_path = &args[2];

    // 配置加载（未提供配置文件则用默认容差）
    let config = match args.get(3) {
        Some(path) => ConformanceConfig::load_from_file(path)
            .with_context(|| format!("配置文件加载失败: {}", path))?,
        None => ConformanceConfig::default(),
    };
    info!(tolerance = config.reconciliation_tolerance, "配置加载完成");

    // 打开数据库并建表
    let conn = db::open_sqlite_connection(db_path)
        .with_context(|| format!("数据库打开失败: {}", db_path))?;
    if let Some(version) = db::read_schema_version(&conn)? {
        if version != db::CURRENT_SCHEMA_VERSION {
            warn!(
                found = version,
                expected = db::CURRENT_SCHEMA_VERSION,
                "数据库 schema 版本与当前代码不一致"
            );
        }
    }
    init_schema(&conn)?;
    info!("使用数据库: {}", db_path);

    // 装载批次并运行管线
    let batch_id = Uuid::new_v4().to_string();
    let batches = RawBatches::load_from_dir(data_dir, &batch_id, Utc::now())
        .with_context(|| format!("落地区装载失败: {}", data_dir.display()))?;

    let conn = Arc::new(Mutex::new(conn));
    let runner = PipelineRunner::new(Arc::clone(&conn), config);
    let summary = runner.run(&batches)?;

    info!("==================================================");
    info!("批次 {} 运行完成", summary.batch_id);
    info!(
        "原始行 {} / 清洗行 {} / 隔离 {}",
        summary.raw_rows, summary.clean_rows, summary.quarantined
    );
    info!(
        "维度: 商品 {} 门店 {} 日期 {}",
        summary.dim_products, summary.dim_stores, summary.dim_dates
    );
    info!(
        "事实: POS交易 {} 电商订单 {} 销售明细 {} 库存快照 {} 退货 {}",
        summary.fact_pos_transactions,
        summary.fact_ecom_orders,
        summary.fact_sales_lines,
        summary.fact_inventory_snapshots,
        summary.fact_returns
    );

    // 运行后体检：隔离区与补货预警
    let projections = Projections::new(conn);
    for row in projections.quarantine_summary()? {
        warn!(
            dataset = %row.dataset,
            flag = %row.flag,
            count = row.record_count,
            "隔离区汇总"
        );
    }
    let at_risk = projections.at_risk_inventory()?;
    if !at_risk.is_empty() {
        info!("低于安全线库存 {} 行", at_risk.len());
    }

    Ok(())
}
