// ==========================================
// 管线集成测试
// ==========================================
// 覆盖: 全流程装配 / 行数守恒 / 去重裁决 / 隔离留痕回写 /
//       重跑幂等 / 跨批代理键稳定 / 投影查询
// ==========================================

mod test_helpers;

use chrono::Duration;
use retail_conformance::warehouse::Projections;
use retail_conformance::{
    ConformanceConfig, FlagSet, PipelineRunner, QualityFlag, RawBatches, RunSummary,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::*;

/// 覆盖全部八类数据集的样例批次
fn sample_batches() -> RawBatches {
    let mut b = RawBatches::empty("B001", batch_time());

    b.products = vec![
        raw(
            &[
                ("product_id", "P001"),
                ("product_name", "Basic Tee"),
                ("category", "tops"),
                ("brand", "Acme"),
                ("season", "summer season"),
                ("status", "active"),
                ("unit_price", "19.99"),
                ("unit_cost", "8.00"),
            ],
            "products.csv",
            0,
        ),
        // 清仓品: 成本高于售价，负毛利但必须保留
        raw(
            &[
                ("product_id", "P002"),
                ("product_name", "Clearance Jacket"),
                ("category", "outerwear"),
                ("status", "discontinued"),
                ("unit_price", "10.00"),
                ("unit_cost", "12.00"),
            ],
            "products.csv",
            1,
        ),
    ];

    b.stores = vec![
        raw(
            &[
                ("store_id", "S001"),
                ("store_name", "Downtown"),
                ("city", "Portland"),
                ("region", "north west"),
                ("store_type", "flagship store"),
                ("opened_date", "2020-05-01"),
            ],
            "stores.csv",
            0,
        ),
        raw(
            &[
                ("store_id", "S002"),
                ("store_name", "Riverside Outlet"),
                ("city", "Austin"),
                ("region", "south west"),
                ("store_type", "outlet"),
            ],
            "stores.csv",
            1,
        ),
    ];

    b.pos_transactions = vec![raw(
        &[
            ("transaction_id", "T100"),
            ("store_id", "S001"),
            ("transaction_date", "2025-01-20"),
            ("payment_method", "credit card"),
            ("total_amount", "49.96"),
            ("discount_amount", "0"),
            ("tax_amount", "4.12"),
            ("net_amount", "54.08"),
        ],
        "pos_transactions.csv",
        0,
    )];

    b.pos_line_items = vec![
        raw(
            &[
                ("transaction_id", "T100"),
                ("line_number", "1"),
                ("transaction_date", "2025-01-20"),
                ("store_id", "S001"),
                ("product_id", "P001"),
                ("quantity", "2"),
                ("unit_price", "19.99"),
                ("line_total", "39.98"),
            ],
            "pos_line_items.csv",
            0,
        ),
        raw(
            &[
                ("transaction_id", "T100"),
                ("line_number", "2"),
                ("transaction_date", "2025-01-20"),
                ("store_id", "S001"),
                ("product_id", "P002"),
                ("quantity", "1"),
                ("unit_price", "9.98"),
            ],
            "pos_line_items.csv",
            1,
        ),
        // 未知商品: 清洗层保留，事实装配隔离
        raw(
            &[
                ("transaction_id", "T100"),
                ("line_number", "3"),
                ("transaction_date", "2025-01-20"),
                ("store_id", "S001"),
                ("product_id", "P999"),
                ("quantity", "1"),
                ("unit_price", "5.00"),
            ],
            "pos_line_items.csv",
            2,
        ),
    ];

    b.ecom_orders = vec![raw(
        &[
            ("order_id", "O500"),
            ("order_date", "2025-01-21"),
            ("channel", "mobile app"),
            ("device_type", "iphone"),
            ("order_status", "shipped"),
            ("payment_method", "paypal"),
            ("total_amount", "39.98"),
            ("discount_amount", "5.00"),
            ("shipping_fee", "6.99"),
        ],
        "ecom_orders.csv",
        0,
    )];

    b.ecom_line_items = vec![raw(
        &[
            ("order_id", "O500"),
            ("line_number", "1"),
            ("order_date", "2025-01-21"),
            ("product_id", "P001"),
            ("quantity", "2"),
            ("unit_price", "19.99"),
        ],
        "ecom_line_items.csv",
        0,
    )];

    b.inventory_snapshots = vec![
        // 期末低于安全线
        raw(
            &[
                ("snapshot_date", "2025-01-20"),
                ("store_id", "S001"),
                ("product_id", "P001"),
                ("beginning_inventory", "10"),
                ("received_quantity", "0"),
                ("sold_quantity", "5"),
                ("ending_inventory", "5"),
                ("safety_stock", "10"),
                ("stock_status", "low"),
            ],
            "inventory_snapshots.csv",
            0,
        ),
        raw(
            &[
                ("snapshot_date", "2025-01-20"),
                ("store_id", "S001"),
                ("product_id", "P002"),
                ("beginning_inventory", "30"),
                ("received_quantity", "10"),
                ("sold_quantity", "1"),
                ("ending_inventory", "39"),
                ("safety_stock", "5"),
                ("stock_status", "in stock"),
            ],
            "inventory_snapshots.csv",
            1,
        ),
    ];

    b.returns = vec![
        raw(
            &[
                ("return_id", "R001"),
                ("return_date", "2025-01-21"),
                ("product_id", "P001"),
                ("store_id", "S001"),
                ("original_ref", "T100"),
                ("quantity", "1"),
                ("refund_amount", "19.99"),
                ("return_reason", "defective"),
                ("return_channel", "in store"),
            ],
            "returns.csv",
            0,
        ),
        // 线上退货: 无门店
        raw(
            &[
                ("return_id", "R002"),
                ("return_date", "2025-01-21"),
                ("product_id", "P001"),
                ("original_ref", "O500"),
                ("quantity", "1"),
                ("refund_amount", "19.99"),
                ("return_reason", "too small"),
                ("return_channel", "mail"),
            ],
            "returns.csv",
            1,
        ),
    ];

    b
}

fn run_sample(conn: &Arc<Mutex<Connection>>) -> RunSummary {
    let runner = PipelineRunner::new(Arc::clone(conn), ConformanceConfig::default());
    runner.run(&sample_batches()).unwrap()
}

#[test]
fn test_full_batch_end_to_end() {
    let (_tmp, conn) = create_test_db().unwrap();
    let summary = run_sample(&conn);

    // 行数守恒: 清洗层 1:1 保全原始行
    assert_eq!(summary.raw_rows, 12);
    assert_eq!(summary.clean_rows, 12);

    // 维度: 商品 2 门店 2 日期 2（2025-01-20 / 2025-01-21）
    assert_eq!(summary.dim_products, 2);
    assert_eq!(summary.dim_stores, 2);
    assert_eq!(summary.dim_dates, 2);

    // 事实: 销售明细 = POS 2 行 + 电商 1 行（P999 行隔离）
    assert_eq!(summary.fact_pos_transactions, 1);
    assert_eq!(summary.fact_ecom_orders, 1);
    assert_eq!(summary.fact_sales_lines, 3);
    assert_eq!(summary.fact_inventory_snapshots, 2);
    assert_eq!(summary.fact_returns, 2);
    assert_eq!(summary.quarantined, 1);

    assert_eq!(table_count(&conn, "clean_record"), 12);
    assert_eq!(table_count(&conn, "fact_sales_line"), 3);
    assert_eq!(table_count(&conn, "quarantine_record"), 1);
}

#[test]
fn test_controlled_vocab_lands_in_warehouse() {
    let (_tmp, conn) = create_test_db().unwrap();
    run_sample(&conn);

    let guard = conn.lock().unwrap();
    let (region, store_type): (String, String) = guard
        .query_row(
            "SELECT region, store_type FROM dim_store WHERE store_id = 'S001'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(region, "NORTHWEST");
    assert_eq!(store_type, "FLAGSHIP");

    let channel: String = guard
        .query_row(
            "SELECT channel FROM fact_ecom_order WHERE order_id = 'O500'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(channel, "MOBILE_APP");

    // 电商净收入 = 39.98 - 5.00 + 6.99
    let net: f64 = guard
        .query_row(
            "SELECT net_revenue FROM fact_ecom_order WHERE order_id = 'O500'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!((net - 41.97).abs() < 1e-9);
}

#[test]
fn test_unresolved_reference_quarantined_and_backflagged() {
    let (_tmp, conn) = create_test_db().unwrap();
    run_sample(&conn);

    let guard = conn.lock().unwrap();

    // 隔离区留痕
    let reason: String = guard
        .query_row(
            "SELECT reason FROM quarantine_record WHERE dataset = 'POS_LINE_ITEMS'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(reason.contains("P999"));

    // 清洗行仍在，且回写了标志
    let flags_json: String = guard
        .query_row(
            "SELECT flags FROM clean_record
             WHERE dataset = 'POS_LINE_ITEMS' AND natural_key = 'T100#3'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let flags = FlagSet::from_json(&flags_json);
    assert!(flags.contains(QualityFlag::UnresolvedReference));

    // 事实表中无此行
    let n: i64 = guard
        .query_row(
            "SELECT COUNT(*) FROM fact_sales_line WHERE transaction_ref = 'T100' AND line_number = 3",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn test_negative_margin_product_promoted_with_flag() {
    let (_tmp, conn) = create_test_db().unwrap();
    run_sample(&conn);

    let guard = conn.lock().unwrap();
    // 负毛利商品照常晋级维度，毛利保留负值
    let margin: f64 = guard
        .query_row(
            "SELECT margin FROM dim_product WHERE product_id = 'P002'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!((margin - (-2.0)).abs() < 1e-9);

    let flags_json: String = guard
        .query_row(
            "SELECT flags FROM clean_record WHERE dataset = 'PRODUCTS' AND natural_key = 'P002'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(FlagSet::from_json(&flags_json).contains(QualityFlag::NegativeAmount));
}

#[test]
fn test_duplicate_natural_key_later_arrival_wins() {
    let (_tmp, conn) = create_test_db().unwrap();

    let mut b = RawBatches::empty("B001", batch_time());
    b.products = vec![
        raw_at(
            &[("product_id", "P001"), ("product_name", "Old Name")],
            "products.csv",
            0,
            batch_time(),
        ),
        raw_at(
            &[("product_id", "P001"), ("product_name", "New Name")],
            "products.csv",
            1,
            batch_time() + Duration::hours(1),
        ),
    ];

    let runner = PipelineRunner::new(Arc::clone(&conn), ConformanceConfig::default());
    let summary = runner.run(&b).unwrap();

    // 两行都保留在清洗层，仅一行 current
    assert_eq!(summary.clean_rows, 2);
    assert_eq!(summary.dim_products, 1);

    let guard = conn.lock().unwrap();
    let name: String = guard
        .query_row(
            "SELECT product_name FROM dim_product WHERE product_id = 'P001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "New Name");

    let loser_flags: String = guard
        .query_row(
            "SELECT flags FROM clean_record WHERE dataset = 'PRODUCTS' AND record_seq = 0",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(FlagSet::from_json(&loser_flags).contains(QualityFlag::DuplicateRecord));
}

#[test]
fn test_duplicate_pos_transaction_single_current_single_fact() {
    let (_tmp, conn) = create_test_db().unwrap();

    // 同一 transaction_id 两次到达，一小时后的重提交金额不同
    let mut b = RawBatches::empty("B001", batch_time());
    b.stores = vec![raw(
        &[("store_id", "S001"), ("store_name", "Downtown")],
        "stores.csv",
        0,
    )];
    b.pos_transactions = vec![
        raw_at(
            &[
                ("transaction_id", "T100"),
                ("store_id", "S001"),
                ("transaction_date", "2025-01-20"),
                ("total_amount", "10.00"),
            ],
            "pos_transactions.csv",
            0,
            batch_time(),
        ),
        raw_at(
            &[
                ("transaction_id", "T100"),
                ("store_id", "S001"),
                ("transaction_date", "2025-01-20"),
                ("total_amount", "20.00"),
            ],
            "pos_transactions.csv",
            1,
            batch_time() + Duration::hours(1),
        ),
    ];

    let runner = PipelineRunner::new(Arc::clone(&conn), ConformanceConfig::default());
    let summary = runner.run(&b).unwrap();

    // 两行都保留在清洗层，事实表恰好一行
    assert_eq!(summary.clean_rows, 3);
    assert_eq!(summary.fact_pos_transactions, 1);

    let guard = conn.lock().unwrap();
    let current_count: i64 = guard
        .query_row(
            "SELECT COUNT(*) FROM clean_record
             WHERE dataset = 'POS_TRANSACTIONS' AND natural_key = 'T100' AND is_current = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(current_count, 1);

    // 事实度量取后到者重算净额（20.00，无折扣无税）
    let (fact_count, net): (i64, f64) = guard
        .query_row(
            "SELECT COUNT(*), MAX(net_amount) FROM fact_pos_transaction
             WHERE transaction_id = 'T100'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(fact_count, 1);
    assert!((net - 20.00).abs() < 1e-9);

    // 落选行打重复标志
    let loser_flags: String = guard
        .query_row(
            "SELECT flags FROM clean_record
             WHERE dataset = 'POS_TRANSACTIONS' AND record_seq = 0",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(FlagSet::from_json(&loser_flags).contains(QualityFlag::DuplicateRecord));
}

#[test]
fn test_rerun_produces_identical_warehouse() {
    let (_tmp, conn) = create_test_db().unwrap();
    let batches = sample_batches();
    let runner = PipelineRunner::new(Arc::clone(&conn), ConformanceConfig::default());

    let dumps = |conn: &Arc<Mutex<Connection>>| -> Vec<Vec<String>> {
        vec![
            dump_rows(
                conn,
                "SELECT dataset, record_seq, batch_id, loaded_at, source_file, natural_key,
                        is_current, flags, payload
                 FROM clean_record ORDER BY dataset, record_seq",
            ),
            dump_rows(
                conn,
                "SELECT dataset, natural_key, reason, flag, batch_id, record_seq
                 FROM quarantine_record ORDER BY dataset, record_seq",
            ),
            dump_rows(conn, "SELECT * FROM dim_date ORDER BY date_key"),
            dump_rows(conn, "SELECT * FROM dim_product ORDER BY product_key"),
            dump_rows(conn, "SELECT * FROM dim_store ORDER BY store_key"),
            dump_rows(
                conn,
                "SELECT source_system, transaction_ref, line_number, date_key, product_key,
                        store_key, quantity, unit_price, discount_amount, line_total,
                        batch_id, record_seq
                 FROM fact_sales_line ORDER BY source_system, transaction_ref, line_number",
            ),
            dump_rows(
                conn,
                "SELECT date_key, product_key, store_key, beginning_inventory, received_quantity,
                        sold_quantity, ending_inventory, safety_stock, stock_status,
                        below_safety_stock, batch_id, record_seq
                 FROM fact_inventory_snapshot ORDER BY date_key, product_key, store_key",
            ),
        ]
    };

    let first = runner.run(&batches).unwrap();
    let snapshot_one = dumps(&conn);

    let second = runner.run(&batches).unwrap();
    let snapshot_two = dumps(&conn);

    assert_eq!(first, second);
    assert_eq!(snapshot_one, snapshot_two);
}

#[test]
fn test_surrogate_keys_stable_across_batches() {
    let (_tmp, conn) = create_test_db().unwrap();
    let runner = PipelineRunner::new(Arc::clone(&conn), ConformanceConfig::default());

    // 批次 1: 只有 P001
    let mut b1 = RawBatches::empty("B001", batch_time());
    b1.products = vec![raw(&[("product_id", "P001")], "products.csv", 0)];
    runner.run(&b1).unwrap();

    // 批次 2: P002 新到，P001 不再出现，但旧键必须保持可解析
    let mut b2 = RawBatches::empty("B001", batch_time());
    b2.products = vec![raw(&[("product_id", "P002")], "products.csv", 0)];
    b2.stores = vec![raw(
        &[("store_id", "S001"), ("store_name", "Downtown")],
        "stores.csv",
        0,
    )];
    b2.pos_transactions = vec![raw(
        &[
            ("transaction_id", "T200"),
            ("store_id", "S001"),
            ("transaction_date", "2025-01-22"),
            ("total_amount", "19.99"),
        ],
        "pos_transactions.csv",
        0,
    )];
    // 引用批次 1 的商品: 维度键表持久，装配必须成功
    b2.pos_line_items = vec![raw(
        &[
            ("transaction_id", "T200"),
            ("line_number", "1"),
            ("transaction_date", "2025-01-22"),
            ("store_id", "S001"),
            ("product_id", "P001"),
            ("quantity", "1"),
            ("unit_price", "19.99"),
        ],
        "pos_line_items.csv",
        0,
    )];
    let summary = runner.run(&b2).unwrap();
    assert_eq!(summary.fact_sales_lines, 1);
    assert_eq!(summary.quarantined, 0);

    let guard = conn.lock().unwrap();
    let p001_key: i64 = guard
        .query_row(
            "SELECT product_key FROM dim_product WHERE product_id = 'P001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let p002_key: i64 = guard
        .query_row(
            "SELECT product_key FROM dim_product WHERE product_id = 'P002'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    // 既有键不变，新键单调续分
    assert_eq!(p001_key, 1);
    assert_eq!(p002_key, 2);

    let fact_product_key: i64 = guard
        .query_row(
            "SELECT product_key FROM fact_sales_line WHERE transaction_ref = 'T200'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(fact_product_key, p001_key);
}

#[test]
fn test_at_risk_projection_after_run() {
    let (_tmp, conn) = create_test_db().unwrap();
    run_sample(&conn);

    let projections = Projections::new(Arc::clone(&conn));
    let rows = projections.at_risk_inventory().unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_id, "P001");
    assert_eq!(rows[0].store_id, "S001");
    assert_eq!(rows[0].ending_inventory, 5);
    assert_eq!(rows[0].safety_stock, 10);

    let summary = projections.quarantine_summary().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].dataset, "POS_LINE_ITEMS");
    assert_eq!(summary[0].flag, "UNRESOLVED_REFERENCE");
    assert_eq!(summary[0].record_count, 1);
}
