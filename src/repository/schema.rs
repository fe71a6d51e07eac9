// ==========================================
// 零售数仓一致性引擎 - 数仓建表 DDL
// ==========================================
// 依据: dimensional_model_v0.1.md - 星型模型物理设计
// 红线: 事实表粒度元组 UNIQUE 约束（内存去重之外的落库兜底）
// 红线: 维度表代理键显式写入（不依赖 AUTOINCREMENT），键表由解析器管理
// 分层: 清洗层 / 隔离区 逐批重建；维度表跨批持久
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- ===== 版本表 =====
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);

-- ===== 清洗层（逐批重建，1:1 保全原始行） =====
CREATE TABLE IF NOT EXISTS clean_record (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset     TEXT NOT NULL,
    record_seq  INTEGER NOT NULL,
    batch_id    TEXT NOT NULL,
    loaded_at   TEXT NOT NULL,
    source_file TEXT NOT NULL,
    natural_key TEXT,
    is_current  INTEGER NOT NULL DEFAULT 0,
    flags       TEXT NOT NULL DEFAULT '[]',
    payload     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_clean_record_dataset
    ON clean_record(dataset);
CREATE INDEX IF NOT EXISTS idx_clean_record_natural_key
    ON clean_record(dataset, natural_key);

-- ===== 隔离区（逐批重建，事实装配失败留痕） =====
CREATE TABLE IF NOT EXISTS quarantine_record (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset     TEXT NOT NULL,
    natural_key TEXT,
    reason      TEXT NOT NULL,
    flag        TEXT NOT NULL,
    batch_id    TEXT NOT NULL,
    record_seq  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_quarantine_dataset
    ON quarantine_record(dataset);

-- ===== 一致性维度（跨批持久，SCD Type 1 覆盖更新） =====
CREATE TABLE IF NOT EXISTS dim_date (
    date_key     INTEGER PRIMARY KEY,
    full_date    TEXT NOT NULL,
    year         INTEGER NOT NULL,
    quarter      INTEGER NOT NULL,
    month        INTEGER NOT NULL,
    month_name   TEXT NOT NULL,
    day_of_month INTEGER NOT NULL,
    day_name     TEXT NOT NULL,
    week_of_year INTEGER NOT NULL,
    is_weekend   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_product (
    product_key  INTEGER PRIMARY KEY,
    product_id   TEXT NOT NULL UNIQUE,
    product_name TEXT,
    category     TEXT,
    brand        TEXT,
    season       TEXT,
    status       TEXT,
    unit_price   REAL,
    unit_cost    REAL,
    margin       REAL,
    batch_id     TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_store (
    store_key   INTEGER PRIMARY KEY,
    store_id    TEXT NOT NULL UNIQUE,
    store_name  TEXT,
    city        TEXT,
    region      TEXT,
    store_type  TEXT,
    opened_date TEXT,
    batch_id    TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- ===== 事实表（逐批重建，粒度 UNIQUE 兜底） =====
CREATE TABLE IF NOT EXISTS fact_pos_transaction (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_id  TEXT NOT NULL UNIQUE,
    date_key        INTEGER NOT NULL REFERENCES dim_date(date_key),
    store_key       INTEGER NOT NULL REFERENCES dim_store(store_key),
    payment_method  TEXT NOT NULL,
    gross_amount    REAL NOT NULL,
    discount_amount REAL NOT NULL,
    tax_amount      REAL NOT NULL,
    net_amount      REAL NOT NULL,
    batch_id        TEXT NOT NULL,
    record_seq      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS fact_ecom_order (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id        TEXT NOT NULL UNIQUE,
    date_key        INTEGER NOT NULL REFERENCES dim_date(date_key),
    channel         TEXT NOT NULL,
    device_type     TEXT,
    order_status    TEXT NOT NULL,
    payment_method  TEXT,
    gross_amount    REAL NOT NULL,
    discount_amount REAL NOT NULL,
    shipping_fee    REAL NOT NULL,
    net_revenue     REAL NOT NULL,
    batch_id        TEXT NOT NULL,
    record_seq      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS fact_sales_line (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source_system   TEXT NOT NULL,
    transaction_ref TEXT NOT NULL,
    line_number     INTEGER NOT NULL,
    date_key        INTEGER NOT NULL REFERENCES dim_date(date_key),
    product_key     INTEGER NOT NULL REFERENCES dim_product(product_key),
    store_key       INTEGER REFERENCES dim_store(store_key),
    quantity        INTEGER NOT NULL,
    unit_price      REAL NOT NULL,
    discount_amount REAL NOT NULL,
    line_total      REAL NOT NULL,
    batch_id        TEXT NOT NULL,
    record_seq      INTEGER NOT NULL,
    UNIQUE(source_system, transaction_ref, line_number)
);

CREATE TABLE IF NOT EXISTS fact_inventory_snapshot (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    date_key            INTEGER NOT NULL REFERENCES dim_date(date_key),
    product_key         INTEGER NOT NULL REFERENCES dim_product(product_key),
    store_key           INTEGER NOT NULL REFERENCES dim_store(store_key),
    beginning_inventory INTEGER NOT NULL,
    received_quantity   INTEGER NOT NULL,
    sold_quantity       INTEGER NOT NULL,
    ending_inventory    INTEGER NOT NULL,
    safety_stock        INTEGER NOT NULL,
    stock_status        TEXT NOT NULL,
    below_safety_stock  INTEGER NOT NULL,
    batch_id            TEXT NOT NULL,
    record_seq          INTEGER NOT NULL,
    UNIQUE(date_key, product_key, store_key)
);

CREATE TABLE IF NOT EXISTS fact_return (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    return_id      TEXT NOT NULL UNIQUE,
    date_key       INTEGER NOT NULL REFERENCES dim_date(date_key),
    product_key    INTEGER NOT NULL REFERENCES dim_product(product_key),
    store_key      INTEGER REFERENCES dim_store(store_key),
    original_ref   TEXT,
    quantity       INTEGER NOT NULL,
    refund_amount  REAL NOT NULL,
    return_reason  TEXT NOT NULL,
    return_channel TEXT NOT NULL,
    batch_id       TEXT NOT NULL,
    record_seq     INTEGER NOT NULL
);
"#;

/// 建表（幂等；已建过的表不动）
pub fn init_schema(conn: &Connection) -> RepositoryResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [crate::db::CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let version = crate::db::read_schema_version(&conn).unwrap();
        assert_eq!(version, Some(crate::db::CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_sales_line_grain_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO dim_date (date_key, full_date, year, quarter, month, month_name,
                 day_of_month, day_name, week_of_year, is_weekend)
             VALUES (20250120, '2025-01-20', 2025, 1, 1, 'JANUARY', 20, 'MONDAY', 4, 0);
             INSERT INTO dim_product (product_key, product_id, batch_id, updated_at)
             VALUES (1, 'P001', 'B001', '2025-01-20T00:00:00Z');",
        )
        .unwrap();

        let insert = "INSERT INTO fact_sales_line
            (source_system, transaction_ref, line_number, date_key, product_key, store_key,
             quantity, unit_price, discount_amount, line_total, batch_id, record_seq)
            VALUES ('POS', 'T100', 1, 20250120, 1, NULL, 3, 9.99, 0.0, 29.97, 'B001', 0)";
        conn.execute(insert, []).unwrap();
        // 同一粒度元组二次插入必须被拒绝
        assert!(conn.execute(insert, []).is_err());
    }
}
