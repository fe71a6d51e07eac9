// ==========================================
// 零售数仓一致性引擎 - 维度 Repository
// ==========================================
// 依据: dimensional_model_v0.1.md - 一致性维度持久化
// 职责: 维度表 CRUD 与键表装载
// 红线: 维度表跨批持久，只 upsert 不清空；代理键由解析器管理，
//       本层只负责装载与写回
// ==========================================

use crate::domain::dimension::{DateDimension, ProductDimension, StoreDimension};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// DimensionRepository
// ==========================================
pub struct DimensionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DimensionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn load_key_map(&self, sql: &str) -> RepositoryResult<HashMap<String, i64>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (natural_key, surrogate_key) = row?;
            map.insert(natural_key, surrogate_key);
        }
        Ok(map)
    }

    /// 商品键表（自然键 → 代理键）；重载时交给解析器继续分配
    pub fn load_product_key_map(&self) -> RepositoryResult<HashMap<String, i64>> {
        self.load_key_map("SELECT product_id, product_key FROM dim_product")
    }

    /// 门店键表（自然键 → 代理键）
    pub fn load_store_key_map(&self) -> RepositoryResult<HashMap<String, i64>> {
        self.load_key_map("SELECT store_id, store_key FROM dim_store")
    }

    /// 商品维度 upsert（SCD Type 1：同键覆盖描述属性，代理键不变）
    pub fn upsert_products(&self, dims: &[ProductDimension]) -> RepositoryResult<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO dim_product (
                    product_key, product_id, product_name, category, brand,
                    season, status, unit_price, unit_cost, margin,
                    batch_id, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for dim in dims {
                stmt.execute(params![
                    dim.product_key,
                    dim.product_id,
                    dim.product_name,
                    dim.category,
                    dim.brand,
                    dim.season,
                    dim.status,
                    dim.unit_price,
                    dim.unit_cost,
                    dim.margin,
                    dim.batch_id,
                    dim.updated_at,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 门店维度 upsert（SCD Type 1）
    pub fn upsert_stores(&self, dims: &[StoreDimension]) -> RepositoryResult<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO dim_store (
                    store_key, store_id, store_name, city, region,
                    store_type, opened_date, batch_id, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for dim in dims {
                stmt.execute(params![
                    dim.store_key,
                    dim.store_id,
                    dim.store_name,
                    dim.city,
                    dim.region,
                    dim.store_type,
                    dim.opened_date,
                    dim.batch_id,
                    dim.updated_at,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 日期维度 upsert（智能键 yyyymmdd，属性可确定性重建）
    pub fn upsert_dates(&self, dims: &[DateDimension]) -> RepositoryResult<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO dim_date (
                    date_key, full_date, year, quarter, month, month_name,
                    day_of_month, day_name, week_of_year, is_weekend
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for dim in dims {
                stmt.execute(params![
                    dim.date_key,
                    dim.full_date,
                    dim.year,
                    dim.quarter,
                    dim.month,
                    dim.month_name,
                    dim.day_of_month,
                    dim.day_name,
                    dim.week_of_year,
                    dim.is_weekend,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }
}
