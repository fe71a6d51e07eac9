// ==========================================
// 零售数仓一致性引擎 - 维度解析器
// ==========================================
// 依据: dimensional_model_v0.1.md - 代理键分配规则
// 红线: 代理键单调分配，永不变更、永不复用；
//       重载前先装载既有键表，保证重跑幂等
// 红线: 仅 current 且自然键合法的记录晋级维度；
//       描述属性覆盖更新（SCD Type 1）
// ==========================================

use crate::conform::dataset::{ProductClean, StoreClean};
use crate::domain::dimension::{DateDimension, ProductDimension, StoreDimension};
use crate::domain::record::CleanRecord;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};

// ==========================================
// DimensionResolver - 代理键解析器
// ==========================================
pub struct DimensionResolver {
    keys: HashMap<String, i64>, // 自然键 → 代理键
    next_key: i64,              // 下一个待分配代理键
}

impl DimensionResolver {
    /// 空解析器（首次建仓）
    pub fn new() -> Self {
        DimensionResolver {
            keys: HashMap::new(),
            next_key: 1,
        }
    }

    /// 从既有键表装载（重载场景；分配从 max+1 继续）
    pub fn with_existing(existing: HashMap<String, i64>) -> Self {
        let next_key = existing.values().copied().max().unwrap_or(0) + 1;
        DimensionResolver {
            keys: existing,
            next_key,
        }
    }

    /// 解析自然键：已知即返回既有代理键，未知则分配新键
    pub fn resolve(&mut self, natural_key: &str) -> i64 {
        if let Some(&key) = self.keys.get(natural_key) {
            return key;
        }
        let key = self.next_key;
        self.next_key += 1;
        self.keys.insert(natural_key.to_string(), key);
        key
    }

    /// 只读查询（事实装配用；未解析即 None，绝不隐式分配）
    pub fn lookup(&self, natural_key: &str) -> Option<i64> {
        self.keys.get(natural_key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for DimensionResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 维度构建（清洗层 → 一致性维度）
// ==========================================

/// 商品维度构建：current 且自然键合法者晋级
pub fn build_product_dimensions(
    clean: &[CleanRecord<ProductClean>],
    resolver: &mut DimensionResolver,
    updated_at: DateTime<Utc>,
) -> Vec<ProductDimension> {
    let mut dims = Vec::new();

    for record in clean {
        if !record.current {
            continue;
        }
        let Some(product_id) = &record.natural_key else {
            continue;
        };
        let product_key = resolver.resolve(product_id);
        let v = &record.values;

        dims.push(ProductDimension {
            product_key,
            product_id: product_id.clone(),
            product_name: v.product_name.clone(),
            category: v.category.clone(),
            brand: v.brand.clone(),
            season: v.season.clone(),
            status: v.status.clone(),
            unit_price: v.unit_price,
            unit_cost: v.unit_cost,
            margin: v.margin,
            batch_id: record.provenance.batch_id.clone(),
            updated_at,
        });
    }

    dims
}

/// 门店维度构建：current 且自然键合法者晋级
pub fn build_store_dimensions(
    clean: &[CleanRecord<StoreClean>],
    resolver: &mut DimensionResolver,
    updated_at: DateTime<Utc>,
) -> Vec<StoreDimension> {
    let mut dims = Vec::new();

    for record in clean {
        if !record.current {
            continue;
        }
        let Some(store_id) = &record.natural_key else {
            continue;
        };
        let store_key = resolver.resolve(store_id);
        let v = &record.values;

        dims.push(StoreDimension {
            store_key,
            store_id: store_id.clone(),
            store_name: v.store_name.clone(),
            city: v.city.clone(),
            region: v.region.clone(),
            store_type: v.store_type.clone(),
            opened_date: v.opened_date,
            batch_id: record.provenance.batch_id.clone(),
            updated_at,
        });
    }

    dims
}

/// 日期维度构建：对批内出现过的全部日期生成日历行
///
/// 代理键为智能键 yyyymmdd，可确定性重建，无需键表
pub fn build_date_dimensions(dates: &BTreeSet<NaiveDate>) -> Vec<DateDimension> {
    dates.iter().map(|d| DateDimension::from_date(*d)).collect()
}
