// ==========================================
// 零售数仓一致性引擎 - 商品主数据一致性规则
// ==========================================
// 依据: Field_Rules_v0.2.md - products
// 红线: 负毛利打标志但不阻断晋级（亏损 SKU 需要对业务可见）
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::engine::Conformable;
use crate::conform::field_parser::{parse_row, FieldRule, FieldType};
use crate::conform::normalizer::{normalize, vocab};
use crate::conform::reconciler::Reconciler;
use crate::domain::record::RawRecord;
use crate::domain::types::{Dataset, FlagSet};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductClean - 商品主数据（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductClean {
    pub product_id: Option<String>,     // 自然键
    pub product_name: Option<String>,
    pub category: Option<String>,       // TRIM + UPPER
    pub brand: Option<String>,
    pub season: Option<String>,         // 受控词表
    pub status: Option<String>,         // 受控词表
    pub unit_price: Option<f64>,        // 标准售价
    pub unit_cost: Option<f64>,         // 标准成本
    pub margin: Option<f64>,            // 重算毛利（可为负）
}

/// 商品主数据字段规则表
const PRODUCT_RULES: &[FieldRule] = &[
    FieldRule::required("product_id", FieldType::Reference),
    FieldRule::required("product_name", FieldType::Text),
    FieldRule::optional("category", FieldType::UpperText),
    FieldRule::optional("brand", FieldType::Text),
    FieldRule::optional("season", FieldType::Text),
    FieldRule::optional("status", FieldType::Text),
    FieldRule::optional("unit_price", FieldType::Money),
    FieldRule::optional("unit_cost", FieldType::Money),
];

pub struct ProductConformer;

impl Conformable for ProductConformer {
    type Clean = ProductClean;
    const DATASET: Dataset = Dataset::Products;

    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, mut flags) = parse_row(raw, PRODUCT_RULES);
        let reconciler = Reconciler::new(config.reconciliation_tolerance);

        let unit_price = row.money("unit_price");
        let unit_cost = row.money("unit_cost");
        let margin = match (unit_price, unit_cost) {
            (Some(price), Some(cost)) => Some(reconciler.margin(price, cost, &mut flags)),
            _ => None,
        };

        let product_id = row.text("product_id");
        let clean = ProductClean {
            product_id: product_id.clone(),
            product_name: row.text("product_name"),
            category: row.text("category"),
            brand: row.text("brand"),
            season: normalize(row.text("season").as_deref(), vocab::PRODUCT_SEASON),
            status: normalize(row.text("status").as_deref(), vocab::PRODUCT_STATUS),
            unit_price,
            unit_cost,
            margin,
        };

        (clean, product_id, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Provenance;
    use crate::domain::types::QualityFlag;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn raw_of(pairs: &[(&str, &str)]) -> RawRecord {
        let mut fields = BTreeMap::new();
        for (k, v) in pairs {
            fields.insert(k.to_string(), v.to_string());
        }
        RawRecord::new(
            fields,
            Provenance {
                batch_id: "B001".to_string(),
                loaded_at: Utc::now(),
                source_file: "products.csv".to_string(),
                record_seq: 1,
            },
        )
    }

    #[test]
    fn test_negative_margin_flagged_not_dropped() {
        // 售价 10.00 成本 12.00 → 毛利 -2.00，仍可晋级
        let raw = raw_of(&[
            ("product_id", "P001"),
            ("product_name", "Loss Leader Tee"),
            ("unit_price", "10.00"),
            ("unit_cost", "12.00"),
        ]);

        let (clean, key, flags) = ProductConformer::conform(&raw, &ConformanceConfig::default());

        assert_eq!(key, Some("P001".to_string()));
        assert_eq!(clean.margin, Some(-2.00));
        assert!(flags.contains(QualityFlag::NegativeAmount));
    }

    #[test]
    fn test_category_uppercased_vocab_normalized() {
        let raw = raw_of(&[
            ("product_id", "P002"),
            ("product_name", "Parka"),
            ("category", "outerwear"),
            ("season", "winter collection"),
            ("status", "active"),
        ]);

        let (clean, _, _) = ProductConformer::conform(&raw, &ConformanceConfig::default());

        assert_eq!(clean.category, Some("OUTERWEAR".to_string()));
        assert_eq!(clean.season, Some("WINTER".to_string()));
        assert_eq!(clean.status, Some("ACTIVE".to_string()));
    }

    #[test]
    fn test_missing_product_id_never_promoted() {
        let raw = raw_of(&[("product_name", "Orphan")]);

        let (_, key, flags) = ProductConformer::conform(&raw, &ConformanceConfig::default());

        assert_eq!(key, None);
        assert!(flags.contains(QualityFlag::MalformedReference));
    }
}
