// ==========================================
// 零售数仓一致性引擎 - 门店主数据一致性规则
// ==========================================
// 依据: Field_Rules_v0.2.md - stores
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::engine::Conformable;
use crate::conform::field_parser::{parse_row, FieldRule, FieldType};
use crate::conform::normalizer::{normalize, vocab};
use crate::domain::record::RawRecord;
use crate::domain::types::{Dataset, FlagSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// StoreClean - 门店主数据（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreClean {
    pub store_id: Option<String>,       // 自然键
    pub store_name: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,         // 受控词表
    pub store_type: Option<String>,     // 受控词表
    pub opened_date: Option<NaiveDate>,
}

/// 门店主数据字段规则表
const STORE_RULES: &[FieldRule] = &[
    FieldRule::required("store_id", FieldType::Reference),
    FieldRule::required("store_name", FieldType::Text),
    FieldRule::optional("city", FieldType::Text),
    FieldRule::optional("region", FieldType::Text),
    FieldRule::optional("store_type", FieldType::Text),
    FieldRule::optional("opened_date", FieldType::Date),
];

pub struct StoreConformer;

impl Conformable for StoreConformer {
    type Clean = StoreClean;
    const DATASET: Dataset = Dataset::Stores;

    fn conform(raw: &RawRecord, _config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, flags) = parse_row(raw, STORE_RULES);

        let store_id = row.text("store_id");
        let clean = StoreClean {
            store_id: store_id.clone(),
            store_name: row.text("store_name"),
            city: row.text("city"),
            region: normalize(row.text("region").as_deref(), vocab::REGION),
            store_type: normalize(row.text("store_type").as_deref(), vocab::STORE_TYPE),
            opened_date: row.date("opened_date"),
        };

        (clean, store_id, flags)
    }
}
