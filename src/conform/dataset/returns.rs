// ==========================================
// 零售数仓一致性引擎 - 退货数据集一致性规则
// ==========================================
// 依据: Field_Rules_v0.2.md - returns
// 说明: 线上退货无门店，store_id 合法缺失
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
// ReturnClean - 退货记录（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnClean {
    pub return_id: Option<String>,       // 自然键
    pub return_date: Option<NaiveDate>,
    pub product_id: Option<String>,      // 商品引用（事实必需）
    pub store_id: Option<String>,        // 门店引用（线上退货缺失）
    pub original_ref: Option<String>,    // 原交易/订单号（审计）
    pub quantity: Option<i64>,           // 退货数量
    pub refund_amount: Option<f64>,      // 退款金额
    pub return_reason: Option<String>,   // 受控词表
    pub return_channel: Option<String>,  // 受控词表
}

/// 退货字段规则表
const RETURN_RULES: &[FieldRule] = &[
    FieldRule::required("return_id", FieldType::Reference),
    FieldRule::required("return_date", FieldType::Date),
    FieldRule::required("product_id", FieldType::Reference),
    FieldRule::optional("store_id", FieldType::Reference),
    FieldRule::optional("original_ref", FieldType::Reference),
    FieldRule::required("quantity", FieldType::Quantity),
    FieldRule::required("refund_amount", FieldType::Money),
    FieldRule::optional("return_reason", FieldType::Text),
    FieldRule::optional("return_channel", FieldType::Text),
];

pub struct ReturnConformer;

impl Conformable for ReturnConformer {
    type Clean = ReturnClean;
    const DATASET: Dataset = Dataset::Returns;

    fn conform(raw: &RawRecord, _config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, flags) = parse_row(raw, RETURN_RULES);

        let return_id = row.text("return_id");
        let clean = ReturnClean {
            return_id: return_id.clone(),
            return_date: row.date("return_date"),
            product_id: row.text("product_id"),
            store_id: row.text("store_id"),
            original_ref: row.text("original_ref"),
            quantity: row.int("quantity"),
            refund_amount: row.money("refund_amount"),
            return_reason: normalize(row.text("return_reason").as_deref(), vocab::RETURN_REASON),
            return_channel: normalize(row.text("return_channel").as_deref(), vocab::RETURN_CHANNEL),
        };

        (clean, return_id, flags)
    }
}
