// ==========================================
// 零售数仓一致性引擎 - POS 数据集一致性规则
// ==========================================
// 依据: Field_Rules_v0.2.md - pos_transactions / pos_line_items
// 口径: POS 净额 = 总额 - 折扣 + 税
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::engine::Conformable;
use crate::conform::field_parser::{parse_row, FieldRule, FieldType};
use crate::conform::normalizer::{normalize, vocab};
use crate::conform::reconciler::Reconciler;
use crate::domain::record::RawRecord;
use crate::domain::types::{Dataset, FlagSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PosTransactionClean - POS 交易头（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosTransactionClean {
    pub transaction_id: Option<String>,    // 自然键
    pub store_id: Option<String>,          // 门店引用
    pub transaction_date: Option<NaiveDate>,
    pub payment_method: Option<String>,    // 受控词表
    pub gross_amount: Option<f64>,         // 上报交易总额
    pub discount_amount: f64,              // 折扣（可加，缺失为 0）
    pub tax_amount: f64,                   // 税额（可加，缺失为 0）
    pub reported_net_amount: Option<f64>,  // 上报净额（仅审计）
    pub net_amount: Option<f64>,           // 重算净额（下游采信）
}

/// POS 交易头字段规则表
const POS_TRANSACTION_RULES: &[FieldRule] = &[
    FieldRule::required("transaction_id", FieldType::Reference),
    FieldRule::required("store_id", FieldType::Reference),
    FieldRule::required("transaction_date", FieldType::Date),
    FieldRule::optional("payment_method", FieldType::Text),
    FieldRule::required("total_amount", FieldType::Money),
    FieldRule::optional("discount_amount", FieldType::AdditiveMoney),
    FieldRule::optional("tax_amount", FieldType::AdditiveMoney),
    FieldRule::optional("net_amount", FieldType::Money),
];

pub struct PosTransactionConformer;

impl Conformable for PosTransactionConformer {
    type Clean = PosTransactionClean;
    const DATASET: Dataset = Dataset::PosTransactions;

    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, mut flags) = parse_row(raw, POS_TRANSACTION_RULES);
        let reconciler = Reconciler::new(config.reconciliation_tolerance);

        let gross_amount = row.money("total_amount");
        let discount_amount = row.money_or_zero("discount_amount");
        let tax_amount = row.money_or_zero("tax_amount");
        let reported_net_amount = row.money("net_amount");

        // 总额缺失时无法重算，净额置空（标志已由规则表打上）
        let net_amount = gross_amount.map(|gross| {
            let calculated = reconciler.pos_net_amount(gross, discount_amount, tax_amount);
            reconciler.check(calculated, reported_net_amount, &mut flags)
        });

        let transaction_id = row.text("transaction_id");
        let clean = PosTransactionClean {
            transaction_id: transaction_id.clone(),
            store_id: row.text("store_id"),
            transaction_date: row.date("transaction_date"),
            payment_method: normalize(row.text("payment_method").as_deref(), vocab::PAYMENT_METHOD),
            gross_amount,
            discount_amount,
            tax_amount,
            reported_net_amount,
            net_amount,
        };

        (clean, transaction_id, flags)
    }
}

// ==========================================
// PosLineClean - POS 交易明细（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosLineClean {
    pub transaction_id: Option<String>,   // 粒度组成
    pub line_number: Option<i64>,         // 粒度组成
    pub transaction_date: Option<NaiveDate>,
    pub store_id: Option<String>,         // 门店引用
    pub product_id: Option<String>,       // 商品引用（事实必需）
    pub quantity: Option<i64>,            // 销售数量
    pub unit_price: Option<f64>,          // 单价
    pub discount_amount: f64,             // 行折扣
    pub reported_line_total: Option<f64>, // 上报行总额（仅审计）
    pub line_total: Option<f64>,          // 重算行总额（下游采信）
}

/// POS 交易明细字段规则表
const POS_LINE_RULES: &[FieldRule] = &[
    FieldRule::required("transaction_id", FieldType::Reference),
    FieldRule::required("line_number", FieldType::Quantity),
    FieldRule::required("transaction_date", FieldType::Date),
    FieldRule::optional("store_id", FieldType::Reference),
    FieldRule::required("product_id", FieldType::Reference),
    FieldRule::required("quantity", FieldType::Quantity),
    FieldRule::required("unit_price", FieldType::Money),
    FieldRule::optional("discount_amount", FieldType::AdditiveMoney),
    FieldRule::optional("line_total", FieldType::Money),
];

pub struct PosLineConformer;

impl Conformable for PosLineConformer {
    type Clean = PosLineClean;
    const DATASET: Dataset = Dataset::PosLineItems;

    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, mut flags) = parse_row(raw, POS_LINE_RULES);
        let reconciler = Reconciler::new(config.reconciliation_tolerance);

        let quantity = row.int("quantity");
        let unit_price = row.money("unit_price");
        let reported_line_total = row.money("line_total");

        let line_total = match (quantity, unit_price) {
            (Some(qty), Some(price)) => {
                let calculated = reconciler.line_total(qty, price);
                Some(reconciler.check(calculated, reported_line_total, &mut flags))
            }
            _ => None,
        };

        let transaction_id = row.text("transaction_id");
        let line_number = row.int("line_number");

        // 自然键: 交易号 + 行号
        let natural_key = match (&transaction_id, line_number) {
            (Some(txn), Some(line)) => Some(format!("{}#{}", txn, line)),
            _ => None,
        };

        let clean = PosLineClean {
            transaction_id,
            line_number,
            transaction_date: row.date("transaction_date"),
            store_id: row.text("store_id"),
            product_id: row.text("product_id"),
            quantity,
            unit_price,
            discount_amount: row.money_or_zero("discount_amount"),
            reported_line_total,
            line_total,
        };

        (clean, natural_key, flags)
    }
}
