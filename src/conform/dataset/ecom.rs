// ==========================================
// 零售数仓一致性引擎 - 电商数据集一致性规则
// ==========================================
// 依据: Field_Rules_v0.2.md - ecom_orders / ecom_line_items
// 口径: 电商净收入 = 总额 - 折扣 + 运费
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::engine::Conformable;
use crate::conform::field_parser::{parse_row, FieldRule, FieldType};
use crate::conform::normalizer::{normalize, vocab};
use crate::conform::reconciler::Reconciler;
use crate::domain::record::RawRecord;
use crate::domain::types::{Dataset, FlagSet};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// EcomOrderClean - 电商订单（清洗后）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcomOrderClean {
    pub order_id: Option<String>,         // 自然键
    pub order_date: Option<NaiveDate>,
    pub order_timestamp: Option<DateTime<Utc>>, // 下单时间（审计，可缺失）
    pub channel: Option<String>,          // 受控词表
    pub device_type: Option<String>,      // 受控词表
    pub order_status: Option<String>,     // 受控词表
    pub payment_method: Option<String>,   // 受控词表
    pub gross_amount: Option<f64>,        // 上报订单总额
    pub discount_amount: f64,             // 折扣
    pub shipping_fee: f64,                // 运费
    pub reported_net_revenue: Option<f64>,// 上报净收入（仅审计）
    pub net_revenue: Option<f64>,         // 重算净收入（下游采信）
}

/// 电商订单字段规则表
const ECOM_ORDER_RULES: &[FieldRule] = &[
    FieldRule::required("order_id", FieldType::Reference),
    FieldRule::required("order_date", FieldType::Date),
    FieldRule::optional("order_timestamp", FieldType::DateTime),
    FieldRule::optional("channel", FieldType::Text),
    FieldRule::optional("device_type", FieldType::Text),
    FieldRule::optional("order_status", FieldType::Text),
    FieldRule::optional("payment_method", FieldType::Text),
    FieldRule::required("total_amount", FieldType::Money),
    FieldRule::optional("discount_amount", FieldType::AdditiveMoney),
    FieldRule::optional("shipping_fee", FieldType::AdditiveMoney),
    FieldRule::optional("net_revenue", FieldType::Money),
];

pub struct EcomOrderConformer;

impl Conformable for EcomOrderConformer {
    type Clean = EcomOrderClean;
    const DATASET: Dataset = Dataset::EcomOrders;

    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, mut flags) = parse_row(raw, ECOM_ORDER_RULES);
        let reconciler = Reconciler::new(config.reconciliation_tolerance);

        let gross_amount = row.money("total_amount");
        let discount_amount = row.money_or_zero("discount_amount");
        let shipping_fee = row.money_or_zero("shipping_fee");
        let reported_net_revenue = row.money("net_revenue");

        let net_revenue = gross_amount.map(|gross| {
            let calculated = reconciler.ecom_net_revenue(gross, discount_amount, shipping_fee);
            reconciler.check(calculated, reported_net_revenue, &mut flags)
        });

        let order_id = row.text("order_id");
        let clean = EcomOrderClean {
            order_id: order_id.clone(),
            order_date: row.date("order_date"),
            order_timestamp: row.datetime("order_timestamp"),
            channel: normalize(row.text("channel").as_deref(), vocab::CHANNEL),
            device_type: normalize(row.text("device_type").as_deref(), vocab::DEVICE_TYPE),
            order_status: normalize(row.text("order_status").as_deref(), vocab::ORDER_STATUS),
            payment_method: normalize(row.text("payment_method").as_deref(), vocab::PAYMENT_METHOD),
            gross_amount,
            discount_amount,
            shipping_fee,
            reported_net_revenue,
            net_revenue,
        };

        (clean, order_id, flags)
    }
}

// ==========================================
// EcomLineClean - 电商订单明细（清洗后）
// ==========================================
// 电商明细无门店引用（线上事件，store_key 合法为 NULL）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcomLineClean {
    pub order_id: Option<String>,         // 粒度组成
    pub line_number: Option<i64>,         // 粒度组成
    pub order_date: Option<NaiveDate>,
    pub product_id: Option<String>,       // 商品引用（事实必需）
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub discount_amount: f64,
    pub reported_line_total: Option<f64>, // 上报行总额（仅审计）
    pub line_total: Option<f64>,          // 重算行总额（下游采信）
}

/// 电商订单明细字段规则表
const ECOM_LINE_RULES: &[FieldRule] = &[
    FieldRule::required("order_id", FieldType::Reference),
    FieldRule::required("line_number", FieldType::Quantity),
    FieldRule::required("order_date", FieldType::Date),
    FieldRule::required("product_id", FieldType::Reference),
    FieldRule::required("quantity", FieldType::Quantity),
    FieldRule::required("unit_price", FieldType::Money),
    FieldRule::optional("discount_amount", FieldType::AdditiveMoney),
    FieldRule::optional("line_total", FieldType::Money),
];

pub struct EcomLineConformer;

impl Conformable for EcomLineConformer {
    type Clean = EcomLineClean;
    const DATASET: Dataset = Dataset::EcomLineItems;

    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet) {
        let (row, mut flags) = parse_row(raw, ECOM_LINE_RULES);
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

        let order_id = row.text("order_id");
        let line_number = row.int("line_number");
        let natural_key = match (&order_id, line_number) {
            (Some(order), Some(line)) => Some(format!("{}#{}", order, line)),
            _ => None,
        };

        let clean = EcomLineClean {
            order_id,
            line_number,
            order_date: row.date("order_date"),
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
