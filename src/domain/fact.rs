// ==========================================
// 零售数仓一致性引擎 - 事实领域模型
// ==========================================
// 依据: dimensional_model_v0.1.md - 事实表与声明粒度
// 红线: 粒度元组全表唯一（内存 + UNIQUE 约束双重保障）
// 红线: 事实仅从 current 且维度解析通过的清洗记录派生
// ==========================================

use crate::domain::types::{Dataset, QualityFlag, SourceSystem};
use serde::{Deserialize, Serialize};

// ==========================================
// PosTransactionFact - POS 交易事实
// ==========================================
// 粒度: transaction_id（退化维度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosTransactionFact {
    pub transaction_id: String,        // 粒度键（退化维度）
    pub date_key: i64,                 // 日期维度引用
    pub store_key: i64,                // 门店维度引用（POS 必有门店）
    pub payment_method: String,        // 支付方式（受控词表）
    pub gross_amount: f64,             // 上报交易总额
    pub discount_amount: f64,          // 折扣
    pub tax_amount: f64,               // 税额
    pub net_amount: f64,               // 重算净额 = 总额 - 折扣 + 税
    pub batch_id: String,              // 血缘：批次
    pub record_seq: i64,               // 血缘：清洗层摄入序号
}

// ==========================================
// EcomOrderFact - 电商订单事实
// ==========================================
// 粒度: order_id（退化维度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcomOrderFact {
    pub order_id: String,              // 粒度键（退化维度）
    pub date_key: i64,                 // 日期维度引用
    pub channel: String,               // 渠道（受控词表）
    pub device_type: Option<String>,   // 设备类型（可缺失）
    pub order_status: String,          // 订单状态（受控词表）
    pub payment_method: Option<String>,// 支付方式
    pub gross_amount: f64,             // 上报订单总额
    pub discount_amount: f64,          // 折扣
    pub shipping_fee: f64,             // 运费
    pub net_revenue: f64,              // 重算净收入 = 总额 - 折扣 + 运费
    pub batch_id: String,
    pub record_seq: i64,
}

// ==========================================
// SalesLineFact - 统一销售明细事实
// ==========================================
// 多源统一: POS 明细 + 电商明细合并为一张事实表
// 粒度: (source_system, transaction_ref, line_number)
//   判别字段进入粒度，避免两套独立主键体系互相碰撞
// 可选粒度外引用: store_key（电商明细合法为 NULL）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesLineFact {
    pub source_system: SourceSystem,   // 判别字段（粒度组成部分）
    pub transaction_ref: String,       // 交易/订单号（粒度组成部分，退化维度）
    pub line_number: i64,              // 行号（粒度组成部分）
    pub date_key: i64,                 // 日期维度引用（必须）
    pub product_key: i64,              // 商品维度引用（必须）
    pub store_key: Option<i64>,        // 门店维度引用（电商为 NULL）
    pub quantity: i64,                 // 销售数量
    pub unit_price: f64,               // 单价
    pub discount_amount: f64,          // 行折扣
    pub line_total: f64,               // 重算行总额 = 数量 × 单价
    pub batch_id: String,
    pub record_seq: i64,
}

impl SalesLineFact {
    /// 粒度元组（唯一性检查用）
    pub fn grain(&self) -> (SourceSystem, String, i64) {
        (self.source_system, self.transaction_ref.clone(), self.line_number)
    }
}

// ==========================================
// InventorySnapshotFact - 库存快照事实
// ==========================================
// 粒度: (date_key, product_key, store_key) 全部必须
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshotFact {
    pub date_key: i64,                 // 粒度：快照日期
    pub product_key: i64,              // 粒度：商品
    pub store_key: i64,                // 粒度：门店
    pub beginning_inventory: i64,      // 期初库存
    pub received_quantity: i64,        // 入库量
    pub sold_quantity: i64,            // 售出量
    pub ending_inventory: i64,         // 重算期末 = 期初 + 入库 - 售出
    pub safety_stock: i64,             // 安全库存线
    pub stock_status: String,          // 库存状态（受控词表）
    pub below_safety_stock: bool,      // 期末低于安全线（at-risk 投影依据）
    pub batch_id: String,
    pub record_seq: i64,
}

impl InventorySnapshotFact {
    /// 粒度元组（唯一性检查用）
    pub fn grain(&self) -> (i64, i64, i64) {
        (self.date_key, self.product_key, self.store_key)
    }
}

// ==========================================
// ReturnFact - 退货事实
// ==========================================
// 粒度: return_id（退化维度）
// store_key: 线上退货合法为 NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnFact {
    pub return_id: String,             // 粒度键（退化维度）
    pub date_key: i64,                 // 日期维度引用
    pub product_key: i64,              // 商品维度引用（必须）
    pub store_key: Option<i64>,        // 门店维度引用（线上退货为 NULL）
    pub original_ref: Option<String>,  // 原交易/订单号（审计）
    pub quantity: i64,                 // 退货数量
    pub refund_amount: f64,            // 退款金额
    pub return_reason: String,         // 退货原因（受控词表）
    pub return_channel: String,        // 退货渠道（受控词表）
    pub batch_id: String,
    pub record_seq: i64,
}

// ==========================================
// QuarantinedRecord - 隔离记录
// ==========================================
// 用途: 必需维度引用解析失败的事实候选（留痕，绝不静默丢弃）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedRecord {
    pub dataset: Dataset,              // 来源数据集
    pub natural_key: Option<String>,   // 自然键（可解析时）
    pub reason: String,                // 隔离原因（人读）
    pub flag: QualityFlag,             // 回写到清洗行的标志（引用失败为 UNRESOLVED_REFERENCE）
    pub batch_id: String,              // 血缘：批次
    pub record_seq: i64,               // 血缘：清洗层摄入序号
}
