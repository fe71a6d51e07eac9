// ==========================================
// 零售数仓一致性引擎 - 事实装配器
// ==========================================
// 依据: dimensional_model_v0.1.md - 事实装配与粒度保护
// 红线: 仅 current 记录参与装配；必需维度引用解析失败一律隔离
//       （留痕 + 回写标志），绝不做内连接式静默丢行
// 红线: 粒度元组装配期内存去重，落库另有 UNIQUE 约束兜底
// 多源统一: POS / 电商明细合并为统一销售明细事实，判别字段进粒度
// ==========================================

use crate::conform::dataset::{
    EcomLineClean, EcomOrderClean, InventoryClean, PosLineClean, PosTransactionClean, ReturnClean,
};
use crate::domain::dimension::date_key_of;
use crate::domain::fact::{
    EcomOrderFact, InventorySnapshotFact, PosTransactionFact, QuarantinedRecord, ReturnFact,
    SalesLineFact,
};
use crate::domain::record::CleanRecord;
use crate::domain::types::{Dataset, QualityFlag, SourceSystem};
use crate::warehouse::dimension_resolver::DimensionResolver;
use std::collections::HashSet;
use tracing::debug;

// ==========================================
// AssemblyOutcome - 装配结果
// ==========================================
// facts 与 quarantined 互斥覆盖全部参与装配的 current 记录
#[derive(Debug)]
pub struct AssemblyOutcome<F> {
    pub facts: Vec<F>,
    pub quarantined: Vec<QuarantinedRecord>,
}

impl<F> AssemblyOutcome<F> {
    fn new() -> Self {
        AssemblyOutcome {
            facts: Vec::new(),
            quarantined: Vec::new(),
        }
    }
}

// ==========================================
// FactAssembler - 事实装配器
// ==========================================
pub struct FactAssembler<'a> {
    products: &'a DimensionResolver,
    stores: &'a DimensionResolver,
}

impl<'a> FactAssembler<'a> {
    pub fn new(products: &'a DimensionResolver, stores: &'a DimensionResolver) -> Self {
        FactAssembler { products, stores }
    }

    fn quarantine<T>(
        out: &mut Vec<QuarantinedRecord>,
        dataset: Dataset,
        record: &CleanRecord<T>,
        reason: String,
        flag: QualityFlag,
    ) {
        out.push(QuarantinedRecord {
            dataset,
            natural_key: record.natural_key.clone(),
            reason,
            flag,
            batch_id: record.provenance.batch_id.clone(),
            record_seq: record.provenance.record_seq,
        });
    }

    // ==========================================
    // POS 交易事实（粒度: transaction_id）
    // ==========================================
    pub fn assemble_pos_transactions(
        &self,
        clean: &[CleanRecord<PosTransactionClean>],
    ) -> AssemblyOutcome<PosTransactionFact> {
        let mut out = AssemblyOutcome::new();
        let mut seen_grains: HashSet<String> = HashSet::new();
        let ds = Dataset::PosTransactions;

        for record in clean.iter().filter(|r| r.current) {
            let v = &record.values;

            // current 记录自然键必在（去重器保证），此处仍防御空键
            let Some(transaction_id) = record.natural_key.clone() else {
                continue;
            };

            let Some(date) = v.transaction_date else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "日期引用无法解析: transaction_date 缺失或非法".to_string(),
                    QualityFlag::UnresolvedReference,
                );
                continue;
            };

            let store_key = match v.store_id.as_deref().and_then(|s| self.stores.lookup(s)) {
                Some(key) => key,
                None => {
                    Self::quarantine(
                        &mut out.quarantined,
                        ds,
                        record,
                        format!(
                            "门店维度引用无法解析: {}",
                            v.store_id.as_deref().unwrap_or("<缺失>")
                        ),
                        QualityFlag::UnresolvedReference,
                    );
                    continue;
                }
            };

            let (Some(gross_amount), Some(net_amount)) = (v.gross_amount, v.net_amount) else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "缺少必需度量: total_amount".to_string(),
                    QualityFlag::MissingRequired,
                );
                continue;
            };

            if !seen_grains.insert(transaction_id.clone()) {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    format!("粒度冲突: transaction_id={}", transaction_id),
                    QualityFlag::DuplicateRecord,
                );
                continue;
            }

            out.facts.push(PosTransactionFact {
                transaction_id,
                date_key: date_key_of(date),
                store_key,
                payment_method: v
                    .payment_method
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                gross_amount,
                discount_amount: v.discount_amount,
                tax_amount: v.tax_amount,
                net_amount,
                batch_id: record.provenance.batch_id.clone(),
                record_seq: record.provenance.record_seq,
            });
        }

        debug!(
            facts = out.facts.len(),
            quarantined = out.quarantined.len(),
            "POS 交易事实装配完成"
        );
        out
    }

    // ==========================================
    // 电商订单事实（粒度: order_id）
    // ==========================================
    pub fn assemble_ecom_orders(
        &self,
        clean: &[CleanRecord<EcomOrderClean>],
    ) -> AssemblyOutcome<EcomOrderFact> {
        let mut out = AssemblyOutcome::new();
        let mut seen_grains: HashSet<String> = HashSet::new();
        let ds = Dataset::EcomOrders;

        for record in clean.iter().filter(|r| r.current) {
            let v = &record.values;

            let Some(order_id) = record.natural_key.clone() else {
                continue;
            };

            let Some(date) = v.order_date else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "日期引用无法解析: order_date 缺失或非法".to_string(),
                    QualityFlag::UnresolvedReference,
                );
                continue;
            };

            let (Some(gross_amount), Some(net_revenue)) = (v.gross_amount, v.net_revenue) else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "缺少必需度量: total_amount".to_string(),
                    QualityFlag::MissingRequired,
                );
                continue;
            };

            if !seen_grains.insert(order_id.clone()) {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    format!("粒度冲突: order_id={}", order_id),
                    QualityFlag::DuplicateRecord,
                );
                continue;
            }

            out.facts.push(EcomOrderFact {
                order_id,
                date_key: date_key_of(date),
                channel: v.channel.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
                device_type: v.device_type.clone(),
                order_status: v
                    .order_status
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                payment_method: v.payment_method.clone(),
                gross_amount,
                discount_amount: v.discount_amount,
                shipping_fee: v.shipping_fee,
                net_revenue,
                batch_id: record.provenance.batch_id.clone(),
                record_seq: record.provenance.record_seq,
            });
        }

        debug!(
            facts = out.facts.len(),
            quarantined = out.quarantined.len(),
            "电商订单事实装配完成"
        );
        out
    }

    // ==========================================
    // 统一销售明细事实（粒度: 源系统 + 交易号 + 行号）
    // ==========================================
    // 多源统一：两套源各自独立编号，判别字段进粒度避免伪碰撞
    pub fn assemble_sales_lines(
        &self,
        pos_lines: &[CleanRecord<PosLineClean>],
        ecom_lines: &[CleanRecord<EcomLineClean>],
    ) -> AssemblyOutcome<SalesLineFact> {
        let mut out = AssemblyOutcome::new();
        let mut seen_grains: HashSet<(SourceSystem, String, i64)> = HashSet::new();

        for record in pos_lines.iter().filter(|r| r.current) {
            let v = &record.values;
            let candidate = SalesLineCandidate {
                source_system: SourceSystem::Pos,
                transaction_ref: v.transaction_id.clone(),
                line_number: v.line_number,
                date: v.transaction_date,
                product_id: v.product_id.clone(),
                store_id: v.store_id.clone(),
                quantity: v.quantity,
                unit_price: v.unit_price,
                discount_amount: v.discount_amount,
                line_total: v.line_total,
            };
            self.push_sales_line(
                &mut out,
                &mut seen_grains,
                Dataset::PosLineItems,
                record,
                candidate,
            );
        }

        for record in ecom_lines.iter().filter(|r| r.current) {
            let v = &record.values;
            let candidate = SalesLineCandidate {
                source_system: SourceSystem::Ecom,
                transaction_ref: v.order_id.clone(),
                line_number: v.line_number,
                date: v.order_date,
                product_id: v.product_id.clone(),
                // 线上事件无实体门店，store_key 合法为 NULL
                store_id: None,
                quantity: v.quantity,
                unit_price: v.unit_price,
                discount_amount: v.discount_amount,
                line_total: v.line_total,
            };
            self.push_sales_line(
                &mut out,
                &mut seen_grains,
                Dataset::EcomLineItems,
                record,
                candidate,
            );
        }

        debug!(
            facts = out.facts.len(),
            quarantined = out.quarantined.len(),
            "统一销售明细事实装配完成"
        );
        out
    }

    fn push_sales_line<T>(
        &self,
        out: &mut AssemblyOutcome<SalesLineFact>,
        seen_grains: &mut HashSet<(SourceSystem, String, i64)>,
        dataset: Dataset,
        record: &CleanRecord<T>,
        candidate: SalesLineCandidate,
    ) {
        let (Some(transaction_ref), Some(line_number)) =
            (candidate.transaction_ref.clone(), candidate.line_number)
        else {
            // 自然键不完整的记录不会是 current；防御保留
            return;
        };

        let Some(date) = candidate.date else {
            Self::quarantine(
                &mut out.quarantined,
                dataset,
                record,
                "日期引用无法解析".to_string(),
                QualityFlag::UnresolvedReference,
            );
            return;
        };

        // 商品是统一销售明细的必需维度引用
        let product_key = match candidate
            .product_id
            .as_deref()
            .and_then(|p| self.products.lookup(p))
        {
            Some(key) => key,
            None => {
                Self::quarantine(
                    &mut out.quarantined,
                    dataset,
                    record,
                    format!(
                        "商品维度引用无法解析: {}",
                        candidate.product_id.as_deref().unwrap_or("<缺失>")
                    ),
                    QualityFlag::UnresolvedReference,
                );
                return;
            }
        };

        // 门店为可选引用：缺失合法；存在但无法解析仍按引用失败隔离
        let store_key = match candidate.store_id.as_deref() {
            None => None,
            Some(store_id) => match self.stores.lookup(store_id) {
                Some(key) => Some(key),
                None => {
                    Self::quarantine(
                        &mut out.quarantined,
                        dataset,
                        record,
                        format!("门店维度引用无法解析: {}", store_id),
                        QualityFlag::UnresolvedReference,
                    );
                    return;
                }
            },
        };

        let (Some(quantity), Some(unit_price), Some(line_total)) =
            (candidate.quantity, candidate.unit_price, candidate.line_total)
        else {
            Self::quarantine(
                &mut out.quarantined,
                dataset,
                record,
                "缺少必需度量: quantity/unit_price".to_string(),
                QualityFlag::MissingRequired,
            );
            return;
        };

        let fact = SalesLineFact {
            source_system: candidate.source_system,
            transaction_ref,
            line_number,
            date_key: date_key_of(date),
            product_key,
            store_key,
            quantity,
            unit_price,
            discount_amount: candidate.discount_amount,
            line_total,
            batch_id: record.provenance.batch_id.clone(),
            record_seq: record.provenance.record_seq,
        };

        if !seen_grains.insert(fact.grain()) {
            Self::quarantine(
                &mut out.quarantined,
                dataset,
                record,
                format!(
                    "粒度冲突: {} {}#{}",
                    fact.source_system, fact.transaction_ref, fact.line_number
                ),
                QualityFlag::DuplicateRecord,
            );
            return;
        }

        out.facts.push(fact);
    }

    // ==========================================
    // 库存快照事实（粒度: 日期 + 商品 + 门店，全部必需）
    // ==========================================
    pub fn assemble_inventory_snapshots(
        &self,
        clean: &[CleanRecord<InventoryClean>],
    ) -> AssemblyOutcome<InventorySnapshotFact> {
        let mut out = AssemblyOutcome::new();
        let mut seen_grains: HashSet<(i64, i64, i64)> = HashSet::new();
        let ds = Dataset::InventorySnapshots;

        for record in clean.iter().filter(|r| r.current) {
            let v = &record.values;

            let Some(date) = v.snapshot_date else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "日期引用无法解析: snapshot_date 缺失或非法".to_string(),
                    QualityFlag::UnresolvedReference,
                );
                continue;
            };

            let product_key = match v.product_id.as_deref().and_then(|p| self.products.lookup(p)) {
                Some(key) => key,
                None => {
                    Self::quarantine(
                        &mut out.quarantined,
                        ds,
                        record,
                        format!(
                            "商品维度引用无法解析: {}",
                            v.product_id.as_deref().unwrap_or("<缺失>")
                        ),
                        QualityFlag::UnresolvedReference,
                    );
                    continue;
                }
            };

            let store_key = match v.store_id.as_deref().and_then(|s| self.stores.lookup(s)) {
                Some(key) => key,
                None => {
                    Self::quarantine(
                        &mut out.quarantined,
                        ds,
                        record,
                        format!(
                            "门店维度引用无法解析: {}",
                            v.store_id.as_deref().unwrap_or("<缺失>")
                        ),
                        QualityFlag::UnresolvedReference,
                    );
                    continue;
                }
            };

            let Some(ending_inventory) = v.ending_inventory else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "缺少必需度量: ending_inventory".to_string(),
                    QualityFlag::MissingRequired,
                );
                continue;
            };

            let fact = InventorySnapshotFact {
                date_key: date_key_of(date),
                product_key,
                store_key,
                beginning_inventory: v.beginning_inventory.unwrap_or(0),
                received_quantity: v.received_quantity.unwrap_or(0),
                sold_quantity: v.sold_quantity.unwrap_or(0),
                ending_inventory,
                safety_stock: v.safety_stock,
                stock_status: v
                    .stock_status
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                below_safety_stock: ending_inventory < v.safety_stock,
                batch_id: record.provenance.batch_id.clone(),
                record_seq: record.provenance.record_seq,
            };

            if !seen_grains.insert(fact.grain()) {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    format!("粒度冲突: {:?}", fact.grain()),
                    QualityFlag::DuplicateRecord,
                );
                continue;
            }

            out.facts.push(fact);
        }

        debug!(
            facts = out.facts.len(),
            quarantined = out.quarantined.len(),
            "库存快照事实装配完成"
        );
        out
    }

    // ==========================================
    // 退货事实（粒度: return_id；门店可为 NULL）
    // ==========================================
    pub fn assemble_returns(
        &self,
        clean: &[CleanRecord<ReturnClean>],
    ) -> AssemblyOutcome<ReturnFact> {
        let mut out = AssemblyOutcome::new();
        let mut seen_grains: HashSet<String> = HashSet::new();
        let ds = Dataset::Returns;

        for record in clean.iter().filter(|r| r.current) {
            let v = &record.values;

            let Some(return_id) = record.natural_key.clone() else {
                continue;
            };

            let Some(date) = v.return_date else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "日期引用无法解析: return_date 缺失或非法".to_string(),
                    QualityFlag::UnresolvedReference,
                );
                continue;
            };

            let product_key = match v.product_id.as_deref().and_then(|p| self.products.lookup(p)) {
                Some(key) => key,
                None => {
                    Self::quarantine(
                        &mut out.quarantined,
                        ds,
                        record,
                        format!(
                            "商品维度引用无法解析: {}",
                            v.product_id.as_deref().unwrap_or("<缺失>")
                        ),
                        QualityFlag::UnresolvedReference,
                    );
                    continue;
                }
            };

            let store_key = match v.store_id.as_deref() {
                None => None,
                Some(store_id) => match self.stores.lookup(store_id) {
                    Some(key) => Some(key),
                    None => {
                        Self::quarantine(
                            &mut out.quarantined,
                            ds,
                            record,
                            format!("门店维度引用无法解析: {}", store_id),
                            QualityFlag::UnresolvedReference,
                        );
                        continue;
                    }
                },
            };

            let (Some(quantity), Some(refund_amount)) = (v.quantity, v.refund_amount) else {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    "缺少必需度量: quantity/refund_amount".to_string(),
                    QualityFlag::MissingRequired,
                );
                continue;
            };

            if !seen_grains.insert(return_id.clone()) {
                Self::quarantine(
                    &mut out.quarantined,
                    ds,
                    record,
                    format!("粒度冲突: return_id={}", return_id),
                    QualityFlag::DuplicateRecord,
                );
                continue;
            }

            out.facts.push(ReturnFact {
                return_id,
                date_key: date_key_of(date),
                product_key,
                store_key,
                original_ref: v.original_ref.clone(),
                quantity,
                refund_amount,
                return_reason: v
                    .return_reason
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                return_channel: v
                    .return_channel
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                batch_id: record.provenance.batch_id.clone(),
                record_seq: record.provenance.record_seq,
            });
        }

        debug!(
            facts = out.facts.len(),
            quarantined = out.quarantined.len(),
            "退货事实装配完成"
        );
        out
    }
}

/// 统一销售明细候选（POS/电商字段对齐后的中间形态）
struct SalesLineCandidate {
    source_system: SourceSystem,
    transaction_ref: Option<String>,
    line_number: Option<i64>,
    date: Option<chrono::NaiveDate>,
    product_id: Option<String>,
    store_id: Option<String>,
    quantity: Option<i64>,
    unit_price: Option<f64>,
    discount_amount: f64,
    line_total: Option<f64>,
}
