// ==========================================
// 零售数仓一致性引擎 - 财务对账器
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 跨字段财务对账
// 契约: 重算值永远是下游采信值；上报值仅留审计
// 容差: 绝对容差（货币单位），默认 0.05，见 ConformanceConfig
// ==========================================

use crate::domain::types::{FlagSet, QualityFlag};

/// 金额统一保留两位小数（货币最小单位）
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ==========================================
// Reconciler - 对账器
// ==========================================
pub struct Reconciler {
    tolerance: f64,
}

impl Reconciler {
    pub fn new(tolerance: f64) -> Self {
        Reconciler { tolerance }
    }

    /// 行总额重算: 数量 × 单价
    pub fn line_total(&self, quantity: i64, unit_price: f64) -> f64 {
        round_money(quantity as f64 * unit_price)
    }

    /// POS 净额重算: 总额 - 折扣 + 税
    pub fn pos_net_amount(&self, gross: f64, discount: f64, tax: f64) -> f64 {
        round_money(gross - discount + tax)
    }

    /// 电商净收入重算: 总额 - 折扣 + 运费
    pub fn ecom_net_revenue(&self, gross: f64, discount: f64, shipping: f64) -> f64 {
        round_money(gross - discount + shipping)
    }

    /// 期末库存重算: 期初 + 入库 - 售出
    pub fn ending_inventory(&self, beginning: i64, received: i64, sold: i64) -> i64 {
        beginning + received - sold
    }

    /// 重算值 vs 上报值对账
    ///
    /// 超容差打 RECONCILIATION_MISMATCH；返回值恒为重算值
    pub fn check(&self, calculated: f64, reported: Option<f64>, flags: &mut FlagSet) -> f64 {
        if let Some(reported) = reported {
            if (calculated - reported).abs() > self.tolerance {
                flags.insert(QualityFlag::ReconciliationMismatch);
            }
        }
        calculated
    }

    /// 整数计数对账（库存口径，容差为 0）
    pub fn check_count(&self, calculated: i64, reported: Option<i64>, flags: &mut FlagSet) -> i64 {
        if let Some(reported) = reported {
            if calculated != reported {
                flags.insert(QualityFlag::ReconciliationMismatch);
            }
        }
        calculated
    }

    /// 毛利重算: 售价 - 成本
    ///
    /// 负毛利打 NEGATIVE_AMOUNT 但不阻断晋级（亏损 SKU 需要可见）
    pub fn margin(&self, unit_price: f64, unit_cost: f64, flags: &mut FlagSet) -> f64 {
        let margin = round_money(unit_price - unit_cost);
        if margin < 0.0 {
            flags.insert(QualityFlag::NegativeAmount);
        }
        margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> Reconciler {
        Reconciler::new(0.05)
    }

    #[test]
    fn test_line_total_within_tolerance() {
        // 3 × 9.99 = 29.97; 上报 29.98，差 0.01 在容差内
        let r = reconciler();
        let mut flags = FlagSet::new();
        let calc = r.line_total(3, 9.99);
        assert_eq!(calc, 29.97);

        let stored = r.check(calc, Some(29.98), &mut flags);
        assert_eq!(stored, 29.97);
        assert!(!flags.contains(QualityFlag::ReconciliationMismatch));
    }

    #[test]
    fn test_line_total_beyond_tolerance_uses_calculated() {
        // 上报 40.00，差 10.03：打标志且采信重算值
        let r = reconciler();
        let mut flags = FlagSet::new();
        let stored = r.check(r.line_total(3, 9.99), Some(40.00), &mut flags);

        assert_eq!(stored, 29.97);
        assert!(flags.contains(QualityFlag::ReconciliationMismatch));
    }

    #[test]
    fn test_check_without_reported_value() {
        let r = reconciler();
        let mut flags = FlagSet::new();
        let stored = r.check(12.34, None, &mut flags);

        assert_eq!(stored, 12.34);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_negative_margin_flagged_not_blocked() {
        // 售价 10.00 成本 12.00 → 毛利 -2.00
        let r = reconciler();
        let mut flags = FlagSet::new();
        let margin = r.margin(10.00, 12.00, &mut flags);

        assert_eq!(margin, -2.00);
        assert!(flags.contains(QualityFlag::NegativeAmount));
    }

    #[test]
    fn test_pos_net_amount() {
        let r = reconciler();
        assert_eq!(r.pos_net_amount(100.0, 10.0, 8.25), 98.25);
    }

    #[test]
    fn test_ending_inventory_mismatch() {
        let r = reconciler();
        let mut flags = FlagSet::new();
        let ending = r.ending_inventory(100, 20, 30);
        assert_eq!(ending, 90);

        let stored = r.check_count(ending, Some(85), &mut flags);
        assert_eq!(stored, 90);
        assert!(flags.contains(QualityFlag::ReconciliationMismatch));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(29.969999999999999), 29.97);
        assert_eq!(round_money(0.125), 0.13);
    }
}
