// ==========================================
// 零售数仓一致性引擎 - 一致性维度领域模型
// ==========================================
// 依据: dimensional_model_v0.1.md - dim_date / dim_product / dim_store
// 红线: 代理键一经分配永不变更、永不复用
// 红线: 描述属性覆盖更新（SCD Type 1），不做历史版本
// ==========================================

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ==========================================
// DateDimension - 日期维度
// ==========================================
// 代理键: 智能键 yyyymmdd（生成码，可由日期确定性重建）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateDimension {
    pub date_key: i64,          // yyyymmdd
    pub full_date: NaiveDate,   // ISO 日期
    pub year: i32,              // 年
    pub quarter: u32,           // 季度（1-4）
    pub month: u32,             // 月
    pub month_name: String,     // 月名（英文大写）
    pub day_of_month: u32,      // 日
    pub day_name: String,       // 星期名（英文大写）
    pub week_of_year: u32,      // ISO 周序号
    pub is_weekend: bool,       // 是否周末
}

/// 日期智能键（yyyymmdd）
pub fn date_key_of(date: NaiveDate) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

impl DateDimension {
    /// 由日期派生全部日历属性
    pub fn from_date(date: NaiveDate) -> Self {
        let month_name = match date.month() {
            1 => "JANUARY",
            2 => "FEBRUARY",
            3 => "MARCH",
            4 => "APRIL",
            5 => "MAY",
            6 => "JUNE",
            7 => "JULY",
            8 => "AUGUST",
            9 => "SEPTEMBER",
            10 => "OCTOBER",
            11 => "NOVEMBER",
            _ => "DECEMBER",
        };
        let day_name = match date.weekday() {
            Weekday::Mon => "MONDAY",
            Weekday::Tue => "TUESDAY",
            Weekday::Wed => "WEDNESDAY",
            Weekday::Thu => "THURSDAY",
            Weekday::Fri => "FRIDAY",
            Weekday::Sat => "SATURDAY",
            Weekday::Sun => "SUNDAY",
        };
        let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);

        DateDimension {
            date_key: date_key_of(date),
            full_date: date,
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
            month: date.month(),
            month_name: month_name.to_string(),
            day_of_month: date.day(),
            day_name: day_name.to_string(),
            week_of_year: date.iso_week().week(),
            is_weekend,
        }
    }
}

// ==========================================
// ProductDimension - 商品维度
// ==========================================
// 自然键: product_id；代理键: 单调序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDimension {
    pub product_key: i64,               // 代理键
    pub product_id: String,             // 自然键（商品编码）
    pub product_name: Option<String>,   // 商品名称
    pub category: Option<String>,       // 品类（标准化大写）
    pub brand: Option<String>,          // 品牌
    pub season: Option<String>,         // 适销季（受控词表）
    pub status: Option<String>,         // 商品状态（受控词表）
    pub unit_price: Option<f64>,        // 标准售价
    pub unit_cost: Option<f64>,         // 标准成本
    pub margin: Option<f64>,            // 毛利 = 售价 - 成本（重算值，可为负）
    pub batch_id: String,               // 最近一次刷新批次
    pub updated_at: DateTime<Utc>,      // 记录更新时间
}

// ==========================================
// StoreDimension - 门店维度
// ==========================================
// 自然键: store_id；代理键: 单调序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDimension {
    pub store_key: i64,                 // 代理键
    pub store_id: String,               // 自然键（门店编码）
    pub store_name: Option<String>,     // 门店名称
    pub city: Option<String>,           // 城市
    pub region: Option<String>,         // 大区（受控词表）
    pub store_type: Option<String>,     // 门店类型（受控词表）
    pub opened_date: Option<NaiveDate>, // 开业日期
    pub batch_id: String,               // 最近一次刷新批次
    pub updated_at: DateTime<Utc>,      // 记录更新时间
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key_of() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(date_key_of(d), 20250307);
    }

    #[test]
    fn test_date_dimension_attributes() {
        // 2025-01-04 是周六
        let d = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        let dim = DateDimension::from_date(d);

        assert_eq!(dim.date_key, 20250104);
        assert_eq!(dim.quarter, 1);
        assert_eq!(dim.month_name, "JANUARY");
        assert_eq!(dim.day_name, "SATURDAY");
        assert!(dim.is_weekend);
    }

    #[test]
    fn test_date_dimension_quarter_boundaries() {
        let q4 = DateDimension::from_date(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(q4.quarter, 4);
        let q2 = DateDimension::from_date(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert_eq!(q2.quarter, 2);
    }
}
