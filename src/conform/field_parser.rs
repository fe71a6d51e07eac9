// ==========================================
// 零售数仓一致性引擎 - 字段解析器
// ==========================================
// 依据: Field_Rules_v0.2.md - 字段规则表（规则即数据）
// 契约: 解析绝不抛错；缺失/非法 → None + 对应质量标志
// 红线: 负值金额/数量/库存 → None + NEGATIVE_AMOUNT；
//       可加字段（折扣/税/运费）缺失按 0 处理，避免污染下游求和
// ==========================================

use crate::domain::record::RawRecord;
use crate::domain::types::{FlagSet, QualityFlag};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;

// ==========================================
// FieldType - 字段目标类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,          // 自由文本（TRIM）
    UpperText,     // 文本（TRIM + UPPER）
    Reference,     // 业务主键/引用（缺失打 MALFORMED_REFERENCE）
    Date,          // 日期（仅无歧义格式）
    DateTime,      // 日期时间（仅无歧义格式）
    Money,         // 金额（禁负）
    AdditiveMoney, // 可加金额（折扣/税/运费；缺失/非法按 0）
    Quantity,      // 数量/库存计数（整型，禁负）
}

// ==========================================
// FieldRule - 声明式字段规则
// ==========================================
// 字段名 → 目标类型 → 是否必填；违规标志由类型策略决定
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldRule {
    pub const fn required(field: &'static str, ty: FieldType) -> Self {
        FieldRule { field, ty, required: true }
    }

    pub const fn optional(field: &'static str, ty: FieldType) -> Self {
        FieldRule { field, ty, required: false }
    }
}

// ==========================================
// TypedValue / TypedRow - 类型化行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Money(f64),
    Int(i64),
}

/// 一行解析产物：字段名 → 类型化值（解析失败的字段无键）
#[derive(Debug, Clone, Default)]
pub struct TypedRow {
    values: BTreeMap<&'static str, TypedValue>,
}

impl TypedRow {
    pub fn text(&self, field: &str) -> Option<String> {
        match self.values.get(field) {
            Some(TypedValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.values.get(field) {
            Some(TypedValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn datetime(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.values.get(field) {
            Some(TypedValue::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn money(&self, field: &str) -> Option<f64> {
        match self.values.get(field) {
            Some(TypedValue::Money(v)) => Some(*v),
            _ => None,
        }
    }

    /// 可加金额：无键即 0（AdditiveMoney 规则保证缺失/非法已归零）
    pub fn money_or_zero(&self, field: &str) -> f64 {
        self.money(field).unwrap_or(0.0)
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        match self.values.get(field) {
            Some(TypedValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

// ==========================================
// parse_row - 规则表驱动的行解析
// ==========================================
/// 按规则表解析一行原始记录
///
/// 契约: 永不失败；每条违规映射为质量标志，值置 None（可加金额置 0）
pub fn parse_row(raw: &RawRecord, rules: &[FieldRule]) -> (TypedRow, FlagSet) {
    let mut row = TypedRow::default();
    let mut flags = FlagSet::new();

    for rule in rules {
        let raw_value = raw.get(rule.field);

        match (raw_value, rule.ty) {
            // ===== 缺失值策略 =====
            (None, FieldType::AdditiveMoney) => {
                // 缺失的扣减项不应破坏下游求和
                row.values.insert(rule.field, TypedValue::Money(0.0));
            }
            (None, FieldType::Reference) if rule.required => {
                flags.insert(QualityFlag::MalformedReference);
            }
            (None, _) if rule.required => {
                flags.insert(QualityFlag::MissingRequired);
            }
            (None, _) => {}

            // ===== 文本 =====
            (Some(v), FieldType::Text) => {
                row.values.insert(rule.field, TypedValue::Text(v.to_string()));
            }
            (Some(v), FieldType::UpperText) => {
                row.values
                    .insert(rule.field, TypedValue::Text(v.to_uppercase()));
            }
            (Some(v), FieldType::Reference) => {
                row.values.insert(rule.field, TypedValue::Text(v.to_string()));
            }

            // ===== 日期/时间 =====
            (Some(v), FieldType::Date) => match parse_date(v) {
                Some(d) => {
                    row.values.insert(rule.field, TypedValue::Date(d));
                }
                None => {
                    flags.insert(QualityFlag::MalformedDate);
                }
            },
            (Some(v), FieldType::DateTime) => match parse_datetime(v) {
                Some(dt) => {
                    row.values.insert(rule.field, TypedValue::DateTime(dt));
                }
                None => {
                    flags.insert(QualityFlag::MalformedDate);
                }
            },

            // ===== 金额 =====
            (Some(v), FieldType::Money) => match parse_money(v) {
                Some(m) if m < 0.0 => {
                    flags.insert(QualityFlag::NegativeAmount);
                }
                Some(m) => {
                    row.values.insert(rule.field, TypedValue::Money(m));
                }
                None => {
                    flags.insert(QualityFlag::MalformedNumber);
                }
            },
            (Some(v), FieldType::AdditiveMoney) => match parse_money(v) {
                Some(m) if m < 0.0 => {
                    flags.insert(QualityFlag::NegativeAmount);
                    row.values.insert(rule.field, TypedValue::Money(0.0));
                }
                Some(m) => {
                    row.values.insert(rule.field, TypedValue::Money(m));
                }
                None => {
                    flags.insert(QualityFlag::MalformedNumber);
                    row.values.insert(rule.field, TypedValue::Money(0.0));
                }
            },

            // ===== 数量 =====
            (Some(v), FieldType::Quantity) => match v.parse::<i64>() {
                Ok(n) if n < 0 => {
                    flags.insert(QualityFlag::NegativeAmount);
                }
                Ok(n) => {
                    row.values.insert(rule.field, TypedValue::Int(n));
                }
                Err(_) => {
                    flags.insert(QualityFlag::MalformedNumber);
                }
            },
        }
    }

    (row, flags)
}

/// 日期解析：仅接受 YYYY-MM-DD / YYYYMMDD（无歧义格式）
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

/// 日期时间解析：仅接受 YYYY-MM-DD HH:MM:SS / YYYYMMDDHHMMSS
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S"))
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// 金额解析（兼容货币符号与千分位）
fn parse_money(value: &str) -> Option<f64> {
    let cleaned = value.trim_start_matches(['$', '¥']).replace(',', "");
    cleaned.parse::<f64>().ok()
}
