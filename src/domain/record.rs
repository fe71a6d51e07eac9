// ==========================================
// 零售数仓一致性引擎 - 记录领域模型
// ==========================================
// 依据: Conformance_Spec_v0.2.md - Raw/Clean 两层记录
// 红线: 血缘信息自创建即随值存在，不做事后补列
// 红线: clean 层与 raw 层 1:1，绝不丢行
// ==========================================

use crate::domain::types::FlagSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Provenance - 批次血缘
// ==========================================
// record_seq: 批内稳定摄入序号（去重平票时的确定性次级排序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub batch_id: String,            // 批次 ID（UUID）
    pub loaded_at: DateTime<Utc>,    // 到达时间戳
    pub source_file: String,         // 源文件名
    pub record_seq: i64,             // 摄入序号（批内稳定、单调）
}

// ==========================================
// RawRecord - 原始记录
// ==========================================
// 用途: 落地层交付的属性名 → 字符串映射，落地后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: BTreeMap<String, String>, // 有序属性映射（缺失即无键）
    pub provenance: Provenance,
}

impl RawRecord {
    pub fn new(fields: BTreeMap<String, String>, provenance: Provenance) -> Self {
        RawRecord { fields, provenance }
    }

    /// 取字段值（TRIM 后为空视为缺失）
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}

// ==========================================
// CleanRecord - 清洗记录
// ==========================================
// 不变式: 一条 RawRecord 恰好产生一条 CleanRecord
// current: 去重裁决结果；仅 current=true 可晋级维度/事实
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanRecord<T> {
    pub values: T,                   // 类型化/标准化字段（解析失败即 None）
    pub natural_key: Option<String>, // 业务自然键（无法解析则 None，永不晋级）
    pub flags: FlagSet,              // 质量标志集
    pub current: bool,               // 是否当前记录（去重胜出者）
    pub provenance: Provenance,      // 继承血缘
}

impl<T> CleanRecord<T> {
    pub fn new(values: T, natural_key: Option<String>, flags: FlagSet, provenance: Provenance) -> Self {
        CleanRecord {
            values,
            natural_key,
            flags,
            // 初始一律非 current，由去重器裁决
            current: false,
            provenance,
        }
    }
}
