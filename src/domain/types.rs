// ==========================================
// 零售数仓一致性引擎 - 领域类型定义
// ==========================================
// 依据: data_dictionary_v0.1.md - 受控词表与质量标志
// 依据: dimensional_model_v0.1.md - 源系统判别字段
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// 质量标志 (Quality Flag)
// ==========================================
// 红线: 标志是附加的、可叠加的，绝不触发删行
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityFlag {
    MalformedDate,          // 日期无法解析
    MalformedNumber,        // 数值无法解析
    MalformedReference,     // 业务主键/引用字段缺失或非法
    MissingRequired,        // 必填描述字段缺失
    NegativeAmount,         // 金额/数量/库存为负（含负毛利）
    ReconciliationMismatch, // 重算值与上报值超容差
    BelowThreshold,         // 库存低于安全线
    DuplicateRecord,        // 同自然键重复（非当前记录）
    UnresolvedReference,    // 事实行维度引用无法解析（隔离）
}

impl QualityFlag {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            QualityFlag::MalformedDate => "MALFORMED_DATE",
            QualityFlag::MalformedNumber => "MALFORMED_NUMBER",
            QualityFlag::MalformedReference => "MALFORMED_REFERENCE",
            QualityFlag::MissingRequired => "MISSING_REQUIRED",
            QualityFlag::NegativeAmount => "NEGATIVE_AMOUNT",
            QualityFlag::ReconciliationMismatch => "RECONCILIATION_MISMATCH",
            QualityFlag::BelowThreshold => "BELOW_THRESHOLD",
            QualityFlag::DuplicateRecord => "DUPLICATE_RECORD",
            QualityFlag::UnresolvedReference => "UNRESOLVED_REFERENCE",
        }
    }

    /// 从字符串解析质量标志
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "MALFORMED_DATE" => Some(QualityFlag::MalformedDate),
            "MALFORMED_NUMBER" => Some(QualityFlag::MalformedNumber),
            "MALFORMED_REFERENCE" => Some(QualityFlag::MalformedReference),
            "MISSING_REQUIRED" => Some(QualityFlag::MissingRequired),
            "NEGATIVE_AMOUNT" => Some(QualityFlag::NegativeAmount),
            "RECONCILIATION_MISMATCH" => Some(QualityFlag::ReconciliationMismatch),
            "BELOW_THRESHOLD" => Some(QualityFlag::BelowThreshold),
            "DUPLICATE_RECORD" => Some(QualityFlag::DuplicateRecord),
            "UNRESOLVED_REFERENCE" => Some(QualityFlag::UnresolvedReference),
            _ => None,
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 标志集 (Flag Set)
// ==========================================
// 红线: 集合而非单值；BTreeSet 保证序列化顺序确定（重跑幂等依赖）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet(BTreeSet<QualityFlag>);

impl FlagSet {
    pub fn new() -> Self {
        FlagSet(BTreeSet::new())
    }

    pub fn insert(&mut self, flag: QualityFlag) {
        self.0.insert(flag);
    }

    pub fn contains(&self, flag: QualityFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QualityFlag> {
        self.0.iter()
    }

    pub fn merge(&mut self, other: &FlagSet) {
        for flag in other.iter() {
            self.0.insert(*flag);
        }
    }

    /// 序列化为 JSON 数组字符串（clean 层 flags_json 列）
    pub fn to_json(&self) -> String {
        let names: Vec<&str> = self.0.iter().map(|f| f.to_db_str()).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    /// 从 JSON 数组字符串解析（未知标志忽略）
    pub fn from_json(json: &str) -> Self {
        let names: Vec<String> = serde_json::from_str(json).unwrap_or_default();
        let mut set = FlagSet::new();
        for name in names {
            if let Some(flag) = QualityFlag::from_db_str(&name) {
                set.insert(flag);
            }
        }
        set
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|fl| fl.to_db_str()).collect();
        write!(f, "{}", names.join(","))
    }
}

// ==========================================
// 源数据集 (Dataset)
// ==========================================
// 八类源抽取，由外部落地机制按批次交付
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dataset {
    PosTransactions,    // POS 交易头
    PosLineItems,       // POS 交易明细
    EcomOrders,         // 电商订单
    EcomLineItems,      // 电商订单明细
    InventorySnapshots, // 库存快照
    Returns,            // 退货
    Products,           // 商品主数据
    Stores,             // 门店主数据
}

impl Dataset {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Dataset::PosTransactions => "POS_TRANSACTIONS",
            Dataset::PosLineItems => "POS_LINE_ITEMS",
            Dataset::EcomOrders => "ECOM_ORDERS",
            Dataset::EcomLineItems => "ECOM_LINE_ITEMS",
            Dataset::InventorySnapshots => "INVENTORY_SNAPSHOTS",
            Dataset::Returns => "RETURNS",
            Dataset::Products => "PRODUCTS",
            Dataset::Stores => "STORES",
        }
    }

    /// 从字符串解析数据集
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "POS_TRANSACTIONS" => Some(Dataset::PosTransactions),
            "POS_LINE_ITEMS" => Some(Dataset::PosLineItems),
            "ECOM_ORDERS" => Some(Dataset::EcomOrders),
            "ECOM_LINE_ITEMS" => Some(Dataset::EcomLineItems),
            "INVENTORY_SNAPSHOTS" => Some(Dataset::InventorySnapshots),
            "RETURNS" => Some(Dataset::Returns),
            "PRODUCTS" => Some(Dataset::Products),
            "STORES" => Some(Dataset::Stores),
            _ => None,
        }
    }

    /// 全部数据集，主数据先行（清洗层行数守恒按此枚举逐集核对）
    pub fn all() -> [Dataset; 8] {
        [
            Dataset::Products,
            Dataset::Stores,
            Dataset::PosTransactions,
            Dataset::PosLineItems,
            Dataset::EcomOrders,
            Dataset::EcomLineItems,
            Dataset::InventorySnapshots,
            Dataset::Returns,
        ]
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 源系统判别 (Source System)
// ==========================================
// 用途: 统一销售明细事实的判别字段（粒度组成部分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceSystem {
    Pos,  // 门店 POS
    Ecom, // 电商
}

impl SourceSystem {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SourceSystem::Pos => "POS",
            SourceSystem::Ecom => "ECOM",
        }
    }

    /// 从字符串解析源系统
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "POS" => Some(SourceSystem::Pos),
            "ECOM" => Some(SourceSystem::Ecom),
            _ => None,
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
