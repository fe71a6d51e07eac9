// ==========================================
// 零售数仓一致性引擎 - 类目标准化器
// ==========================================
// 依据: data_dictionary_v0.1.md - 受控词表
// 规则: 有序关键词规则表，首个命中即生效；
//       未命中回退为 TRIM + UPPER 透传（词表可扩展，不阻断加载）
// ==========================================

// ==========================================
// NormRule - 标准化规则
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct NormRule {
    pub keywords: &'static [&'static str], // 命中关键词（大写，子串匹配）
    pub canonical: &'static str,           // 规范 token
}

/// 将自由文本映射到受控词表
///
/// 契约: None 保持 None；未命中任何规则时回退为大写透传
pub fn normalize(raw: Option<&str>, rules: &[NormRule]) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    let upper = value.to_uppercase();

    for rule in rules {
        for keyword in rule.keywords {
            if upper.contains(keyword) {
                return Some(rule.canonical.to_string());
            }
        }
    }

    // 词表未覆盖：透传而非失败
    Some(upper)
}

// ==========================================
// 受控词表（按属性）
// ==========================================
pub mod vocab {
    use super::NormRule;

    /// 支付方式
    pub const PAYMENT_METHOD: &[NormRule] = &[
        NormRule { keywords: &["CREDIT"], canonical: "CREDIT_CARD" },
        NormRule { keywords: &["DEBIT"], canonical: "DEBIT_CARD" },
        NormRule { keywords: &["GIFT"], canonical: "GIFT_CARD" },
        NormRule { keywords: &["MOBILE", "APPLE PAY", "GOOGLE PAY", "WALLET"], canonical: "MOBILE_PAY" },
        NormRule { keywords: &["PAYPAL"], canonical: "PAYPAL" },
        NormRule { keywords: &["CASH"], canonical: "CASH" },
    ];

    /// 订单状态
    pub const ORDER_STATUS: &[NormRule] = &[
        NormRule { keywords: &["CANCEL"], canonical: "CANCELLED" },
        NormRule { keywords: &["RETURN", "REFUND"], canonical: "RETURNED" },
        NormRule { keywords: &["DELIVER"], canonical: "DELIVERED" },
        NormRule { keywords: &["SHIP", "TRANSIT"], canonical: "SHIPPED" },
        NormRule { keywords: &["COMPLETE", "FULFILL"], canonical: "COMPLETED" },
        NormRule { keywords: &["PEND", "PROCESS"], canonical: "PENDING" },
    ];

    /// 销售渠道
    pub const CHANNEL: &[NormRule] = &[
        NormRule { keywords: &["MARKETPLACE", "AMAZON", "EBAY"], canonical: "MARKETPLACE" },
        NormRule { keywords: &["APP", "MOBILE"], canonical: "MOBILE_APP" },
        NormRule { keywords: &["WEB", "ONLINE", "SITE"], canonical: "WEB" },
    ];

    /// 设备类型
    pub const DEVICE_TYPE: &[NormRule] = &[
        NormRule { keywords: &["TABLET", "IPAD"], canonical: "TABLET" },
        NormRule { keywords: &["MOBILE", "PHONE", "IOS", "ANDROID"], canonical: "MOBILE" },
        NormRule { keywords: &["DESKTOP", "PC", "MAC"], canonical: "DESKTOP" },
    ];

    /// 库存状态
    pub const STOCK_STATUS: &[NormRule] = &[
        NormRule { keywords: &["OUT"], canonical: "OUT_OF_STOCK" },
        NormRule { keywords: &["LOW"], canonical: "LOW_STOCK" },
        NormRule { keywords: &["IN STOCK", "IN_STOCK", "AVAILABLE", "OK"], canonical: "IN_STOCK" },
    ];

    /// 退货原因
    pub const RETURN_REASON: &[NormRule] = &[
        NormRule { keywords: &["DEFECT", "BROKEN", "DAMAGE", "FAULT"], canonical: "DEFECTIVE" },
        NormRule { keywords: &["WRONG"], canonical: "WRONG_ITEM" },
        NormRule { keywords: &["DESCRI", "NOT AS"], canonical: "NOT_AS_DESCRIBED" },
        NormRule { keywords: &["SIZE", "FIT", "SMALL", "LARGE"], canonical: "SIZE_FIT" },
        NormRule { keywords: &["MIND", "UNWANTED", "NO LONGER"], canonical: "CHANGED_MIND" },
    ];

    /// 退货渠道
    pub const RETURN_CHANNEL: &[NormRule] = &[
        NormRule { keywords: &["STORE", "POS", "COUNTER"], canonical: "IN_STORE" },
        NormRule { keywords: &["MAIL", "POST", "COURIER"], canonical: "MAIL" },
        NormRule { keywords: &["ONLINE", "WEB", "APP"], canonical: "ONLINE" },
    ];

    /// 商品适销季
    pub const PRODUCT_SEASON: &[NormRule] = &[
        NormRule { keywords: &["SPRING"], canonical: "SPRING" },
        NormRule { keywords: &["SUMMER"], canonical: "SUMMER" },
        NormRule { keywords: &["FALL", "AUTUMN"], canonical: "FALL" },
        NormRule { keywords: &["WINTER"], canonical: "WINTER" },
        NormRule { keywords: &["ALL", "YEAR"], canonical: "ALL_SEASON" },
    ];

    /// 商品状态
    pub const PRODUCT_STATUS: &[NormRule] = &[
        NormRule { keywords: &["DISCONTINU", "EOL", "RETIRED"], canonical: "DISCONTINUED" },
        NormRule { keywords: &["SEASONAL"], canonical: "SEASONAL" },
        NormRule { keywords: &["ACTIVE", "LIVE", "CURRENT"], canonical: "ACTIVE" },
    ];

    /// 门店类型
    pub const STORE_TYPE: &[NormRule] = &[
        NormRule { keywords: &["FLAGSHIP"], canonical: "FLAGSHIP" },
        NormRule { keywords: &["OUTLET", "CLEARANCE"], canonical: "OUTLET" },
        NormRule { keywords: &["POP", "TEMPORARY"], canonical: "POPUP" },
        NormRule { keywords: &["STANDARD", "REGULAR", "MALL"], canonical: "STANDARD" },
    ];

    /// 大区
    pub const REGION: &[NormRule] = &[
        NormRule { keywords: &["NORTHEAST", "NORTH EAST"], canonical: "NORTHEAST" },
        NormRule { keywords: &["NORTHWEST", "NORTH WEST"], canonical: "NORTHWEST" },
        NormRule { keywords: &["SOUTHEAST", "SOUTH EAST"], canonical: "SOUTHEAST" },
        NormRule { keywords: &["SOUTHWEST", "SOUTH WEST"], canonical: "SOUTHWEST" },
        NormRule { keywords: &["NORTH"], canonical: "NORTH" },
        NormRule { keywords: &["SOUTH"], canonical: "SOUTH" },
        NormRule { keywords: &["EAST"], canonical: "EAST" },
        NormRule { keywords: &["WEST"], canonical: "WEST" },
        NormRule { keywords: &["CENTRAL", "MIDWEST"], canonical: "CENTRAL" },
    ];
}
