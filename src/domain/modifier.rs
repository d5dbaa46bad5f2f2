// ==========================================
// 零售智能补货系统 - 需求修正器领域模型
// ==========================================
// 红线: 候选修正器与已应用审计项分离, 审计项不可变
// 依据: 四类修正器共享表头, 差异仅在类别载荷与优先级
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ConfidenceTag, DateBasis, ModifierCategory, ModifierScope, StackingRule,
};

// ==========================================
// ModifierHeader - 修正器公共表头
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierHeader {
    pub name: String,              // 修正器名称 (如 "618大促")
    pub scope: ModifierScope,      // 作用范围 μ/σ/两者/数量修正
    pub value: f64,                // 系数值 (乘法口径直接为倍率, 加法口径为增量)
    pub stacking: StackingRule,    // 叠加规则
    pub active_from: NaiveDate,    // 生效起始日 (含)
    pub active_to: NaiveDate,      // 生效结束日 (含)
    pub date_basis: DateBasis,     // 生效判定锚定: 下单日 / 到货日
    pub confidence: ConfidenceTag, // 置信度标签 (仅供审计展示)
    pub note: Option<String>,      // 备注
}

// ==========================================
// ModifierKind - 类别载荷 (标签联合)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierKind {
    Event {
        event_type: String, // 事件类型 (如 "门店周年庆")
    },
    Promo {
        campaign_id: String,       // 促销活动编号
        discount_pct: Option<f64>, // 折扣百分比 (仅供审计展示)
    },
    Cannibalization {
        driver_sku: String, // 引发分流的驱动 SKU
    },
    Holiday {
        holiday_name: String, // 节假日名称
    },
}

// ==========================================
// DemandModifier - 候选修正器
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandModifier {
    #[serde(flatten)]
    pub header: ModifierHeader,
    #[serde(flatten)]
    pub kind: ModifierKind,
}

impl DemandModifier {
    /// 类别由载荷派生, 不单独存储
    pub fn category(&self) -> ModifierCategory {
        match self.kind {
            ModifierKind::Event { .. } => ModifierCategory::Event,
            ModifierKind::Promo { .. } => ModifierCategory::Promo,
            ModifierKind::Cannibalization { .. } => ModifierCategory::Cannibalization,
            ModifierKind::Holiday { .. } => ModifierCategory::Holiday,
        }
    }

    /// 固定优先级: event=1, promo=2, cannibalization=3, holiday=4
    pub fn precedence(&self) -> u8 {
        self.category().precedence()
    }

    /// 分流驱动 SKU (仅 cannibalization 类别有值)
    pub fn driver_sku(&self) -> Option<&str> {
        match &self.kind {
            ModifierKind::Cannibalization { driver_sku } => Some(driver_sku),
            _ => None,
        }
    }

    /// 折算为乘法系数: 乘法口径直接取值, 加法口径折算为 (1 + value)
    pub fn effective_multiplier(&self) -> f64 {
        match self.header.stacking {
            StackingRule::Multiplicative => self.header.value,
            StackingRule::Additive => 1.0 + self.header.value,
        }
    }

    /// 生效窗口判定 (闭区间 [active_from, active_to])
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.header.active_from <= date && date <= self.header.active_to
    }
}

// ==========================================
// AppliedModifier - 已应用修正器审计项
// ==========================================
// 记录实际生效的修正器及其数值轨迹; qty_correction 类
// 条目的 mu_before/mu_after 记录的是订货量前后值, 备注注明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedModifier {
    pub name: String,
    pub category: ModifierCategory,
    pub scope: ModifierScope,
    pub multiplier: f64, // 已折算的乘法系数
    pub stacking: StackingRule,
    pub active_from: NaiveDate,
    pub active_to: NaiveDate,
    pub driver_sku: Option<String>,
    pub confidence: ConfidenceTag,
    pub note: Option<String>,
    pub mu_before: f64, // 应用前 μ_P (qty_correction 条目为应用前订货量)
    pub mu_after: f64,  // 应用后 μ_P (qty_correction 条目为应用后订货量)
}

impl AppliedModifier {
    /// 由候选修正器与数值轨迹构造审计项
    pub fn from_candidate(modifier: &DemandModifier, mu_before: f64, mu_after: f64) -> Self {
        Self {
            name: modifier.header.name.clone(),
            category: modifier.category(),
            scope: modifier.header.scope,
            multiplier: modifier.effective_multiplier(),
            stacking: modifier.header.stacking,
            active_from: modifier.header.active_from,
            active_to: modifier.header.active_to,
            driver_sku: modifier.driver_sku().map(|s| s.to_string()),
            confidence: modifier.header.confidence,
            note: modifier.header.note.clone(),
            mu_before,
            mu_after,
        }
    }
}
