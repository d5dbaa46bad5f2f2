// ==========================================
// 零售智能补货系统 - 领域类型定义
// ==========================================
// 职责: 补货决策引擎的闭合枚举与基础类型
// 红线: 通道/修正器类目为闭合枚举, 不做开放字符串
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订货通道 (Lane)
// ==========================================
// STANDARD: 任意订货日 → 下一个有效收货日
// SATURDAY: 周五下单 → 周六收货 (短提前期)
// MONDAY:   周五下单 → 跨周末周一收货
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lane {
    Standard, // 标准通道
    Saturday, // 周六通道
    Monday,   // 周一通道
}

impl Lane {
    /// 该通道是否仅限周五下单
    pub fn requires_friday(&self) -> bool {
        matches!(self, Lane::Saturday | Lane::Monday)
    }

    /// 从字符串解析通道
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "STANDARD" => Some(Lane::Standard),
            "SATURDAY" => Some(Lane::Saturday),
            "MONDAY" => Some(Lane::Monday),
            _ => None,
        }
    }

    /// 转换为存储用字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Lane::Standard => "STANDARD",
            Lane::Saturday => "SATURDAY",
            Lane::Monday => "MONDAY",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 节假日效果 (Holiday Effect)
// ==========================================
// 节假日效果在工作日规则之前检查, 只能禁止, 不能绕过工作日规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HolidayEffect {
    NoOrder,   // 当日禁止下单
    NoReceipt, // 当日禁止收货
    Closed,    // 下单与收货均禁止
}

impl HolidayEffect {
    /// 该效果是否禁止下单
    pub fn blocks_order(&self) -> bool {
        matches!(self, HolidayEffect::NoOrder | HolidayEffect::Closed)
    }

    /// 该效果是否禁止收货
    pub fn blocks_receipt(&self) -> bool {
        matches!(self, HolidayEffect::NoReceipt | HolidayEffect::Closed)
    }

    /// 从字符串解析效果
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NO_ORDER" => Some(HolidayEffect::NoOrder),
            "NO_RECEIPT" => Some(HolidayEffect::NoReceipt),
            "CLOSED" | "BOTH" => Some(HolidayEffect::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for HolidayEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolidayEffect::NoOrder => write!(f, "NO_ORDER"),
            HolidayEffect::NoReceipt => write!(f, "NO_RECEIPT"),
            HolidayEffect::Closed => write!(f, "CLOSED"),
        }
    }
}

// ==========================================
// 工作日集合 (Weekday Set)
// ==========================================
// 序列化格式: ISO 工作日编号数组 (1=周一 .. 7=周日)
// 空集合允许在类型层存在, 由 CalendarConfig::validate 拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet {
    mask: u8, // bit0=周一 .. bit6=周日
}

impl WeekdaySet {
    /// 空集合
    pub fn empty() -> Self {
        Self { mask: 0 }
    }

    /// 从 chrono 工作日列表构造
    pub fn from_weekdays(days: &[Weekday]) -> Self {
        let mut mask = 0u8;
        for d in days {
            mask |= 1 << (d.number_from_monday() - 1);
        }
        Self { mask }
    }

    /// 从 ISO 编号列表构造 (1=周一 .. 7=周日), 非法编号返回 None
    pub fn from_iso_numbers(numbers: &[u8]) -> Option<Self> {
        let mut mask = 0u8;
        for &n in numbers {
            if !(1..=7).contains(&n) {
                return None;
            }
            mask |= 1 << (n - 1);
        }
        Some(Self { mask })
    }

    /// 是否包含指定工作日
    pub fn contains(&self, day: Weekday) -> bool {
        self.mask & (1 << (day.number_from_monday() - 1)) != 0
    }

    /// 是否为空集合
    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// 集合内工作日数
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// 导出为 ISO 编号列表 (升序)
    pub fn to_iso_numbers(&self) -> Vec<u8> {
        (1..=7u8).filter(|n| self.mask & (1 << (n - 1)) != 0).collect()
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = String;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        WeekdaySet::from_iso_numbers(&numbers)
            .ok_or_else(|| format!("非法工作日编号 (应为1-7): {:?}", numbers))
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.to_iso_numbers()
    }
}

// ==========================================
// 修正器类目 (Modifier Category)
// ==========================================
// 优先级固定: 1-事件 < 2-促销 < 3-蚕食 < 4-节假日
// 低序号先应用; 蚕食/节假日作为对已调基线的末端校正
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierCategory {
    Event,           // 事件 (门店活动/天气等)
    Promo,           // 促销
    Cannibalization, // 蚕食 (关联SKU促销抢量)
    Holiday,         // 节假日
}

impl ModifierCategory {
    /// 固定优先级整数 (排序键, 越小越先应用)
    pub fn precedence(&self) -> u8 {
        match self {
            ModifierCategory::Event => 1,
            ModifierCategory::Promo => 2,
            ModifierCategory::Cannibalization => 3,
            ModifierCategory::Holiday => 4,
        }
    }

    /// 转换为存储用字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ModifierCategory::Event => "EVENT",
            ModifierCategory::Promo => "PROMO",
            ModifierCategory::Cannibalization => "CANNIBALIZATION",
            ModifierCategory::Holiday => "HOLIDAY",
        }
    }
}

impl fmt::Display for ModifierCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 修正器作用域 (Modifier Scope)
// ==========================================
// QTY_CORRECTION 不进入需求分布调整, 由编排器在策略之后应用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierScope {
    MuOnly,        // 仅调整均值
    Sigma,         // 仅调整标准差
    Both,          // 均值与标准差
    QtyCorrection, // 订货量末端校正 (策略后)
}

impl ModifierScope {
    /// 是否参与均值乘积
    pub fn affects_mu(&self) -> bool {
        matches!(self, ModifierScope::MuOnly | ModifierScope::Both)
    }

    /// 是否参与标准差乘积
    pub fn affects_sigma(&self) -> bool {
        matches!(self, ModifierScope::Sigma | ModifierScope::Both)
    }
}

impl fmt::Display for ModifierScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierScope::MuOnly => write!(f, "MU_ONLY"),
            ModifierScope::Sigma => write!(f, "SIGMA"),
            ModifierScope::Both => write!(f, "BOTH"),
            ModifierScope::QtyCorrection => write!(f, "QTY_CORRECTION"),
        }
    }
}

// ==========================================
// 叠加规则 (Stacking Rule)
// ==========================================
// MULTIPLICATIVE: value 即乘数
// ADDITIVE:       value 为增量, 以 (1 + value) 进入运行乘积
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackingRule {
    Multiplicative, // 乘法叠加
    Additive,       // 加法增量
}

impl fmt::Display for StackingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackingRule::Multiplicative => write!(f, "MULTIPLICATIVE"),
            StackingRule::Additive => write!(f, "ADDITIVE"),
        }
    }
}

// ==========================================
// 日期基准 (Date Basis)
// ==========================================
// 修正器激活窗口的判定日期: 下单日或收货日
// 缺失所需日期时跳过并记录警告, 不得静默改键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateBasis {
    OrderDate,    // 以下单日判定
    DeliveryDate, // 以收货日判定
}

impl fmt::Display for DateBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBasis::OrderDate => write!(f, "ORDER_DATE"),
            DateBasis::DeliveryDate => write!(f, "DELIVERY_DATE"),
        }
    }
}

// ==========================================
// 置信标签 (Confidence Tag)
// ==========================================
// 上游效应量估计的置信度, 仅用于审计展示, 不参与计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTag {
    High,   // 高置信
    Medium, // 中置信
    Low,    // 低置信 (数据不足回退时常见)
}

impl fmt::Display for ConfidenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTag::High => write!(f, "HIGH"),
            ConfidenceTag::Medium => write!(f, "MEDIUM"),
            ConfidenceTag::Low => write!(f, "LOW"),
        }
    }
}

// ==========================================
// 策略模式 (Policy Mode)
// ==========================================
// CSL:              严格入口, 直接消费已构建的分布/库存位置
// CSL_FROM_HISTORY: 便捷入口, 先经外部估计器产出基础分布
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyMode {
    Csl,            // 周期服务水平策略 (严格)
    CslFromHistory, // 周期服务水平策略 (估计器便捷入口)
}

impl PolicyMode {
    /// 转换为存储用字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PolicyMode::Csl => "CSL",
            PolicyMode::CslFromHistory => "CSL_FROM_HISTORY",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
