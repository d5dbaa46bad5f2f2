// ==========================================
// 零售智能补货系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型与审计契约
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod demand;
pub mod explain;
pub mod history;
pub mod inventory;
pub mod modifier;
pub mod types;

// 重导出核心类型
pub use demand::{DemandDistribution, ForecastMethod};
pub use explain::{ExplainBuildError, OrderExplain, OrderExplainBuilder, OrderExplainFlat};
pub use history::SalesHistory;
pub use inventory::{InventoryPosition, PipelineEntry};
pub use modifier::{AppliedModifier, DemandModifier, ModifierHeader, ModifierKind};
pub use types::{
    ConfidenceTag, DateBasis, HolidayEffect, Lane, ModifierCategory, ModifierScope, PolicyMode,
    StackingRule, WeekdaySet,
};
