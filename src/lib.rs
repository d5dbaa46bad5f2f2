// ==========================================
// 零售智能补货系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (仅配置存储)
// 系统定位: 决策支持引擎 (纯同步计算, 宿主负责并行与集成)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ConfidenceTag, DateBasis, HolidayEffect, Lane, ModifierCategory, ModifierScope, PolicyMode,
    StackingRule, WeekdaySet,
};

// 领域实体
pub use domain::{
    AppliedModifier, DemandDistribution, DemandModifier, ForecastMethod, InventoryPosition,
    ModifierHeader, ModifierKind, OrderExplain, OrderExplainBuilder, OrderExplainFlat,
    PipelineEntry, SalesHistory,
};

// 引擎
pub use engine::{
    BaseDemandEstimator, CslPolicyEngine, EngineError, EngineResult, EvaluationRequest,
    ExplainSink, LogisticsCalendar, ModifierEngine, NoOpExplainSink, OptionalExplainSink,
    PolicyDecision, ReplenishOrchestrator, ResolvedWindow,
};

// 配置
pub use config::{CalendarConfig, CalendarLoadReport, PolicyProfile, SettingsStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "零售智能补货系统";

// ==========================================
// 预编译检查
// ==========================================
