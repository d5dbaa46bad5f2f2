// ==========================================
// 零售智能补货系统 - 引擎层
// ==========================================
// 职责: 实现补货决策规则引擎, 纯同步计算, 不触存储
// 红线: Engine 不拼 SQL, 所有跳过/裁剪/兜底必须输出 reason
// ==========================================

pub mod calendar;
pub mod error;
pub mod estimator;
pub mod events;
pub mod modifiers;
pub mod orchestrator;
pub mod policy;
pub mod zscore;

// 重导出核心引擎
pub use calendar::{LogisticsCalendar, ResolvedWindow};
pub use error::{EngineError, EngineResult};
pub use estimator::BaseDemandEstimator;
pub use events::{ExplainSink, NoOpExplainSink, OptionalExplainSink};
pub use modifiers::{ModifierEngine, ModifierOutcome};
pub use orchestrator::{EvaluationRequest, ReplenishOrchestrator};
pub use policy::{ConstraintOutcome, CslPolicyEngine, PolicyDecision};
pub use zscore::{resolve_z, ZResolution};
