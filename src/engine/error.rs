// ==========================================
// 零售智能补货系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::settings_store::SettingsError;
use crate::domain::explain::ExplainBuildError;
use crate::domain::types::Lane;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 日历配置错误 =====
    #[error("日历配置非法: {0}")]
    CalendarConfig(String),

    #[error("日历搜索未收敛: 自 {from} 起 {limit} 次迭代内未找到{target}")]
    CalendarNonConvergence {
        from: NaiveDate,
        limit: u32,
        target: String,
    },

    // ===== 订货日校验错误 =====
    #[error("{date} 不是有效订货日")]
    NotOrderDay { date: NaiveDate },

    #[error("通道 {lane} 仅限周五下单: {date}")]
    LaneRequiresFriday { lane: Lane, date: NaiveDate },

    // ===== 入参校验错误 =====
    #[error("入参校验失败: {0}")]
    Validation(String),

    // ===== 审计记录错误 =====
    #[error("审计记录装配失败: {0}")]
    ExplainIncomplete(#[from] ExplainBuildError),

    // ===== 配置存储错误 =====
    #[error("配置存储错误: {0}")]
    Settings(#[from] SettingsError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
