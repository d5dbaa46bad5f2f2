// ==========================================
// 零售智能补货系统 - 基础需求估计器接口
// ==========================================
// 红线: 统计估计 (滑动平均/蒙特卡洛等) 在系统外部完成,
//       引擎只消费估计结果, 本 crate 不内置任何实现
// ==========================================

use crate::domain::demand::DemandDistribution;
use crate::domain::history::SalesHistory;
use crate::engine::error::EngineResult;

/// 基础需求估计器 (宿主实现)
///
/// 由销售历史产出保护期口径的需求分布; 返回的
/// `protection_days` 必须等于传入的保护期
pub trait BaseDemandEstimator {
    fn estimate(
        &self,
        sku: &str,
        history: &SalesHistory,
        protection_days: i64,
    ) -> EngineResult<DemandDistribution>;
}
