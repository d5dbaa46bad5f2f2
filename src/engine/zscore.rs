// ==========================================
// 零售智能补货系统 - 服务水平因子表
// ==========================================
// 职责: 目标服务水平 α 映射到标准正态分位数 z(α)
// 红线: 固定档位表 + 最近邻吸附, 不做插值;
//       等距时吸附到更高档位 (服务水平保守方向)
// ==========================================

use crate::engine::error::{EngineError, EngineResult};

/// 标准档位表: (α, z)
///
/// 覆盖常用服务水平区间, 0.90 以上加密到百分位
const Z_TABLE: [(f64, f64); 20] = [
    (0.50, 0.000),
    (0.55, 0.126),
    (0.60, 0.253),
    (0.65, 0.385),
    (0.70, 0.524),
    (0.75, 0.674),
    (0.80, 0.842),
    (0.85, 1.036),
    (0.90, 1.282),
    (0.91, 1.341),
    (0.92, 1.405),
    (0.93, 1.476),
    (0.94, 1.555),
    (0.95, 1.645),
    (0.96, 1.751),
    (0.97, 1.881),
    (0.98, 2.054),
    (0.99, 2.326),
    (0.995, 2.576),
    (0.999, 3.090),
];

/// α 解析结果: 吸附后的档位与对应 z 值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZResolution {
    pub alpha_resolved: f64,
    pub z: f64,
}

/// 解析目标服务水平: 校验 α ∈ (0, 1), 吸附到最近标准档位
pub fn resolve_z(alpha: f64) -> EngineResult<ZResolution> {
    if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
        return Err(EngineError::Validation(format!(
            "目标服务水平必须在 (0, 1) 开区间内: {}",
            alpha
        )));
    }

    let mut best = Z_TABLE[0];
    let mut best_diff = (alpha - best.0).abs();
    for &(a, z) in Z_TABLE.iter().skip(1) {
        let diff = (alpha - a).abs();
        // 表按 α 升序; <= 使等距时吸附到更高档位
        if diff <= best_diff {
            best = (a, z);
            best_diff = diff;
        }
    }

    Ok(ZResolution {
        alpha_resolved: best.0,
        z: best.1,
    })
}
