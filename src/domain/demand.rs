// ==========================================
// 零售智能补货系统 - 需求分布领域模型
// ==========================================
// 红线: 分布不可变, 任何调整返回新实例
// 用途: 外部估计器产出, 修正器引擎调整, 策略引擎只读
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// ForecastMethod - 基础预测方法标签
// ==========================================
// 估计本身在系统外部完成, 此处仅作来源标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForecastMethod {
    MovingAverage, // 滑动平均
    MonteCarlo,    // 蒙特卡洛模拟
    External,      // 宿主自定义估计器
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::MovingAverage => write!(f, "MOVING_AVERAGE"),
            ForecastMethod::MonteCarlo => write!(f, "MONTE_CARLO"),
            ForecastMethod::External => write!(f, "EXTERNAL"),
        }
    }
}

// ==========================================
// DemandDistribution - 保护期需求分布
// ==========================================
// 口径: mu/sigma 已按保护期 P 天汇总, 不是单日口径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandDistribution {
    // ===== 分布参数 =====
    pub mu: f64,              // 保护期需求均值 μ_P (≥0)
    pub sigma: f64,           // 保护期需求标准差 σ_P (≥0)
    pub protection_days: i64, // 保护期天数 P (≥0)

    // ===== 来源信息 =====
    pub method: ForecastMethod, // 基础预测方法
    pub sample_count: usize,    // 参与估计的样本天数
    pub censored_days: usize,   // 缺货截尾天数 (当日售罄, 需求被低估)

    // ===== 可选扩展 =====
    pub quantiles: Option<BTreeMap<String, f64>>, // 分位数表 (如 "P50"/"P90", 蒙特卡洛产出)
    pub sigma_multiplier: Option<f64>,            // 最近一次应用的 σ 放大系数
}

impl DemandDistribution {
    /// 构造基础分布 (来源信息按最小口径填充)
    pub fn new(mu: f64, sigma: f64, protection_days: i64, method: ForecastMethod) -> Self {
        Self {
            mu,
            sigma,
            protection_days,
            method,
            sample_count: 0,
            censored_days: 0,
            quantiles: None,
            sigma_multiplier: None,
        }
    }

    /// 附加样本来源信息 (返回新实例)
    pub fn with_provenance(mut self, sample_count: usize, censored_days: usize) -> Self {
        self.sample_count = sample_count;
        self.censored_days = censored_days;
        self
    }

    /// 附加分位数表 (返回新实例)
    pub fn with_quantiles(mut self, quantiles: BTreeMap<String, f64>) -> Self {
        self.quantiles = Some(quantiles);
        self
    }

    /// 均值调整: μ_P 乘以系数, 返回新实例
    ///
    /// 来源信息原样保留 (调整不改变估计来源)
    pub fn scale_mu(&self, factor: f64) -> Self {
        let mut next = self.clone();
        next.mu = self.mu * factor;
        next
    }

    /// 标准差调整: σ_P 乘以系数并记录为 sigma_multiplier, 返回新实例
    pub fn scale_sigma(&self, factor: f64) -> Self {
        let mut next = self.clone();
        next.sigma = self.sigma * factor;
        next.sigma_multiplier = Some(factor);
        next
    }

    /// 入参校验: μ/σ/P 均不得为负
    ///
    /// 返回首个违规描述; 由引擎层包装为类型化错误
    pub fn validate(&self) -> Result<(), String> {
        if !self.mu.is_finite() || self.mu < 0.0 {
            return Err(format!("mu 非法: {}", self.mu));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(format!("sigma 非法: {}", self.sigma));
        }
        if self.protection_days < 0 {
            return Err(format!("protection_days 非法: {}", self.protection_days));
        }
        Ok(())
    }
}
