// ==========================================
// 零售智能补货系统 - CSL 订货策略引擎
// ==========================================
// 红线: 策略引擎只变换给定的 μ/σ, 绝不在内部重新估计需求;
//       约束链固定顺序 装箱 -> 起订量 -> 库存上限, 逐条留痕
// ==========================================
// 职责: 五段流水线 z解析 -> 再订货点 -> 库存位置 -> 原始量 -> 约束链
// 输入: 需求分布 + 库存快照 + as-of 日期 + 策略档案
// 输出: PolicyDecision (每段结果全部保留)
// ==========================================

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::config::policy_profile::PolicyProfile;
use crate::domain::demand::DemandDistribution;
use crate::domain::history::SalesHistory;
use crate::domain::inventory::InventoryPosition;
use crate::domain::types::PolicyMode;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::estimator::BaseDemandEstimator;
use crate::engine::zscore::resolve_z;

// ==========================================
// ConstraintOutcome - 约束链结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ConstraintOutcome {
    pub after_pack: i64,
    pub after_moq: i64,
    pub after_cap: i64,
    pub notes: Vec<String>,
}

// ==========================================
// PolicyDecision - 策略决策结果
// ==========================================
// 每个阶段的输出都保留, 供审计记录逐字段回放
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub mode: PolicyMode,

    // ===== 阶段1: z 解析 =====
    pub alpha_target: f64,
    pub alpha_resolved: f64,
    pub z_score: f64,

    // ===== 阶段2: 再订货点 =====
    pub reorder_point: f64, // S = μ_P + z·σ_P

    // ===== 阶段3: 库存位置 =====
    pub inventory_position_as_of: f64, // as-of 保护期末

    // ===== 阶段4: 原始量 =====
    pub raw_quantity: f64, // Q_raw = max(0, S - IP)

    // ===== 阶段5: 约束链 =====
    pub after_pack: i64,
    pub after_moq: i64,
    pub after_cap: i64,
    pub constraint_notes: Vec<String>,
    pub final_quantity: i64,
}

// ==========================================
// CslPolicyEngine - CSL 订货策略引擎
// ==========================================
pub struct CslPolicyEngine;

impl Default for CslPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CslPolicyEngine {
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 严格口径决策: 分布与库存直接给定, 五段流水线, 不重新推导
    ///
    /// as_of 为保护期末日期 (下单日 + P), 在途按其过滤
    #[instrument(skip(self, distribution, inventory, profile), fields(
        alpha = profile.alpha_target,
        mu = distribution.mu,
        sigma = distribution.sigma,
        as_of = %as_of
    ))]
    pub fn decide(
        &self,
        distribution: &DemandDistribution,
        inventory: &InventoryPosition,
        as_of: NaiveDate,
        profile: &PolicyProfile,
    ) -> EngineResult<PolicyDecision> {
        // 入参校验: 静默夹取会败坏审计语义, 一律立即报错
        distribution.validate().map_err(EngineError::Validation)?;
        inventory.validate().map_err(EngineError::Validation)?;
        profile.validate().map_err(EngineError::Validation)?;

        // 阶段1: z 解析 (α 越界在此拒绝)
        let resolution = resolve_z(profile.alpha_target)?;

        // 阶段2: 再订货点
        let reorder_point = distribution.mu + resolution.z * distribution.sigma;

        // 阶段3: as-of 库存位置
        let position = inventory.position_as_of(as_of);

        // 阶段4: 原始量
        let raw_quantity = (reorder_point - position).max(0.0);

        // 阶段5: 约束链
        let constrained = self.apply_constraints(raw_quantity, position, profile);

        let decision = PolicyDecision {
            mode: PolicyMode::Csl,
            alpha_target: profile.alpha_target,
            alpha_resolved: resolution.alpha_resolved,
            z_score: resolution.z,
            reorder_point,
            inventory_position_as_of: position,
            raw_quantity,
            after_pack: constrained.after_pack,
            after_moq: constrained.after_moq,
            after_cap: constrained.after_cap,
            final_quantity: constrained.after_cap,
            constraint_notes: constrained.notes,
        };

        debug!(
            z = decision.z_score,
            reorder_point = decision.reorder_point,
            position = decision.inventory_position_as_of,
            raw = decision.raw_quantity,
            final_quantity = decision.final_quantity,
            "策略决策完成"
        );
        Ok(decision)
    }

    /// 估计器口径决策: 先经估计器产出基础分布, 再走严格口径
    ///
    /// 返回 (决策, 估计出的分布); 调用方通常还需对分布过修正器,
    /// 编排器不走此入口
    pub fn decide_with_estimator<E: BaseDemandEstimator>(
        &self,
        estimator: &E,
        sku: &str,
        history: &SalesHistory,
        protection_days: i64,
        inventory: &InventoryPosition,
        as_of: NaiveDate,
        profile: &PolicyProfile,
    ) -> EngineResult<(PolicyDecision, DemandDistribution)> {
        history.validate().map_err(EngineError::Validation)?;
        let distribution = estimator.estimate(sku, history, protection_days)?;
        if distribution.protection_days != protection_days {
            return Err(EngineError::Validation(format!(
                "估计器返回的保护期与请求不一致: {} vs {}",
                distribution.protection_days, protection_days
            )));
        }

        let mut decision = self.decide(&distribution, inventory, as_of, profile)?;
        decision.mode = PolicyMode::CslFromHistory;
        Ok((decision, distribution))
    }

    // ==========================================
    // 约束链 (固定顺序, 逐条留痕)
    // ==========================================

    /// 对给定原始量走完整约束链: 装箱 -> 起订量 -> 库存上限
    ///
    /// 数量修正后的重过也走此入口, 保证最终量始终满足三条约束
    pub fn apply_constraints(
        &self,
        raw_quantity: f64,
        position: f64,
        profile: &PolicyProfile,
    ) -> ConstraintOutcome {
        let mut notes = Vec::new();
        let after_pack = self.apply_pack_rounding(raw_quantity, profile.pack_size, &mut notes);
        let after_moq = self.apply_moq_rule(after_pack, profile.moq, &mut notes);
        let after_cap = self.apply_stock_cap(
            after_moq,
            position,
            profile.max_stock,
            profile.pack_size,
            profile.moq,
            &mut notes,
        );
        ConstraintOutcome {
            after_pack,
            after_moq,
            after_cap,
            notes,
        }
    }

    /// 约束a: 向上取整到箱规整数倍, 零保持为零
    fn apply_pack_rounding(&self, raw: f64, pack_size: i64, notes: &mut Vec<String>) -> i64 {
        if raw <= 0.0 {
            return 0;
        }
        let packs = (raw / pack_size as f64).ceil() as i64;
        let rounded = packs * pack_size;
        if (rounded as f64 - raw).abs() > f64::EPSILON {
            notes.push(format!(
                "装箱规整: {:.2} -> {} (箱规 {})",
                raw, rounded, pack_size
            ));
        }
        rounded
    }

    /// 约束b: 低于起订量压为零, 不允许部分订单
    fn apply_moq_rule(&self, quantity: i64, moq: i64, notes: &mut Vec<String>) -> i64 {
        if quantity > 0 && quantity < moq {
            notes.push(format!("低于起订量压零: {} -> 0 (起订量 {})", quantity, moq));
            return 0;
        }
        quantity
    }

    /// 约束c: 库存上限裁剪到 max(0, 上限 - IP)
    ///
    /// 裁剪值向下规整到箱规整数倍; 裁剪后落在 (0, 起订量) 区间
    /// 的压为零 -- 上限可以把已过起订量的订单再压下来
    fn apply_stock_cap(
        &self,
        quantity: i64,
        position: f64,
        max_stock: Option<f64>,
        pack_size: i64,
        moq: i64,
        notes: &mut Vec<String>,
    ) -> i64 {
        let cap = match max_stock {
            Some(c) => c,
            None => return quantity,
        };
        let allowed = (cap - position).max(0.0);
        if (quantity as f64) <= allowed {
            return quantity;
        }

        let packs = (allowed / pack_size as f64).floor() as i64;
        let mut capped = packs.max(0) * pack_size;
        notes.push(format!(
            "库存上限裁剪: {} -> {} (上限 {:.0}, 库存位置 {:.2})",
            quantity, capped, cap, position
        ));

        if capped > 0 && capped < moq {
            notes.push(format!(
                "上限裁剪后低于起订量压零: {} -> 0 (起订量 {})",
                capped, moq
            ));
            capped = 0;
        }
        capped
    }
}
