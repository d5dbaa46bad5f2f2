// ==========================================
// 零售智能补货系统 - 需求修正器引擎
// ==========================================
// 红线: 固定优先级 event(1) -> promo(2) -> cannibalization(3)
//       -> holiday(4); 促销多窗口同时命中时取偏离 1.0 最远者;
//       σ 只放大不缩小, 放大系数夹在 [1.0, 2.5]
// ==========================================
// 职责: 对基础需求分布应用修正器, 输出修正后分布 + 完整审计轨迹
// 输入: 基础 DemandDistribution + 候选修正器 + 下单日/到货日
// 输出: ModifierOutcome (新分布, 实际生效列表, 跳过告警)
// ==========================================

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::domain::demand::DemandDistribution;
use crate::domain::modifier::{AppliedModifier, DemandModifier};
use crate::domain::types::{DateBasis, ModifierCategory, ModifierScope};

/// σ 放大系数下限 (σ 永不缩小)
pub const SIGMA_MULTIPLIER_FLOOR: f64 = 1.0;

/// σ 放大系数上限
pub const SIGMA_MULTIPLIER_CEIL: f64 = 2.5;

// ==========================================
// ModifierOutcome - 修正结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ModifierOutcome {
    pub distribution: DemandDistribution, // 修正后的需求分布
    pub applied: Vec<AppliedModifier>,    // 实际生效的修正器 (按应用顺序)
    pub warnings: Vec<String>,            // 跳过告警 (SKIP_* 前缀)
}

// ==========================================
// ModifierEngine - 需求修正器引擎
// ==========================================
pub struct ModifierEngine;

impl Default for ModifierEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifierEngine {
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 对基础分布应用候选修正器
    ///
    /// 规则（顺序执行）:
    /// 1) 排除 qty_correction 作用域 (策略后修正, 不进此栈)
    /// 2) 按各自的日期锚定判定生效窗口; 所需日期缺失 → 跳过并告警
    /// 3) 促销类多窗口命中 → 仅保留 |系数-1.0| 最大者, 并列取输入序最早者
    /// 4) 按固定优先级稳定排序后依次应用; μ 与 σ 各自维护独立累积积
    /// 5) 存在 both/sigma 作用域的生效修正器时, σ 乘以
    ///    clamp(σ累积积, 1.0, 2.5); 纯 mu_only 列表不触碰 σ
    #[instrument(skip(self, base, candidates), fields(candidates = candidates.len()))]
    pub fn apply(
        &self,
        base: &DemandDistribution,
        candidates: &[DemandModifier],
        order_date: Option<NaiveDate>,
        delivery_date: Option<NaiveDate>,
    ) -> ModifierOutcome {
        let mut warnings = Vec::new();

        // 1. 筛选生效候选 (排除 qty_correction)
        let active = self.filter_active(
            candidates,
            order_date,
            delivery_date,
            &mut warnings,
            false,
        );

        // 2. 促销择一
        let selected = self.select_promos(active, &mut warnings);

        // 3. 固定优先级稳定排序
        let mut ordered = selected;
        ordered.sort_by_key(|m| m.precedence());

        // 4. 依次应用, 维护 μ/σ 双累积
        let mut current = base.clone();
        let mut sigma_product = 1.0f64;
        let mut sigma_affecting = false;
        let mut applied = Vec::with_capacity(ordered.len());

        for m in &ordered {
            let multiplier = m.effective_multiplier();
            let mu_before = current.mu;
            if m.header.scope.affects_mu() {
                current = current.scale_mu(multiplier);
            }
            if m.header.scope.affects_sigma() {
                sigma_product *= multiplier;
                sigma_affecting = true;
            }
            applied.push(AppliedModifier::from_candidate(m, mu_before, current.mu));
        }

        // 5. σ 只放大不缩小
        if sigma_affecting {
            let factor = sigma_product.clamp(SIGMA_MULTIPLIER_FLOOR, SIGMA_MULTIPLIER_CEIL);
            current = current.scale_sigma(factor);
        }

        debug!(
            applied = applied.len(),
            warnings = warnings.len(),
            mu_before = base.mu,
            mu_after = current.mu,
            sigma_after = current.sigma,
            "修正器应用完成"
        );

        ModifierOutcome {
            distribution: current,
            applied,
            warnings,
        }
    }

    /// 策略后数量修正器: 生效的 qty_correction 候选 (按输入序)
    ///
    /// 与 apply 共用生效窗口/日期锚定判定; 由编排器在约束链之后应用
    pub fn active_qty_corrections<'a>(
        &self,
        candidates: &'a [DemandModifier],
        order_date: Option<NaiveDate>,
        delivery_date: Option<NaiveDate>,
    ) -> (Vec<&'a DemandModifier>, Vec<String>) {
        let mut warnings = Vec::new();
        let active = self.filter_active(
            candidates,
            order_date,
            delivery_date,
            &mut warnings,
            true,
        );
        (active, warnings)
    }

    // ==========================================
    // 生效判定
    // ==========================================

    /// 按日期锚定筛选生效候选
    ///
    /// 边界处理:
    /// - 所需日期缺失 → 跳过 + SKIP_MISSING_*_DATE 告警, 绝不换用另一日期
    /// - 折算系数为负 → 跳过 + SKIP_NEGATIVE_MULTIPLIER 告警 (保护 μ ≥ 0)
    /// - 窗口外 → 静默不生效 (不是告警)
    fn filter_active<'a>(
        &self,
        candidates: &'a [DemandModifier],
        order_date: Option<NaiveDate>,
        delivery_date: Option<NaiveDate>,
        warnings: &mut Vec<String>,
        qty_correction: bool,
    ) -> Vec<&'a DemandModifier> {
        let mut active = Vec::new();
        for m in candidates {
            if (m.header.scope == ModifierScope::QtyCorrection) != qty_correction {
                continue;
            }

            let anchor = match m.header.date_basis {
                DateBasis::OrderDate => match order_date {
                    Some(d) => d,
                    None => {
                        warnings.push(format!(
                            "SKIP_MISSING_ORDER_DATE: 修正器 {} 按下单日生效但未提供下单日",
                            m.header.name
                        ));
                        continue;
                    }
                },
                DateBasis::DeliveryDate => match delivery_date {
                    Some(d) => d,
                    None => {
                        warnings.push(format!(
                            "SKIP_MISSING_DELIVERY_DATE: 修正器 {} 按到货日生效但未提供到货日",
                            m.header.name
                        ));
                        continue;
                    }
                },
            };

            if !m.is_active_on(anchor) {
                continue;
            }

            if m.effective_multiplier() < 0.0 {
                warnings.push(format!(
                    "SKIP_NEGATIVE_MULTIPLIER: 修正器 {} 折算系数为负 ({:.4})",
                    m.header.name,
                    m.effective_multiplier()
                ));
                continue;
            }

            active.push(m);
        }
        active
    }

    /// 促销择一: |系数 - 1.0| 最大者胜出, 并列取输入序最早者
    fn select_promos<'a>(
        &self,
        active: Vec<&'a DemandModifier>,
        warnings: &mut Vec<String>,
    ) -> Vec<&'a DemandModifier> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, m) in active.iter().enumerate() {
            if m.category() != ModifierCategory::Promo {
                continue;
            }
            let deviation = (m.effective_multiplier() - 1.0).abs();
            match best {
                // 严格大于才替换, 并列保留最早者
                Some((_, best_dev)) if deviation <= best_dev => {}
                _ => best = Some((idx, deviation)),
            }
        }

        let mut selected = Vec::with_capacity(active.len());
        for (idx, m) in active.into_iter().enumerate() {
            if m.category() == ModifierCategory::Promo {
                match best {
                    Some((best_idx, _)) if best_idx == idx => selected.push(m),
                    _ => warnings.push(format!(
                        "SKIP_PROMO_NOT_SELECTED: 促销 {} 未被选中 (同期存在偏离更大的促销)",
                        m.header.name
                    )),
                }
            } else {
                selected.push(m);
            }
        }
        selected
    }
}
