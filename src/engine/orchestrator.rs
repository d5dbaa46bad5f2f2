// ==========================================
// 零售智能补货系统 - 补货评估编排器
// ==========================================
// 职责: 协调 物流日历 -> 需求修正 -> CSL策略 -> 数量修正 -> 审计装配
// 红线: 编排器不含业务公式, 只负责顺序/一致性校验/留痕/下发;
//       审计下发失败只告警, 决策照常返回
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::calendar_config::CalendarConfig;
use crate::config::policy_profile::PolicyProfile;
use crate::domain::demand::DemandDistribution;
use crate::domain::explain::{OrderExplain, OrderExplainBuilder};
use crate::domain::history::SalesHistory;
use crate::domain::inventory::InventoryPosition;
use crate::domain::modifier::{AppliedModifier, DemandModifier};
use crate::domain::types::{Lane, PolicyMode};
use crate::engine::calendar::{LogisticsCalendar, ResolvedWindow};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::estimator::BaseDemandEstimator;
use crate::engine::events::{ExplainSink, OptionalExplainSink};
use crate::engine::modifiers::ModifierEngine;
use crate::engine::policy::CslPolicyEngine;

// ==========================================
// EvaluationRequest - 单次评估入参
// ==========================================

/// 一次 SKU 级补货评估所需的全部输入
///
/// distribution 与 history 按口径二选一: 预先口径走 distribution,
/// 估计器口径走 history。两者都给时以所调用的入口为准。
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub sku: String,
    pub order_date: NaiveDate,
    pub lane: Lane,
    /// 人工到货日覆盖 (直接作为 r1, 不再查询通道规则)
    pub receipt_override: Option<NaiveDate>,

    /// 预先口径: 已按保护期折算的需求分布
    pub distribution: Option<DemandDistribution>,
    /// 估计器口径: 日粒度销售历史
    pub history: Option<SalesHistory>,

    pub modifiers: Vec<DemandModifier>,
    pub inventory: InventoryPosition,
    pub profile: PolicyProfile,
}

impl EvaluationRequest {
    /// 预先口径请求: 分布由调用方给定
    pub fn with_distribution(
        sku: impl Into<String>,
        order_date: NaiveDate,
        lane: Lane,
        distribution: DemandDistribution,
        inventory: InventoryPosition,
        profile: PolicyProfile,
    ) -> Self {
        Self {
            sku: sku.into(),
            order_date,
            lane,
            receipt_override: None,
            distribution: Some(distribution),
            history: None,
            modifiers: Vec::new(),
            inventory,
            profile,
        }
    }

    /// 估计器口径请求: 保护期解析后再由估计器产出分布
    pub fn with_history(
        sku: impl Into<String>,
        order_date: NaiveDate,
        lane: Lane,
        history: SalesHistory,
        inventory: InventoryPosition,
        profile: PolicyProfile,
    ) -> Self {
        Self {
            sku: sku.into(),
            order_date,
            lane,
            receipt_override: None,
            distribution: None,
            history: Some(history),
            modifiers: Vec::new(),
            inventory,
            profile,
        }
    }
}

// ==========================================
// ReplenishOrchestrator - 补货评估编排器
// ==========================================

pub struct ReplenishOrchestrator {
    calendar: LogisticsCalendar,
    modifier_engine: ModifierEngine,
    policy_engine: CslPolicyEngine,
    sink: OptionalExplainSink,
}

impl ReplenishOrchestrator {
    /// 创建编排器实例, 日历配置非法即拒绝
    pub fn new(config: Arc<CalendarConfig>) -> EngineResult<Self> {
        Ok(Self {
            calendar: LogisticsCalendar::new(config)?,
            modifier_engine: ModifierEngine::new(),
            policy_engine: CslPolicyEngine::new(),
            sink: OptionalExplainSink::none(),
        })
    }

    /// 挂接审计消费者 (导出/入库等由宿主实现)
    pub fn with_sink(mut self, sink: Arc<dyn ExplainSink>) -> Self {
        self.sink = OptionalExplainSink::with_sink(sink);
        self
    }

    pub fn calendar(&self) -> &LogisticsCalendar {
        &self.calendar
    }

    // ==========================================
    // 评估入口
    // ==========================================

    /// 预先口径评估: 请求须携带已折算到保护期的需求分布
    ///
    /// 分布的 protection_days 必须与日历解析结果一致, 不一致
    /// 说明调用方折算口径有误, 立即报错而非静默修正
    #[instrument(skip(self, request), fields(
        sku = %request.sku,
        order_date = %request.order_date,
        lane = %request.lane
    ))]
    pub fn evaluate(&self, request: &EvaluationRequest) -> EngineResult<OrderExplain> {
        let distribution = request.distribution.clone().ok_or_else(|| {
            EngineError::Validation("预先口径评估缺少需求分布".to_string())
        })?;

        // ==========================================
        // 步骤1: 物流日历解析
        // ==========================================
        debug!("步骤1: 解析到货日与保护期");
        let window = self.calendar.resolve_receipt_and_protection(
            request.order_date,
            request.lane,
            request.receipt_override,
        )?;

        self.evaluate_resolved(request, window, distribution, PolicyMode::Csl)
    }

    /// 估计器口径评估: 先解析保护期, 再让估计器按该保护期
    /// 折算历史, 其余与预先口径一致
    #[instrument(skip(self, estimator, request), fields(
        sku = %request.sku,
        order_date = %request.order_date,
        lane = %request.lane
    ))]
    pub fn evaluate_with_estimator<E: BaseDemandEstimator>(
        &self,
        estimator: &E,
        request: &EvaluationRequest,
    ) -> EngineResult<OrderExplain> {
        let history = request.history.as_ref().ok_or_else(|| {
            EngineError::Validation("估计器口径评估缺少销售历史".to_string())
        })?;
        history.validate().map_err(EngineError::Validation)?;

        // ==========================================
        // 步骤1: 物流日历解析 (估计器需要先拿到保护期)
        // ==========================================
        debug!("步骤1: 解析到货日与保护期");
        let window = self.calendar.resolve_receipt_and_protection(
            request.order_date,
            request.lane,
            request.receipt_override,
        )?;

        let distribution = estimator.estimate(&request.sku, history, window.protection_days)?;

        self.evaluate_resolved(request, window, distribution, PolicyMode::CslFromHistory)
    }

    /// 周五双通道评估: 周六通道先评, 周六单计入在途后再评周一通道
    ///
    /// 周六订货量只在周一通道的库存位置中抵扣一次, 不会重复补量。
    /// 双通道共用同一请求, 到货日覆盖在此流程中无定义, 直接拒绝
    #[instrument(skip(self, estimator, request), fields(
        sku = %request.sku,
        order_date = %request.order_date
    ))]
    pub fn evaluate_friday_pair<E: BaseDemandEstimator>(
        &self,
        estimator: &E,
        request: &EvaluationRequest,
    ) -> EngineResult<(OrderExplain, OrderExplain)> {
        if request.order_date.weekday() != Weekday::Fri {
            return Err(EngineError::Validation(format!(
                "周五双通道评估要求下单日为周五: {}",
                request.order_date
            )));
        }
        if request.receipt_override.is_some() {
            return Err(EngineError::Validation(
                "周五双通道评估不支持到货日覆盖".to_string(),
            ));
        }

        // 周六通道先评
        let mut saturday_request = request.clone();
        saturday_request.lane = Lane::Saturday;
        let saturday = self.evaluate_with_estimator(estimator, &saturday_request)?;

        // 周一通道: 周六单入在途后重评
        let mut monday_request = request.clone();
        monday_request.lane = Lane::Monday;
        if saturday.final_quantity > 0 {
            monday_request.inventory = request
                .inventory
                .with_pipeline_entry(saturday.receipt_date, saturday.final_quantity as f64);
        }
        let monday = self.evaluate_with_estimator(estimator, &monday_request)?;

        info!(
            saturday_quantity = saturday.final_quantity,
            monday_quantity = monday.final_quantity,
            "周五双通道评估完成"
        );
        Ok((saturday, monday))
    }

    /// 批量评估 (预先口径): 逐条独立评估, 顺序保持, 单条失败不中断
    #[instrument(skip(self, requests), fields(total = requests.len()))]
    pub fn evaluate_batch(
        &self,
        requests: &[EvaluationRequest],
    ) -> Vec<EngineResult<OrderExplain>> {
        let results: Vec<EngineResult<OrderExplain>> =
            requests.iter().map(|r| self.evaluate(r)).collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        info!(
            total = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            "批量评估完成"
        );
        results
    }

    // ==========================================
    // 共用主流程 (日历已解析, 分布已就位)
    // ==========================================

    fn evaluate_resolved(
        &self,
        request: &EvaluationRequest,
        window: ResolvedWindow,
        distribution: DemandDistribution,
        mode: PolicyMode,
    ) -> EngineResult<OrderExplain> {
        info!(
            sku = %request.sku,
            receipt_date = %window.receipt_date,
            protection_days = window.protection_days,
            "开始补货评估"
        );

        // ==========================================
        // 步骤2: 保护期一致性校验
        // ==========================================
        if distribution.protection_days != window.protection_days {
            return Err(EngineError::Validation(format!(
                "需求分布保护期与日历解析不一致: {} vs {}",
                distribution.protection_days, window.protection_days
            )));
        }

        // ==========================================
        // 步骤3: 需求修正器
        // ==========================================
        debug!("步骤3: 应用需求修正器");
        let outcome = self.modifier_engine.apply(
            &distribution,
            &request.modifiers,
            Some(request.order_date),
            Some(window.receipt_date),
        );
        let mut applied = outcome.applied;
        let mut warnings = outcome.warnings;
        info!(
            applied_count = applied.len(),
            warning_count = warnings.len(),
            mu = outcome.distribution.mu,
            sigma = outcome.distribution.sigma,
            "需求修正完成"
        );

        // ==========================================
        // 步骤4: CSL 策略决策
        // ==========================================
        debug!("步骤4: 执行策略决策");
        let as_of = request.order_date + Duration::days(window.protection_days);
        let mut decision = self.policy_engine.decide(
            &outcome.distribution,
            &request.inventory,
            as_of,
            &request.profile,
        )?;
        decision.mode = mode;
        info!(
            raw_quantity = decision.raw_quantity,
            final_quantity = decision.final_quantity,
            "策略决策阶段完成"
        );

        // ==========================================
        // 步骤5: 策略后数量修正
        // ==========================================
        debug!("步骤5: 应用策略后数量修正");
        let (corrections, correction_warnings) = self.modifier_engine.active_qty_corrections(
            &request.modifiers,
            Some(request.order_date),
            Some(window.receipt_date),
        );
        warnings.extend(correction_warnings);

        let mut notes = decision.constraint_notes.clone();
        let mut final_quantity = decision.final_quantity;
        if !corrections.is_empty() {
            let mut quantity = decision.final_quantity as f64;
            for correction in &corrections {
                let before = quantity;
                quantity *= correction.effective_multiplier();
                let mut entry = AppliedModifier::from_candidate(correction, before, quantity);
                entry.note = Some(match entry.note {
                    Some(n) => format!("{}; 数量修正条目, μ字段记录订货量", n),
                    None => "数量修正条目, μ字段记录订货量".to_string(),
                });
                applied.push(entry);
            }

            // 修正积作用在最终量上, 重过约束链保证装箱/起订量/上限仍成立
            let reapplied = self.policy_engine.apply_constraints(
                quantity,
                decision.inventory_position_as_of,
                &request.profile,
            );
            notes.push(format!(
                "数量修正 (生效 {} 条): {} -> {}",
                corrections.len(),
                final_quantity,
                reapplied.after_cap
            ));
            for note in reapplied.notes {
                notes.push(format!("修正后{}", note));
            }
            final_quantity = reapplied.after_cap;

            info!(
                correction_count = corrections.len(),
                final_quantity,
                "数量修正完成"
            );
        }

        // ==========================================
        // 步骤6: 审计装配
        // ==========================================
        debug!("步骤6: 装配审计记录");
        let explain = OrderExplainBuilder::new(&request.sku, request.order_date)
            .with_calendar(
                request.lane,
                window.receipt_date,
                window.next_receipt_date,
                window.protection_days,
            )
            .with_demand(outcome.distribution)
            .with_inventory(request.inventory.clone(), decision.inventory_position_as_of)
            .with_modifiers(applied, warnings)
            .with_policy(
                decision.mode,
                decision.alpha_target,
                decision.alpha_resolved,
                decision.z_score,
                decision.reorder_point,
                decision.raw_quantity,
            )
            .with_constraints(
                decision.after_pack,
                decision.after_moq,
                decision.after_cap,
                notes,
                final_quantity,
            )
            .build()?;

        // ==========================================
        // 步骤7: 审计下发 (失败只告警)
        // ==========================================
        if let Err(e) = self.sink.consume(&explain) {
            warn!(
                explain_id = %explain.explain_id,
                error = %e,
                "审计下发失败, 决策照常返回"
            );
        }

        info!(
            explain_id = %explain.explain_id,
            final_quantity = explain.final_quantity,
            "补货评估完成"
        );
        Ok(explain)
    }
}
