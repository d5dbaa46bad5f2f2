// ==========================================
// 零售智能补货系统 - 订货决策审计记录
// ==========================================
// 红线: 审计记录一次构建, 返回后不可变更;
//       影响最终订货量的每个数字都必须出现在扁平投影中
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::demand::DemandDistribution;
use crate::domain::inventory::InventoryPosition;
use crate::domain::modifier::AppliedModifier;
use crate::domain::types::{Lane, PolicyMode};

// ==========================================
// ExplainBuildError - 构建期缺阶段错误
// ==========================================
#[derive(Debug, thiserror::Error)]
pub enum ExplainBuildError {
    #[error("审计记录缺少阶段: {0}")]
    MissingStage(&'static str),
}

// ==========================================
// OrderExplain - 单次评估的终态审计记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderExplain {
    // ===== 标识 =====
    pub explain_id: String,     // 审计记录编号 (UUID)
    pub sku: String,            // SKU 编号
    pub as_of_date: NaiveDate,  // 评估基准日 (下单日)
    pub created_at: DateTime<Utc>,

    // ===== 日历阶段 =====
    pub lane: Lane,                    // 订货通道
    pub receipt_date: NaiveDate,       // 本单到货日 r1
    pub next_receipt_date: NaiveDate,  // 下一订货机会到货日 r2
    pub protection_days: i64,          // 保护期 P = r2 - r1

    // ===== 需求阶段 =====
    pub demand: DemandDistribution, // 修正后的需求分布

    // ===== 库存阶段 =====
    pub inventory: InventoryPosition,     // 评估时库存快照
    pub inventory_position_as_of: f64,    // as-of 保护期末的库存位置

    // ===== 修正器阶段 =====
    pub modifiers: Vec<AppliedModifier>, // 实际生效的修正器 (含数量修正)
    pub modifier_warnings: Vec<String>,  // 被跳过修正器的告警

    // ===== 策略阶段 =====
    pub policy_mode: PolicyMode,
    pub alpha_target: f64,   // 目标服务水平
    pub alpha_resolved: f64, // 吸附后的标准档位
    pub z_score: f64,        // 服务水平因子 z(α)
    pub reorder_point: f64,  // 再订货点 S = μ_P + z·σ_P
    pub raw_quantity: f64,   // 原始量 Q_raw = max(0, S - IP)

    // ===== 约束阶段 =====
    pub after_pack: i64,               // 装箱规整后数量
    pub after_moq: i64,                // 起订量规则后数量
    pub after_cap: i64,                // 库存上限裁剪后数量
    pub constraint_notes: Vec<String>, // 逐条约束说明 (含数量修正)
    pub final_quantity: i64,           // 最终订货量
}

impl OrderExplain {
    /// 扁平投影: 单层标量结构, 供导出/回归比对使用
    pub fn flatten(&self) -> OrderExplainFlat {
        let pipeline_total: f64 = self.inventory.pipeline.iter().map(|e| e.quantity).sum();
        OrderExplainFlat {
            explain_id: self.explain_id.clone(),
            sku: self.sku.clone(),
            as_of_date: self.as_of_date,
            lane: self.lane.to_string(),
            receipt_date: self.receipt_date,
            next_receipt_date: self.next_receipt_date,
            protection_days: self.protection_days,
            mu: self.demand.mu,
            sigma: self.demand.sigma,
            sigma_multiplier: self.demand.sigma_multiplier,
            forecast_method: self.demand.method.to_string(),
            sample_count: self.demand.sample_count,
            censored_days: self.demand.censored_days,
            on_hand: self.inventory.on_hand,
            on_order: self.inventory.on_order,
            unfulfilled: self.inventory.unfulfilled,
            pipeline_total,
            inventory_position_as_of: self.inventory_position_as_of,
            modifier_count: self.modifiers.len(),
            modifier_names: self
                .modifiers
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            policy_mode: self.policy_mode.to_string(),
            alpha_target: self.alpha_target,
            alpha_resolved: self.alpha_resolved,
            z_score: self.z_score,
            reorder_point: self.reorder_point,
            raw_quantity: self.raw_quantity,
            after_pack: self.after_pack,
            after_moq: self.after_moq,
            after_cap: self.after_cap,
            final_quantity: self.final_quantity,
            warning_count: self.modifier_warnings.len(),
            created_at: self.created_at,
        }
    }
}

// ==========================================
// OrderExplainFlat - 扁平投影
// ==========================================
// 全部标量字段, 便于 CSV 导出与逐字段回归比对
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderExplainFlat {
    pub explain_id: String,
    pub sku: String,
    pub as_of_date: NaiveDate,
    pub lane: String,
    pub receipt_date: NaiveDate,
    pub next_receipt_date: NaiveDate,
    pub protection_days: i64,
    pub mu: f64,
    pub sigma: f64,
    pub sigma_multiplier: Option<f64>,
    pub forecast_method: String,
    pub sample_count: usize,
    pub censored_days: usize,
    pub on_hand: f64,
    pub on_order: f64,
    pub unfulfilled: f64,
    pub pipeline_total: f64,
    pub inventory_position_as_of: f64,
    pub modifier_count: usize,
    pub modifier_names: String, // 逗号连接
    pub policy_mode: String,
    pub alpha_target: f64,
    pub alpha_resolved: f64,
    pub z_score: f64,
    pub reorder_point: f64,
    pub raw_quantity: f64,
    pub after_pack: i64,
    pub after_moq: i64,
    pub after_cap: i64,
    pub final_quantity: i64,
    pub warning_count: usize,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// OrderExplainBuilder - 分阶段装配器
// ==========================================
// 编排器按阶段喂入结果; build() 时任一阶段缺失即报错,
// 半成品状态对外不可见
#[derive(Debug, Default)]
pub struct OrderExplainBuilder {
    sku: String,
    as_of_date: Option<NaiveDate>,

    calendar: Option<CalendarStage>,
    demand: Option<DemandDistribution>,
    inventory: Option<(InventoryPosition, f64)>,
    modifiers: Option<(Vec<AppliedModifier>, Vec<String>)>,
    policy: Option<PolicyStage>,
    constraints: Option<ConstraintStage>,
}

#[derive(Debug)]
struct CalendarStage {
    lane: Lane,
    receipt_date: NaiveDate,
    next_receipt_date: NaiveDate,
    protection_days: i64,
}

#[derive(Debug)]
struct PolicyStage {
    mode: PolicyMode,
    alpha_target: f64,
    alpha_resolved: f64,
    z_score: f64,
    reorder_point: f64,
    raw_quantity: f64,
}

#[derive(Debug)]
struct ConstraintStage {
    after_pack: i64,
    after_moq: i64,
    after_cap: i64,
    notes: Vec<String>,
    final_quantity: i64,
}

impl OrderExplainBuilder {
    pub fn new(sku: impl Into<String>, as_of_date: NaiveDate) -> Self {
        Self {
            sku: sku.into(),
            as_of_date: Some(as_of_date),
            ..Default::default()
        }
    }

    pub fn with_calendar(
        mut self,
        lane: Lane,
        receipt_date: NaiveDate,
        next_receipt_date: NaiveDate,
        protection_days: i64,
    ) -> Self {
        self.calendar = Some(CalendarStage {
            lane,
            receipt_date,
            next_receipt_date,
            protection_days,
        });
        self
    }

    pub fn with_demand(mut self, demand: DemandDistribution) -> Self {
        self.demand = Some(demand);
        self
    }

    pub fn with_inventory(mut self, inventory: InventoryPosition, position_as_of: f64) -> Self {
        self.inventory = Some((inventory, position_as_of));
        self
    }

    pub fn with_modifiers(
        mut self,
        applied: Vec<AppliedModifier>,
        warnings: Vec<String>,
    ) -> Self {
        self.modifiers = Some((applied, warnings));
        self
    }

    pub fn with_policy(
        mut self,
        mode: PolicyMode,
        alpha_target: f64,
        alpha_resolved: f64,
        z_score: f64,
        reorder_point: f64,
        raw_quantity: f64,
    ) -> Self {
        self.policy = Some(PolicyStage {
            mode,
            alpha_target,
            alpha_resolved,
            z_score,
            reorder_point,
            raw_quantity,
        });
        self
    }

    pub fn with_constraints(
        mut self,
        after_pack: i64,
        after_moq: i64,
        after_cap: i64,
        notes: Vec<String>,
        final_quantity: i64,
    ) -> Self {
        self.constraints = Some(ConstraintStage {
            after_pack,
            after_moq,
            after_cap,
            notes,
            final_quantity,
        });
        self
    }

    /// 冻结为终态审计记录; 任一阶段缺失返回缺阶段错误
    pub fn build(self) -> Result<OrderExplain, ExplainBuildError> {
        let as_of_date = self
            .as_of_date
            .ok_or(ExplainBuildError::MissingStage("as_of_date"))?;
        let calendar = self
            .calendar
            .ok_or(ExplainBuildError::MissingStage("calendar"))?;
        let demand = self
            .demand
            .ok_or(ExplainBuildError::MissingStage("demand"))?;
        let (inventory, position_as_of) = self
            .inventory
            .ok_or(ExplainBuildError::MissingStage("inventory"))?;
        let (modifiers, modifier_warnings) = self
            .modifiers
            .ok_or(ExplainBuildError::MissingStage("modifiers"))?;
        let policy = self
            .policy
            .ok_or(ExplainBuildError::MissingStage("policy"))?;
        let constraints = self
            .constraints
            .ok_or(ExplainBuildError::MissingStage("constraints"))?;

        Ok(OrderExplain {
            explain_id: Uuid::new_v4().to_string(),
            sku: self.sku,
            as_of_date,
            created_at: Utc::now(),
            lane: calendar.lane,
            receipt_date: calendar.receipt_date,
            next_receipt_date: calendar.next_receipt_date,
            protection_days: calendar.protection_days,
            demand,
            inventory,
            inventory_position_as_of: position_as_of,
            modifiers,
            modifier_warnings,
            policy_mode: policy.mode,
            alpha_target: policy.alpha_target,
            alpha_resolved: policy.alpha_resolved,
            z_score: policy.z_score,
            reorder_point: policy.reorder_point,
            raw_quantity: policy.raw_quantity,
            after_pack: constraints.after_pack,
            after_moq: constraints.after_moq,
            after_cap: constraints.after_cap,
            constraint_notes: constraints.notes,
            final_quantity: constraints.final_quantity,
        })
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::demand::ForecastMethod;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn full_builder() -> OrderExplainBuilder {
        OrderExplainBuilder::new("SKU-001", d("2025-06-11"))
            .with_calendar(Lane::Standard, d("2025-06-12"), d("2025-06-13"), 1)
            .with_demand(DemandDistribution::new(
                100.0,
                20.0,
                1,
                ForecastMethod::MovingAverage,
            ))
            .with_inventory(InventoryPosition::new(30.0, 0.0, 0.0), 30.0)
            .with_modifiers(vec![], vec![])
            .with_policy(PolicyMode::Csl, 0.95, 0.95, 1.645, 132.9, 102.9)
            .with_constraints(110, 110, 110, vec!["装箱规整: 103 -> 110".to_string()], 110)
    }

    #[test]
    fn test_build_full_record() {
        let explain = full_builder().build().unwrap();
        assert_eq!(explain.sku, "SKU-001");
        assert_eq!(explain.protection_days, 1);
        assert_eq!(explain.final_quantity, 110);
        assert!(!explain.explain_id.is_empty());
    }

    #[test]
    fn test_build_fails_on_missing_stage() {
        let builder = OrderExplainBuilder::new("SKU-001", d("2025-06-11"))
            .with_calendar(Lane::Standard, d("2025-06-12"), d("2025-06-13"), 1);
        let err = builder.build().unwrap_err();
        // 首个缺失阶段是需求
        assert!(err.to_string().contains("demand"), "实际: {}", err);
    }

    #[test]
    fn test_flatten_carries_every_decisive_field() {
        let explain = full_builder().build().unwrap();
        let flat = explain.flatten();
        assert_eq!(flat.lane, "STANDARD");
        assert_eq!(flat.mu, 100.0);
        assert_eq!(flat.z_score, 1.645);
        assert_eq!(flat.after_pack, 110);
        assert_eq!(flat.final_quantity, 110);
        assert_eq!(flat.modifier_count, 0);
        assert_eq!(flat.warning_count, 0);

        // 扁平投影可直接序列化为单层 JSON
        let json = serde_json::to_value(&flat).unwrap();
        assert!(json["reorder_point"].is_number());
        assert_eq!(json["policy_mode"], "CSL");
    }
}
