// ==========================================
// 零售智能补货系统 - 物流日历引擎
// ==========================================
// 职责: 订货日/收货日判定、到货日推算、保护期解析
// 红线: 所有前向搜索必须有界 (14/30 次), 超界报非收敛错误;
//       resolve_receipt_and_protection 任何路径下保证 P ≥ 1
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::calendar_config::CalendarConfig;
use crate::domain::types::Lane;
use crate::engine::error::{EngineError, EngineResult};

/// 收货日前向搜索上限 (天)
pub const DELIVERY_SEARCH_LIMIT: u32 = 14;

/// 订货机会前向搜索上限 (天)
pub const ORDER_SEARCH_LIMIT: u32 = 14;

/// r2 推进循环上限 (次)
pub const R2_ADVANCE_LIMIT: u32 = 30;

// ==========================================
// ResolvedWindow - 保护期解析结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub receipt_date: NaiveDate,      // 本单到货日 r1
    pub next_receipt_date: NaiveDate, // 下一订货机会的标准通道到货日 r2
    pub protection_days: i64,         // 保护期 P = r2 - r1 (≥1)
}

// ==========================================
// LogisticsCalendar - 物流日历引擎
// ==========================================
#[derive(Debug)]
pub struct LogisticsCalendar {
    config: Arc<CalendarConfig>,
}

impl LogisticsCalendar {
    /// 构造日历引擎, 配置校验失败即拒绝
    pub fn new(config: Arc<CalendarConfig>) -> EngineResult<Self> {
        config.validate().map_err(EngineError::CalendarConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    /// 规则1: 节假日效果先于工作日规则检查, 只能禁止不能放行
    pub fn is_order_day(&self, date: NaiveDate) -> bool {
        if let Some(holidays) = &self.config.holidays {
            if let Some(effect) = holidays.effect_on(date) {
                if effect.blocks_order() {
                    return false;
                }
            }
        }
        self.config.order_weekdays.contains(date.weekday())
    }

    pub fn is_delivery_day(&self, date: NaiveDate) -> bool {
        if let Some(holidays) = &self.config.holidays {
            if let Some(effect) = holidays.effect_on(date) {
                if effect.blocks_receipt() {
                    return false;
                }
            }
        }
        self.config.delivery_weekdays.contains(date.weekday())
    }

    /// 规则2: 自 from 起 (含当日) 前向找第一个有效收货日, 有界
    pub fn next_delivery_day(&self, from: NaiveDate) -> EngineResult<NaiveDate> {
        for offset in 0..DELIVERY_SEARCH_LIMIT {
            let candidate = from + Duration::days(offset as i64);
            if self.is_delivery_day(candidate) {
                return Ok(candidate);
            }
        }
        Err(EngineError::CalendarNonConvergence {
            from,
            limit: DELIVERY_SEARCH_LIMIT,
            target: "有效收货日".to_string(),
        })
    }

    /// 规则3: 严格晚于 after 的第一个有效订货日, 有界
    pub fn next_order_opportunity(&self, after: NaiveDate) -> EngineResult<NaiveDate> {
        for offset in 1..=ORDER_SEARCH_LIMIT {
            let candidate = after + Duration::days(offset as i64);
            if self.is_order_day(candidate) {
                return Ok(candidate);
            }
        }
        Err(EngineError::CalendarNonConvergence {
            from: after,
            limit: ORDER_SEARCH_LIMIT,
            target: "有效订货日".to_string(),
        })
    }

    /// 规则4: 按通道推算本单到货日
    ///
    /// - STANDARD: 下单日 + 标准提前期, 推进到有效收货日
    /// - SATURDAY: 仅限周五下单, 下单日 + 周六通道提前期, 推进到有效收货日
    /// - MONDAY: 仅限周五下单, 下单日 + 标准提前期后强制推进到下一个周一
    ///   (已是周一则不动), 再找有效收货日 -- 显式跨周末, 避免与周初标准
    ///   到货混淆
    pub fn next_receipt_date(&self, order_date: NaiveDate, lane: Lane) -> EngineResult<NaiveDate> {
        if !self.is_order_day(order_date) {
            return Err(EngineError::NotOrderDay { date: order_date });
        }
        if lane.requires_friday() && order_date.weekday() != Weekday::Fri {
            return Err(EngineError::LaneRequiresFriday {
                lane,
                date: order_date,
            });
        }

        match lane {
            Lane::Standard => {
                let candidate = order_date + Duration::days(self.config.standard_lead_days);
                self.next_delivery_day(candidate)
            }
            Lane::Saturday => {
                let candidate = order_date + Duration::days(self.config.saturday_lead_days);
                self.next_delivery_day(candidate)
            }
            Lane::Monday => {
                let mut candidate = order_date + Duration::days(self.config.standard_lead_days);
                let days_to_monday =
                    (7 - candidate.weekday().num_days_from_monday() as i64) % 7;
                candidate += Duration::days(days_to_monday);
                self.next_delivery_day(candidate)
            }
        }
    }

    /// 规则5: 保护期窗口 (r1, r2, P)
    ///
    /// r1 为本单到货日, r2 为下一订货机会的标准通道到货日,
    /// P = r2 - r1 即本单独立承担的需求覆盖天数。
    /// 病态但合法的配置下可能出现 P ≤ 0 (如周六也是订货日),
    /// P ≥ 1 的兜底由 resolve_receipt_and_protection 完成
    pub fn protection_window(
        &self,
        order_date: NaiveDate,
        lane: Lane,
    ) -> EngineResult<(NaiveDate, NaiveDate, i64)> {
        let (r1, _, r2) = self.window_parts(order_date, lane)?;
        let protection_days = (r2 - r1).num_days();
        Ok((r1, r2, protection_days))
    }

    /// (r1, 下一订货机会, r2) 三元组; protection_window 与
    /// resolve_receipt_and_protection 共用
    fn window_parts(
        &self,
        order_date: NaiveDate,
        lane: Lane,
    ) -> EngineResult<(NaiveDate, NaiveDate, NaiveDate)> {
        let r1 = self.next_receipt_date(order_date, lane)?;
        let next_order = self.next_order_opportunity(order_date)?;
        let r2 = self.next_receipt_date(next_order, Lane::Standard)?;
        Ok((r1, next_order, r2))
    }

    /// 规则6: 保护期解析唯一入口, 任何路径保证 P ≥ 1
    ///
    /// 无覆盖时委托 protection_window; 有覆盖时 r1 = 覆盖值,
    /// r2 取严格晚于 r1 的下一订货机会的标准通道到货日。
    /// 两条路径共享同一 r2 推进循环: r2 ≤ r1 时逐个推进订货机会,
    /// 有界 30 次
    #[instrument(skip(self), fields(order_date = %order_date, lane = %lane))]
    pub fn resolve_receipt_and_protection(
        &self,
        order_date: NaiveDate,
        lane: Lane,
        receipt_override: Option<NaiveDate>,
    ) -> EngineResult<ResolvedWindow> {
        let (r1, mut next_order, mut r2) = match receipt_override {
            None => self.window_parts(order_date, lane)?,
            Some(r1) => {
                // 到货日人工覆盖: 仍要求下单日本身合法
                if !self.is_order_day(order_date) {
                    return Err(EngineError::NotOrderDay { date: order_date });
                }
                let next_order = self.next_order_opportunity(r1)?;
                let r2 = self.next_receipt_date(next_order, Lane::Standard)?;
                (r1, next_order, r2)
            }
        };

        let mut iterations = 0u32;
        while r2 <= r1 {
            iterations += 1;
            if iterations > R2_ADVANCE_LIMIT {
                return Err(EngineError::CalendarNonConvergence {
                    from: r1,
                    limit: R2_ADVANCE_LIMIT,
                    target: "晚于本单到货日的下一补货到货日".to_string(),
                });
            }
            next_order = self.next_order_opportunity(next_order)?;
            r2 = self.next_receipt_date(next_order, Lane::Standard)?;
        }

        let protection_days = (r2 - r1).num_days();
        debug!(
            r1 = %r1,
            r2 = %r2,
            protection_days,
            "保护期解析完成"
        );
        Ok(ResolvedWindow {
            receipt_date: r1,
            next_receipt_date: r2,
            protection_days,
        })
    }
}
