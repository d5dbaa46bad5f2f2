// ==========================================
// 零售智能补货系统 - 库存状态领域模型
// ==========================================
// 红线: 库存位置 = 在手 + 在途 - 欠补, 不含任何预测量
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PipelineEntry - 在途明细行
// ==========================================
// 已下单未到货的一笔订单, 按预计到货日参与 as-of 口径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub arrival_date: NaiveDate, // 预计到货日
    pub quantity: f64,           // 数量 (≥0)
}

impl PipelineEntry {
    pub fn new(arrival_date: NaiveDate, quantity: f64) -> Self {
        Self {
            arrival_date,
            quantity,
        }
    }
}

// ==========================================
// InventoryPosition - 库存位置快照
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryPosition {
    // ===== 汇总量 =====
    pub on_hand: f64,      // 在手库存
    pub on_order: f64,     // 在途总量 (无到货日明细时使用)
    pub unfulfilled: f64,  // 欠补/缺货挂账量

    // ===== 在途明细 =====
    // 非空时 as-of 口径按明细逐笔判断; on_order 仅作汇总参考
    pub pipeline: Vec<PipelineEntry>,
}

impl InventoryPosition {
    pub fn new(on_hand: f64, on_order: f64, unfulfilled: f64) -> Self {
        Self {
            on_hand,
            on_order,
            unfulfilled,
            pipeline: Vec::new(),
        }
    }

    /// 追加一笔在途明细, 返回新实例 (快照不可变)
    pub fn with_pipeline_entry(&self, arrival_date: NaiveDate, quantity: f64) -> Self {
        let mut next = self.clone();
        next.pipeline.push(PipelineEntry::new(arrival_date, quantity));
        next
    }

    /// 全量库存位置: 在手 + 全部在途 - 欠补
    pub fn position(&self) -> f64 {
        let on_order = if self.pipeline.is_empty() {
            self.on_order
        } else {
            self.pipeline.iter().map(|e| e.quantity).sum()
        };
        self.on_hand + on_order - self.unfulfilled
    }

    /// as-of 口径库存位置: 仅计入 `date` 当日及之前到货的在途
    ///
    /// 无在途明细时退化为全量口径 (on_order 视为保护期内全部到货)
    pub fn position_as_of(&self, date: NaiveDate) -> f64 {
        let on_order = if self.pipeline.is_empty() {
            self.on_order
        } else {
            self.pipeline
                .iter()
                .filter(|e| e.arrival_date <= date)
                .map(|e| e.quantity)
                .sum()
        };
        self.on_hand + on_order - self.unfulfilled
    }

    /// 入参校验: 各分量不得为负
    pub fn validate(&self) -> Result<(), String> {
        if !self.on_hand.is_finite() || self.on_hand < 0.0 {
            return Err(format!("on_hand 非法: {}", self.on_hand));
        }
        if !self.on_order.is_finite() || self.on_order < 0.0 {
            return Err(format!("on_order 非法: {}", self.on_order));
        }
        if !self.unfulfilled.is_finite() || self.unfulfilled < 0.0 {
            return Err(format!("unfulfilled 非法: {}", self.unfulfilled));
        }
        for entry in &self.pipeline {
            if !entry.quantity.is_finite() || entry.quantity < 0.0 {
                return Err(format!(
                    "在途明细数量非法: {} ({})",
                    entry.quantity, entry.arrival_date
                ));
            }
        }
        Ok(())
    }
}
