// ==========================================
// 零售智能补货系统 - 销售历史领域模型
// ==========================================
// 用途: 估计器回退流程的输入; 跨进程分发时降维为原始元组
// 口径: 自 start_date 起的连续日销售序列, 缺货日以截尾标记
// ==========================================

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// ==========================================
// SalesHistory - SKU 连续日销售序列
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesHistory {
    pub sku: String,           // SKU 编号
    pub start_date: NaiveDate, // 序列起始日 (空序列时无意义)
    pub quantities: Vec<f64>,  // 逐日销量
    pub censored: Vec<bool>,   // 逐日截尾标记 (当日售罄, 真实需求被低估)
}

impl SalesHistory {
    pub fn new(
        sku: impl Into<String>,
        start_date: NaiveDate,
        quantities: Vec<f64>,
        censored: Vec<bool>,
    ) -> Self {
        Self {
            sku: sku.into(),
            start_date,
            quantities,
            censored,
        }
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// 截尾天数
    pub fn censored_days(&self) -> usize {
        self.censored.iter().filter(|&&c| c).count()
    }

    /// 第 idx 天对应的日期
    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.start_date + Duration::days(idx as i64)
    }

    /// 入参校验: 销量与截尾标记等长, 销量非负
    pub fn validate(&self) -> Result<(), String> {
        if self.quantities.len() != self.censored.len() {
            return Err(format!(
                "销量与截尾标记长度不一致: {} vs {}",
                self.quantities.len(),
                self.censored.len()
            ));
        }
        for (i, q) in self.quantities.iter().enumerate() {
            if !q.is_finite() || *q < 0.0 {
                return Err(format!("第{}天销量非法: {}", i, q));
            }
        }
        Ok(())
    }

    /// 降维为原始元组序列 (日期, 销量, 截尾), 供跨进程传输
    ///
    /// 富对象图的传输成本远高于等价的原始元组, 批量并行分发时走此通道
    pub fn into_rows(self) -> Vec<(NaiveDate, f64, bool)> {
        let start = self.start_date;
        self.quantities
            .into_iter()
            .zip(self.censored)
            .enumerate()
            .map(|(i, (q, c))| (start + Duration::days(i as i64), q, c))
            .collect()
    }

    /// 由原始元组序列重建 (按日期升序排列后取首日为起始日)
    ///
    /// 契约: 元组序列应覆盖连续日期; 断档由调用方负责补齐
    pub fn from_rows(sku: impl Into<String>, mut rows: Vec<(NaiveDate, f64, bool)>) -> Self {
        rows.sort_by_key(|(date, _, _)| *date);
        let start_date = rows.first().map(|(d, _, _)| *d).unwrap_or(NaiveDate::MIN);
        let mut quantities = Vec::with_capacity(rows.len());
        let mut censored = Vec::with_capacity(rows.len());
        for (_, q, c) in rows {
            quantities.push(q);
            censored.push(c);
        }
        Self {
            sku: sku.into(),
            start_date,
            quantities,
            censored,
        }
    }
}
