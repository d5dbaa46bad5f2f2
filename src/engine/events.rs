// ==========================================
// 零售智能补货系统 - 审计记录下发
// ==========================================
// 职责: 定义审计记录消费 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 宿主应用实现适配器 (入库/展示/下单)
// 红线: 下发失败只记日志, 绝不影响评估结果
// ==========================================

use std::error::Error;
use std::sync::Arc;

use crate::domain::explain::OrderExplain;

// ==========================================
// 审计记录消费 Trait
// ==========================================

/// 审计记录消费者 Trait
///
/// Engine 层定义, 宿主实现 (审计入库、看板推送、实际下单等)
///
/// # 实现说明
/// - 消费方不得修改记录内容 (记录构建后不可变)
/// - 返回值为受理凭据 (如入库主键), 不支持时返回空字符串
pub trait ExplainSink: Send + Sync {
    /// 消费一条完成的审计记录
    ///
    /// # 返回
    /// - `Ok(receipt)`: 受理凭据或空字符串
    /// - `Err`: 消费失败 (由调用方记日志, 不中断评估)
    fn consume(&self, explain: &OrderExplain) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作消费者
///
/// 用于不需要下发的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpExplainSink;

impl ExplainSink for NoOpExplainSink {
    fn consume(&self, explain: &OrderExplain) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpExplainSink: 跳过下发 - explain_id={}, sku={}",
            explain.explain_id,
            explain.sku
        );
        Ok(String::new())
    }
}

/// 可选的消费者包装
///
/// 简化 Option<Arc<dyn ExplainSink>> 的使用
pub struct OptionalExplainSink {
    inner: Option<Arc<dyn ExplainSink>>,
}

impl OptionalExplainSink {
    /// 创建带消费者的实例
    pub fn with_sink(sink: Arc<dyn ExplainSink>) -> Self {
        Self { inner: Some(sink) }
    }

    /// 创建空实例 (不下发)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 下发记录 (如果配置了消费者)
    pub fn consume(&self, explain: &OrderExplain) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(sink) => sink.consume(explain),
            None => {
                tracing::debug!(
                    "OptionalExplainSink: 未配置消费者, 跳过下发 - explain_id={}",
                    explain.explain_id
                );
                Ok(String::new())
            }
        }
    }

    /// 检查是否配置了消费者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalExplainSink {
    fn default() -> Self {
        Self::none()
    }
}
