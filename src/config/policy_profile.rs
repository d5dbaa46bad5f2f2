// ==========================================
// 零售智能补货系统 - 订货策略档案
// ==========================================

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::keys;
use crate::config::settings_store::{SettingsError, SettingsResult, SettingsStore};
use crate::domain::types::PolicyMode;

/// 订货策略档案（持久化对象）
///
/// 存储位置：config_kv（scope_id='global'，key='policy_profile/{profile_id}'）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProfile {
    /// 策略档案 ID（用于选择/引用）
    pub profile_id: String,

    /// 显示名称（中文）
    pub title: String,

    /// 说明（可选）
    #[serde(default)]
    pub description: Option<String>,

    /// 目标服务水平 α, 开区间 (0, 1)
    pub alpha_target: f64,

    /// 装箱规格 (订货量必须为其整数倍, ≥1)
    pub pack_size: i64,

    /// 起订量 (低于该值的订单压为 0; 0 表示不启用)
    #[serde(default)]
    pub moq: i64,

    /// 库存上限 (可选; None 表示不启用)
    #[serde(default)]
    pub max_stock: Option<f64>,

    /// 策略模式
    #[serde(default = "PolicyProfile::default_mode")]
    pub mode: PolicyMode,
}

impl Default for PolicyProfile {
    /// 默认档案: α=0.95, 不装箱, 无起订量, 无上限
    fn default() -> Self {
        Self {
            profile_id: "default".to_string(),
            title: "默认策略".to_string(),
            description: None,
            alpha_target: 0.95,
            pack_size: 1,
            moq: 0,
            max_stock: None,
            mode: PolicyMode::Csl,
        }
    }
}

impl PolicyProfile {
    fn default_mode() -> PolicyMode {
        PolicyMode::Csl
    }

    /// 档案校验
    pub fn validate(&self) -> Result<(), String> {
        if !self.alpha_target.is_finite()
            || self.alpha_target <= 0.0
            || self.alpha_target >= 1.0
        {
            return Err(format!("alpha_target 越界: {}", self.alpha_target));
        }
        if self.pack_size < 1 {
            return Err(format!("pack_size 非法: {}", self.pack_size));
        }
        if self.moq < 0 {
            return Err(format!("moq 非法: {}", self.moq));
        }
        if let Some(cap) = self.max_stock {
            if !cap.is_finite() || cap < 0.0 {
                return Err(format!("max_stock 非法: {}", cap));
            }
        }
        Ok(())
    }

    /// 从配置存储读取档案; 不存在时回退默认档案并告警
    pub fn load(store: &SettingsStore, profile_id: &str) -> SettingsResult<Self> {
        let id = profile_id.trim();
        if id.is_empty() {
            return Ok(Self::default());
        }

        let key = format!("{}{}", keys::POLICY_PROFILE_PREFIX, id);
        let raw = match store.get(&key)? {
            Some(v) => v,
            None => {
                warn!(profile_id = %id, "策略档案不存在, 使用默认档案");
                return Ok(Self::default());
            }
        };

        let profile: PolicyProfile =
            serde_json::from_str(&raw).map_err(|e| SettingsError::InvalidValue {
                key: key.clone(),
                message: format!("策略档案 JSON 解析失败: {}", e),
            })?;
        profile.validate().map_err(|message| SettingsError::InvalidValue {
            key,
            message,
        })?;
        Ok(profile)
    }

    /// 写入配置存储 (UPSERT)
    pub fn save(&self, store: &SettingsStore) -> SettingsResult<()> {
        self.validate().map_err(|message| SettingsError::InvalidValue {
            key: format!("{}{}", keys::POLICY_PROFILE_PREFIX, self.profile_id),
            message,
        })?;
        let key = format!("{}{}", keys::POLICY_PROFILE_PREFIX, self.profile_id);
        let raw = serde_json::to_string(self)
            .map_err(|e| SettingsError::Other(anyhow::anyhow!("策略档案序列化失败: {}", e)))?;
        store.set(&key, &raw)
    }
}
