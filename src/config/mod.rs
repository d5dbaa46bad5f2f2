// ==========================================
// 零售智能补货系统 - 配置层
// ==========================================
// 职责: 持久化配置读写与日历/策略装配
// 存储: config_kv 表
// 红线: 配置进程内一次加载, 评估过程中只读
// ==========================================

pub mod calendar_config;
pub mod policy_profile;
pub mod settings_store;

// 重导出核心配置类型
pub use calendar_config::{CalendarConfig, CalendarLoadReport, HolidayCalendar, HolidayEntry};
pub use policy_profile::PolicyProfile;
pub use settings_store::{SettingsError, SettingsResult, SettingsStore};

// ==========================================
// 配置键常量
// ==========================================
pub mod keys {
    // 物流日历
    pub const CALENDAR_ORDER_WEEKDAYS: &str = "calendar/order_weekdays"; // ISO 编号, 逗号分隔
    pub const CALENDAR_DELIVERY_WEEKDAYS: &str = "calendar/delivery_weekdays";
    pub const CALENDAR_STANDARD_LEAD_DAYS: &str = "calendar/standard_lead_days";
    pub const CALENDAR_SATURDAY_LEAD_DAYS: &str = "calendar/saturday_lead_days";
    pub const CALENDAR_HOLIDAY_CSV_PATH: &str = "calendar/holiday_csv_path";

    // 订货策略档案 (key = 前缀 + profile_id, 值为 JSON)
    pub const POLICY_PROFILE_PREFIX: &str = "policy_profile/";
}
