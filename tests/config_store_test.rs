// ==========================================
// 配置存储与日历装配集成测试
// ==========================================
// 职责: 验证文件库持久化、配置键解析、节假日表装配
//       与降级留痕, 以及策略档案的存取契约
// ==========================================

use chrono::NaiveDate;
use retail_replenish::config::{keys, CalendarConfig, PolicyProfile, SettingsError, SettingsStore};
use retail_replenish::domain::types::{HolidayEffect, Lane, PolicyMode};
use retail_replenish::engine::{EngineError, LogisticsCalendar};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// ==========================================
// 测试辅助函数
// ==========================================

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn file_store(dir: &TempDir) -> SettingsStore {
    let db_path = dir.path().join("config.db");
    SettingsStore::new(db_path.to_str().unwrap()).unwrap()
}

// ==========================================
// 测试1: 配置值跨连接持久化
// ==========================================
#[test]
fn test_settings_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("config.db");

    {
        let store = SettingsStore::new(db_path.to_str().unwrap()).unwrap();
        store.set(keys::CALENDAR_STANDARD_LEAD_DAYS, "2").unwrap();
        store.set(keys::CALENDAR_ORDER_WEEKDAYS, "1,2,3,4,5,6").unwrap();
    } // 连接关闭

    let reopened = SettingsStore::new(db_path.to_str().unwrap()).unwrap();
    assert_eq!(
        reopened
            .get(keys::CALENDAR_STANDARD_LEAD_DAYS)
            .unwrap()
            .as_deref(),
        Some("2")
    );
    assert_eq!(
        reopened.get(keys::CALENDAR_ORDER_WEEKDAYS).unwrap().as_deref(),
        Some("1,2,3,4,5,6")
    );
    // 未写入的键走默认值
    assert_eq!(
        reopened
            .get_or_default(keys::CALENDAR_SATURDAY_LEAD_DAYS, "1")
            .unwrap(),
        "1"
    );
}

// ==========================================
// 测试2: 节假日表装配并在日历解析中生效
// ==========================================
// CSV 含 1 条坏行; CLOSED 日不可下单, NO_RECEIPT 日推后到货
#[test]
fn test_holiday_csv_feeds_calendar_resolution() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("holidays.csv");
    fs::write(
        &csv_path,
        "date,effect,name\n\
         2025-06-12,CLOSED,端午节\n\
         2025-06-14,NO_RECEIPT,仓库盘点\n\
         不是日期,NO_ORDER,坏行\n",
    )
    .unwrap();

    let store = file_store(&dir);
    store
        .set(keys::CALENDAR_HOLIDAY_CSV_PATH, csv_path.to_str().unwrap())
        .unwrap();

    let (config, report) = CalendarConfig::load(&store).unwrap();
    assert_eq!(report.holiday_source, "csv");
    assert_eq!(report.holiday_count, 2);
    assert_eq!(report.skipped_rows, 1);
    assert!(report.fallback.is_none());

    let holidays = config.holidays.as_ref().unwrap();
    assert_eq!(holidays.effect_on(d("2025-06-12")), Some(HolidayEffect::Closed));
    assert_eq!(holidays.effect_on(d("2025-06-14")), Some(HolidayEffect::NoReceipt));

    // 装配出的日历按节假日效果解析
    let calendar = LogisticsCalendar::new(Arc::new(config)).unwrap();

    // CLOSED 当日不可下单
    let err = calendar
        .resolve_receipt_and_protection(d("2025-06-12"), Lane::Standard, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotOrderDay { .. }));

    // 周三下单: 到货跳过 CLOSED 周四落在周五;
    // 下一下单机会为周五, 其到货被 NO_RECEIPT 周六推到周一
    let window = calendar
        .resolve_receipt_and_protection(d("2025-06-11"), Lane::Standard, None)
        .unwrap();
    assert_eq!(window.receipt_date, d("2025-06-13"));
    assert_eq!(window.next_receipt_date, d("2025-06-16"));
    assert_eq!(window.protection_days, 3);
}

// ==========================================
// 测试3: 格式非法的配置键直接报错, 不静默回退
// ==========================================
#[test]
fn test_malformed_keys_rejected() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    store.set(keys::CALENDAR_ORDER_WEEKDAYS, "1,2,abc").unwrap();
    let err = CalendarConfig::load(&store).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue { .. }));

    store.set(keys::CALENDAR_ORDER_WEEKDAYS, "1,2,9").unwrap();
    assert!(CalendarConfig::load(&store).is_err(), "工作日编号越界应报错");

    store.set(keys::CALENDAR_ORDER_WEEKDAYS, "1,2,3,4,5").unwrap();
    store.set(keys::CALENDAR_STANDARD_LEAD_DAYS, "一天").unwrap();
    let err = CalendarConfig::load(&store).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::InvalidValue { ref key, .. } if key == keys::CALENDAR_STANDARD_LEAD_DAYS
    ));
}

// ==========================================
// 测试4: 节假日表头缺列降级为纯工作日日历
// ==========================================
// 文件级失败与行级坏行不同: 前者降级留痕, 后者逐行跳过
#[test]
fn test_bad_holiday_header_falls_back() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("holidays.csv");
    fs::write(&csv_path, "day,kind\n2025-06-12,CLOSED\n").unwrap();

    let store = file_store(&dir);
    store
        .set(keys::CALENDAR_HOLIDAY_CSV_PATH, csv_path.to_str().unwrap())
        .unwrap();

    let (config, report) = CalendarConfig::load(&store).unwrap();
    assert!(config.holidays.is_none());
    assert_eq!(report.holiday_source, "none");
    assert!(
        report.fallback.as_deref().unwrap_or("").contains("降级"),
        "降级原因应写入报告: {:?}",
        report.fallback
    );

    // 降级后的日历仍可解析 (纯工作日口径)
    let calendar = LogisticsCalendar::new(Arc::new(config)).unwrap();
    let window = calendar
        .resolve_receipt_and_protection(d("2025-06-11"), Lane::Standard, None)
        .unwrap();
    assert_eq!(window.receipt_date, d("2025-06-12"));
}

// ==========================================
// 测试5: 策略档案跨连接持久化与快照留痕
// ==========================================
#[test]
fn test_policy_profile_persist_and_snapshot() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("config.db");

    {
        let store = SettingsStore::new(db_path.to_str().unwrap()).unwrap();
        let profile = PolicyProfile {
            profile_id: "fresh-high".to_string(),
            title: "生鲜高服务".to_string(),
            description: Some("高周转生鲜品类".to_string()),
            alpha_target: 0.97,
            pack_size: 6,
            moq: 12,
            max_stock: Some(300.0),
            mode: PolicyMode::Csl,
        };
        profile.save(&store).unwrap();
    }

    let reopened = SettingsStore::new(db_path.to_str().unwrap()).unwrap();
    let loaded = PolicyProfile::load(&reopened, "fresh-high").unwrap();
    assert_eq!(loaded.title, "生鲜高服务");
    assert_eq!(loaded.alpha_target, 0.97);
    assert_eq!(loaded.pack_size, 6);
    assert_eq!(loaded.moq, 12);
    assert_eq!(loaded.max_stock, Some(300.0));

    // 不存在的档案回退默认
    let fallback = PolicyProfile::load(&reopened, "不存在").unwrap();
    assert_eq!(fallback.profile_id, "default");

    // 快照包含档案键, 决策可回溯到当时配置
    let snapshot = reopened.snapshot().unwrap();
    let map: HashMap<String, String> = serde_json::from_str(&snapshot).unwrap();
    assert!(map.contains_key("policy_profile/fresh-high"));
}

// ==========================================
// 测试6: 档案 JSON 兼容性与校验
// ==========================================
// 旧版 JSON 缺可选字段按默认补齐; 坏 JSON 与越界档案拒绝
#[test]
fn test_policy_profile_json_contract() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    // 最小字段 JSON (无 moq/max_stock/description/mode)
    store
        .set(
            "policy_profile/minimal",
            r#"{"profile_id":"minimal","title":"最小档案","alpha_target":0.9,"pack_size":1}"#,
        )
        .unwrap();
    let loaded = PolicyProfile::load(&store, "minimal").unwrap();
    assert_eq!(loaded.moq, 0);
    assert!(loaded.max_stock.is_none());
    assert!(loaded.description.is_none());
    assert_eq!(loaded.mode, PolicyMode::Csl);

    // 坏 JSON 拒绝
    store.set("policy_profile/broken", "{不是JSON").unwrap();
    let err = PolicyProfile::load(&store, "broken").unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue { .. }));

    // 越界档案在保存时即被拒绝
    let mut bad = PolicyProfile::default();
    bad.profile_id = "bad-alpha".to_string();
    bad.alpha_target = 1.2;
    assert!(matches!(
        bad.save(&store).unwrap_err(),
        SettingsError::InvalidValue { .. }
    ));
}
