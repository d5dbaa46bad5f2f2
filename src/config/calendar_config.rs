// ==========================================
// 零售智能补货系统 - 物流日历配置
// ==========================================
// 职责: 日历配置装配与节假日表加载
// 红线: 配置构造后只读; 节假日表加载失败降级为纯工作日
//       日历, 降级必须写入加载报告并记日志, 不得静默
// ==========================================

use chrono::{NaiveDate, Weekday};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::warn;

use crate::config::keys;
use crate::config::settings_store::{SettingsError, SettingsResult, SettingsStore};
use crate::domain::types::{HolidayEffect, WeekdaySet};

// ==========================================
// HolidayEntry - 节假日条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub name: String,          // 节假日名称
    pub effect: HolidayEffect, // 当日效果
}

// ==========================================
// HolidayCalendar - 节假日表
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolidayCalendar {
    entries: BTreeMap<NaiveDate, HolidayEntry>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(NaiveDate, HolidayEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, date: NaiveDate, entry: HolidayEntry) {
        self.entries.insert(date, entry);
    }

    /// 指定日期的节假日效果 (非节假日返回 None)
    pub fn effect_on(&self, date: NaiveDate) -> Option<HolidayEffect> {
        self.entries.get(&date).map(|e| e.effect)
    }

    pub fn entry_on(&self, date: NaiveDate) -> Option<&HolidayEntry> {
        self.entries.get(&date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 从 CSV 文件加载节假日表
    ///
    /// 列: date,effect,name (带表头; date 为 YYYY-MM-DD;
    /// effect 取 NO_ORDER/NO_RECEIPT/CLOSED, 兼容 BOTH)
    ///
    /// 返回 (节假日表, 跳过的坏行数); 坏行逐条告警后跳过,
    /// 文件级失败由调用方降级处理
    pub fn load_from_csv(path: &Path) -> anyhow::Result<(Self, usize)> {
        if !path.exists() {
            return Err(anyhow::anyhow!("节假日文件不存在: {}", path.display()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let col = |name: &str| headers.iter().position(|h| h == name);
        let (date_col, effect_col, name_col) = match (col("date"), col("effect"), col("name")) {
            (Some(d), Some(e), Some(n)) => (d, e, n),
            _ => {
                return Err(anyhow::anyhow!(
                    "节假日文件表头缺失, 需要 date,effect,name: {:?}",
                    headers
                ))
            }
        };

        let mut calendar = HolidayCalendar::new();
        let mut skipped = 0usize;
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            // 跳过完全空白的行
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let date_raw = record.get(date_col).unwrap_or("").trim();
            let effect_raw = record.get(effect_col).unwrap_or("").trim();
            let name_raw = record.get(name_col).unwrap_or("").trim();

            let date = match NaiveDate::parse_from_str(date_raw, "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => {
                    warn!(row = row_idx + 2, raw = %date_raw, "节假日行日期非法, 跳过");
                    skipped += 1;
                    continue;
                }
            };
            let effect = match HolidayEffect::from_str(effect_raw) {
                Some(e) => e,
                None => {
                    warn!(row = row_idx + 2, raw = %effect_raw, "节假日行效果非法, 跳过");
                    skipped += 1;
                    continue;
                }
            };

            calendar.insert(
                date,
                HolidayEntry {
                    name: name_raw.to_string(),
                    effect,
                },
            );
        }

        Ok((calendar, skipped))
    }
}

// ==========================================
// CalendarLoadReport - 日历装配报告
// ==========================================
// 记录节假日来源与降级情况, 供审计留痕
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarLoadReport {
    pub holiday_source: String,   // "csv" | "none"
    pub holiday_count: usize,     // 加载成功的节假日条数
    pub skipped_rows: usize,      // 跳过的坏行数
    pub fallback: Option<String>, // 降级原因 (未降级为 None)
}

// ==========================================
// CalendarConfig - 物流日历配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub order_weekdays: WeekdaySet,        // 可下单工作日
    pub delivery_weekdays: WeekdaySet,     // 可收货工作日
    pub standard_lead_days: i64,           // 标准通道提前期 (天)
    pub saturday_lead_days: i64,           // 周六通道提前期 (天)
    pub holidays: Option<HolidayCalendar>, // 节假日表 (可选)
}

impl Default for CalendarConfig {
    /// 默认口径: 周一至周五下单, 周一至周六收货, 提前期均为 1 天
    fn default() -> Self {
        Self {
            order_weekdays: WeekdaySet::from_weekdays(&[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
            delivery_weekdays: WeekdaySet::from_weekdays(&[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ]),
            standard_lead_days: 1,
            saturday_lead_days: 1,
            holidays: None,
        }
    }
}

impl CalendarConfig {
    pub fn new(
        order_weekdays: WeekdaySet,
        delivery_weekdays: WeekdaySet,
        standard_lead_days: i64,
        saturday_lead_days: i64,
    ) -> Self {
        Self {
            order_weekdays,
            delivery_weekdays,
            standard_lead_days,
            saturday_lead_days,
            holidays: None,
        }
    }

    pub fn with_holidays(mut self, holidays: HolidayCalendar) -> Self {
        self.holidays = Some(holidays);
        self
    }

    /// 配置校验: 空工作日集合与负提前期均为结构性错误
    pub fn validate(&self) -> Result<(), String> {
        if self.order_weekdays.is_empty() {
            return Err("可下单工作日集合为空".to_string());
        }
        if self.delivery_weekdays.is_empty() {
            return Err("可收货工作日集合为空".to_string());
        }
        if self.standard_lead_days < 0 {
            return Err(format!("标准提前期为负: {}", self.standard_lead_days));
        }
        if self.saturday_lead_days < 0 {
            return Err(format!("周六通道提前期为负: {}", self.saturday_lead_days));
        }
        Ok(())
    }

    /// 从配置存储装配日历 (进程内一次加载, 之后只读共享)
    ///
    /// 缺失键使用文档化默认值; 格式非法的键直接报错, 不静默回退;
    /// 节假日文件加载失败降级为纯工作日日历并记入报告
    pub fn load(store: &SettingsStore) -> SettingsResult<(Self, CalendarLoadReport)> {
        let order_weekdays = parse_weekday_set(
            keys::CALENDAR_ORDER_WEEKDAYS,
            &store.get_or_default(keys::CALENDAR_ORDER_WEEKDAYS, "1,2,3,4,5")?,
        )?;
        let delivery_weekdays = parse_weekday_set(
            keys::CALENDAR_DELIVERY_WEEKDAYS,
            &store.get_or_default(keys::CALENDAR_DELIVERY_WEEKDAYS, "1,2,3,4,5,6")?,
        )?;
        let standard_lead_days = parse_lead_days(
            keys::CALENDAR_STANDARD_LEAD_DAYS,
            &store.get_or_default(keys::CALENDAR_STANDARD_LEAD_DAYS, "1")?,
        )?;
        let saturday_lead_days = parse_lead_days(
            keys::CALENDAR_SATURDAY_LEAD_DAYS,
            &store.get_or_default(keys::CALENDAR_SATURDAY_LEAD_DAYS, "1")?,
        )?;

        let mut config = CalendarConfig::new(
            order_weekdays,
            delivery_weekdays,
            standard_lead_days,
            saturday_lead_days,
        );
        config.validate().map_err(|message| SettingsError::InvalidValue {
            key: "calendar".to_string(),
            message,
        })?;

        let mut report = CalendarLoadReport {
            holiday_source: "none".to_string(),
            holiday_count: 0,
            skipped_rows: 0,
            fallback: None,
        };

        if let Some(csv_path) = store.get(keys::CALENDAR_HOLIDAY_CSV_PATH)? {
            match HolidayCalendar::load_from_csv(Path::new(&csv_path)) {
                Ok((holidays, skipped)) => {
                    report.holiday_source = "csv".to_string();
                    report.holiday_count = holidays.len();
                    report.skipped_rows = skipped;
                    config = config.with_holidays(holidays);
                }
                Err(e) => {
                    // 降级为纯工作日日历, 显式留痕
                    let reason = format!("节假日表加载失败, 降级为纯工作日日历: {}", e);
                    warn!(path = %csv_path, error = %e, "节假日表加载失败, 降级");
                    report.fallback = Some(reason);
                }
            }
        }

        Ok((config, report))
    }
}

fn parse_weekday_set(key: &str, raw: &str) -> SettingsResult<WeekdaySet> {
    let numbers: Result<Vec<u8>, _> = raw
        .split(',')
        .map(|s| s.trim().parse::<u8>())
        .collect();
    let numbers = numbers.map_err(|_| SettingsError::InvalidValue {
        key: key.to_string(),
        message: format!("工作日列表格式非法: {}", raw),
    })?;
    WeekdaySet::from_iso_numbers(&numbers).ok_or_else(|| SettingsError::InvalidValue {
        key: key.to_string(),
        message: format!("工作日编号越界 (应为1-7): {}", raw),
    })
}

fn parse_lead_days(key: &str, raw: &str) -> SettingsResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| SettingsError::InvalidValue {
            key: key.to_string(),
            message: format!("提前期格式非法: {}", raw),
        })
}
