// ==========================================
// 零售智能补货系统 - 持久化配置存储
// ==========================================
// 职责: 配置读写、快照
// 存储: config_kv 表 (key-value + scope)
// 红线: 引擎评估过程中不触碰存储, 配置一次加载后传入
// ==========================================

use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 全局配置作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// SettingsError - 配置存储错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("配置不存在: {key}")]
    NotFound { key: String },

    #[error("配置值错误 (key={key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for SettingsError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                SettingsError::DatabaseQueryError(msg)
            }
            rusqlite::Error::QueryReturnedNoRows => SettingsError::NotFound {
                key: "Unknown".to_string(),
            },
            _ => SettingsError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type SettingsResult<T> = Result<T, SettingsError>;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 均需逐连接开启
fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

// ==========================================
// SettingsStore - 配置存储
// ==========================================
pub struct SettingsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsStore {
    /// 打开数据库文件并初始化 config_kv 表
    pub fn new(db_path: &str) -> SettingsResult<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| SettingsError::DatabaseConnectionError(e.to_string()))?;
        configure_connection(&conn)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// 从已有连接创建 (对传入连接再次应用统一 PRAGMA, 幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> SettingsResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| SettingsError::LockError(e.to_string()))?;
            configure_connection(&guard)?;
        }
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> SettingsResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::LockError(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key      TEXT NOT NULL,
                value    TEXT NOT NULL,
                PRIMARY KEY (scope_id, key)
            );",
        )?;
        Ok(())
    }

    /// 读取配置值 (scope_id='global')
    pub fn get(&self, key: &str) -> SettingsResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取配置值, 带默认值
    pub fn get_or_default(&self, key: &str, default: &str) -> SettingsResult<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值 (UPSERT, scope_id='global')
    pub fn set(&self, key: &str, value: &str) -> SettingsResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取全部全局配置的快照 (JSON 字符串)
    ///
    /// 用途: 审计记录与配置留痕, 保证决策可回溯到当时配置
    pub fn snapshot(&self) -> SettingsResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::LockError(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        serde_json::to_string(&json_value)
            .map_err(|e| SettingsError::Other(anyhow::anyhow!("快照序列化失败: {}", e)))
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> SettingsStore {
        SettingsStore::new(":memory:").unwrap()
    }

    #[test]
    fn test_get_returns_none_when_absent() {
        let store = memory_store();
        assert!(store.get("calendar/order_weekdays").unwrap().is_none());
        assert_eq!(
            store
                .get_or_default("calendar/standard_lead_days", "1")
                .unwrap(),
            "1"
        );
    }

    #[test]
    fn test_set_then_get_and_upsert() {
        let store = memory_store();
        store.set("calendar/standard_lead_days", "2").unwrap();
        assert_eq!(
            store.get("calendar/standard_lead_days").unwrap().as_deref(),
            Some("2")
        );

        // 二次写入走 UPSERT 覆盖
        store.set("calendar/standard_lead_days", "3").unwrap();
        assert_eq!(
            store.get("calendar/standard_lead_days").unwrap().as_deref(),
            Some("3")
        );
    }

    #[test]
    fn test_snapshot_contains_all_keys() {
        let store = memory_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let snapshot = store.snapshot().unwrap();
        let map: HashMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
    }
}
