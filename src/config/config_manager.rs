// ==========================================
// 宿舍轮值排班系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::run_config::ScoreWeights;
use crate::config::scheduling_config_trait::SchedulingConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置值，解析失败时回退默认值并告警
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 在排班运行报告中记录配置快照
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖现有的global配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            let affected = tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
            count += affected;
        }

        tx.commit()?;

        Ok(count)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ==========================================
// SchedulingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl SchedulingConfigReader for ConfigManager {
    async fn get_preserve_manual(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::PRESERVE_MANUAL, "true")?;
        Ok(parse_bool(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::PRESERVE_MANUAL,
                raw_value = %value,
                "布尔配置格式错误，使用默认值 true"
            );
            true
        }))
    }

    async fn get_max_conan_per_guide(&self) -> Result<u32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::MAX_CONAN_PER_GUIDE, 2u32)
    }

    async fn get_max_consecutive_days(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_parsed_or_default(config_keys::MAX_CONSECUTIVE_DAYS, 2u32)?;
        if value == 0 {
            tracing::warn!(
                config_key = config_keys::MAX_CONSECUTIVE_DAYS,
                "连续上班天数上限为 0，按 1 处理"
            );
            return Ok(1);
        }
        Ok(value)
    }

    async fn get_history_lookback_days(&self) -> Result<u32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::HISTORY_LOOKBACK_DAYS, 7u32)
    }

    async fn get_score_weights(&self) -> Result<ScoreWeights, Box<dyn Error>> {
        let d = ScoreWeights::default();
        let non_negative = |key: &str, v: f64, default: f64| {
            if v.is_finite() && v >= 0.0 {
                v
            } else {
                tracing::warn!(config_key = key, value = v, "权重必须为非负数，使用默认值");
                default
            }
        };

        Ok(ScoreWeights {
            total: non_negative(
                config_keys::SCORE_WEIGHT_TOTAL,
                self.get_parsed_or_default(config_keys::SCORE_WEIGHT_TOTAL, d.total)?,
                d.total,
            ),
            weekend: non_negative(
                config_keys::SCORE_WEIGHT_WEEKEND,
                self.get_parsed_or_default(config_keys::SCORE_WEIGHT_WEEKEND, d.weekend)?,
                d.weekend,
            ),
            conan: non_negative(
                config_keys::SCORE_WEIGHT_CONAN,
                self.get_parsed_or_default(config_keys::SCORE_WEIGHT_CONAN, d.conan)?,
                d.conan,
            ),
            recency: non_negative(
                config_keys::SCORE_WEIGHT_RECENCY,
                self.get_parsed_or_default(config_keys::SCORE_WEIGHT_RECENCY, d.recency)?,
                d.recency,
            ),
            conan_cap_penalty: non_negative(
                config_keys::CONAN_CAP_PENALTY,
                self.get_parsed_or_default(config_keys::CONAN_CAP_PENALTY, d.conan_cap_penalty)?,
                d.conan_cap_penalty,
            ),
            jitter: non_negative(
                config_keys::TIE_BREAK_JITTER,
                self.get_parsed_or_default(config_keys::TIE_BREAK_JITTER, d.jitter)?,
                d.jitter,
            ),
        })
    }

    async fn get_tie_break_seed(&self) -> Result<Option<u64>, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::TIE_BREAK_SEED)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(None),
        };
        match raw.trim().parse::<u64>() {
            Ok(seed) => Ok(Some(seed)),
            Err(_) => {
                tracing::warn!(
                    config_key = config_keys::TIE_BREAK_SEED,
                    raw_value = %raw,
                    "种子格式错误，改为每次运行随机生成"
                );
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 人工排班
    pub const PRESERVE_MANUAL: &str = "preserve_manual";

    // 硬/软限制
    pub const MAX_CONAN_PER_GUIDE: &str = "max_conan_per_guide";
    pub const MAX_CONSECUTIVE_DAYS: &str = "max_consecutive_days";
    pub const HISTORY_LOOKBACK_DAYS: &str = "history_lookback_days";

    // 评分权重
    pub const SCORE_WEIGHT_TOTAL: &str = "score_weight_total";
    pub const SCORE_WEIGHT_WEEKEND: &str = "score_weight_weekend";
    pub const SCORE_WEIGHT_CONAN: &str = "score_weight_conan";
    pub const SCORE_WEIGHT_RECENCY: &str = "score_weight_recency";
    pub const CONAN_CAP_PENALTY: &str = "conan_cap_penalty";

    // 并列打散
    pub const TIE_BREAK_JITTER: &str = "tie_break_jitter";
    pub const TIE_BREAK_SEED: &str = "tie_break_seed";
}
