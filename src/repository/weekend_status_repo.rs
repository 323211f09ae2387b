// ==========================================
// 宿舍轮值排班系统 - 周末开放/封闭状态仓储
// ==========================================
// 表: weekend_status (friday_date 为主键)
// 约定: 无记录 = 开放
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Datelike, NaiveDate, Weekday};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 周末状态记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendStatusEntity {
    pub friday_date: NaiveDate,
    pub is_closed: bool,
}

pub struct WeekendStatusRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WeekendStatusRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 设置某周末的状态（UPSERT）
    ///
    /// # 错误
    /// - FieldValueError: friday_date 不是周五
    pub fn set_status(&self, friday_date: NaiveDate, is_closed: bool) -> RepositoryResult<()> {
        if friday_date.weekday() != Weekday::Fri {
            return Err(RepositoryError::FieldValueError {
                field: "friday_date".to_string(),
                message: format!("{} 不是周五", friday_date),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO weekend_status (friday_date, is_closed) VALUES (?1, ?2)
            ON CONFLICT(friday_date) DO UPDATE SET is_closed = ?2
            "#,
            params![friday_date.format("%Y-%m-%d").to_string(), is_closed as i64],
        )?;
        Ok(())
    }

    /// 查询某周五的状态，无记录视为开放
    pub fn is_closed(&self, friday_date: NaiveDate) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let flag: Option<i64> = conn
            .query_row(
                "SELECT is_closed FROM weekend_status WHERE friday_date = ?1",
                params![friday_date.format("%Y-%m-%d").to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.map(|v| v != 0).unwrap_or(false))
    }

    /// 查询日期范围内的已登记周末（含首尾）
    pub fn find_in_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<WeekendStatusEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT friday_date, is_closed
            FROM weekend_status
            WHERE friday_date BETWEEN ?1 AND ?2
            ORDER BY friday_date
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    Ok(WeekendStatusEntity {
                        friday_date: row.get(0)?,
                        is_closed: row.get::<_, i64>(1)? != 0,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 日期范围内的周五 → 是否封闭 映射（供日历分类使用）
    pub fn closed_flags(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<HashMap<NaiveDate, bool>> {
        Ok(self
            .find_in_range(start_date, end_date)?
            .into_iter()
            .map(|e| (e.friday_date, e.is_closed))
            .collect())
    }
}
