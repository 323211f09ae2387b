// ==========================================
// 宿舍轮值排班系统 - 排班草稿数据仓储
// ==========================================
// 表: schedule_draft (PRIMARY KEY(name, date))
// 草稿整体保存/整体删除，不影响正式排班
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::schedule::Assignment;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::schedule_repo::{map_assignment, ASSIGNMENT_COLUMNS};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 草稿摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub name: String,
    pub day_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

pub struct ScheduleDraftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleDraftRepository {
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

    /// 保存草稿（同名草稿整体替换）
    pub fn save(&self, name: &str, assignments: &[Assignment]) -> RepositoryResult<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "name".to_string(),
                message: "草稿名称不能为空".to_string(),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM schedule_draft WHERE name = ?1", params![name])?;
        for a in assignments {
            tx.execute(
                &format!(
                    "INSERT INTO schedule_draft (name, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    ASSIGNMENT_COLUMNS
                ),
                params![
                    name,
                    a.date.format("%Y-%m-%d").to_string(),
                    a.weekday,
                    a.day_type.as_str(),
                    a.guide1_id,
                    a.guide1_role.map(|r| r.as_str()),
                    a.guide2_id,
                    a.guide2_role.map(|r| r.as_str()),
                    a.is_manual as i64,
                    a.is_locked as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(assignments.len())
    }

    /// 读取草稿（按日期升序）
    ///
    /// # 错误
    /// - NotFound: 草稿不存在
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM schedule_draft WHERE name = ?1 ORDER BY date",
            ASSIGNMENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![name.trim()], |row| map_assignment(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(RepositoryError::NotFound {
                entity: "ScheduleDraft".to_string(),
                id: name.to_string(),
            });
        }
        Ok(rows)
    }

    /// 列出全部草稿
    pub fn list(&self) -> RepositoryResult<Vec<DraftSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name, COUNT(*), MIN(date), MAX(date)
            FROM schedule_draft
            GROUP BY name
            ORDER BY name
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DraftSummary {
                    name: row.get(0)?,
                    day_count: row.get::<_, i64>(1)? as usize,
                    first_date: row.get(2)?,
                    last_date: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 删除草稿，返回删除行数
    pub fn delete(&self, name: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM schedule_draft WHERE name = ?1", params![name.trim()])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ScheduleDraft".to_string(),
                id: name.to_string(),
            });
        }
        Ok(affected)
    }
}
