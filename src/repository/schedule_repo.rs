// ==========================================
// 宿舍轮值排班系统 - 正式排班数据仓储
// ==========================================
// 表: schedule (date 为主键，每日一行)
// 红线: 月度替换必须在单个事务内完成（全部成功或全部回滚）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::schedule::Assignment;
use crate::domain::types::{DayType, ShiftRole};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Datelike, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

pub(crate) const ASSIGNMENT_COLUMNS: &str =
    "date, weekday, day_type, guide1_id, guide1_role, guide2_id, guide2_role, is_manual, is_locked";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_role(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<ShiftRole>> {
    match raw {
        None => Ok(None),
        Some(s) => ShiftRole::parse(&s)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("未知班次角色: {}", s))),
    }
}

/// 从行读取 Assignment（列顺序见 ASSIGNMENT_COLUMNS，从 offset 开始）
pub(crate) fn map_assignment(row: &Row<'_>, offset: usize) -> rusqlite::Result<Assignment> {
    let day_type_raw: String = row.get(offset + 2)?;
    let day_type = DayType::parse(&day_type_raw)
        .ok_or_else(|| conversion_error(offset + 2, format!("未知日类型: {}", day_type_raw)))?;

    Ok(Assignment {
        date: row.get(offset)?,
        weekday: row.get(offset + 1)?,
        day_type,
        guide1_id: row.get(offset + 3)?,
        guide1_role: parse_role(offset + 4, row.get(offset + 4)?)?,
        guide2_id: row.get(offset + 5)?,
        guide2_role: parse_role(offset + 6, row.get(offset + 6)?)?,
        is_manual: row.get::<_, i64>(offset + 7)? != 0,
        is_locked: row.get::<_, i64>(offset + 8)? != 0,
    })
}

/// 月份首尾日期
pub fn month_bounds(year: i32, month: u32) -> RepositoryResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(RepositoryError::InvalidMonth { year, month })?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let end = next
        .and_then(|d| d.pred_opt())
        .ok_or(RepositoryError::InvalidMonth { year, month })?;
    Ok((start, end))
}

fn insert_assignment(tx: &Transaction<'_>, assignment: &Assignment) -> RepositoryResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO schedule ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            ASSIGNMENT_COLUMNS
        ),
        params![
            assignment.date.format("%Y-%m-%d").to_string(),
            assignment.weekday,
            assignment.day_type.as_str(),
            assignment.guide1_id,
            assignment.guide1_role.map(|r| r.as_str()),
            assignment.guide2_id,
            assignment.guide2_role.map(|r| r.as_str()),
            assignment.is_manual as i64,
            assignment.is_locked as i64,
        ],
    )?;
    Ok(())
}

// ==========================================
// ScheduleRepository - 正式排班仓储
// ==========================================
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
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

    /// 查询日期范围内的排班（含首尾，按日期升序）
    pub fn find_in_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM schedule WHERE date BETWEEN ?1 AND ?2 ORDER BY date",
            ASSIGNMENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                params![
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string()
                ],
                |row| map_assignment(row, 0),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询整月排班
    pub fn find_month(&self, year: i32, month: u32) -> RepositoryResult<Vec<Assignment>> {
        let (start, end) = month_bounds(year, month)?;
        self.find_in_range(start, end)
    }

    pub fn find_by_date(&self, date: NaiveDate) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM schedule WHERE date = ?1", ASSIGNMENT_COLUMNS),
                params![date.format("%Y-%m-%d").to_string()],
                |row| map_assignment(row, 0),
            )
            .optional()?;
        Ok(row)
    }

    /// 写入单日（存在则覆盖）
    pub fn upsert(&self, assignment: &Assignment) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM schedule WHERE date = ?1",
            params![assignment.date.format("%Y-%m-%d").to_string()],
        )?;
        insert_assignment(&tx, assignment)?;
        tx.commit()?;
        Ok(())
    }

    /// 整月替换（单事务）
    ///
    /// # 错误
    /// - BusinessRuleViolation: 存在不属于该月的记录（此时不写入任何数据）
    pub fn replace_month(
        &self,
        year: i32,
        month: u32,
        assignments: &[Assignment],
    ) -> RepositoryResult<usize> {
        let (start, end) = month_bounds(year, month)?;
        if let Some(stray) = assignments.iter().find(|a| a.date < start || a.date > end) {
            return Err(RepositoryError::OutsideMonth {
                date: stray.date,
                year,
                month,
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM schedule WHERE date BETWEEN ?1 AND ?2",
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
        )?;
        for assignment in assignments {
            insert_assignment(&tx, assignment)?;
        }
        tx.commit()?;
        Ok(assignments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let (start, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, end) = month_bounds(2025, 12).unwrap();
        assert_eq!(end.day(), 31);

        assert!(month_bounds(2025, 13).is_err());
    }
}
