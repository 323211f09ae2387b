// ==========================================
// 宿舍轮值排班系统 - 不可用约束数据仓储
// ==========================================
// 表: one_off_constraints / fixed_constraints / vacations
// 红线: Repository 不含业务逻辑（休假状态过滤由引擎完成）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::constraint::{FixedConstraint, OneOffConstraint, Vacation};
use crate::domain::types::VacationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ConstraintRepository - 约束仓储
// ==========================================
pub struct ConstraintRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConstraintRepository {
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

    // ==========================================
    // 一次性约束
    // ==========================================

    /// 查询日期范围内的一次性约束（含首尾）
    pub fn find_one_off_in_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<OneOffConstraint>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, guide_id, date, details
            FROM one_off_constraints
            WHERE date BETWEEN ?1 AND ?2
            ORDER BY date, guide_id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    Ok(OneOffConstraint {
                        id: row.get(0)?,
                        guide_id: row.get(1)?,
                        date: row.get(2)?,
                        details: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_one_off(
        &self,
        guide_id: i64,
        date: NaiveDate,
        details: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO one_off_constraints (guide_id, date, details) VALUES (?1, ?2, ?3)",
            params![guide_id, date.format("%Y-%m-%d").to_string(), details],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ==========================================
    // 每周固定约束
    // ==========================================

    pub fn find_all_fixed(&self) -> RepositoryResult<Vec<FixedConstraint>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, guide_id, weekday, details FROM fixed_constraints ORDER BY guide_id, weekday",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FixedConstraint {
                    id: row.get(0)?,
                    guide_id: row.get(1)?,
                    weekday: row.get(2)?,
                    details: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 新增固定约束
    ///
    /// # 参数
    /// - weekday: 0=周日 ... 6=周六，越界返回 FieldValueError
    pub fn insert_fixed(
        &self,
        guide_id: i64,
        weekday: u32,
        details: Option<&str>,
    ) -> RepositoryResult<i64> {
        if weekday > 6 {
            return Err(RepositoryError::FieldValueError {
                field: "weekday".to_string(),
                message: format!("星期索引越界: {}", weekday),
            });
        }
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO fixed_constraints (guide_id, weekday, details) VALUES (?1, ?2, ?3)",
            params![guide_id, weekday, details],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ==========================================
    // 休假
    // ==========================================

    /// 查询与日期范围有交集的休假（所有状态）
    pub fn find_vacations_overlapping(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<Vacation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, guide_id, date_start, date_end, status, note
            FROM vacations
            WHERE date_start <= ?2 AND date_end >= ?1
            ORDER BY date_start, guide_id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    Ok(Vacation {
                        id: row.get(0)?,
                        guide_id: row.get(1)?,
                        date_start: row.get(2)?,
                        date_end: row.get(3)?,
                        status: VacationStatus::from_str(&row.get::<_, String>(4)?),
                        note: row.get(5)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_vacation(
        &self,
        guide_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
        status: VacationStatus,
        note: Option<&str>,
    ) -> RepositoryResult<i64> {
        if date_end < date_start {
            return Err(RepositoryError::FieldValueError {
                field: "date_end".to_string(),
                message: format!("结束日期 {} 早于开始日期 {}", date_end, date_start),
            });
        }
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO vacations (guide_id, date_start, date_end, status, note)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                guide_id,
                date_start.format("%Y-%m-%d").to_string(),
                date_end.format("%Y-%m-%d").to_string(),
                status.as_str(),
                note
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_vacation_status(&self, id: i64, status: VacationStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE vacations SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Vacation".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
