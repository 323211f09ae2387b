// ==========================================
// 宿舍轮值排班系统 - 人员数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::guide::Guide;
use crate::domain::types::StaffRole;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// GuideRepository - 人员仓储
// ==========================================

/// 人员仓储
/// 职责: 管理 guides 表的读写
pub struct GuideRepository {
    conn: Arc<Mutex<Connection>>,
}

const GUIDE_COLUMNS: &str = "id, name, role, is_active, work_percent";

fn map_guide(row: &Row<'_>) -> rusqlite::Result<Guide> {
    Ok(Guide {
        id: row.get(0)?,
        name: row.get(1)?,
        role: StaffRole::from_str(&row.get::<_, String>(2)?),
        is_active: row.get::<_, i64>(3)? != 0,
        work_percent: row.get::<_, Option<f64>>(4)?.unwrap_or(100.0),
    })
}

impl GuideRepository {
    /// 创建新的人员仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部人员（按 id 升序）
    pub fn find_all(&self) -> RepositoryResult<Vec<Guide>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM guides ORDER BY id", GUIDE_COLUMNS))?;
        let guides = stmt
            .query_map([], map_guide)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(guides)
    }

    /// 查询参与排班的人员（在岗 + role=guide）
    pub fn find_schedulable(&self) -> RepositoryResult<Vec<Guide>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM guides WHERE is_active = 1 AND role = 'guide' ORDER BY id",
            GUIDE_COLUMNS
        ))?;
        let guides = stmt
            .query_map([], map_guide)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(guides)
    }

    /// 按 id 查询
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Guide>> {
        let conn = self.get_conn()?;
        let guide = conn
            .query_row(
                &format!("SELECT {} FROM guides WHERE id = ?1", GUIDE_COLUMNS),
                params![id],
                map_guide,
            )
            .optional()?;
        Ok(guide)
    }

    /// 新增人员，返回自增 id（guide.id 被忽略）
    pub fn insert(&self, guide: &Guide) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO guides (name, role, is_active, work_percent) VALUES (?1, ?2, ?3, ?4)",
            params![
                guide.name,
                guide.role.as_str(),
                guide.is_active as i64,
                guide.work_percent
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新在岗状态
    pub fn set_active(&self, id: i64, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE guides SET is_active = ?1 WHERE id = ?2",
            params![is_active as i64, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Guide".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
