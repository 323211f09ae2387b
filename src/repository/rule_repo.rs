// ==========================================
// 宿舍轮值排班系统 - 协调员规则数据仓储
// ==========================================
// 表: coordinator_rules
// 未知 rule_type 的行被跳过并记录告警
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::rule::{CoordinatorRule, RuleKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct RuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RuleRepository {
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

    /// 查询全部规则（含停用）
    pub fn find_all(&self) -> RepositoryResult<Vec<CoordinatorRule>> {
        self.query_rules("SELECT id, rule_type, guide_id, guide2_id, is_active, description FROM coordinator_rules ORDER BY id")
    }

    /// 查询已生效规则
    pub fn find_active(&self) -> RepositoryResult<Vec<CoordinatorRule>> {
        self.query_rules("SELECT id, rule_type, guide_id, guide2_id, is_active, description FROM coordinator_rules WHERE is_active = 1 ORDER BY id")
    }

    fn query_rules(&self, sql: &str) -> RepositoryResult<Vec<CoordinatorRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let raw_rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, i64>(4)? != 0,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = Vec::with_capacity(raw_rows.len());
        for (id, rule_type, guide_id, guide2_id, is_active, description) in raw_rows {
            match RuleKind::from_row(&rule_type, guide_id, guide2_id) {
                Some(kind) => rules.push(CoordinatorRule {
                    id,
                    kind,
                    is_active,
                    description,
                }),
                None => {
                    warn!(rule_id = id, rule_type = %rule_type, "无法识别的协调员规则，已跳过");
                }
            }
        }
        Ok(rules)
    }

    /// 新增规则，返回自增 id
    pub fn insert(
        &self,
        kind: RuleKind,
        is_active: bool,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO coordinator_rules (rule_type, guide_id, guide2_id, is_active, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                kind.type_tag(),
                kind.primary_guide(),
                kind.secondary_guide(),
                is_active as i64,
                description
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_active(&self, id: i64, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE coordinator_rules SET is_active = ?1 WHERE id = ?2",
            params![is_active as i64, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CoordinatorRule".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
