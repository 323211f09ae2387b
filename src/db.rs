// ==========================================
// 宿舍轮值排班系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表（引擎读写的表）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS guides (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'guide',
    is_active     INTEGER NOT NULL DEFAULT 1,
    work_percent  REAL NOT NULL DEFAULT 100.0
);

CREATE TABLE IF NOT EXISTS one_off_constraints (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    guide_id  INTEGER NOT NULL REFERENCES guides(id) ON DELETE CASCADE,
    date      TEXT NOT NULL,
    details   TEXT
);
CREATE INDEX IF NOT EXISTS idx_one_off_date ON one_off_constraints(date);

CREATE TABLE IF NOT EXISTS fixed_constraints (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    guide_id  INTEGER NOT NULL REFERENCES guides(id) ON DELETE CASCADE,
    weekday   INTEGER NOT NULL CHECK (weekday BETWEEN 0 AND 6),
    details   TEXT
);

CREATE TABLE IF NOT EXISTS vacations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    guide_id    INTEGER NOT NULL REFERENCES guides(id) ON DELETE CASCADE,
    date_start  TEXT NOT NULL,
    date_end    TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'pending',
    note        TEXT
);

CREATE TABLE IF NOT EXISTS coordinator_rules (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_type    TEXT NOT NULL,
    guide_id     INTEGER NOT NULL REFERENCES guides(id) ON DELETE CASCADE,
    guide2_id    INTEGER REFERENCES guides(id) ON DELETE CASCADE,
    is_active    INTEGER NOT NULL DEFAULT 1,
    description  TEXT,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS weekend_status (
    friday_date  TEXT PRIMARY KEY,
    is_closed    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS schedule (
    date         TEXT PRIMARY KEY,
    weekday      INTEGER NOT NULL,
    day_type     TEXT NOT NULL,
    guide1_id    INTEGER REFERENCES guides(id),
    guide1_role  TEXT,
    guide2_id    INTEGER REFERENCES guides(id),
    guide2_role  TEXT,
    is_manual    INTEGER NOT NULL DEFAULT 0,
    is_locked    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS schedule_draft (
    name         TEXT NOT NULL,
    date         TEXT NOT NULL,
    weekday      INTEGER NOT NULL,
    day_type     TEXT NOT NULL,
    guide1_id    INTEGER,
    guide1_role  TEXT,
    guide2_id    INTEGER,
    guide2_role  TEXT,
    is_manual    INTEGER NOT NULL DEFAULT 0,
    is_locked    INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (name, date)
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id    TEXT PRIMARY KEY,
    scope_type  TEXT NOT NULL,
    scope_key   TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL REFERENCES config_scope(scope_id),
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key) VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等），并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
