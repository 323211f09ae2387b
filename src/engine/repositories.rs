// ==========================================
// 宿舍轮值排班系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合排班编排器所需的所有 Repository
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    ConstraintRepository, GuideRepository, RuleRepository, ScheduleDraftRepository,
    ScheduleRepository, WeekendStatusRepository,
};

/// 排班引擎仓储集合
///
/// # 包含的仓储
/// - `guide_repo`: 人员
/// - `constraint_repo`: 一次性/固定约束与休假
/// - `rule_repo`: 协调员规则
/// - `weekend_status_repo`: 周末开放/封闭
/// - `schedule_repo`: 正式排班
/// - `draft_repo`: 排班草稿
#[derive(Clone)]
pub struct ScheduleRepositories {
    pub guide_repo: Arc<GuideRepository>,
    pub constraint_repo: Arc<ConstraintRepository>,
    pub rule_repo: Arc<RuleRepository>,
    pub weekend_status_repo: Arc<WeekendStatusRepository>,
    pub schedule_repo: Arc<ScheduleRepository>,
    pub draft_repo: Arc<ScheduleDraftRepository>,
}

impl ScheduleRepositories {
    /// 所有仓储共享同一连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            guide_repo: Arc::new(GuideRepository::from_connection(conn.clone())),
            constraint_repo: Arc::new(ConstraintRepository::from_connection(conn.clone())),
            rule_repo: Arc::new(RuleRepository::from_connection(conn.clone())),
            weekend_status_repo: Arc::new(WeekendStatusRepository::from_connection(conn.clone())),
            schedule_repo: Arc::new(ScheduleRepository::from_connection(conn.clone())),
            draft_repo: Arc::new(ScheduleDraftRepository::from_connection(conn)),
        }
    }

    /// 获取人员仓储
    pub fn guide_repo(&self) -> &Arc<GuideRepository> {
        &self.guide_repo
    }

    /// 获取约束仓储
    pub fn constraint_repo(&self) -> &Arc<ConstraintRepository> {
        &self.constraint_repo
    }

    /// 获取规则仓储
    pub fn rule_repo(&self) -> &Arc<RuleRepository> {
        &self.rule_repo
    }

    /// 获取周末状态仓储
    pub fn weekend_status_repo(&self) -> &Arc<WeekendStatusRepository> {
        &self.weekend_status_repo
    }

    /// 获取正式排班仓储
    pub fn schedule_repo(&self) -> &Arc<ScheduleRepository> {
        &self.schedule_repo
    }

    /// 获取草稿仓储
    pub fn draft_repo(&self) -> &Arc<ScheduleDraftRepository> {
        &self.draft_repo
    }
}
