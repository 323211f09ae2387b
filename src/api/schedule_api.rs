// ==========================================
// 宿舍轮值排班系统 - 排班 API
// ==========================================
// 职责: 自动排班、人工录入、周末状态、草稿管理与发布
// 红线: 人工录入与草稿发布必须先通过校验器
// ==========================================

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ManualAssignmentValidator, ValidationContext};
use crate::config::config_manager::ConfigManager;
use crate::domain::rule::RuleBook;
use crate::domain::schedule::{Assignment, Day};
use crate::domain::types::ShiftRole;
use crate::engine::orchestrator::{ScheduleOrchestrator, ScheduleRunReport, ScheduleRunRequest};
use crate::engine::repositories::ScheduleRepositories;
use crate::repository::{month_bounds, DraftSummary, WeekendStatusEntity};

// ==========================================
// ManualAssignmentRequest - 人工录入请求
// ==========================================

/// 人工录入单日排班
///
/// 角色为空时按日类型的标准角色依槽位补齐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAssignmentRequest {
    pub date: NaiveDate,
    pub guide1_id: Option<i64>,
    pub guide1_role: Option<ShiftRole>,
    pub guide2_id: Option<i64>,
    pub guide2_role: Option<ShiftRole>,
    pub is_locked: bool,
}

// ==========================================
// ScheduleApi - 排班 API
// ==========================================

/// 排班API
///
/// 职责：
/// 1. 整月自动排班（委托编排器）
/// 2. 人工录入单日（校验后写入）
/// 3. 周末开放/封闭登记
/// 4. 草稿保存/读取/删除/发布
pub struct ScheduleApi {
    repos: ScheduleRepositories,
    orchestrator: ScheduleOrchestrator<ConfigManager>,
    validator: ManualAssignmentValidator,
}

impl ScheduleApi {
    /// 创建新的ScheduleApi实例
    pub fn new(repos: ScheduleRepositories, config_manager: Arc<ConfigManager>) -> Self {
        Self {
            orchestrator: ScheduleOrchestrator::new(config_manager, repos.clone()),
            repos,
            validator: ManualAssignmentValidator::new(),
        }
    }

    // ==========================================
    // 自动排班
    // ==========================================

    /// 执行整月自动排班
    ///
    /// # 返回
    /// - Ok(ScheduleRunReport): 排班结果（含告警与汇总）
    /// - Err(ApiError): 月份无效、无可排人员、配置或数据库错误
    pub async fn run_auto_schedule(&self, request: ScheduleRunRequest) -> ApiResult<ScheduleRunReport> {
        if !(1..=12).contains(&request.month) {
            return Err(ApiError::InvalidInput(format!(
                "月份必须在1~12之间: {}",
                request.month
            )));
        }
        Ok(self.orchestrator.run_month(request).await?)
    }

    /// 查询整月正式排班
    pub fn get_month_schedule(&self, year: i32, month: u32) -> ApiResult<Vec<Assignment>> {
        Ok(self.repos.schedule_repo().find_month(year, month)?)
    }

    // ==========================================
    // 人工录入
    // ==========================================

    /// 人工录入单日排班（is_manual = true）
    ///
    /// # 返回
    /// - Ok(Assignment): 已写入的记录
    /// - Err(ApiError::ManualAssignmentValidationError): 校验失败，未写入
    pub fn save_manual_assignment(&self, request: ManualAssignmentRequest) -> ApiResult<Assignment> {
        let ctx = self.validation_context(request.date, request.date)?;
        let day = Day {
            date: request.date,
            day_type: ctx.expected_day_type(request.date),
        };
        let required_roles = day.day_type.required_roles();

        let mut assignment = Assignment::empty(&day);
        assignment.guide1_id = request.guide1_id;
        assignment.guide1_role = request
            .guide1_id
            .and(request.guide1_role.or_else(|| required_roles.first().copied()));
        assignment.guide2_id = request.guide2_id;
        assignment.guide2_role = request
            .guide2_id
            .and(request.guide2_role.or_else(|| required_roles.get(1).copied()));
        assignment.is_manual = true;
        assignment.is_locked = request.is_locked;

        self.validator.validate(&assignment, &ctx)?;
        self.repos.schedule_repo().upsert(&assignment)?;

        tracing::info!(
            date = %assignment.date,
            day_type = %assignment.day_type,
            guide1_id = ?assignment.guide1_id,
            guide2_id = ?assignment.guide2_id,
            is_locked = assignment.is_locked,
            "人工排班已保存"
        );
        Ok(assignment)
    }

    // ==========================================
    // 周末状态
    // ==========================================

    /// 登记周末开放/封闭（以周五日期为键）
    pub fn set_weekend_status(&self, friday_date: NaiveDate, is_closed: bool) -> ApiResult<()> {
        self.repos
            .weekend_status_repo()
            .set_status(friday_date, is_closed)?;
        tracing::info!(friday_date = %friday_date, is_closed, "周末状态已更新");
        Ok(())
    }

    /// 查询整月已登记的周末状态
    pub fn list_weekend_status(&self, year: i32, month: u32) -> ApiResult<Vec<WeekendStatusEntity>> {
        let (start, end) = month_bounds(year, month)?;
        Ok(self.repos.weekend_status_repo().find_in_range(start, end)?)
    }

    // ==========================================
    // 草稿
    // ==========================================

    /// 保存草稿（同名草稿整体替换）
    pub fn save_draft(&self, name: &str, assignments: &[Assignment]) -> ApiResult<usize> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("草稿名称不能为空".to_string()));
        }
        if assignments.is_empty() {
            return Err(ApiError::InvalidInput("草稿内容不能为空".to_string()));
        }
        Ok(self.repos.draft_repo().save(name, assignments)?)
    }

    /// 读取草稿
    pub fn get_draft(&self, name: &str) -> ApiResult<Vec<Assignment>> {
        Ok(self.repos.draft_repo().find_by_name(name)?)
    }

    /// 草稿列表
    pub fn list_drafts(&self) -> ApiResult<Vec<DraftSummary>> {
        Ok(self.repos.draft_repo().list()?)
    }

    /// 删除草稿
    pub fn delete_draft(&self, name: &str) -> ApiResult<()> {
        self.repos.draft_repo().delete(name)?;
        Ok(())
    }

    /// 发布草稿: 逐日校验后单事务替换整月正式排班
    ///
    /// # 错误
    /// - NotFound: 草稿不存在
    /// - InvalidInput: 草稿跨月
    /// - ManualAssignmentValidationError: 任一天校验失败（汇总全部违规，不写入）
    pub fn publish_draft(&self, name: &str) -> ApiResult<usize> {
        let assignments = self.repos.draft_repo().find_by_name(name)?;
        let first = assignments
            .first()
            .ok_or_else(|| ApiError::NotFound(format!("草稿{}不存在", name)))?;
        let (year, month) = (first.date.year(), first.date.month());
        if let Some(stray) = assignments
            .iter()
            .find(|a| a.date.year() != year || a.date.month() != month)
        {
            return Err(ApiError::InvalidInput(format!(
                "草稿{}跨月: {} 不属于 {}-{:02}",
                name, stray.date, year, month
            )));
        }

        let (start, end) = month_bounds(year, month)?;
        let ctx = self.validation_context(start, end)?;
        let violations: Vec<_> = assignments
            .iter()
            .flat_map(|a| self.validator.collect_violations(a, &ctx))
            .collect();
        if !violations.is_empty() {
            return Err(ApiError::ManualAssignmentValidationError {
                reason: format!("草稿{}校验失败，{}个违规", name, violations.len()),
                violations,
            });
        }

        let written = self
            .repos
            .schedule_repo()
            .replace_month(year, month, &assignments)?;
        tracing::info!(draft = name, year, month, written, "草稿已发布");
        Ok(written)
    }

    /// 读取校验上下文（周五标记向前多取一天，覆盖月初周六）
    fn validation_context(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<ValidationContext> {
        let guides = self.repos.guide_repo().find_all()?;
        let rules = RuleBook::from_rules(&self.repos.rule_repo().find_all()?);
        let flags = self
            .repos
            .weekend_status_repo()
            .closed_flags(start - Duration::days(1), end)?;
        Ok(ValidationContext::new(guides, rules, flags))
    }
}

