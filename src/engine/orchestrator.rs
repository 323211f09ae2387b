// ==========================================
// 宿舍轮值排班系统 - 排班编排器
// ==========================================
// 流程:
//   1. 读取运行配置（叠加请求覆写）
//   2. 一次性读取快照（人员/约束/休假/规则/周末标记/已有排班）
//   3. 组装整月排班（纯内存）
//   4. 非 dry_run 时单事务替换整月
// 红线: 读取失败在处理任何一天之前返回
// ==========================================

use crate::config::run_config::ScheduleRunConfig;
use crate::config::SchedulingConfigReader;
use crate::engine::assembler::{ScheduleAssembler, ScheduleResult};
use crate::engine::context::ScheduleSnapshot;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::repositories::ScheduleRepositories;
use crate::engine::tie_breaker::SeededTieBreaker;
use crate::repository::month_bounds;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

// ==========================================
// ScheduleRunRequest - 单次运行请求
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRunRequest {
    pub year: i32,
    pub month: u32,
    pub dry_run: bool,
    /// None = 使用配置值
    pub preserve_manual: Option<bool>,
    /// None = 使用配置值（配置也未设置时随机生成）
    pub tie_break_seed: Option<u64>,
}

impl ScheduleRunRequest {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            ..Default::default()
        }
    }
}

// ==========================================
// ScheduleRunReport - 运行报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRunReport {
    pub year: i32,
    pub month: u32,
    pub dry_run: bool,
    /// 实际写入的行数（dry_run 时为 0）
    pub persisted_rows: usize,
    pub config: ScheduleRunConfig,
    pub result: ScheduleResult,
}

// ==========================================
// ScheduleOrchestrator - 排班编排器
// ==========================================
pub struct ScheduleOrchestrator<C>
where
    C: SchedulingConfigReader,
{
    config: Arc<C>,
    repos: ScheduleRepositories,
    assembler: ScheduleAssembler,
}

impl<C> ScheduleOrchestrator<C>
where
    C: SchedulingConfigReader,
{
    /// 创建新的编排器实例
    pub fn new(config: Arc<C>, repos: ScheduleRepositories) -> Self {
        Self {
            config,
            repos,
            assembler: ScheduleAssembler::new(),
        }
    }

    /// 读取运行配置并叠加请求覆写
    pub async fn resolve_run_config(
        &self,
        request: &ScheduleRunRequest,
    ) -> EngineResult<ScheduleRunConfig> {
        let mut config = self
            .config
            .load_run_config()
            .await
            .map_err(|e| EngineError::Config(e.to_string()))?;

        config.dry_run = request.dry_run;
        if let Some(preserve) = request.preserve_manual {
            config.preserve_manual = preserve;
        }
        if request.tie_break_seed.is_some() {
            config.tie_break_seed = request.tie_break_seed;
        }
        config.max_consecutive_days = config.effective_max_consecutive_days();
        Ok(config)
    }

    /// 一次性读取运行快照
    pub fn load_snapshot(
        &self,
        year: i32,
        month: u32,
        history_lookback_days: u32,
    ) -> EngineResult<ScheduleSnapshot> {
        let (start, end) = month_bounds(year, month)
            .map_err(|_| EngineError::InvalidMonth { year, month })?;
        // 至少回看 1 天: 前一天休息规则 + 月初周六的周五链接
        let lookback = Duration::days(i64::from(history_lookback_days.max(1)));
        let history_start: NaiveDate = start - lookback;
        let after_end = end + Duration::days(1);

        let guides = self.repos.guide_repo().find_schedulable()?;
        if guides.is_empty() {
            return Err(EngineError::EmptyRoster { year, month });
        }

        let snapshot = ScheduleSnapshot {
            year,
            month,
            guides,
            one_off_constraints: self
                .repos
                .constraint_repo()
                .find_one_off_in_range(start, after_end)?,
            fixed_constraints: self.repos.constraint_repo().find_all_fixed()?,
            vacations: self
                .repos
                .constraint_repo()
                .find_vacations_overlapping(start, after_end)?,
            rules: self.repos.rule_repo().find_all()?,
            weekend_flags: self
                .repos
                .weekend_status_repo()
                .closed_flags(start - Duration::days(7), end)?,
            existing: self
                .repos
                .schedule_repo()
                .find_in_range(history_start, after_end)?,
        };

        debug!(
            guides_count = snapshot.guides.len(),
            one_off_count = snapshot.one_off_constraints.len(),
            fixed_count = snapshot.fixed_constraints.len(),
            vacations_count = snapshot.vacations.len(),
            rules_count = snapshot.rules.len(),
            existing_count = snapshot.existing.len(),
            "运行快照读取完成"
        );
        Ok(snapshot)
    }

    /// 执行整月自动排班
    pub async fn run_month(&self, request: ScheduleRunRequest) -> EngineResult<ScheduleRunReport> {
        info!(
            year = request.year,
            month = request.month,
            dry_run = request.dry_run,
            "开始执行月度自动排班"
        );

        // ==========================================
        // 步骤1: 运行配置
        // ==========================================
        let config = self.resolve_run_config(&request).await?;

        // ==========================================
        // 步骤2: 快照
        // ==========================================
        let snapshot = self.load_snapshot(request.year, request.month, config.history_lookback_days)?;

        // ==========================================
        // 步骤3: 组装
        // ==========================================
        let mut tie = SeededTieBreaker::from_optional_seed(config.tie_break_seed, config.weights.jitter);
        let result = self.assembler.assemble(&snapshot, &config, &mut tie)?;

        // ==========================================
        // 步骤4: 持久化
        // ==========================================
        let persisted_rows = if config.dry_run {
            debug!("dry_run: 跳过持久化");
            0
        } else {
            self.repos
                .schedule_repo()
                .replace_month(request.year, request.month, &result.assignments)?
        };

        info!(
            year = request.year,
            month = request.month,
            persisted_rows,
            warnings_count = result.warnings.len(),
            tie_break_seed = ?result.tie_break_seed,
            "月度自动排班完成"
        );

        Ok(ScheduleRunReport {
            year: request.year,
            month: request.month,
            dry_run: config.dry_run,
            persisted_rows,
            config,
            result,
        })
    }
}
