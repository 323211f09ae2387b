// ==========================================
// 宿舍轮值排班系统 - 月度排班组装器
// ==========================================
// 流程:
//   1. 日历分类
//   2. 周末链接预处理（全部封闭周五）
//   3. 主流程逐日处理:
//      Pending → {ManualPreserved | ClosedFridayHandled |
//                 ClosedSaturdayHandled | RegularHandled} → Committed
//   4. 汇总统计
// 红线: 单日排不满不报错，只记告警；整个运行不因某一天中断
// ==========================================

use crate::config::run_config::ScheduleRunConfig;
use crate::domain::schedule::{Assignment, Day, ScheduleSummary, ScheduleWarning};
use crate::domain::types::{DayType, ShiftRole, WarningKind};
use crate::engine::availability::AvailabilityEvaluator;
use crate::engine::calendar::CalendarClassifier;
use crate::engine::context::{RunContext, ScheduleSnapshot, WeekendLinks, WorkloadStat};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::selector::{Candidate, GuideSelector};
use crate::engine::tie_breaker::TieBreaker;
use crate::engine::weekend_linker::WeekendLinker;
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

// ==========================================
// DayOutcome - 单日处理路径
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOutcome {
    ManualPreserved,
    ClosedFridayHandled,
    ClosedSaturdayHandled,
    RegularHandled,
}

// ==========================================
// ScheduleResult - 组装结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub year: i32,
    pub month: u32,
    pub assignments: Vec<Assignment>,
    pub warnings: Vec<ScheduleWarning>,
    pub summary: ScheduleSummary,
    pub outcomes: Vec<DayOutcome>,
    pub links: WeekendLinks,
    /// 运行结束时的工作量（含历史初始化部分）
    pub workloads: BTreeMap<i64, WorkloadStat>,
    pub tie_break_seed: Option<u64>,
}

// ==========================================
// ScheduleAssembler - 组装器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduleAssembler {
    calendar: CalendarClassifier,
    evaluator: AvailabilityEvaluator,
    linker: WeekendLinker,
    selector: GuideSelector,
}

impl ScheduleAssembler {
    pub fn new() -> Self {
        Self {
            calendar: CalendarClassifier::new(),
            evaluator: AvailabilityEvaluator::new(),
            linker: WeekendLinker::new(),
            selector: GuideSelector::new(),
        }
    }

    /// 组装整月排班
    ///
    /// # 错误
    /// - InvalidMonth / EmptyRoster: 在处理任何一天之前返回
    #[instrument(skip(self, snapshot, run_config, tie), fields(
        year = snapshot.year,
        month = snapshot.month,
        guides_count = snapshot.guides.len(),
        preserve_manual = run_config.preserve_manual
    ))]
    pub fn assemble(
        &self,
        snapshot: &ScheduleSnapshot,
        run_config: &ScheduleRunConfig,
        tie: &mut dyn TieBreaker,
    ) -> EngineResult<ScheduleResult> {
        let days = self
            .calendar
            .month_days(snapshot.year, snapshot.month, &snapshot.weekend_flags)?;

        if snapshot.guides.is_empty() {
            return Err(EngineError::EmptyRoster {
                year: snapshot.year,
                month: snapshot.month,
            });
        }

        info!(days_count = days.len(), "开始组装月度排班");

        let mut ctx = RunContext::new(snapshot, run_config);

        // ==========================================
        // 阶段1: 周末链接
        // ==========================================
        self.linker.link(&days, snapshot, &mut ctx, tie);

        // ==========================================
        // 阶段2: 逐日主流程
        // ==========================================
        let mut assignments = Vec::with_capacity(days.len());
        let mut warnings = Vec::new();
        let mut outcomes = Vec::with_capacity(days.len());

        for day in &days {
            if let Some(row) = ctx.preserved(day.date).cloned() {
                debug!(date = %day.date, "锁定记录，原样保留");
                push_shortfall_warning(&row, &mut warnings);
                assignments.push(row);
                outcomes.push(DayOutcome::ManualPreserved);
                continue;
            }

            let (slots, outcome) = match day.day_type {
                DayType::ClosedFriday => (
                    self.handle_closed_friday(day, snapshot, &mut ctx, tie, &mut warnings),
                    DayOutcome::ClosedFridayHandled,
                ),
                DayType::ClosedSaturday => (
                    self.handle_closed_saturday(day, snapshot, &ctx, tie, &mut warnings),
                    DayOutcome::ClosedSaturdayHandled,
                ),
                DayType::Regular | DayType::OpenFriday | DayType::OpenSaturday => (
                    self.handle_regular(day, snapshot, &ctx, tie),
                    DayOutcome::RegularHandled,
                ),
            };

            // Committed
            ctx.commit(day, &slots);
            ctx.advance_cursor();
            let assignment = Assignment::from_slots(day, &slots);
            debug!(
                date = %day.date,
                day_type = %day.day_type,
                outcome = ?outcome,
                guide1_id = ?assignment.guide1_id,
                guide2_id = ?assignment.guide2_id,
                "单日排班提交"
            );
            push_shortfall_warning(&assignment, &mut warnings);
            assignments.push(assignment);
            outcomes.push(outcome);
        }

        // ==========================================
        // 阶段3: 汇总
        // ==========================================
        let summary = summarize(&assignments, snapshot);
        info!(
            assigned_count = summary.assigned_count,
            total_days = summary.total_days,
            shortfall_days = summary.shortfall_days,
            warnings_count = warnings.len(),
            "月度排班组装完成"
        );

        Ok(ScheduleResult {
            year: snapshot.year,
            month: snapshot.month,
            assignments,
            warnings,
            summary,
            outcomes,
            links: ctx.links().clone(),
            workloads: ctx.workloads().iter().map(|(k, v)| (*k, v.clone())).collect(),
            tie_break_seed: tie.seed(),
        })
    }

    /// 当日所有可用候选（排除 exclude 中的人员）
    fn candidates(
        &self,
        day: &Day,
        snapshot: &ScheduleSnapshot,
        ctx: &RunContext,
        tie: &mut dyn TieBreaker,
        exclude: &[i64],
    ) -> Vec<Candidate> {
        snapshot
            .guides
            .iter()
            .filter(|g| !exclude.contains(&g.id))
            .filter_map(|g| {
                let availability = self.evaluator.evaluate(g, day, ctx, tie);
                availability.score.map(|score| Candidate {
                    guide_id: g.id,
                    score,
                    rank: ctx.rotation_rank(g.id),
                })
            })
            .collect()
    }

    fn handle_closed_friday(
        &self,
        day: &Day,
        snapshot: &ScheduleSnapshot,
        ctx: &mut RunContext,
        tie: &mut dyn TieBreaker,
        warnings: &mut Vec<ScheduleWarning>,
    ) -> Vec<(i64, ShiftRole)> {
        if let Some(conan) = ctx.links().get(day.date) {
            return vec![(conan, ShiftRole::Conan)];
        }

        // 预处理未选出 conan: 主流程兜底
        match self
            .linker
            .pick_conan(day, snapshot, ctx, tie, &HashMap::new())
        {
            Some(conan) => {
                ctx.link_weekend(day.date, conan, false);
                let message = t_with_args(
                    "warning.conan_fallback",
                    &[("date", &day.date.to_string()), ("guide", &conan.to_string())],
                );
                warn!(date = %day.date, guide_id = conan, "封闭周五 conan 兜底选出");
                warnings.push(ScheduleWarning {
                    date: day.date,
                    kind: WarningKind::ConanFallback,
                    message,
                });
                vec![(conan, ShiftRole::Conan)]
            }
            None => Vec::new(),
        }
    }

    fn handle_closed_saturday(
        &self,
        day: &Day,
        snapshot: &ScheduleSnapshot,
        ctx: &RunContext,
        tie: &mut dyn TieBreaker,
        warnings: &mut Vec<ScheduleWarning>,
    ) -> Vec<(i64, ShiftRole)> {
        match ctx.linked_conan_for_saturday(day.date) {
            Some(conan) => {
                // conan 延续，不再复核
                let candidates = self.candidates(day, snapshot, ctx, tie, &[conan]);
                let mut slots = vec![(conan, ShiftRole::Conan)];
                slots.extend(
                    self.selector
                        .select(candidates, 1, &[conan], &ctx.rules)
                        .into_iter()
                        .map(|c| (c.guide_id, ShiftRole::Motzash)),
                );
                slots
            }
            None => {
                let message =
                    t_with_args("warning.weekend_link_missing", &[("date", &day.date.to_string())]);
                warn!(date = %day.date, "封闭周六缺少周五 conan，按普通日排班");
                warnings.push(ScheduleWarning {
                    date: day.date,
                    kind: WarningKind::WeekendLinkMissing,
                    message,
                });
                self.select_pair(day, snapshot, ctx, tie)
            }
        }
    }

    fn handle_regular(
        &self,
        day: &Day,
        snapshot: &ScheduleSnapshot,
        ctx: &RunContext,
        tie: &mut dyn TieBreaker,
    ) -> Vec<(i64, ShiftRole)> {
        self.select_pair(day, snapshot, ctx, tie)
    }

    /// 两人 regular/overlap
    fn select_pair(
        &self,
        day: &Day,
        snapshot: &ScheduleSnapshot,
        ctx: &RunContext,
        tie: &mut dyn TieBreaker,
    ) -> Vec<(i64, ShiftRole)> {
        let roles = [ShiftRole::Regular, ShiftRole::Overlap];
        let candidates = self.candidates(day, snapshot, ctx, tie, &[]);
        self.selector
            .select(candidates, roles.len(), &[], &ctx.rules)
            .into_iter()
            .zip(roles)
            .map(|(c, role)| (c.guide_id, role))
            .collect()
    }
}

/// 人数不足时追加告警
fn push_shortfall_warning(assignment: &Assignment, warnings: &mut Vec<ScheduleWarning>) {
    let required = assignment.day_type.required_guides();
    let assigned = assignment.guide_count();
    if assigned >= required {
        return;
    }

    let date = assignment.date.to_string();
    let (kind, message) = if assigned == 0 {
        (
            WarningKind::NoAssignment,
            t_with_args("warning.no_assignment", &[("date", &date)]),
        )
    } else {
        (
            WarningKind::InsufficientGuides,
            t_with_args(
                "warning.insufficient_guides",
                &[
                    ("date", &date),
                    ("required", &required.to_string()),
                    ("assigned", &assigned.to_string()),
                ],
            ),
        )
    };
    warn!(date = %assignment.date, kind = %kind, required, assigned, "排班人数不足");
    warnings.push(ScheduleWarning {
        date: assignment.date,
        kind,
        message,
    });
}

/// 月度汇总（工作量只统计本月输出）
fn summarize(assignments: &[Assignment], snapshot: &ScheduleSnapshot) -> ScheduleSummary {
    let mut per_guide: HashMap<i64, usize> = snapshot.guides.iter().map(|g| (g.id, 0)).collect();
    for a in assignments {
        for id in a.guide_ids() {
            if let Some(n) = per_guide.get_mut(&id) {
                *n += 1;
            }
        }
    }

    let workload_min = per_guide.values().copied().min().unwrap_or(0);
    let workload_max = per_guide.values().copied().max().unwrap_or(0);
    let workload_avg = if per_guide.is_empty() {
        0.0
    } else {
        per_guide.values().sum::<usize>() as f64 / per_guide.len() as f64
    };

    ScheduleSummary {
        assigned_count: assignments.iter().filter(|a| a.guide_count() > 0).count(),
        total_days: assignments.len(),
        shortfall_days: assignments
            .iter()
            .filter(|a| a.guide_count() < a.day_type.required_guides())
            .count(),
        workload_min,
        workload_max,
        workload_avg,
    }
}
