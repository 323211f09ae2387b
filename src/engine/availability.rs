// ==========================================
// 宿舍轮值排班系统 - 可用性评估引擎
// ==========================================
// 输入: (指导员, 日期, 运行上下文)
// 输出: 是否可用 + 排除原因 + 评分（越低越优先）
// 红线: 硬排除按固定顺序检查，命中第一条即返回
// ==========================================
// 检查顺序:
//   1. 一次性约束
//   2. 每周固定约束
//   3. 已批准休假
//   4. no_auto_scheduling 规则
//   5. 前一天已上班（封闭周六的链接 conan 例外）
//   6. 后一天已排班（封闭周五接续封闭周六的 conan 例外）
//   7. 当日已排
//   8. no_weekends 规则（周五/周六）
//   9. 连续上班天数上限
// ==========================================

use crate::domain::guide::Guide;
use crate::domain::schedule::Day;
use crate::domain::types::{DayType, ShiftRole};
use crate::engine::context::RunContext;
use crate::engine::tie_breaker::TieBreaker;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{instrument, trace};

/// 最近上班惩罚的回看窗口（天）
pub const RECENCY_WINDOW_DAYS: i64 = 3;

// ==========================================
// ExclusionReason - 硬排除原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ExclusionReason {
    OneOffConstraint { date: NaiveDate },
    FixedWeekday { weekday: u32 },
    ApprovedVacation { start: NaiveDate, end: NaiveDate },
    NoAutoScheduling,
    WorkedPreviousDay { date: NaiveDate },
    ScheduledNextDay { date: NaiveDate },
    AlreadyAssigned,
    NoWeekends,
    MaxConsecutiveDays { streak: u32, limit: u32 },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::OneOffConstraint { date } => write!(f, "ONE_OFF_CONSTRAINT: date={}", date),
            ExclusionReason::FixedWeekday { weekday } => write!(f, "FIXED_WEEKDAY: weekday={}", weekday),
            ExclusionReason::ApprovedVacation { start, end } => {
                write!(f, "VACATION: {}..{}", start, end)
            }
            ExclusionReason::NoAutoScheduling => write!(f, "RULE: no_auto_scheduling"),
            ExclusionReason::WorkedPreviousDay { date } => write!(f, "WORKED_PREVIOUS_DAY: date={}", date),
            ExclusionReason::ScheduledNextDay { date } => write!(f, "SCHEDULED_NEXT_DAY: date={}", date),
            ExclusionReason::AlreadyAssigned => write!(f, "ALREADY_ASSIGNED"),
            ExclusionReason::NoWeekends => write!(f, "RULE: no_weekends"),
            ExclusionReason::MaxConsecutiveDays { streak, limit } => {
                write!(f, "MAX_CONSECUTIVE: streak={} limit={}", streak, limit)
            }
        }
    }
}

// ==========================================
// Availability - 评估结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub guide_id: i64,
    pub available: bool,
    pub reasons: Vec<ExclusionReason>,
    /// 仅在可用时有值
    pub score: Option<f64>,
}

impl Availability {
    fn excluded(guide_id: i64, reason: ExclusionReason) -> Self {
        Self {
            guide_id,
            available: false,
            reasons: vec![reason],
            score: None,
        }
    }
}

// ==========================================
// AvailabilityEvaluator - 可用性评估引擎
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct AvailabilityEvaluator;

impl AvailabilityEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// 评估单人单日
    #[instrument(skip(self, guide, ctx, tie), fields(guide_id = guide.id, date = %day.date, day_type = %day.day_type))]
    pub fn evaluate(
        &self,
        guide: &Guide,
        day: &Day,
        ctx: &RunContext,
        tie: &mut dyn TieBreaker,
    ) -> Availability {
        match self.first_exclusion(guide.id, day, ctx) {
            Some(reason) => {
                trace!(reason = %reason, "硬排除");
                Availability::excluded(guide.id, reason)
            }
            None => Availability {
                guide_id: guide.id,
                available: true,
                reasons: Vec::new(),
                score: Some(self.score(guide.id, day.date, ctx) + tie.jitter()),
            },
        }
    }

    /// 只检查与日历相关的硬约束（1~4 + no_weekends）
    ///
    /// 用于周末链接时核对 conan 在周六是否可到岗
    pub fn calendar_exclusion(
        &self,
        guide_id: i64,
        day: &Day,
        ctx: &RunContext,
    ) -> Option<ExclusionReason> {
        let date = day.date;
        if ctx.has_one_off(guide_id, date) {
            return Some(ExclusionReason::OneOffConstraint { date });
        }
        if ctx.has_fixed_weekday(guide_id, date) {
            return Some(ExclusionReason::FixedWeekday {
                weekday: day.weekday_index(),
            });
        }
        if let Some((start, end)) = ctx.approved_vacation(guide_id, date) {
            return Some(ExclusionReason::ApprovedVacation { start, end });
        }
        if ctx.rules.blocks_auto_scheduling(guide_id) {
            return Some(ExclusionReason::NoAutoScheduling);
        }
        if day.day_type.is_weekend() && ctx.rules.forbids_weekends(guide_id) {
            return Some(ExclusionReason::NoWeekends);
        }
        None
    }

    fn first_exclusion(&self, guide_id: i64, day: &Day, ctx: &RunContext) -> Option<ExclusionReason> {
        let date = day.date;

        // 1 ~ 4
        if ctx.has_one_off(guide_id, date) {
            return Some(ExclusionReason::OneOffConstraint { date });
        }
        if ctx.has_fixed_weekday(guide_id, date) {
            return Some(ExclusionReason::FixedWeekday {
                weekday: day.weekday_index(),
            });
        }
        if let Some((start, end)) = ctx.approved_vacation(guide_id, date) {
            return Some(ExclusionReason::ApprovedVacation { start, end });
        }
        if ctx.rules.blocks_auto_scheduling(guide_id) {
            return Some(ExclusionReason::NoAutoScheduling);
        }

        // 5. 前一天
        let prev = date - Duration::days(1);
        if ctx.is_occupied(guide_id, prev) {
            let continuing_conan = day.day_type == DayType::ClosedSaturday
                && ctx.linked_conan_for_saturday(date) == Some(guide_id);
            if !continuing_conan {
                return Some(ExclusionReason::WorkedPreviousDay { date: prev });
            }
        }

        // 6. 后一天
        let next = date + Duration::days(1);
        if let Some(next_role) = ctx.role_on(guide_id, next) {
            let continuing_conan =
                day.day_type == DayType::ClosedFriday && next_role == Some(ShiftRole::Conan);
            if !continuing_conan {
                return Some(ExclusionReason::ScheduledNextDay { date: next });
            }
        }

        // 7. 当日
        if ctx.is_occupied(guide_id, date) {
            return Some(ExclusionReason::AlreadyAssigned);
        }

        // 8. no_weekends
        if day.day_type.is_weekend() && ctx.rules.forbids_weekends(guide_id) {
            return Some(ExclusionReason::NoWeekends);
        }

        // 9. 连续上班
        let limit = ctx.config.effective_max_consecutive_days();
        let (before, after) = ctx.streak_around(guide_id, date);
        let streak = before + 1 + after;
        if streak > limit {
            return Some(ExclusionReason::MaxConsecutiveDays { streak, limit });
        }

        None
    }

    /// 评分（不含扰动）
    ///
    /// score = w_total * total / 工作比例
    ///       + w_weekend * weekend
    ///       + w_conan * conan
    ///       + w_recency * (4 - d) / 3   （d = 距最近一次上班天数，d <= 3）
    pub fn score(&self, guide_id: i64, date: NaiveDate, ctx: &RunContext) -> f64 {
        let w = &ctx.config.weights;
        let stat = ctx.workload(guide_id);

        let mut score = w.total * f64::from(stat.total_shifts) / ctx.work_fraction(guide_id)
            + w.weekend * f64::from(stat.weekend_shifts)
            + w.conan * f64::from(stat.conan_shifts);

        if let Some(days) = ctx.days_since_recent_shift(guide_id, date, RECENCY_WINDOW_DAYS) {
            score += w.recency * (RECENCY_WINDOW_DAYS + 1 - days) as f64 / RECENCY_WINDOW_DAYS as f64;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::run_config::ScheduleRunConfig;
    use crate::domain::constraint::{FixedConstraint, OneOffConstraint, Vacation};
    use crate::domain::rule::{CoordinatorRule, RuleKind};
    use crate::domain::schedule::Assignment;
    use crate::domain::types::{StaffRole, VacationStatus};
    use crate::engine::context::ScheduleSnapshot;
    use crate::engine::tie_breaker::NoJitter;
    use std::collections::HashMap;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
    }

    fn guide(id: i64) -> Guide {
        Guide {
            id,
            name: format!("G{}", id),
            role: StaffRole::Guide,
            is_active: true,
            work_percent: 100.0,
        }
    }

    fn base_snapshot() -> ScheduleSnapshot {
        ScheduleSnapshot {
            year: 2025,
            month: 8,
            guides: vec![guide(1), guide(2)],
            one_off_constraints: vec![],
            fixed_constraints: vec![],
            vacations: vec![],
            rules: vec![],
            weekend_flags: HashMap::new(),
            existing: vec![],
        }
    }

    fn regular(day: u32) -> Day {
        Day {
            date: d(day),
            day_type: DayType::Regular,
        }
    }

    fn eval(snapshot: &ScheduleSnapshot, guide_id: i64, day: &Day) -> Availability {
        let ctx = RunContext::new(snapshot, &ScheduleRunConfig::default());
        AvailabilityEvaluator::new().evaluate(&guide(guide_id), day, &ctx, &mut NoJitter)
    }

    #[test]
    fn test_available_guide_has_score() {
        let a = eval(&base_snapshot(), 1, &regular(4));
        assert!(a.available);
        assert_eq!(a.score, Some(0.0));
        assert!(a.reasons.is_empty());
    }

    #[test]
    fn test_one_off_checked_before_vacation() {
        let mut s = base_snapshot();
        s.one_off_constraints.push(OneOffConstraint {
            id: 1,
            guide_id: 1,
            date: d(11),
            details: None,
        });
        s.vacations.push(Vacation {
            id: 1,
            guide_id: 1,
            date_start: d(10),
            date_end: d(12),
            status: VacationStatus::Approved,
            note: None,
        });
        let a = eval(&s, 1, &regular(11));
        assert!(!a.available);
        assert_eq!(a.reasons, vec![ExclusionReason::OneOffConstraint { date: d(11) }]);
        assert_eq!(a.score, None);

        let a = eval(&s, 1, &regular(12));
        assert_eq!(
            a.reasons,
            vec![ExclusionReason::ApprovedVacation {
                start: d(10),
                end: d(12)
            }]
        );
    }

    #[test]
    fn test_pending_vacation_does_not_exclude() {
        let mut s = base_snapshot();
        s.vacations.push(Vacation {
            id: 1,
            guide_id: 1,
            date_start: d(10),
            date_end: d(12),
            status: VacationStatus::Pending,
            note: None,
        });
        assert!(eval(&s, 1, &regular(11)).available);
    }

    #[test]
    fn test_fixed_weekday() {
        let mut s = base_snapshot();
        s.fixed_constraints.push(FixedConstraint {
            id: 1,
            guide_id: 2,
            weekday: 3,
            details: None,
        });
        // 2025-08-13 周三
        let a = eval(&s, 2, &regular(13));
        assert_eq!(a.reasons, vec![ExclusionReason::FixedWeekday { weekday: 3 }]);
        assert!(eval(&s, 2, &regular(14)).available);
    }

    #[test]
    fn test_rules() {
        let mut s = base_snapshot();
        s.rules.push(CoordinatorRule {
            id: 1,
            kind: RuleKind::NoAutoScheduling { guide_id: 1 },
            is_active: true,
            description: None,
        });
        s.rules.push(CoordinatorRule {
            id: 2,
            kind: RuleKind::NoWeekends { guide_id: 2 },
            is_active: true,
            description: None,
        });
        assert_eq!(eval(&s, 1, &regular(4)).reasons, vec![ExclusionReason::NoAutoScheduling]);

        let friday = Day {
            date: d(15),
            day_type: DayType::OpenFriday,
        };
        assert_eq!(eval(&s, 2, &friday).reasons, vec![ExclusionReason::NoWeekends]);
        assert!(eval(&s, 2, &regular(14)).available);
    }

    #[test]
    fn test_previous_and_next_day() {
        let mut s = base_snapshot();
        let day5 = regular(5);
        let mut row = Assignment::from_slots(&day5, &[(1, ShiftRole::Regular), (2, ShiftRole::Overlap)]);
        row.is_manual = true;
        row.is_locked = true;
        s.existing.push(row);

        assert_eq!(
            eval(&s, 1, &regular(6)).reasons,
            vec![ExclusionReason::WorkedPreviousDay { date: d(5) }]
        );
        assert_eq!(
            eval(&s, 1, &regular(4)).reasons,
            vec![ExclusionReason::ScheduledNextDay { date: d(5) }]
        );
        assert_eq!(eval(&s, 1, &day5).reasons, vec![ExclusionReason::AlreadyAssigned]);
    }

    #[test]
    fn test_closed_saturday_conan_continuation() {
        let s = base_snapshot();
        let mut ctx = RunContext::new(&s, &ScheduleRunConfig::default());
        let friday = Day {
            date: d(8),
            day_type: DayType::ClosedFriday,
        };
        let saturday = Day {
            date: d(9),
            day_type: DayType::ClosedSaturday,
        };
        ctx.commit(&friday, &[(1, ShiftRole::Conan)]);
        ctx.link_weekend(d(8), 1, false);

        let evaluator = AvailabilityEvaluator::new();
        // 链接 conan 不受“前一天已上班”限制
        assert!(evaluator.evaluate(&guide(1), &saturday, &ctx, &mut NoJitter).available);
        // 周六之后的周日仍受限制
        ctx.commit(&saturday, &[(1, ShiftRole::Conan)]);
        let sunday = regular(10);
        assert_eq!(
            evaluator.evaluate(&guide(1), &sunday, &ctx, &mut NoJitter).reasons,
            vec![ExclusionReason::WorkedPreviousDay { date: d(9) }]
        );
    }

    #[test]
    fn test_max_consecutive_days_applies_to_conan_continuation() {
        // 周六已锁定 conan=1；上限 1 时周五 + 周六共 2 天，超限
        let mut s = base_snapshot();
        s.weekend_flags.insert(d(8), true);
        let saturday = Day {
            date: d(9),
            day_type: DayType::ClosedSaturday,
        };
        let mut row = Assignment::from_slots(&saturday, &[(1, ShiftRole::Conan), (2, ShiftRole::Motzash)]);
        row.is_manual = true;
        row.is_locked = true;
        s.existing.push(row);

        let friday = Day {
            date: d(8),
            day_type: DayType::ClosedFriday,
        };
        let config = ScheduleRunConfig {
            max_consecutive_days: 1,
            ..Default::default()
        };
        let ctx = RunContext::new(&s, &config);
        let evaluator = AvailabilityEvaluator::new();
        let a = evaluator.evaluate(&guide(1), &friday, &ctx, &mut NoJitter);
        assert_eq!(
            a.reasons,
            vec![ExclusionReason::MaxConsecutiveDays { streak: 2, limit: 1 }]
        );

        // 默认上限 2 时可以接续
        let ctx = RunContext::new(&s, &ScheduleRunConfig::default());
        assert!(evaluator.evaluate(&guide(1), &friday, &ctx, &mut NoJitter).available);
    }

    #[test]
    fn test_score_prefers_fewer_shifts_and_part_timers_less() {
        let mut s = base_snapshot();
        s.guides[1].work_percent = 50.0;
        let mut ctx = RunContext::new(&s, &ScheduleRunConfig::default());
        ctx.commit(&regular(1), &[(1, ShiftRole::Regular), (2, ShiftRole::Overlap)]);

        let evaluator = AvailabilityEvaluator::new();
        let full = evaluator.score(1, d(20), &ctx);
        let part = evaluator.score(2, d(20), &ctx);
        assert!(part > full);

        // 3 日内刚上过班 → 额外惩罚
        assert!(evaluator.score(1, d(3), &ctx) > evaluator.score(1, d(20), &ctx));
    }
}
