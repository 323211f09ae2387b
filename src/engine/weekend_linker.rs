// ==========================================
// 宿舍轮值排班系统 - 周末链接预处理
// ==========================================
// 在主流程之前遍历所有封闭周五，预先选出 conan，
// 使随后的封闭周六可以延续同一人。
// ==========================================
// 规则:
// 1) 周五已锁定 → 锁定行的 guide1 即为链接对象
// 2) 周六已锁定 conan 且其周五可到岗 → 直接由其担任
// 3) 否则评估全部人员，取分数最低者
//    - no_conan 规则的人员不参与
//    - 周六须满足日历类硬约束（约束/休假/no_weekends），周日不得已有排班
//    - 当月 conan 次数达到上限 → 加大惩罚（不硬排除）
// 4) 无人可用 → 不登记，周六按“未链接”处理
// 5) 当月 1 日为封闭周六 → 从上月最后一个周五的历史记录取链接
// ==========================================

use crate::domain::schedule::Day;
use crate::domain::types::{DayType, ShiftRole};
use crate::engine::availability::AvailabilityEvaluator;
use crate::engine::context::{RunContext, ScheduleSnapshot, WeekendLinks};
use crate::engine::selector::{Candidate, GuideSelector};
use crate::engine::tie_breaker::TieBreaker;
use chrono::Duration;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

// ==========================================
// WeekendLinker - 周末链接器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct WeekendLinker {
    evaluator: AvailabilityEvaluator,
    selector: GuideSelector,
}

impl WeekendLinker {
    pub fn new() -> Self {
        Self {
            evaluator: AvailabilityEvaluator::new(),
            selector: GuideSelector::new(),
        }
    }

    /// 预处理全部封闭周五，结果同时写入 ctx
    #[instrument(skip_all, fields(days_count = days.len()))]
    pub fn link(
        &self,
        days: &[Day],
        snapshot: &ScheduleSnapshot,
        ctx: &mut RunContext,
        tie: &mut dyn TieBreaker,
    ) -> WeekendLinks {
        // 当月首日为封闭周六: 链接来自上月历史
        if let Some(first) = days.first() {
            if first.day_type == DayType::ClosedSaturday {
                let friday = first.date - Duration::days(1);
                let history = snapshot
                    .existing
                    .iter()
                    .find(|a| a.date == friday)
                    .and_then(|a| a.guide1_id);
                match history {
                    Some(conan) => {
                        debug!(friday = %friday, guide_id = conan, "沿用上月周五 conan");
                        ctx.link_weekend(friday, conan, false);
                    }
                    None => warn!(friday = %friday, "上月封闭周五无排班记录，本月首日周六无法链接"),
                }
            }
        }

        let mut pending: HashMap<i64, u32> = HashMap::new();
        for friday in days.iter().filter(|d| d.day_type == DayType::ClosedFriday) {
            if let Some(row) = ctx.preserved(friday.date) {
                match row.guide1_id {
                    Some(conan) => {
                        debug!(friday = %friday.date, guide_id = conan, "锁定周五，沿用 guide1");
                        ctx.link_weekend(friday.date, conan, true);
                    }
                    None => warn!(friday = %friday.date, "锁定周五无 guide1，无法链接"),
                }
                continue;
            }

            match self.pick_conan(friday, snapshot, ctx, tie, &pending) {
                Some(conan) => {
                    debug!(friday = %friday.date, guide_id = conan, "预选 conan");
                    ctx.link_weekend(friday.date, conan, true);
                    *pending.entry(conan).or_insert(0) += 1;
                }
                None => warn!(friday = %friday.date, "封闭周五无可用 conan"),
            }
        }

        info!(links_count = ctx.links().len(), "周末链接预处理完成");
        ctx.links().clone()
    }

    /// 为封闭周五选出 conan（不修改 ctx）
    ///
    /// # 参数
    /// - pending: 本轮已预选的次数，按两天班次计入评分
    pub(crate) fn pick_conan(
        &self,
        friday: &Day,
        snapshot: &ScheduleSnapshot,
        ctx: &RunContext,
        tie: &mut dyn TieBreaker,
        pending: &HashMap<i64, u32>,
    ) -> Option<i64> {
        let saturday = Day {
            date: friday.date + Duration::days(1),
            day_type: DayType::ClosedSaturday,
        };
        let sunday = saturday.date + Duration::days(1);
        let saturday_in_month = saturday.date <= ctx.month_end();
        let locked_saturday = ctx.preserved(saturday.date);
        let w = &ctx.config.weights;

        let mut candidates = Vec::new();
        for guide in &snapshot.guides {
            if ctx.rules.forbids_conan(guide.id) {
                continue;
            }
            let availability = self.evaluator.evaluate(guide, friday, ctx, tie);
            let Some(mut score) = availability.score else {
                continue;
            };

            if saturday_in_month {
                match locked_saturday {
                    Some(row) => {
                        // 周六已锁定 conan 且周五可到岗: 直接由其接续
                        if row.guide1_id == Some(guide.id)
                            && row.guide1_role == Some(ShiftRole::Conan)
                        {
                            debug!(friday = %friday.date, guide_id = guide.id, "周六已锁定 conan，周五由其担任");
                            return Some(guide.id);
                        }
                        if row.contains(guide.id) {
                            continue;
                        }
                    }
                    None => {
                        if self
                            .evaluator
                            .calendar_exclusion(guide.id, &saturday, ctx)
                            .is_some()
                            || ctx.is_occupied(guide.id, saturday.date)
                            || ctx.is_occupied(guide.id, sunday)
                        {
                            continue;
                        }
                    }
                }
            }

            let projected = f64::from(pending.get(&guide.id).copied().unwrap_or(0));
            score += projected
                * 2.0
                * (w.total / ctx.work_fraction(guide.id) + w.weekend + w.conan);
            score += ctx.conan_cap_penalty(guide.id);

            candidates.push(Candidate {
                guide_id: guide.id,
                score,
                rank: ctx.rotation_rank(guide.id),
            });
        }

        self.selector
            .select(candidates, 1, &[], &ctx.rules)
            .first()
            .map(|c| c.guide_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::run_config::ScheduleRunConfig;
    use crate::domain::guide::Guide;
    use crate::domain::rule::{CoordinatorRule, RuleKind};
    use crate::domain::schedule::Assignment;
    use crate::domain::types::StaffRole;
    use crate::engine::calendar::CalendarClassifier;
    use crate::engine::tie_breaker::NoJitter;
    use chrono::NaiveDate;

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

    fn snapshot(closed: &[u32]) -> ScheduleSnapshot {
        ScheduleSnapshot {
            year: 2025,
            month: 8,
            guides: (1..=4).map(guide).collect(),
            one_off_constraints: vec![],
            fixed_constraints: vec![],
            vacations: vec![],
            rules: vec![],
            weekend_flags: closed.iter().map(|&day| (d(day), true)).collect(),
            existing: vec![],
        }
    }

    fn run(snapshot: &ScheduleSnapshot, config: &ScheduleRunConfig) -> (WeekendLinks, RunContext) {
        let days = CalendarClassifier::new()
            .month_days(snapshot.year, snapshot.month, &snapshot.weekend_flags)
            .unwrap();
        let mut ctx = RunContext::new(snapshot, config);
        let links = WeekendLinker::new().link(&days, snapshot, &mut ctx, &mut NoJitter);
        (links, ctx)
    }

    #[test]
    fn test_links_every_closed_friday() {
        let s = snapshot(&[8, 22]);
        let (links, ctx) = run(&s, &ScheduleRunConfig::default());
        assert_eq!(links.len(), 2);
        let first = links.get(d(8)).unwrap();
        let second = links.get(d(22)).unwrap();
        // 预选计入评分，两个周末由不同的人担任
        assert_ne!(first, second);
        assert!(ctx.is_occupied(first, d(9)));
    }

    #[test]
    fn test_no_conan_rule_respected() {
        let mut s = snapshot(&[8]);
        for id in 1..=3 {
            s.rules.push(CoordinatorRule {
                id,
                kind: RuleKind::NoConan { guide_id: id },
                is_active: true,
                description: None,
            });
        }
        let (links, _) = run(&s, &ScheduleRunConfig::default());
        assert_eq!(links.get(d(8)), Some(4));
    }

    #[test]
    fn test_nobody_available_leaves_friday_unlinked() {
        let mut s = snapshot(&[8]);
        s.rules = (1..=4)
            .map(|id| CoordinatorRule {
                id,
                kind: RuleKind::NoConan { guide_id: id },
                is_active: true,
                description: None,
            })
            .collect();
        let (links, _) = run(&s, &ScheduleRunConfig::default());
        assert!(links.is_empty());
    }

    #[test]
    fn test_locked_friday_is_link_target() {
        let mut s = snapshot(&[8]);
        let friday = Day {
            date: d(8),
            day_type: DayType::ClosedFriday,
        };
        let mut row = Assignment::from_slots(&friday, &[(3, ShiftRole::Conan)]);
        row.is_manual = true;
        row.is_locked = true;
        s.existing.push(row);

        let (links, _) = run(&s, &ScheduleRunConfig::default());
        assert_eq!(links.get(d(8)), Some(3));
    }

    #[test]
    fn test_locked_saturday_conan_takes_friday() {
        let mut s = snapshot(&[8]);
        let saturday = Day {
            date: d(9),
            day_type: DayType::ClosedSaturday,
        };
        let mut row = Assignment::from_slots(&saturday, &[(3, ShiftRole::Conan), (4, ShiftRole::Motzash)]);
        row.is_manual = true;
        row.is_locked = true;
        s.existing.push(row);

        let (links, ctx) = run(&s, &ScheduleRunConfig::default());
        assert_eq!(links.get(d(8)), Some(3), "锁定周六的 conan 应接管周五");
        assert_eq!(ctx.role_on(3, d(8)), Some(Some(ShiftRole::Conan)));
    }

    #[test]
    fn test_conan_cap_penalty_spreads_weekends() {
        // 5 个封闭周五，2 人可选，上限 1 → 交替担任
        let mut s = snapshot(&[1, 8, 15, 22, 29]);
        s.guides.truncate(2);
        let config = ScheduleRunConfig {
            max_conan_per_guide: 1,
            ..Default::default()
        };
        let (links, _) = run(&s, &config);
        let counts = links.iter().fold(HashMap::new(), |mut acc, (_, g)| {
            *acc.entry(g).or_insert(0) += 1;
            acc
        });
        assert!(counts.values().all(|&n| n <= 3));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_first_of_month_saturday_uses_history() {
        // 2025-11-01 周六，2025-10-31 周五封闭
        let friday = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let mut s = snapshot(&[]);
        s.month = 11;
        s.weekend_flags.insert(friday, true);
        let day = Day {
            date: friday,
            day_type: DayType::ClosedFriday,
        };
        s.existing.push(Assignment::from_slots(&day, &[(2, ShiftRole::Conan)]));

        let (links, _) = run(&s, &ScheduleRunConfig::default());
        assert_eq!(links.get(friday), Some(2));
    }
}
