// ==========================================
// 宿舍轮值排班系统 - 运行快照与运行上下文
// ==========================================
// ScheduleSnapshot: 运行开始时一次性读取的不可变输入
// RunContext: 单次运行内的可变状态（占用表/工作量/周末链接/轮转游标）
// 红线: 排班循环内不做任何 I/O，“当日已排”只查内存占用表
// ==========================================

use crate::config::run_config::ScheduleRunConfig;
use crate::domain::constraint::{FixedConstraint, OneOffConstraint, Vacation};
use crate::domain::guide::Guide;
use crate::domain::rule::{CoordinatorRule, RuleBook};
use crate::domain::schedule::{Assignment, Day};
use crate::domain::types::{DayType, ShiftRole, VacationStatus};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ==========================================
// ScheduleSnapshot - 运行输入快照
// ==========================================
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub year: i32,
    pub month: u32,
    /// 参与排班的人员（在岗 + role=guide）
    pub guides: Vec<Guide>,
    pub one_off_constraints: Vec<OneOffConstraint>,
    pub fixed_constraints: Vec<FixedConstraint>,
    pub vacations: Vec<Vacation>,
    pub rules: Vec<CoordinatorRule>,
    /// 周五日期 → 是否封闭（需覆盖上月最后一个周五）
    pub weekend_flags: HashMap<NaiveDate, bool>,
    /// 已有排班：[月初 - 回看天数, 月末 + 1]
    pub existing: Vec<Assignment>,
}

// ==========================================
// WorkloadStat - 单人工作量（仅在本次运行内有效）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStat {
    pub total_shifts: u32,
    pub weekend_shifts: u32,
    pub conan_shifts: u32,
    pub last_shift_date: Option<NaiveDate>,
}

impl WorkloadStat {
    fn record(&mut self, date: NaiveDate, day_type: DayType, role: Option<ShiftRole>) {
        self.total_shifts += 1;
        if day_type.is_weekend() {
            self.weekend_shifts += 1;
        }
        if role == Some(ShiftRole::Conan) {
            self.conan_shifts += 1;
        }
        self.last_shift_date = Some(match self.last_shift_date {
            Some(prev) if prev > date => prev,
            _ => date,
        });
    }
}

// ==========================================
// WeekendLinks - 封闭周五 → conan
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendLinks {
    links: BTreeMap<NaiveDate, i64>,
}

impl WeekendLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, friday: NaiveDate, guide_id: i64) {
        self.links.insert(friday, guide_id);
    }

    pub fn get(&self, friday: NaiveDate) -> Option<i64> {
        self.links.get(&friday).copied()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, i64)> + '_ {
        self.links.iter().map(|(d, g)| (*d, *g))
    }
}

// ==========================================
// RunContext - 单次运行上下文
// ==========================================
pub struct RunContext {
    pub config: ScheduleRunConfig,
    pub rules: RuleBook,
    month_start: NaiveDate,
    month_end: NaiveDate,
    one_off: HashSet<(i64, NaiveDate)>,
    fixed: HashSet<(i64, u32)>,
    vacations: HashMap<i64, Vec<(NaiveDate, NaiveDate)>>,
    work_fraction: HashMap<i64, f64>,
    /// 日期 → 已占用 (人员, 角色)
    occupancy: HashMap<NaiveDate, Vec<(i64, Option<ShiftRole>)>>,
    workload: HashMap<i64, WorkloadStat>,
    /// 当月封闭周末 conan 计数（软上限用）
    month_conan: HashMap<i64, u32>,
    /// 锁定且需保留的当月记录
    preserved: HashMap<NaiveDate, Assignment>,
    links: WeekendLinks,
    /// 轮转游标：并列时的次序
    roster_order: Vec<i64>,
    cursor: usize,
}

impl RunContext {
    /// 从快照构建上下文
    ///
    /// # 初始化
    /// - 占用表: 历史 + 下月首日 + 保留的锁定行
    /// - 工作量: 历史 + 保留的锁定行
    /// - 当月 conan 计数: 保留的锁定封闭周五
    pub fn new(snapshot: &ScheduleSnapshot, config: &ScheduleRunConfig) -> Self {
        let month_start = NaiveDate::from_ymd_opt(snapshot.year, snapshot.month, 1)
            .unwrap_or(NaiveDate::MIN);
        let month_end = last_day_of_month(month_start);

        let mut vacations: HashMap<i64, Vec<(NaiveDate, NaiveDate)>> = HashMap::new();
        for v in snapshot
            .vacations
            .iter()
            .filter(|v| v.status == VacationStatus::Approved)
        {
            vacations
                .entry(v.guide_id)
                .or_default()
                .push((v.date_start, v.date_end));
        }

        let mut roster_order: Vec<i64> = snapshot.guides.iter().map(|g| g.id).collect();
        roster_order.sort_unstable();

        let mut ctx = Self {
            config: config.clone(),
            rules: RuleBook::from_rules(&snapshot.rules),
            month_start,
            month_end,
            one_off: snapshot
                .one_off_constraints
                .iter()
                .map(|c| (c.guide_id, c.date))
                .collect(),
            fixed: snapshot
                .fixed_constraints
                .iter()
                .map(|c| (c.guide_id, c.weekday))
                .collect(),
            vacations,
            work_fraction: snapshot
                .guides
                .iter()
                .map(|g| (g.id, g.work_fraction()))
                .collect(),
            occupancy: HashMap::new(),
            workload: snapshot
                .guides
                .iter()
                .map(|g| (g.id, WorkloadStat::default()))
                .collect(),
            month_conan: HashMap::new(),
            preserved: HashMap::new(),
            links: WeekendLinks::new(),
            roster_order,
            cursor: 0,
        };

        for row in &snapshot.existing {
            let in_month = row.date >= month_start && row.date <= month_end;
            if !in_month {
                ctx.occupy(row.date, &row.slots());
                if row.date < month_start {
                    ctx.record_workload(row);
                }
                continue;
            }
            if config.preserve_manual && row.is_preserved() {
                ctx.occupy(row.date, &row.slots());
                ctx.record_workload(row);
                if row.day_type == DayType::ClosedFriday {
                    if let Some(conan) = row.guide1_id {
                        *ctx.month_conan.entry(conan).or_insert(0) += 1;
                    }
                }
                ctx.preserved.insert(row.date, row.clone());
            }
        }

        ctx
    }

    fn occupy(&mut self, date: NaiveDate, slots: &[(i64, Option<ShiftRole>)]) {
        let entry = self.occupancy.entry(date).or_default();
        for &(guide_id, role) in slots {
            if !entry.iter().any(|(id, _)| *id == guide_id) {
                entry.push((guide_id, role));
            }
        }
    }

    fn record_workload(&mut self, row: &Assignment) {
        for (guide_id, role) in row.slots() {
            if let Some(stat) = self.workload.get_mut(&guide_id) {
                stat.record(row.date, row.day_type, role);
            }
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn month_start(&self) -> NaiveDate {
        self.month_start
    }

    pub fn month_end(&self) -> NaiveDate {
        self.month_end
    }

    pub fn has_one_off(&self, guide_id: i64, date: NaiveDate) -> bool {
        self.one_off.contains(&(guide_id, date))
    }

    pub fn has_fixed_weekday(&self, guide_id: i64, date: NaiveDate) -> bool {
        self.fixed
            .contains(&(guide_id, date.weekday().num_days_from_sunday()))
    }

    /// 命中的已批准休假区间
    pub fn approved_vacation(&self, guide_id: i64, date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        self.vacations
            .get(&guide_id)?
            .iter()
            .copied()
            .find(|(start, end)| *start <= date && date <= *end)
    }

    pub fn is_occupied(&self, guide_id: i64, date: NaiveDate) -> bool {
        self.role_on(guide_id, date).is_some()
    }

    /// 某人某日的占用角色（Some(None) = 占用但角色未知）
    pub fn role_on(&self, guide_id: i64, date: NaiveDate) -> Option<Option<ShiftRole>> {
        self.occupancy
            .get(&date)?
            .iter()
            .find(|(id, _)| *id == guide_id)
            .map(|(_, role)| *role)
    }

    /// 某日已占用的人员
    pub fn occupied_on(&self, date: NaiveDate) -> Vec<i64> {
        self.occupancy
            .get(&date)
            .map(|v| v.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    /// 以 date 为中心的连续上班天数（不含 date 自身）
    pub fn streak_around(&self, guide_id: i64, date: NaiveDate) -> (u32, u32) {
        let mut before = 0;
        let mut d = date - Duration::days(1);
        while self.is_occupied(guide_id, d) {
            before += 1;
            d -= Duration::days(1);
        }
        let mut after = 0;
        let mut d = date + Duration::days(1);
        while self.is_occupied(guide_id, d) {
            after += 1;
            d += Duration::days(1);
        }
        (before, after)
    }

    /// 最近一次上班距今天数（只看前 `window` 天）
    pub fn days_since_recent_shift(&self, guide_id: i64, date: NaiveDate, window: i64) -> Option<i64> {
        (1..=window).find(|&n| self.is_occupied(guide_id, date - Duration::days(n)))
    }

    pub fn workload(&self, guide_id: i64) -> WorkloadStat {
        self.workload.get(&guide_id).cloned().unwrap_or_default()
    }

    pub fn workloads(&self) -> &HashMap<i64, WorkloadStat> {
        &self.workload
    }

    pub fn work_fraction(&self, guide_id: i64) -> f64 {
        self.work_fraction.get(&guide_id).copied().unwrap_or(1.0)
    }

    pub fn month_conan_count(&self, guide_id: i64) -> u32 {
        self.month_conan.get(&guide_id).copied().unwrap_or(0)
    }

    /// 超过 conan 软上限时的附加惩罚
    pub fn conan_cap_penalty(&self, guide_id: i64) -> f64 {
        if self.month_conan_count(guide_id) >= self.config.max_conan_per_guide {
            self.config.weights.conan_cap_penalty
        } else {
            0.0
        }
    }

    pub fn preserved(&self, date: NaiveDate) -> Option<&Assignment> {
        self.preserved.get(&date)
    }

    pub fn links(&self) -> &WeekendLinks {
        &self.links
    }

    /// 周六对应的已链接 conan
    pub fn linked_conan_for_saturday(&self, saturday: NaiveDate) -> Option<i64> {
        self.links.get(saturday - Duration::days(1))
    }

    /// 并列时的轮转次序（越小越优先）
    pub fn rotation_rank(&self, guide_id: i64) -> usize {
        let n = self.roster_order.len();
        match self.roster_order.iter().position(|id| *id == guide_id) {
            Some(pos) if n > 0 => (pos + n - self.cursor % n) % n,
            _ => usize::MAX,
        }
    }

    // ==========================================
    // 变更
    // ==========================================

    /// 登记周末链接
    ///
    /// # 参数
    /// - reserve: 同时为 conan 预占周五/周六（周六不在本月或已锁定时跳过）
    pub fn link_weekend(&mut self, friday: NaiveDate, guide_id: i64, reserve: bool) {
        self.links.insert(friday, guide_id);
        // 锁定周五在构建上下文时已计数
        let in_month = friday >= self.month_start && friday <= self.month_end;
        if in_month && !self.preserved.contains_key(&friday) {
            *self.month_conan.entry(guide_id).or_insert(0) += 1;
        }
        if reserve {
            let saturday = friday + Duration::days(1);
            self.occupy(friday, &[(guide_id, Some(ShiftRole::Conan))]);
            if saturday <= self.month_end && !self.preserved.contains_key(&saturday) {
                self.occupy(saturday, &[(guide_id, Some(ShiftRole::Conan))]);
            }
        }
    }

    /// 提交单日结果: 更新占用表与工作量
    pub fn commit(&mut self, day: &Day, slots: &[(i64, ShiftRole)]) {
        let typed: Vec<(i64, Option<ShiftRole>)> =
            slots.iter().map(|&(id, role)| (id, Some(role))).collect();
        self.occupy(day.date, &typed);
        for &(guide_id, role) in slots {
            self.workload
                .entry(guide_id)
                .or_default()
                .record(day.date, day.day_type, Some(role));
        }
    }

    /// 每处理一天推进一次游标
    pub fn advance_cursor(&mut self) {
        if !self.roster_order.is_empty() {
            self.cursor = (self.cursor + 1) % self.roster_order.len();
        }
    }
}

/// 当月最后一天
pub fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(first)
}
