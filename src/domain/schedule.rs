// ==========================================
// 宿舍轮值排班系统 - 排班结果领域模型
// ==========================================
// Day / Assignment / ScheduleWarning / ScheduleSummary
// ==========================================

use crate::domain::types::{DayType, ShiftRole, WarningKind};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ==========================================
// Day - 目标月份中的一天（运行期间不可变）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    pub day_type: DayType,
}

impl Day {
    /// 星期索引（0=周日 ... 6=周六）
    pub fn weekday_index(&self) -> u32 {
        self.date.weekday().num_days_from_sunday()
    }
}

// ==========================================
// Assignment - 单日排班记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub date: NaiveDate,
    pub weekday: u32, // 0=周日 ... 6=周六
    pub day_type: DayType,
    pub guide1_id: Option<i64>,
    pub guide1_role: Option<ShiftRole>,
    pub guide2_id: Option<i64>,
    pub guide2_role: Option<ShiftRole>,
    pub is_manual: bool,
    pub is_locked: bool,
}

impl Assignment {
    /// 构造空记录（无人）
    pub fn empty(day: &Day) -> Self {
        Self {
            date: day.date,
            weekday: day.weekday_index(),
            day_type: day.day_type,
            guide1_id: None,
            guide1_role: None,
            guide2_id: None,
            guide2_role: None,
            is_manual: false,
            is_locked: false,
        }
    }

    /// 由引擎选出的 (guide, role) 列表构造
    pub fn from_slots(day: &Day, slots: &[(i64, ShiftRole)]) -> Self {
        let mut assignment = Self::empty(day);
        if let Some(&(id, role)) = slots.first() {
            assignment.guide1_id = Some(id);
            assignment.guide1_role = Some(role);
        }
        if let Some(&(id, role)) = slots.get(1) {
            assignment.guide2_id = Some(id);
            assignment.guide2_role = Some(role);
        }
        assignment
    }

    /// 已排人员
    pub fn guide_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.guide1_id.into_iter().chain(self.guide2_id)
    }

    /// (人员, 角色) 对
    pub fn slots(&self) -> Vec<(i64, Option<ShiftRole>)> {
        let mut slots = Vec::with_capacity(2);
        if let Some(id) = self.guide1_id {
            slots.push((id, self.guide1_role));
        }
        if let Some(id) = self.guide2_id {
            slots.push((id, self.guide2_role));
        }
        slots
    }

    pub fn guide_count(&self) -> usize {
        self.guide_ids().count()
    }

    pub fn contains(&self, guide_id: i64) -> bool {
        self.guide_ids().any(|id| id == guide_id)
    }

    /// 是否已锁定（锁定行对自动排班不可变，无论 is_manual）
    pub fn is_preserved(&self) -> bool {
        self.is_locked
    }
}

// ==========================================
// ScheduleWarning - 排班告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWarning {
    pub date: NaiveDate,
    pub kind: WarningKind,
    pub message: String,
}

// ==========================================
// ScheduleSummary - 月度汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub assigned_count: usize,  // 至少排了一人的天数
    pub total_days: usize,      // 当月天数
    pub shortfall_days: usize,  // 人数不足的天数
    pub workload_min: usize,    // 人均班次最小值
    pub workload_max: usize,    // 人均班次最大值
    pub workload_avg: f64,      // 人均班次平均值
}
