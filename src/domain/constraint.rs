// ==========================================
// 宿舍轮值排班系统 - 不可用约束领域模型
// ==========================================
// 一次性约束 / 每周固定约束 / 休假
// ==========================================

use crate::domain::types::VacationStatus;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ==========================================
// OneOffConstraint - 一次性约束（指定日期不可排）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOffConstraint {
    pub id: i64,
    pub guide_id: i64,
    pub date: NaiveDate,
    pub details: Option<String>,
}

// ==========================================
// FixedConstraint - 每周固定约束
// ==========================================
// weekday: 0=周日 ... 6=周六
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedConstraint {
    pub id: i64,
    pub guide_id: i64,
    pub weekday: u32,
    pub details: Option<String>,
}

impl FixedConstraint {
    /// 是否命中该日期的星期
    pub fn matches(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_sunday() == self.weekday
    }
}

// ==========================================
// Vacation - 休假申请
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacation {
    pub id: i64,
    pub guide_id: i64,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub status: VacationStatus,
    pub note: Option<String>,
}

impl Vacation {
    /// 已批准且覆盖该日期（含首尾）
    pub fn blocks(&self, date: NaiveDate) -> bool {
        self.status == VacationStatus::Approved && self.date_start <= date && date <= self.date_end
    }
}
