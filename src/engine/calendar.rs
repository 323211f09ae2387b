// ==========================================
// 宿舍轮值排班系统 - 日历与周末分类
// ==========================================
// 纯函数: (year, month, 周五封闭标记) → 当月每日 Day
// 周六的分类取决于前一天（周五）的标记，而非自身
// ==========================================

use crate::domain::schedule::Day;
use crate::domain::types::DayType;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashMap;

// ==========================================
// CalendarClassifier - 日历分类器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct CalendarClassifier;

impl CalendarClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 分类单日
    ///
    /// # 参数
    /// - flags: 周五日期 → 是否封闭（缺省 = 开放）
    pub fn classify(date: NaiveDate, flags: &HashMap<NaiveDate, bool>) -> DayType {
        let closed = |friday: NaiveDate| flags.get(&friday).copied().unwrap_or(false);
        match date.weekday() {
            Weekday::Fri => {
                if closed(date) {
                    DayType::ClosedFriday
                } else {
                    DayType::OpenFriday
                }
            }
            Weekday::Sat => {
                if closed(date - Duration::days(1)) {
                    DayType::ClosedSaturday
                } else {
                    DayType::OpenSaturday
                }
            }
            _ => DayType::Regular,
        }
    }

    /// 枚举并分类整月（按日期升序）
    ///
    /// # 错误
    /// - InvalidMonth: month 不在 1..=12 或年份越界
    pub fn month_days(
        &self,
        year: i32,
        month: u32,
        flags: &HashMap<NaiveDate, bool>,
    ) -> EngineResult<Vec<Day>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(EngineError::InvalidMonth { year, month })?;

        let mut days = Vec::with_capacity(31);
        let mut date = first;
        while date.month() == month {
            days.push(Day {
                date,
                day_type: Self::classify(date, flags),
            });
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_days_count_and_order() {
        let days = CalendarClassifier::new()
            .month_days(2025, 8, &HashMap::new())
            .unwrap();
        assert_eq!(days.len(), 31);
        assert!(days.windows(2).all(|w| w[0].date < w[1].date));

        let feb = CalendarClassifier::new()
            .month_days(2024, 2, &HashMap::new())
            .unwrap();
        assert_eq!(feb.len(), 29);
    }

    #[test]
    fn test_closed_friday_drives_saturday() {
        let mut flags = HashMap::new();
        flags.insert(d(2025, 8, 8), true);
        // 周六自身的标记不参与分类
        flags.insert(d(2025, 8, 16), true);

        let days = CalendarClassifier::new().month_days(2025, 8, &flags).unwrap();
        let by_date = |n: u32| days[(n - 1) as usize].day_type;

        assert_eq!(by_date(8), DayType::ClosedFriday);
        assert_eq!(by_date(9), DayType::ClosedSaturday);
        assert_eq!(by_date(15), DayType::OpenFriday);
        assert_eq!(by_date(16), DayType::OpenSaturday);
        assert_eq!(by_date(10), DayType::Regular);
    }

    #[test]
    fn test_saturday_on_first_uses_previous_month_friday() {
        // 2025-11-01 是周六，前一天 2025-10-31 是周五
        let mut flags = HashMap::new();
        flags.insert(d(2025, 10, 31), true);
        let days = CalendarClassifier::new().month_days(2025, 11, &flags).unwrap();
        assert_eq!(days[0].day_type, DayType::ClosedSaturday);
    }

    #[test]
    fn test_invalid_month() {
        let err = CalendarClassifier::new()
            .month_days(2025, 13, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidMonth { month: 13, .. }));
    }
}
