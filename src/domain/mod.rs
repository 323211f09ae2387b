// ==========================================
// 宿舍轮值排班系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、规则索引
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod constraint;
pub mod guide;
pub mod rule;
pub mod schedule;
pub mod types;

// 重导出核心类型
pub use constraint::{FixedConstraint, OneOffConstraint, Vacation};
pub use guide::Guide;
pub use rule::{CoordinatorRule, RuleBook, RuleKind};
pub use schedule::{Assignment, Day, ScheduleSummary, ScheduleWarning};
pub use types::{DayType, ShiftRole, StaffRole, VacationStatus, WarningKind};
