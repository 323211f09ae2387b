// ==========================================
// 宿舍轮值排班系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 月度自动排班引擎 (协调员保留最终修改权)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排班规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DayType, ShiftRole, StaffRole, VacationStatus, WarningKind};

// 领域实体
pub use domain::{
    Assignment, CoordinatorRule, Day, FixedConstraint, Guide, OneOffConstraint, RuleBook,
    RuleKind, ScheduleSummary, ScheduleWarning, Vacation,
};

// 引擎
pub use engine::{
    AvailabilityEvaluator, CalendarClassifier, GuideSelector, ScheduleAssembler,
    ScheduleOrchestrator, ScheduleResult, ScheduleRunReport, ScheduleRunRequest, WeekendLinker,
};

// API
pub use api::{ApiError, ApiResult, ManualAssignmentRequest, ManualAssignmentValidator, ScheduleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "宿舍轮值排班系统";

// 数据库版本
pub const DB_VERSION: &str = "v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(db::CURRENT_SCHEMA_VERSION, 1);
    }
}
