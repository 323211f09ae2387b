// ==========================================
// 宿舍轮值排班系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod constraint_repo;
pub mod error;
pub mod guide_repo;
pub mod rule_repo;
pub mod schedule_draft_repo;
pub mod schedule_repo;
pub mod weekend_status_repo;

// 重导出核心仓储
pub use constraint_repo::ConstraintRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use guide_repo::GuideRepository;
pub use rule_repo::RuleRepository;
pub use schedule_draft_repo::{DraftSummary, ScheduleDraftRepository};
pub use schedule_repo::{month_bounds, ScheduleRepository};
pub use weekend_status_repo::{WeekendStatusEntity, WeekendStatusRepository};
