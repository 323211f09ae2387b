// ==========================================
// 宿舍轮值排班系统 - 引擎层
// ==========================================
// 职责: 实现排班规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 排除必须输出 reason
// ==========================================

pub mod assembler;
pub mod availability;
pub mod calendar;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod repositories;
pub mod selector;
pub mod tie_breaker;
pub mod weekend_linker;

// 重导出核心引擎
pub use assembler::{DayOutcome, ScheduleAssembler, ScheduleResult};
pub use availability::{Availability, AvailabilityEvaluator, ExclusionReason};
pub use calendar::CalendarClassifier;
pub use context::{RunContext, ScheduleSnapshot, WeekendLinks, WorkloadStat};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{ScheduleOrchestrator, ScheduleRunReport, ScheduleRunRequest};
pub use repositories::ScheduleRepositories;
pub use selector::{Candidate, GuideSelector};
pub use tie_breaker::{NoJitter, SeededTieBreaker, TieBreaker};
pub use weekend_linker::WeekendLinker;
