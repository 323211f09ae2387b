// ==========================================
// 宿舍轮值排班系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行/上层应用调用
// ==========================================

pub mod error;
pub mod schedule_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ValidationViolation};
pub use schedule_api::{ManualAssignmentRequest, ScheduleApi};
pub use validator::{ManualAssignmentValidator, ValidationContext};
