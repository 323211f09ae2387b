// ==========================================
// 宿舍轮值排班系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换 Repository / Engine 错误为用户友好的错误消息
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    /// 人工排班校验失败（带详细原因）
    #[error("人工排班校验失败: {reason}")]
    ManualAssignmentValidationError {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    // ==========================================
    // 引擎错误
    // ==========================================
    #[error("排班引擎失败: {0}")]
    EngineFailure(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::CorruptRow(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("引用了不存在的人员: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            e @ (RepositoryError::InvalidMonth { .. } | RepositoryError::OutsideMonth { .. }) => {
                ApiError::InvalidInput(e.to_string())
            }
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidMonth { year, month } => {
                ApiError::InvalidInput(format!("无效月份: {}-{}", year, month))
            }
            e @ EngineError::EmptyRoster { .. } => ApiError::EngineFailure(e.to_string()),
            EngineError::Config(msg) => ApiError::ConfigError(msg),
            EngineError::Repository(e) => ApiError::from(e),
            EngineError::Other(e) => ApiError::Other(e),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 校验违规详情
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidationViolation {
    /// 违规类型（DAY_TYPE / GUIDE_COUNT / ROLE / DUPLICATE_GUIDE / GUIDE / NO_CONAN）
    pub violation_type: String,
    /// 日期
    pub date: String,
    /// 违规原因
    pub reason: String,
    /// 额外信息（可选）
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_conversion() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "ScheduleDraft".to_string(),
            id: "aug".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("aug")));
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: ApiError = EngineError::InvalidMonth { year: 2025, month: 13 }.into();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err: ApiError = EngineError::Config("bad".to_string()).into();
        assert!(matches!(err, ApiError::ConfigError(_)));

        let err: ApiError = EngineError::Repository(RepositoryError::ForeignKeyViolation(
            "FOREIGN KEY constraint failed".to_string(),
        ))
        .into();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
