// ==========================================
// 宿舍轮值排班系统 - 引擎层错误类型
// ==========================================
// 只有“运行前”的致命错误才会中断一次排班：
// 无效月份 / 空人员名单 / 配置不可读 / 仓储失败。
// 单日排不满不是错误，以告警形式返回。
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("无效月份: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("人员名单为空: {year}-{month:02} 没有可排班的在岗指导员")]
    EmptyRoster { year: i32, month: u32 },

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
