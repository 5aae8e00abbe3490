//! 共享上下文与错误类型
//!
//! 提供 handler 共享的项目根目录、配置存储与命令执行能力，
//! 以及统一的失败响应转换。

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::project::ConfigStore;
use crate::server::file_tree::TreeNode;
use crate::server::protocol::Reply;
use crate::server::runner::CommandRunner;

/// 进程级共享配置
pub type SharedConfig = Arc<RwLock<ConfigStore>>;

/// Handler 上下文 — 每个连接持有一份 clone
#[derive(Clone)]
pub struct HandlerContext {
    pub root: PathBuf,
    pub config: SharedConfig,
    pub runner: Arc<dyn CommandRunner>,
    pub server_address: String,
}

/// 统一应用错误类型 — 由调度层转换为失败响应
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Cannot access files outside the project root")]
    PathEscape { file_path: String },

    #[error("File operation failed")]
    File { file_path: String, reason: String },

    #[error("Missing {0} parameter")]
    MissingArgument(&'static str),

    #[error("Git operations are disabled in mo.config.json")]
    GitDisabled,

    #[error("Command execution is disabled in mo.config.json")]
    CommandDisabled,

    #[error("No pending changes to commit")]
    NoPendingChanges,

    #[error("Git commit failed")]
    CommitFailed(String),

    #[error("Rollback failed")]
    RollbackFailed(String),

    #[error("Command execution failed")]
    CommandFailed(String),

    #[error("Failed to refresh file tree")]
    TreeBuild(String),

    #[error("No files or directories found matching the include patterns")]
    EmptyTree,

    #[error("Failed to update project configuration")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 底层错误详情（放入响应的 `error` 字段）
    pub fn detail(&self) -> Option<&str> {
        match self {
            AppError::File { reason, .. } => Some(reason),
            AppError::CommitFailed(e)
            | AppError::RollbackFailed(e)
            | AppError::CommandFailed(e)
            | AppError::TreeBuild(e)
            | AppError::Config(e) => Some(e),
            _ => None,
        }
    }

    /// 转换为失败响应
    pub fn to_reply(&self) -> Reply {
        let mut reply = Reply::fail(self.to_string());
        if let Some(detail) = self.detail() {
            reply = reply.with_error(detail);
        }
        match self {
            AppError::PathEscape { file_path } | AppError::File { file_path, .. } => {
                reply.with_file_path(file_path.clone())
            }
            AppError::EmptyTree => reply.with_tree(Vec::<TreeNode>::new()),
            _ => reply,
        }
    }
}

/// 从 tokio JoinError 转换
impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task failed: {}", e))
    }
}
