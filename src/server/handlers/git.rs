use tracing::{error, info, warn};

use crate::server::context::{AppError, HandlerContext};
use crate::server::protocol::Reply;
use crate::server::session::Session;

async fn ensure_git_enabled(ctx: &HandlerContext) -> Result<(), AppError> {
    if ctx.config.read().await.config().git_enabled {
        Ok(())
    } else {
        warn!("Git operations are disabled in mo.config.json");
        Err(AppError::GitDisabled)
    }
}

/// commitChanges：开关 → 待提交变更 → 摘要 → 提交，成功后清空待提交列表
pub async fn commit_changes(
    summary: Option<String>,
    session: &mut Session,
    ctx: &HandlerContext,
) -> Result<Reply, AppError> {
    ensure_git_enabled(ctx).await?;

    if !session.has_pending_changes() {
        warn!("No pending changes to commit");
        return Err(AppError::NoPendingChanges);
    }

    let summary = summary.filter(|s| !s.is_empty()).ok_or_else(|| {
        warn!("Missing commit summary");
        AppError::MissingArgument("summary")
    })?;

    ctx.runner.commit(&summary).await.map_err(|e| {
        error!("Git commit failed: {}", e);
        AppError::CommitFailed(e.to_string())
    })?;

    let committed = session.clear_pending();
    info!("All changes committed to Git ({} writes)", committed);
    Ok(Reply::ok("All changes committed to Git").with_summary(summary))
}

/// rollback：丢弃最近一次提交，不影响待提交列表
pub async fn rollback(ctx: &HandlerContext) -> Result<Reply, AppError> {
    ensure_git_enabled(ctx).await?;

    ctx.runner.rollback().await.map_err(|e| {
        error!("Rollback failed: {}", e);
        AppError::RollbackFailed(e.to_string())
    })?;

    info!("Successfully rolled back to the previous commit");
    Ok(Reply::ok("Successfully rolled back to the previous commit"))
}
