use tracing::{error, info, warn};

use crate::server::context::{AppError, HandlerContext};
use crate::server::file_api::{self, FileApiError};
use crate::server::file_tree::{self, TreeNode};
use crate::server::protocol::Reply;
use crate::server::session::Session;

/// Rebuild the snapshot from disk with the current include/ignore lists
pub async fn build_tree(ctx: &HandlerContext) -> Result<Vec<TreeNode>, String> {
    let (include, ignore) = {
        let store = ctx.config.read().await;
        let config = store.config();
        (config.include_patterns.clone(), config.ignore_patterns.clone())
    };
    let root = ctx.root.clone();

    tokio::task::spawn_blocking(move || file_tree::build(&root, &include, &ignore))
        .await
        .map_err(|e| format!("Task failed: {}", e))?
        .map_err(|e| e.to_string())
}

/// writeFile：路径校验 → 去除反引号 → 写入并回读 → 记录待提交变更 → 刷新目录树
pub async fn write_file(
    file_path: Option<String>,
    content: Option<String>,
    session: &mut Session,
    ctx: &HandlerContext,
) -> Result<Reply, AppError> {
    let file_path = file_path
        .filter(|p| !p.is_empty())
        .ok_or(AppError::MissingArgument("filePath"))?;
    let content = content.ok_or(AppError::MissingArgument("content"))?;

    let cleaned = file_api::strip_backtick_fence(&content).to_string();
    let root = ctx.root.clone();
    let target = file_path.clone();
    let written = tokio::task::spawn_blocking(move || file_api::write_file(&root, &target, &cleaned))
        .await?;

    let written = match written {
        Ok(content) => content,
        Err(FileApiError::PathEscape) => {
            warn!("Rejected write outside project root: {}", file_path);
            return Err(AppError::PathEscape { file_path });
        }
        Err(e) => {
            error!("File operation failed: {}: {}", file_path, e);
            return Err(AppError::File {
                file_path,
                reason: e.to_string(),
            });
        }
    };

    session.record_change(file_path.clone(), written.clone());

    let tree = build_tree(ctx).await.map_err(|reason| {
        error!("File written but tree rebuild failed: {}: {}", file_path, reason);
        AppError::File {
            file_path: file_path.clone(),
            reason,
        }
    })?;
    session.set_tree(tree.clone());

    info!("File modified successfully: {}", file_path);
    Ok(Reply::ok("File modified successfully")
        .with_content(written)
        .with_file_path(file_path)
        .with_tree(tree))
}

/// refreshFileTree：空结果按失败上报
pub async fn refresh_file_tree(
    session: &mut Session,
    ctx: &HandlerContext,
) -> Result<Reply, AppError> {
    let tree = build_tree(ctx).await.map_err(|e| {
        error!("Failed to refresh file tree: {}", e);
        AppError::TreeBuild(e)
    })?;
    session.set_tree(tree.clone());

    if tree.is_empty() {
        warn!("No files or directories found matching the include patterns");
        return Err(AppError::EmptyTree);
    }

    info!("File tree refreshed successfully");
    Ok(Reply::ok("File tree refreshed successfully").with_tree(tree))
}
