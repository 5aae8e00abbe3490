use tracing::{error, info};

use crate::project::MoConfig;
use crate::server::context::{AppError, HandlerContext};
use crate::server::protocol::Reply;

/// 在阻塞线程上写入配置文件，成功后替换内存中的配置。
///
/// 写锁贯穿整个过程，并发的修改按顺序落盘。
async fn persist<F>(ctx: &HandlerContext, f: F) -> Result<(), AppError>
where
    F: FnOnce(&mut MoConfig) + Send + 'static,
{
    let mut store = ctx.config.write().await;
    let mut staged = store.clone();
    let staged = tokio::task::spawn_blocking(move || staged.update(f).map(|()| staged))
        .await?
        .map_err(|e| AppError::Config(e.to_string()))?;
    *store = staged;
    Ok(())
}

/// initializationComplete：成功时不回复，仅持久化
pub async fn initialization_complete(ctx: &HandlerContext) -> Result<Option<Reply>, AppError> {
    persist(ctx, |config| config.is_initialized = true)
        .await
        .inspect_err(|e| error!("Failed to update project initialization status: {:?}", e))?;

    info!("Project initialization status updated");
    Ok(None)
}

/// sendAppId：写入 appId 并标记已初始化
pub async fn send_app_id(app_id: Option<String>, ctx: &HandlerContext) -> Result<Reply, AppError> {
    let app_id = app_id.unwrap_or_default();
    persist(ctx, move |config| {
        config.app_id = app_id;
        config.is_initialized = true;
    })
    .await
    .inspect_err(|e| error!("Failed to write appId to config: {:?}", e))?;

    info!("Project initialization marked as complete, appId written to config");
    Ok(Reply::ok(
        "Project initialization marked as complete, appId written to config",
    ))
}
