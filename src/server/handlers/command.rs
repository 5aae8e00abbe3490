use tracing::{error, info, warn};

use crate::server::context::{AppError, HandlerContext};
use crate::server::protocol::Reply;

/// executeCommand
pub async fn execute_command(
    command: Option<String>,
    ctx: &HandlerContext,
) -> Result<Reply, AppError> {
    if !ctx.config.read().await.config().command_exec_enabled {
        warn!("Command execution is disabled in mo.config.json");
        return Err(AppError::CommandDisabled);
    }

    let command = command.filter(|c| !c.is_empty()).ok_or_else(|| {
        warn!("Missing command parameter");
        AppError::MissingArgument("command")
    })?;

    match ctx.runner.run_shell(&command).await {
        Ok(output) => {
            info!("Command executed successfully: {}", command);
            Ok(Reply::ok("Command executed successfully").with_output(output))
        }
        Err(e) => {
            error!("Command execution failed: {}: {}", command, e);
            Err(AppError::CommandFailed(e.to_string()))
        }
    }
}
