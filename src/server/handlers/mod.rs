// handlers module - Action dispatch for agent messages
// Contains handlers for file, git, command and settings actions

pub mod command;
pub mod file;
pub mod git;
pub mod settings;

use tracing::{debug, error};

use crate::server::context::{AppError, HandlerContext};
use crate::server::protocol::{ClientMessage, Reply, ServerMessage, Snapshot};
use crate::server::session::Session;

/// Build the first frame of a connection and cache its tree in `session`.
///
/// A failed build is reported as `{success: false, message}`; the
/// connection keeps being served afterwards.
pub async fn initial_snapshot(session: &mut Session, ctx: &HandlerContext) -> ServerMessage {
    match file::build_tree(ctx).await {
        Ok(tree) => {
            session.set_tree(tree.clone());
            let store = ctx.config.read().await;
            let config = store.config();
            Snapshot {
                is_initialized: config.is_initialized,
                directory_structure: tree,
                server_address: ctx.server_address.clone(),
                agent_type: config.agent_type.clone(),
                start_url: config.start_url.clone(),
                success: true,
                setting: config.setting.clone(),
            }
            .into()
        }
        Err(e) => {
            error!("Error getting directory structure: {}", e);
            Reply::fail(e).into()
        }
    }
}

/// Run one action to completion.
///
/// Returns the reply to send, or `None` when the action produces no reply
/// (unknown actions, a successful `initializationComplete`).
pub async fn dispatch(
    msg: ClientMessage,
    session: &mut Session,
    ctx: &HandlerContext,
) -> Option<Reply> {
    debug!("Dispatching action {}", msg.action_name());

    let result: Result<Option<Reply>, AppError> = match msg {
        ClientMessage::WriteFile { file_path, content } => {
            file::write_file(file_path, content, session, ctx).await.map(Some)
        }
        ClientMessage::CommitChanges { summary } => {
            git::commit_changes(summary, session, ctx).await.map(Some)
        }
        ClientMessage::Rollback => git::rollback(ctx).await.map(Some),
        ClientMessage::ExecuteCommand { command } => {
            command::execute_command(command, ctx).await.map(Some)
        }
        ClientMessage::RefreshFileTree => file::refresh_file_tree(session, ctx).await.map(Some),
        ClientMessage::InitializationComplete => settings::initialization_complete(ctx).await,
        ClientMessage::SendAppId { app_id } => settings::send_app_id(app_id, ctx).await.map(Some),
        ClientMessage::Unknown => {
            debug!("Ignoring unknown action");
            return None;
        }
    };

    match result {
        Ok(reply) => reply,
        Err(e) => Some(e.to_reply()),
    }
}
