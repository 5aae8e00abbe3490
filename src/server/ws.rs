use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::project::ConfigStore;
use crate::server::context::HandlerContext;
use crate::server::handlers;
use crate::server::protocol::{ClientMessage, Reply, ServerMessage};
use crate::server::runner::SystemRunner;
use crate::server::session::Session;

/// Run the WebSocket server for `root`, starting the port search at `port`
pub async fn run_server(root: PathBuf, store: ConfigStore, host: &str, port: u16) -> anyhow::Result<()> {
    if store.config().git_enabled && which::which("git").is_err() {
        warn!("Git operations are enabled but no git executable was found on PATH");
    }

    let listener = bind_available_port(host, port).await?;
    let bound_port = listener.local_addr()?.port();
    if bound_port != port {
        info!("Port {} is in use, using {} instead", port, bound_port);
    }

    let ctx = build_context(root, store, bound_port);
    info!("Mo-2 Agent Server running at {}", ctx.server_address);

    serve(listener, ctx).await
}

/// Assemble the shared handler context backed by the system command runner
pub fn build_context(root: PathBuf, store: ConfigStore, port: u16) -> HandlerContext {
    let timeout = store.config().command_timeout_secs.map(Duration::from_secs);
    let runner = SystemRunner::new(root.clone()).with_timeout(timeout);

    HandlerContext {
        root,
        config: Arc::new(RwLock::new(store)),
        runner: Arc::new(runner),
        server_address: format!("http://localhost:{}", port),
    }
}

pub fn router(ctx: HandlerContext) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(ctx)
}

/// Serve connections from an already bound listener until it fails
pub async fn serve(listener: TcpListener, ctx: HandlerContext) -> anyhow::Result<()> {
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

/// Bind the first free port at or above `start`
pub async fn bind_available_port(host: &str, start: u16) -> std::io::Result<TcpListener> {
    let mut port = start;
    loop {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse && port < u16::MAX => {
                debug!("Port {} in use, trying {}", port, port + 1);
                port += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<HandlerContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let span = info_span!("session", id = %Uuid::new_v4());
        handle_socket(socket, ctx).instrument(span)
    })
}

/// Handle a WebSocket connection: snapshot first, then one action at a time
async fn handle_socket(mut socket: WebSocket, ctx: HandlerContext) {
    info!("New WebSocket connection established");

    let mut session = Session::new();
    let snapshot = handlers::initial_snapshot(&mut session, &ctx).await;
    if let Err(e) = send_message(&mut socket, &snapshot).await {
        error!("Failed to send initial snapshot: {}", e);
        return;
    }

    loop {
        let text = match socket.recv().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Received non UTF-8 binary frame");
                    let reply = Reply::fail("Invalid message").with_error(e.to_string());
                    if send_message(&mut socket, &reply.into()).await.is_err() {
                        break;
                    }
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) => {
                info!("WebSocket connection closed by client");
                break;
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                // Handled automatically by axum
                continue;
            }
            Some(Err(e)) => {
                error!("WebSocket error: {}", e);
                break;
            }
            None => {
                info!("WebSocket connection closed (recv returned None)");
                break;
            }
        };

        trace!("Received frame: {}", preview(&text));
        if let Err(e) = handle_client_message(&text, &mut socket, &mut session, &ctx).await {
            error!("Failed to send reply: {}", e);
            break;
        }
    }

    info!(
        "WebSocket connection handler finished ({} uncommitted changes dropped)",
        session.pending_changes().len()
    );
}

/// Decode one frame, dispatch it and send the reply, if any
async fn handle_client_message(
    text: &str,
    socket: &mut WebSocket,
    session: &mut Session,
    ctx: &HandlerContext,
) -> Result<(), String> {
    let msg = match ClientMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse client message: {}", e);
            let reply = Reply::fail("Invalid message").with_error(e.to_string());
            return send_message(socket, &reply.into()).await;
        }
    };

    if let Some(reply) = handlers::dispatch(msg, session, ctx).await {
        send_message(socket, &reply.into()).await?;
    }
    Ok(())
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 80;
    if text.chars().count() > LIMIT {
        format!("{}...", text.chars().take(LIMIT).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Send a server message over WebSocket as a JSON text frame
pub async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), String> {
    let text = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| e.to_string())
}
