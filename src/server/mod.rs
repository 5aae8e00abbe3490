pub mod context;
pub mod file_api;
pub mod file_tree;
pub mod handlers;
pub mod matcher;
pub mod protocol;
pub mod runner;
pub mod session;
pub mod ws;

pub use context::{AppError, HandlerContext, SharedConfig};
pub use file_api::{resolve_safe_path, strip_backtick_fence, write_file, FileApiError};
pub use file_tree::{TreeError, TreeNode};
pub use matcher::{resolve, MatchError};
pub use protocol::{ClientMessage, Reply, ServerMessage, Snapshot};
pub use runner::{CommandError, CommandRunner, GitError, SystemRunner};
pub use session::{PendingChange, Session};
pub use ws::{bind_available_port, build_context, run_server, serve};
