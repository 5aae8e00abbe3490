pub mod project;
pub mod server;
pub mod util;
