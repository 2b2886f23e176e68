pub mod data;
pub mod error;
pub mod ipc;
pub mod mirror;
pub mod observers;
pub mod order;
pub mod store;
pub mod transport;

mod utils;

#[cfg(feature = "__bin")]
mod cli;
#[cfg(feature = "__bin")]
mod logging;

pub use data::{Change, Workspace, WorkspaceEvent, WorkspaceReply};
pub use error::{Error, Result};
pub use ipc::I3Connection;
pub use mirror::{WorkspaceMirror, goto_name};
pub use observers::Callback;
pub use order::compare_names;
pub use transport::Transport;

#[doc(hidden)]
#[cfg(feature = "__bin")]
pub fn __main() -> std::process::ExitCode {
    crate::cli::cli_main().unwrap_or(std::process::ExitCode::FAILURE)
}
