//! Remote control channel for the canaryfs decoy tree.
//!
//! Clients send length-prefixed JSON requests (`create_file`, `delete_file`,
//! `list_files`, `list_directories`, `list_all`, `create_directory`) over a
//! named pipe or TCP and get one JSON response per request.

pub mod error;
pub mod frame;
pub mod handler;
pub mod protocol;
pub mod server;

pub use error::ControlError;
pub use frame::{read_frame, write_frame, MAX_FRAME_LEN};
pub use handler::{CommandHandler, DIR_TAG};
pub use protocol::{ControlRequest, ControlResponse};
#[cfg(target_os = "windows")]
pub use server::NamedPipeControlListener;
pub use server::{
    serve_connection, ControlListener, ControlServer, TcpControlListener, DEFAULT_ACCEPT_TIMEOUT,
};
