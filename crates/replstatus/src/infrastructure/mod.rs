//! Infrastructure layer: everything that touches the operating system.
//!
//! # Sub-modules
//!
//! - **`listener`** – Builds the listening socket with `socket2`.
//! - **`event_loop`** – [`EventLoop`]: accept, shutdown and supervisor loss
//!   multiplexed on one task.
//! - **`shutdown`** – [`Shutdown`] flag and the signal listener task.
//! - **`supervisor`** – [`SupervisorWatch`] implementations.
//! - **`status_file`** – [`StatusFileSource`], the production
//!   [`crate::application::ReplicationSource`].
//! - **`config_file`** – Optional TOML configuration file.
//! - **`probe`** – [`query_status`], the client side of the protocol.

pub mod config_file;
pub mod event_loop;
pub mod listener;
pub mod probe;
pub mod shutdown;
pub mod status_file;
pub mod supervisor;

pub use config_file::load_config_file;
pub use event_loop::{EventLoop, LoopExit};
pub use listener::{bind_listener, ServerError, LISTEN_BACKLOG};
pub use probe::{query_status, ProbeError};
pub use shutdown::{spawn_signal_listener, Shutdown};
pub use status_file::StatusFileSource;
pub use supervisor::{watch_for, SupervisorWatch, Unsupervised};
