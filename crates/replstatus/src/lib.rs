//! replstatus library crate.
//!
//! A tiny always-on oracle that answers, over a bare TCP connection, whether
//! the database node it runs beside is usable as a write primary, as a
//! caught-up read replica, or not at all.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Load balancer (plain TCP: optional "<seconds>" in, one token out)
//!         ↕
//! [replstatus]
//!   ├── domain/           ServerConfig, SupervisorMode, config file schema
//!   ├── application/
//!   │     ├── handle_connection   snapshot, classify, optional threshold, token
//!   │     ├── delay_read          bounded optional read of the client threshold
//!   │     └── replication_source  the ReplicationSource seam
//!   └── infrastructure/
//!         ├── listener      socket2 listening socket (reuse addr, backlog 5)
//!         ├── event_loop    accept / shutdown / supervisor-lost multiplexing
//!         ├── shutdown      signal-driven shutdown flag + wakeup
//!         ├── supervisor    detection of a vanished supervising process
//!         ├── status_file   JSON replication status published by the engine
//!         ├── config_file   optional TOML configuration
//!         └── probe         client used by `replstatus probe` and tests
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `replstatus-core` and traits only.
//! - `infrastructure` owns every socket, file, timer and signal.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: per-connection use case.
pub mod application;

/// Infrastructure layer: sockets, signals, files and the event loop.
pub mod infrastructure;
