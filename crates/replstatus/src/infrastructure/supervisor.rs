//! Detection of a vanished supervising process.
//!
//! The oracle only makes sense while the database it describes is running.
//! If the process supervising it disappears, the event loop terminates the
//! process immediately with a non-zero status and skips all cleanup.
//!
//! There is no portable readiness event for "some other process exited", so
//! the watches below re-check liveness every [`SUPERVISOR_POLL_INTERVAL`].
//! The check is a single `getppid` or `stat` and is the only periodic work in
//! an idle server.  Loss is therefore noticed at most one interval late.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::domain::config::{ConfigError, SupervisorMode};

/// How often liveness is re-checked.
pub const SUPERVISOR_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Something that can tell the event loop its supervisor is gone.
///
/// [`lost`](Self::lost) is raced against other events with `tokio::select!`
/// and must therefore be cancel-safe.
#[async_trait]
pub trait SupervisorWatch: Send {
    /// Completes once the supervisor is gone.  May never complete.
    async fn lost(&mut self);
}

#[async_trait]
impl<W: SupervisorWatch + ?Sized> SupervisorWatch for Box<W> {
    async fn lost(&mut self) {
        (**self).lost().await;
    }
}

/// No supervisor.  [`lost`](SupervisorWatch::lost) never completes.
#[derive(Debug, Default)]
pub struct Unsupervised;

#[async_trait]
impl SupervisorWatch for Unsupervised {
    async fn lost(&mut self) {
        std::future::pending::<()>().await;
    }
}

/// Watches the parent process recorded at startup.
///
/// When the parent exits, the process is re-parented and the parent id
/// changes.
#[cfg(unix)]
#[derive(Debug)]
pub struct ParentWatch {
    parent: u32,
    ticker: Interval,
}

#[cfg(unix)]
impl ParentWatch {
    /// Records the current parent.  Must be called within a tokio runtime.
    pub fn new(poll: Duration) -> Self {
        Self {
            parent: std::os::unix::process::parent_id(),
            ticker: poll_ticker(poll),
        }
    }

    /// The parent id recorded at startup.
    pub fn parent(&self) -> u32 {
        self.parent
    }
}

#[cfg(unix)]
#[async_trait]
impl SupervisorWatch for ParentWatch {
    async fn lost(&mut self) {
        loop {
            self.ticker.tick().await;
            if std::os::unix::process::parent_id() != self.parent {
                return;
            }
        }
    }
}

/// Watches an arbitrary process through `/proc/<pid>`.
#[derive(Debug)]
pub struct PidWatch {
    proc_dir: PathBuf,
    ticker: Interval,
}

impl PidWatch {
    /// Watches `pid`.  Must be called within a tokio runtime.
    pub fn new(pid: u32, poll: Duration) -> Self {
        Self {
            proc_dir: PathBuf::from(format!("/proc/{pid}")),
            ticker: poll_ticker(poll),
        }
    }
}

#[async_trait]
impl SupervisorWatch for PidWatch {
    async fn lost(&mut self) {
        loop {
            self.ticker.tick().await;
            if !self.proc_dir.exists() {
                return;
            }
        }
    }
}

fn poll_ticker(poll: Duration) -> Interval {
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Builds the watch selected by `mode`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSupervisorMode`] when the mode cannot be
/// supported here: `pid:<n>` without a `/proc` filesystem, a pid that does not
/// exist at startup, or `parent` on a non-Unix platform.
pub fn watch_for(mode: SupervisorMode) -> Result<Box<dyn SupervisorWatch>, ConfigError> {
    match mode {
        SupervisorMode::None => Ok(Box::new(Unsupervised)),
        #[cfg(unix)]
        SupervisorMode::Parent => Ok(Box::new(ParentWatch::new(SUPERVISOR_POLL_INTERVAL))),
        #[cfg(not(unix))]
        SupervisorMode::Parent => Err(ConfigError::InvalidSupervisorMode(mode.to_string())),
        SupervisorMode::Pid(pid) => {
            if !PathBuf::from(format!("/proc/{pid}")).exists() {
                return Err(ConfigError::InvalidSupervisorMode(mode.to_string()));
            }
            Ok(Box::new(PidWatch::new(pid, SUPERVISOR_POLL_INTERVAL)))
        }
    }
}
