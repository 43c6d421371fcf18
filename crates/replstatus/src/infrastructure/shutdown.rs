//! Shutdown requests.
//!
//! A termination request arrives asynchronously (SIGTERM from a supervisor,
//! Ctrl+C in a terminal).  The code that receives it does exactly two things:
//! set an atomic flag and wake the event loop.  It never touches sockets,
//! allocates or logs; the event loop observes the flag at the top of its next
//! iteration and does all of that itself.
//!
//! The wakeup is a [`Notify`] permit, so a request that lands while the loop
//! is busy with a connection is not lost: the next wait returns immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared shutdown flag plus wakeup primitive.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    wake: Notify,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records the request and wakes the event loop.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// `true` once [`request`](Self::request) has been called.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Completes when a request has been made.
    ///
    /// Consumes the stored wakeup permit, so call [`is_requested`] afterwards
    /// (or before) to learn the state.
    ///
    /// [`is_requested`]: Self::is_requested
    pub async fn notified(&self) {
        self.wake.notified().await;
    }
}

/// Spawns a task that turns SIGTERM and SIGINT into [`Shutdown::request`].
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
#[cfg(unix)]
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = terminate.recv() => {}
            _ = interrupt.recv() => {}
        }
        shutdown.request();
    });
    Ok(())
}

/// Spawns a task that turns Ctrl+C into [`Shutdown::request`].
///
/// # Errors
///
/// Never fails on this platform; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.request();
        }
    });
    Ok(())
}
