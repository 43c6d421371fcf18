//! End-to-end tests: a real listener, a real event loop and the probe client.
//!
//! Each test binds an ephemeral loopback port, spawns [`EventLoop::run`] on
//! the test runtime and talks to it over TCP exactly as a load balancer
//! would:
//!
//! ```text
//! probe ── connect ──▶ EventLoop ── accept ──▶ ConnectionHandler
//!       ── "<secs>" ─▶                            (optional, within 100 ms)
//!       ◀── token ────                            MASTER | STANDBY | OFFLINE
//!       ◀── close ────
//! ```

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use replstatus::application::{ConnectionHandler, FixedSource, ReplicationSource};
use replstatus::infrastructure::{
    bind_listener, query_status, EventLoop, LoopExit, Shutdown, StatusFileSource, SupervisorWatch,
    Unsupervised,
};
use replstatus_core::{Lsn, ReplicationSnapshot, Status};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// A running server on an ephemeral port.
struct TestServer {
    addr: SocketAddr,
    shutdown: Arc<Shutdown>,
    task: JoinHandle<LoopExit>,
}

fn start<S, W>(source: S, supervisor: W) -> TestServer
where
    S: ReplicationSource + Send + Sync + 'static,
    W: SupervisorWatch + 'static,
{
    let listener = bind_listener(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
    let shutdown = Shutdown::new();
    let event_loop = EventLoop::from_listener(
        listener,
        ConnectionHandler::new(source),
        supervisor,
        Arc::clone(&shutdown),
    );
    let addr = event_loop.local_addr().unwrap();
    TestServer {
        addr,
        shutdown,
        task: tokio::spawn(event_loop.run()),
    }
}

fn serve_snapshot(snapshot: ReplicationSnapshot) -> TestServer {
    start(FixedSource::new(snapshot), Unsupervised)
}

/// Standby with a live receiver, behind by `delay_secs` of transaction time.
fn lagging_standby(delay_secs: i64) -> ReplicationSnapshot {
    let now = Utc::now();
    ReplicationSnapshot::standby(Lsn(0x16B_3748), Lsn(0x16B_3790), now)
        .with_last_applied(now - ChronoDuration::seconds(delay_secs))
}

/// Watch that reports loss when its sender is dropped or fired.
struct ChannelWatch(oneshot::Receiver<()>);

#[async_trait]
impl SupervisorWatch for ChannelWatch {
    async fn lost(&mut self) {
        let _ = (&mut self.0).await;
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_primary_answers_master() {
    // Arrange
    let server = serve_snapshot(ReplicationSnapshot::primary(Utc::now()));

    // Act
    let status = query_status(server.addr, None).await.unwrap();

    // Assert
    assert_eq!(status, Status::Primary);
}

#[tokio::test]
async fn test_standby_with_dead_receiver_answers_offline() {
    let snapshot =
        ReplicationSnapshot::standby(Lsn(5), Lsn(5), Utc::now()).with_receiver_down();
    let server = serve_snapshot(snapshot);

    assert_eq!(query_status(server.addr, None).await.unwrap(), Status::Offline);
}

#[tokio::test]
async fn test_caught_up_standby_answers_standby() {
    let snapshot = ReplicationSnapshot::standby(Lsn(9), Lsn(9), Utc::now())
        .with_last_applied(Utc::now() - ChronoDuration::days(1));
    let server = serve_snapshot(snapshot);

    assert_eq!(query_status(server.addr, None).await.unwrap(), Status::Standby);
}

#[tokio::test]
async fn test_lagging_standby_respects_client_threshold() {
    // Arrange: 30 s behind
    let server = serve_snapshot(lagging_standby(30));

    // Act
    let strict = query_status(server.addr, Some(10)).await.unwrap();
    let relaxed = query_status(server.addr, Some(60)).await.unwrap();

    // Assert
    assert_eq!(strict, Status::Offline);
    assert_eq!(relaxed, Status::Standby);
}

#[tokio::test]
async fn test_lagging_standby_without_threshold_answers_standby_after_wait() {
    let server = serve_snapshot(lagging_standby(3600));

    let started = std::time::Instant::now();
    let status = query_status(server.addr, None).await.unwrap();

    assert_eq!(status, Status::Standby);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_non_positive_threshold_is_permissive() {
    let server = serve_snapshot(lagging_standby(3600));

    assert_eq!(query_status(server.addr, Some(0)).await.unwrap(), Status::Standby);
    assert_eq!(query_status(server.addr, Some(-5)).await.unwrap(), Status::Standby);
}

#[tokio::test]
async fn test_status_file_is_reread_per_connection() {
    // Arrange
    let path: PathBuf =
        std::env::temp_dir().join(format!("replstatus_e2e_{}.json", std::process::id()));
    std::fs::write(&path, r#"{"in_recovery":false}"#).unwrap();
    let server = start(StatusFileSource::new(&path), Unsupervised);

    // Act
    let before = query_status(server.addr, None).await.unwrap();
    std::fs::write(
        &path,
        r#"{"in_recovery":true,"receiver_alive":false,"replay_lsn":"0/1","receive_lsn":"0/1"}"#,
    )
    .unwrap();
    let after = query_status(server.addr, None).await.unwrap();

    // Assert: a promoted-then-demoted node is reported as it is now
    assert_eq!(before, Status::Primary);
    assert_eq!(after, Status::Offline);

    // Cleanup
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_unreadable_status_file_answers_offline() {
    let server = start(
        StatusFileSource::new("/nonexistent/replstatus/state.json"),
        Unsupervised,
    );

    assert_eq!(query_status(server.addr, None).await.unwrap(), Status::Offline);
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shutdown_while_idle_closes_listener_and_exits_zero() {
    // Arrange
    let server = serve_snapshot(ReplicationSnapshot::primary(Utc::now()));
    assert_eq!(query_status(server.addr, None).await.unwrap(), Status::Primary);

    // Act
    server.shutdown.request();
    let exit = tokio::time::timeout(Duration::from_secs(1), server.task)
        .await
        .expect("event loop must stop promptly")
        .unwrap();

    // Assert
    assert_eq!(exit, LoopExit::Shutdown);
    assert_eq!(exit.exit_code(), 0);
    assert!(tokio::net::TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn test_supervisor_loss_ends_loop_with_failure() {
    // Arrange
    let (supervisor_alive, watch_rx) = oneshot::channel::<()>();
    let server = start(
        FixedSource::new(ReplicationSnapshot::primary(Utc::now())),
        ChannelWatch(watch_rx),
    );
    assert_eq!(query_status(server.addr, None).await.unwrap(), Status::Primary);

    // Act: the supervisor goes away
    drop(supervisor_alive);
    let exit = tokio::time::timeout(Duration::from_secs(1), server.task)
        .await
        .expect("event loop must notice supervisor loss")
        .unwrap();

    // Assert
    assert_eq!(exit, LoopExit::SupervisorLost);
    assert_eq!(exit.exit_code(), 1);
}

#[tokio::test]
async fn test_connections_are_served_sequentially() {
    // Arrange: every lagging-standby query without a threshold holds the
    // server for the full wait
    let server = serve_snapshot(lagging_standby(5));

    // Act
    let started = std::time::Instant::now();
    let (a, b) = tokio::join!(
        query_status(server.addr, None),
        query_status(server.addr, None)
    );

    // Assert: both answered, and the second waited behind the first
    assert_eq!(a.unwrap(), Status::Standby);
    assert_eq!(b.unwrap(), Status::Standby);
    assert!(started.elapsed() >= Duration::from_millis(150));
}
