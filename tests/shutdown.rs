//! Connection tracking and shutdown tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use reptile::config::EvaluatorOptions;
use reptile::eval::{Evaluator, EvaluatorFactory, Reply};
use reptile::session::SessionContext;
use reptile::{DrainReport, RegisterError, Reptile, StopPhase};

mod common;

use common::{settings, start, start_with, wait_for_sessions, Client, TestHost};

#[tokio::test]
async fn registry_follows_open_connections() {
    let (registration, _hooks) = start(settings()).await;
    let addr = registration.local_addr();

    let mut clients = Vec::new();
    for _ in 0..4 {
        clients.push(Client::attach(addr, "> ").await);
    }
    wait_for_sessions(&registration, 4).await;

    clients.truncate(1);
    wait_for_sessions(&registration, 1).await;

    clients.clear();
    wait_for_sessions(&registration, 0).await;
}

#[tokio::test]
async fn shutdown_closes_sessions_and_listener() {
    let (registration, _hooks) = start(settings()).await;
    let addr = registration.local_addr();

    let mut first = Client::attach(addr, "> ").await;
    let mut second = Client::attach(addr, "> ").await;
    wait_for_sessions(&registration, 2).await;
    assert!(registration.is_accepting().await);

    let report = registration.shutdown().await;
    assert_eq!(
        report,
        DrainReport {
            sessions: 2,
            forced: 0
        }
    );
    assert_eq!(registration.active_sessions(), 0);
    assert!(!registration.is_accepting().await);

    assert_eq!(first.read_to_end().await, "\n");
    assert_eq!(second.read_to_end().await, "\n");
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let (registration, _hooks) = start(settings()).await;
    let _client = Client::attach(registration.local_addr(), "> ").await;
    wait_for_sessions(&registration, 1).await;

    assert_eq!(registration.shutdown().await.sessions, 1);
    assert_eq!(registration.shutdown().await, DrainReport::default());
}

#[tokio::test]
async fn shutdown_without_sessions_returns_promptly() {
    let (registration, _hooks) = start(settings()).await;
    let report = tokio::time::timeout(Duration::from_secs(1), registration.shutdown())
        .await
        .unwrap();
    assert_eq!(report, DrainReport::default());
}

#[tokio::test]
async fn before_stop_hook_drains_sessions() {
    let (registration, mut hooks) = start(settings()).await;
    assert_eq!(hooks.len(StopPhase::BeforeStop), 1);
    assert_eq!(hooks.len(StopPhase::AfterStop), 0);

    let mut client = Client::attach(registration.local_addr(), "> ").await;
    wait_for_sessions(&registration, 1).await;

    hooks.run(StopPhase::AfterStop).await;
    assert_eq!(registration.active_sessions(), 1);

    hooks.run(StopPhase::BeforeStop).await;
    assert_eq!(registration.active_sessions(), 0);
    assert_eq!(client.read_to_end().await, "\n");
}

#[tokio::test]
async fn after_stop_phase_is_configurable() {
    let mut settings = settings();
    settings.shutdown.phase = StopPhase::AfterStop;
    let (registration, mut hooks) = start(settings).await;
    assert_eq!(hooks.len(StopPhase::AfterStop), 1);

    hooks.run(StopPhase::AfterStop).await;
    assert!(!registration.is_accepting().await);
}

#[tokio::test]
async fn port_in_use_is_a_bind_error() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut settings = settings();
    settings.port = taken.local_addr().unwrap().port();

    let mut hooks = reptile::LifecycleHooks::new();
    let result = Reptile::new(Arc::new(TestHost), settings)
        .register(&mut hooks)
        .await;

    assert!(matches!(result, Err(RegisterError::Bind(_))));
    assert!(hooks.is_empty());
}

#[tokio::test]
async fn invalid_settings_are_rejected_before_binding() {
    let mut settings = settings();
    settings.port = 0;

    let mut hooks = reptile::LifecycleHooks::new();
    let result = Reptile::new(Arc::new(TestHost), settings)
        .register(&mut hooks)
        .await;

    match result {
        Err(RegisterError::Invalid(errors)) => assert_eq!(errors.len(), 1),
        other => panic!("expected validation error, got {other:?}"),
    }
}

/// Evaluator that blocks its worker on the input `stall`.
struct Stalling;

impl Evaluator for Stalling {
    fn eval_line(&mut self, line: &str) -> Vec<Reply> {
        if line == "stall" {
            std::thread::sleep(Duration::from_millis(2500));
        }
        vec![Reply::Value(line.to_string())]
    }

    fn is_pending(&self) -> bool {
        false
    }

    fn reset_input(&mut self) {}

    fn reset_context(&mut self) {}
}

struct StallingFactory;

impl EvaluatorFactory for StallingFactory {
    fn create(&self, _: &SessionContext, _: &EvaluatorOptions) -> Box<dyn Evaluator> {
        Box::new(Stalling)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stuck_sessions_are_aborted_after_drain_timeout() {
    let mut settings = settings();
    settings.shutdown.drain_timeout_secs = 1;
    let reptile = Reptile::new(Arc::new(TestHost), settings)
        .with_evaluator(Arc::new(StallingFactory));
    let (registration, _hooks) = start_with(reptile).await;

    let mut client = Client::attach(registration.local_addr(), "> ").await;
    assert_eq!(client.eval("echo", "> ").await, "echo\n");
    client.send("stall").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let report = registration.shutdown().await;
    assert_eq!(report.sessions, 1);
    assert_eq!(report.forced, 1);

    wait_for_sessions(&registration, 0).await;
}
