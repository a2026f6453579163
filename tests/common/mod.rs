//! Shared utilities for REPL integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use reptile::{Host, LifecycleHooks, Registration, Reptile, Settings};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Find a free loopback port. The probe socket is closed before returning.
pub fn available_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

/// Loopback-only settings on a fresh port.
pub fn settings() -> Settings {
    let mut settings = Settings::with_port(available_port());
    settings.host = "127.0.0.1".to_string();
    settings
}

pub struct TestHost;

impl Host for TestHost {
    fn name(&self) -> &str {
        "test-host"
    }

    fn inspect(&self) -> serde_json::Value {
        json!({ "name": "test-host", "ready": true })
    }
}

/// Register a REPL for [`TestHost`].
pub async fn start(settings: Settings) -> (Registration, LifecycleHooks) {
    start_with(Reptile::new(Arc::new(TestHost), settings)).await
}

pub async fn start_with(reptile: Reptile) -> (Registration, LifecycleHooks) {
    let mut hooks = LifecycleHooks::new();
    let registration = reptile.register(&mut hooks).await.unwrap();
    (registration, hooks)
}

/// Register a REPL whose clients all appear to come from `ip`.
pub async fn start_as_peer(settings: Settings, ip: IpAddr) -> (Registration, LifecycleHooks) {
    let reptile = Reptile::new(Arc::new(TestHost), settings)
        .with_peer_resolver(move |addr: SocketAddr| SocketAddr::new(ip, addr.port()));
    start_with(reptile).await
}

/// Line-oriented REPL client.
pub struct Client {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = tokio::time::timeout(TIMEOUT, TcpStream::connect(addr))
            .await
            .expect("connect timed out")
            .expect("connect failed");
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    /// Connect and consume the first prompt.
    pub async fn attach(addr: SocketAddr, prompt: &str) -> Self {
        let mut client = Self::connect(addr).await;
        assert_eq!(client.read_until(prompt).await, "");
        client
    }

    pub async fn send(&mut self, line: &str) {
        self.stream.write_all(line.as_bytes()).await.unwrap();
        self.stream.write_all(b"\n").await.unwrap();
    }

    /// Send a line and return the output printed before the next prompt.
    pub async fn eval(&mut self, line: &str, prompt: &str) -> String {
        self.send(line).await;
        self.read_until(prompt).await
    }

    /// Read until the output ends with `marker`; returns what came before it.
    pub async fn read_until(&mut self, marker: &str) -> String {
        let read = async {
            loop {
                if self.buf.ends_with(marker.as_bytes()) {
                    let end = self.buf.len() - marker.len();
                    let text = String::from_utf8_lossy(&self.buf[..end]).into_owned();
                    self.buf.clear();
                    return text;
                }
                let mut chunk = [0u8; 1024];
                let n = self.stream.read(&mut chunk).await.unwrap();
                assert!(
                    n > 0,
                    "connection closed while waiting for {marker:?}, got {:?}",
                    String::from_utf8_lossy(&self.buf)
                );
                self.buf.extend_from_slice(&chunk[..n]);
            }
        };
        tokio::time::timeout(TIMEOUT, read)
            .await
            .expect("timed out waiting for output")
    }

    /// Read until the server closes the connection. A reset counts as closed.
    pub async fn read_to_end(&mut self) -> String {
        let mut rest = std::mem::take(&mut self.buf);
        let read = self.stream.read_to_end(&mut rest);
        let _ = tokio::time::timeout(TIMEOUT, read)
            .await
            .expect("timed out waiting for close");
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Poll until the registry reaches `expected` sessions.
pub async fn wait_for_sessions(registration: &Registration, expected: usize) {
    let wait = async {
        while registration.active_sessions() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(TIMEOUT, wait)
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {expected} sessions, have {}",
                registration.active_sessions()
            )
        });
}
