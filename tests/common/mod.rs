//! Shared utilities for lifecycle and port-binding integration tests.

#![allow(dead_code)]

use std::net::TcpListener;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use notebook_server::config::schema::CONNECTION_FILE_PLACEHOLDER;
use notebook_server::config::ServerConfig;
use notebook_server::lifecycle::{ConfirmOutcome, ConfirmPrompt, LifecycleHooks, SignalEvent};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

/// A config rooted in `dir`, listening on localhost without a browser.
pub fn test_config(dir: &Path, port: u16) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.port = port;
    config.server.open_browser = false;
    config.notebooks.notebook_dir = dir.join("notebooks");
    config.kernels.connection_dir = dir.join("security");
    config.clusters.profile_dir = dir.join("profiles");
    config.kernels.command = vec![
        "sh".into(),
        "-c".into(),
        "sleep 30".into(),
        CONNECTION_FILE_PLACEHOLDER.into(),
    ];
    std::fs::create_dir_all(&config.notebooks.notebook_dir).unwrap();
    config
}

/// Prompt that answers immediately.
pub struct FixedPrompt(pub ConfirmOutcome);

impl ConfirmPrompt for FixedPrompt {
    fn confirm(&self, _timeout: Duration) -> ConfirmOutcome {
        self.0
    }
}

/// Prompt that answers only when released.
pub struct GatedPrompt {
    outcome: ConfirmOutcome,
    gate: Mutex<Receiver<()>>,
}

impl GatedPrompt {
    pub fn new(outcome: ConfirmOutcome) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                outcome,
                gate: Mutex::new(rx),
            },
            tx,
        )
    }
}

impl ConfirmPrompt for GatedPrompt {
    fn confirm(&self, _timeout: Duration) -> ConfirmOutcome {
        let _ = self.gate.lock().unwrap().recv();
        self.outcome
    }
}

/// Hooks fed by a test-controlled signal channel.
pub fn hooks(prompt: impl ConfirmPrompt) -> (LifecycleHooks, UnboundedSender<SignalEvent>) {
    let (tx, rx) = unbounded_channel();
    let hooks = LifecycleHooks {
        signals: Some(rx),
        prompt: std::sync::Arc::new(prompt),
    };
    (hooks, tx)
}

/// Bind `count` consecutive localhost ports and keep them held.
pub fn hold_consecutive(count: u16) -> (u16, Vec<TcpListener>) {
    for _ in 0..100 {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = probe.local_addr().unwrap().port();
        drop(probe);
        if base < 1024 || base > u16::MAX - count {
            continue;
        }

        let held: Result<Vec<TcpListener>, _> = (base..base + count)
            .map(|port| TcpListener::bind(("127.0.0.1", port)))
            .collect();
        if let Ok(held) = held {
            return (base, held);
        }
    }
    panic!("could not find {count} consecutive free ports");
}

/// Poll until something accepts connections on `port`.
pub async fn wait_for_port(port: u16) {
    for _ in 0..100 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing listening on port {port}");
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
