//! In-process stand-in for an HDFury unit
//!
//! Listens on a loopback port, optionally greets with a banner, echoes
//! every received line back with a trailing `>` prompt, and records what
//! it saw so tests can assert on wire traffic.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default, Clone)]
pub struct FakeDeviceOptions {
    /// Bytes written immediately after accepting a connection
    pub banner: Option<&'static str>,
    /// Close the first accepted connection without reading anything
    pub drop_first_connection: bool,
    /// Read but never answer on the first accepted connection
    pub mute_first_connection: bool,
    /// Read but never answer on any connection
    pub mute_all: bool,
}

/// Install the test subscriber; later calls are no-ops
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct FakeDevice {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    acceptor: JoinHandle<()>,
}

impl FakeDevice {
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeDeviceOptions {
            banner: Some("Welcome to the HDFury command interface\r\n"),
            ..Default::default()
        })
        .await
    }

    pub async fn spawn_with(options: FakeDeviceOptions) -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task_commands = commands.clone();
        let task_connections = connections.clone();
        let acceptor = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let index = task_connections.fetch_add(1, Ordering::SeqCst);
                if options.drop_first_connection && index == 0 {
                    drop(stream);
                    continue;
                }
                let mute = options.mute_all || (options.mute_first_connection && index == 0);
                let banner = options.banner;
                let commands = task_commands.clone();
                tokio::spawn(async move {
                    let (read_half, mut write_half) = stream.into_split();
                    if let Some(banner) = banner {
                        let _ = write_half.write_all(banner.as_bytes()).await;
                    }
                    let mut lines = BufReader::new(read_half).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        commands.lock().push(line.clone());
                        if mute {
                            continue;
                        }
                        let reply = format!("{}>\r\n", line);
                        if write_half.write_all(reply.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            commands,
            connections,
            acceptor,
        }
    }

    /// Every command line received so far, across all connections
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Number of connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}
