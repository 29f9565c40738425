//! HDFury TCP session
//!
//! Owns the one TCP connection to a unit and serializes every
//! command/response exchange behind a single lock, so no two commands are
//! ever interleaved on the socket. Applies per-command timeouts, a
//! bounded retry on timeout or connection-class failures, and a proactive
//! reconnect when the session has sat idle long enough for the device to
//! have silently dropped it.

use crate::config::SessionConfig;
use crate::models::ModelCapability;
use hdfurykit_core::{ConnectionError, Error, Result, SessionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// The stream halves of one live connection
struct Wire {
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
}

/// One stateful TCP session to an HDFury unit
pub struct DeviceSession {
    host: String,
    port: u16,
    capability: &'static ModelCapability,
    config: SessionConfig,
    /// Serializes every command/response exchange
    wire: Mutex<Wire>,
    /// Collapses concurrent connection attempts into one
    connect_lock: Mutex<()>,
    connected: AtomicBool,
    last_activity: parking_lot::Mutex<Option<Instant>>,
}

impl DeviceSession {
    /// Create a session for a device; does not connect
    pub fn new(
        host: impl Into<String>,
        port: u16,
        capability: &'static ModelCapability,
        config: SessionConfig,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            capability,
            config,
            wire: Mutex::new(Wire {
                reader: None,
                writer: None,
            }),
            connect_lock: Mutex::new(()),
            connected: AtomicBool::new(false),
            last_activity: parking_lot::Mutex::new(None),
        }
    }

    /// The capability table this session formats commands for
    pub fn capability(&self) -> &'static ModelCapability {
        self.capability
    }

    /// True when a live writer half exists
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Time since the last successful exchange, if any ever completed
    pub fn idle_time(&self) -> Option<Duration> {
        self.last_activity.lock().map(|t| t.elapsed())
    }

    /// Open the TCP connection
    ///
    /// No-op when already connected. Drains the unsolicited welcome banner
    /// some units print right after accept (best effort, short timeout).
    pub async fn connect(&self) -> Result<()> {
        let mut wire = self.wire.lock().await;
        self.establish(&mut wire).await
    }

    /// Close the connection
    ///
    /// Idempotent; close errors are logged and otherwise ignored.
    pub async fn disconnect(&self) {
        let mut wire = self.wire.lock().await;
        self.teardown(&mut wire).await;
    }

    async fn establish(&self, wire: &mut Wire) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        if wire.writer.is_some() {
            return Ok(());
        }

        tracing::info!("Connecting to {}:{}", self.host, self.port);
        let stream = match timeout(
            Duration::from_millis(self.config.connect_timeout_ms),
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::error!("Connection to {}:{} failed: {}", self.host, self.port, e);
                return Err(ConnectionError::FailedToConnect {
                    host: self.host.clone(),
                    port: self.port,
                    reason: e.to_string(),
                }
                .into());
            }
            Err(_) => {
                tracing::error!("Connection to {}:{} timed out", self.host, self.port);
                return Err(ConnectionError::ConnectTimeout {
                    timeout_ms: self.config.connect_timeout_ms,
                }
                .into());
            }
        };

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        // Some units greet with a banner; swallow it so it cannot be
        // mistaken for a command response.
        let mut banner = [0u8; 2048];
        match timeout(
            Duration::from_millis(self.config.banner_timeout_ms),
            reader.read(&mut banner),
        )
        .await
        {
            Ok(Ok(n)) => tracing::debug!("Cleared {} byte welcome banner", n),
            Ok(Err(e)) => {
                tracing::error!("Read after connect failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {}
        }

        wire.reader = Some(reader);
        wire.writer = Some(write_half);
        self.connected.store(true, Ordering::SeqCst);
        *self.last_activity.lock() = Some(Instant::now());
        tracing::info!("Connected to {}:{}", self.host, self.port);
        Ok(())
    }

    async fn teardown(&self, wire: &mut Wire) {
        if let Some(mut writer) = wire.writer.take() {
            tracing::info!("Disconnecting from {}:{}", self.host, self.port);
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("Error during disconnect: {}", e);
            }
        }
        wire.reader = None;
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn ensure_connection(&self, wire: &mut Wire) -> Result<()> {
        if let Some(idle) = self.idle_time() {
            if wire.writer.is_some()
                && idle > Duration::from_millis(self.config.idle_reconnect_ms)
            {
                tracing::info!(
                    "Proactive reconnect after {}s inactivity",
                    idle.as_secs()
                );
                self.teardown(wire).await;
            }
        }
        if wire.writer.is_none() {
            self.establish(wire).await?;
        }
        Ok(())
    }

    fn command_timeout_ms(&self, command: &str) -> u64 {
        if command.contains("set") {
            self.config.set_command_timeout_ms
        } else {
            self.config.get_command_timeout_ms
        }
    }

    /// Send one command line and return the response line
    ///
    /// Connects first if needed. A timeout or connection-class failure
    /// tears the session down and retries the whole exchange exactly once;
    /// a second failure of either class surfaces to the caller. Unexpected
    /// errors tear down and surface without a retry.
    pub async fn send_command(&self, command: &str) -> Result<String> {
        let mut wire = self.wire.lock().await;
        let timeout_ms = self.command_timeout_ms(command);

        let mut attempt = 0;
        loop {
            match self.exchange(&mut wire, command, timeout_ms).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    self.teardown(&mut wire).await;
                    if attempt > 0 {
                        tracing::error!("Command '{}' timed out on retry", command);
                        return Err(e);
                    }
                    tracing::warn!(
                        "Command '{}' timed out after {}ms, retrying once",
                        command,
                        timeout_ms
                    );
                }
                Err(e) if e.is_connection_error() => {
                    self.teardown(&mut wire).await;
                    if attempt > 0 {
                        tracing::error!("Command '{}' failed on retry: {}", command, e);
                        return Err(e);
                    }
                    tracing::warn!("Command '{}' failed: {}. Retrying once.", command, e);
                }
                Err(e) => {
                    tracing::error!("Unexpected error for command '{}': {}", command, e);
                    self.teardown(&mut wire).await;
                    return Err(e);
                }
            }
            attempt += 1;
        }
    }

    async fn exchange(&self, wire: &mut Wire, command: &str, timeout_ms: u64) -> Result<String> {
        self.ensure_connection(wire).await?;

        tracing::debug!("Sending command '{}' (timeout {}ms)", command, timeout_ms);
        let writer = wire
            .writer
            .as_mut()
            .ok_or(ConnectionError::NotConnected)?;
        writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await?;
        writer.flush().await?;

        let reader = wire
            .reader
            .as_mut()
            .ok_or(ConnectionError::NotConnected)?;
        let mut line = String::new();
        let n = match timeout(Duration::from_millis(timeout_ms), reader.read_line(&mut line)).await
        {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(SessionError::CommandTimeout {
                    command: command.to_string(),
                    timeout_ms,
                }
                .into())
            }
        };
        if n == 0 {
            return Err(ConnectionError::ConnectionLost {
                reason: "device closed the connection".to_string(),
            }
            .into());
        }

        // Responses may carry a `>` prompt character; strip it.
        let response = line.replace('>', "").trim().to_string();
        *self.last_activity.lock() = Some(Instant::now());
        tracing::debug!("Response for '{}': '{}'", command, response);
        Ok(response)
    }

    /// Select an input source by its human-facing name
    ///
    /// The Vertex keeps the legacy `input` verb; other models use their
    /// table's source command. Models without one ignore the request.
    pub async fn set_source(&self, source: &str) -> Result<()> {
        let formatted = self.capability.format_source(source);
        if self.capability.model_id == "vertex" {
            self.send_command(&format!("set input {}", formatted)).await?;
        } else if !self.capability.source_command.is_empty() {
            self.send_command(&format!(
                "set {} {}",
                self.capability.source_command, formatted
            ))
            .await?;
        }
        Ok(())
    }

    /// Set the EDID synthesis mode
    pub async fn set_edid_mode(&self, mode: &str) -> Result<()> {
        self.send_command(&format!("set edidmode {}", mode)).await?;
        Ok(())
    }

    /// Set the EDID audio source
    pub async fn set_edid_audio(&self, source: &str) -> Result<()> {
        self.send_command(&format!("set edid audio {}", source))
            .await?;
        Ok(())
    }

    /// Toggle custom HDR metadata injection
    pub async fn set_hdr_custom(&self, enabled: bool) -> Result<()> {
        self.send_command(&format!("set hdrcustom {}", on_off(enabled)))
            .await?;
        Ok(())
    }

    /// Toggle HDR metadata stripping
    pub async fn set_hdr_disable(&self, enabled: bool) -> Result<()> {
        self.send_command(&format!("set hdrdisable {}", on_off(enabled)))
            .await?;
        Ok(())
    }

    /// Toggle the CEC engine
    pub async fn set_cec(&self, enabled: bool) -> Result<()> {
        self.send_command(&format!("set cec {}", on_off(enabled)))
            .await?;
        Ok(())
    }

    /// Set the eARC force mode
    pub async fn set_earc_force(&self, mode: &str) -> Result<()> {
        self.send_command(&format!("set earcforce {}", mode)).await?;
        Ok(())
    }

    /// Toggle the front OLED display
    pub async fn set_oled(&self, enabled: bool) -> Result<()> {
        self.send_command(&format!("set oled {}", on_off(enabled)))
            .await?;
        Ok(())
    }

    /// Toggle input autoswitching
    pub async fn set_autoswitch(&self, enabled: bool) -> Result<()> {
        self.send_command(&format!("set autosw {}", on_off(enabled)))
            .await?;
        Ok(())
    }

    /// Set the HDCP output mode
    ///
    /// Command identifiers cannot carry dots, so "14" arrives for "1.4".
    pub async fn set_hdcp_mode(&self, mode: &str) -> Result<()> {
        let mode = if mode == "14" { "1.4" } else { mode };
        self.send_command(&format!("set hdcp {}", mode)).await?;
        Ok(())
    }

    /// Set the scaler mode
    ///
    /// The Arcana2 names its scaler verb `scalemode`; everything else
    /// uses `scale`.
    pub async fn set_scale_mode(&self, mode: &str) -> Result<()> {
        if self.capability.model_id == "arcana2" {
            self.send_command(&format!("set scalemode {}", mode)).await?;
        } else {
            self.send_command(&format!("set scale {}", mode)).await?;
        }
        Ok(())
    }

    /// Set the audio routing mode
    pub async fn set_audio_mode(&self, mode: &str) -> Result<()> {
        self.send_command(&format!("set audiomode {}", mode)).await?;
        Ok(())
    }

    /// Set the Ambilight LED profile video mode
    pub async fn set_ledprofilevideo_mode(&self, mode: &str) -> Result<()> {
        self.send_command(&format!("set ledprofilevideo {}", mode))
            .await?;
        Ok(())
    }

    /// Probe liveness with a lightweight query
    ///
    /// Uses the input-select query when the model has inputs, the version
    /// query otherwise. All errors are swallowed into `false`.
    pub async fn heartbeat(&self) -> bool {
        let probe = if self.capability.has_inputs() {
            "get insel"
        } else {
            "get ver"
        };
        match self.send_command(probe).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Heartbeat failed: {}", e);
                false
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
