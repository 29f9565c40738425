//! Device controller
//!
//! Orchestrates one HDFury unit: translates command identifiers into
//! session calls, owns the lifecycle state machine, runs the keep-alive
//! loop, and notifies registered listeners with state snapshots.

use crate::command::DeviceCommand;
use crate::config::{DeviceConfig, KeepAliveConfig, PipelineConfig, SessionConfig};
use crate::models::{self, ModelCapability};
use crate::pipeline::{CommandDispatcher, CommandPipeline, PipelineStats};
use crate::session::DeviceSession;
use async_trait::async_trait;
use hdfurykit_core::{DeviceListener, DeviceListenerHandle, DeviceState, PowerState, StatusCode};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

type ListenerMap = HashMap<String, Arc<dyn DeviceListener>>;

/// Executes decoded commands against the session
///
/// A single command failure never tears the lifecycle down; it is folded
/// into `ServerError` and the session recovers on its own.
struct SessionDispatcher {
    session: Arc<DeviceSession>,
    state: Arc<RwLock<DeviceState>>,
}

#[async_trait]
impl CommandDispatcher for SessionDispatcher {
    async fn dispatch(&self, command: &str) -> StatusCode {
        let Some(decoded) = DeviceCommand::parse(command) else {
            tracing::warn!("Unsupported command: {}", command);
            return StatusCode::NotImplemented;
        };

        let result = match &decoded {
            DeviceCommand::SelectSource(source) => self.session.set_source(source).await,
            DeviceCommand::EdidMode(mode) => self.session.set_edid_mode(mode).await,
            DeviceCommand::EdidAudio(source) => self.session.set_edid_audio(source).await,
            DeviceCommand::HdrCustom(enabled) => self.session.set_hdr_custom(*enabled).await,
            DeviceCommand::HdrDisable(enabled) => self.session.set_hdr_disable(*enabled).await,
            DeviceCommand::Cec(enabled) => self.session.set_cec(*enabled).await,
            DeviceCommand::EarcForce(mode) => self.session.set_earc_force(mode).await,
            DeviceCommand::Oled(enabled) => self.session.set_oled(*enabled).await,
            DeviceCommand::Autoswitch(enabled) => self.session.set_autoswitch(*enabled).await,
            DeviceCommand::HdcpMode(mode) => self.session.set_hdcp_mode(mode).await,
            DeviceCommand::ScaleMode(mode) => self.session.set_scale_mode(mode).await,
            DeviceCommand::AudioMode(mode) => self.session.set_audio_mode(mode).await,
            DeviceCommand::LedProfileVideo(mode) => {
                self.session.set_ledprofilevideo_mode(mode).await
            }
        };

        match result {
            Ok(()) => {
                if let DeviceCommand::SelectSource(source) = decoded {
                    self.state.write().current_source = Some(source);
                }
                StatusCode::Ok
            }
            Err(e) => {
                tracing::error!("Error executing command '{}': {}", command, e);
                StatusCode::ServerError
            }
        }
    }
}

/// Controller for one HDFury unit
pub struct DeviceController {
    device_id: String,
    name: String,
    host: String,
    capability: &'static ModelCapability,
    session: Arc<DeviceSession>,
    state: Arc<RwLock<DeviceState>>,
    listeners: Arc<RwLock<ListenerMap>>,
    pipeline: Mutex<Option<Arc<CommandPipeline>>>,
    keep_alive: Mutex<Option<(mpsc::Sender<()>, JoinHandle<()>)>>,
    pipeline_config: PipelineConfig,
    keep_alive_config: KeepAliveConfig,
}

impl DeviceController {
    /// Create a controller with default timing
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_configs(
            config,
            SessionConfig::default(),
            PipelineConfig::default(),
            KeepAliveConfig::default(),
        )
    }

    /// Create a controller with explicit timing configuration
    pub fn with_configs(
        config: DeviceConfig,
        session_config: SessionConfig,
        pipeline_config: PipelineConfig,
        keep_alive_config: KeepAliveConfig,
    ) -> Self {
        let capability = models::capability_for(&config.model);
        let port = config.port.unwrap_or(capability.default_port);
        let session = Arc::new(DeviceSession::new(
            config.host.clone(),
            port,
            capability,
            session_config,
        ));

        Self {
            device_id: format!("hdfury-{}", config.host.replace('.', "-")),
            name: format!("HDFury {}", capability.display_name),
            host: config.host,
            capability,
            session,
            state: Arc::new(RwLock::new(DeviceState::default())),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            pipeline: Mutex::new(None),
            keep_alive: Mutex::new(None),
            pipeline_config,
            keep_alive_config,
        }
    }

    /// Stable identifier derived from the host
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Display name ("HDFury VRRooM")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capability table driving this controller
    pub fn capability(&self) -> &'static ModelCapability {
        self.capability
    }

    /// The underlying session
    pub fn session(&self) -> Arc<DeviceSession> {
        self.session.clone()
    }

    /// Snapshot of the current device state
    pub fn state(&self) -> DeviceState {
        self.state.read().clone()
    }

    /// Register a listener for state change notifications
    pub fn register_listener(&self, listener: Arc<dyn DeviceListener>) -> DeviceListenerHandle {
        let id = Uuid::new_v4().to_string();
        let handle = DeviceListenerHandle(id.clone());
        self.listeners.write().insert(id, listener);
        handle
    }

    /// Remove a previously registered listener
    pub fn unregister_listener(&self, handle: DeviceListenerHandle) {
        let _ = self.listeners.write().remove(&handle.0);
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Start the pipeline, connect, and begin keep-alive
    ///
    /// Emits a state notification whether or not the connect succeeded.
    /// Idempotent with respect to the background tasks.
    pub async fn start(&self) {
        tracing::info!("Starting connection for {}", self.host);

        {
            let mut pipeline = self.pipeline.lock();
            if pipeline.is_none() {
                let dispatcher = Arc::new(SessionDispatcher {
                    session: self.session.clone(),
                    state: self.state.clone(),
                });
                *pipeline = Some(Arc::new(CommandPipeline::spawn(
                    dispatcher,
                    self.pipeline_config.clone(),
                )));
            }
        }

        let connected = if self.session.is_connected() {
            Ok(())
        } else {
            self.session.connect().await
        };

        match connected {
            Ok(()) => {
                {
                    let mut state = self.state.write();
                    state.power = PowerState::On;
                    state.title = "Ready".to_string();
                    state.subtitle = String::new();
                }
                if let Some(stats) = self.pipeline_stats() {
                    stats.mark_success_now();
                }
                self.start_keep_alive();
            }
            Err(e) => {
                tracing::error!("Device connection error: {}", e);
                let mut state = self.state.write();
                state.power = PowerState::Unavailable;
                state.title = "Connection Error".to_string();
                state.subtitle = String::new();
            }
        }

        notify_listeners(&self.listeners, &self.state).await;
    }

    /// Stop background tasks, disconnect, and mark the device unavailable
    pub async fn stop(&self) {
        tracing::info!("Stopping connection to {}", self.host);

        let pipeline = self.pipeline.lock().take();
        if let Some(pipeline) = pipeline {
            pipeline.shutdown().await;
        }

        let keep_alive = self.keep_alive.lock().take();
        if let Some((shutdown, worker)) = keep_alive {
            let _ = shutdown.try_send(());
            worker.abort();
            let _ = worker.await;
        }

        if self.session.is_connected() {
            self.session.disconnect().await;
        }

        self.state.write().power = PowerState::Unavailable;
        notify_listeners(&self.listeners, &self.state).await;
    }

    /// Caller-facing entry point
    ///
    /// `args` must carry a `command` field naming the identifier to run;
    /// the outer `cmd_id` only labels the request for logging.
    pub async fn handle_command(
        &self,
        cmd_id: &str,
        args: Option<&serde_json::Value>,
    ) -> StatusCode {
        let Some(command) = args
            .and_then(|args| args.get("command"))
            .and_then(|command| command.as_str())
            .map(str::to_string)
        else {
            tracing::error!("Received remote command without an actual command: {}", cmd_id);
            return StatusCode::BadRequest;
        };

        tracing::info!("Received remote command: {}", command);

        let pipeline = self.pipeline.lock().clone();
        let Some(pipeline) = pipeline else {
            tracing::error!("Command '{}' received while controller is stopped", command);
            return StatusCode::ServerError;
        };

        let result = pipeline.enqueue(&command).await;
        if result == StatusCode::Ok {
            notify_listeners(&self.listeners, &self.state).await;
        }
        result
    }

    fn pipeline_stats(&self) -> Option<Arc<PipelineStats>> {
        self.pipeline.lock().as_ref().map(|p| p.stats())
    }

    /// Spawn the keep-alive loop; no-op when already running
    fn start_keep_alive(&self) {
        let mut keep_alive = self.keep_alive.lock();
        if keep_alive.is_some() {
            return;
        }
        let Some(stats) = self.pipeline.lock().as_ref().map(|p| p.stats()) else {
            return;
        };

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let session = self.session.clone();
        let state = self.state.clone();
        let listeners = self.listeners.clone();
        let config = self.keep_alive_config.clone();
        let host = self.host.clone();

        let worker = tokio::spawn(async move {
            tracing::info!("Starting keep-alive loop for {}", host);
            let interval = Duration::from_millis(config.interval_ms);
            let idle_threshold = Duration::from_millis(config.idle_threshold_ms);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = sleep(interval) => {}
                }

                // Never probe while real traffic is moving.
                if stats.is_busy() {
                    continue;
                }

                let idle = match stats.time_since_success() {
                    Some(idle) => idle,
                    None => continue,
                };
                if idle <= idle_threshold {
                    continue;
                }

                tracing::debug!(
                    "Connection idle for {}s, checking health",
                    idle.as_secs()
                );
                if session.is_connected() {
                    continue;
                }

                tracing::warn!("Connection lost for {}", host);
                let newly_lost = {
                    let mut state = state.write();
                    if state.power != PowerState::Unavailable {
                        state.power = PowerState::Unavailable;
                        state.title = "Connection Lost".to_string();
                        true
                    } else {
                        false
                    }
                };
                if newly_lost {
                    notify_listeners(&listeners, &state).await;
                }

                match session.connect().await {
                    Ok(()) => {
                        {
                            let mut state = state.write();
                            state.power = PowerState::On;
                            state.title = "Ready".to_string();
                        }
                        stats.mark_success_now();
                        notify_listeners(&listeners, &state).await;
                        tracing::info!("Reconnected to {}", host);
                    }
                    Err(e) => {
                        tracing::warn!("Reconnection failed for {}: {}", host, e);
                    }
                }
            }
            tracing::info!("Keep-alive loop cancelled for {}", host);
        });

        *keep_alive = Some((shutdown_tx, worker));
    }
}

/// Push a state snapshot to every listener, in registration-map order
///
/// Awaited in the mutating task so observers see notifications in the
/// same order as the mutations that caused them.
async fn notify_listeners(listeners: &RwLock<ListenerMap>, state: &RwLock<DeviceState>) {
    let snapshot = state.read().clone();
    let subscribers: Vec<_> = listeners.read().values().cloned().collect();
    for listener in subscribers {
        listener.on_state_changed(&snapshot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex as AsyncMutex;

    struct TestListener {
        states: Arc<AsyncMutex<Vec<DeviceState>>>,
    }

    #[async_trait]
    impl DeviceListener for TestListener {
        async fn on_state_changed(&self, state: &DeviceState) {
            self.states.lock().await.push(state.clone());
        }
    }

    fn controller() -> DeviceController {
        DeviceController::new(DeviceConfig::new("192.168.1.50", "vrroom"))
    }

    #[test]
    fn identity_is_derived_from_host_and_model() {
        let controller = controller();
        assert_eq!(controller.device_id(), "hdfury-192-168-1-50");
        assert_eq!(controller.name(), "HDFury VRRooM");
        assert_eq!(controller.capability().model_id, "vrroom");
    }

    #[test]
    fn register_unregister_listener() {
        let controller = controller();
        let listener = Arc::new(TestListener {
            states: Arc::new(AsyncMutex::new(Vec::new())),
        });
        let handle = controller.register_listener(listener);
        assert_eq!(controller.listener_count(), 1);
        controller.unregister_listener(handle);
        assert_eq!(controller.listener_count(), 0);
    }

    #[tokio::test]
    async fn missing_command_payload_is_bad_request() {
        let controller = controller();
        assert_eq!(
            controller.handle_command("cmd1", None).await,
            StatusCode::BadRequest
        );
        let args = serde_json::json!({ "other": "set_cec_on" });
        assert_eq!(
            controller.handle_command("cmd1", Some(&args)).await,
            StatusCode::BadRequest
        );
    }

    #[tokio::test]
    async fn command_before_start_is_server_error() {
        let controller = controller();
        let args = serde_json::json!({ "command": "set_cec_on" });
        assert_eq!(
            controller.handle_command("cmd1", Some(&args)).await,
            StatusCode::ServerError
        );
    }
}
