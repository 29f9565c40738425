//! Controller lifecycle and command flow against a loopback device

mod support;

use async_trait::async_trait;
use hdfurykit_communication::config::{
    DeviceConfig, KeepAliveConfig, PipelineConfig, SessionConfig,
};
use hdfurykit_communication::controller::DeviceController;
use hdfurykit_core::{DeviceListener, DeviceState, PowerState, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use support::FakeDevice;
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

struct RecordingListener {
    states: Arc<AsyncMutex<Vec<DeviceState>>>,
}

#[async_trait]
impl DeviceListener for RecordingListener {
    async fn on_state_changed(&self, state: &DeviceState) {
        self.states.lock().await.push(state.clone());
    }
}

fn fast_session_config() -> SessionConfig {
    SessionConfig {
        connect_timeout_ms: 1_000,
        banner_timeout_ms: 50,
        set_command_timeout_ms: 500,
        get_command_timeout_ms: 300,
        idle_reconnect_ms: 60_000,
    }
}

fn controller_for(device: &FakeDevice) -> DeviceController {
    DeviceController::with_configs(
        DeviceConfig::new("127.0.0.1", "vrroom").with_port(device.addr.port()),
        fast_session_config(),
        PipelineConfig {
            min_command_interval_ms: 10,
            enqueue_timeout_ms: 2_000,
        },
        KeepAliveConfig {
            interval_ms: 50,
            idle_threshold_ms: 10,
        },
    )
}

fn recording() -> (Arc<RecordingListener>, Arc<AsyncMutex<Vec<DeviceState>>>) {
    let states = Arc::new(AsyncMutex::new(Vec::new()));
    (
        Arc::new(RecordingListener {
            states: states.clone(),
        }),
        states,
    )
}

#[tokio::test]
async fn start_connects_and_reports_ready() {
    let device = FakeDevice::spawn().await;
    let controller = controller_for(&device);
    let (listener, states) = recording();
    controller.register_listener(listener);

    controller.start().await;

    let state = controller.state();
    assert_eq!(state.power, PowerState::On);
    assert_eq!(state.title, "Ready");

    {
        let states = states.lock().await;
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].power, PowerState::On);
    }
    controller.stop().await;
}

#[tokio::test]
async fn source_selection_flows_to_the_wire_and_back_into_state() {
    let device = FakeDevice::spawn().await;
    let controller = controller_for(&device);
    let (listener, states) = recording();
    controller.register_listener(listener);

    controller.start().await;

    let args = serde_json::json!({ "command": "set_source_HDMI_1" });
    let status = controller.handle_command("remote.send_cmd", Some(&args)).await;
    assert_eq!(status, StatusCode::Ok);

    assert_eq!(device.commands(), vec!["set inseltx0 1"]);
    assert_eq!(controller.state().current_source.as_deref(), Some("HDMI 1"));

    {
        let states = states.lock().await;
        let last = states.last().unwrap();
        assert_eq!(last.current_source.as_deref(), Some("HDMI 1"));
    }
    controller.stop().await;
}

#[tokio::test]
async fn unknown_command_is_rejected_without_wire_traffic() {
    let device = FakeDevice::spawn().await;
    let controller = controller_for(&device);
    controller.start().await;

    let args = serde_json::json!({ "command": "set_volume_5" });
    let status = controller.handle_command("remote.send_cmd", Some(&args)).await;
    assert_eq!(status, StatusCode::NotImplemented);
    assert!(device.commands().is_empty());
    controller.stop().await;
}

#[tokio::test]
async fn failed_start_reports_connection_error() {
    // Grab a port nobody is listening on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let controller = DeviceController::with_configs(
        DeviceConfig::new("127.0.0.1", "vrroom").with_port(port),
        fast_session_config(),
        PipelineConfig::default(),
        KeepAliveConfig::default(),
    );
    let (listener, states) = recording();
    controller.register_listener(listener);

    controller.start().await;

    let state = controller.state();
    assert_eq!(state.power, PowerState::Unavailable);
    assert_eq!(state.title, "Connection Error");
    assert_eq!(states.lock().await.len(), 1);
    controller.stop().await;
}

#[tokio::test]
async fn keep_alive_reconnects_a_lost_session() {
    let device = FakeDevice::spawn().await;
    let controller = controller_for(&device);
    let (listener, states) = recording();
    controller.register_listener(listener);

    controller.start().await;
    assert_eq!(controller.state().power, PowerState::On);

    // Simulate the device dropping the link.
    controller.session().disconnect().await;

    sleep(Duration::from_millis(300)).await;

    let states = states.lock().await;
    let transitions: Vec<_> = states
        .iter()
        .map(|s| (s.power, s.title.clone()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (PowerState::On, "Ready".to_string()),
            (PowerState::Unavailable, "Connection Lost".to_string()),
            (PowerState::On, "Ready".to_string()),
        ]
    );
    assert_eq!(device.connection_count(), 2);
    drop(states);
    controller.stop().await;
}

#[tokio::test]
async fn stop_makes_the_controller_unavailable() {
    let device = FakeDevice::spawn().await;
    let controller = controller_for(&device);
    controller.start().await;
    controller.stop().await;

    assert_eq!(controller.state().power, PowerState::Unavailable);

    let args = serde_json::json!({ "command": "set_cec_on" });
    assert_eq!(
        controller.handle_command("remote.send_cmd", Some(&args)).await,
        StatusCode::ServerError
    );
}
