//! # HDFuryKit
//!
//! A Rust control library for HDFury HDMI processors (VRRooM, Vertex²,
//! Vertex, Diva, Maestro, Arcana², Dr.HDMI 8K) over their TCP line
//! protocol.
//!
//! ## Architecture
//!
//! HDFuryKit is organized as a workspace with multiple crates:
//!
//! 1. **hdfurykit-core** - Error types, device state, status codes, listener traits
//! 2. **hdfurykit-communication** - TCP session, command pipeline, controller, model tables
//! 3. **hdfurykit** - Facade crate re-exporting the public API
//!
//! ## Features
//!
//! - **Per-Model Capability Tables**: inputs, EDID, HDR, CEC, eARC, HDCP, scaler, audio, LED
//! - **Serialized Command Pipeline**: FIFO ordering with enforced inter-command spacing
//! - **Resilient TCP Session**: banner drain, prompt stripping, bounded retry, idle reconnect
//! - **Keep-Alive Loop**: idle health checks with automatic reconnection and state notifications

pub use hdfurykit_core::{
    ConnectionError, DeviceListener, DeviceListenerHandle, DeviceState, Error, PowerState, Result,
    SessionError, StatusCode,
};

pub use hdfurykit_communication::{
    capability_for, simple_command_ids, CommandDispatcher, CommandPipeline, DeviceCommand,
    DeviceConfig, DeviceController, DeviceSession, KeepAliveConfig, ModelCapability,
    PipelineConfig, PipelineStats, SessionConfig, MODELS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
