//! Device communication for HDFury HDMI processors
//!
//! The units speak a line protocol over TCP: one command per line, one
//! reply line per command, with a few quirks (welcome banners, `>`
//! prompts, dropped lines when commands arrive back to back). This crate
//! layers a session, a serialized command pipeline, and a controller on
//! top of that protocol.

pub mod command;
pub mod config;
pub mod controller;
pub mod models;
pub mod pipeline;
pub mod session;

pub use command::{simple_command_ids, DeviceCommand};
pub use config::{DeviceConfig, KeepAliveConfig, PipelineConfig, SessionConfig};
pub use controller::DeviceController;
pub use models::{capability_for, ModelCapability, MODELS};
pub use pipeline::{CommandDispatcher, CommandPipeline, PipelineStats};
pub use session::DeviceSession;
