//! Device listener interface
//!
//! Defines the listener trait for device state change notifications

use crate::state::DeviceState;
use async_trait::async_trait;

/// Handle for a registered device listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from device state notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceListenerHandle(pub String);

/// Listener trait for device state changes
///
/// Implement this trait to receive the full device-state snapshot whenever
/// lifecycle state, current source, or title fields change. Notifications
/// are awaited in the task that performed the mutation, so observers see
/// them in mutation order.
#[async_trait]
pub trait DeviceListener: Send + Sync {
    /// Called with a snapshot after the device state changed
    async fn on_state_changed(&self, _state: &DeviceState) {}
}
