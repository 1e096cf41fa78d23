//! Default output device observation

use std::sync::Arc;

use crate::{OutputDevice, Result};

/// Callback invoked with the new default output device, or `None` when there
/// is no default output
///
/// Callbacks run on the observer's notification thread and must not panic.
pub type DeviceChangeCallback = Arc<dyn Fn(Option<Arc<dyn OutputDevice>>) + Send + Sync>;

/// Source of default output device changes
pub trait DeviceObserver: Send {
    /// The default output device right now
    fn current(&self) -> Option<Arc<dyn OutputDevice>>;

    /// Register the single change subscriber
    ///
    /// Observers notify only when the default device actually changes, and
    /// never from within `subscribe` itself.
    fn subscribe(&mut self, on_change: DeviceChangeCallback) -> Result<()>;

    /// Drop the subscription and release backend resources
    ///
    /// Calling `close` more than once is a no-op. No callback is started after
    /// `close` returns.
    fn close(&mut self);
}
