//! Output device and volume control contracts

use crate::Result;

/// Volume levels of an output device
///
/// All levels are linear scalars in `[0, 1]`. Implementations are handles onto
/// a live device, so setters take `&self`.
pub trait VolumeControl: Send + Sync {
    /// Current master level
    fn master_level(&self) -> Result<f32>;

    /// Set the master level
    fn set_master_level(&self, level: f32) -> Result<()>;

    /// Number of channels in the device's channel map
    fn channel_count(&self) -> Result<usize>;

    /// Current level of one channel
    fn channel_level(&self, channel: usize) -> Result<f32>;

    /// Set the level of one channel
    fn set_channel_level(&self, channel: usize, level: f32) -> Result<()>;
}

/// Snapshot of an audio output device
pub trait OutputDevice: Send + Sync {
    /// Identity used for target matching (the user-facing device name)
    fn name(&self) -> &str;

    /// Volume controls, if the backend exposes them
    fn volume(&self) -> Option<&dyn VolumeControl>;
}

impl std::fmt::Debug for dyn OutputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputDevice")
            .field("name", &self.name())
            .field("has_volume", &self.volume().is_some())
            .finish()
    }
}

/// Whether a device name identifies the configured target
///
/// Matches the exact name, or the `"<target> (<adapter>)"` form used for
/// endpoint friendly names (e.g. `"Speakers (Realtek Audio)"` for target
/// `"Speakers"`).
pub fn matches_target(name: &str, target: &str) -> bool {
    if name == target {
        return true;
    }
    name.strip_prefix(target)
        .and_then(|rest| rest.strip_prefix(" ("))
        .map(|rest| rest.len() > 1 && rest.ends_with(')'))
        .unwrap_or(false)
}
