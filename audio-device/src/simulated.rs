//! In-memory observer and devices
//!
//! Used by tests and by the `stdin` source of the binary, where default device
//! changes are driven programmatically instead of by an audio server.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AudioError, DeviceChangeCallback, DeviceObserver, OutputDevice, Result, VolumeControl};

#[derive(Debug, Clone)]
struct Levels {
    master: f32,
    channels: Vec<f32>,
}

/// Volume control backed by plain values
///
/// Master and channel levels are stored independently; setting one never
/// rescales the other.
#[derive(Debug)]
pub struct SimulatedVolume {
    levels: Mutex<Levels>,
}

impl SimulatedVolume {
    /// `channels` channels, each at `master`
    pub fn new(master: f32, channels: usize) -> Self {
        Self::with_levels(master, vec![master; channels])
    }

    pub fn with_levels(master: f32, channels: Vec<f32>) -> Self {
        Self {
            levels: Mutex::new(Levels {
                master: master.clamp(0.0, 1.0),
                channels: channels.into_iter().map(|l| l.clamp(0.0, 1.0)).collect(),
            }),
        }
    }

    pub fn master(&self) -> f32 {
        self.levels.lock().master
    }

    pub fn channel_levels(&self) -> Vec<f32> {
        self.levels.lock().channels.clone()
    }
}

impl VolumeControl for SimulatedVolume {
    fn master_level(&self) -> Result<f32> {
        Ok(self.levels.lock().master)
    }

    fn set_master_level(&self, level: f32) -> Result<()> {
        self.levels.lock().master = level.clamp(0.0, 1.0);
        Ok(())
    }

    fn channel_count(&self) -> Result<usize> {
        Ok(self.levels.lock().channels.len())
    }

    fn channel_level(&self, channel: usize) -> Result<f32> {
        let levels = self.levels.lock();
        levels
            .channels
            .get(channel)
            .copied()
            .ok_or(AudioError::ChannelOutOfRange {
                index: channel,
                count: levels.channels.len(),
            })
    }

    fn set_channel_level(&self, channel: usize, level: f32) -> Result<()> {
        let mut levels = self.levels.lock();
        let count = levels.channels.len();
        let slot = levels
            .channels
            .get_mut(channel)
            .ok_or(AudioError::ChannelOutOfRange { index: channel, count })?;
        *slot = level.clamp(0.0, 1.0);
        Ok(())
    }
}

/// A named device with an optional [`SimulatedVolume`]
#[derive(Debug)]
pub struct SimulatedDevice {
    name: String,
    volume: Option<SimulatedVolume>,
}

impl SimulatedDevice {
    /// Device without volume controls
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: None,
        }
    }

    pub fn with_volume(name: impl Into<String>, volume: SimulatedVolume) -> Self {
        Self {
            name: name.into(),
            volume: Some(volume),
        }
    }

    /// Two-channel device with both channels at `master`
    pub fn stereo(name: impl Into<String>, master: f32) -> Self {
        Self::with_volume(name, SimulatedVolume::new(master, 2))
    }

    pub fn simulated_volume(&self) -> Option<&SimulatedVolume> {
        self.volume.as_ref()
    }
}

impl OutputDevice for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume(&self) -> Option<&dyn VolumeControl> {
        self.volume.as_ref().map(|v| v as &dyn VolumeControl)
    }
}

#[derive(Default)]
struct Shared {
    current: Option<Arc<dyn OutputDevice>>,
    callback: Option<DeviceChangeCallback>,
    closed: bool,
}

/// Observer whose default device is set by hand
///
/// Clones share state, so one clone can be handed to the consumer while
/// another drives changes. Changes from several threads are delivered in the
/// order they were applied; the subscriber must not change the default from
/// inside its callback.
#[derive(Clone, Default)]
pub struct SimulatedObserver {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Mutex<()>>,
}

impl SimulatedObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer that starts with `device` as the default output
    pub fn with_default(device: Arc<dyn OutputDevice>) -> Self {
        let observer = Self::new();
        observer.shared.lock().current = Some(device);
        observer
    }

    /// Make `device` the default output
    ///
    /// Returns whether the subscriber was notified.
    pub fn set_default(&self, device: Arc<dyn OutputDevice>) -> bool {
        self.replace(Some(device))
    }

    /// Remove the default output
    pub fn clear_default(&self) -> bool {
        self.replace(None)
    }

    pub fn is_subscribed(&self) -> bool {
        self.shared.lock().callback.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    fn replace(&self, device: Option<Arc<dyn OutputDevice>>) -> bool {
        // Held across update and callback so notifications keep update order.
        // The state lock is released first so the subscriber may query us.
        let _notify = self.notify.lock();
        let callback = {
            let mut shared = self.shared.lock();
            let old_name = shared.current.as_ref().map(|d| d.name().to_string());
            let new_name = device.as_ref().map(|d| d.name().to_string());
            shared.current = device.clone();

            if old_name == new_name {
                tracing::trace!("Default output unchanged ({:?})", new_name);
                return false;
            }
            match &shared.callback {
                Some(callback) => Arc::clone(callback),
                None => return false,
            }
        };

        callback(device);
        true
    }
}

impl DeviceObserver for SimulatedObserver {
    fn current(&self) -> Option<Arc<dyn OutputDevice>> {
        self.shared.lock().current.clone()
    }

    fn subscribe(&mut self, on_change: DeviceChangeCallback) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.closed {
            return Err(AudioError::Closed);
        }
        if shared.callback.is_some() {
            return Err(AudioError::AlreadySubscribed);
        }
        shared.callback = Some(on_change);
        Ok(())
    }

    fn close(&mut self) {
        let mut shared = self.shared.lock();
        shared.callback = None;
        shared.closed = true;
    }
}
