//! PulseAudio backend
//!
//! Polls the server's default sink from a background thread and reports a
//! change whenever the default sink's description changes. Controllers are
//! not `Send`, so every thread (and every volume operation) opens its own.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use libpulse_binding::volume::{ChannelVolumes, Volume};
use parking_lot::Mutex;
use pulsectl::controllers::types::DeviceInfo;
use pulsectl::controllers::{DeviceControl, SinkController};

use crate::{AudioError, DeviceChangeCallback, DeviceObserver, OutputDevice, Result, VolumeControl};

/// Default interval between two polls of the default sink
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn connect() -> Result<SinkController> {
    SinkController::create().map_err(|e| AudioError::Backend(e.to_string()))
}

fn default_sink(controller: &mut SinkController) -> Result<Option<DeviceInfo>> {
    let server = controller
        .get_server_info()
        .map_err(|e| AudioError::Backend(e.to_string()))?;
    let Some(name) = server.default_sink_name else {
        return Ok(None);
    };
    controller
        .get_device_by_name(&name)
        .map(Some)
        .map_err(|e| AudioError::DeviceUnavailable(format!("{}: {}", name, e)))
}

fn to_scalar(volume: Volume) -> f32 {
    (volume.0 as f64 / Volume::NORMAL.0 as f64).clamp(0.0, 1.0) as f32
}

fn from_scalar(level: f32) -> Volume {
    Volume((level.clamp(0.0, 1.0) as f64 * Volume::NORMAL.0 as f64).round() as u32)
}

/// Volume of one sink, read and written live through the server
///
/// The master level is the loudest channel. Setting it rescales every
/// channel proportionally, preserving balance.
#[derive(Debug)]
pub struct PulseVolume {
    sink_index: u32,
}

impl PulseVolume {
    fn read(&self) -> Result<(SinkController, ChannelVolumes)> {
        let mut controller = connect()?;
        let device = controller
            .get_device_by_index(self.sink_index)
            .map_err(|e| AudioError::DeviceUnavailable(format!("sink #{}: {}", self.sink_index, e)))?;
        Ok((controller, device.volume))
    }

    fn write(&self, controller: &mut SinkController, volumes: &ChannelVolumes) {
        controller.set_device_volume_by_index(self.sink_index, volumes);
    }
}

impl VolumeControl for PulseVolume {
    fn master_level(&self) -> Result<f32> {
        let (_, volumes) = self.read()?;
        Ok(to_scalar(volumes.max()))
    }

    fn set_master_level(&self, level: f32) -> Result<()> {
        let (mut controller, mut volumes) = self.read()?;
        let max = volumes.max().0;
        let target = from_scalar(level).0;
        for channel in volumes.get_mut() {
            channel.0 = if max == 0 {
                target
            } else {
                ((channel.0 as u64 * target as u64) / max as u64) as u32
            };
        }
        self.write(&mut controller, &volumes);
        Ok(())
    }

    fn channel_count(&self) -> Result<usize> {
        let (_, volumes) = self.read()?;
        Ok(volumes.len() as usize)
    }

    fn channel_level(&self, channel: usize) -> Result<f32> {
        let (_, volumes) = self.read()?;
        volumes
            .get()
            .get(channel)
            .map(|v| to_scalar(*v))
            .ok_or(AudioError::ChannelOutOfRange {
                index: channel,
                count: volumes.len() as usize,
            })
    }

    fn set_channel_level(&self, channel: usize, level: f32) -> Result<()> {
        let (mut controller, mut volumes) = self.read()?;
        let count = volumes.len() as usize;
        let slot = volumes
            .get_mut()
            .get_mut(channel)
            .ok_or(AudioError::ChannelOutOfRange { index: channel, count })?;
        *slot = from_scalar(level);
        self.write(&mut controller, &volumes);
        Ok(())
    }
}

/// A PulseAudio sink
#[derive(Debug)]
pub struct PulseDevice {
    name: String,
    volume: PulseVolume,
}

impl PulseDevice {
    fn from_info(info: &DeviceInfo) -> Self {
        let name = info
            .description
            .clone()
            .or_else(|| info.name.clone())
            .unwrap_or_default();
        Self {
            name,
            volume: PulseVolume {
                sink_index: info.index,
            },
        }
    }
}

impl OutputDevice for PulseDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume(&self) -> Option<&dyn VolumeControl> {
        Some(&self.volume)
    }
}

type Current = Arc<Mutex<Option<Arc<dyn OutputDevice>>>>;

/// Observer that polls the PulseAudio default sink
pub struct PulseObserver {
    poll_interval: Duration,
    current: Current,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
}

impl PulseObserver {
    /// Connect to the server and read the current default sink
    pub fn new(poll_interval: Duration) -> Result<Self> {
        let mut controller = connect()?;
        let current = default_sink(&mut controller)?
            .map(|info| Arc::new(PulseDevice::from_info(&info)) as Arc<dyn OutputDevice>);

        tracing::info!(
            "Connected to PulseAudio, default output is {:?}",
            current.as_ref().map(|d| d.name().to_string())
        );

        Ok(Self {
            poll_interval,
            current: Arc::new(Mutex::new(current)),
            stop_tx: None,
            worker: None,
            closed: false,
        })
    }
}

impl DeviceObserver for PulseObserver {
    fn current(&self) -> Option<Arc<dyn OutputDevice>> {
        self.current.lock().clone()
    }

    fn subscribe(&mut self, on_change: DeviceChangeCallback) -> Result<()> {
        if self.closed {
            return Err(AudioError::Closed);
        }
        if self.worker.is_some() {
            return Err(AudioError::AlreadySubscribed);
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let current = Arc::clone(&self.current);
        let interval = self.poll_interval;

        let worker = thread::Builder::new()
            .name("pulse-observer".to_string())
            .spawn(move || run_poll_loop(interval, current, stop_rx, on_change))
            .map_err(|e| AudioError::Backend(format!("failed to spawn poll thread: {}", e)))?;

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Dropping the sender wakes the worker.
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("PulseAudio poll thread panicked");
            }
        }
        tracing::debug!("PulseAudio observer closed");
    }
}

impl Drop for PulseObserver {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_poll_loop(
    interval: Duration,
    current: Current,
    stop_rx: mpsc::Receiver<()>,
    on_change: DeviceChangeCallback,
) {
    let mut controller = match connect() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("PulseAudio poll thread could not connect: {}", e);
            return;
        }
    };

    let mut last_name = current.lock().as_ref().map(|d| d.name().to_string());
    tracing::debug!("PulseAudio poll thread started");

    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let device = match default_sink(&mut controller) {
            Ok(info) => info.map(|info| Arc::new(PulseDevice::from_info(&info)) as Arc<dyn OutputDevice>),
            Err(e) => {
                tracing::warn!("Failed to read default sink: {}", e);
                continue;
            }
        };

        let name = device.as_ref().map(|d| d.name().to_string());
        if name == last_name {
            continue;
        }

        tracing::debug!("Default output changed: {:?} -> {:?}", last_name, name);
        last_name = name;
        *current.lock() = device.clone();
        on_change(device);
    }

    tracing::debug!("PulseAudio poll thread stopped");
}
