//! # Audio device observation
//!
//! Contracts for watching the system's default audio output device and
//! adjusting its volume, plus two implementations:
//!
//! - [`SimulatedObserver`]: an in-memory observer driven by hand
//! - [`pulse::PulseObserver`] (feature `pulse`): polls the PulseAudio default sink
//!
//! ```rust
//! use std::sync::Arc;
//! use audio_device::{DeviceObserver, OutputDevice, SimulatedDevice, SimulatedObserver};
//!
//! let mut observer = SimulatedObserver::new();
//! let driver = observer.clone();
//!
//! observer
//!     .subscribe(Arc::new(|device: Option<Arc<dyn OutputDevice>>| {
//!         println!("default output: {:?}", device.map(|d| d.name().to_string()));
//!     }))
//!     .unwrap();
//!
//! driver.set_default(Arc::new(SimulatedDevice::stereo("Speakers", 0.5)));
//! ```

mod device;
mod error;
mod observer;
mod simulated;

#[cfg(feature = "pulse")]
pub mod pulse;

pub use device::{matches_target, OutputDevice, VolumeControl};
pub use error::{AudioError, Result};
pub use observer::{DeviceChangeCallback, DeviceObserver};
pub use simulated::{SimulatedDevice, SimulatedObserver, SimulatedVolume};
