//! Amplifier follower
//!
//! Keeps a smart plug powering an amplifier in line with the system's default
//! audio output: on while the configured target device is the default output,
//! off otherwise, and off when the reconciler is disposed.
//!
//! # Architecture
//!
//! ```text
//! DeviceObserver ──► Reconciler ──► Actuator (smart plug)
//!                      │   ▲
//!                      ▼   │
//!                 cooldown timer
//! ```
//!
//! Changes are debounced on the leading and trailing edge: the first change
//! reconciles immediately, further changes within the cooldown only update
//! the desired state, and one more reconciliation runs when the cooldown
//! expires. Whenever the target device becomes the default, its volume is
//! unified across channels and capped at the configured maximum.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use audio_device::SimulatedObserver;
//! use reconciler::{Config, Reconciler, Settings};
//!
//! let settings = Settings::new("Speakers", "192.168.1.40", "admin", "secret");
//! let config = Config::try_from(settings)?;
//!
//! let reconciler = Reconciler::start(&config, config.plug_client(), SimulatedObserver::new())?;
//! // ...
//! reconciler.dispose();
//! ```

pub mod actuator;
pub mod clamp;
pub mod config;
pub mod logging;

mod error;
mod reconciler;
mod state;
mod timer;

pub use actuator::{Actuator, ActuatorError};
pub use clamp::{clamp_volume, ClampOutcome};
pub use config::{Config, ConfigError, Settings};
pub use error::{ReconcilerError, Result};
pub use reconciler::Reconciler;
pub use state::{AppliedState, StateSnapshot};
