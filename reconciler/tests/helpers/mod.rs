//! Test helpers for reconciler integration tests

#![allow(dead_code)]

use std::sync::Arc;

use audio_device::{OutputDevice, SimulatedDevice, SimulatedObserver};
use parking_lot::Mutex;
use reconciler::{Actuator, ActuatorError, Config, Reconciler, Settings};

/// Target device name used throughout the tests
pub const TARGET: &str = "Speakers";

/// Actuator that records every call and can be told to fail
#[derive(Default)]
pub struct RecordingPlug {
    calls: Mutex<Vec<bool>>,
    failure: Mutex<Option<ActuatorError>>,
}

impl RecordingPlug {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// States requested so far, in order
    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Fail every following call with `error`
    pub fn fail_with(&self, error: ActuatorError) {
        *self.failure.lock() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }
}

impl Actuator for RecordingPlug {
    fn set_state(&self, on: bool) -> Result<(), ActuatorError> {
        self.calls.lock().push(on);
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Config for `TARGET` with the given cooldown
pub fn config_with_cooldown(cooldown_secs: i64) -> Config {
    let mut settings = Settings::new(TARGET, "192.0.2.10", "admin", "secret");
    settings.cooldown_secs = cooldown_secs;
    Config::try_from(settings).unwrap()
}

/// Config whose cooldown never expires during a test
///
/// Tests close the window by calling `on_cooldown_expired` themselves.
pub fn manual_config() -> Config {
    config_with_cooldown(60)
}

pub fn device(name: &str) -> Arc<dyn OutputDevice> {
    Arc::new(SimulatedDevice::new(name))
}

pub fn loud_device(name: &str, master: f32) -> Arc<SimulatedDevice> {
    Arc::new(SimulatedDevice::stereo(name, master))
}

/// Reconciler over a fresh observer whose initial default is `initial`
pub fn start(
    config: &Config,
    initial: Option<Arc<dyn OutputDevice>>,
) -> (Reconciler, Arc<RecordingPlug>, SimulatedObserver) {
    let observer = match initial {
        Some(device) => SimulatedObserver::with_default(device),
        None => SimulatedObserver::new(),
    };
    let plug = RecordingPlug::new();
    let reconciler = Reconciler::start(config, Arc::clone(&plug), observer.clone()).unwrap();
    (reconciler, plug, observer)
}
