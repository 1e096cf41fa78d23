//! The reconciler: keeps the plug in line with the default output device
//!
//! Device changes and cooldown expiries arrive on two different threads. Both
//! take the same lock before touching the state, and the plug is contacted
//! with that lock held, so at most one command is ever in flight.
//!
//! Debouncing is leading + trailing edge: the first change after a quiet
//! period reconciles immediately and opens a cooldown window. Changes during
//! the window only update the desired state. When the window closes, one more
//! reconciliation runs against whatever the desired state is by then.

use std::sync::{Arc, Weak};
use std::time::Duration;

use audio_device::{matches_target, DeviceChangeCallback, DeviceObserver, OutputDevice};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::clamp::{clamp_volume, ClampOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::state::{Outcome, ReconcileState, StateSnapshot};
use crate::timer::{cooldown_timer, CooldownTimer, TimerHandle};

/// State and collaborators reachable from the callback threads
struct Shared {
    target_device: String,
    max_volume: f32,
    cooldown: Duration,
    actuator: Box<dyn Actuator>,
    timer: TimerHandle,
    state: Mutex<ReconcileState>,
}

impl Shared {
    fn on_device_changed(&self, device: Option<&dyn OutputDevice>) {
        let mut state = self.state.lock();
        self.apply_device(&mut state, device);
    }

    fn apply_device(&self, state: &mut ReconcileState, device: Option<&dyn OutputDevice>) {
        if state.is_disposed() {
            return;
        }

        let desired = match device {
            Some(device) => {
                info!("Default output device is '{}'", device.name());
                matches_target(device.name(), &self.target_device)
            }
            None => {
                info!("No default output device");
                false
            }
        };

        if let Some(device) = device.filter(|_| desired) {
            info!("Target output device '{}' is active", self.target_device);
            self.clamp(device);
        }

        if let Some(window) = state.observe(desired) {
            self.timer.arm(self.cooldown, window);
            self.reconcile(state);
        } else {
            debug!(
                "Cooldown active, deferring plug update (wants {})",
                if desired { "on" } else { "off" }
            );
        }
    }

    /// Timer expiry for `window`; ignored unless that window is still open
    fn on_timer_fired(&self, window: u64) {
        let mut state = self.state.lock();
        if state.is_disposed() {
            return;
        }
        if state.open_window() != Some(window) {
            debug!("Ignoring cooldown for closed window {}", window);
            return;
        }
        debug!("Cooldown expired");
        self.close_window(&mut state);
    }

    /// Close whatever window is open, dropping its pending timer
    fn expire_now(&self) {
        let mut state = self.state.lock();
        if state.is_disposed() {
            return;
        }
        self.timer.cancel();
        debug!("Cooldown ended early");
        self.close_window(&mut state);
    }

    fn close_window(&self, state: &mut ReconcileState) {
        state.close_window();
        self.reconcile(state);
    }

    fn clamp(&self, device: &dyn OutputDevice) {
        let Some(volume) = device.volume() else {
            debug!("'{}' exposes no volume control", device.name());
            return;
        };
        match clamp_volume(volume, self.max_volume) {
            Ok(ClampOutcome::Reduced { from, to }) => {
                info!("Turned down the volume from {:.2} to {:.2}", from, to);
            }
            Ok(ClampOutcome::Unchanged { level }) => {
                debug!("Volume {:.2} is within the cap", level);
            }
            Err(e) => warn!("Failed to adjust volume of '{}': {}", device.name(), e),
        }
    }

    fn reconcile(&self, state: &mut ReconcileState) {
        match state.reconcile(self.actuator.as_ref()) {
            Outcome::InSync => debug!("Plug already in the desired state"),
            Outcome::Applied(applied) => info!("Turned {} the amplifier", applied),
            Outcome::Failed { desired, error } => warn!(
                "Failed to turn {} the amplifier, will retry on next change: {}",
                if desired { "on" } else { "off" },
                error
            ),
        }
    }
}

/// Drives a plug from default output device changes
///
/// Created with [`Reconciler::start`], which reconciles once right away. Runs
/// until [`Reconciler::dispose`] (or drop), which leaves the plug off on a
/// best-effort basis.
pub struct Reconciler {
    shared: Arc<Shared>,
    timer: Mutex<Option<CooldownTimer>>,
    observer: Mutex<Option<Box<dyn DeviceObserver>>>,
}

impl Reconciler {
    /// Subscribe to `observer` and reconcile against its current device
    pub fn start<A, O>(config: &Config, actuator: A, observer: O) -> Result<Self>
    where
        A: Actuator + 'static,
        O: DeviceObserver + 'static,
    {
        let (timer_handle, timer_worker) = cooldown_timer();

        let shared = Arc::new(Shared {
            target_device: config.target_device().to_string(),
            max_volume: config.max_volume(),
            cooldown: config.cooldown(),
            actuator: Box::new(actuator),
            timer: timer_handle,
            state: Mutex::new(ReconcileState::new()),
        });

        let weak = Arc::downgrade(&shared);
        let timer = timer_worker.spawn(move |window| {
            if let Some(shared) = weak.upgrade() {
                shared.on_timer_fired(window);
            }
        })?;

        let mut observer: Box<dyn DeviceObserver> = Box::new(observer);
        {
            // Hold the lock across subscribe + initial read so that any change
            // delivered in between is applied after the initial snapshot.
            let mut state = shared.state.lock();
            observer.subscribe(device_callback(Arc::downgrade(&shared)))?;
            let current = observer.current();
            shared.apply_device(&mut state, current.as_deref());
        }

        info!(
            "Reconciler started (target '{}', cooldown {:?}, max volume {:.2})",
            shared.target_device, shared.cooldown, shared.max_volume
        );

        Ok(Self {
            shared,
            timer: Mutex::new(Some(timer)),
            observer: Mutex::new(Some(observer)),
        })
    }

    /// Handle a new default output device, or `None` when there is none
    ///
    /// The observer subscription calls this; it is public so hosts can feed
    /// devices from elsewhere.
    pub fn on_device_changed(&self, device: Option<&dyn OutputDevice>) {
        self.shared.on_device_changed(device);
    }

    /// End the cooldown now: close the debounce window and reconcile against
    /// the current state
    ///
    /// The pending cooldown timer is cancelled, so it cannot close a later
    /// window early or reconcile a second time.
    pub fn on_cooldown_expired(&self) {
        self.shared.expire_now();
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> StateSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Turn the plug off (best effort) and release the timer and observer
    ///
    /// Safe to call more than once; later calls do nothing. Does not interrupt
    /// a command already in flight, but no command is issued afterwards.
    pub fn dispose(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.shut_down() {
                return;
            }
            info!("Reconciler is stopping");
            self.shared.timer.cancel();
            self.shared.reconcile(&mut state);
        }

        if let Some(mut timer) = self.timer.lock().take() {
            timer.shutdown();
        }
        if let Some(mut observer) = self.observer.lock().take() {
            observer.close();
        }
        info!("Reconciler stopped");
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn device_callback(shared: Weak<Shared>) -> DeviceChangeCallback {
    Arc::new(move |device: Option<Arc<dyn OutputDevice>>| {
        if let Some(shared) = shared.upgrade() {
            shared.on_device_changed(device.as_deref());
        }
    })
}
