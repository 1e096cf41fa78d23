//! Single-shot cooldown timer
//!
//! A dedicated worker thread waits for the armed deadline and then invokes
//! the expiry callback once with the window id it was armed for. Arming again
//! replaces the pending deadline; cancelling clears it.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug)]
enum TimerCommand {
    Arm(Duration, u64),
    Cancel,
    Shutdown,
}

/// Sends commands to the timer worker
#[derive(Debug, Clone)]
pub(crate) struct TimerHandle {
    command_tx: mpsc::Sender<TimerCommand>,
}

impl TimerHandle {
    /// Fire once for `window` after `after`
    pub(crate) fn arm(&self, after: Duration, window: u64) {
        self.send(TimerCommand::Arm(after, window));
    }

    /// Drop the pending deadline, if any
    pub(crate) fn cancel(&self) {
        self.send(TimerCommand::Cancel);
    }

    fn send(&self, command: TimerCommand) {
        if self.command_tx.send(command).is_err() {
            tracing::debug!("Cooldown timer already stopped");
        }
    }
}

/// Timer worker that has not been started yet
pub(crate) struct TimerWorker {
    command_tx: mpsc::Sender<TimerCommand>,
    command_rx: mpsc::Receiver<TimerCommand>,
}

/// Create a timer: the handle can be shared before the worker is started
pub(crate) fn cooldown_timer() -> (TimerHandle, TimerWorker) {
    let (command_tx, command_rx) = mpsc::channel();
    (
        TimerHandle {
            command_tx: command_tx.clone(),
        },
        TimerWorker {
            command_tx,
            command_rx,
        },
    )
}

impl TimerWorker {
    /// Start the worker thread
    pub(crate) fn spawn<F>(self, on_expired: F) -> std::io::Result<CooldownTimer>
    where
        F: Fn(u64) + Send + 'static,
    {
        let command_rx = self.command_rx;
        let worker = thread::Builder::new()
            .name("cooldown-timer".to_string())
            .spawn(move || run_timer_loop(command_rx, on_expired))?;

        Ok(CooldownTimer {
            command_tx: self.command_tx,
            worker: Some(worker),
        })
    }
}

/// Owner of a running timer worker
///
/// Dropping it stops and joins the worker.
pub(crate) struct CooldownTimer {
    command_tx: mpsc::Sender<TimerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl CooldownTimer {
    /// Stop the worker and wait for it; a running expiry callback completes first
    pub(crate) fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.command_tx.send(TimerCommand::Shutdown);
            if worker.join().is_err() {
                tracing::warn!("Cooldown timer thread panicked");
            }
        }
    }
}

impl Drop for CooldownTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer_loop<F: Fn(u64)>(command_rx: mpsc::Receiver<TimerCommand>, on_expired: F) {
    let mut pending: Option<(Instant, u64)> = None;

    loop {
        let command = match pending {
            Some((at, window)) => match command_rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    pending = None;
                    on_expired(window);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match command_rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            TimerCommand::Arm(after, window) => pending = Some((Instant::now() + after, window)),
            TimerCommand::Cancel => pending = None,
            TimerCommand::Shutdown => break,
        }
    }

    tracing::debug!("Cooldown timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    fn start() -> (TimerHandle, CooldownTimer, Receiver<(Instant, u64)>) {
        let (fired_tx, fired_rx) = mpsc::channel();
        let (handle, worker) = cooldown_timer();
        let timer = worker
            .spawn(move |window| {
                let _ = fired_tx.send((Instant::now(), window));
            })
            .unwrap();
        (handle, timer, fired_rx)
    }

    #[test]
    fn test_fires_once_after_delay() {
        let (handle, _timer, fired) = start();
        let armed_at = Instant::now();
        handle.arm(Duration::from_millis(50), 7);

        let (fired_at, window) = fired.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(window, 7);
        assert!(fired_at.duration_since(armed_at) >= Duration::from_millis(50));
        assert!(fired.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn test_zero_delay_fires_immediately() {
        let (handle, _timer, fired) = start();
        handle.arm(Duration::ZERO, 1);
        assert!(fired.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let (handle, _timer, fired) = start();
        handle.arm(Duration::from_millis(100), 1);
        handle.cancel();
        assert!(fired.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let (handle, _timer, fired) = start();
        handle.arm(Duration::from_secs(60), 1);
        handle.arm(Duration::from_millis(20), 2);
        let (_, window) = fired.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(window, 2);
    }

    #[test]
    fn test_shutdown_is_idempotent_and_stops_handle() {
        let (handle, mut timer, fired) = start();
        timer.shutdown();
        timer.shutdown();

        handle.arm(Duration::ZERO, 1);
        assert!(fired.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
