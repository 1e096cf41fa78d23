//! Line-driven device source for running without an audio backend
//!
//! Each input line names the new default output device. An empty line means
//! there is no default output.

use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use audio_device::{SimulatedDevice, SimulatedObserver};
use tracing::{debug, warn};

use crate::Shutdown;

/// Feed every line of `reader` to `observer`; returns the number of lines read
pub fn feed_lines<R: BufRead>(reader: R, observer: &SimulatedObserver) -> io::Result<usize> {
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        count += 1;

        let name = line.trim();
        let notified = if name.is_empty() {
            observer.clear_default()
        } else {
            observer.set_default(Arc::new(SimulatedDevice::new(name)))
        };
        if !notified {
            debug!("Default output unchanged, ignoring line {}", count);
        }
    }
    Ok(count)
}

/// Read stdin on a background thread and request shutdown at end of input
pub fn spawn_stdin_source(
    observer: SimulatedObserver,
    shutdown: Sender<Shutdown>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-source".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            if let Err(e) = feed_lines(stdin.lock(), &observer) {
                warn!("Failed to read device names from stdin: {}", e);
            }
            let _ = shutdown.send(Shutdown::EndOfInput);
        })
}
