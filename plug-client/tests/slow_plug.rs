//! Timeout behavior against a plug that answers slowly
//!
//! A bare TCP server stands in for the plug so each phase can be delayed
//! independently.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use plug_client::{Credentials, PlugClient, PlugError};

/// Slack allowed on top of the configured timeout for scheduling noise
const SLACK: Duration = Duration::from_millis(300);

/// Local Tasmota stand-in with a fixed delay per phase
struct SlowPlug {
    addr: SocketAddr,
}

impl SlowPlug {
    fn start(login_delay: Duration, command_delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                thread::spawn(move || answer(stream, login_delay, command_delay));
            }
        });

        Self { addr }
    }

    fn client(&self, timeout: Duration) -> PlugClient {
        PlugClient::new(
            self.addr.to_string().parse().unwrap(),
            Credentials::new("admin", "secret"),
            timeout,
        )
    }
}

fn answer(stream: TcpStream, login_delay: Duration, command_delay: Duration) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    // Drain headers
    let mut line = String::new();
    while reader.read_line(&mut line).map(|n| n > 2).unwrap_or(false) {
        line.clear();
    }

    let (delay, body) = if request_line.contains("Power+On") || request_line.contains("Power%20On") {
        (command_delay, r#"{"POWER":"ON"}"#)
    } else if request_line.contains("Power+Off") || request_line.contains("Power%20Off") {
        (command_delay, r#"{"POWER":"OFF"}"#)
    } else {
        (login_delay, r#"{"POWER":"OFF"}"#)
    };

    thread::sleep(delay);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
}

#[test]
fn test_slow_login_times_out() {
    let plug = SlowPlug::start(Duration::from_secs(3), Duration::ZERO);
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let err = plug.client(timeout).set_state(true).unwrap_err();

    assert!(matches!(err, PlugError::Timeout(t) if t == timeout), "got {:?}", err);
    assert!(started.elapsed() <= timeout + SLACK, "took {:?}", started.elapsed());
}

#[test]
fn test_slow_command_times_out_within_one_budget() {
    // Each phase alone fits the timeout; together they do not.
    let plug = SlowPlug::start(Duration::from_millis(700), Duration::from_millis(700));
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let err = plug.client(timeout).set_state(true).unwrap_err();

    assert!(err.is_timeout(), "got {:?}", err);
    assert!(started.elapsed() <= timeout + SLACK, "took {:?}", started.elapsed());
}

#[test]
fn test_slow_status_query_times_out() {
    let plug = SlowPlug::start(Duration::from_secs(3), Duration::ZERO);
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let err = plug.client(timeout).power_state().unwrap_err();

    assert!(err.is_timeout(), "got {:?}", err);
    assert!(started.elapsed() <= timeout + SLACK);
}

#[test]
fn test_both_phases_within_budget_succeed() {
    let plug = SlowPlug::start(Duration::from_millis(100), Duration::from_millis(100));
    let timeout = Duration::from_secs(2);

    let started = Instant::now();
    plug.client(timeout).set_state(true).expect("switch on");
    assert!(started.elapsed() <= timeout);
}
