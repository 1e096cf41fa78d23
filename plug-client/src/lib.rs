//! Blocking client for Tasmota smart plugs
//!
//! This crate talks to plugs running Tasmota firmware through its HTTP command
//! endpoint (`/cm?cmnd=...`). Every operation is blocking, and all requests
//! belonging to one operation share a single deadline: the timeout the client
//! was created with.
//!
//! Switching a plug is done in two phases that succeed or fail as a unit:
//!
//! 1. **Login**: query the current power state with the configured credentials.
//!    A rejected or unreachable plug yields [`PlugError::Authentication`].
//! 2. **Command**: send `Power On` / `Power Off` and check that the reply
//!    reports the requested state, otherwise [`PlugError::Command`].
//!
//! ```rust,ignore
//! use plug_client::{Credentials, PlugClient};
//! use std::time::Duration;
//!
//! let client = PlugClient::new(
//!     "192.168.1.40".parse()?,
//!     Credentials::new("admin", "secret"),
//!     Duration::from_secs(10),
//! );
//! client.set_state(true)?;
//! ```

mod error;

pub use error::{PlugError, Result};

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// Port the Tasmota web server listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 80;

/// Network address of a plug
///
/// Accepts a bare IP address (port 80) or an `ip:port` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlugAddress(SocketAddr);

impl PlugAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl FromStr for PlugAddress {
    type Err = PlugError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self(SocketAddr::new(ip, DEFAULT_PORT)));
        }
        s.parse::<SocketAddr>()
            .map(Self)
            .map_err(|_| PlugError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for PlugAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.port() == DEFAULT_PORT {
            write!(f, "{}", self.0.ip())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Web credentials of the plug
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Power state reported by a plug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn from_on(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == PowerState::On
    }

    fn command(self) -> &'static str {
        match self {
            PowerState::On => "Power On",
            PowerState::Off => "Power Off",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ON" | "1" => Some(PowerState::On),
            "OFF" | "0" => Some(PowerState::Off),
            _ => None,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => f.write_str("on"),
            PowerState::Off => f.write_str("off"),
        }
    }
}

/// JSON body returned by `/cm`
#[derive(Debug, Deserialize)]
struct PowerReply {
    #[serde(rename = "POWER", alias = "POWER1")]
    power: Option<String>,
    #[serde(rename = "WARNING")]
    warning: Option<String>,
    #[serde(rename = "Command")]
    command: Option<String>,
}

impl PowerReply {
    fn power_state(&self) -> Option<PowerState> {
        self.power.as_deref().and_then(PowerState::parse)
    }
}

/// Failure of a single `/cm` request, before it is attributed to a phase
#[derive(Debug)]
enum RequestError {
    Unauthorized(String),
    Timeout,
    Transport(String),
    Status(u16),
    Parse(String),
}

impl RequestError {
    fn into_login_error(self, timeout: Duration) -> PlugError {
        match self {
            RequestError::Timeout => PlugError::Timeout(timeout),
            RequestError::Unauthorized(msg) => PlugError::Authentication(msg),
            RequestError::Transport(msg) => PlugError::Authentication(msg),
            RequestError::Status(code) => {
                PlugError::Authentication(format!("unexpected HTTP status {}", code))
            }
            RequestError::Parse(msg) => PlugError::Authentication(msg),
        }
    }

    fn into_command_error(self, timeout: Duration) -> PlugError {
        match self {
            RequestError::Timeout => PlugError::Timeout(timeout),
            RequestError::Unauthorized(msg) => PlugError::Command(msg),
            RequestError::Transport(msg) => PlugError::Command(msg),
            RequestError::Status(code) => PlugError::Command(format!("unexpected HTTP status {}", code)),
            RequestError::Parse(msg) => PlugError::Command(msg),
        }
    }
}

/// A blocking client bound to one plug
#[derive(Clone)]
pub struct PlugClient {
    agent: ureq::Agent,
    address: PlugAddress,
    credentials: Credentials,
    timeout: Duration,
}

impl PlugClient {
    /// Create a client whose every operation is bounded by `timeout`
    pub fn new(address: PlugAddress, credentials: Credentials, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(timeout)
                .timeout(timeout)
                .build(),
            address,
            credentials,
            timeout,
        }
    }

    pub fn address(&self) -> PlugAddress {
        self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Establish a session by querying the power state with our credentials
    ///
    /// The session's deadline starts now; commands sent through it share the
    /// remaining time.
    pub fn login(&self) -> Result<Session<'_>> {
        let deadline = Instant::now() + self.timeout;
        let reply = self
            .request("Power", deadline)
            .map_err(|e| e.into_login_error(self.timeout))?;

        if let Some(warning) = &reply.warning {
            return Err(PlugError::Authentication(warning.clone()));
        }

        let state = reply.power_state().ok_or_else(|| {
            PlugError::Authentication("reply does not report a power state".to_string())
        })?;

        tracing::debug!("Logged in to plug {} (currently {})", self.address, state);

        Ok(Session {
            client: self,
            reported: state,
            deadline,
        })
    }

    /// Log in and switch the plug, failing as a unit
    ///
    /// Both requests together are bounded by the client's timeout; running
    /// out of time in either phase yields [`PlugError::Timeout`].
    pub fn set_state(&self, on: bool) -> Result<()> {
        self.login()?.set_power(PowerState::from_on(on))?;
        Ok(())
    }

    /// Log in and return the power state the plug reports
    pub fn power_state(&self) -> Result<PowerState> {
        Ok(self.login()?.reported_state())
    }

    fn request(&self, cmnd: &str, deadline: Instant) -> std::result::Result<PowerReply, RequestError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RequestError::Timeout);
        }

        let url = format!("{}/cm", self.address.base_url());

        let response = self
            .agent
            .get(&url)
            .timeout(remaining)
            .query("user", &self.credentials.username)
            .query("password", &self.credentials.password)
            .query("cmnd", cmnd)
            .call()
            .map_err(classify)?;

        response.into_json::<PowerReply>().map_err(|e| {
            if is_timeout_io(&e) {
                RequestError::Timeout
            } else {
                RequestError::Parse(e.to_string())
            }
        })
    }
}

impl fmt::Debug for PlugClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlugClient")
            .field("address", &self.address)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An authenticated exchange with a plug
#[derive(Debug)]
pub struct Session<'a> {
    client: &'a PlugClient,
    reported: PowerState,
    deadline: Instant,
}

impl Session<'_> {
    /// Power state reported when the session was established
    pub fn reported_state(&self) -> PowerState {
        self.reported
    }

    /// Switch the plug and verify the reply reports the requested state
    pub fn set_power(&self, state: PowerState) -> Result<PowerState> {
        let timeout = self.client.timeout;
        let reply = self
            .client
            .request(state.command(), self.deadline)
            .map_err(|e| e.into_command_error(timeout))?;

        if let Some(warning) = &reply.warning {
            return Err(PlugError::Command(warning.clone()));
        }
        if let Some(command) = &reply.command {
            return Err(PlugError::Command(format!("plug rejected command: {}", command)));
        }

        match reply.power_state() {
            Some(reported) if reported == state => {
                tracing::debug!("Plug {} switched {}", self.client.address, reported);
                Ok(reported)
            }
            Some(reported) => Err(PlugError::Command(format!(
                "requested {} but plug reports {}",
                state, reported
            ))),
            None => Err(PlugError::Command(
                "reply does not report a power state".to_string(),
            )),
        }
    }
}

fn classify(error: ureq::Error) -> RequestError {
    match error {
        ureq::Error::Status(401, response) => {
            let message = response
                .into_json::<PowerReply>()
                .ok()
                .and_then(|r| r.warning)
                .unwrap_or_else(|| "credentials rejected".to_string());
            RequestError::Unauthorized(message)
        }
        ureq::Error::Status(code, _) => RequestError::Status(code),
        ureq::Error::Transport(transport) => {
            if is_timeout_transport(&transport) {
                RequestError::Timeout
            } else {
                RequestError::Transport(transport.to_string())
            }
        }
    }
}

fn is_timeout_io(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

fn is_timeout_transport(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if is_timeout_io(io) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
