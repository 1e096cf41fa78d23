//! The remote power switch seam

use std::sync::Arc;
use std::time::Duration;

use plug_client::{PlugClient, PlugError};
use thiserror::Error;

/// Why a remote state change did not apply
///
/// Every variant leaves the applied state unknown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActuatorError {
    /// No session could be established with the device
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A session was established but the command did not apply
    #[error("Command failed: {0}")]
    Command(String),

    /// The device did not answer in time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// A remotely switched power outlet
///
/// `set_state` blocks until the device confirms the state or the attempt fails.
pub trait Actuator: Send + Sync {
    fn set_state(&self, on: bool) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Arc<A> {
    fn set_state(&self, on: bool) -> Result<(), ActuatorError> {
        (**self).set_state(on)
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_state(&self, on: bool) -> Result<(), ActuatorError> {
        (**self).set_state(on)
    }
}

impl From<PlugError> for ActuatorError {
    fn from(error: PlugError) -> Self {
        match error {
            PlugError::Authentication(msg) => ActuatorError::Authentication(msg),
            PlugError::Command(msg) => ActuatorError::Command(msg),
            PlugError::Timeout(after) => ActuatorError::Timeout(after),
            PlugError::InvalidAddress(addr) => {
                ActuatorError::Authentication(format!("invalid address {}", addr))
            }
        }
    }
}

impl Actuator for PlugClient {
    fn set_state(&self, on: bool) -> Result<(), ActuatorError> {
        PlugClient::set_state(self, on).map_err(ActuatorError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plug_errors_keep_their_kind() {
        assert_eq!(
            ActuatorError::from(PlugError::Authentication("denied".into())),
            ActuatorError::Authentication("denied".into())
        );
        assert_eq!(
            ActuatorError::from(PlugError::Command("mismatch".into())),
            ActuatorError::Command("mismatch".into())
        );
        assert_eq!(
            ActuatorError::from(PlugError::Timeout(Duration::from_secs(10))),
            ActuatorError::Timeout(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_shared_actuator_delegates() {
        struct AlwaysOff;
        impl Actuator for AlwaysOff {
            fn set_state(&self, on: bool) -> Result<(), ActuatorError> {
                if on {
                    Err(ActuatorError::Command("stuck off".into()))
                } else {
                    Ok(())
                }
            }
        }

        let shared: Arc<dyn Actuator> = Arc::new(AlwaysOff);
        assert!(shared.set_state(false).is_ok());
        assert!(shared.set_state(true).is_err());
    }
}
