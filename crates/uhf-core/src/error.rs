use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Device errors
    #[error("Device not initialized")]
    DeviceUninitialized,

    #[error("Device command failed: {command}: {message}")]
    DeviceCommandFailed { command: String, message: String },

    // Inventory errors
    #[error("Inventory round failed with error code {error_code}")]
    RoundFailed { error_code: i32 },

    // Lifecycle errors
    #[error("Invalid state transition from {from} on {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("Reader task is no longer running")]
    ReaderStopped,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a device command failure.
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceCommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let error = Error::command_failed("set_power", "rejected");
        assert_eq!(
            error.to_string(),
            "Device command failed: set_power: rejected"
        );
    }

    #[test]
    fn test_round_failed_display() {
        let error = Error::RoundFailed { error_code: 7 };
        assert_eq!(
            error.to_string(),
            "Inventory round failed with error code 7"
        );
    }

    #[test]
    fn test_invalid_transition_display() {
        let error = Error::InvalidStateTransition {
            from: "disposed".to_string(),
            event: "InitRequested".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid state transition from disposed on InitRequested"
        );
    }
}
