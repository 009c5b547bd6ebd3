//! Error types for gateway operations.
//!
//! These errors describe what went wrong at the driver boundary. The reader
//! never lets them escape to its caller: they are logged and folded into a
//! boolean result, an absent value, or a failed round.

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Command issued before `init` or after `deinit`.
    #[error("Device not initialized")]
    NotInitialized,

    /// The device rejected a command.
    #[error("Command {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new command failure.
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<HardwareError> for uhf_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::NotInitialized => uhf_core::Error::DeviceUninitialized,
            HardwareError::CommandFailed { command, message } => {
                uhf_core::Error::command_failed(command, message)
            }
            other => uhf_core::Error::command_failed("device", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_error() {
        let error = HardwareError::command_failed("set_power", "out of range");
        assert!(matches!(error, HardwareError::CommandFailed { .. }));
        assert_eq!(error.to_string(), "Command set_power failed: out of range");
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("serial port closed");
        assert_eq!(error.to_string(), "Communication error: serial port closed");
    }

    #[test]
    fn test_not_initialized_maps_to_device_uninitialized() {
        let error: uhf_core::Error = HardwareError::NotInitialized.into();
        assert_eq!(error, uhf_core::Error::DeviceUninitialized);
    }

    #[test]
    fn test_other_errors_map_to_command_failed() {
        let error: uhf_core::Error = HardwareError::communication("timeout").into();
        assert_eq!(
            error,
            uhf_core::Error::command_failed("device", "Communication error: timeout")
        );
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            HardwareError::NotInitialized,
            HardwareError::initialization_failed("radio off"),
            HardwareError::other("unexpected"),
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}
