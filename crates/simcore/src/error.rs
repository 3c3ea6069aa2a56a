//! Error types shared by the simulation core and the driver shell.

/// Everything that can go fatally wrong while configuring or running a
/// simulation. The core has no retry semantics: every variant is terminal.
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("unknown device {device_id} referenced by pid {pid}")]
    UnknownDevice { device_id: u32, pid: u32 },

    #[error("policy {policy} does not support interrupt {interrupt}")]
    UnsupportedInterrupt { policy: &'static str, interrupt: &'static str },

    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        SimError::ConfigurationError { message: message.into() }
    }

    pub fn invariant<S: Into<String>>(message: S) -> Self {
        SimError::InvariantViolation { message: message.into() }
    }
}
