use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("input {0} is not registered")]
    UnknownInput(u32),
    #[error("input {0} is not a valid BCM pin")]
    InvalidPin(u32),
}

pub type Result<T> = std::result::Result<T, HwError>;
