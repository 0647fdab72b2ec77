use thiserror::Error;

use crate::types::ChannelId;

#[derive(Debug, Error, Clone)]
pub enum FlowError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("pulse source error: {0}")]
    Source(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),
    #[error("duplicate channel {0}")]
    DuplicateChannel(ChannelId),
    #[error("timeout waiting for pour completion")]
    Timeout,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing channel input (id and name)")]
    MissingInput,
    #[error("missing pour event listener")]
    MissingEvents,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
