//! Maps `Box<dyn Error>` from trait boundaries to typed `FlowError`.
//!
//! The traits in `flow_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated
//! path for `flow_hardware::HwError` downcasting.

use crate::error::FlowError;
#[cfg(feature = "hardware-errors")]
use crate::types::ChannelId;

/// Map a trait-boundary error to a typed `FlowError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to a generic source error.
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> FlowError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<flow_hardware::error::HwError>() {
            return match hw {
                flow_hardware::error::HwError::UnknownInput(id) => {
                    FlowError::UnknownChannel(ChannelId(*id))
                }
                other => FlowError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("gpio") {
        FlowError::Hardware(s)
    } else {
        FlowError::Source(s)
    }
}
