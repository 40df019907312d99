//! Maps `Box<dyn Error>` from trait boundaries to typed `SteerError`.
//!
//! The traits in `steer_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `steer_hardware::HwError` downcasting.

use crate::error::SteerError;

/// Map a digitizer error to a typed `SteerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SteerError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<steer_hardware::error::HwError>() {
            return match hw {
                steer_hardware::error::HwError::Timeout => SteerError::Timeout,
                other => SteerError::DigitizerFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        SteerError::Timeout
    } else {
        SteerError::Digitizer(s)
    }
}
