use thiserror::Error;

/// Rejected simulator parameters or inputs.
///
/// Raised at construction or call time; inputs are never silently coerced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },

    #[error("temperatures length ({actual}) must match irradiance length ({expected})")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
}

pub(crate) fn ensure(
    ok: bool,
    name: &'static str,
    reason: &'static str,
) -> Result<(), SimulationError> {
    if ok {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter { name, reason })
    }
}
