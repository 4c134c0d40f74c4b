use thiserror::Error;

use crate::math::Vector3;
use crate::position::PositionId;

/// Top-level error type for the spatia kernel.
#[derive(Debug, Error)]
pub enum SpatiaError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Argument checks that failed at a call boundary.
#[derive(Debug, Error, PartialEq)]
pub enum PreconditionError {
    #[error("{parameter} has a negative extent on axis {axis}: {value}")]
    NegativeExtent {
        parameter: &'static str,
        axis: usize,
        value: f64,
    },

    #[error("{parameter} has a non-finite component on axis {axis}")]
    NonFinite { parameter: &'static str, axis: usize },
}

/// Errors related to the position hierarchy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("position node not found: {0:?}")]
    NodeNotFound(PositionId),

    #[error("attaching {child:?} below {parent:?} would create a cycle")]
    Cycle {
        child: PositionId,
        parent: PositionId,
    },
}

/// Convenience type alias for results using [`SpatiaError`].
pub type Result<T> = std::result::Result<T, SpatiaError>;

/// Fails if any component of `v` is NaN or infinite.
pub(crate) fn ensure_finite(parameter: &'static str, v: &Vector3) -> Result<()> {
    match v.iter().position(|c| !c.is_finite()) {
        Some(axis) => Err(PreconditionError::NonFinite { parameter, axis }.into()),
        None => Ok(()),
    }
}

/// Fails if any component of `v` is negative or not finite.
pub(crate) fn ensure_extent(parameter: &'static str, v: &Vector3) -> Result<()> {
    ensure_finite(parameter, v)?;
    match v.iter().position(|c| *c < 0.0) {
        Some(axis) => Err(PreconditionError::NegativeExtent {
            parameter,
            axis,
            value: v[axis],
        }
        .into()),
        None => Ok(()),
    }
}
