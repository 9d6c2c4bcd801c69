//! The vision estimator seam. The algorithm behind it is not part of this crate.

use core::fmt;

use crate::state::TelemetrySample;

/// Everything the loop hands the estimator for one iteration.
pub struct EstimatorInput<'a, F> {
    pub frame_number: u64,
    /// Seconds since the previous iteration actually ran.
    pub dt: f32,
    pub frame: Option<&'a F>,
    pub telemetry: TelemetrySample,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum EstimatorError {
    /// Needs more frames or telemetry before it can produce output.
    NotReady,
    /// Internal failure; the estimator resets itself.
    Diverged,
}

impl fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorError::NotReady => f.write_str("not ready"),
            EstimatorError::Diverged => f.write_str("diverged"),
        }
    }
}

pub trait Estimator<F> {
    type Output;

    fn run(&mut self, input: &EstimatorInput<'_, F>) -> Result<Self::Output, EstimatorError>;
}

/// Accepts every input and produces nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEstimator;

impl<F> Estimator<F> for NullEstimator {
    type Output = ();

    fn run(&mut self, _input: &EstimatorInput<'_, F>) -> Result<(), EstimatorError> {
        Ok(())
    }
}
