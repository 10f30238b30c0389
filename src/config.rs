//! Parameter sets for the smoothing stages.
//!
//! Every call site builds its configuration explicitly. The `Default` impls hold
//! the customary processing values.

use crate::error::{SmoothError, SmoothResult};
use serde::{Deserialize, Serialize};

/// Highest allpass filter order accepted by the plane-wave kernels.
pub const MAX_FILTER_ORDER: usize = 16;

/// Parameters of the full structural smoothing pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of neighbouring traces on each side averaged along structure.
    pub radius: usize,
    /// Regularisation of the trace prediction solve in the mean filter.
    pub eps: f64,
    /// Allpass filter order used to follow fractional dips in the mean filter.
    pub order: usize,
    /// Shaping radii of the dip estimator: traces, samples, unused third axis.
    pub rect: [usize; 3],
    /// Moving average window applied along every trace before dip estimation.
    pub pre_smooth_window: usize,
    /// Solver settings of the dip estimator.
    pub dip: DipSolverConfig,
    /// Min-max normalise the section before smoothing and map the result back.
    pub normalize: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        SmoothingConfig {
            radius: 2,
            eps: 0.1,
            order: 3,
            rect: [20, 20, 1],
            pre_smooth_window: 5,
            dip: DipSolverConfig::default(),
            normalize: false,
        }
    }
}

impl SmoothingConfig {
    /// Default configuration with the given smoothing radius.
    pub fn with_radius(radius: usize) -> Self {
        SmoothingConfig {
            radius,
            ..SmoothingConfig::default()
        }
    }

    /// Parameters handed to the structure-guided mean filter.
    pub fn mean_params(&self) -> StructureMeanParams {
        StructureMeanParams {
            radius: self.radius,
            order: self.order,
            eps: self.eps,
        }
    }

    pub fn validate(&self) -> SmoothResult<()> {
        self.mean_params().validate()?;
        validate_rect(&self.rect)?;
        validate_window(self.pre_smooth_window)?;
        self.dip.validate()
    }
}

/// Knobs of the Gauss-Newton plane-wave destruction dip solver.
///
/// These are independent of [`SmoothingConfig::eps`] and
/// [`SmoothingConfig::order`], which only drive the mean filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DipSolverConfig {
    /// Allpass filter order of the destruction filter.
    pub order: usize,
    /// Per-sample regularisation of the slope division.
    pub eps: f64,
    /// Number of Gauss-Newton updates.
    pub niter: usize,
    /// Conjugate gradient iterations per update.
    pub liter: usize,
    /// Shaping regularisation weight.
    pub eps_cg: f64,
    /// Relative residual at which conjugate gradients stop early.
    pub tol_cg: f64,
}

impl Default for DipSolverConfig {
    fn default() -> Self {
        DipSolverConfig {
            order: 2,
            eps: 0.01,
            niter: 5,
            liter: 20,
            eps_cg: 1.0,
            tol_cg: 1e-6,
        }
    }
}

impl DipSolverConfig {
    pub fn validate(&self) -> SmoothResult<()> {
        validate_order("dip.order", self.order)?;
        validate_positive("dip.eps", self.eps)?;
        validate_positive("dip.eps_cg", self.eps_cg)?;
        if self.niter == 0 {
            return Err(SmoothError::invalid("dip.niter", "must be at least 1"));
        }
        if self.liter == 0 {
            return Err(SmoothError::invalid("dip.liter", "must be at least 1"));
        }
        if !(self.tol_cg >= 0.0 && self.tol_cg.is_finite()) {
            return Err(SmoothError::invalid(
                "dip.tol_cg",
                format!("must be a finite non-negative number, got {}", self.tol_cg),
            ));
        }
        Ok(())
    }
}

/// Parameters of the structure-guided mean filter on its own.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureMeanParams {
    pub radius: usize,
    pub order: usize,
    pub eps: f64,
}

impl Default for StructureMeanParams {
    fn default() -> Self {
        SmoothingConfig::default().mean_params()
    }
}

impl StructureMeanParams {
    pub fn validate(&self) -> SmoothResult<()> {
        if self.radius == 0 {
            return Err(SmoothError::invalid("radius", "must be at least 1"));
        }
        validate_order("order", self.order)?;
        validate_positive("eps", self.eps)
    }
}

pub(crate) fn validate_rect(rect: &[usize; 3]) -> SmoothResult<()> {
    if let Some(axis) = rect.iter().position(|&r| r == 0) {
        return Err(SmoothError::invalid(
            "rect",
            format!("entry {axis} must be at least 1, got {rect:?}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_window(window: usize) -> SmoothResult<()> {
    if window == 0 || window % 2 == 0 {
        return Err(SmoothError::invalid(
            "window",
            format!("must be a positive odd number, got {window}"),
        ));
    }
    Ok(())
}

fn validate_order(name: &'static str, order: usize) -> SmoothResult<()> {
    if order == 0 || order > MAX_FILTER_ORDER {
        return Err(SmoothError::invalid(
            name,
            format!("must be between 1 and {MAX_FILTER_ORDER}, got {order}"),
        ));
    }
    Ok(())
}

fn validate_positive(name: &'static str, value: f64) -> SmoothResult<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(SmoothError::invalid(
            name,
            format!("must be a finite positive number, got {value}"),
        ));
    }
    Ok(())
}
