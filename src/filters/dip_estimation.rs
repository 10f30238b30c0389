//! Local dip estimation by plane-wave destruction.
//!
//! Starting from a flat dip field, every Gauss-Newton iteration linearises the
//! destruction residual around the current slopes and solves
//! `r'(p) Δp ≈ -r(p)` by smooth division, so the update is regularised over a
//! neighbourhood of roughly `rect[0]` traces by `rect[1]` samples.

use crate::config::{validate_rect, DipSolverConfig};
use crate::data_container::{ensure_not_empty, DipField, Field, StageControl};
use crate::error::{SmoothError, SmoothResult};
use crate::filters::allpass::destruct;
use crate::filters::divide::{smooth_divide, DivisionParams};
use crate::filters::filter::{parameters_from_json, Filter, FilterConfig, FilterDomain};
use crate::math_tools::TriangleSmoother;
use filter_macros::register_filter;
use serde::{Deserialize, Serialize};

/// Estimates the dip field of a section.
#[register_filter]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DipEstimation {
    /// Shaping radii: traces, samples, and a third axis that must stay 1 for sections.
    pub rect: [usize; 3],
    pub solver: DipSolverConfig,
}

impl Default for DipEstimation {
    fn default() -> Self {
        DipEstimation {
            rect: [20, 20, 1],
            solver: DipSolverConfig::default(),
        }
    }
}

impl Filter for DipEstimation {
    fn new() -> Self {
        DipEstimation::default()
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Dip Estimation".to_string(),
            description: "Local slope of the dominant structure, in samples per trace, \
                estimated by regularised plane-wave destruction."
                .to_string(),
            domain: FilterDomain::Dip,
        }
    }

    fn configure(&mut self, params: &serde_json::Value) -> SmoothResult<()> {
        let parsed: DipEstimation = parameters_from_json(params)?;
        validate_rect(&parsed.rect)?;
        parsed.solver.validate()?;
        *self = parsed;
        Ok(())
    }

    fn filter(&self, input: &Field, control: &StageControl) -> SmoothResult<Field> {
        estimate_dip(input, self.rect, &self.solver, control)
    }
}

/// Estimates the local dip of every sample of `field`.
///
/// The input is normally the row-smoothed section. Constant or structureless
/// input gives a zero dip field; NaN samples make the whole estimate NaN.
pub fn estimate_dip(
    field: &Field,
    rect: [usize; 3],
    solver: &DipSolverConfig,
    control: &StageControl,
) -> SmoothResult<DipField> {
    ensure_not_empty(field.view())?;
    validate_rect(&rect)?;
    solver.validate()?;
    if rect[2] != 1 {
        log::warn!(
            "dip estimation on a 2D section ignores rect[2] = {}",
            rect[2]
        );
    }

    let smoother = TriangleSmoother::from_rect([rect[0], rect[1]]);
    let division = DivisionParams {
        eps: solver.eps,
        eps_cg: solver.eps_cg,
        tol_cg: solver.tol_cg,
        liter: solver.liter,
    };

    let mut dip = DipField::zeros(field.raw_dim());
    for iter in 0..solver.niter {
        control.check()?;
        let (derivative, residual) =
            destruct(field.view(), dip.view(), solver.order, &control.abort_flag)
                .ok_or(SmoothError::Cancelled)?;
        let update = smooth_divide(&(-residual), &derivative, &smoother, &division);
        dip += &update;

        log::debug!(
            "dip iteration {}/{}: max |update| = {:.3e}",
            iter + 1,
            solver.niter,
            update.iter().fold(0.0_f64, |a, &b| a.max(b.abs()))
        );
    }
    Ok(dip)
}
