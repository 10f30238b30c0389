//! Smooth division `num / den` with shaping regularisation.
//!
//! The ratio is constrained to the range of a triangle smoother `H`. With
//! `D = diag(den)` the shaped solution `rat = H q` solves
//! `(H D² H + λ² (I - H²)) q = H D num` by conjugate gradients.

use crate::math_tools::TriangleSmoother;
use ndarray::{Array2, Zip};

/// Below this RMS the (normalised) denominator is treated as identically zero.
const DEGENERATE_RMS: f64 = 1e-10;

#[derive(Clone, Copy, Debug)]
pub struct DivisionParams {
    /// Per-sample regularisation: both terms are divided by `hypot(den, eps)`.
    pub eps: f64,
    /// Shaping weight λ.
    pub eps_cg: f64,
    /// Relative residual at which the iteration stops.
    pub tol_cg: f64,
    /// Maximum number of conjugate gradient iterations.
    pub liter: usize,
}

/// Regularised ratio of `num` and `den`, smooth at the scale of `smoother`.
///
/// A vanishing denominator gives a zero ratio. The solve couples the whole
/// section, so a single non-finite sample turns the entire ratio into NaN.
pub fn smooth_divide(
    num: &Array2<f64>,
    den: &Array2<f64>,
    smoother: &TriangleSmoother,
    params: &DivisionParams,
) -> Array2<f64> {
    let mut num = num.clone();
    let mut den = den.clone();
    Zip::from(&mut num).and(&mut den).for_each(|n, d| {
        let norm = 1.0 / d.hypot(params.eps);
        *n *= norm;
        *d *= norm;
    });

    let energy = den.iter().map(|d| d * d).sum::<f64>() / den.len().max(1) as f64;
    if energy <= DEGENERATE_RMS * DEGENERATE_RMS {
        return Array2::zeros(num.raw_dim());
    }
    let scale = 1.0 / energy.sqrt();
    num.mapv_inplace(|v| v * scale);
    den.mapv_inplace(|v| v * scale);

    let lambda2 = params.eps_cg * params.eps_cg;
    let den2 = den.mapv(|d| d * d);
    let operator = |q: &Array2<f64>| -> Array2<f64> {
        let hq = smoother.apply(q);
        let weighted = smoother.apply(&(&den2 * &hq));
        let leak = smoother.apply(&hq);
        weighted + (q - &leak) * lambda2
    };

    let rhs = smoother.apply(&(&den * &num));
    let mut q = Array2::<f64>::zeros(rhs.raw_dim());
    let mut residual = rhs.clone();
    let mut direction = rhs;
    let mut rr = dot(&residual, &residual);
    if !rr.is_finite() {
        return Array2::from_elem(residual.raw_dim(), f64::NAN);
    }
    let stop = rr.sqrt() * params.tol_cg;

    for iter in 0..params.liter {
        if !(rr.sqrt() > stop) {
            log::trace!("smooth division converged after {iter} iterations");
            break;
        }
        let md = operator(&direction);
        let curvature = dot(&direction, &md);
        if !(curvature > 0.0) {
            break;
        }
        let alpha = rr / curvature;
        q.scaled_add(alpha, &direction);
        residual.scaled_add(-alpha, &md);
        let rr_next = dot(&residual, &residual);
        let beta = rr_next / rr;
        direction = &residual + &(direction * beta);
        rr = rr_next;
    }

    smoother.apply(&q)
}

fn dot(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    Zip::from(a).and(b).fold(0.0, |acc, x, y| acc + x * y)
}
