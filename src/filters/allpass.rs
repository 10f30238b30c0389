//! Plane-wave destruction kernels.
//!
//! A plane wave with slope `p` satisfies `x[i2 + 1](t) = x[i2](t - p)`. The
//! fractional shift is approximated by the maximally flat allpass filter
//! `B(Z) / B(1/Z)`, whose `2N + 1` coefficients are polynomials in `p`.
//! Destruction applies `B(Z)` to the next trace and `B(1/Z)` to the current one;
//! prediction solves the same relation for the next trace.

use crate::math_tools::BandedSpd;
use cancellable_loops::par_for_each_cancellable;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use std::sync::atomic::AtomicBool;

/// Coefficients `b_{-N..=N}(p)` of the order-`N` maximally flat fractional delay.
///
/// `b_k = C_k Π_{m=N+k+1}^{2N} (m - p) Π_{m=N-k+1}^{2N} (m + p)` with
/// `C_k = (2N)!² / ((4N)! (N+k)! (N-k)!)`. The taps always sum to one.
pub fn passfilter(p: f64, order: usize) -> Vec<f64> {
    (0..=2 * order)
        .map(|iw| {
            let (c, factors) = tap_factors(iw, order);
            c * factors.iter().map(|(m, sign)| m + sign * p).product::<f64>()
        })
        .collect()
}

/// Derivative of [`passfilter`] with respect to the slope.
pub fn aderfilter(p: f64, order: usize) -> Vec<f64> {
    (0..=2 * order)
        .map(|iw| {
            let (c, factors) = tap_factors(iw, order);
            let values: Vec<f64> = factors.iter().map(|(m, sign)| m + sign * p).collect();
            let derivative: f64 = factors
                .iter()
                .enumerate()
                .map(|(skip, (_, sign))| {
                    sign * values
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != skip)
                        .map(|(_, v)| v)
                        .product::<f64>()
                })
                .sum();
            c * derivative
        })
        .collect()
}

/// Normalisation constant and linear factors `(m, ±1)` of tap `iw = k + N`.
fn tap_factors(iw: usize, order: usize) -> (f64, Vec<(f64, f64)>) {
    let n = order as i64;
    let k = iw as i64 - n;
    let c = factorial(2 * n).powi(2) / (factorial(4 * n) * factorial(n + k) * factorial(n - k));
    let minus = (n + k + 1..=2 * n).map(|m| (m as f64, -1.0));
    let plus = (n - k + 1..=2 * n).map(|m| (m as f64, 1.0));
    (c, minus.chain(plus).collect())
}

fn factorial(n: i64) -> f64 {
    (2..=n).map(|i| i as f64).product()
}

/// Plane-wave destruction residual and its slope derivative.
///
/// Returns `(derivative, residual)` where
/// `residual[i2, i1] = Σ_k b_k(p) (x[i2 + 1, i1 + k] - x[i2, i1 - k])`
/// with `p = dip[i2, i1]`. Positions without a full stencil (last trace, first
/// and last `order` samples) are left at zero. Returns `None` if aborted.
pub fn destruct(
    data: ArrayView2<f64>,
    dip: ArrayView2<f64>,
    order: usize,
    abort_flag: &AtomicBool,
) -> Option<(Array2<f64>, Array2<f64>)> {
    let (n2, n1) = data.dim();
    let mut derivative = Array2::zeros((n2, n1));
    let mut residual = Array2::zeros((n2, n1));
    if n2 < 2 || n1 < 2 * order + 1 {
        return Some((derivative, residual));
    }

    let rows = derivative
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(residual.axis_iter_mut(Axis(0)))
        .enumerate()
        .take(n2 - 1);

    let completed = par_for_each_cancellable(rows, abort_flag, |(i2, (mut der, mut res))| {
        let here = data.row(i2);
        let next = data.row(i2 + 1);
        for i1 in order..n1 - order {
            let p = dip[[i2, i1]];
            let b = passfilter(p, order);
            let db = aderfilter(p, order);
            let mut r = 0.0;
            let mut d = 0.0;
            for iw in 0..=2 * order {
                let diff = next[i1 + iw - order] - here[i1 + order - iw];
                r += diff * b[iw];
                d += diff * db[iw];
            }
            res[i1] = r;
            der[i1] = d;
        }
    });

    completed.then_some((derivative, residual))
}

/// Predicts the neighbouring trace of `trace` along the local `slopes`.
///
/// Solves `(AᵀA + eps DᵀD) y = AᵀÃ x`, where `A` applies `B(Z)` and `Ã` applies
/// `B(1/Z)` with the slope of each sample, and `D` is the second difference.
/// Samples beyond either end of the trace are replicated from the end sample,
/// so a constant trace is predicted exactly whatever the slopes are.
///
/// Passing the slopes between trace `i` and `i + 1` predicts trace `i + 1` from
/// trace `i`; negating them predicts trace `i` from trace `i + 1`.
pub fn predict_trace(
    trace: ArrayView1<f64>,
    slopes: ArrayView1<f64>,
    order: usize,
    eps: f64,
) -> Array1<f64> {
    let n = trace.len();
    if n == 0 {
        return Array1::zeros(0);
    }
    let clamp = |i: i64| i.clamp(0, n as i64 - 1) as usize;
    let half = order as i64;

    let mut matrix = BandedSpd::zeros(n, (2 * order).max(2));
    let mut rhs = vec![0.0; n];
    let mut row: Vec<(usize, f64)> = Vec::with_capacity(2 * order + 1);

    for t in 0..n {
        let b = passfilter(slopes[t], order);

        row.clear();
        let mut shifted = 0.0;
        for (iw, &bk) in b.iter().enumerate() {
            let k = iw as i64 - half;
            let col = clamp(t as i64 + k);
            match row.iter_mut().find(|(c, _)| *c == col) {
                Some((_, v)) => *v += bk,
                None => row.push((col, bk)),
            }
            shifted += bk * trace[clamp(t as i64 - k)];
        }

        for &(ci, vi) in &row {
            rhs[ci] += vi * shifted;
            for &(cj, vj) in &row {
                if ci <= cj {
                    matrix.add(ci, cj, vi * vj);
                }
            }
        }
    }

    // eps * DᵀD with D = [1, -2, 1] on interior samples only
    for t in 1..n.saturating_sub(1) {
        let stencil = [(t - 1, 1.0), (t, -2.0), (t + 1, 1.0)];
        for &(ci, vi) in &stencil {
            for &(cj, vj) in &stencil {
                if ci <= cj {
                    matrix.add(ci, cj, eps * vi * vj);
                }
            }
        }
    }

    matrix.solve(&mut rhs);
    Array1::from(rhs)
}
