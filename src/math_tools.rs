//! Numerical helpers shared by the smoothing stages: amplitude normalisation,
//! triangle smoothing for shaping regularisation, and a banded symmetric solver
//! for the trace prediction systems.

use crate::data_container::ensure_not_empty;
use crate::error::SmoothResult;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Global min-max normalisation of a section to the range [0, 1].
///
/// A section with zero range is only shifted, so constant sections survive the
/// round trip.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub scale: f64,
}

impl MinMaxScaler {
    /// Learns the amplitude range of `field`. NaN samples are ignored.
    pub fn fit(field: ArrayView2<f64>) -> SmoothResult<Self> {
        ensure_not_empty(field)?;
        let min = field.iter().copied().fold(f64::INFINITY, f64::min);
        let max = field.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Ok(MinMaxScaler { min: 0.0, scale: 1.0 });
        }
        let range = max - min;
        let scale = if range > 0.0 { 1.0 / range } else { 1.0 };
        Ok(MinMaxScaler { min, scale })
    }

    pub fn transform(&self, field: ArrayView2<f64>) -> Array2<f64> {
        field.mapv(|x| (x - self.min) * self.scale)
    }

    pub fn inverse_transform(&self, field: ArrayView2<f64>) -> Array2<f64> {
        field.mapv(|x| x / self.scale + self.min)
    }
}

/// Separable triangle smoother used as the shaping operator of the dip solver.
///
/// Each axis is smoothed by the same centered box twice. Samples outside the
/// section count as zeros, which keeps the operator symmetric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleSmoother {
    /// Box half widths along traces and samples.
    pub half_widths: [usize; 2],
}

impl TriangleSmoother {
    /// Builds the smoother from shaping radii. A radius of `r` samples becomes a
    /// box of `r` samples, rounded down to an odd length.
    pub fn from_rect(rect: [usize; 2]) -> Self {
        TriangleSmoother {
            half_widths: [rect[0].saturating_sub(1) / 2, rect[1].saturating_sub(1) / 2],
        }
    }

    pub fn apply(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = data.clone();
        for (axis, &half_width) in self.half_widths.iter().enumerate() {
            if half_width == 0 {
                continue;
            }
            box_smooth_axis(&mut out, Axis(axis), half_width);
            box_smooth_axis(&mut out, Axis(axis), half_width);
        }
        out
    }
}

/// Centered box average of width `2 * half_width + 1` along `axis`, zero padded.
fn box_smooth_axis(data: &mut Array2<f64>, axis: Axis, half_width: usize) {
    let norm = 1.0 / (2 * half_width + 1) as f64;
    Zip::from(data.lanes_mut(axis)).par_for_each(|mut lane| {
        let input = lane.to_vec();
        let n = input.len();
        for (i, out) in lane.iter_mut().enumerate() {
            let lo = i.saturating_sub(half_width);
            let hi = (i + half_width + 1).min(n);
            *out = input[lo..hi].iter().sum::<f64>() * norm;
        }
    });
}

/// Symmetric positive definite band matrix with an in-place LDLᵀ solver.
///
/// Only the diagonal and the upper bands are stored: `bands[d][i] = M[i][i + d]`.
#[derive(Clone, Debug)]
pub struct BandedSpd {
    n: usize,
    bandwidth: usize,
    bands: Vec<Vec<f64>>,
}

impl BandedSpd {
    pub fn zeros(n: usize, bandwidth: usize) -> Self {
        BandedSpd {
            n,
            bandwidth,
            bands: vec![vec![0.0; n]; bandwidth + 1],
        }
    }

    /// Adds `value` to `M[i][j]` (and implicitly to `M[j][i]`).
    ///
    /// # Panics
    /// If `|i - j|` exceeds the bandwidth.
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        let d = hi - lo;
        assert!(d <= self.bandwidth, "entry ({i}, {j}) outside the band");
        self.bands[d][lo] += value;
    }

    /// Solves `M x = rhs` in place, consuming the matrix.
    ///
    /// Pivots that fall below a small fraction of the largest diagonal entry are
    /// lifted to that floor, so near-singular systems still give a finite answer.
    pub fn solve(mut self, rhs: &mut [f64]) {
        let n = self.n;
        let bw = self.bandwidth;
        assert_eq!(rhs.len(), n);

        let max_diag = self.bands[0].iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
        let floor = if max_diag > 0.0 {
            max_diag * 1e-12
        } else {
            f64::MIN_POSITIVE
        };

        // factorisation: bands[0][k] becomes d_k, bands[i - k][k] becomes L[i][k]
        for j in 0..n {
            let mut dj = self.bands[0][j];
            for k in j.saturating_sub(bw)..j {
                let l = self.bands[j - k][k];
                dj -= l * l * self.bands[0][k];
            }
            if dj < floor {
                dj = floor;
            }
            self.bands[0][j] = dj;

            for i in (j + 1)..(j + bw + 1).min(n) {
                let mut v = self.bands[i - j][j];
                for k in i.saturating_sub(bw)..j {
                    v -= self.bands[i - k][k] * self.bands[j - k][k] * self.bands[0][k];
                }
                self.bands[i - j][j] = v / dj;
            }
        }

        for i in 0..n {
            let mut v = rhs[i];
            for k in i.saturating_sub(bw)..i {
                v -= self.bands[i - k][k] * rhs[k];
            }
            rhs[i] = v;
        }
        for i in 0..n {
            rhs[i] /= self.bands[0][i];
        }
        for i in (0..n).rev() {
            let mut v = rhs[i];
            for k in (i + 1)..(i + bw + 1).min(n) {
                v -= self.bands[k - i][i] * rhs[k];
            }
            rhs[i] = v;
        }
    }
}
