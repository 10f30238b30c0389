//! Centered moving average along every trace.
//!
//! Used as a denoising pre-step before dip estimation. The window shrinks
//! symmetrically towards both ends of the trace so the output keeps its length.

use crate::config::validate_window;
use crate::data_container::{ensure_not_empty, Field, StageControl};
use crate::error::{SmoothError, SmoothResult};
use crate::filters::filter::{parameters_from_json, Filter, FilterConfig, FilterDomain};
use cancellable_loops::par_for_each_cancellable;
use filter_macros::register_filter;
use ndarray::{s, Array1, ArrayView1, ArrayViewMut1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Moving average of `window` samples applied to each trace independently.
#[register_filter]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowSmoothing {
    /// Positive odd window length.
    pub window: usize,
}

impl Default for RowSmoothing {
    fn default() -> Self {
        RowSmoothing { window: 5 }
    }
}

impl Filter for RowSmoothing {
    fn new() -> Self {
        RowSmoothing::default()
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Row Smoothing".to_string(),
            description: "Centered moving average along every trace with shrinking edge windows."
                .to_string(),
            domain: FilterDomain::Amplitude,
        }
    }

    fn configure(&mut self, params: &serde_json::Value) -> SmoothResult<()> {
        let parsed: RowSmoothing = parameters_from_json(params)?;
        validate_window(parsed.window)?;
        *self = parsed;
        Ok(())
    }

    fn filter(&self, input: &Field, control: &StageControl) -> SmoothResult<Field> {
        smooth_rows(input, self.window, control)
    }
}

/// Centered moving average of `row` with window `window`.
///
/// The first `(window - 1) / 2` outputs are the means of the first `2i + 1`
/// samples, the last ones mirror that from the end, and every other output is
/// the mean of the full window around it. A window of one is the identity.
pub fn smooth_row(row: ArrayView1<f64>, window: usize) -> SmoothResult<Array1<f64>> {
    validate_row_window(row.len(), window)?;
    let mut out = Array1::zeros(row.len());
    moving_average_into(row, out.view_mut(), window);
    Ok(out)
}

/// Applies [`smooth_row`] to every trace of `field` in parallel.
pub fn smooth_rows(field: &Field, window: usize, control: &StageControl) -> SmoothResult<Field> {
    ensure_not_empty(field.view())?;
    validate_row_window(field.len_of(Axis(1)), window)?;

    let mut out = Field::zeros(field.raw_dim());
    let rows = out
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(field.axis_iter(Axis(0)));
    let completed = par_for_each_cancellable(rows, &control.abort_flag, |(out_row, row)| {
        moving_average_into(row, out_row, window);
    });
    if !completed {
        return Err(SmoothError::Cancelled);
    }
    Ok(out)
}

fn validate_row_window(len: usize, window: usize) -> SmoothResult<()> {
    validate_window(window)?;
    if window > len {
        return Err(SmoothError::invalid(
            "window",
            format!("window of {window} samples exceeds the trace length {len}"),
        ));
    }
    Ok(())
}

/// Caller guarantees an odd `window` no longer than `row`.
fn moving_average_into(row: ArrayView1<f64>, mut out: ArrayViewMut1<f64>, window: usize) {
    let n = row.len();
    let half = window / 2;

    let mut head = 0.0;
    let mut tail = 0.0;
    for i in 0..half {
        // cumulative windows of 2i + 1 samples anchored at either end
        head += row[2 * i] + if i > 0 { row[2 * i - 1] } else { 0.0 };
        tail += row[n - 1 - 2 * i] + if i > 0 { row[n - 2 * i] } else { 0.0 };
        let count = (2 * i + 1) as f64;
        out[i] = head / count;
        out[n - 1 - i] = tail / count;
    }

    for i in half..n - half {
        out[i] = row.slice(s![i - half..=i + half]).sum() / window as f64;
    }
}
