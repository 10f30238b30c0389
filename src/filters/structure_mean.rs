//! Structure-oriented mean filter.
//!
//! Every trace is sprayed to its neighbours within `radius` traces by repeated
//! plane-wave prediction along the local dip. Each output trace is the mean of
//! the input trace and all predictions that landed on it, which averages along
//! reflectors but not across them.

use crate::config::StructureMeanParams;
use crate::data_container::{ensure_not_empty, ensure_same_shape, DipField, Field, StageControl};
use crate::error::{SmoothError, SmoothResult};
use crate::filters::allpass::predict_trace;
use cancellable_loops::par_fold_cancellable;
use ndarray::Axis;

/// Averages `field` along the structure described by `dip`.
///
/// Near the first and last traces fewer neighbours exist; the mean is then taken
/// over the predictions that are available, so no value is read out of bounds
/// and a constant section stays constant. A radius larger than the section is
/// allowed.
pub fn structure_mean(
    field: &Field,
    dip: &DipField,
    params: &StructureMeanParams,
    control: &StageControl,
) -> SmoothResult<Field> {
    ensure_not_empty(field.view())?;
    ensure_same_shape(field.view(), dip.view())?;
    params.validate()?;

    let (n2, n1) = field.dim();
    let radius = params.radius;

    let mut out = par_fold_cancellable(
        0..n2,
        &control.abort_flag,
        || Field::zeros((n2, n1)),
        |mut sums, source| {
            spray_trace(field, dip, source, params, &mut sums);
            sums
        },
        |mut a, b| {
            a += &b;
            a
        },
    )
    .ok_or(SmoothError::Cancelled)?;

    for (target, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
        let count = target.saturating_add(radius).min(n2 - 1) - target.saturating_sub(radius) + 1;
        row /= count as f64;
    }
    Ok(out)
}

/// Adds trace `source` and its predictions onto up to `radius` neighbours on each side.
fn spray_trace(
    field: &Field,
    dip: &DipField,
    source: usize,
    params: &StructureMeanParams,
    sums: &mut Field,
) {
    let n2 = field.len_of(Axis(0));
    let mut own = sums.row_mut(source);
    own += &field.row(source);

    let mut trace = field.row(source).to_owned();
    for target in (source + 1..n2).take(params.radius) {
        trace = predict_trace(trace.view(), dip.row(target - 1), params.order, params.eps);
        let mut row = sums.row_mut(target);
        row += &trace;
    }

    let mut trace = field.row(source).to_owned();
    for target in (0..source).rev().take(params.radius) {
        let slopes = dip.row(target).mapv(|p| -p);
        trace = predict_trace(trace.view(), slopes.view(), params.order, params.eps);
        let mut row = sums.row_mut(target);
        row += &trace;
    }
}
