//! Structural smoothing: dip estimation followed by a structure-oriented mean.
//!
//! The section is first smoothed along every trace, the dip field is estimated
//! from that smoothed copy, and the raw section is then averaged along the dip.

use crate::config::SmoothingConfig;
use crate::data_container::{ensure_not_empty, Field, StageControl};
use crate::error::{SmoothError, SmoothResult};
use crate::filters::dip_estimation::estimate_dip;
use crate::filters::filter::{parameters_from_json, Filter, FilterConfig, FilterDomain};
use crate::filters::row_smoothing::smooth_rows;
use crate::filters::structure_mean::structure_mean;
use crate::math_tools::MinMaxScaler;
use filter_macros::register_filter;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Dip-guided smoothing of a whole section.
#[register_filter]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralSmoothing {
    pub config: SmoothingConfig,
}

impl Filter for StructuralSmoothing {
    fn new() -> Self {
        StructuralSmoothing::default()
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Structural Smoothing".to_string(),
            description: "Estimates the local dip by plane-wave destruction and averages \
                each trace with its neighbours along that dip."
                .to_string(),
            domain: FilterDomain::Amplitude,
        }
    }

    fn configure(&mut self, params: &serde_json::Value) -> SmoothResult<()> {
        let parsed: StructuralSmoothing = parameters_from_json(params)?;
        parsed.config.validate()?;
        *self = parsed;
        Ok(())
    }

    fn filter(&self, input: &Field, control: &StageControl) -> SmoothResult<Field> {
        structural_smooth_with_control(input, &self.config, control)
    }
}

/// Smooths `field` along its local structure with the given configuration.
///
/// Returns a new array of the same shape; `field` is left untouched.
pub fn structural_smooth(field: &Field, config: &SmoothingConfig) -> SmoothResult<Field> {
    structural_smooth_with_control(field, config, &StageControl::new())
}

/// Like [`structural_smooth`], with cancellation and progress reporting.
///
/// The abort flag is honoured between and inside the stages; a cancelled run
/// returns `SmoothError::Cancelled` and never a partially smoothed section.
pub fn structural_smooth_with_control(
    field: &Field,
    config: &SmoothingConfig,
    control: &StageControl,
) -> SmoothResult<Field> {
    ensure_not_empty(field.view())?;
    config.validate()?;

    let start = Instant::now();
    let (n_traces, n_samples) = field.dim();
    if config.pre_smooth_window > n_samples {
        return Err(SmoothError::invalid(
            "window",
            format!(
                "pre-smoothing window of {} samples exceeds the trace length {n_samples}",
                config.pre_smooth_window
            ),
        ));
    }
    log::info!(
        "structural smoothing of {n_traces} traces x {n_samples} samples, radius {}",
        config.radius
    );

    let scaler = if config.normalize {
        Some(MinMaxScaler::fit(field.view())?)
    } else {
        None
    };
    let scaled;
    let input = match &scaler {
        Some(scaler) => {
            scaled = scaler.transform(field.view());
            &scaled
        }
        None => field,
    };

    let result = run_stages(input, config, control);
    control.set_progress(None);
    let smoothed = result?;

    log::info!(
        "structural smoothing finished in {:.2} ms",
        start.elapsed().as_secs_f64() * 1e3
    );
    Ok(match scaler {
        Some(scaler) => scaler.inverse_transform(smoothed.view()),
        None => smoothed,
    })
}

fn run_stages(
    input: &Field,
    config: &SmoothingConfig,
    control: &StageControl,
) -> SmoothResult<Field> {
    control.set_progress(Some(0.0));
    control.check()?;
    let presmoothed = smooth_rows(input, config.pre_smooth_window, control)?;
    log::debug!("row smoothing done (window {})", config.pre_smooth_window);

    control.set_progress(Some(1.0 / 3.0));
    control.check()?;
    let dip = estimate_dip(&presmoothed, config.rect, &config.dip, control)?;
    log::debug!(
        "dip estimation done, dip range [{:.3}, {:.3}]",
        dip.iter().copied().fold(f64::INFINITY, f64::min),
        dip.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    );

    control.set_progress(Some(2.0 / 3.0));
    control.check()?;
    structure_mean(input, &dip, &config.mean_params(), control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use serde_json::json;

    #[test]
    fn test_flat_field_is_invariant() {
        let field = Array2::from_elem((12, 40), -3.25);
        let out = structural_smooth(&field, &SmoothingConfig::with_radius(3)).unwrap();
        assert_eq!(out.dim(), field.dim());
        for v in out.iter() {
            assert_abs_diff_eq!(*v, -3.25, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normalisation_round_trips_amplitudes() {
        let field = Array2::from_shape_fn((10, 40), |(_, j)| {
            1000.0 + 250.0 * (2.0 * std::f64::consts::PI * j as f64 / 25.0).sin()
        });
        let config = SmoothingConfig {
            normalize: true,
            rect: [5, 5, 1],
            ..SmoothingConfig::with_radius(2)
        };
        let out = structural_smooth(&field, &config).unwrap();
        for j in 5..35 {
            assert_abs_diff_eq!(out[[5, j]], field[[5, j]], epsilon = 5.0);
        }
    }

    #[test]
    fn test_invalid_configuration_fails_before_work() {
        let control = StageControl::new();
        let field = Array2::from_elem((4, 20), 1.0);
        let result = structural_smooth_with_control(&field, &SmoothingConfig::with_radius(0), &control);
        assert!(matches!(result, Err(SmoothError::InvalidParameter { name: "radius", .. })));
        assert_eq!(control.progress(), None);
    }

    #[test]
    fn test_short_traces_are_rejected() {
        let field = Array2::from_elem((4, 3), 1.0);
        let result = structural_smooth(&field, &SmoothingConfig::with_radius(1));
        assert!(matches!(result, Err(SmoothError::InvalidParameter { name: "window", .. })));
    }

    #[test]
    fn test_empty_field_is_rejected() {
        let field = Array2::<f64>::zeros((0, 10));
        assert!(matches!(
            structural_smooth(&field, &SmoothingConfig::default()),
            Err(SmoothError::EmptyField)
        ));
    }

    #[test]
    fn test_abort_returns_cancelled_and_clears_progress() {
        let control = StageControl::new();
        control.abort();
        let field = Array2::from_elem((6, 20), 1.0);
        let result = structural_smooth_with_control(&field, &SmoothingConfig::default(), &control);
        assert!(matches!(result, Err(SmoothError::Cancelled)));
        assert_eq!(control.progress(), None);
    }

    #[test]
    fn test_filter_reads_flat_json_parameters() {
        let mut filter = StructuralSmoothing::new();
        filter
            .configure(&json!({"radius": 4, "eps": 0.2, "order": 2, "rect": [10, 10, 1]}))
            .unwrap();
        assert_eq!(filter.config.radius, 4);
        assert_eq!(filter.config.eps, 0.2);
        assert_eq!(filter.config.order, 2);
        assert_eq!(filter.config.rect, [10, 10, 1]);
        assert_eq!(filter.config.pre_smooth_window, 5);
    }
}
