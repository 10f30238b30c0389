//! End-to-end behaviour of the structural smoothing pipeline.

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use structural_smooth::{
    structural_smooth, structural_smooth_with_control, SmoothError, SmoothingConfig,
    StageControl,
};

fn wavelet(t: f64) -> f64 {
    (2.0 * std::f64::consts::PI * t / 20.0).sin()
        + 0.5 * (2.0 * std::f64::consts::PI * t / 13.0 + 1.0).sin()
}

/// Two flat layers, +1 above sample 40 and -1 below, with additive noise.
fn noisy_layers(traces: usize, samples: usize, sigma: f64, seed: u64) -> (Array2<f64>, Array2<f64>) {
    let clean = Array2::from_shape_fn((traces, samples), |(_, t)| if t < 40 { 1.0 } else { -1.0 });
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).unwrap();
    let noisy = clean.mapv(|v| v + normal.sample(&mut rng));
    (clean, noisy)
}

fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v * v, c + 1));
    (sum / count as f64).sqrt()
}

#[test]
fn test_output_shape_matches_input() {
    for &(traces, samples) in &[(1, 10), (3, 5), (7, 64), (40, 33)] {
        let field = Array2::from_shape_fn((traces, samples), |(i, t)| wavelet(t as f64 - 0.3 * i as f64));
        let out = structural_smooth(&field, &SmoothingConfig::with_radius(2)).unwrap();
        assert_eq!(out.dim(), (traces, samples));
        assert!(out.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_single_trace_is_returned_unchanged() {
    let field = Array2::from_shape_fn((1, 30), |(_, t)| wavelet(t as f64));
    let out = structural_smooth(&field, &SmoothingConfig::with_radius(4)).unwrap();
    for (o, f) in out.iter().zip(field.iter()) {
        assert_abs_diff_eq!(o, f, epsilon = 1e-12);
    }
}

#[test]
fn test_flat_field_stays_flat() {
    let field = Array2::from_elem((25, 60), 7.5);
    let out = structural_smooth(&field, &SmoothingConfig::with_radius(5)).unwrap();
    for v in out.iter() {
        assert_abs_diff_eq!(*v, 7.5, epsilon = 1e-9);
    }
}

#[test]
fn test_noise_is_suppressed_within_layers() {
    let (clean, noisy) = noisy_layers(30, 80, 0.2, 42);
    let out = structural_smooth(&noisy, &SmoothingConfig::with_radius(3)).unwrap();

    let interior = |t: usize| (5..35).contains(&t) || (45..75).contains(&t);
    let mut before = Vec::new();
    let mut after = Vec::new();
    for i in 4..26 {
        for t in (0..80).filter(|&t| interior(t)) {
            before.push(noisy[[i, t]] - clean[[i, t]]);
            after.push(out[[i, t]] - clean[[i, t]]);
        }
    }
    let rms_before = rms(before.into_iter());
    let rms_after = rms(after.into_iter());
    assert!(
        rms_after < 0.7 * rms_before,
        "noise rms went from {rms_before:.4} to {rms_after:.4}"
    );
}

#[test]
fn test_layer_boundary_stays_in_place() {
    let (_, noisy) = noisy_layers(30, 80, 0.2, 7);
    let out = structural_smooth(&noisy, &SmoothingConfig::with_radius(3)).unwrap();

    let column_mean = |t: usize| (5..25).map(|i| out[[i, t]]).sum::<f64>() / 20.0;
    assert!(column_mean(38) > 0.5, "above boundary: {}", column_mean(38));
    assert!(column_mean(41) < -0.5, "below boundary: {}", column_mean(41));
}

#[test]
fn test_nan_sample_reaches_neighbouring_traces() {
    let mut field = Array2::from_shape_fn((15, 60), |(i, t)| wavelet(t as f64 - 0.3 * i as f64));
    field[[7, 30]] = f64::NAN;
    let radius = 3;
    let out = structural_smooth(&field, &SmoothingConfig::with_radius(radius)).unwrap();
    assert_eq!(out.dim(), field.dim());
    for i in 7 - radius..=7 + radius {
        assert!(out[[i, 30]].is_nan(), "trace {i} should carry the NaN");
    }
}

#[test]
fn test_radius_larger_than_section() {
    let field = Array2::from_shape_fn((5, 40), |(i, t)| wavelet(t as f64 - 0.2 * i as f64));
    let out = structural_smooth(&field, &SmoothingConfig::with_radius(10)).unwrap();
    assert_eq!(out.dim(), field.dim());
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn test_tilted_events_are_preserved() {
    let slope = 0.5;
    let field = Array2::from_shape_fn((40, 120), |(i, t)| wavelet(t as f64 - slope * i as f64));
    let config = SmoothingConfig {
        rect: [10, 10, 1],
        ..SmoothingConfig::with_radius(3)
    };
    let out = structural_smooth(&field, &config).unwrap();
    for i in 5..35 {
        for t in 20..100 {
            assert_abs_diff_eq!(out[[i, t]], field[[i, t]], epsilon = 0.1);
        }
    }
}

#[test]
fn test_configuration_from_json() {
    let config: SmoothingConfig =
        serde_json::from_str(r#"{"radius": 3, "rect": [10, 10, 1], "normalize": true}"#).unwrap();
    assert_eq!(config.radius, 3);
    assert_eq!(config.eps, 0.1);
    assert_eq!(config.order, 3);

    let field = Array2::from_shape_fn((12, 50), |(i, t)| 100.0 * wavelet(t as f64 - 0.25 * i as f64));
    let out = structural_smooth(&field, &config).unwrap();
    assert_eq!(out.dim(), field.dim());
}

#[test]
fn test_cancelled_run_yields_no_output() {
    let control = StageControl::new();
    control.abort();
    let field = Array2::from_shape_fn((10, 40), |(i, t)| wavelet(t as f64 - 0.1 * i as f64));
    let result = structural_smooth_with_control(&field, &SmoothingConfig::default(), &control);
    assert!(matches!(result, Err(SmoothError::Cancelled)));
    assert_eq!(control.progress(), None);
}

#[test]
fn test_invalid_parameters_are_reported() {
    let field = Array2::from_elem((4, 20), 1.0);
    let bad = [
        SmoothingConfig::with_radius(0),
        SmoothingConfig {
            eps: -1.0,
            ..SmoothingConfig::default()
        },
        SmoothingConfig {
            order: 0,
            ..SmoothingConfig::default()
        },
        SmoothingConfig {
            rect: [0, 20, 1],
            ..SmoothingConfig::default()
        },
    ];
    for config in &bad {
        assert!(matches!(
            structural_smooth(&field, config),
            Err(SmoothError::InvalidParameter { .. })
        ));
    }
}
