//! Data types passed between the smoothing stages.

use crate::error::{SmoothError, SmoothResult};
use ndarray::{Array2, ArrayView2};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// A seismic section: axis 0 indexes traces, axis 1 indexes time samples.
pub type Field = Array2<f64>;

/// Local slope per sample, in samples of shift per trace of shift.
///
/// A section `f[trace, t] = g(t - s * trace)` has dip `s` everywhere.
pub type DipField = Array2<f64>;

/// Cancellation and progress handles shared between a caller and a running stage.
///
/// `progress` holds `Some(fraction)` while a stage runs and `None` once it is done.
#[derive(Clone, Debug, Default)]
pub struct StageControl {
    pub abort_flag: Arc<AtomicBool>,
    pub progress_lock: Arc<RwLock<Option<f32>>>,
}

impl StageControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the running computation stops as soon as possible.
    pub fn abort(&self) {
        self.abort_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_flag.load(Ordering::Relaxed)
    }

    /// Returns `Err(Cancelled)` if the abort flag is set.
    pub fn check(&self) -> SmoothResult<()> {
        if self.is_aborted() {
            Err(SmoothError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn set_progress(&self, progress: Option<f32>) {
        if let Ok(mut p) = self.progress_lock.write() {
            *p = progress;
        }
    }

    pub fn progress(&self) -> Option<f32> {
        self.progress_lock.read().ok().and_then(|p| *p)
    }
}

/// Rejects sections without traces or samples.
pub fn ensure_not_empty(field: ArrayView2<f64>) -> SmoothResult<()> {
    if field.is_empty() {
        return Err(SmoothError::EmptyField);
    }
    Ok(())
}

/// Checks that `other` has the same `(traces, samples)` shape as `field`.
pub fn ensure_same_shape(field: ArrayView2<f64>, other: ArrayView2<f64>) -> SmoothResult<()> {
    if field.dim() != other.dim() {
        return Err(SmoothError::ShapeMismatch {
            expected: field.dim(),
            found: other.dim(),
        });
    }
    Ok(())
}
