//! Processing stages for 2D seismic sections.
//!
//! The sections are stored as `(trace, sample)` arrays. The stages run in a fixed
//! order inside the structural smoothing pipeline, but each one is usable on its
//! own and the public ones are also available through the filter registry.
//!
//! # Stages
//!
//! * **Row smoothing**: moving average along every trace, used to suppress noise
//!   before the dip is estimated.
//!
//! * **Dip estimation**: local slope of the dominant reflector at every sample,
//!   from regularised plane-wave destruction.
//!
//! * **Structure mean**: averages each trace with its neighbours after
//!   predicting them along the estimated dip.
//!
//! Each registered filter implements the `Filter` trait defined in the `filter`
//! module, providing a consistent interface for configuration and application.

/// Maximally flat fractional-delay filters.
/// Destruction residual, its derivative and trace-to-trace prediction.
mod allpass;

/// Shaping-regularised division of two fields.
mod divide;

/// Plane-wave destruction dip estimator.
pub mod dip_estimation;

/// Core filter interfaces and shared components.
/// Defines the `Filter` trait and the registry used by all filter implementations.
pub mod filter;

/// Centered moving average along each trace.
pub mod row_smoothing;

/// The full pipeline: row smoothing, dip estimation and structure mean.
pub mod structural_smoothing;

/// Averages traces along the local dip.
pub mod structure_mean;
