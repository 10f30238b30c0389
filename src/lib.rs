//! Dip-guided structural smoothing of 2D seismic sections.
//!
//! A section is an array of shape `(traces, samples)`. [`structural_smooth`]
//! runs three stages on it:
//!
//! 1. a moving average along every trace ([`smooth_rows`]),
//! 2. local dip estimation by plane-wave destruction ([`estimate_dip`]),
//! 3. a structure-oriented mean along that dip ([`structure_mean`]).
//!
//! ```no_run
//! use ndarray::Array2;
//! use structural_smooth::{structural_smooth, SmoothingConfig};
//!
//! let section = Array2::<f64>::zeros((100, 500));
//! let smoothed = structural_smooth(&section, &SmoothingConfig::with_radius(4)).unwrap();
//! assert_eq!(smoothed.dim(), section.dim());
//! ```
//!
//! The stages are also registered in the filter registry and can be created by
//! key from JSON parameters, see [`FilterRegistry::create`].

pub mod config;
pub mod data_container;
pub mod error;
pub mod filters;
pub mod math_tools;

pub use config::{DipSolverConfig, SmoothingConfig, StructureMeanParams};
pub use data_container::{DipField, Field, StageControl};
pub use error::{SmoothError, SmoothResult};
pub use filters::dip_estimation::estimate_dip;
pub use filters::filter::{Filter, FilterRegistry, FILTER_REGISTRY};
pub use filters::row_smoothing::{smooth_row, smooth_rows};
pub use filters::structural_smoothing::{structural_smooth, structural_smooth_with_control};
pub use filters::structure_mean::structure_mean;
pub use math_tools::MinMaxScaler;
