//! This module provides the `Filter` trait and a global, thread-safe registry of filters.
//!
//! Filters are looked up by key and configured from a JSON object of parameters.
//! Missing parameters keep their defaults.

use crate::data_container::{Field, StageControl};
use crate::error::{SmoothError, SmoothResult};
#[allow(unused_imports)] // this dependency is required by the `register_filter` macro
use ctor::ctor;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

/// The `Filter` trait defines a processing method that maps a section to a new
/// array of the same shape.
///
/// Filters must implement:
/// - A `new` function to initialize a filter with default parameters.
/// - A `config` function to provide metadata for the filter.
/// - A `configure` function that replaces the parameters from JSON.
/// - A `filter` function to apply the filter to a `Field`.
///
/// To add a filter, derive `Clone`, `Debug`, `Serialize` and `Deserialize` on the
/// parameter struct, implement this trait and annotate the struct with
/// `#[register_filter]`. The module also needs to be listed in `src/filters/mod.rs`.
///
/// **Example**:
/// ```ignore
/// #[register_filter]
/// #[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// #[serde(default)]
/// pub struct Negate {}
///
/// impl Filter for Negate {
///     fn new() -> Self { Negate {} }
///
///     fn config(&self) -> FilterConfig {
///         FilterConfig {
///             name: "Negate".to_string(),
///             description: "Flips the polarity of every sample.".to_string(),
///             domain: FilterDomain::Amplitude,
///         }
///     }
///
///     fn configure(&mut self, params: &serde_json::Value) -> SmoothResult<()> {
///         *self = parameters_from_json(params)?;
///         Ok(())
///     }
///
///     fn filter(&self, input: &Field, _control: &StageControl) -> SmoothResult<Field> {
///         Ok(input.mapv(|x| -x))
///     }
/// }
/// ```
pub trait Filter: Send + Sync + Debug + CloneBoxedFilter {
    /// Creates a new instance of the filter with default parameters.
    fn new() -> Self
    where
        Self: Sized;

    /// Returns the filter configuration, including name, description and domain.
    fn config(&self) -> FilterConfig;

    /// Replaces the parameters with the ones given as a JSON object and validates them.
    fn configure(&mut self, params: &serde_json::Value) -> SmoothResult<()>;

    /// Applies the filter to `input`.
    ///
    /// Long-running filters should poll `control.abort_flag` through the
    /// `cancellable_loops` helpers and report progress via `control.progress_lock`.
    fn filter(&self, input: &Field, control: &StageControl) -> SmoothResult<Field>;
}

/// What the values of a filter output mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDomain {
    /// Amplitudes, same units as the input section.
    Amplitude,
    /// Local slopes in samples per trace.
    Dip,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub name: String,
    pub description: String,
    pub domain: FilterDomain,
}

/// Reads a parameter struct from JSON. `null` yields the defaults.
pub fn parameters_from_json<T>(params: &serde_json::Value) -> SmoothResult<T>
where
    T: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(params.clone())?)
}

pub trait CloneBoxedFilter {
    fn clone_box(&self) -> Box<dyn Filter>;
}

impl<T> CloneBoxedFilter for T
where
    T: 'static + Filter + Clone,
{
    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Filter> {
    fn clone(&self) -> Box<dyn Filter> {
        self.as_ref().clone_box()
    }
}

#[derive(Debug)]
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn Filter>>,
}

impl FilterRegistry {
    /// Stores a default instance of `F` under `key`. Called at start-up by `#[register_filter]`.
    pub fn register_filter<F: Filter + 'static>(key: &str) {
        let filter_instance = F::new();
        log::trace!("registering filter `{}` as {key}", filter_instance.config().name);
        let mut registry = FILTER_REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        registry
            .filters
            .insert(key.to_string(), Box::new(filter_instance));
    }

    pub fn get_filter(&self, key: &str) -> Option<&dyn Filter> {
        self.filters.get(key).map(|f| f.as_ref())
    }

    /// Registered keys in alphabetical order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.filters.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Clones the filter registered under `key` and configures it from `params`.
    pub fn create(key: &str, params: &serde_json::Value) -> SmoothResult<Box<dyn Filter>> {
        let mut filter = {
            let registry = FILTER_REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
            registry
                .filters
                .get(key)
                .cloned()
                .ok_or_else(|| SmoothError::UnknownFilter(key.to_string()))?
        };
        filter.configure(params)?;
        Ok(filter)
    }
}

impl<'a> IntoIterator for &'a FilterRegistry {
    type Item = &'a Box<dyn Filter>;

    type IntoIter = std::collections::hash_map::Values<'a, String, Box<dyn Filter>>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.values()
    }
}

pub static FILTER_REGISTRY: Lazy<Mutex<FilterRegistry>> = Lazy::new(|| {
    Mutex::new(FilterRegistry {
        filters: HashMap::new(),
    })
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::row_smoothing::RowSmoothing;
    use crate::filters::structural_smoothing::StructuralSmoothing;
    use ndarray::Array2;
    use serde_json::json;

    #[test]
    fn test_builtin_filters_are_registered() {
        let registry = FILTER_REGISTRY.lock().unwrap();
        assert_eq!(
            registry.keys(),
            vec!["dip_estimation", "row_smoothing", "structural_smoothing"]
        );
        let filter = registry.get_filter(StructuralSmoothing::REGISTRY_KEY).unwrap();
        assert_eq!(filter.config().domain, FilterDomain::Amplitude);
        assert_eq!((&*registry).into_iter().count(), 3);
    }

    #[test]
    fn test_create_from_json_parameters() {
        let filter = FilterRegistry::create(RowSmoothing::REGISTRY_KEY, &json!({"window": 3})).unwrap();
        let input = Array2::from_shape_fn((2, 5), |(_, j)| (j * j) as f64);
        let output = filter.filter(&input, &StageControl::new()).unwrap();
        // [0, 1, 4, 9, 16] -> [0, 5/3, 14/3, 29/3, 16]
        assert_eq!(output[[1, 0]], 0.0);
        assert!((output[[1, 2]] - 14.0 / 3.0).abs() < 1e-12);
        assert_eq!(output[[1, 4]], 16.0);
    }

    #[test]
    fn test_create_rejects_unknown_and_malformed() {
        assert!(matches!(
            FilterRegistry::create("median", &serde_json::Value::Null),
            Err(SmoothError::UnknownFilter(_))
        ));
        assert!(matches!(
            FilterRegistry::create(RowSmoothing::REGISTRY_KEY, &json!({"window": "five"})),
            Err(SmoothError::Deserialize(_))
        ));
        assert!(matches!(
            FilterRegistry::create(RowSmoothing::REGISTRY_KEY, &json!({"window": 4})),
            Err(SmoothError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_null_parameters_give_defaults() {
        let filter =
            FilterRegistry::create(StructuralSmoothing::REGISTRY_KEY, &serde_json::Value::Null)
                .unwrap();
        assert_eq!(filter.config().name, "Structural Smoothing");
    }
}
