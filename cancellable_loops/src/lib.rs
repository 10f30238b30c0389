//! # cancellable_loops
//!
//! Parallel loop helpers that stop early once an abort flag is raised.
//!
//! The smoothing stages run long loops over traces. A caller that wants to stop
//! a computation sets the shared [`AtomicBool`]; every helper here checks it
//! before each item and reports whether the loop ran to completion, so the
//! caller can discard a partially written buffer instead of handing it out.
//!
//! ## Example
//!
//! ```
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use cancellable_loops::par_for_each_cancellable;
//!
//! let abort_flag = AtomicBool::new(false);
//! assert!(par_for_each_cancellable(0..10, &abort_flag, |_| {}));
//!
//! abort_flag.store(true, Ordering::Relaxed);
//! assert!(!par_for_each_cancellable(0..10, &abort_flag, |_| {}));
//! ```

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs `func` on every item of `iter` in parallel with Rayon until the abort
/// flag is raised.
///
/// Items that have not started when the flag is raised are skipped. Items that
/// are already running finish normally. Returns `true` only if no item was
/// skipped.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
/// use cancellable_loops::par_for_each_cancellable;
///
/// let abort_flag = AtomicBool::new(false);
/// let counter = AtomicUsize::new(0);
///
/// let completed = par_for_each_cancellable(0..100, &abort_flag, |_| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
///
/// assert!(completed);
/// assert_eq!(counter.load(Ordering::Relaxed), 100);
/// ```
pub fn par_for_each_cancellable<I, F>(iter: I, abort_flag: &AtomicBool, func: F) -> bool
where
    I: IntoParallelIterator,
    F: Fn(I::Item) + Sync + Send,
    I::Item: Send,
{
    iter.into_par_iter()
        .try_for_each(|item| {
            if abort_flag.load(Ordering::Relaxed) {
                Err(())
            } else {
                func(item);
                Ok(())
            }
        })
        .is_ok()
}

/// Parallel fold with per-worker accumulators that can be cancelled.
///
/// Every Rayon worker starts from `identity()`, folds its share of the items
/// into that accumulator with `fold`, and the partial accumulators are merged
/// with `reduce`. This keeps one buffer per worker instead of one per item.
///
/// Returns `None` if the abort flag was raised before the last item was
/// folded, since the accumulated value would then be incomplete.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use cancellable_loops::par_fold_cancellable;
///
/// let abort_flag = AtomicBool::new(false);
/// let histogram = par_fold_cancellable(
///     0..1000usize,
///     &abort_flag,
///     || vec![0usize; 4],
///     |mut bins, i| {
///         bins[i % 4] += 1;
///         bins
///     },
///     |mut a, b| {
///         a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
///         a
///     },
/// );
///
/// assert_eq!(histogram, Some(vec![250, 250, 250, 250]));
/// ```
pub fn par_fold_cancellable<I, R, ID, F, RD>(
    iter: I,
    abort_flag: &AtomicBool,
    identity: ID,
    fold: F,
    reduce: RD,
) -> Option<R>
where
    I: IntoParallelIterator,
    I::Item: Send,
    R: Send,
    ID: Fn() -> R + Sync + Send,
    F: Fn(R, I::Item) -> R + Sync + Send,
    RD: Fn(R, R) -> R + Sync + Send,
{
    let result = iter
        .into_par_iter()
        .fold(&identity, |acc, item| {
            if abort_flag.load(Ordering::Relaxed) {
                acc
            } else {
                fold(acc, item)
            }
        })
        .reduce(&identity, &reduce);

    if abort_flag.load(Ordering::Relaxed) {
        None
    } else {
        Some(result)
    }
}
