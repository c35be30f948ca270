//! Fold strategies for `reduce`.
//!
//! The engine never picks a strategy itself: the [`Runtime`](crate::Runtime)
//! supplies one per run. Elements of a Jet sequence are produced lazily and
//! may fail, and the accumulator may fail (a type fault, or cancellation), so
//! both are expressed as `Result` and a failure ends the fold early.

use rayon::prelude::*;

use crate::lazy_range::LazyRange;

/// Accumulator applied as `(acc, element) -> acc`.
pub type Accumulator<'a, T, E> = &'a (dyn Fn(T, T) -> Result<T, E> + Sync);

/// Reduces the elements of a sequence to one value, starting from `identity`.
pub trait Reducer<T, E>: Send + Sync {
    fn reduce(
        &self,
        sequence: &LazyRange<Result<T, E>>,
        identity: T,
        accumulator: Accumulator<'_, T, E>,
    ) -> Result<T, E>;
}

/// Left fold on the caller's thread, in iteration order.
///
/// Works for any accumulator, associative or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialReducer;

impl<T, E> Reducer<T, E> for SequentialReducer {
    fn reduce(
        &self,
        sequence: &LazyRange<Result<T, E>>,
        identity: T,
        accumulator: Accumulator<'_, T, E>,
    ) -> Result<T, E> {
        sequence
            .iter()
            .try_fold(identity, |acc, element| accumulator(acc, element?))
    }
}

/// Splits the sequence across the rayon thread pool and combines partial
/// results with the same accumulator.
///
/// The accumulator MUST be associative and `identity` MUST be neutral for it:
/// each split starts from its own copy of `identity`. With anything else the
/// result is unspecified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelReducer;

impl<T, E> Reducer<T, E> for ParallelReducer
where
    T: Clone + Send + Sync,
    E: Send,
{
    fn reduce(
        &self,
        sequence: &LazyRange<Result<T, E>>,
        identity: T,
        accumulator: Accumulator<'_, T, E>,
    ) -> Result<T, E> {
        sequence
            .par_iter()
            .try_reduce(|| identity.clone(), |acc, element| accumulator(acc, element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn ones(n: i64) -> LazyRange<Result<i64, Infallible>> {
        LazyRange::of(1, n).map(|_| Ok(1))
    }

    fn add(x: i64, y: i64) -> Result<i64, Infallible> {
        Ok(x + y)
    }

    fn sub(x: i64, y: i64) -> Result<i64, Infallible> {
        Ok(x - y)
    }

    #[test]
    fn test_sequential_associative() {
        assert_eq!(SequentialReducer.reduce(&ones(1_000_000), 0, &add), Ok(1_000_000));
    }

    #[test]
    fn test_sequential_non_associative() {
        assert_eq!(SequentialReducer.reduce(&ones(1_000_000), 0, &sub), Ok(-1_000_000));
    }

    #[test]
    fn test_sequential_is_left_fold() {
        // ((("" + a) + b) + c)
        let letters = LazyRange::of(0, 2).map(|i| Ok::<_, Infallible>(((b'a' + i as u8) as char).to_string()));
        let joined = SequentialReducer.reduce(&letters, String::new(), &|acc, x| Ok(acc + &x));
        assert_eq!(joined.unwrap(), "abc");
    }

    #[test]
    fn test_parallel_associative() {
        assert_eq!(ParallelReducer.reduce(&ones(1_000_000), 0, &add), Ok(1_000_000));
    }

    // Subtraction is not associative, so the parallel result is unspecified
    // and deliberately not compared with the sequential one.
    #[test]
    fn test_parallel_non_associative_is_unspecified() {
        let result = ParallelReducer.reduce(&ones(1_000_000), 0, &sub);
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_sequence_yields_identity() {
        let empty = LazyRange::of(1, 0).map(|_| Ok::<i64, Infallible>(1));
        assert_eq!(SequentialReducer.reduce(&empty, 42, &add), Ok(42));
        assert_eq!(ParallelReducer.reduce(&empty, 0, &add), Ok(0));
    }

    #[test]
    fn test_single_element() {
        assert_eq!(SequentialReducer.reduce(&ones(1), 10, &add), Ok(11));
        assert_eq!(ParallelReducer.reduce(&ones(1), 0, &add), Ok(1));
    }

    #[test]
    fn test_failing_element_stops_the_fold() {
        let faulty = LazyRange::of(1, 10).map(|i| if i == 5 { Err("boom") } else { Ok(i) });
        let seen = std::sync::atomic::AtomicUsize::new(0);
        let result = SequentialReducer.reduce(&faulty, 0, &|acc, x| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(acc + x)
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 4);

        assert_eq!(ParallelReducer.reduce(&faulty, 0, &|acc, x| Ok(acc + x)), Err("boom"));
    }

    #[test]
    fn test_failing_accumulator_stops_the_fold() {
        let result = SequentialReducer.reduce(&LazyRange::of(1, i64::MAX).map(Ok::<i64, &str>), 0, &|acc, x| {
            if x > 3 {
                Err("stop")
            } else {
                Ok(acc + x)
            }
        });
        assert_eq!(result, Err("stop"));
    }

    #[test]
    fn test_usable_as_trait_object() {
        let reducers: Vec<Box<dyn Reducer<i64, Infallible>>> = vec![Box::new(SequentialReducer), Box::new(ParallelReducer)];
        for reducer in &reducers {
            assert_eq!(reducer.reduce(&ones(100), 0, &add), Ok(100));
        }
    }
}
