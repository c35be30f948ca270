//! Lazily mapped integer ranges.
//!
//! A [`LazyRange`] is the closed interval `[start, end]` plus a mapping from
//! each integer to an element. Nothing is computed until the range is
//! iterated, so `{1, 1E18}` costs the same to build as `{1, 3}`.

use std::convert::Infallible;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use rayon::prelude::*;

use crate::stack::ensure_sufficient_stack;

/// Rendering stops once this many bytes have been produced.
pub const RENDER_BUDGET: usize = 1000;

type Mapper<T> = Arc<dyn Fn(i64) -> T + Send + Sync>;

/// An immutable, restartable sequence over `[start, end]`.
pub struct LazyRange<T> {
    start: i64,
    end: i64,
    mapper: Mapper<T>,
}

impl LazyRange<i64> {
    /// The identity mapping over `[start, end]`. Empty when `start > end`.
    pub fn of(start: i64, end: i64) -> Self {
        Self::with_mapper(start, end, |i| i)
    }
}

impl<T> LazyRange<T> {
    pub fn with_mapper(start: i64, end: i64, mapper: impl Fn(i64) -> T + Send + Sync + 'static) -> Self {
        Self {
            start,
            end,
            mapper: Arc::new(mapper),
        }
    }

    /// Number of elements. Wide enough for the full `i64` span.
    pub fn len(&self) -> u128 {
        if self.is_empty() {
            0
        } else {
            (self.end as i128 - self.start as i128 + 1) as u128
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Composes `f` after the current mapping. `f` runs only when elements are produced.
    pub fn map<R>(&self, f: impl Fn(T) -> R + Send + Sync + 'static) -> LazyRange<R>
    where
        T: 'static,
    {
        let mapper = Arc::clone(&self.mapper);
        // Chained maps nest one call per layer when an element is produced.
        LazyRange::with_mapper(self.start, self.end, move |i| ensure_sufficient_stack(|| f(mapper(i))))
    }

    /// A fresh iterator from the first element; the range itself is never consumed.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            indices: self.start..=self.end,
            mapper: Arc::clone(&self.mapper),
        }
    }

    /// Elements in no particular evaluation order, for parallel folds.
    pub fn par_iter(&self) -> impl ParallelIterator<Item = T> + '_
    where
        T: Send,
    {
        (self.start..=self.end)
            .into_par_iter()
            .map(move |i| (self.mapper)(i))
    }

    /// Bracketed, comma separated text of the elements, cut short with `...`
    /// once [`RENDER_BUDGET`] is exceeded.
    pub fn try_render<E>(
        &self,
        mut write_element: impl FnMut(&mut String, T) -> Result<(), E>,
    ) -> Result<String, E> {
        let mut out = String::from("[");
        for (n, element) in self.iter().enumerate() {
            if n > 0 {
                out.push_str(", ");
            }
            write_element(&mut out, element)?;
            if out.len() > RENDER_BUDGET {
                out.push_str("...");
                break;
            }
        }
        out.push(']');
        Ok(out)
    }
}

impl<T> Clone for LazyRange<T> {
    fn clone(&self) -> Self {
        Self {
            start: self.start,
            end: self.end,
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<T> fmt::Debug for LazyRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRange")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

impl<T: fmt::Display> fmt::Display for LazyRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .try_render(|out, element| {
                use fmt::Write as _;
                let _ = write!(out, "{}", element);
                Ok::<(), Infallible>(())
            })
            .unwrap_or_else(|never| match never {});
        f.write_str(&text)
    }
}

impl<'a, T> IntoIterator for &'a LazyRange<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        self.iter()
    }
}

/// Iterator over a [`LazyRange`], mapping each index as it is reached.
pub struct Iter<T> {
    indices: RangeInclusive<i64>,
    mapper: Mapper<T>,
}

impl<T> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.indices.next().map(|i| (self.mapper)(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}
