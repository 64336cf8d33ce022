//! Typed pipeline adapter over any iterator.
//!
//! `Pipeline` wraps an iterator and chains intermediate stages (filter,
//! map, flat_map, sorted, limit, skip, distinct, inspect) before one
//! terminal operation (count, sum_by, collect, collect_map, group_by,
//! join). Intermediate stages preserve input order unless they sort;
//! every stage is a pure function of its input, so results are
//! deterministic given the stage chain.
//!
//! ## Example
//!
//! ```
//! use textpipes::{Person, Pipeline};
//!
//! let people = vec![
//!     Person::new("Gerald", "Hawkshead"),
//!     Person::new("Felicity", "Coniston"),
//!     Person::new("Eustace", "Hawkshead"),
//! ];
//!
//! let first_names = Pipeline::new(people.into_iter())
//!     .sorted_by(Person::by_last_then_first)
//!     .map(|p| p.first_name().to_string())
//!     .collect();
//!
//! assert_eq!(first_names, vec!["Felicity", "Eustace", "Gerald"]);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::fs;
use std::hash::Hash;
use std::iter;
use std::ops::{Range, RangeInclusive};
use std::path::Path;
use std::vec;

use crate::error::PipelineError;

/// A source sequence with chained transformation stages.
pub struct Pipeline<I> {
    iter: I,
}

impl<I> Pipeline<I>
where
    I: Iterator,
{
    pub fn new(iter: I) -> Self {
        Self { iter }
    }

    // --- Intermediate stages ---

    /// Keep items satisfying the predicate, preserving order.
    pub fn filter<P>(self, predicate: P) -> Pipeline<iter::Filter<I, P>>
    where
        P: FnMut(&I::Item) -> bool,
    {
        Pipeline::new(self.iter.filter(predicate))
    }

    /// Transform each item to one output item.
    pub fn map<B, F>(self, f: F) -> Pipeline<iter::Map<I, F>>
    where
        F: FnMut(I::Item) -> B,
    {
        Pipeline::new(self.iter.map(f))
    }

    /// Transform each item into zero or more output items, concatenated
    /// in input order.
    pub fn flat_map<U, F>(self, f: F) -> Pipeline<iter::FlatMap<I, U, F>>
    where
        U: IntoIterator,
        F: FnMut(I::Item) -> U,
    {
        Pipeline::new(self.iter.flat_map(f))
    }

    /// Observe each item without changing the stream.
    pub fn inspect<F>(self, f: F) -> Pipeline<iter::Inspect<I, F>>
    where
        F: FnMut(&I::Item),
    {
        Pipeline::new(self.iter.inspect(f))
    }

    /// Keep the first n items of the current order. Yields everything
    /// without error when n exceeds the remaining length.
    pub fn limit(self, n: usize) -> Pipeline<iter::Take<I>> {
        Pipeline::new(self.iter.take(n))
    }

    /// Drop the first n items.
    pub fn skip(self, n: usize) -> Pipeline<iter::Skip<I>> {
        Pipeline::new(self.iter.skip(n))
    }

    /// Stable sort by the natural ordering.
    pub fn sorted(self) -> Pipeline<vec::IntoIter<I::Item>>
    where
        I::Item: Ord,
    {
        let mut items: Vec<_> = self.iter.collect();
        items.sort();
        Pipeline::new(items.into_iter())
    }

    /// Stable sort by the given comparator. Composite orderings (primary
    /// key then secondary key) are expressed in the comparator itself.
    pub fn sorted_by<F>(self, cmp: F) -> Pipeline<vec::IntoIter<I::Item>>
    where
        F: FnMut(&I::Item, &I::Item) -> Ordering,
    {
        let mut items: Vec<_> = self.iter.collect();
        items.sort_by(cmp);
        Pipeline::new(items.into_iter())
    }

    /// Remove duplicates by structural equality, keeping the first
    /// occurrence of each item in input order.
    pub fn distinct(self) -> Pipeline<vec::IntoIter<I::Item>>
    where
        I::Item: Eq + Hash + Clone,
    {
        let mut seen = HashSet::new();
        let items: Vec<_> = self.iter.filter(|item| seen.insert(item.clone())).collect();
        Pipeline::new(items.into_iter())
    }

    // --- Terminal operations ---

    /// Number of items.
    pub fn count(self) -> usize {
        self.iter.count()
    }

    /// Arithmetic sum of an integer projection of each item.
    pub fn sum_by<F>(self, mut f: F) -> i64
    where
        F: FnMut(&I::Item) -> i64,
    {
        self.iter.map(|item| f(&item)).sum()
    }

    /// Materialize the ordered sequence.
    pub fn collect(self) -> Vec<I::Item> {
        self.iter.collect()
    }

    /// Build a key-to-value mapping. Fails fast on the first duplicate
    /// key rather than overwriting.
    pub fn collect_map<K, V, KF, VF>(
        self,
        mut key_fn: KF,
        mut value_fn: VF,
    ) -> Result<BTreeMap<K, V>, PipelineError>
    where
        K: Ord + Display,
        KF: FnMut(&I::Item) -> K,
        VF: FnMut(&I::Item) -> V,
    {
        let mut map = BTreeMap::new();
        for item in self.iter {
            let key = key_fn(&item);
            if map.contains_key(&key) {
                return Err(PipelineError::DuplicateKey {
                    key: key.to_string(),
                });
            }
            map.insert(key, value_fn(&item));
        }
        Ok(map)
    }

    /// Build a key-to-list mapping, preserving per-group input order.
    pub fn group_by<K, KF>(self, mut key_fn: KF) -> BTreeMap<K, Vec<I::Item>>
    where
        K: Ord,
        KF: FnMut(&I::Item) -> K,
    {
        let mut groups: BTreeMap<K, Vec<I::Item>> = BTreeMap::new();
        for item in self.iter {
            groups.entry(key_fn(&item)).or_default().push(item);
        }
        groups
    }

    /// Concatenate string projections with the separator, no trailing
    /// separator.
    pub fn join(self, separator: &str) -> String
    where
        I::Item: AsRef<str>,
    {
        self.iter
            .map(|item| item.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl<I> IntoIterator for Pipeline<I>
where
    I: Iterator,
{
    type Item = I::Item;
    type IntoIter = I;

    fn into_iter(self) -> I {
        self.iter
    }
}

// --- Sources ---

/// One `String` item per non-empty line of `text`.
pub fn from_lines(text: &str) -> Pipeline<vec::IntoIter<String>> {
    let lines: Vec<String> = text
        .lines()
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    Pipeline::new(lines.into_iter())
}

/// Read `path` and stream its non-empty lines.
///
/// The file is opened, fully consumed and closed within this call; a
/// missing or unreadable file surfaces as [`PipelineError::Io`] and no
/// partial pipeline is produced.
pub fn from_file(path: impl AsRef<Path>) -> Result<Pipeline<vec::IntoIter<String>>, PipelineError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(from_lines(&text))
}

/// Integers from `start` up to but not including `end`.
pub fn range(start: i64, end: i64) -> Pipeline<Range<i64>> {
    Pipeline::new(start..end)
}

/// Integers from `start` through `end`.
pub fn range_inclusive(start: i64, end: i64) -> Pipeline<RangeInclusive<i64>> {
    Pipeline::new(start..=end)
}
