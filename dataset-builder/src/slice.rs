//! Value-space to index-space slice resolution.
//!
//! A `CoordinateSlice` names a range in terms of a coordinate's values plus an integer stride.
//! Resolving it against the coordinate's concrete (possibly irregular) values produces an
//! `IndexSlice`, and an `IndexRequest` collects one selector per dimension of a variable, in the
//! variable's native axis order.
//!
use serde_json::Value;

use crate::{
    dataset::{Coordinate, CoordinateKind},
    errors::{Error, Result},
    time::{format_datetime, parse_datetime},
};

/// A slice bound, expressed in the value type of the coordinate it applies to
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SliceBound {
    Number(f64),

    /// Seconds since the Unix epoch
    Time(i64),
}

impl SliceBound {
    pub fn kind(&self) -> CoordinateKind {
        match self {
            SliceBound::Number(_) => CoordinateKind::Numeric,
            SliceBound::Time(_) => CoordinateKind::Time,
        }
    }

    /// Position of this bound on the number line used for searching coordinate values
    pub(crate) fn key(&self) -> f64 {
        match *self {
            SliceBound::Number(value) => value,
            SliceBound::Time(seconds) => seconds as f64,
        }
    }

    /// Read a bound from a configuration document. Numbers are numeric bounds, strings are
    /// parsed as datetimes.
    ///
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_f64().map(SliceBound::Number),
            Value::String(text) => parse_datetime(text).map(SliceBound::Time),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match *self {
            SliceBound::Number(value) => Value::from(value),
            SliceBound::Time(seconds) => Value::String(format_datetime(seconds)),
        }
    }
}

/// A range of a coordinate in value space with an index-count stride.
///
/// `start` is inclusive and `stop` exclusive in the coordinate's traversal direction, except that
/// a `stop` at or beyond the coordinate's final value selects through the end. `start` may come
/// after `stop`, which selects nothing.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateSlice {
    pub start: SliceBound,
    pub stop: SliceBound,
    step: usize,
    _private: (),
}

impl CoordinateSlice {
    pub fn new(start: SliceBound, stop: SliceBound, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(Error::InvalidStep(step.to_string()));
        }

        Ok(Self {
            start,
            stop,
            step: step as usize,
            _private: (),
        })
    }

    /// The slice spanning all of `coordinate` with step 1, or `None` if the coordinate is empty.
    ///
    pub fn full(coordinate: &Coordinate) -> Option<Self> {
        let len = coordinate.len();
        if len == 0 {
            return None;
        }

        Some(Self {
            start: coordinate.bound_at(0),
            stop: coordinate.bound_at(len - 1),
            step: 1,
            _private: (),
        })
    }

    pub fn step(&self) -> usize {
        self.step
    }
}

/// A concrete `[start, stop)` index range with a positive step. `start <= stop` always holds.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSlice {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl IndexSlice {
    pub fn new(start: usize, stop: usize, step: usize) -> Self {
        let stop = stop.max(start);
        let step = step.max(1);
        Self { start, stop, step }
    }

    pub fn full(len: usize) -> Self {
        Self::new(0, len, 1)
    }

    /// Number of positions selected
    pub fn len(&self) -> usize {
        (self.stop - self.start + self.step - 1) / self.step
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..self.stop).step_by(self.step)
    }
}

/// How a single dimension is indexed when reading a variable
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexSelector {
    /// Select one position, dropping the dimension from the result
    Single(usize),
    Range(IndexSlice),
}

impl IndexSelector {
    /// Size of this dimension in the result, or `None` if the dimension is dropped.
    pub fn len(&self) -> Option<usize> {
        match self {
            IndexSelector::Single(_) => None,
            IndexSelector::Range(slice) => Some(slice.len()),
        }
    }
}

/// One selector per dimension of a variable, in the variable's native axis order
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexRequest {
    selectors: Vec<(String, IndexSelector)>,
}

impl IndexRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(&mut self, dimension: S, selector: IndexSelector) {
        self.selectors.push((dimension.into(), selector));
    }

    pub fn get(&self, dimension: &str) -> Option<&IndexSelector> {
        self.selectors
            .iter()
            .find(|(name, _)| name == dimension)
            .map(|(_, selector)| selector)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexSelector)> {
        self.selectors
            .iter()
            .map(|(name, selector)| (name.as_str(), selector))
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Shape of the array a read with this request produces
    pub fn shape(&self) -> Vec<usize> {
        self.selectors
            .iter()
            .filter_map(|(_, selector)| selector.len())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Order {
    Ascending,
    Descending,
    Unsorted,
}

fn order_of(coordinate: &Coordinate) -> Order {
    let len = coordinate.len();
    let pairs = || (1..len).map(|i| (coordinate.key(i - 1), coordinate.key(i)));
    if pairs().all(|(a, b)| a <= b) {
        Order::Ascending
    } else if pairs().all(|(a, b)| a >= b) {
        Order::Descending
    } else {
        Order::Unsorted
    }
}

/// Index of the first position in `0..len` for which `pred` is false, assuming `pred` is true for
/// a prefix of the range and false afterwards.
///
fn partition_point<F>(len: usize, pred: F) -> usize
where
    F: Fn(usize) -> bool,
{
    let (mut low, mut high) = (0, len);
    while low < high {
        let mid = low + (high - low) / 2;
        if pred(mid) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    low
}

/// Convert a value-space slice into an index-space slice against `coordinate`'s values.
///
/// Sorted coordinates (ascending or descending) are binary searched, anything else is scanned
/// linearly. Bounds outside the coordinate's extent clamp to it and reversed or empty ranges
/// produce an empty slice. This never fails.
///
pub fn resolve(coordinate: &Coordinate, slice: &CoordinateSlice) -> IndexSlice {
    let len = coordinate.len();
    if len == 0 {
        return IndexSlice::new(0, 0, slice.step);
    }

    let start = slice.start.key();
    let stop = slice.stop.key();
    let key = |i| coordinate.key(i);

    let (start_index, stop_index) = match order_of(coordinate) {
        Order::Ascending => {
            let start_index = partition_point(len, |i| key(i) < start);
            let stop_index = if stop >= key(len - 1) {
                len
            } else {
                partition_point(len, |i| key(i) < stop)
            };
            (start_index, stop_index)
        }
        Order::Descending => {
            let start_index = partition_point(len, |i| key(i) > start);
            let stop_index = if stop <= key(len - 1) {
                len
            } else {
                partition_point(len, |i| key(i) > stop)
            };
            (start_index, stop_index)
        }
        Order::Unsorted => {
            let max = (0..len).map(key).fold(f64::NEG_INFINITY, f64::max);
            let first_at_least = |bound: f64| (0..len).find(|&i| key(i) >= bound).unwrap_or(len);
            let start_index = first_at_least(start);
            let stop_index = if stop >= max {
                len
            } else {
                first_at_least(stop)
            };
            (start_index, stop_index)
        }
    };

    IndexSlice::new(start_index, stop_index, slice.step)
}
