use ndarray::Array1;
use num_traits::ToPrimitive;

use crate::{slice::SliceBound, time::TimeRange};

/// Metadata describing an opened dataset: its variables, coordinates and global attributes.
///
/// This is what the array-I/O library reports when a dataset is opened. It is cached by the
/// `DatasetHandle` so that validating user choices never goes back to the library.
///
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub variables: Vec<Variable>,
    pub coordinates: Vec<Coordinate>,
    pub attributes: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
pub struct Variable {
    /// Name of the variable, e.g. "analysed_sst"
    pub name: String,

    /// Names of the dimensions, in the variable's native axis order
    pub dimensions: Vec<String>,

    /// Length of each dimension
    pub shape: Vec<usize>,

    /// Label for the element type, e.g. "float32"
    pub dtype: String,

    /// Number of bytes per element
    pub itemsize: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateKind {
    Numeric,
    Time,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CoordinateValues {
    Numeric(Array1<f64>),

    /// Seconds since the Unix epoch
    Time(Array1<i64>),
}

/// A named one dimensional axis of values indexing one dimension of a variable
///
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinate {
    pub name: String,
    pub dtype: String,
    pub values: CoordinateValues,
    pub attrs: Vec<(String, String)>,
}

/// Summary of a coordinate for display
///
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateInfo {
    pub name: String,
    pub dtype: String,
    pub length: usize,
    pub range: (SliceBound, SliceBound),
    pub attrs: Vec<(String, String)>,
}

impl Schema {
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        for var in &self.variables {
            if var.name == name {
                return Some(var);
            }
        }

        None
    }

    pub fn get_coordinate(&self, name: &str) -> Option<&Coordinate> {
        for coord in &self.coordinates {
            if coord.name == name {
                return Some(coord);
            }
        }

        None
    }
}

impl Variable {
    pub fn new<S: Into<String>>(name: S, dimensions: &[&str], shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            dtype: String::from("float64"),
            itemsize: 8,
        }
    }

    pub fn with_dtype<S: Into<String>>(mut self, dtype: S, itemsize: usize) -> Self {
        self.dtype = dtype.into();
        self.itemsize = itemsize;
        self
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d == name)
    }
}

impl Coordinate {
    /// A numeric coordinate. Values that can't be represented as `f64` become NaN.
    ///
    pub fn numeric<S, N, I>(name: S, values: I) -> Self
    where
        S: Into<String>,
        N: ToPrimitive,
        I: IntoIterator<Item = N>,
    {
        let values = values
            .into_iter()
            .map(|n| n.to_f64().unwrap_or(f64::NAN))
            .collect();

        Self {
            name: name.into(),
            dtype: String::from("float64"),
            values: CoordinateValues::Numeric(values),
            attrs: vec![],
        }
    }

    /// A regularly spaced numeric coordinate
    pub fn range<S: Into<String>>(name: S, start: f64, step: f64, steps: usize) -> Self {
        Self::numeric(name, (0..steps).map(|i| start + i as f64 * step))
    }

    /// A time coordinate, with instants in seconds since the Unix epoch
    pub fn time<S, I>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = i64>,
    {
        Self {
            name: name.into(),
            dtype: String::from("datetime64[s]"),
            values: CoordinateValues::Time(values.into_iter().collect()),
            attrs: vec![],
        }
    }

    pub fn time_range<S: Into<String>>(name: S, range: &TimeRange, steps: usize) -> Self {
        Self::time(name, range.slice(0, steps))
    }

    pub fn with_dtype<S: Into<String>>(mut self, dtype: S) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> CoordinateKind {
        match self.values {
            CoordinateValues::Numeric(_) => CoordinateKind::Numeric,
            CoordinateValues::Time(_) => CoordinateKind::Time,
        }
    }

    pub fn len(&self) -> usize {
        match &self.values {
            CoordinateValues::Numeric(values) => values.len(),
            CoordinateValues::Time(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `index` as a slice bound
    pub fn bound_at(&self, index: usize) -> SliceBound {
        match &self.values {
            CoordinateValues::Numeric(values) => SliceBound::Number(values[index]),
            CoordinateValues::Time(values) => SliceBound::Time(values[index]),
        }
    }

    /// The value at `index` on the number line used for searching
    pub(crate) fn key(&self, index: usize) -> f64 {
        self.bound_at(index).key()
    }

    /// Smallest and largest values, ignoring NaN, or `None` if there are none.
    ///
    pub fn extent(&self) -> Option<(SliceBound, SliceBound)> {
        let mut extent: Option<(usize, usize)> = None;
        for i in 0..self.len() {
            let value = self.key(i);
            if value.is_nan() {
                continue;
            }
            extent = match extent {
                None => Some((i, i)),
                Some((low, high)) => {
                    let low = if value < self.key(low) { i } else { low };
                    let high = if value > self.key(high) { i } else { high };
                    Some((low, high))
                }
            };
        }

        extent.map(|(low, high)| (self.bound_at(low), self.bound_at(high)))
    }

    pub fn info(&self) -> CoordinateInfo {
        // Fall back to the index extent when there are no usable values
        let range = self.extent().unwrap_or((
            SliceBound::Number(0.0),
            SliceBound::Number(self.len() as f64),
        ));

        CoordinateInfo {
            name: self.name.clone(),
            dtype: self.dtype.clone(),
            length: self.len(),
            range,
            attrs: self.attrs.clone(),
        }
    }
}
