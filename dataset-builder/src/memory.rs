//! Datasets held entirely in RAM.
//!
//! `MemoryOpener` is a registry of named in-memory datasets. It is useful for built in sample
//! datasets and for testing collaborators without an array-I/O library.
//!
use std::{collections::HashMap, result, sync::Arc};

use async_trait::async_trait;
use ndarray::{ArrayD, Axis, Slice};
use parking_lot::Mutex;

use crate::{
    dataset::{Coordinate, Schema, Variable},
    errors::SourceError,
    slice::{IndexRequest, IndexSelector},
    source::{Opener, Source},
};

/// An `Opener` that serves registered `MemorySource`s by path
///
#[derive(Default)]
pub struct MemoryOpener {
    sources: HashMap<String, Arc<MemorySource>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, path: S, source: Arc<MemorySource>) {
        self.sources.insert(path.into(), source);
    }

    pub fn with<S: Into<String>>(mut self, path: S, source: Arc<MemorySource>) -> Self {
        self.insert(path, source);
        self
    }
}

#[async_trait]
impl Opener for MemoryOpener {
    async fn open(&self, path: &str) -> result::Result<Arc<dyn Source>, SourceError> {
        match self.sources.get(path) {
            Some(source) => Ok(Arc::clone(source) as Arc<dyn Source>),
            None => Err(format!("no dataset registered at {path:?}").into()),
        }
    }
}

/// A dataset made of dense `f64` arrays, one per variable
///
pub struct MemorySource {
    schema: Schema,
    data: HashMap<String, ArrayD<f64>>,

    /// The most recent request served by `read`
    last_request: Mutex<Option<IndexRequest>>,
}

impl MemorySource {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self {
            schema: Schema {
                coordinates,
                ..Schema::default()
            },
            data: HashMap::new(),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.schema.attributes.push((key.into(), value.into()));
        self
    }

    /// Add a variable laid out along `dimensions`, in order. Its shape is taken from `data`.
    ///
    pub fn with_variable<S: Into<String>>(
        mut self,
        name: S,
        dimensions: &[&str],
        data: ArrayD<f64>,
    ) -> Self {
        let name = name.into();
        let variable = Variable::new(name.as_str(), dimensions, data.shape());
        self.schema.variables.push(variable);
        self.data.insert(name, data);
        self
    }

    pub fn last_request(&self) -> Option<IndexRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl Source for MemorySource {
    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    async fn read(
        &self,
        variable: &str,
        request: &IndexRequest,
    ) -> result::Result<ArrayD<f64>, SourceError> {
        let data = self
            .data
            .get(variable)
            .ok_or_else(|| format!("no variable named {variable:?}"))?;
        if request.len() != data.ndim() {
            return Err(format!(
                "request has {} selectors for {variable:?} which has {} dimensions",
                request.len(),
                data.ndim()
            )
            .into());
        }

        let mut view = data.view();
        let mut singles = vec![];
        for (axis, (name, selector)) in request.iter().enumerate() {
            let len = data.shape()[axis];
            let slice = match *selector {
                IndexSelector::Single(index) if index < len => {
                    singles.push(axis);
                    Slice::new(index as isize, Some(index as isize + 1), 1)
                }
                IndexSelector::Range(range) if range.stop <= len => Slice::new(
                    range.start as isize,
                    Some(range.stop as isize),
                    range.step as isize,
                ),
                _ => {
                    return Err(
                        format!("{selector:?} is out of bounds for {name:?} of length {len}")
                            .into(),
                    );
                }
            };
            view.slice_axis_inplace(Axis(axis), slice);
        }

        let mut array = view.to_owned();
        for &axis in singles.iter().rev() {
            array = array.index_axis_move(Axis(axis), 0);
        }

        *self.last_request.lock() = Some(request.clone());

        Ok(array)
    }
}
