use std::{result, sync::Arc};

use async_trait::async_trait;
use ndarray::ArrayD;

use crate::{dataset::Schema, errors::SourceError, slice::IndexRequest};

/// A trait for opening datasets through an arbitrary array-I/O library.
///
#[async_trait]
pub trait Opener: Send + Sync {
    /// Open the dataset found at a local path or remote URL.
    ///
    /// Should fail if the path can't be read or parsed into a dataset.
    ///
    async fn open(&self, path: &str) -> result::Result<Arc<dyn Source>, SourceError>;
}

/// An opened dataset, as exposed by the array-I/O library.
///
/// Implementations must be safe to read from concurrently; the dataset is never mutated through
/// this interface.
///
#[async_trait]
pub trait Source: Send + Sync {
    /// Describe the dataset's variables and coordinates.
    ///
    /// Called once when the dataset is opened. Coordinate values must be complete, since
    /// irregular coordinates are searched rather than computed.
    ///
    fn schema(&self) -> Schema;

    /// Read a subset of `variable` into memory.
    ///
    /// `request` has exactly one selector per dimension of `variable`, in the variable's
    /// dimension order. Dimensions selected with `IndexSelector::Single` are dropped from the
    /// result.
    ///
    async fn read(
        &self,
        variable: &str,
        request: &IndexRequest,
    ) -> result::Result<ArrayD<f64>, SourceError>;
}
