use std::{fmt, sync::Arc};

use ndarray::ArrayD;
use tracing::{debug, info};

use crate::{
    dataset::{Coordinate, CoordinateValues, Schema, Variable},
    errors::{Error, Result},
    slice::IndexRequest,
    source::{Opener, Source},
};

/// An opened dataset plus its cached schema.
///
/// The underlying dataset object belongs to the array-I/O library; the handle only keeps a
/// shared reference to it. Handles expose no mutation and may be shared between sessions.
///
pub struct DatasetHandle {
    path: String,
    source: Arc<dyn Source>,
    schema: Schema,
}

impl DatasetHandle {
    /// Open the dataset at `path` using `opener`.
    ///
    /// Fails with `DatasetUnreadable` if the library can't open it or if the schema it reports
    /// is inconsistent (a dimension whose coordinate length doesn't match the variable's shape).
    /// Dimensions without coordinate values get an index coordinate `0..len`.
    ///
    pub async fn open(opener: &dyn Opener, path: &str) -> Result<Self> {
        let unreadable = |source| Error::DatasetUnreadable {
            path: path.to_string(),
            source,
        };
        let source = opener.open(path).await.map_err(unreadable)?;
        let schema = source.schema();
        let schema = check_schema(schema).map_err(|reason| unreadable(reason.into()))?;

        info!(
            path,
            variables = schema.variables.len(),
            coordinates = schema.coordinates.len(),
            "opened dataset"
        );

        Ok(Self {
            path: path.to_string(),
            source,
            schema,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Names of the data variables, in the order the dataset lists them
    pub fn list_variables(&self) -> Vec<&str> {
        self.schema
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.schema.get_variable(name)
    }

    /// Dimension names of `variable` in its native axis order
    pub fn dimensions_of(&self, variable: &str) -> Option<&[String]> {
        self.variable(variable).map(|v| v.dimensions.as_slice())
    }

    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.schema.get_coordinate(name)
    }

    pub fn coordinate_values(&self, name: &str) -> Option<&CoordinateValues> {
        self.coordinate(name).map(|c| &c.values)
    }

    /// Global attributes, led by a `dimensions` entry listing every dimension and its length.
    ///
    pub fn attributes(&self) -> Vec<(String, String)> {
        let dimensions = self
            .schema
            .coordinates
            .iter()
            .map(|c| format!("{:?}: {}", c.name, c.len()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut attributes = vec![(String::from("dimensions"), format!("{{{dimensions}}}"))];
        attributes.extend(self.schema.attributes.iter().cloned());

        attributes
    }

    /// Read a subset of `variable` into memory.
    ///
    pub async fn read_slice(&self, variable: &str, request: &IndexRequest) -> Result<ArrayD<f64>> {
        debug!(path = %self.path, variable, shape = ?request.shape(), "reading slice");
        self.source
            .read(variable, request)
            .await
            .map_err(|source| Error::DatasetReadError {
                variable: variable.to_string(),
                source,
            })
    }
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("path", &self.path)
            .field("schema", &self.schema)
            .finish()
    }
}

fn check_schema(mut schema: Schema) -> std::result::Result<Schema, String> {
    let mut missing = vec![];
    for var in &schema.variables {
        if var.dimensions.len() != var.shape.len() {
            return Err(format!(
                "variable {:?} has {} dimensions but a shape of rank {}",
                var.name,
                var.dimensions.len(),
                var.shape.len()
            ));
        }

        for (name, &len) in var.dimensions.iter().zip(&var.shape) {
            let known = schema
                .get_coordinate(name)
                .map(|c| c.len())
                .or_else(|| {
                    missing
                        .iter()
                        .find(|c: &&Coordinate| &c.name == name)
                        .map(|c| c.len())
                });
            match known {
                Some(coord_len) if coord_len != len => {
                    return Err(format!(
                        "coordinate {name:?} has {coord_len} values but variable {:?} has {len} \
                         along it",
                        var.name
                    ));
                }
                Some(_) => {}
                None => {
                    let index = Coordinate::range(name.as_str(), 0.0, 1.0, len);
                    missing.push(index.with_dtype("int64"));
                }
            }
        }
    }
    schema.coordinates.extend(missing);

    Ok(schema)
}
