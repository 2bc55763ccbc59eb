use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};

use crate::{
    dataset::Coordinate,
    memory::{MemoryOpener, MemorySource},
    time::TimeRange,
};

pub(crate) const SST_PATH: &str = "sst.zarr";

/// 2020-01-01T00:00:00, daily
const SST_TIMES: TimeRange = TimeRange {
    start: 1577836800,
    step: 86400,
};

pub(crate) fn lat_value(index: usize) -> f64 {
    -89.1 + 1.8 * index as f64
}

pub(crate) fn lon_value(index: usize) -> f64 {
    -178.2 + 3.6 * index as f64
}

pub(crate) fn sst_value(time: usize, lat: usize, lon: usize) -> f64 {
    270.0 + time as f64 + lat as f64 * 0.1 + lon as f64 * 0.001
}

pub(crate) fn mask_value(lat: usize, lon: usize) -> f64 {
    (lat * 100 + lon) as f64
}

/// A small global sea surface temperature dataset: 10 days on a 100 x 100 grid, plus a land
/// mask over the same grid.
///
pub(crate) fn sst() -> MemorySource {
    let sst = ArrayD::from_shape_fn(IxDyn(&[10, 100, 100]), |ix| {
        sst_value(ix[0], ix[1], ix[2])
    });
    let mask = ArrayD::from_shape_fn(IxDyn(&[100, 100]), |ix| mask_value(ix[0], ix[1]));

    MemorySource::new(vec![
        Coordinate::time_range("time", &SST_TIMES, 10),
        Coordinate::numeric("lat", (0..100).map(lat_value)).with_attr("units", "degrees_north"),
        Coordinate::numeric("lon", (0..100).map(lon_value)).with_attr("units", "degrees_east"),
    ])
    .with_attribute("title", "Sea surface temperature")
    .with_variable("analysed_sst", &["time", "lat", "lon"], sst)
    .with_variable("mask", &["lat", "lon"], mask)
}

pub(crate) fn opener_for(source: Arc<MemorySource>) -> MemoryOpener {
    MemoryOpener::new().with(SST_PATH, source)
}

pub(crate) fn opener() -> MemoryOpener {
    opener_for(Arc::new(sst()))
}
