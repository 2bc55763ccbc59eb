mod axes;
mod config;
mod dataset;
mod errors;
mod handle;
mod memory;
mod notify;
mod slice;
mod source;
mod state;

pub mod helpers;
pub mod time;

#[cfg(test)]
mod testing;

pub use axes::auto_select;
pub use axes::Axis;
pub use axes::AxisMapping;

pub use config::ArrayConfig;
pub use config::Config;
pub use config::SliceEntry;

pub use dataset::Coordinate;
pub use dataset::CoordinateInfo;
pub use dataset::CoordinateKind;
pub use dataset::CoordinateValues;
pub use dataset::Schema;
pub use dataset::Variable;

pub use errors::Error;
pub use errors::Result;
pub use errors::SourceError;

pub use handle::DatasetHandle;

pub use memory::MemoryOpener;
pub use memory::MemorySource;

pub use notify::Category;
pub use notify::Change;
pub use notify::Notifier;
pub use notify::Subscription;

pub use slice::resolve;
pub use slice::CoordinateSlice;
pub use slice::IndexRequest;
pub use slice::IndexSelector;
pub use slice::IndexSlice;
pub use slice::SliceBound;

pub use source::Opener;
pub use source::Source;

pub use state::SelectionState;
pub use state::UiState;
