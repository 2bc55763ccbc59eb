use std::{collections::BTreeMap, fmt, sync::Arc};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    axes::{auto_select, Axis, AxisMapping},
    dataset::{Coordinate, CoordinateInfo, Variable},
    errors::{Error, Result},
    handle::DatasetHandle,
    notify::{Category, Change, Notifier, Subscription},
    slice::{resolve, CoordinateSlice, IndexRequest, IndexSelector, IndexSlice, SliceBound},
    source::Opener,
};

/// Presentation flags kept on behalf of the UI.
///
/// The selection state stores these but, apart from the documented side effects on
/// `axis_drawer` and `expanded_coordinates`, never interprets them.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub main_drawer: bool,
    pub axis_drawer: bool,
    pub unapplied_changes: bool,
    pub error_message: Option<String>,
    pub more_info_link: Option<String>,
    pub expanded_coordinates: Vec<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            main_drawer: true,
            axis_drawer: false,
            unapplied_changes: false,
            error_message: None,
            more_info_link: None,
            expanded_coordinates: vec![],
        }
    }
}

impl UiState {
    fn expand(&mut self, coordinate: &str) {
        if !self.expanded_coordinates.iter().any(|c| c == coordinate) {
            self.expanded_coordinates.push(coordinate.to_string());
        }
    }
}

/// The user's current choices for viewing a dataset.
///
/// Every mutation is validated against the schema of the open dataset and either applies fully
/// or leaves the state untouched. Successful mutations notify subscribers once the state has been
/// updated.
///
/// A `SelectionState` is meant to be driven from one logical thread of control. Separate viewer
/// sessions should each have their own, though they may share a `DatasetHandle`.
///
pub struct SelectionState {
    opener: Arc<dyn Opener>,
    handle: Option<Arc<DatasetHandle>>,
    active: Option<String>,
    axes: AxisMapping,
    slices: BTreeMap<String, CoordinateSlice>,
    t_index: usize,
    ui: UiState,
    notifier: Notifier,
}

impl SelectionState {
    /// Create an empty selection state that opens datasets with `opener`.
    ///
    pub fn new(opener: Arc<dyn Opener>) -> Self {
        Self {
            opener,
            handle: None,
            active: None,
            axes: AxisMapping::default(),
            slices: BTreeMap::new(),
            t_index: 0,
            ui: UiState::default(),
            notifier: Notifier::new(),
        }
    }

    // ---------------------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------------------

    pub fn dataset_path(&self) -> Option<&str> {
        self.handle.as_ref().map(|handle| handle.path())
    }

    pub fn handle(&self) -> Option<&Arc<DatasetHandle>> {
        self.handle.as_ref()
    }

    pub fn active_variable(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn axis_mapping(&self) -> &AxisMapping {
        &self.axes
    }

    pub fn coordinate_slice(&self, coordinate: &str) -> Option<&CoordinateSlice> {
        self.slices.get(coordinate)
    }

    pub fn coordinate_slices(&self) -> &BTreeMap<String, CoordinateSlice> {
        &self.slices
    }

    pub fn time_index(&self) -> usize {
        self.t_index
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Dimension names of the active variable, in its native axis order
    pub fn dimensions(&self) -> &[String] {
        match self.variable() {
            Ok(variable) => &variable.dimensions,
            Err(_) => &[],
        }
    }

    /// Describe a dimension of the active variable
    pub fn coordinate_info(&self, coordinate: &str) -> Result<CoordinateInfo> {
        Ok(self.dimension(coordinate)?.info())
    }

    pub fn subscribe(&mut self, filter: Option<Category>) -> Subscription {
        self.notifier.subscribe(filter)
    }

    // ---------------------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------------------

    /// Open the dataset at `path`, replacing the current one.
    ///
    /// Clears the active variable, axis mapping, coordinate slices, time index and expanded
    /// coordinates. If the dataset can't be opened the state is left as it was.
    ///
    pub async fn set_dataset_path<S: AsRef<str>>(&mut self, path: S) -> Result<()> {
        let handle = DatasetHandle::open(self.opener.as_ref(), path.as_ref()).await?;
        self.set_dataset_handle(Arc::new(handle));

        Ok(())
    }

    /// Use an already opened dataset, possibly shared with other sessions. Resets the same
    /// fields as `set_dataset_path`.
    ///
    pub fn set_dataset_handle(&mut self, handle: Arc<DatasetHandle>) {
        let path = handle.path().to_string();
        self.handle = Some(handle);
        self.active = None;
        self.axes = AxisMapping::default();
        self.slices.clear();
        self.t_index = 0;
        self.ui.expanded_coordinates.clear();

        debug!(%path, "dataset set");
        self.notifier.notify(Change::Dataset { path });
    }

    /// Choose the variable to view.
    ///
    /// Resets the axis mapping, coordinate slices, time index and expanded coordinates, since
    /// they referred to the previous variable's dimensions, and opens the axis drawer.
    ///
    pub fn set_active_variable(&mut self, name: &str) -> Result<()> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        if handle.variable(name).is_none() {
            return Err(Error::UnknownVariable(name.to_string()));
        }

        self.active = Some(name.to_string());
        self.axes = AxisMapping::default();
        self.slices.clear();
        self.t_index = 0;
        self.ui.expanded_coordinates.clear();
        self.ui.axis_drawer = true;

        debug!(name, "active variable set");
        self.notifier.notify(Change::Variable {
            name: name.to_string(),
        });

        Ok(())
    }

    /// Assign `coordinate` to `axis`, or unassign `axis` if `coordinate` is `None`.
    ///
    /// A coordinate may only be assigned to one axis at a time. A newly mapped coordinate is
    /// expanded in the UI and, if it has no slice yet, gets one spanning its full extent.
    /// Mapping `t` resets a time index that would be out of range for the new coordinate.
    ///
    pub fn set_axis_mapping(&mut self, axis: Axis, coordinate: Option<&str>) -> Result<()> {
        let coordinate = match coordinate {
            None => None,
            Some(name) => {
                let coord = self.dimension(name)?;
                if let Some(assigned) = self.axes.axis_of(name) {
                    if assigned != axis {
                        return Err(Error::DuplicateAxisAssignment {
                            coordinate: name.to_string(),
                            assigned,
                        });
                    }
                }
                Some((name.to_string(), CoordinateSlice::full(coord), coord.len()))
            }
        };

        let name = coordinate.map(|(name, full, len)| {
            if let Some(full) = full {
                self.slices.entry(name.clone()).or_insert(full);
            }
            if axis == Axis::T && self.t_index >= len {
                self.t_index = 0;
            }
            self.ui.expand(&name);
            name
        });
        self.axes.set(axis, name.clone());

        debug!(%axis, coordinate = ?name, "axis mapping set");
        self.notifier.notify(Change::AxisMapping {
            axis,
            coordinate: name,
        });

        Ok(())
    }

    /// Restrict `coordinate` to the values from `start` up to `stop`, taking every `step`th one.
    ///
    /// Bounds must match the coordinate's kind (numbers or datetimes). The range itself isn't
    /// checked; out of range or reversed bounds simply select less, or nothing.
    ///
    pub fn set_coordinate_slice(
        &mut self,
        coordinate: &str,
        start: SliceBound,
        stop: SliceBound,
        step: i64,
    ) -> Result<()> {
        let coord = self.dimension(coordinate)?;
        let slice = CoordinateSlice::new(start, stop, step)?;
        for bound in [start, stop] {
            if bound.kind() != coord.kind() {
                return Err(Error::InvalidBound {
                    coordinate: coordinate.to_string(),
                    reason: format!("{bound:?} can't be compared to {:?} values", coord.kind()),
                });
            }
        }

        self.slices.insert(coordinate.to_string(), slice);

        debug!(coordinate, ?slice, "coordinate slice set");
        self.notifier.notify(Change::Slice {
            coordinate: coordinate.to_string(),
        });

        Ok(())
    }

    /// Choose the position along the `t` axis.
    ///
    /// Must be in range for the `t` coordinate when `t` is mapped; otherwise it is stored and
    /// ignored until `t` is mapped.
    ///
    pub fn set_time_index(&mut self, index: usize) -> Result<()> {
        if let Some(length) = self.time_length() {
            if index >= length {
                return Err(Error::IndexOutOfRange { index, length });
            }
        }

        self.t_index = index;

        debug!(index, "time index set");
        self.notifier.notify(Change::TimeIndex { index });

        Ok(())
    }

    /// Map axes from dimension names (see `axes::auto_select`), if no axis is mapped yet.
    ///
    pub fn auto_select_axes(&mut self) -> Result<()> {
        if !self.axes.is_empty() {
            return Ok(());
        }

        for (axis, name) in auto_select(self.dimensions()) {
            self.set_axis_mapping(axis, Some(&name))?;
        }

        Ok(())
    }

    pub fn toggle_coordinate_expansion(&mut self, coordinate: &str) {
        let expanded = &mut self.ui.expanded_coordinates;
        match expanded.iter().position(|c| c == coordinate) {
            Some(position) => {
                expanded.remove(position);
            }
            None => expanded.push(coordinate.to_string()),
        }

        self.notifier.notify(Change::Ui);
    }

    pub fn set_ui(&mut self, ui: UiState) {
        self.ui = ui;
        self.notifier.notify(Change::Ui);
    }

    pub fn update_ui<F>(&mut self, update: F)
    where
        F: FnOnce(&mut UiState),
    {
        update(&mut self.ui);
        self.notifier.notify(Change::Ui);
    }

    // ---------------------------------------------------------------------------------------
    // Slicing
    // ---------------------------------------------------------------------------------------

    /// Build the request for reading the active variable with the current selection.
    ///
    /// The dimension mapped to `t` is read at the time index. Other mapped dimensions are read
    /// over their resolved slice. Unmapped dimensions are read in full.
    ///
    pub fn current_index_request(&self) -> Result<IndexRequest> {
        let handle = self.require_handle()?;
        let variable = self.variable()?;

        let mut request = IndexRequest::new();
        for name in &variable.dimensions {
            let coord = handle
                .coordinate(name)
                .ok_or_else(|| Error::UnknownCoordinate(name.clone()))?;
            let full = IndexSlice::full(coord.len());
            let selector = match self.axes.axis_of(name) {
                Some(Axis::T) if self.t_index < coord.len() => IndexSelector::Single(self.t_index),
                Some(Axis::T) => IndexSelector::Range(full),
                Some(_) => match self.slices.get(name) {
                    Some(slice) => IndexSelector::Range(resolve(coord, slice)),
                    None => IndexSelector::Range(full),
                },
                None => IndexSelector::Range(full),
            };
            request.push(name.as_str(), selector);
        }

        Ok(request)
    }

    /// Size in bytes of the array `materialize` would currently produce
    pub fn estimated_size(&self) -> Result<u64> {
        let variable = self.variable()?;
        let elements: usize = self.current_index_request()?.shape().iter().product();

        Ok((elements * variable.itemsize) as u64)
    }

    /// Read the current selection of the active variable into memory.
    ///
    /// This is the one potentially long running operation; callers that need a timeout or
    /// cancellation should impose it around this call.
    ///
    pub async fn materialize(&self) -> Result<ArrayD<f64>> {
        let request = self.current_index_request()?;
        let variable = self.variable()?;

        self.require_handle()?
            .read_slice(&variable.name, &request)
            .await
    }

    // ---------------------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------------------

    fn require_handle(&self) -> Result<&Arc<DatasetHandle>> {
        self.handle
            .as_ref()
            .ok_or(Error::IncompleteSelection("no dataset is open"))
    }

    fn variable(&self) -> Result<&Variable> {
        let handle = self.require_handle()?;
        let name = self
            .active
            .as_deref()
            .ok_or(Error::IncompleteSelection("no active variable"))?;

        handle
            .variable(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    /// The coordinate for `name`, if it's a dimension of the active variable
    fn dimension(&self, name: &str) -> Result<&Coordinate> {
        let unknown = || Error::UnknownCoordinate(name.to_string());
        let variable = self.variable().map_err(|_| unknown())?;
        if !variable.has_dimension(name) {
            return Err(unknown());
        }

        self.require_handle()?
            .coordinate(name)
            .ok_or_else(unknown)
    }

    /// Length of the coordinate mapped to `t`, if any
    fn time_length(&self) -> Option<usize> {
        let name = self.axes.get(Axis::T)?;
        self.handle.as_ref()?.coordinate(name).map(|c| c.len())
    }

    /// Replace everything but the subscribers with `other`'s state
    pub(crate) fn replace_with(&mut self, other: SelectionState) {
        let SelectionState {
            opener,
            handle,
            active,
            axes,
            slices,
            t_index,
            ui,
            notifier: _,
        } = other;

        self.opener = opener;
        self.handle = handle;
        self.active = active;
        self.axes = axes;
        self.slices = slices;
        self.t_index = t_index;
        self.ui = ui;
    }

    pub(crate) fn opener(&self) -> &Arc<dyn Opener> {
        &self.opener
    }

    pub(crate) fn notify(&mut self, change: Change) {
        self.notifier.notify(change);
    }
}

impl fmt::Debug for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionState")
            .field("path", &self.dataset_path())
            .field("active", &self.active)
            .field("axes", &self.axes)
            .field("slices", &self.slices)
            .field("t_index", &self.t_index)
            .field("ui", &self.ui)
            .finish()
    }
}
