//! The JSON configuration document and its conversion to and from `SelectionState`.
//!
//! A document has four sections: `data_origin` (where the dataset lives), `data_array` (the
//! active variable, axis mapping and time index), `data_slices` (one `[start, stop, step]` entry
//! per coordinate) and `ui`. Only `data_origin` and `data_array.active` are required.
//!
use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    axes::Axis,
    errors::{Error, Result},
    notify::Change,
    slice::{CoordinateSlice, SliceBound},
    state::{SelectionState, UiState},
};

/// `[start, stop, step]` as written in `data_slices`
pub type SliceEntry = (Value, Value, Value);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data_origin: Option<String>,

    #[serde(default)]
    pub data_array: Option<ArrayConfig>,

    #[serde(default)]
    pub data_slices: BTreeMap<String, SliceEntry>,

    #[serde(default)]
    pub ui: UiState,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    pub active: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    pub t_index: usize,
}

impl ArrayConfig {
    pub fn axis(&self, axis: Axis) -> Option<&str> {
        match axis {
            Axis::X => self.x.as_deref(),
            Axis::Y => self.y.as_deref(),
            Axis::Z => self.z.as_deref(),
            Axis::T => self.t.as_deref(),
        }
    }

    fn set_axis(&mut self, axis: Axis, coordinate: String) {
        let field = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::T => &mut self.t,
        };
        *field = Some(coordinate);
    }
}

impl Config {
    /// Load a configuration from `source`, which is either the path of a JSON file or JSON text.
    ///
    pub fn load(source: &str) -> Result<Self> {
        let path = Path::new(source);
        let config = if path.is_file() {
            serde_json::from_str(&fs::read_to_string(path)?)?
        } else {
            serde_json::from_str(source)?
        };

        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl SelectionState {
    /// Describe the current selection as a configuration document.
    ///
    /// Slices that still span their coordinate's full extent with step 1 are left out.
    ///
    pub fn export(&self) -> Config {
        let mut array = ArrayConfig {
            active: self.active_variable().map(String::from),
            t_index: self.time_index(),
            ..ArrayConfig::default()
        };
        for (axis, coordinate) in self.axis_mapping().iter() {
            array.set_axis(axis, coordinate.to_string());
        }

        let data_slices = self
            .coordinate_slices()
            .iter()
            .filter(|(name, slice)| !self.is_full_slice(name, slice))
            .map(|(name, slice)| {
                let entry = (
                    slice.start.to_json(),
                    slice.stop.to_json(),
                    Value::from(slice.step()),
                );
                (name.clone(), entry)
            })
            .collect();

        Config {
            data_origin: self.dataset_path().map(String::from),
            data_array: Some(array),
            data_slices,
            ui: self.ui().clone(),
        }
    }

    /// Replace the current selection with the one described by `config`.
    ///
    /// The document is applied through the same validated setters a UI would use: dataset path,
    /// active variable, axes `x`, `y`, `z`, `t`, coordinate slices, time index, then the UI flags
    /// verbatim. If any step fails, the error names it and the state is left exactly as it was.
    /// On success subscribers receive a single `Change::Imported`.
    ///
    pub async fn import(&mut self, config: &Config) -> Result<()> {
        let path = config
            .data_origin
            .as_deref()
            .ok_or(Error::MissingRequiredField("data_origin"))?;
        let array = config
            .data_array
            .as_ref()
            .filter(|array| array.active.is_some())
            .ok_or(Error::MissingRequiredField("data_array.active"))?;

        let mut staged = SelectionState::new(Arc::clone(self.opener()));
        if let Err(err) = stage(&mut staged, path, array, config).await {
            warn!(path, error = %err, "configuration import failed");
            return Err(err);
        }

        self.replace_with(staged);

        info!(path, "configuration imported");
        self.notify(Change::Imported {
            path: path.to_string(),
        });

        Ok(())
    }

    fn is_full_slice(&self, name: &str, slice: &CoordinateSlice) -> bool {
        self.handle()
            .and_then(|handle| handle.coordinate(name))
            .and_then(CoordinateSlice::full)
            .map_or(false, |full| full == *slice)
    }
}

async fn stage(
    state: &mut SelectionState,
    path: &str,
    array: &ArrayConfig,
    config: &Config,
) -> Result<()> {
    state
        .set_dataset_path(path)
        .await
        .map_err(Error::during("data_origin"))?;

    if let Some(active) = &array.active {
        state
            .set_active_variable(active)
            .map_err(Error::during("data_array.active"))?;
    }

    for axis in Axis::ALL {
        if let Some(coordinate) = array.axis(axis) {
            state
                .set_axis_mapping(axis, Some(coordinate))
                .map_err(Error::during(format!("data_array.{axis}")))?;
        }
    }

    for (name, (start, stop, step)) in &config.data_slices {
        let during = Error::during(format!("data_slices.{name}"));
        let applied = parse_bound(name, start).and_then(|start| {
            let stop = parse_bound(name, stop)?;
            let step = parse_step(step)?;
            state.set_coordinate_slice(name, start, stop, step)
        });
        applied.map_err(during)?;
    }

    state
        .set_time_index(array.t_index)
        .map_err(Error::during("data_array.t_index"))?;

    state.set_ui(config.ui.clone());

    Ok(())
}

fn parse_bound(coordinate: &str, value: &Value) -> Result<SliceBound> {
    SliceBound::from_json(value).ok_or_else(|| Error::InvalidBound {
        coordinate: coordinate.to_string(),
        reason: format!("{value} is neither a number nor a datetime"),
    })
}

/// Steps are integers, though an integral float like `2.0` is accepted.
///
fn parse_step(value: &Value) -> Result<i64> {
    let invalid = || Error::InvalidStep(value.to_string());
    if let Some(step) = value.as_i64() {
        return Ok(step);
    }

    match value.as_f64() {
        Some(step) if step.fract() == 0.0 && step.abs() < i64::MAX as f64 => Ok(step as i64),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tempfile::tempdir;

    use crate::{
        notify::Category,
        testing::{self, SST_PATH},
    };

    fn new_state() -> SelectionState {
        SelectionState::new(Arc::new(testing::opener()))
    }

    fn config(document: Value) -> Config {
        serde_json::from_value(document).unwrap()
    }

    fn full_document() -> Value {
        json!({
            "data_origin": SST_PATH,
            "data_array": {
                "active": "analysed_sst",
                "x": "lon",
                "y": "lat",
                "t": "time",
                "t_index": 5
            },
            "data_slices": {
                "lat": [-45.0, 45.0, 1],
                "lon": [0.0, 90.0, 2],
                "time": ["2020-01-02T00:00:00", "2020-01-08T00:00:00", 1]
            },
            "ui": {
                "main_drawer": false,
                "axis_drawer": true,
                "unapplied_changes": false,
                "error_message": null,
                "more_info_link": "https://example.com/sst",
                "expanded_coordinates": ["lat", "lon"]
            }
        })
    }

    #[tokio::test]
    async fn test_import() -> Result<()> {
        let mut state = new_state();
        state.import(&config(full_document())).await?;

        assert_eq!(state.dataset_path(), Some(SST_PATH));
        assert_eq!(state.active_variable(), Some("analysed_sst"));
        assert_eq!(state.axis_mapping().get(Axis::X), Some("lon"));
        assert_eq!(state.axis_mapping().get(Axis::Y), Some("lat"));
        assert_eq!(state.axis_mapping().get(Axis::Z), None);
        assert_eq!(state.axis_mapping().get(Axis::T), Some("time"));
        assert_eq!(state.time_index(), 5);

        let time = state.coordinate_slice("time").unwrap();
        assert_eq!(time.start, SliceBound::Time(1577836800 + 86400));
        assert_eq!(time.stop, SliceBound::Time(1577836800 + 7 * 86400));

        let lon = state.coordinate_slice("lon").unwrap();
        assert_eq!(lon.step(), 2);

        // UI flags are taken verbatim, not from the setters' side effects
        assert!(!state.ui().main_drawer);
        assert_eq!(state.ui().expanded_coordinates, vec!["lat", "lon"]);
        assert_eq!(
            state.ui().more_info_link.as_deref(),
            Some("https://example.com/sst")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip() -> Result<()> {
        let expected = config(full_document());
        let mut state = new_state();
        state.import(&expected).await?;

        assert_eq!(state.export(), expected);
        assert_eq!(serde_json::to_value(state.export())?, full_document());

        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip_defaults() -> Result<()> {
        let expected = config(json!({
            "data_origin": SST_PATH,
            "data_array": {"active": "mask"}
        }));
        let mut state = new_state();
        state.import(&expected).await?;

        let exported = serde_json::to_value(state.export())?;
        assert_eq!(
            exported,
            json!({
                "data_origin": SST_PATH,
                "data_array": {"active": "mask", "t_index": 0},
                "data_slices": {},
                "ui": {
                    "main_drawer": true,
                    "axis_drawer": false,
                    "unapplied_changes": false,
                    "error_message": null,
                    "more_info_link": null,
                    "expanded_coordinates": []
                }
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_export_leaves_out_full_slices() -> Result<()> {
        let mut state = new_state();
        state.set_dataset_path(SST_PATH).await?;
        state.set_active_variable("analysed_sst")?;
        state.auto_select_axes()?;
        assert_eq!(state.coordinate_slices().len(), 3);

        let exported = state.export();
        assert!(exported.data_slices.is_empty());

        let (start, stop) = (SliceBound::Number(0.0), SliceBound::Number(10.0));
        state.set_coordinate_slice("lat", start, stop, 1)?;
        let exported = state.export();
        assert_eq!(exported.data_slices.keys().collect::<Vec<_>>(), vec!["lat"]);
        assert_eq!(
            exported.data_slices["lat"],
            (json!(0.0), json!(10.0), json!(1))
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_data_origin() -> Result<()> {
        let mut state = new_state();
        state.import(&config(full_document())).await?;
        let before = format!("{state:?}");
        let mut changes = state.subscribe(None);

        let mut document = full_document();
        document.as_object_mut().unwrap().remove("data_origin");
        let result = state.import(&config(document)).await;

        assert!(matches!(
            result,
            Err(Error::MissingRequiredField("data_origin"))
        ));
        assert_eq!(format!("{state:?}"), before);
        assert!(changes.drain().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_active() {
        let mut state = new_state();
        for document in [
            json!({"data_origin": SST_PATH}),
            json!({"data_origin": SST_PATH, "data_array": {"x": "lon"}}),
        ] {
            let result = state.import(&config(document)).await;
            assert!(matches!(
                result,
                Err(Error::MissingRequiredField("data_array.active"))
            ));
        }
        assert_eq!(state.dataset_path(), None);
    }

    async fn import_error(document: Value) -> (String, Error) {
        let mut state = new_state();
        state.import(&config(full_document())).await.unwrap();
        let before = format!("{state:?}");
        let mut changes = state.subscribe(None);

        let err = state.import(&config(document)).await.unwrap_err();

        assert_eq!(format!("{state:?}"), before);
        assert!(changes.drain().is_empty());

        match err {
            Error::InvalidConfiguration { step, source } => (step, *source),
            err => panic!("expected InvalidConfiguration, got {err:?}"),
        }
    }

    #[tokio::test]
    async fn test_import_unreadable() {
        let mut document = full_document();
        document["data_origin"] = json!("elsewhere.zarr");
        let (step, source) = import_error(document).await;
        assert_eq!(step, "data_origin");
        assert!(matches!(source, Error::DatasetUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_import_unknown_variable() {
        let mut document = full_document();
        document["data_array"]["active"] = json!("salinity");
        let (step, source) = import_error(document).await;
        assert_eq!(step, "data_array.active");
        assert!(matches!(source, Error::UnknownVariable(_)));
    }

    #[tokio::test]
    async fn test_import_duplicate_axis() {
        let mut document = full_document();
        document["data_array"]["y"] = json!("lon");
        let (step, source) = import_error(document).await;
        assert_eq!(step, "data_array.y");
        assert!(matches!(source, Error::DuplicateAxisAssignment { .. }));
    }

    #[tokio::test]
    async fn test_import_bad_slices() {
        let mut document = full_document();
        document["data_slices"]["lat"] = json!([-45.0, 45.0, 0]);
        let (step, source) = import_error(document).await;
        assert_eq!(step, "data_slices.lat");
        assert!(matches!(source, Error::InvalidStep(_)));

        let mut document = full_document();
        document["data_slices"]["lat"] = json!([-45.0, 45.0, 1.5]);
        let (_, source) = import_error(document).await;
        assert!(matches!(source, Error::InvalidStep(_)));

        let mut document = full_document();
        document["data_slices"]["lat"] = json!(["2020-01-01", 45.0, 1]);
        let (_, source) = import_error(document).await;
        assert!(matches!(source, Error::InvalidBound { .. }));

        let mut document = full_document();
        document["data_slices"]["time"] = json!(["yesterday", "2020-01-08", 1]);
        let (step, source) = import_error(document).await;
        assert_eq!(step, "data_slices.time");
        assert!(matches!(source, Error::InvalidBound { .. }));

        let mut document = full_document();
        document["data_slices"]["depth"] = json!([0, 10, 1]);
        let (_, source) = import_error(document).await;
        assert!(matches!(source, Error::UnknownCoordinate(_)));
    }

    #[tokio::test]
    async fn test_import_bad_time_index() {
        let mut document = full_document();
        document["data_array"]["t_index"] = json!(10);
        let (step, source) = import_error(document).await;
        assert_eq!(step, "data_array.t_index");
        assert!(matches!(
            source,
            Error::IndexOutOfRange {
                index: 10,
                length: 10
            }
        ));
    }

    #[tokio::test]
    async fn test_import_notifies_once() -> Result<()> {
        let mut state = new_state();
        let mut all = state.subscribe(None);
        let mut ui = state.subscribe(Some(Category::Ui));

        state.import(&config(full_document())).await?;

        let imported = Change::Imported {
            path: String::from(SST_PATH),
        };
        assert_eq!(all.drain(), vec![imported.clone()]);
        assert_eq!(ui.drain(), vec![imported]);

        Ok(())
    }

    #[tokio::test]
    async fn test_load_and_save() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sst.json");

        let mut state = new_state();
        state.import(&config(full_document())).await?;
        state.export().save(&path)?;

        let loaded = Config::load(path.to_str().unwrap())?;
        assert_eq!(loaded, state.export());

        let mut restored = new_state();
        restored.import(&loaded).await?;
        assert_eq!(format!("{restored:?}"), format!("{state:?}"));

        Ok(())
    }

    #[test]
    fn test_load_text() -> Result<()> {
        let text = r#"{"data_origin": "sst.zarr", "data_array": {"active": "mask"}}"#;
        let loaded = Config::load(text)?;
        assert_eq!(loaded.data_origin.as_deref(), Some("sst.zarr"));
        assert_eq!(loaded.data_array.unwrap().t_index, 0);
        assert_eq!(loaded.ui, UiState::default());

        assert!(matches!(Config::load("{not json"), Err(Error::Json(_))));

        Ok(())
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(parse_step(&json!(3)).unwrap(), 3);
        assert_eq!(parse_step(&json!(2.0)).unwrap(), 2);
        assert_eq!(parse_step(&json!(-1)).unwrap(), -1);
        assert!(parse_step(&json!(0.5)).is_err());
        assert!(parse_step(&json!("2")).is_err());
    }
}
