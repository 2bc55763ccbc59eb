use std::{fmt, str::FromStr};

/// One of the logical roles a coordinate can play for visualization
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
    T,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::T];

    pub fn key(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::T => "t",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Coordinate names that suggest this axis. One letter names must match exactly, longer
    /// names only need to appear somewhere in the coordinate name.
    ///
    fn accepted_names(&self) -> &'static [&'static str] {
        match self {
            Axis::X => &["x", "i", "lon", "len"],
            Axis::Y => &["y", "j", "lat", "width"],
            Axis::Z => &["z", "k", "depth", "height"],
            Axis::T => &["t", "time"],
        }
    }

    fn accepts(&self, coordinate: &str) -> bool {
        let name = coordinate.to_lowercase();
        self.accepted_names().iter().any(|accepted| {
            if accepted.len() == 1 {
                name == *accepted
            } else {
                name.contains(accepted)
            }
        })
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            "t" => Ok(Axis::T),
            _ => Err(format!("unknown axis {s:?}")),
        }
    }
}

/// Which coordinate, if any, is assigned to each axis.
///
/// At most one axis maps to any given coordinate. The mapping itself doesn't know about the
/// dataset; `SelectionState` validates assignments before making them.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AxisMapping {
    coordinates: [Option<String>; 4],
}

impl AxisMapping {
    pub fn get(&self, axis: Axis) -> Option<&str> {
        self.coordinates[axis.index()].as_deref()
    }

    /// The axis `coordinate` is assigned to
    pub fn axis_of(&self, coordinate: &str) -> Option<Axis> {
        self.iter()
            .find(|(_, name)| *name == coordinate)
            .map(|(axis, _)| axis)
    }

    /// Assigned axes and their coordinates, in x, y, z, t order
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &str)> {
        Axis::ALL
            .into_iter()
            .filter_map(move |axis| self.get(axis).map(|name| (axis, name)))
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.iter().all(Option::is_none)
    }

    pub(crate) fn set(&mut self, axis: Axis, coordinate: Option<String>) {
        self.coordinates[axis.index()] = coordinate;
    }
}

/// Guess axis assignments from dimension names.
///
/// Dimensions are visited in order and each takes the first still unassigned axis whose accepted
/// names it matches. Each axis and each dimension is used at most once.
///
pub fn auto_select(dimensions: &[String]) -> Vec<(Axis, String)> {
    let mut selected: Vec<(Axis, String)> = vec![];
    for name in dimensions {
        let axis = Axis::ALL.into_iter().find(|axis| {
            axis.accepts(name) && !selected.iter().any(|(taken, _)| taken == axis)
        });
        if let Some(axis) = axis {
            selected.push((axis, name.clone()));
        }
    }

    selected
}
