//! Domain data structures for bins, vans, assignments, and routes.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier of a monitored bin.
pub struct BinId(pub String);

impl fmt::Display for BinId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier of a collection van.
pub struct VanId(pub String);

impl fmt::Display for VanId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Geographic position in decimal degrees.
pub struct Coordinates {
    /// Latitude, north positive.
    pub latitude: f64,
    /// Longitude, east positive.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a position from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Straight-line distance in degree space.
    ///
    /// Treats latitude and longitude as plane coordinates, which is good enough to
    /// compare candidates inside one city.
    #[must_use]
    pub fn planar_distance(self, other: Self) -> f64 {
        (self.latitude - other.latitude).hypot(self.longitude - other.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Sensor readings reported by a bin.
pub struct Telemetry {
    /// Fill level in percent, 0 to 100.
    pub fill_level: f64,
    /// Tilt flag (0 or 1) or a continuous proxy between them.
    pub tilt: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A monitored waste bin with validated telemetry.
pub struct Bin {
    /// Unique identifier.
    pub id: BinId,
    /// Where the bin stands.
    pub location: Coordinates,
    /// Latest sensor readings.
    pub telemetry: Telemetry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A collection van and its current position.
pub struct Van {
    /// Unique identifier.
    pub id: VanId,
    /// Current position.
    pub location: Coordinates,
    /// Maximum number of bins per cycle. `None` means unlimited.
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A bin together with the priority computed for this cycle.
pub struct ScoredBin {
    /// The bin itself.
    pub bin: Bin,
    /// Urgency score, higher is more urgent.
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Van selected for a bin, or the explicit unassigned sentinel.
pub enum VanAssignment {
    /// The bin is served by this van.
    Assigned(VanId),
    /// No van could take the bin.
    Unassigned,
}

impl VanAssignment {
    /// The assigned van, if any.
    #[must_use]
    pub fn van(&self) -> Option<&VanId> {
        match self {
            Self::Assigned(van) => Some(van),
            Self::Unassigned => None,
        }
    }

    /// Whether this is the unassigned sentinel.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Self::Unassigned)
    }
}

impl fmt::Display for VanAssignment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned(van) => write!(formatter, "{van}"),
            Self::Unassigned => formatter.write_str("unassigned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One row of an assignment.
pub struct AssignmentEntry {
    /// The bin being served.
    pub bin: BinId,
    /// Who serves it.
    pub van: VanAssignment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Bin to van mapping for a single collection cycle.
///
/// Entries keep the order of the bins handed to the strategy.
pub struct Assignment {
    entries: Vec<AssignmentEntry>,
    #[serde(skip)]
    index: HashMap<BinId, usize>,
}

impl Assignment {
    /// Wrap a list of entries.
    #[must_use]
    pub fn new(entries: Vec<AssignmentEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            index.entry(entry.bin.clone()).or_insert(position);
        }
        Self { entries, index }
    }

    /// All entries in bin order.
    #[must_use]
    pub fn entries(&self) -> &[AssignmentEntry] {
        &self.entries
    }

    /// Number of bins covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the assignment covers no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the van serving a bin.
    #[must_use]
    pub fn van_for(&self, bin: &BinId) -> Option<&VanAssignment> {
        self.index
            .get(bin)
            .and_then(|&position| self.entries.get(position))
            .map(|entry| &entry.van)
    }

    /// Bins served by `van`, in assignment order.
    pub fn bins_for<'a>(&'a self, van: &'a VanId) -> impl Iterator<Item = &'a BinId> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.van.van() == Some(van))
            .map(|entry| &entry.bin)
    }

    /// Bins nobody serves.
    pub fn unassigned(&self) -> impl Iterator<Item = &BinId> {
        self.entries
            .iter()
            .filter(|entry| entry.van.is_unassigned())
            .map(|entry| &entry.bin)
    }

    /// Group bin ids by van, keeping assignment order within each group.
    #[must_use]
    pub fn by_van(&self) -> HashMap<&VanId, Vec<&BinId>> {
        let mut groups: HashMap<&VanId, Vec<&BinId>> = HashMap::new();
        for entry in &self.entries {
            if let Some(van) = entry.van.van() {
                groups.entry(van).or_default().push(&entry.bin);
            }
        }
        groups
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Colors used to tell van routes apart on the map.
pub enum RouteColor {
    /// Blue.
    Blue,
    /// Red.
    Red,
    /// Green.
    Green,
    /// Purple.
    Purple,
    /// Orange.
    Orange,
    /// Dark blue.
    DarkBlue,
    /// Dark red.
    DarkRed,
    /// Dark green.
    DarkGreen,
}

impl RouteColor {
    /// Palette cycled through by van index.
    pub const PALETTE: [Self; 8] = [
        Self::Blue,
        Self::Red,
        Self::Green,
        Self::Purple,
        Self::Orange,
        Self::DarkBlue,
        Self::DarkRed,
        Self::DarkGreen,
    ];

    /// Color for the van at `index`, wrapping around the palette.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE
            .get(index % Self::PALETTE.len())
            .copied()
            .unwrap_or(Self::Blue)
    }
}

impl fmt::Display for RouteColor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Green => "green",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::DarkBlue => "darkblue",
            Self::DarkRed => "darkred",
            Self::DarkGreen => "darkgreen",
        };
        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Travel mode requested from the directions provider.
pub enum TravelMode {
    /// Road vehicle.
    #[default]
    Driving,
    /// On foot.
    Walking,
    /// Bicycle.
    Bicycling,
}

impl TravelMode {
    /// Lowercase name used in provider queries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A routed collection run for one van.
pub struct Route {
    /// Bins in visiting order.
    pub stops: Vec<BinId>,
    /// Start locations of every provider step, for drawing.
    pub polyline: Vec<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// What route building produced for a van.
pub enum RouteOutcome {
    /// The provider returned a path.
    Routed(Route),
    /// The van has no bins this cycle.
    Idle,
    /// The provider failed for this van; the reason is kept for display.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Route result for one van, tagged with its map color.
pub struct VanRoute {
    /// Van the route belongs to.
    pub van: VanId,
    /// Where the van starts.
    pub origin: Coordinates,
    /// Map color.
    pub color: RouteColor,
    /// Route or failure.
    pub outcome: RouteOutcome,
}
