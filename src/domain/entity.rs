use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntityId = i64;

/// Geographic location of a site (decimal degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn key(&self) -> LocationKey {
        LocationKey(OrderedFloat(self.latitude), OrderedFloat(self.longitude))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Hashable, totally ordered form of a [`Location`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey(pub OrderedFloat<f64>, pub OrderedFloat<f64>);

impl LocationKey {
    pub fn location(&self) -> Location {
        Location::new(self.0.into_inner(), self.1.into_inner())
    }
}

impl From<Location> for LocationKey {
    fn from(location: Location) -> Self {
        location.key()
    }
}

/// A customer site whose consumption and production are simulated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub location: Location,
}
