//! Points of interest placed in the facility model.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Stable identifier of a point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(pub u32);

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An amenity marker in the scene.
///
/// Points of interest are supplied from outside and never change while the
/// viewer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: PoiId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// World-space anchor of the marker and the camera's look-at target.
    pub position: Vec3,
    /// Camera position relative to `position` when focused.
    #[serde(default)]
    pub camera_offset: Option<Vec3>,
    /// Reference to an illustration shown in the info panel.
    #[serde(default)]
    pub image: Option<String>,
}

impl PointOfInterest {
    /// First character of the name, used as the marker glyph.
    #[must_use]
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next()
    }
}

/// Parse a JSON array of points of interest.
///
/// Ids must be unique; a duplicate is reported as an error.
pub fn pois_from_json(json: &str) -> Result<Vec<PointOfInterest>, serde_json::Error> {
    let pois: Vec<PointOfInterest> = serde_json::from_str(json)?;
    let mut seen = std::collections::HashSet::new();
    for poi in &pois {
        if !seen.insert(poi.id) {
            return Err(serde::de::Error::custom(format!(
                "duplicate point of interest id {}",
                poi.id
            )));
        }
    }
    Ok(pois)
}

/// Amenities of the reference station model.
#[must_use]
pub fn station_amenities() -> Vec<PointOfInterest> {
    let amenity = |id, name: &str, position, description: &str, tags: &[&str]| PointOfInterest {
        id: PoiId(id),
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        position,
        camera_offset: None,
        image: None,
    };

    vec![
        amenity(
            1,
            "Main Entrance",
            Vec3::new(2.0, 1.0, 0.0),
            "Main entrance of the station",
            &["entrance", "exit", "doors"],
        ),
        amenity(
            2,
            "Ticket Counter",
            Vec3::new(-2.0, 1.0, 0.0),
            "Ticket booking and information",
            &["ticket", "tickets", "booking", "information"],
        ),
        amenity(
            3,
            "Platform 1",
            Vec3::new(0.0, 0.0, 2.0),
            "Platform for local trains",
            &["platform", "trains", "local"],
        ),
    ]
}
