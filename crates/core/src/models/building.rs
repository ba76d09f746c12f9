//! Building model and map-coordinate records

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed unit capacity per building: 11 floors x 2 units x 2 orientations.
pub const UNITS_PER_BUILDING: u32 = 44;

/// Residential district of the resettlement site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum District {
    West,
    East,
}

impl District {
    /// Canonical display name, as stored and shown ("西区" / "东区")
    pub fn as_str(self) -> &'static str {
        match self {
            District::West => "西区",
            District::East => "东区",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "西区" | "west" | "West" | "w" => Ok(District::West),
            "东区" | "east" | "East" | "e" => Ok(District::East),
            other => Err(Error::Validation(format!("unknown district: {other}"))),
        }
    }
}

impl std::fmt::Display for District {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique building identifier: district + building number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingId {
    pub district: District,
    pub number: u32,
}

impl BuildingId {
    pub fn new(district: District, number: u32) -> Self {
        Self { district, number }
    }

    /// Canonical key, e.g. "西区_3"
    pub fn key(&self) -> String {
        format!("{}_{}", self.district.as_str(), self.number)
    }

    /// Parse a building key.
    ///
    /// Accepts the canonical "西区_3" / "东区_5" form plus the legacy
    /// annotation-era "w-3" / "e-5" form still present in older
    /// coordinate records.
    pub fn parse(key: &str) -> Result<Self> {
        let (district, rest) = if let Some(rest) = key.strip_prefix("西区_") {
            (District::West, rest)
        } else if let Some(rest) = key.strip_prefix("东区_") {
            (District::East, rest)
        } else if let Some(rest) = key.strip_prefix("w-") {
            (District::West, rest)
        } else if let Some(rest) = key.strip_prefix("e-") {
            (District::East, rest)
        } else {
            return Err(Error::Validation(format!("unknown building key: {key}")));
        };

        let number: u32 = rest
            .parse()
            .map_err(|_| Error::Validation(format!("bad building number in key: {key}")))?;
        Ok(Self { district, number })
    }
}

impl std::fmt::Display for BuildingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A building's position on the aerial map (presentation config).
///
/// Stored as uploaded by the annotation tool: `top`/`left` are percentage
/// strings like "42.5%". Order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingCoord {
    pub id: String,
    pub label: String,
    pub zone: District,
    pub top: String,
    pub left: String,
}

impl BuildingCoord {
    /// Building identity encoded by this coordinate record
    pub fn building_id(&self) -> Result<BuildingId> {
        BuildingId::parse(&self.id).or_else(|_| {
            let number: u32 = self
                .label
                .parse()
                .map_err(|_| Error::Validation(format!("bad coord label: {}", self.label)))?;
            Ok(BuildingId::new(self.zone, number))
        })
    }
}

/// Derived per-building occupancy; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingStats {
    pub selected: u32,
    pub remaining: u32,
}

impl BuildingStats {
    pub fn from_selected(selected: u32) -> Self {
        Self {
            selected,
            remaining: UNITS_PER_BUILDING.saturating_sub(selected),
        }
    }

    /// Fraction of the building already sold, in 0.0..=1.0
    pub fn sold_ratio(&self) -> f64 {
        let total = self.selected + self.remaining;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.selected) / f64::from(total)
    }
}
