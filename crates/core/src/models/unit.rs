//! Unit cells inside a building's floor plan
//!
//! Every building has the same layout: 11 floors, two physical units,
//! each with a west- and an east-facing flat. Cells are generated
//! deterministically from (floor, position); availability always derives
//! from assignment records, never from the cell itself.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of floors per building
pub const FLOORS: u32 = 11;

/// Named positions on one floor, in grid order (left to right)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitPosition {
    Unit2West,
    Unit2East,
    Unit1West,
    Unit1East,
}

impl UnitPosition {
    pub const ALL: [UnitPosition; 4] = [
        UnitPosition::Unit2West,
        UnitPosition::Unit2East,
        UnitPosition::Unit1West,
        UnitPosition::Unit1East,
    ];

    /// Column index used in room codes (01..04)
    pub fn code_index(self) -> u32 {
        match self {
            UnitPosition::Unit2West => 1,
            UnitPosition::Unit2East => 2,
            UnitPosition::Unit1West => 3,
            UnitPosition::Unit1East => 4,
        }
    }

    fn from_code_index(index: u32) -> Option<Self> {
        match index {
            1 => Some(UnitPosition::Unit2West),
            2 => Some(UnitPosition::Unit2East),
            3 => Some(UnitPosition::Unit1West),
            4 => Some(UnitPosition::Unit1East),
            _ => None,
        }
    }

    /// Physical unit number (entrance) this position belongs to
    pub fn unit_number(self) -> u32 {
        match self {
            UnitPosition::Unit2West | UnitPosition::Unit2East => 2,
            UnitPosition::Unit1West | UnitPosition::Unit1East => 1,
        }
    }

    /// Floor area in square meters. West-facing flats are the 87 m²
    /// type, east-facing the 100 m² type.
    pub fn size_sqm(self) -> u32 {
        match self {
            UnitPosition::Unit2West | UnitPosition::Unit1West => 87,
            UnitPosition::Unit2East | UnitPosition::Unit1East => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    Available,
    Sold,
}

/// One allocatable slot in a building's floor plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCell {
    pub code: String,
    pub floor: u32,
    pub position: UnitPosition,
    pub size_sqm: u32,
    pub status: UnitStatus,
}

impl UnitCell {
    /// Build the cell at (floor, position), initially available
    pub fn new(floor: u32, position: UnitPosition) -> Self {
        Self {
            code: room_code(floor, position),
            floor,
            position,
            size_sqm: position.size_sqm(),
            status: UnitStatus::Available,
        }
    }

    /// Resolve a room code like "0104" back to its cell.
    ///
    /// Fails if the floor or position is outside the fixed layout.
    pub fn from_room_code(code: &str) -> Result<Self> {
        if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation(format!("malformed room code: {code}")));
        }
        let floor: u32 = code[..2].parse().unwrap_or(0);
        let index: u32 = code[2..].parse().unwrap_or(0);
        if floor == 0 || floor > FLOORS {
            return Err(Error::NotFound(format!("no floor {floor} in room {code}")));
        }
        let position = UnitPosition::from_code_index(index)
            .ok_or_else(|| Error::NotFound(format!("no unit position {index} in room {code}")))?;
        Ok(Self::new(floor, position))
    }
}

/// Room code for a cell: two-digit floor followed by two-digit column,
/// e.g. floor 1, unit 2 east -> "0102".
pub fn room_code(floor: u32, position: UnitPosition) -> String {
    format!("{:02}{:02}", floor, position.code_index())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_format() {
        assert_eq!(room_code(1, UnitPosition::Unit2East), "0102");
        assert_eq!(room_code(1, UnitPosition::Unit1East), "0104");
        assert_eq!(room_code(11, UnitPosition::Unit2West), "1101");
    }

    #[test]
    fn test_room_code_roundtrip() {
        let cell = UnitCell::from_room_code("0102").unwrap();
        assert_eq!(cell.floor, 1);
        assert_eq!(cell.position, UnitPosition::Unit2East);
        assert_eq!(cell.size_sqm, 100);
    }

    #[test]
    fn test_invalid_room_codes() {
        assert!(UnitCell::from_room_code("1201").is_err()); // floor 12
        assert!(UnitCell::from_room_code("0105").is_err()); // position 5
        assert!(UnitCell::from_room_code("0001").is_err()); // floor 0
        assert!(UnitCell::from_room_code("01x4").is_err());
        assert!(UnitCell::from_room_code("104").is_err());
    }

    #[test]
    fn test_sizes_by_orientation() {
        assert_eq!(UnitPosition::Unit2West.size_sqm(), 87);
        assert_eq!(UnitPosition::Unit1West.size_sqm(), 87);
        assert_eq!(UnitPosition::Unit2East.size_sqm(), 100);
        assert_eq!(UnitPosition::Unit1East.size_sqm(), 100);
    }
}
