use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four equal partitions of the chip, split along the midline in
/// both dimensions. Serialized as its number, 0 for an unmappable position.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[serde(into = "u8", try_from = "u8")]
pub enum Quadrant {
    Unmapped = 0,
    /// row <= half, column <= half
    First = 1,
    /// row <= half, column > half
    Second = 2,
    /// row > half, column <= half
    Third = 3,
    /// row > half, column > half
    Fourth = 4,
}

impl Quadrant {
    pub const MAPPED: [Quadrant; 4] = [
        Quadrant::First,
        Quadrant::Second,
        Quadrant::Third,
        Quadrant::Fourth,
    ];

    /// Map a 1-based chip address to its quadrant on a chip whose side is
    /// `2 * half_width`. Positions outside the chip are `Unmapped`.
    pub fn from_position(row: u32, column: u32, half_width: u32) -> Quadrant {
        #[derive(PartialEq)]
        enum Half {
            Low,
            High,
        }
        let half = |x: u32| match x {
            0 => None,
            x if x <= half_width => Some(Half::Low),
            x if x <= half_width.saturating_mul(2) => Some(Half::High),
            _ => None,
        };
        match (half(row), half(column)) {
            (Some(Half::Low), Some(Half::Low)) => Quadrant::First,
            (Some(Half::Low), Some(Half::High)) => Quadrant::Second,
            (Some(Half::High), Some(Half::Low)) => Quadrant::Third,
            (Some(Half::High), Some(Half::High)) => Quadrant::Fourth,
            _ => Quadrant::Unmapped,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn is_mapped(self) -> bool {
        self != Quadrant::Unmapped
    }
}

impl From<Quadrant> for u8 {
    fn from(q: Quadrant) -> u8 {
        q.number()
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(Quadrant::Unmapped),
            1 => Ok(Quadrant::First),
            2 => Ok(Quadrant::Second),
            3 => Ok(Quadrant::Third),
            4 => Ok(Quadrant::Fourth),
            _ => Err(format!("invalid chip quadrant {n}, expected 0-4")),
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_dlp_chip_quadrants() {
        assert_eq!(Quadrant::from_position(5, 10, 36), Quadrant::First);
        assert_eq!(Quadrant::from_position(36, 36, 36), Quadrant::First);
        assert_eq!(Quadrant::from_position(36, 37, 36), Quadrant::Second);
        assert_eq!(Quadrant::from_position(37, 36, 36), Quadrant::Third);
        assert_eq!(Quadrant::from_position(72, 72, 36), Quadrant::Fourth);
        assert_eq!(Quadrant::from_position(73, 5, 36), Quadrant::Unmapped);
        assert_eq!(Quadrant::from_position(0, 5, 36), Quadrant::Unmapped);
        assert_eq!(Quadrant::from_position(5, 0, 36), Quadrant::Unmapped);
    }

    #[test]
    fn test_quadrant_numbers() {
        assert_eq!(u8::from(Quadrant::Second), 2);
        assert_eq!(Quadrant::try_from(4), Ok(Quadrant::Fourth));
        assert!(Quadrant::try_from(5).is_err());
        assert_eq!(Quadrant::Third.to_string(), "3");
    }

    proptest! {
        #[test]
        fn prop_quadrant_is_total_and_deterministic(
            row in 0u32..200,
            column in 0u32..200,
            half in 1u32..80,
        ) {
            let q = Quadrant::from_position(row, column, half);
            prop_assert_eq!(q, Quadrant::from_position(row, column, half));
            prop_assert!(q.number() <= 4);
            let inside = (1..=2 * half).contains(&row) && (1..=2 * half).contains(&column);
            prop_assert_eq!(q.is_mapped(), inside);
        }
    }
}
