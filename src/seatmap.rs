use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid seat id {0:?}: expected a row letter followed by a seat number")]
pub struct InvalidSeatId(pub String);

/// One seat on a show's grid, e.g. `A1` or `J9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    row: char,
    number: u8,
}

impl SeatId {
    pub fn new(row: char, number: u8) -> Result<Self, InvalidSeatId> {
        if !row.is_ascii_uppercase() || number == 0 {
            return Err(InvalidSeatId(format!("{row}{number}")));
        }
        Ok(SeatId { row, number })
    }

    pub fn row(&self) -> char {
        self.row
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

impl FromStr for SeatId {
    type Err = InvalidSeatId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = chars.next().ok_or_else(|| InvalidSeatId(s.to_string()))?;
        let number: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| InvalidSeatId(s.to_string()))?;
        SeatId::new(row, number).map_err(|_| InvalidSeatId(s.to_string()))
    }
}

impl TryFrom<String> for SeatId {
    type Error = InvalidSeatId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.to_string()
    }
}

/// The fixed grid of a show. Rows are lettered from `A`; seats in a row are
/// numbered from 1. Row geometry (centered vs. split) is a rendering concern
/// and is not modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    pub rows: u8,
    pub seats_per_row: u8,
}

impl SeatMap {
    pub fn new(rows: u8, seats_per_row: u8) -> Self {
        SeatMap { rows, seats_per_row }
    }

    pub fn contains(&self, seat: &SeatId) -> bool {
        let row_index = (seat.row as u8).wrapping_sub(b'A');
        row_index < self.rows && seat.number >= 1 && seat.number <= self.seats_per_row
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.seats_per_row as usize
    }

    /// Every seat on the grid, row by row.
    pub fn all_seats(&self) -> impl Iterator<Item = SeatId> + '_ {
        (0..self.rows).flat_map(move |r| {
            (1..=self.seats_per_row).map(move |n| SeatId {
                row: (b'A' + r) as char,
                number: n,
            })
        })
    }
}

impl Default for SeatMap {
    // The observed auditorium: rows A-J, 9 seats each.
    fn default() -> Self {
        SeatMap::new(10, 9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_seat_ids() {
        let seat: SeatId = "A1".parse().unwrap();
        assert_eq!(seat.row(), 'A');
        assert_eq!(seat.number(), 1);
        assert_eq!(seat.to_string(), "A1");

        let seat: SeatId = "J9".parse().unwrap();
        assert_eq!(seat.to_string(), "J9");
    }

    #[test]
    fn rejects_malformed_seat_ids() {
        for bad in ["", "A", "7", "1A", "a1", "A0", "AA1", "A-1"] {
            assert!(bad.parse::<SeatId>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn default_map_bounds() {
        let map = SeatMap::default();
        assert_eq!(map.capacity(), 90);
        assert!(map.contains(&"A1".parse().unwrap()));
        assert!(map.contains(&"J9".parse().unwrap()));
        assert!(!map.contains(&"K1".parse().unwrap()));
        assert!(!map.contains(&"A10".parse().unwrap()));
    }

    #[test]
    fn all_seats_enumerates_whole_grid() {
        let map = SeatMap::new(2, 3);
        let seats: Vec<String> = map.all_seats().map(|s| s.to_string()).collect();
        assert_eq!(seats, ["A1", "A2", "A3", "B1", "B2", "B3"]);
    }

    #[test]
    fn seat_ids_order_by_row_then_number() {
        let mut seats: Vec<SeatId> = ["B1", "A2", "A1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        seats.sort();
        let ordered: Vec<String> = seats.iter().map(ToString::to_string).collect();
        assert_eq!(ordered, ["A1", "A2", "B1"]);
    }
}
