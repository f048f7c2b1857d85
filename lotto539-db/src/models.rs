use std::fmt;

use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// Highest number that can be drawn (numbers run 1..=39).
pub const POOL_SIZE: u8 = 39;
/// Numbers drawn per game.
pub const PICK_COUNT: usize = 5;

/// The five winning numbers of a draw, always distinct, in range and sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberSet([u8; PICK_COUNT]);

impl NumberSet {
    pub fn new(numbers: &[u8]) -> Result<Self> {
        validate_numbers(numbers)?;
        let mut sorted = [0u8; PICK_COUNT];
        sorted.copy_from_slice(numbers);
        sorted.sort_unstable();
        Ok(Self(sorted))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn contains(&self, number: u8) -> bool {
        self.0.binary_search(&number).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>()
            .join(" - ");
        write!(f, "{joined}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub date: NaiveDate,
    pub numbers: NumberSet,
}

/// Date column of a raw row, as the upstream storage hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum DateCell {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
    Empty,
}

/// One of the number columns of a raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberCell {
    Integer(i64),
    Real(f64),
    Text(String),
    Empty,
}

impl NumberCell {
    /// Integral value of the cell, if it holds one. Reals only count when
    /// they have no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            NumberCell::Integer(v) => Some(*v),
            NumberCell::Real(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            NumberCell::Real(_) => None,
            NumberCell::Text(s) => s.trim().parse::<i64>().ok(),
            NumberCell::Empty => None,
        }
    }
}

/// A row as stored by the raw-row provider: a partition label (the year)
/// plus a date cell and the designated number cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub partition: String,
    pub date: DateCell,
    pub numbers: Vec<NumberCell>,
}

pub fn validate_numbers(numbers: &[u8]) -> Result<()> {
    if numbers.len() != PICK_COUNT {
        bail!("Expected {} numbers, got {}", PICK_COUNT, numbers.len());
    }
    for &n in numbers {
        if n < 1 || n > POOL_SIZE {
            bail!("Number {} out of range (1-{})", n, POOL_SIZE);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Duplicate number: {}", numbers[i]);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_numbers_ok() {
        assert!(validate_numbers(&[1, 2, 3, 4, 5]).is_ok());
        assert!(validate_numbers(&[39, 38, 37, 36, 35]).is_ok());
    }

    #[test]
    fn test_validate_numbers_out_of_range() {
        assert!(validate_numbers(&[0, 2, 3, 4, 5]).is_err());
        assert!(validate_numbers(&[1, 2, 3, 4, 40]).is_err());
    }

    #[test]
    fn test_validate_numbers_wrong_count() {
        assert!(validate_numbers(&[1, 2, 3, 4]).is_err());
        assert!(validate_numbers(&[1, 2, 3, 4, 5, 6]).is_err());
    }

    #[test]
    fn test_validate_numbers_duplicate() {
        assert!(validate_numbers(&[1, 1, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_number_set_is_sorted() {
        let set = NumberSet::new(&[30, 2, 17, 9, 11]).unwrap();
        assert_eq!(set.as_slice(), &[2, 9, 11, 17, 30]);
        assert!(set.contains(17));
        assert!(!set.contains(18));
        assert_eq!(set.to_string(), "02 - 09 - 11 - 17 - 30");
    }

    #[test]
    fn test_number_cell_as_integer() {
        assert_eq!(NumberCell::Integer(7).as_integer(), Some(7));
        assert_eq!(NumberCell::Real(12.0).as_integer(), Some(12));
        assert_eq!(NumberCell::Real(12.5).as_integer(), None);
        assert_eq!(NumberCell::Text(" 21 ".to_string()).as_integer(), Some(21));
        assert_eq!(NumberCell::Text("x".to_string()).as_integer(), None);
        assert_eq!(NumberCell::Empty.as_integer(), None);
    }
}
