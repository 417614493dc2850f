//! Cell position type

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{MAX_COLUMN, MAX_ROW};

/// A cell position (e.g., "A1", "AA256")
///
/// Columns and rows are both 1-based. Column letters form a bijective
/// base-26 numeral (A = 1, Z = 26, AA = 27, ...).
///
/// Positions are ordered row-major: the row is compared first, then the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPosition {
    column: u16,
    row: u16,
}

impl CellPosition {
    /// Create a new cell position from 1-based indices
    ///
    /// # Panics
    ///
    /// Panics if `column` or `row` is zero.
    pub fn new(column: u16, row: u16) -> Self {
        assert!(column >= 1, "column index must be >= 1");
        assert!(row >= 1, "row index must be >= 1");
        Self { column, row }
    }

    /// Create a cell position, returning an error instead of panicking
    pub fn try_new(column: u16, row: u16) -> Result<Self> {
        if column == 0 {
            return Err(Error::ColumnOutOfBounds(0, MAX_COLUMN));
        }
        if row == 0 {
            return Err(Error::RowOutOfBounds(0, MAX_ROW));
        }
        Ok(Self { column, row })
    }

    /// 1-based column index
    pub fn column(&self) -> u16 {
        self.column
    }

    /// 1-based row index
    pub fn row(&self) -> u16 {
        self.row
    }

    /// Parse a cell position from A1-style notation
    ///
    /// The accepted format is `^[A-Z]+[1-9][0-9]*$`: uppercase letters followed
    /// by a row number without leading zeros.
    ///
    /// # Examples
    /// ```
    /// use tabula_core::CellPosition;
    ///
    /// let pos = CellPosition::parse("A1").unwrap();
    /// assert_eq!(pos.column(), 1);
    /// assert_eq!(pos.row(), 1);
    ///
    /// let pos = CellPosition::parse("AA256").unwrap();
    /// assert_eq!(pos.column(), 27);
    /// assert_eq!(pos.row(), 256);
    ///
    /// assert!(CellPosition::parse("A01").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let (_, letters, digits) = lazy_regex::regex_captures!(r"^([A-Z]+)([1-9][0-9]*)$", s)
            .ok_or_else(|| Error::InvalidCellPosition(s.to_string()))?;

        let column = Self::letters_to_column(letters)?;
        let row = Self::digits_to_row(digits)?;

        Ok(Self { column, row })
    }

    /// Convert column letters to a 1-based index (A = 1, Z = 26, AA = 27, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidCellPosition("empty column letters".into()));
        }

        let mut column: u64 = 0;
        for c in letters.chars() {
            if !c.is_ascii_uppercase() {
                return Err(Error::InvalidCellPosition(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            column = column * 26 + (c as u64 - 'A' as u64 + 1);
            if column > MAX_COLUMN as u64 {
                return Err(Error::ColumnOutOfBounds(column, MAX_COLUMN));
            }
        }

        Ok(column as u16)
    }

    /// Convert a 1-based column index to letters (1 = A, 26 = Z, 27 = AA, etc.)
    pub fn column_to_letters(column: u16) -> String {
        let mut result = Vec::new();
        let mut n = column as u32;

        while n > 0 {
            n -= 1;
            result.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        result.reverse();
        String::from_utf8_lossy(&result).into_owned()
    }

    fn digits_to_row(digits: &str) -> Result<u16> {
        let mut row: u64 = 0;
        for c in digits.bytes() {
            row = row * 10 + (c - b'0') as u64;
            if row > MAX_ROW as u64 {
                return Err(Error::RowOutOfBounds(row, MAX_ROW));
            }
        }
        if row == 0 {
            return Err(Error::RowOutOfBounds(0, MAX_ROW));
        }
        Ok(row as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.column), self.row)
    }
}

impl Ord for CellPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for CellPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellPosition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CellPosition {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
