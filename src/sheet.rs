//! Spreadsheets as a grid of typed cells.
//!
//! Spreadsheet cells mix numbers, dates and free text. Rather than relying on
//! implicit stringification, every cell is read into a [`Cell`] at the
//! ingestion boundary and the extraction code decides explicitly how each kind
//! of cell is turned into text.

pub mod reader;
pub mod workbook;

use std::sync::LazyLock;

use regex::Regex;

pub use reader::Delimited;
pub use reader::Error;
pub use reader::Source;
pub use reader::Spreadsheets;
pub use workbook::Workbook;

/// Matches a plain decimal number.
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap());

/// Matches an ISO 8601 date with an optional time.
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?)?$").unwrap()
});

/// The empty cell returned for positions outside of the sheet.
static EMPTY: Cell = Cell::Empty;

////////////////////////////////////////////////////////////////////////////////////////
// Cells
////////////////////////////////////////////////////////////////////////////////////////

/// A single spreadsheet cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// An empty cell.
    Empty,

    /// A number.
    Number(f64),

    /// A date (kept in its textual form).
    Date(String),

    /// Free text.
    Text(String),
}

impl Cell {
    /// Reads a cell from its raw textual value.
    ///
    /// Surrounding whitespace is ignored when deciding the kind of cell, but
    /// text cells keep their value untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::sheet::Cell;
    ///
    /// assert_eq!(Cell::parse("  "), Cell::Empty);
    /// assert_eq!(Cell::parse("4"), Cell::Number(4.0));
    /// assert_eq!(Cell::parse("2023-01-31"), Cell::Date(String::from("2023-01-31")));
    /// assert_eq!(Cell::parse("BRCA1"), Cell::Text(String::from("BRCA1")));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Self::Empty;
        }

        if NUMBER.is_match(trimmed) {
            if let Ok(value) = trimmed.parse::<f64>() {
                return Self::Number(value);
            }
        }

        if DATE.is_match(trimmed) {
            return Self::Date(trimmed.to_string());
        }

        Self::Text(raw.to_string())
    }

    /// Whether the cell is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Gets the text of a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Gets the value of a number cell that holds a whole number.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Number(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(*value as i64)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => write!(f, ""),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Date(date) => write!(f, "{date}"),
            Cell::Text(text) => write!(f, "{text}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Sheets
////////////////////////////////////////////////////////////////////////////////////////

/// A spreadsheet made of a header row and a body of rows.
///
/// Rows may be ragged; positions beyond the end of a row read as
/// [`Cell::Empty`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    /// The header row (column labels).
    header: Vec<Cell>,

    /// The body rows.
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Creates a new sheet.
    pub fn new(header: Vec<Cell>, rows: Vec<Vec<Cell>>) -> Self {
        Self { header, rows }
    }

    /// Creates a sheet from raw textual values where the first row is the
    /// header.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::sheet::Cell;
    /// use varconfirm::sheet::Sheet;
    ///
    /// let sheet = Sheet::from_raw([vec!["Label", "NGS1_01_2_AB"], vec!["Final Result", "3"]]);
    ///
    /// assert_eq!(sheet.width(), 2);
    /// assert_eq!(sheet.height(), 1);
    /// assert_eq!(sheet.cell(0, 1), &Cell::Number(3.0));
    /// assert_eq!(sheet.cell(5, 5), &Cell::Empty);
    /// ```
    pub fn from_raw<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|raw| Cell::parse(raw.as_ref())).collect());

        let header = rows.next().unwrap_or_default();

        Self {
            header,
            rows: rows.collect(),
        }
    }

    /// Gets the header row.
    pub fn header(&self) -> &[Cell] {
        &self.header
    }

    /// Gets the body rows.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Gets the number of body rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Gets the number of columns (the widest of the header and all rows).
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or_default()
    }

    /// Gets the body cell at `row` and `column`.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY)
    }

    /// Gets the header cell for `column`.
    pub fn label(&self, column: usize) -> &Cell {
        self.header.get(column).unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(""), Cell::Empty);
        assert_eq!(Cell::parse("-3.5"), Cell::Number(-3.5));
        assert_eq!(Cell::parse("1e3"), Cell::Number(1000.0));
        assert_eq!(
            Cell::parse("2021-06-01 10:20:00"),
            Cell::Date(String::from("2021-06-01 10:20:00"))
        );
        assert_eq!(Cell::parse("inf"), Cell::Text(String::from("inf")));
        assert_eq!(Cell::parse("NaN"), Cell::Text(String::from("NaN")));
        assert_eq!(
            Cell::parse(" c.1A>G "),
            Cell::Text(String::from(" c.1A>G "))
        );
    }

    #[test]
    fn test_cell_as_integer() {
        assert_eq!(Cell::Number(4.0).as_integer(), Some(4));
        assert_eq!(Cell::Number(4.5).as_integer(), None);
        assert_eq!(Cell::Text(String::from("4")).as_integer(), None);
    }

    #[test]
    fn test_ragged_rows() {
        let sheet = Sheet::from_raw([vec!["a"], vec!["b", "c", "d"], vec![]]);

        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.label(2), &Cell::Empty);
        assert_eq!(sheet.cell(0, 2), &Cell::Text(String::from("d")));
        assert_eq!(sheet.cell(1, 0), &Cell::Empty);
    }
}
