//! Reading spreadsheets from Excel and OpenDocument workbooks.

use std::path::Path;

use calamine::Data;
use calamine::DataType as _;
use calamine::Range;
use calamine::Reader as _;

use crate::sheet::Cell;
use crate::sheet::Sheet;
use crate::sheet::reader::Error;
use crate::sheet::reader::Source;
use crate::sheet::reader::open;

/// The extensions of supported workbooks.
pub const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// The time written by date cells holding no time of day.
const MIDNIGHT: &str = " 00:00:00";

/// A source of workbooks. Only the first worksheet is read.
#[derive(Clone, Copy, Debug, Default)]
pub struct Workbook;

impl Workbook {
    /// Whether `path` names a workbook.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use varconfirm::sheet::Workbook;
    ///
    /// assert!(Workbook::supports(Path::new("Sanger batch 12.XLSX")));
    /// assert!(!Workbook::supports(Path::new("batch.csv")));
    /// ```
    pub fn supports(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

impl Source for Workbook {
    fn read(&self, path: &Path) -> std::result::Result<Sheet, Error> {
        if !Self::supports(path) {
            return Err(Error::UnsupportedFormat(path.to_path_buf()));
        }

        // Surfaces missing and unreadable files before the workbook is parsed.
        drop(open(path)?);

        let mut workbook = calamine::open_workbook_auto(path).map_err(Error::Workbook)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::EmptyWorkbook(path.to_path_buf()))?
            .map_err(Error::Workbook)?;

        Ok(Sheet::from_range(&range))
    }
}

impl Sheet {
    /// Reads a sheet from a worksheet range where the first row is the header.
    ///
    /// Leading blank rows are skipped, while leading blank columns are kept so
    /// that column positions match the worksheet.
    pub fn from_range(range: &Range<Data>) -> Self {
        let left = range.start().map(|(_, left)| left).unwrap_or(0);

        let mut rows = range.rows().map(|row| {
            std::iter::repeat(Cell::Empty)
                .take(left as usize)
                .chain(row.iter().map(cell))
                .collect::<Vec<_>>()
        });

        let header = rows.next().unwrap_or_default();

        Self::new(header, rows.collect())
    }
}

/// Converts a worksheet value.
///
/// Error values (`#N/A`, `#REF!`) read as empty cells.
fn cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::Bool(value) => Cell::Text(value.to_string().to_ascii_uppercase()),
        Data::String(text) if text.trim().is_empty() => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::DateTimeIso(text) => Cell::Date(text.clone()),
        Data::DurationIso(text) => Cell::Text(text.clone()),
        Data::DateTime(_) => match data.as_datetime() {
            Some(datetime) => {
                let text = datetime.to_string();
                let text = text.strip_suffix(MIDNIGHT).unwrap_or(&text).to_string();
                Cell::Date(text)
            }
            None => Cell::Empty,
        },
    }
}
