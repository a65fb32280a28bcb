//! Extracting requested and confirmed variant calls from confirmation
//! spreadsheets.
//!
//! Confirmation spreadsheets are laid out by hand, so there is no fixed place
//! to look for the calls. Two layouts are understood:
//!
//! * **Multi-sample sheets.** Sample columns are recognised by their header,
//!   and the column immediately to the left of the leftmost sample column is
//!   the index column holding row labels. The requested and confirmed rows are
//!   then found by label, independently for each [`Category`]: a single
//!   matching row is read as it is, while several contiguous matching rows are
//!   read as a block where the HGVS.c-bearing cells are joined with `;`.
//! * **Single-sample sheets.** When no multi-sample layout is found, the sample
//!   is taken from a header cell or the file name, and the confirmed call is
//!   read from the rows below a "Final Result" (or "Reported Result") cell.
//!
//! ```
//! use varconfirm::extract::Extractor;
//! use varconfirm::sheet::Sheet;
//!
//! let sheet = Sheet::from_raw([
//!     vec!["", "Label", "NGS1_01_111_AB_Pan4_S1", "NGS1_02_222_CD_Pan4_S2"],
//!     vec!["", "SNV variant confirmation", "BRCA1 c.1A>G het", "BRCA2 c.2A>G het"],
//!     vec!["", "Final Result", "BRCA1 c.1A>G het", "No variant detected"],
//! ]);
//!
//! let extraction = Extractor::default().extract(&sheet, "batch.csv").unwrap();
//! let calls = extraction.get("NGS1_01_111_AB_Pan4_S1").unwrap();
//!
//! assert_eq!(calls.requested(), "BRCA1 c.1A>G het");
//! assert_eq!(calls.confirmed(), "BRCA1 c.1A>G het");
//! assert_eq!(extraction.len(), 2);
//! ```

use nonempty::NonEmpty;
use tracing::debug;

use crate::sample::ColumnGrammar;
use crate::sample::Matcher;
use crate::sheet::Cell;
use crate::sheet::Sheet;
use crate::variant::looks_like_hgvs_c;

/// Labels of rows holding requested calls.
pub const REQUESTED_LABELS: &[&str] = &["SNV variant confirmation", "Variant checks"];

/// Labels of rows holding confirmed calls.
pub const CONFIRMED_LABELS: &[&str] = &[
    "Final Result",
    "Final result",
    "Variant 1",
    "Variant 2",
    "Variant 3",
];

/// Labels of the cell above the confirmed call in single-sample sheets.
pub const REPORTED_LABELS: &[&str] = &[
    "Final Result",
    "Final result",
    "Reported Result",
    "Reported result",
];

/// The number of rows scanned below a reported label.
pub const REPORTED_ROWS: usize = 10;

/// The number of adjacent cells joined within a scanned row.
pub const REPORTED_CELLS: usize = 3;

/// The delimiter between joined calls.
pub const CALL_DELIMITER: &str = ";";

////////////////////////////////////////////////////////////////////////////////////////
// Layouts
////////////////////////////////////////////////////////////////////////////////////////

/// A category of labelled rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Category {
    /// Rows holding the requested calls.
    Requested,

    /// Rows holding the confirmed calls.
    Confirmed,
}

/// How the values of a [`Category`] are read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rows {
    /// A single row holds the values.
    Unique(usize),

    /// A contiguous range of rows holds the values.
    Block(NonEmpty<usize>),

    /// No usable rows were found.
    Unresolved,
}

impl Rows {
    /// Decides how to read a category from the (ascending) rows matching its
    /// labels.
    fn from_matches(matches: Vec<usize>) -> Self {
        let Some(rows) = NonEmpty::from_vec(matches) else {
            return Rows::Unresolved;
        };

        if rows.len() == 1 {
            return Rows::Unique(rows.head);
        }

        let contiguous = rows
            .iter()
            .zip(rows.iter().skip(1))
            .all(|(a, b)| a + 1 == *b);

        if contiguous {
            Rows::Block(rows)
        } else {
            Rows::Unresolved
        }
    }

    /// Whether the rows were resolved.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Rows::Unresolved)
    }
}

/// The layout of a multi-sample sheet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    /// The sample columns (ascending).
    columns: NonEmpty<usize>,

    /// The index column.
    index: usize,

    /// The requested rows.
    requested: Rows,

    /// The confirmed rows.
    confirmed: Rows,
}

impl Layout {
    /// Gets the sample columns.
    pub fn columns(&self) -> &NonEmpty<usize> {
        &self.columns
    }

    /// Gets the index column.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets the rows for a category.
    pub fn rows(&self, category: Category) -> &Rows {
        match category {
            Category::Requested => &self.requested,
            Category::Confirmed => &self.confirmed,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Extractions
////////////////////////////////////////////////////////////////////////////////////////

/// The requested and confirmed calls for a single sample.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Calls {
    /// The requested call.
    requested: String,

    /// The confirmed call.
    confirmed: String,
}

impl Calls {
    /// Creates a new pair of calls.
    pub fn new(requested: impl Into<String>, confirmed: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
            confirmed: confirmed.into(),
        }
    }

    /// Gets the requested call.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Gets the confirmed call.
    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }
}

/// The calls found in a sheet, keyed by sample in sheet order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extraction(NonEmpty<(String, Calls)>);

impl Extraction {
    /// Gets the number of samples.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: an extraction holds at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Gets the calls for a sample.
    pub fn get(&self, sample: &str) -> Option<&Calls> {
        self.0
            .iter()
            .find(|(name, _)| name == sample)
            .map(|(_, calls)| calls)
    }

    /// Iterates over the samples and their calls.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Calls)> {
        self.0.iter().map(|(sample, calls)| (sample.as_str(), calls))
    }

    /// Consumes `self` and returns the samples and their calls.
    pub fn into_samples(self) -> Vec<(String, Calls)> {
        Vec::from(self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Extractor
////////////////////////////////////////////////////////////////////////////////////////

/// Extracts calls from sheets.
#[derive(Clone, Debug)]
pub struct Extractor {
    /// The grammar for sample column headers.
    columns: ColumnGrammar,

    /// The strict sample grammars used by the single-sample fallback.
    matcher: Matcher,

    /// Labels of requested rows.
    requested: Vec<String>,

    /// Labels of confirmed rows.
    confirmed: Vec<String>,

    /// Labels of the cell above single-sample confirmed calls.
    reported: Vec<String>,
}

impl Extractor {
    /// Creates a new extractor.
    pub fn new(
        columns: ColumnGrammar,
        matcher: Matcher,
        requested: Vec<String>,
        confirmed: Vec<String>,
        reported: Vec<String>,
    ) -> Self {
        Self {
            columns,
            matcher,
            requested,
            confirmed,
            reported,
        }
    }

    /// Detects the multi-sample layout of a sheet.
    ///
    /// Returns `None` when there are no sample columns or the leftmost sample
    /// column is the first column (so there is no index column).
    pub fn layout(&self, sheet: &Sheet) -> Option<Layout> {
        let columns = (0..sheet.width())
            .filter(|&column| {
                sheet
                    .label(column)
                    .as_text()
                    .map(|header| self.columns.is_match(header))
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();

        let columns = NonEmpty::from_vec(columns)?;
        let index = columns.head.checked_sub(1)?;

        let matching = |labels: &[String]| {
            (0..sheet.height())
                .filter(|&row| {
                    sheet
                        .cell(row, index)
                        .as_text()
                        .map(|label| labels.iter().any(|l| l == label.trim()))
                        .unwrap_or(false)
                })
                .collect::<Vec<_>>()
        };

        Some(Layout {
            requested: Rows::from_matches(matching(&self.requested)),
            confirmed: Rows::from_matches(matching(&self.confirmed)),
            columns,
            index,
        })
    }

    /// Extracts the calls from a sheet.
    ///
    /// `file_name` is consulted by the single-sample fallback when no header
    /// cell names the sample.
    pub fn extract(&self, sheet: &Sheet, file_name: &str) -> Option<Extraction> {
        match self.layout(sheet) {
            Some(layout) => self.extract_layout(sheet, &layout),
            None => self.extract_single(sheet, file_name),
        }
    }

    /// Extracts the calls using a detected multi-sample layout.
    fn extract_layout(&self, sheet: &Sheet, layout: &Layout) -> Option<Extraction> {
        if !layout.requested.is_resolved() && !layout.confirmed.is_resolved() {
            debug!("no requested or confirmed rows found");
            return None;
        }

        let samples = layout
            .columns
            .iter()
            .filter_map(|&column| {
                let requested = read_rows(sheet, &layout.requested, column);
                let confirmed = read_rows(sheet, &layout.confirmed, column);

                let has_hgvs = [&requested, &confirmed]
                    .into_iter()
                    .flatten()
                    .any(|value| looks_like_hgvs_c(value));

                if !has_hgvs {
                    return None;
                }

                let header = sheet.label(column).to_string();
                let sample = self.columns.canonicalize(&header);

                Some((
                    sample,
                    Calls::new(
                        requested.unwrap_or_default(),
                        confirmed.unwrap_or_default(),
                    ),
                ))
            })
            .collect::<Vec<_>>();

        NonEmpty::from_vec(samples).map(Extraction)
    }

    /// Extracts the call of a single-sample sheet.
    fn extract_single(&self, sheet: &Sheet, file_name: &str) -> Option<Extraction> {
        let sample = sheet
            .header()
            .iter()
            .filter_map(Cell::as_text)
            .find_map(|header| self.matcher.find(header))
            .or_else(|| self.matcher.find(file_name))?;

        let grid = std::iter::once(sheet.header())
            .chain(sheet.rows().iter().map(Vec::as_slice))
            .collect::<Vec<_>>();

        let (row, column) = grid.iter().enumerate().find_map(|(i, cells)| {
            cells
                .iter()
                .position(|cell| {
                    cell.as_text()
                        .map(|text| self.reported.iter().any(|l| l == text.trim()))
                        .unwrap_or(false)
                })
                .map(|j| (i, j))
        })?;

        let calls = grid
            .iter()
            .skip(row + 1)
            .take(REPORTED_ROWS)
            .map(|cells| {
                cells
                    .iter()
                    .skip(column)
                    .take(REPORTED_CELLS)
                    .take_while(|cell| !cell.is_empty())
                    .map(coerce)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|text| looks_like_hgvs_c(text))
            .map(|text| normalize(&text))
            .collect::<Vec<_>>();

        if calls.is_empty() {
            debug!(sample = %sample, "no confirmed call found below the reported label");
            return None;
        }

        let calls = Calls::new("", calls.join(CALL_DELIMITER));
        Some(Extraction(NonEmpty::new((sample.into_inner(), calls))))
    }
}

impl Default for Extractor {
    fn default() -> Self {
        let owned = |labels: &[&str]| labels.iter().map(|l| l.to_string()).collect();

        Self::new(
            ColumnGrammar::default(),
            Matcher::default(),
            owned(REQUESTED_LABELS),
            owned(CONFIRMED_LABELS),
            owned(REPORTED_LABELS),
        )
    }
}

/// Reads the value of a column for a row strategy.
///
/// Only text cells hold calls: numbers and dates in a sample column are read
/// as empty. Returns `None` when the rows are unresolved.
fn read_rows(sheet: &Sheet, rows: &Rows, column: usize) -> Option<String> {
    match rows {
        Rows::Unique(row) => Some(
            sheet
                .cell(*row, column)
                .as_text()
                .map(normalize)
                .unwrap_or_default(),
        ),
        Rows::Block(rows) => Some(
            rows.iter()
                .filter_map(|&row| sheet.cell(row, column).as_text())
                .filter(|text| !text.trim().is_empty() && looks_like_hgvs_c(text))
                .map(normalize)
                .collect::<Vec<_>>()
                .join(CALL_DELIMITER),
        ),
        Rows::Unresolved => None,
    }
}

/// Turns a cell into text for the single-sample fallback.
///
/// Whole numbers are classifications and become `(Class N)`.
fn coerce(cell: &Cell) -> String {
    match cell.as_integer() {
        Some(class) => format!("(Class {class})"),
        None => cell.to_string().trim().to_string(),
    }
}

/// Replaces embedded line breaks with the call delimiter and tabs with spaces.
fn normalize(text: &str) -> String {
    text.replace("\r\n", CALL_DELIMITER)
        .replace(&['\n', '\r'][..], CALL_DELIMITER)
        .replace('\t', " ")
}
