//! Sample identifiers derived from file names and spreadsheet column headers.
//!
//! Sequencing output files and confirmation spreadsheets do not carry an
//! explicit sample field. Instead, the sample is encoded in the name of the
//! file (or the header of a spreadsheet column) following one of a small number
//! of naming conventions. A [`Matcher`] holds those conventions as an ordered
//! list of [`Grammar`]s and returns the sample prefix of the first one that
//! matches.
//!
//! ```
//! use varconfirm::sample::Matcher;
//!
//! let matcher = Matcher::default();
//!
//! let sample = matcher
//!     .find("NGS123_01_456789_JD_M_VCP1_Pan4044_S12_R1_001.vcf.gz")
//!     .unwrap();
//! assert_eq!(sample.as_str(), "NGS123_01_456789_JD_M_VCP1_Pan4044");
//!
//! assert!(matcher.find("README.md").is_none());
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// The pattern for the primary naming convention.
///
/// The groups are, in order: the sample prefix, the library, the count, the
/// DNA number, an optional second identifier, optional initials, an optional
/// sex code, the patient name, and the panel number.
pub const PRIMARY_PATTERN: &str =
    r"^((\w+)_(\d+)_(\w+)_(\w+_)?([A-Z]{2}_)?([MFU]x?_)?(\w+)_(Pan\d+))_";

/// The pattern for files produced by the `UP`-numbered pipeline variant.
pub const SECONDARY_PATTERN: &str = r"^(.+)_UP\d+_.+\.vcf";

/// The pattern a spreadsheet column header must match to hold a sample.
pub const COLUMN_PATTERN: &str = r"^NGS\w+_\d+_\w+_\w{2}";

/// The pattern used to cut a sample column header down to its sample.
pub const COLUMN_CANONICAL_PATTERN: &str = r"^(NGS.+Pan\d+_S\d+).*$";

/// The compiled primary grammar.
static PRIMARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(PRIMARY_PATTERN).unwrap());

/// The compiled secondary grammar.
static SECONDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(SECONDARY_PATTERN).unwrap());

/// The compiled column detection grammar.
static COLUMN: LazyLock<Regex> = LazyLock::new(|| Regex::new(COLUMN_PATTERN).unwrap());

/// The compiled column canonicalisation grammar.
static COLUMN_CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COLUMN_CANONICAL_PATTERN).unwrap());

////////////////////////////////////////////////////////////////////////////////////////
// Sample identifiers
////////////////////////////////////////////////////////////////////////////////////////

/// A sample identifier.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SampleId(String);

impl SampleId {
    /// Gets the sample identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes `self` and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SampleId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Grammars
////////////////////////////////////////////////////////////////////////////////////////

/// A named naming convention.
#[derive(Clone, Debug)]
pub struct Grammar {
    /// The name of the grammar.
    name: &'static str,

    /// The pattern. It is always applied from the start of the name.
    regex: Regex,

    /// The capture group holding the sample.
    group: usize,
}

impl Grammar {
    /// Creates a new grammar.
    ///
    /// The pattern should be anchored with `^`: a grammar only ever describes
    /// a name from its first character.
    pub fn new(name: &'static str, regex: Regex, group: usize) -> Self {
        Self { name, regex, group }
    }

    /// The primary grammar (`Library_Count_DNA_ID2[_Initials][_Sex]_Name_PanNNNN_`).
    pub fn primary() -> Self {
        Self::new("primary", PRIMARY.clone(), 1)
    }

    /// The grammar for `<sample>_UP<digits>_....vcf` files.
    pub fn secondary() -> Self {
        Self::new("secondary", SECONDARY.clone(), 1)
    }

    /// Gets the name of the grammar.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Attempts to match a name, returning the designated capture group.
    pub fn capture<'a>(&self, name: &'a str) -> Option<&'a str> {
        let captures = self.regex.captures(name)?;

        // NOTE: the whole match is required to start at the beginning of the
        // name, even if the supplied pattern forgot its anchor.
        if captures.get(0)?.start() != 0 {
            return None;
        }

        captures.get(self.group).map(|m| m.as_str())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Matcher
////////////////////////////////////////////////////////////////////////////////////////

/// An ordered set of grammars where the first matching grammar wins.
#[derive(Clone, Debug)]
pub struct Matcher {
    /// The grammars in priority order.
    grammars: Vec<Grammar>,
}

impl Matcher {
    /// Creates a matcher from grammars given in priority order.
    pub fn new(grammars: Vec<Grammar>) -> Self {
        Self { grammars }
    }

    /// Gets the grammars in priority order.
    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    /// Finds the sample encoded in `name`.
    ///
    /// Only the first grammar that matches is consulted; results from
    /// different grammars are never merged.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::sample::Matcher;
    ///
    /// let matcher = Matcher::default();
    /// let sample = matcher.find("PATIENT-7_UP03_R1.vcf.gz").unwrap();
    /// assert_eq!(sample.as_str(), "PATIENT-7");
    /// ```
    pub fn find(&self, name: &str) -> Option<SampleId> {
        self.grammars
            .iter()
            .find_map(|grammar| grammar.capture(name))
            .map(|sample| SampleId(sample.to_string()))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(vec![Grammar::primary(), Grammar::secondary()])
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Column grammar
////////////////////////////////////////////////////////////////////////////////////////

/// The loosened grammar used for spreadsheet column headers.
///
/// Column headers only need to look like the start of a sample name to be
/// considered a sample column; none of the optional groups are required.
#[derive(Clone, Debug)]
pub struct ColumnGrammar {
    /// Decides whether a header names a sample column.
    detect: Regex,

    /// Cuts a header down to its sample (capture group 1).
    canonical: Regex,
}

impl ColumnGrammar {
    /// Creates a new column grammar.
    pub fn new(detect: Regex, canonical: Regex) -> Self {
        Self { detect, canonical }
    }

    /// Whether `header` names a sample column.
    pub fn is_match(&self, header: &str) -> bool {
        self.detect
            .find(header)
            .map(|m| m.start() == 0)
            .unwrap_or(false)
    }

    /// Cuts a column header down to its sample.
    ///
    /// Headers that do not follow the canonical form are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::sample::ColumnGrammar;
    ///
    /// let grammar = ColumnGrammar::default();
    /// assert_eq!(
    ///     grammar.canonicalize("NGS88_02_111_AB_F_SMITH_Pan493_S4_R1_001.vcf"),
    ///     "NGS88_02_111_AB_F_SMITH_Pan493_S4"
    /// );
    /// assert_eq!(grammar.canonicalize("NGS88_02_111_AB"), "NGS88_02_111_AB");
    /// ```
    pub fn canonicalize(&self, header: &str) -> String {
        self.canonical
            .captures(header)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| header.to_string())
    }
}

impl Default for ColumnGrammar {
    fn default() -> Self {
        Self::new(COLUMN.clone(), COLUMN_CANONICAL.clone())
    }
}
