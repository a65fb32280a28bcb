//! A manifest entry.

use std::str::FromStr;

use crate::manifest::reader::COMMENT_PREFIX;

/// The delimiter between the fields of an entry.
pub const ENTRY_DELIMITER: char = '\t';

/// Written before a file name that would otherwise read as a comment line.
pub const ESCAPE: char = '\\';

/// The names of the fields of an entry, in order.
pub const FIELDS: [&str; 7] = [
    "file",
    "sample",
    "request",
    "result",
    "comments",
    "request_genomic",
    "result_genomic",
];

/// The number of fields in an entry.
pub const NUM_FIELDS: usize = FIELDS.len();

/// An error related to parsing an [`Entry`].
#[derive(Debug)]
pub enum ParseError {
    /// The line holds more fields than an entry has.
    TooManyFields(usize),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::TooManyFields(n) => write!(
                f,
                "invalid number of fields in entry: expected at most {NUM_FIELDS} fields, found \
                 {n} fields"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// A single line of a manifest.
///
/// An entry starts out as a bare file path and gains a sample, the requested
/// and confirmed calls, comments and genomic coordinates as it moves through
/// the pipeline stages. An entry with an empty sample is a file that has not
/// been extracted yet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Entry {
    /// The spreadsheet the entry came from.
    pub file: String,

    /// The sample.
    pub sample: String,

    /// The requested call.
    pub request: String,

    /// The confirmed call.
    pub result: String,

    /// Validation comments.
    pub comments: String,

    /// The genomic coordinate of the requested call.
    pub request_genomic: String,

    /// The genomic coordinate of the confirmed call.
    pub result_genomic: String,
}

impl Entry {
    /// Creates an entry for a file that has not been processed yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Entry;
    ///
    /// let entry = Entry::from_file("/data/batch.csv");
    /// assert_eq!(entry.file, "/data/batch.csv");
    /// assert!(!entry.is_extracted());
    /// ```
    pub fn from_file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Whether the entry has been extracted into a sample.
    pub fn is_extracted(&self) -> bool {
        !self.sample.is_empty()
    }

    /// Gets the fields in order.
    pub fn fields(&self) -> [&str; NUM_FIELDS] {
        [
            &self.file,
            &self.sample,
            &self.request,
            &self.result,
            &self.comments,
            &self.request_genomic,
            &self.result_genomic,
        ]
    }

    /// Replaces the characters that cannot appear within a field: tabs are
    /// replaced with spaces and line breaks with `;`.
    ///
    /// A sanitized entry is written and read back unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Entry;
    ///
    /// let mut entry = Entry::from_file("a.csv");
    /// entry.result = String::from("BRCA1\tc.1A>G\r\nhet");
    /// entry.sanitize();
    ///
    /// assert_eq!(entry.result, "BRCA1 c.1A>G;het");
    /// assert_eq!(entry.to_string().parse::<Entry>()?, entry);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn sanitize(&mut self) {
        for field in self.fields_mut() {
            if field.contains(['\t', '\n', '\r']) {
                *field = sanitize(field);
            }
        }
    }

    /// Gets mutable references to the fields in order.
    fn fields_mut(&mut self) -> [&mut String; NUM_FIELDS] {
        [
            &mut self.file,
            &mut self.sample,
            &mut self.request,
            &mut self.result,
            &mut self.comments,
            &mut self.request_genomic,
            &mut self.result_genomic,
        ]
    }
}

impl std::fmt::Display for Entry {
    /// Writes the entry as a tab-delimited line.
    ///
    /// Tabs and line breaks within fields would break the line apart, so they
    /// are written as spaces and `;` respectively. A file name starting with
    /// `#` or `\` is escaped with a leading `\`. Empty trailing fields are
    /// kept.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, field) in self.fields().into_iter().enumerate() {
            if i > 0 {
                write!(f, "{ENTRY_DELIMITER}")?;
            } else if field.starts_with([COMMENT_PREFIX, ESCAPE]) {
                write!(f, "{ESCAPE}")?;
            }

            write!(f, "{}", sanitize(field))?;
        }

        Ok(())
    }
}

impl FromStr for Entry {
    type Err = ParseError;

    /// Parses an entry from a tab-delimited line.
    ///
    /// Missing trailing fields are left empty. One leading `\` is stripped
    /// from the file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Entry;
    ///
    /// let entry = "a.csv\tNGS1\tBRCA1 c.1A>G het".parse::<Entry>()?;
    ///
    /// assert_eq!(entry.sample, "NGS1");
    /// assert_eq!(entry.request, "BRCA1 c.1A>G het");
    /// assert_eq!(entry.result, "");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s.split(ENTRY_DELIMITER).collect::<Vec<_>>();

        if values.len() > NUM_FIELDS {
            return Err(ParseError::TooManyFields(values.len()));
        }

        let mut entry = Self::default();

        for (i, (field, value)) in entry.fields_mut().into_iter().zip(values).enumerate() {
            *field = match i {
                0 => value.strip_prefix(ESCAPE).unwrap_or(value).to_string(),
                _ => value.to_string(),
            };
        }

        Ok(entry)
    }
}

/// Replaces the characters that cannot appear within a field.
fn sanitize(field: &str) -> String {
    field
        .replace("\r\n", ";")
        .replace(&['\n', '\r'][..], ";")
        .replace(ENTRY_DELIMITER, " ")
}
