//! Reading spreadsheets from disk.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

use flate2::read::GzDecoder;

use crate::sheet::Cell;
use crate::sheet::Sheet;
use crate::sheet::Workbook;

/// The extension for gzip-compressed files.
const GZIP_EXTENSION: &str = "gz";

/// An error related to reading a [`Sheet`].
///
/// Every variant describes a problem with a single file: callers are expected
/// to log it and move on to the next file.
#[derive(Debug)]
pub enum Error {
    /// The file does not exist.
    NotFound(PathBuf),

    /// The file could not be opened for reading.
    PermissionDenied(PathBuf),

    /// The file extension does not name a supported format.
    UnsupportedFormat(PathBuf),

    /// An I/O error.
    Io(io::Error),

    /// The contents of the file could not be parsed.
    Parse(csv::Error),

    /// The workbook could not be read.
    Workbook(calamine::Error),

    /// The workbook holds no worksheet.
    EmptyWorkbook(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Error::PermissionDenied(path) => {
                write!(f, "permission denied: {}", path.display())
            }
            Error::UnsupportedFormat(path) => {
                write!(f, "unsupported spreadsheet format: {}", path.display())
            }
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::Workbook(err) => write!(f, "workbook error: {err}"),
            Error::EmptyWorkbook(path) => write!(f, "no worksheet in: {}", path.display()),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A source of spreadsheets.
///
/// The pipeline only ever asks a source for the sheet stored at a path, so
/// formats other than delimited text can be supported by implementing this
/// trait.
pub trait Source {
    /// Reads the first sheet stored at `path`.
    fn read(&self, path: &Path) -> Result<Sheet>;
}

/// Opens a file, telling missing and unreadable files apart.
pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_path_buf()),
        _ => Error::Io(err),
    })
}

/// A source of every supported format, chosen by file extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spreadsheets;

impl Spreadsheets {
    /// Whether the format of `path` is supported.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use varconfirm::sheet::Spreadsheets;
    ///
    /// assert!(Spreadsheets::supports(Path::new("batch.xlsx")));
    /// assert!(Spreadsheets::supports(Path::new("batch.csv.gz")));
    /// assert!(!Spreadsheets::supports(Path::new("batch.pdf")));
    /// ```
    pub fn supports(path: &Path) -> bool {
        Workbook::supports(path) || Delimited::delimiter(path).is_some()
    }
}

impl Source for Spreadsheets {
    fn read(&self, path: &Path) -> Result<Sheet> {
        if Workbook::supports(path) {
            Workbook.read(path)
        } else {
            Delimited.read(path)
        }
    }
}

/// A source of delimited text spreadsheets (`.csv`, `.tsv`, `.txt`), each
/// optionally gzip-compressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct Delimited;

impl Delimited {
    /// Gets the delimiter for a path based on its extension.
    ///
    /// A trailing `.gz` is looked through.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use varconfirm::sheet::Delimited;
    ///
    /// assert_eq!(Delimited::delimiter(Path::new("a.csv")), Some(b','));
    /// assert_eq!(Delimited::delimiter(Path::new("a.tsv.gz")), Some(b'\t'));
    /// assert_eq!(Delimited::delimiter(Path::new("a.xlsx")), None);
    /// ```
    pub fn delimiter(path: &Path) -> Option<u8> {
        let path = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(GZIP_EXTENSION) => path.file_stem().map(Path::new)?,
            _ => path,
        };

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Some(b','),
            Some("tsv") | Some("txt") => Some(b'\t'),
            _ => None,
        }
    }
}

impl Source for Delimited {
    fn read(&self, path: &Path) -> Result<Sheet> {
        let delimiter =
            Self::delimiter(path).ok_or_else(|| Error::UnsupportedFormat(path.to_path_buf()))?;

        let file = open(path)?;

        let gzipped = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION))
            .unwrap_or(false);

        if gzipped {
            Sheet::from_reader(BufReader::new(GzDecoder::new(file)), delimiter)
        } else {
            Sheet::from_reader(BufReader::new(file), delimiter)
        }
    }
}

impl Sheet {
    /// Reads a sheet from delimited text where the first record is the header.
    ///
    /// Records may have differing numbers of fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::sheet::Cell;
    /// use varconfirm::sheet::Sheet;
    ///
    /// let data = b"Label,NGS1_01_2_AB\nFinal Result,\"BRCA1 c.1A>G\nhet\"\n";
    /// let sheet = Sheet::from_reader(&data[..], b',')?;
    ///
    /// assert_eq!(sheet.height(), 1);
    /// assert_eq!(sheet.cell(0, 1), &Cell::Text(String::from("BRCA1 c.1A>G\nhet")));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_reader<R>(reader: R, delimiter: u8) -> Result<Self>
    where
        R: Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);

        let mut rows = Vec::new();

        for result in reader.records() {
            let record = result.map_err(Error::Parse)?;
            rows.push(record.iter().map(Cell::parse).collect::<Vec<_>>());
        }

        let mut rows = rows.into_iter();
        let header = rows.next().unwrap_or_default();

        Ok(Self::new(header, rows.collect()))
    }
}
