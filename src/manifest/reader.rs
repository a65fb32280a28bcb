//! A manifest reader.

use std::io::BufRead;
use std::io::{self};
use std::iter;

use crate::manifest::Entry;
use crate::manifest::entry;

/// The new line character.
const NEW_LINE: char = '\n';

/// The carriage return character.
const CARRIAGE_RETURN: char = '\r';

/// The prefix of a comment line.
pub const COMMENT_PREFIX: char = '#';

/// An error related to a [`Reader`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// An entry error (along with the line number).
    Entry(entry::ParseError, usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Entry(err, line_no) => write!(f, "entry error at line {line_no}: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A manifest reader.
#[derive(Clone, Debug)]
pub struct Reader<T>
where
    T: BufRead,
{
    /// The inner reader.
    inner: T,

    /// The number of lines read so far.
    line_no: usize,
}

impl<T> Reader<T>
where
    T: BufRead,
{
    /// Creates a manifest reader.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Reader;
    ///
    /// let data = b"a.csv\n";
    /// let reader = Reader::new(&data[..]);
    /// ```
    pub fn new(inner: T) -> Self {
        Self::from(inner)
    }

    /// Consumes self and returns the inner reader.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Attempts to read the next [`Entry`], skipping comment and blank lines.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Reader;
    ///
    /// let data = b"# files\na.csv\n\nb.csv\tS1\n";
    /// let mut reader = Reader::new(&data[..]);
    /// let mut buffer = String::new();
    ///
    /// assert_eq!(reader.read_entry(&mut buffer)?.unwrap().file, "a.csv");
    /// assert_eq!(reader.read_entry(&mut buffer)?.unwrap().sample, "S1");
    /// assert!(reader.read_entry(&mut buffer)?.is_none());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read_entry(&mut self, buffer: &mut String) -> Result<Option<Entry>, Error> {
        loop {
            if read_line(&mut self.inner, buffer).map_err(Error::Io)? == 0 {
                return Ok(None);
            }

            self.line_no += 1;

            // A written entry always holds delimiters, even when its fields are empty.
            let blank = buffer.trim().is_empty() && !buffer.contains(entry::ENTRY_DELIMITER);

            if blank || buffer.starts_with(COMMENT_PREFIX) {
                continue;
            }

            return buffer
                .parse::<Entry>()
                .map(Some)
                .map_err(|err| Error::Entry(err, self.line_no));
        }
    }

    /// Returns an iterator over the entries in the underlying reader.
    pub fn entries(&mut self) -> impl Iterator<Item = Result<Entry, Error>> + '_ {
        let mut buffer = String::new();
        iter::from_fn(move || self.read_entry(&mut buffer).transpose())
    }
}

impl<T> From<T> for Reader<T>
where
    T: BufRead,
{
    fn from(inner: T) -> Self {
        Self { inner, line_no: 0 }
    }
}

/// Reads a line from a buffered reader, stripping the line ending.
pub(crate) fn read_line<T>(reader: &mut T, buffer: &mut String) -> io::Result<usize>
where
    T: BufRead,
{
    buffer.clear();

    match reader.read_line(buffer) {
        Ok(0) => Ok(0),
        Ok(n) => {
            if buffer.ends_with(NEW_LINE) {
                buffer.pop();

                if buffer.ends_with(CARRIAGE_RETURN) {
                    buffer.pop();
                }
            }

            Ok(n)
        }
        Err(e) => Err(e),
    }
}
