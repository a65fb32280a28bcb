//! The manifest: a tab-delimited list of spreadsheets and the calls extracted
//! from them.
//!
//! Every pipeline stage reads the whole entry list, replaces it and commits
//! the manifest to disk, so a run interrupted between stages can be resumed
//! from the last committed stage.

pub mod entry;
pub mod pipeline;
pub mod reader;

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

pub use entry::Entry;
pub use pipeline::Pipeline;
pub use pipeline::Stage;
pub use reader::Reader;

/// The suffix appended to the manifest name for the temporary file written
/// during a commit.
const TEMPORARY_SUFFIX: &str = ".tmp";

/// An error related to a [`Manifest`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// An error reading the manifest.
    Read(reader::Error),

    /// The manifest path has no file name.
    InvalidPath(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Read(err) => write!(f, "read error: {err}"),
            Error::InvalidPath(path) => write!(f, "invalid manifest path: {}", path.display()),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A manifest bound to a path on disk.
#[derive(Clone, Debug)]
pub struct Manifest {
    /// The path the manifest is committed to.
    path: PathBuf,

    /// The entries.
    entries: Vec<Entry>,
}

impl Manifest {
    /// Creates an empty manifest that will be committed to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Opens the manifest at `path`.
    ///
    /// A missing file is an empty manifest. Comment lines (`#`) and blank lines
    /// are skipped and will not be written back.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self::new(path));
        }

        let file = File::open(&path).map_err(Error::Io)?;
        let mut reader = Reader::new(BufReader::new(file));
        let entries = reader
            .entries()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Read)?;

        Ok(Self { path, entries })
    }

    /// Appends an unprocessed entry for each file.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Manifest;
    ///
    /// let manifest = Manifest::new("manifest.tsv").with_files(["a.csv", "b.csv"]);
    /// assert_eq!(manifest.len(), 2);
    /// assert!(manifest.entries().iter().all(|entry| entry.sample.is_empty()));
    /// ```
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend(files.into_iter().map(Entry::from_file));
        self
    }

    /// Gets the path the manifest is committed to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Gets the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends entries.
    ///
    /// Entries are [sanitized](Entry::sanitize) so that the entries held match
    /// those read back after a commit.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.entries.extend(entries.into_iter().map(|mut entry| {
            entry.sanitize();
            entry
        }));
    }

    /// Replaces the entries wholesale, returning the previous entries.
    ///
    /// Entries are [sanitized](Entry::sanitize) as in [`Manifest::extend`].
    pub fn replace(&mut self, mut entries: Vec<Entry>) -> Vec<Entry> {
        entries.iter_mut().for_each(Entry::sanitize);
        std::mem::replace(&mut self.entries, entries)
    }

    /// Writes the manifest to its path.
    ///
    /// The entries are written to a sibling temporary file which is then
    /// renamed over the manifest, so a failed commit leaves the previous
    /// manifest intact.
    pub fn commit(&self) -> Result<()> {
        let name = self
            .path
            .file_name()
            .ok_or_else(|| Error::InvalidPath(self.path.clone()))?;

        let mut temporary = name.to_os_string();
        temporary.push(TEMPORARY_SUFFIX);
        let temporary = self.path.with_file_name(temporary);

        let mut writer = BufWriter::new(File::create(&temporary).map_err(Error::Io)?);

        for entry in &self.entries {
            writeln!(writer, "{entry}").map_err(Error::Io)?;
        }

        writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))?
            .sync_all()
            .map_err(Error::Io)?;

        std::fs::rename(&temporary, &self.path).map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_commit_and_reload() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let path = dir.path().join("manifest.tsv");

        let mut manifest = Manifest::new(&path).with_files(["a.csv", "b.csv"]);
        manifest.extend([Entry {
            file: String::from("c.csv"),
            sample: String::from("NGS1_01_2_NAME_Pan7"),
            request: String::from("BRCA1 c.1A>G het"),
            result: String::from("BRCA1 c.1A>G het"),
            comments: String::from("request-no_class|result-no_class"),
            ..Default::default()
        }]);
        manifest.commit()?;

        let reloaded = Manifest::open(&path)?;
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.entries(), manifest.entries());
        assert!(!dir.path().join("manifest.tsv.tmp").exists());

        Ok(())
    }

    #[test]
    fn test_comments_are_dropped_on_commit(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let path = dir.path().join("manifest.tsv");
        std::fs::write(&path, "# header\na.csv\n\n")?;

        let manifest = Manifest::open(&path)?;
        assert_eq!(manifest.len(), 1);
        manifest.commit()?;

        assert_eq!(std::fs::read_to_string(&path)?, "a.csv\t\t\t\t\t\t\n");

        Ok(())
    }

    #[test]
    fn test_reload_matches_committed_entries(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let path = dir.path().join("manifest.tsv");

        let mut manifest = Manifest::new(&path);
        manifest.extend([
            Entry {
                file: String::from("batch.csv"),
                sample: String::from("NGS1_01_2_NAME_Pan7"),
                request: String::from("BRCA1 c.1A>G het"),
                result: String::from("BRCA1\tc.1A>G het\nBRCA2 c.9del hom"),
                ..Default::default()
            },
            Entry::from_file("#12 June.csv"),
            Entry::default(),
        ]);

        assert_eq!(
            manifest.entries()[0].result,
            "BRCA1 c.1A>G het;BRCA2 c.9del hom"
        );

        manifest.commit()?;

        let reloaded = Manifest::open(&path)?;
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.entries(), manifest.entries());
        assert_eq!(reloaded.entries()[1].file, "#12 June.csv");

        Ok(())
    }

    #[test]
    fn test_missing_manifest_is_empty() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let manifest = Manifest::open(dir.path().join("missing.tsv"))?;
        assert!(manifest.is_empty());

        Ok(())
    }
}
