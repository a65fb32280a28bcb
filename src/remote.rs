//! Working with pipeline output stored on a remote bioinformatics platform.
//!
//! The platform client itself (authentication, the HTTP protocol, retries) is
//! not part of this crate: it is reached through the [`Platform`] trait. What
//! lives here is the logic built on top of it:
//!
//! * grouping platform output files by the sample encoded in their names,
//! * locating the variant call file and index of a sample,
//! * archiving live files in batches (with per-file fallback when a batch is
//!   refused) and unarchiving archived files.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::str::FromStr;

use regex::Regex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::sample::Grammar;
use crate::sample::Matcher;
use crate::sample::SampleId;

/// The maximum number of files archived in a single platform call.
pub const BATCH_SIZE: usize = 1000;

/// The number of hours a download URL stays valid.
pub const URL_HOURS: u32 = 12;

/// The extension of a variant call file index.
pub const INDEX_EXTENSION: &str = ".tbi";

/// The default suffix of a sample's variant call file.
pub const DEFAULT_CALLS_SUFFIX: &str = r"_S\d+_R1_001\.vcf\.gz";

/// The folders holding pipeline output, along with the grammar their file
/// names follow.
pub fn data_folders() -> Vec<(&'static str, Grammar)> {
    vec![
        ("/output", Grammar::primary()),
        ("/analysis_folder/Results", Grammar::secondary()),
    ]
}

////////////////////////////////////////////////////////////////////////////////////////
// Files
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to parsing an [`ArchivalState`].
#[derive(Debug)]
pub enum ParseError {
    /// An unknown archival state.
    Unknown(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Unknown(state) => write!(f, "unknown archival state: {state}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// The storage tier of a remote file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArchivalState {
    /// The file can be downloaded.
    Live,

    /// The file is being archived.
    Archival,

    /// The file is archived.
    Archived,

    /// The file is being restored.
    Unarchiving,
}

impl std::fmt::Display for ArchivalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchivalState::Live => write!(f, "live"),
            ArchivalState::Archival => write!(f, "archival"),
            ArchivalState::Archived => write!(f, "archived"),
            ArchivalState::Unarchiving => write!(f, "unarchiving"),
        }
    }
}

impl FromStr for ArchivalState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(ArchivalState::Live),
            "archival" => Ok(ArchivalState::Archival),
            "archived" => Ok(ArchivalState::Archived),
            "unarchiving" => Ok(ArchivalState::Unarchiving),
            _ => Err(ParseError::Unknown(s.to_string())),
        }
    }
}

/// A file within a project.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FileRef {
    /// The project.
    pub project: String,

    /// The file.
    pub id: String,
}

impl FileRef {
    /// Creates a new file reference.
    pub fn new(project: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.project, self.id)
    }
}

/// The description of a remote file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileMetadata {
    /// The file.
    pub file: FileRef,

    /// The name of the file.
    pub name: String,

    /// The folder holding the file.
    pub folder: String,

    /// The storage tier.
    pub archival_state: ArchivalState,
}

/// Where to look for files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scope {
    /// Restricts the search to a single project.
    pub project: Option<String>,

    /// Restricts the search to a folder (and its subfolders).
    pub folder: Option<String>,
}

////////////////////////////////////////////////////////////////////////////////////////
// Platform
////////////////////////////////////////////////////////////////////////////////////////

/// A remote bioinformatics platform.
pub trait Platform {
    /// The error returned by the platform.
    type Error: std::error::Error;

    /// Finds the files whose name matches `pattern` within `scope`.
    fn find_files(&self, pattern: &Regex, scope: &Scope) -> Result<Vec<FileMetadata>, Self::Error>;

    /// Describes a single file.
    fn get_file(&self, file: &FileRef) -> Result<FileMetadata, Self::Error>;

    /// Gets a download URL valid for `ttl_hours`.
    ///
    /// Returns `Ok(None)` when the file is not live.
    fn get_download_url(&self, file: &FileRef, ttl_hours: u32)
        -> Result<Option<String>, Self::Error>;

    /// Archives a file, returning whether the platform accepted the request.
    fn archive(&self, file: &FileRef, all_copies: bool) -> Result<bool, Self::Error>;

    /// Unarchives a file, returning whether the platform accepted the request.
    fn unarchive(&self, file: &FileRef) -> Result<bool, Self::Error>;

    /// Archives several files of a single project in one request, returning
    /// whether the platform accepted the whole batch.
    ///
    /// By default, every file is archived on its own.
    fn archive_many(
        &self,
        project: &str,
        ids: &[String],
        all_copies: bool,
    ) -> Result<bool, Self::Error> {
        let mut accepted = true;

        for id in ids {
            accepted &= self.archive(&FileRef::new(project, id.as_str()), all_copies)?;
        }

        Ok(accepted)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Samples
////////////////////////////////////////////////////////////////////////////////////////

/// Groups pipeline output files by sample.
///
/// Only files within one of the [`data_folders()`] are considered, and each is
/// matched with the grammar of its folder.
pub fn group_by_sample(files: Vec<FileMetadata>) -> BTreeMap<SampleId, Vec<FileMetadata>> {
    let folders = data_folders()
        .into_iter()
        .map(|(folder, grammar)| (folder, Matcher::new(vec![grammar])))
        .collect::<Vec<_>>();

    let mut samples = BTreeMap::<SampleId, Vec<FileMetadata>>::new();

    for file in files {
        let Some((_, matcher)) = folders
            .iter()
            .find(|(folder, _)| in_folder(&file.folder, folder))
        else {
            continue;
        };

        match matcher.find(&file.name) {
            Some(sample) => samples.entry(sample).or_default().push(file),
            None => debug!(name = %file.name, "no sample in file name"),
        }
    }

    samples
}

/// Whether `folder` is `parent` or one of its subfolders.
fn in_folder(folder: &str, parent: &str) -> bool {
    folder == parent
        || folder
            .strip_prefix(parent)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// An error related to locating the files of a sample.
#[derive(Debug)]
pub enum Error<E> {
    /// The platform failed.
    Platform(E),

    /// The search pattern could not be built.
    Pattern(regex::Error),
}

impl<E> std::fmt::Display for Error<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Platform(err) => write!(f, "platform error: {err}"),
            Error::Pattern(err) => write!(f, "invalid search pattern: {err}"),
        }
    }
}

impl<E> std::error::Error for Error<E> where E: std::fmt::Debug + std::fmt::Display {}

/// The variant call file of a sample and its index.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SampleFiles {
    /// The variant call file.
    pub calls: Option<FileMetadata>,

    /// The index.
    pub index: Option<FileMetadata>,
}

/// Finds the variant call file and index of a sample.
///
/// Files are searched by `{sample}.*{suffix}`; the file whose name ends in
/// `.tbi` is the index. When several files match, the first of each kind is
/// kept.
pub fn locate_sample_files<P>(
    platform: &P,
    sample: &SampleId,
    suffix: &str,
    scope: &Scope,
) -> Result<SampleFiles, Error<P::Error>>
where
    P: Platform,
{
    let pattern = Regex::new(&format!("^{}.*{suffix}", regex::escape(sample.as_str())))
        .map_err(Error::Pattern)?;

    let mut found = SampleFiles::default();

    for file in platform
        .find_files(&pattern, scope)
        .map_err(Error::Platform)?
    {
        let slot = if file.name.ends_with(INDEX_EXTENSION) {
            &mut found.index
        } else {
            &mut found.calls
        };

        if slot.is_none() {
            *slot = Some(file);
        }
    }

    Ok(found)
}

/// Gets the download URLs of a sample's variant call file and index.
///
/// Returns `Ok(None)` unless both files exist and are live.
pub fn download_urls<P>(
    platform: &P,
    files: &SampleFiles,
) -> Result<Option<(String, String)>, P::Error>
where
    P: Platform,
{
    let (Some(calls), Some(index)) = (&files.calls, &files.index) else {
        return Ok(None);
    };

    let calls = platform.get_download_url(&calls.file, URL_HOURS)?;
    let index = platform.get_download_url(&index.file, URL_HOURS)?;

    Ok(calls.zip(index))
}

////////////////////////////////////////////////////////////////////////////////////////
// Archival
////////////////////////////////////////////////////////////////////////////////////////

/// Options for archival.
#[derive(Clone, Debug, Default)]
pub struct ArchiveOptions {
    /// Archive every copy of a file, not only the one in the given project.
    pub all_copies: bool,

    /// Only report what would be done.
    pub dry_run: bool,

    /// Files that must never be archived (typically every file of a
    /// protected project).
    pub protected: HashSet<String>,
}

/// What happened during archival or unarchival.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArchiveReport {
    /// Files that were (or, in a dry run, would have been) processed.
    pub processed: Vec<FileRef>,

    /// Files that were skipped because of their state or protection.
    pub skipped: Vec<FileRef>,

    /// Files the platform refused along with the reason.
    pub failed: Vec<(FileRef, String)>,

    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Archives the live, unprotected files.
///
/// Files are archived per project in batches of at most [`BATCH_SIZE`]. When
/// a batch is refused, each of its files is archived on its own so that one
/// file cannot hold back the rest.
pub fn archive<P>(platform: &P, files: &[FileMetadata], options: &ArchiveOptions) -> ArchiveReport
where
    P: Platform,
{
    let mut report = ArchiveReport {
        dry_run: options.dry_run,
        ..Default::default()
    };

    let mut projects = BTreeMap::<&str, Vec<String>>::new();

    for metadata in files {
        if metadata.archival_state != ArchivalState::Live
            || options.protected.contains(&metadata.file.id)
        {
            report.skipped.push(metadata.file.clone());
            continue;
        }

        projects
            .entry(metadata.file.project.as_str())
            .or_default()
            .push(metadata.file.id.clone());
    }

    for (project, ids) in projects {
        if options.dry_run {
            info!(project, files = ids.len(), "would archive");
            report
                .processed
                .extend(ids.iter().map(|id| FileRef::new(project, id.as_str())));
            continue;
        }

        let batches = ids.chunks(BATCH_SIZE).collect::<Vec<_>>();

        for (i, batch) in batches.iter().enumerate() {
            info!(project, batch = i + 1, batches = batches.len(), "archiving");

            match platform.archive_many(project, batch, options.all_copies) {
                Ok(true) => report
                    .processed
                    .extend(batch.iter().map(|id| FileRef::new(project, id.as_str()))),
                Ok(false) => {
                    warn!(project, "batch refused, archiving files one by one");
                    archive_each(platform, project, batch, options.all_copies, &mut report);
                }
                Err(err) => {
                    warn!(project, %err, "batch failed, archiving files one by one");
                    archive_each(platform, project, batch, options.all_copies, &mut report);
                }
            }
        }
    }

    report
}

/// Archives files one at a time.
fn archive_each<P>(
    platform: &P,
    project: &str,
    ids: &[String],
    all_copies: bool,
    report: &mut ArchiveReport,
) where
    P: Platform,
{
    for id in ids {
        let file = FileRef::new(project, id.as_str());
        let outcome = platform.archive(&file, all_copies);
        record(report, file, outcome, "archive");
    }
}

/// Unarchives the files that are not live.
pub fn unarchive<P>(platform: &P, files: &[FileMetadata], dry_run: bool) -> ArchiveReport
where
    P: Platform,
{
    let mut report = ArchiveReport {
        dry_run,
        ..Default::default()
    };

    for metadata in files {
        let file = metadata.file.clone();

        if metadata.archival_state == ArchivalState::Live {
            report.skipped.push(file);
        } else if dry_run {
            info!(%file, "would unarchive");
            report.processed.push(file);
        } else {
            let outcome = platform.unarchive(&file);
            record(&mut report, file, outcome, "unarchive");
        }
    }

    report
}

/// Records the outcome of a single platform request.
fn record<E>(report: &mut ArchiveReport, file: FileRef, outcome: Result<bool, E>, action: &str)
where
    E: std::fmt::Display,
{
    match outcome {
        Ok(true) => report.processed.push(file),
        Ok(false) => {
            warn!(%file, "failed to {action}, check permissions");
            report
                .failed
                .push((file, String::from("refused by the platform")));
        }
        Err(err) => {
            warn!(%file, %err, "failed to {action}");
            report.failed.push((file, err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// An error from the [`MockPlatform`].
    #[derive(Debug)]
    struct PermissionDenied;

    impl std::fmt::Display for PermissionDenied {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "permission denied")
        }
    }

    impl std::error::Error for PermissionDenied {}

    /// A platform holding files in memory.
    #[derive(Debug, Default)]
    struct MockPlatform {
        files: Vec<FileMetadata>,
        locked: HashSet<String>,
        batches: RefCell<Vec<usize>>,
        archived: RefCell<Vec<String>>,
    }

    impl Platform for MockPlatform {
        type Error = PermissionDenied;

        fn find_files(
            &self,
            pattern: &Regex,
            scope: &Scope,
        ) -> Result<Vec<FileMetadata>, Self::Error> {
            Ok(self
                .files
                .iter()
                .filter(|file| pattern.is_match(&file.name))
                .filter(|file| {
                    scope
                        .project
                        .as_ref()
                        .map(|p| *p == file.file.project)
                        .unwrap_or(true)
                })
                .cloned()
                .collect())
        }

        fn get_file(&self, file: &FileRef) -> Result<FileMetadata, Self::Error> {
            self.files
                .iter()
                .find(|metadata| metadata.file == *file)
                .cloned()
                .ok_or(PermissionDenied)
        }

        fn get_download_url(
            &self,
            file: &FileRef,
            _: u32,
        ) -> Result<Option<String>, Self::Error> {
            let metadata = self.get_file(file)?;
            Ok((metadata.archival_state == ArchivalState::Live)
                .then(|| format!("https://example.org/{}", metadata.name)))
        }

        fn archive(&self, file: &FileRef, _: bool) -> Result<bool, Self::Error> {
            if self.locked.contains(&file.id) {
                return Err(PermissionDenied);
            }

            self.archived.borrow_mut().push(file.id.clone());
            Ok(true)
        }

        fn unarchive(&self, file: &FileRef) -> Result<bool, Self::Error> {
            Ok(!self.locked.contains(&file.id))
        }

        fn archive_many(
            &self,
            _: &str,
            ids: &[String],
            _: bool,
        ) -> Result<bool, Self::Error> {
            self.batches.borrow_mut().push(ids.len());

            if ids.iter().any(|id| self.locked.contains(id)) {
                return Ok(false);
            }

            self.archived.borrow_mut().extend(ids.iter().cloned());
            Ok(true)
        }
    }

    fn file(project: &str, id: &str, name: &str, folder: &str, state: ArchivalState) -> FileMetadata {
        FileMetadata {
            file: FileRef::new(project, id),
            name: name.to_string(),
            folder: folder.to_string(),
            archival_state: state,
        }
    }

    #[test]
    fn test_archival_state() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!("archived".parse::<ArchivalState>()?, ArchivalState::Archived);
        assert_eq!(ArchivalState::Live.to_string(), "live");

        let err = "frozen".parse::<ArchivalState>().unwrap_err();
        assert_eq!(err.to_string(), "unknown archival state: frozen");

        Ok(())
    }

    #[test]
    fn test_archive_in_batches() {
        let files = (0..2500)
            .map(|i| file("p1", &format!("f{i}"), "x", "/", ArchivalState::Live))
            .collect::<Vec<_>>();

        let platform = MockPlatform::default();
        let report = archive(&platform, &files, &ArchiveOptions::default());

        assert_eq!(*platform.batches.borrow(), [1000, 1000, 500]);
        assert_eq!(report.processed.len(), 2500);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_archive_skips_protected_and_archived() {
        let files = vec![
            file("p1", "f1", "a", "/", ArchivalState::Live),
            file("p1", "f2", "b", "/", ArchivalState::Archived),
            file("p2", "f3", "c", "/", ArchivalState::Live),
        ];

        let options = ArchiveOptions {
            protected: HashSet::from([String::from("f3")]),
            ..Default::default()
        };

        let platform = MockPlatform::default();
        let report = archive(&platform, &files, &options);

        assert_eq!(report.processed, [FileRef::new("p1", "f1")]);
        assert_eq!(
            report.skipped,
            [FileRef::new("p1", "f2"), FileRef::new("p2", "f3")]
        );
    }

    #[test]
    fn test_archive_falls_back_to_single_files() {
        let files = vec![
            file("p1", "f1", "a", "/", ArchivalState::Live),
            file("p1", "f2", "b", "/", ArchivalState::Live),
        ];

        let platform = MockPlatform {
            locked: HashSet::from([String::from("f2")]),
            ..Default::default()
        };
        let report = archive(&platform, &files, &ArchiveOptions::default());

        assert_eq!(report.processed, [FileRef::new("p1", "f1")]);
        assert_eq!(
            report.failed,
            [(FileRef::new("p1", "f2"), String::from("permission denied"))]
        );
    }

    #[test]
    fn test_archive_dry_run() {
        let files = vec![file("p1", "f1", "a", "/", ArchivalState::Live)];
        let options = ArchiveOptions {
            dry_run: true,
            ..Default::default()
        };

        let platform = MockPlatform::default();
        let report = archive(&platform, &files, &options);

        assert!(report.dry_run);
        assert_eq!(report.processed.len(), 1);
        assert!(platform.archived.borrow().is_empty());
        assert!(platform.batches.borrow().is_empty());
    }

    #[test]
    fn test_default_archive_many() {
        /// A platform that only implements single-file archival.
        struct Single(MockPlatform);

        impl Platform for Single {
            type Error = PermissionDenied;

            fn find_files(&self, p: &Regex, s: &Scope) -> Result<Vec<FileMetadata>, Self::Error> {
                self.0.find_files(p, s)
            }

            fn get_file(&self, file: &FileRef) -> Result<FileMetadata, Self::Error> {
                self.0.get_file(file)
            }

            fn get_download_url(
                &self,
                file: &FileRef,
                ttl: u32,
            ) -> Result<Option<String>, Self::Error> {
                self.0.get_download_url(file, ttl)
            }

            fn archive(&self, file: &FileRef, all: bool) -> Result<bool, Self::Error> {
                self.0.archive(file, all)
            }

            fn unarchive(&self, file: &FileRef) -> Result<bool, Self::Error> {
                self.0.unarchive(file)
            }
        }

        let platform = Single(MockPlatform::default());
        let ids = [String::from("f1"), String::from("f2")];

        assert!(matches!(platform.archive_many("p1", &ids, false), Ok(true)));
        assert_eq!(*platform.0.archived.borrow(), ids);
    }

    #[test]
    fn test_unarchive() {
        let files = vec![
            file("p1", "f1", "a", "/", ArchivalState::Archived),
            file("p1", "f2", "b", "/", ArchivalState::Live),
            file("p1", "f3", "c", "/", ArchivalState::Archived),
        ];

        let platform = MockPlatform {
            locked: HashSet::from([String::from("f3")]),
            ..Default::default()
        };
        let report = unarchive(&platform, &files, false);

        assert_eq!(report.processed, [FileRef::new("p1", "f1")]);
        assert_eq!(report.skipped, [FileRef::new("p1", "f2")]);
        assert_eq!(report.failed[0].1, "refused by the platform");
    }

    #[test]
    fn test_group_by_sample() {
        let files = vec![
            file(
                "p1",
                "f1",
                "NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz",
                "/output",
                ArchivalState::Live,
            ),
            file(
                "p1",
                "f2",
                "NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz.tbi",
                "/output/calls",
                ArchivalState::Live,
            ),
            file(
                "p1",
                "f3",
                "PATIENT-7_UP03_R1.vcf",
                "/analysis_folder/Results",
                ArchivalState::Live,
            ),
            file(
                "p1",
                "f4",
                "NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz",
                "/outputs",
                ArchivalState::Live,
            ),
            file("p1", "f5", "notes.txt", "/output", ArchivalState::Live),
        ];

        let samples = group_by_sample(files);
        let keys = samples.keys().map(SampleId::as_str).collect::<Vec<_>>();

        assert_eq!(keys, ["NGS1_01_2_NAME_Pan7", "PATIENT-7"]);
        assert_eq!(samples.values().next().unwrap().len(), 2);
    }

    #[test]
    fn test_locate_sample_files() -> Result<(), Box<dyn std::error::Error>> {
        let platform = MockPlatform {
            files: vec![
                file(
                    "p1",
                    "f1",
                    "NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz",
                    "/output",
                    ArchivalState::Live,
                ),
                file(
                    "p1",
                    "f2",
                    "NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz.tbi",
                    "/output",
                    ArchivalState::Live,
                ),
                file(
                    "p1",
                    "f3",
                    "NGS1_01_2_NAME_Pan7_S1_R1_001.bam",
                    "/output",
                    ArchivalState::Live,
                ),
            ],
            ..Default::default()
        };

        let sample = Matcher::default()
            .find("NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz")
            .unwrap();
        let files = locate_sample_files(&platform, &sample, DEFAULT_CALLS_SUFFIX, &Scope::default())?;

        assert_eq!(files.calls.as_ref().unwrap().file.id, "f1");
        assert_eq!(files.index.as_ref().unwrap().file.id, "f2");

        let (calls, index) = download_urls(&platform, &files)?.unwrap();
        assert_eq!(calls, "https://example.org/NGS1_01_2_NAME_Pan7_S1_R1_001.vcf.gz");
        assert!(index.ends_with(".tbi"));

        Ok(())
    }

    #[test]
    fn test_download_urls_require_live_files() -> Result<(), Box<dyn std::error::Error>> {
        let calls = file("p1", "f1", "a.vcf.gz", "/output", ArchivalState::Archived);
        let index = file("p1", "f2", "a.vcf.gz.tbi", "/output", ArchivalState::Live);

        let platform = MockPlatform {
            files: vec![calls.clone(), index.clone()],
            ..Default::default()
        };

        let files = SampleFiles {
            calls: Some(calls),
            index: Some(index),
        };

        assert_eq!(download_urls(&platform, &files)?, None);
        assert_eq!(download_urls(&platform, &SampleFiles::default())?, None);

        Ok(())
    }
}
