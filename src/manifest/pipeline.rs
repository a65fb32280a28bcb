//! The stages that turn a list of spreadsheets into validated calls.
//!
//! A manifest starts out as a list of spreadsheet paths. The stages are run in
//! order, each reading every entry, replacing the entry list and committing
//! the manifest:
//!
//! 1. [`Stage::Filter`] drops spreadsheets that hold no calls.
//! 2. [`Stage::Extract`] replaces each spreadsheet with one entry per sample.
//! 3. [`Stage::Tidy`] splits cells holding several calls into one entry per
//!    call.
//! 4. [`Stage::Complete`] repairs cells with a missing or misspelled gene.
//! 5. [`Stage::Validate`] records the fields each call is missing.
//! 6. [`Stage::Genomic`] resolves the calls to genomic coordinates (this stage
//!    needs a [`Translator`] and is run with [`Pipeline::genomic()`]).
//!
//! Every stage can be run again on its own output without changing it, and no
//! stage ever fails because of a single entry: problems are logged, counted in
//! the [`Report`] and the entry is kept for a later rerun.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::extract::Extraction;
use crate::extract::Extractor;
use crate::genomic::Resolver;
use crate::genomic::Translator;
use crate::manifest;
use crate::manifest::Entry;
use crate::manifest::Manifest;
use crate::sheet::Source;
use crate::variant::Issue;
use crate::variant::Repairer;
use crate::variant::Variant;
use crate::variant::Vocabulary;
use crate::variant::looks_like_hgvs_c;

/// The separators between calls in a single cell, applied in order.
pub const CALL_SEPARATORS: &[&str] = &["&", " and ", ";", " + "];

/// The delimiter between comments.
pub const COMMENT_DELIMITER: &str = "|";

/// The name of the field holding the requested call.
const REQUEST: &str = "request";

/// The name of the field holding the confirmed call.
const RESULT: &str = "result";

////////////////////////////////////////////////////////////////////////////////////////
// Stages
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to parsing a [`Stage`].
#[derive(Debug)]
pub enum ParseError {
    /// An unknown stage.
    Unknown(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Unknown(stage) => write!(f, "unknown stage: {stage}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A pipeline stage.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// Drops spreadsheets that hold no calls.
    Filter,

    /// Replaces each spreadsheet with one entry per sample.
    Extract,

    /// Splits cells holding several calls.
    Tidy,

    /// Repairs cells with a missing or misspelled gene.
    Complete,

    /// Records the fields each call is missing.
    Validate,

    /// Resolves calls to genomic coordinates.
    Genomic,
}

impl Stage {
    /// The stages that need nothing but the manifest and a vocabulary, in
    /// order.
    pub const STANDARD: [Stage; 5] = [
        Stage::Filter,
        Stage::Extract,
        Stage::Tidy,
        Stage::Complete,
        Stage::Validate,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Filter => write!(f, "filter"),
            Stage::Extract => write!(f, "extract"),
            Stage::Tidy => write!(f, "tidy"),
            Stage::Complete => write!(f, "complete"),
            Stage::Validate => write!(f, "validate"),
            Stage::Genomic => write!(f, "genomic"),
        }
    }
}

impl FromStr for Stage {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "filter" => Ok(Stage::Filter),
            "extract" => Ok(Stage::Extract),
            "tidy" => Ok(Stage::Tidy),
            "complete" => Ok(Stage::Complete),
            "validate" => Ok(Stage::Validate),
            "genomic" => Ok(Stage::Genomic),
            _ => Err(ParseError::Unknown(s.to_string())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Reports
////////////////////////////////////////////////////////////////////////////////////////

/// What happened during a stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Report {
    /// The stage.
    stage: Stage,

    /// The number of entries before the stage.
    entries_in: usize,

    /// The number of entries after the stage.
    entries_out: usize,

    /// Files that could not be read along with the reason.
    unreadable: Vec<(String, String)>,

    /// The number of entries diverted to the removed list.
    removed: usize,

    /// The number of cells repaired.
    repaired: usize,

    /// Counts of `{field}-{tag}` issues.
    issues: BTreeMap<String, usize>,

    /// Calls that could not be resolved along with the reason.
    unresolved: Vec<(String, String)>,
}

impl Report {
    /// Creates an empty report for a stage.
    fn new(stage: Stage, entries_in: usize) -> Self {
        Self {
            stage,
            entries_in,
            entries_out: 0,
            unreadable: Vec::new(),
            removed: 0,
            repaired: 0,
            issues: BTreeMap::new(),
            unresolved: Vec::new(),
        }
    }

    /// Gets the stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Gets the number of entries before the stage.
    pub fn entries_in(&self) -> usize {
        self.entries_in
    }

    /// Gets the number of entries after the stage.
    pub fn entries_out(&self) -> usize {
        self.entries_out
    }

    /// Gets the files that could not be read along with the reason.
    pub fn unreadable(&self) -> &[(String, String)] {
        &self.unreadable
    }

    /// Gets the number of entries diverted to the removed list.
    pub fn removed(&self) -> usize {
        self.removed
    }

    /// Gets the number of cells repaired.
    pub fn repaired(&self) -> usize {
        self.repaired
    }

    /// Gets the counts of `{field}-{tag}` issues.
    pub fn issues(&self) -> &BTreeMap<String, usize> {
        &self.issues
    }

    /// Gets the calls that could not be resolved along with the reason.
    pub fn unresolved(&self) -> &[(String, String)] {
        &self.unresolved
    }

    /// Counts an issue.
    fn count(&mut self, field: &str, issue: Issue) {
        *self.issues.entry(format!("{field}-{issue}")).or_default() += 1;
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Pipeline
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to running a [`Pipeline`].
#[derive(Debug)]
pub enum Error {
    /// An error committing the manifest.
    Manifest(manifest::Error),

    /// An error writing the removed list.
    Removed(manifest::Error),

    /// The stage cannot be run with [`Pipeline::run()`].
    TranslatorRequired(Stage),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Manifest(err) => write!(f, "manifest error: {err}"),
            Error::Removed(err) => write!(f, "removed list error: {err}"),
            Error::TranslatorRequired(stage) => {
                write!(f, "the {stage} stage requires a coordinate translator")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// Runs stages over a [`Manifest`].
#[derive(Debug)]
pub struct Pipeline<'a, S> {
    /// Where spreadsheets are read from.
    source: S,

    /// The spreadsheet extractor.
    extractor: Extractor,

    /// The gene vocabulary.
    vocabulary: &'a Vocabulary,

    /// The gene repairer.
    repairer: Repairer,

    /// Where entries dropped by the filter stage are written (if anywhere).
    removed: Option<PathBuf>,
}

impl<'a, S> Pipeline<'a, S>
where
    S: Source,
{
    /// Creates a pipeline with the default extractor and repairer.
    pub fn new(source: S, vocabulary: &'a Vocabulary) -> Self {
        Self {
            source,
            extractor: Extractor::default(),
            vocabulary,
            repairer: Repairer::default(),
            removed: None,
        }
    }

    /// Sets the extractor.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Sets the repairer.
    pub fn with_repairer(mut self, repairer: Repairer) -> Self {
        self.repairer = repairer;
        self
    }

    /// Sets the manifest that entries dropped by the filter stage are
    /// appended to.
    ///
    /// Without it, the filter stage keeps every entry.
    pub fn with_removed(mut self, path: impl Into<PathBuf>) -> Self {
        self.removed = Some(path.into());
        self
    }

    /// Runs a stage and commits the manifest.
    pub fn run(&self, stage: Stage, manifest: &mut Manifest) -> Result<Report> {
        let entries = manifest.replace(Vec::new());
        let mut report = Report::new(stage, entries.len());

        let entries = match stage {
            Stage::Filter => {
                let (entries, removed) = self.filter(entries, &mut report);
                let report = finish(manifest, entries, report)?;
                removed?;
                return Ok(report);
            }
            Stage::Extract => self.extract(entries, &mut report),
            Stage::Tidy => tidy(entries),
            Stage::Complete => self.complete(entries, &mut report),
            Stage::Validate => self.validate(entries, &mut report),
            Stage::Genomic => {
                manifest.replace(entries);
                return Err(Error::TranslatorRequired(stage));
            }
        };

        finish(manifest, entries, report)
    }

    /// Runs the genomic stage and commits the manifest.
    ///
    /// Fields that already hold a coordinate are kept.
    pub fn genomic<T>(&self, manifest: &mut Manifest, resolver: &Resolver<'_, T>) -> Result<Report>
    where
        T: Translator,
    {
        let mut entries = manifest.replace(Vec::new());
        let mut report = Report::new(Stage::Genomic, entries.len());

        for entry in entries.iter_mut() {
            let fields = [
                (REQUEST, &entry.request, &mut entry.request_genomic),
                (RESULT, &entry.result, &mut entry.result_genomic),
            ];

            for (field, cell, genomic) in fields {
                if !genomic.is_empty() {
                    continue;
                }

                let variant = Variant::parse(cell, self.vocabulary);
                let (Some(gene), Some(hgvs_c)) = (variant.gene(), variant.hgvs_c()) else {
                    continue;
                };

                match resolver.resolve(gene, hgvs_c) {
                    Ok(resolution) => *genomic = resolution.locus().to_string(),
                    Err(err) => {
                        warn!(
                            file = %entry.file,
                            sample = %entry.sample,
                            field,
                            %err,
                            "could not resolve call"
                        );
                        report
                            .unresolved
                            .push((format!("{} {field}", entry.sample), err.to_string()));
                    }
                }
            }
        }

        finish(manifest, entries, report)
    }

    /// Reads and extracts the spreadsheet behind an entry.
    fn read(&self, entry: &Entry) -> std::result::Result<Option<Extraction>, String> {
        let path = Path::new(&entry.file);
        let sheet = self.source.read(path).map_err(|err| err.to_string())?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(self.extractor.extract(&sheet, &file_name))
    }

    /// Keeps the spreadsheets holding at least one sample.
    ///
    /// If the removed list cannot be written, the removed entries are kept
    /// and the error is returned alongside them.
    fn filter(&self, entries: Vec<Entry>, report: &mut Report) -> (Vec<Entry>, Result<()>) {
        let mut kept = Vec::new();
        let mut removed = Vec::new();

        for entry in entries {
            if entry.is_extracted() {
                kept.push(entry);
                continue;
            }

            match self.read(&entry) {
                Ok(Some(_)) => kept.push(entry),
                Ok(None) if self.removed.is_some() => {
                    debug!(file = %entry.file, "no calls found, removing");
                    removed.push(entry);
                }
                Ok(None) => kept.push(entry),
                Err(err) => {
                    warn!(file = %entry.file, %err, "could not read spreadsheet");
                    report.unreadable.push((entry.file.clone(), err));
                    kept.push(entry);
                }
            }
        }

        let path = match &self.removed {
            Some(path) if !removed.is_empty() => path,
            _ => return (kept, Ok(())),
        };

        let written = Manifest::open(path).and_then(|mut side| {
            side.extend(removed.iter().cloned());
            side.commit()
        });

        match written {
            Ok(()) => {
                report.removed = removed.len();
                (kept, Ok(()))
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "could not write the removed list");
                kept.extend(removed);
                (kept, Err(Error::Removed(err)))
            }
        }
    }

    /// Replaces each spreadsheet with one entry per sample.
    fn extract(&self, entries: Vec<Entry>, report: &mut Report) -> Vec<Entry> {
        let mut extracted = Vec::new();

        for entry in entries {
            if entry.is_extracted() {
                extracted.push(entry);
                continue;
            }

            match self.read(&entry) {
                Ok(Some(extraction)) => {
                    for (sample, calls) in extraction.into_samples() {
                        extracted.push(Entry {
                            sample,
                            request: calls.requested().to_string(),
                            result: calls.confirmed().to_string(),
                            ..entry.clone()
                        });
                    }
                }
                Ok(None) => extracted.push(entry),
                Err(err) => {
                    warn!(file = %entry.file, %err, "could not read spreadsheet");
                    report.unreadable.push((entry.file.clone(), err));
                    extracted.push(entry);
                }
            }
        }

        extracted
    }

    /// Repairs cells with a missing or misspelled gene.
    ///
    /// The request is repaired first (borrowing the gene of the result), then
    /// the result (borrowing the gene of the repaired request).
    fn complete(&self, entries: Vec<Entry>, report: &mut Report) -> Vec<Entry> {
        entries
            .into_iter()
            .map(|mut entry| {
                let result = Variant::parse(&entry.result, self.vocabulary);
                let request = self.repairer.repair(
                    &entry.request,
                    result.gene(),
                    &entry.file,
                    self.vocabulary,
                );

                let result = self.repairer.repair(
                    &entry.result,
                    request.variant().gene(),
                    &entry.file,
                    self.vocabulary,
                );

                for (field, repair) in [(REQUEST, &request), (RESULT, &result)] {
                    if let Some(strategy) = repair.strategy() {
                        info!(sample = %entry.sample, field, %strategy, "repaired gene");
                        report.repaired += 1;
                    }

                    for issue in repair.variant().issues() {
                        if matches!(
                            issue,
                            Issue::InvalidGene | Issue::NoClass | Issue::NoZygosity
                        ) {
                            debug!(sample = %entry.sample, field, %issue, cell = repair.text());
                            report.count(field, issue);
                        }
                    }
                }

                entry.request = request.into_parts().0;
                entry.result = result.into_parts().0;
                entry
            })
            .collect()
    }

    /// Records the fields each call is missing in the comments.
    fn validate(&self, entries: Vec<Entry>, report: &mut Report) -> Vec<Entry> {
        entries
            .into_iter()
            .map(|mut entry| {
                let mut comments = Vec::new();

                for (field, cell) in [(REQUEST, &entry.request), (RESULT, &entry.result)] {
                    for issue in Variant::parse(cell, self.vocabulary).issues() {
                        report.count(field, issue);
                        comments.push(format!("{field}-{issue}"));
                    }
                }

                entry.comments = comments.join(COMMENT_DELIMITER);
                entry
            })
            .collect()
    }
}

/// Splits cells holding several calls into one entry per call.
///
/// Requested and confirmed calls are paired by position; the shorter side is
/// padded with empty calls. Entries without any call are kept as they are.
fn tidy(entries: Vec<Entry>) -> Vec<Entry> {
    let mut tidied = Vec::new();

    for entry in entries {
        let requests = split_calls(&entry.request);
        let results = split_calls(&entry.result);

        if requests.is_empty() && results.is_empty() {
            tidied.push(entry);
            continue;
        }

        let n = requests.len().max(results.len());

        for i in 0..n {
            tidied.push(Entry {
                request: requests.get(i).cloned().unwrap_or_default(),
                result: results.get(i).cloned().unwrap_or_default(),
                ..entry.clone()
            });
        }
    }

    tidied
}

/// Splits a cell into the fragments that look like calls.
///
/// # Examples
///
/// ```
/// use varconfirm::manifest::pipeline::split_calls;
///
/// assert_eq!(
///     split_calls("BRCA1 c.1A>T het & BRCA1 c.2A>T het; see notes"),
///     ["BRCA1 c.1A>T het", "BRCA1 c.2A>T het"]
/// );
/// ```
pub fn split_calls(cell: &str) -> Vec<String> {
    let mut fragments = vec![cell.to_string()];

    for separator in CALL_SEPARATORS {
        fragments = fragments
            .iter()
            .flat_map(|fragment| fragment.split(separator))
            .map(String::from)
            .collect();
    }

    fragments
        .into_iter()
        .map(|fragment| fragment.trim().to_string())
        .filter(|fragment| looks_like_hgvs_c(fragment))
        .collect()
}

/// Puts the entries back, logs the report and commits the manifest.
fn finish(manifest: &mut Manifest, entries: Vec<Entry>, mut report: Report) -> Result<Report> {
    report.entries_out = entries.len();
    manifest.replace(entries);

    for (issue, count) in &report.issues {
        info!(stage = %report.stage, %issue, count);
    }

    info!(
        stage = %report.stage,
        entries_in = report.entries_in,
        entries_out = report.entries_out,
        unreadable = report.unreadable.len(),
        "stage complete"
    );

    manifest.commit().map_err(Error::Manifest)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempdir::TempDir;

    use crate::genomic::tests::TableTranslator;
    use crate::sheet::Sheet;
    use crate::sheet::{self};
    use super::*;

    /// A source holding sheets in memory.
    #[derive(Debug, Default)]
    struct MemorySource(HashMap<PathBuf, Sheet>);

    impl Source for MemorySource {
        fn read(&self, path: &Path) -> std::result::Result<Sheet, sheet::Error> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| sheet::Error::NotFound(path.to_path_buf()))
        }
    }

    fn vocabulary() -> Vocabulary {
        Vocabulary::new(["BRCA1", "BRCA2", "KCNA1"])
    }

    fn source() -> MemorySource {
        let mut sheets = HashMap::new();

        sheets.insert(
            PathBuf::from("batch.csv"),
            Sheet::from_raw([
                vec!["Label", "NGS1_01_111_AB_Pan4_S1", "NGS1_02_222_CD_Pan4_S2"],
                vec![
                    "SNV variant confirmation",
                    "BRCA1 c.1A>T het & BRCA1 c.2A>T het",
                    "BRCA2 c.9del hom",
                ],
                vec!["Final Result", "BRCA1 c.1A>T het", "BRCA2 c.9del hom"],
            ]),
        );

        sheets.insert(
            PathBuf::from("notes.csv"),
            Sheet::from_raw([vec!["Notes"], vec!["nothing to see"]]),
        );

        MemorySource(sheets)
    }

    fn entry(request: &str, result: &str) -> Entry {
        Entry {
            file: String::from("batch.csv"),
            sample: String::from("S1"),
            request: request.to_string(),
            result: result.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stage_names() -> std::result::Result<(), Box<dyn std::error::Error>> {
        for stage in Stage::STANDARD.into_iter().chain([Stage::Genomic]) {
            assert_eq!(stage.to_string().parse::<Stage>()?, stage);
        }

        let err = "lift".parse::<Stage>().unwrap_err();
        assert_eq!(err.to_string(), "unknown stage: lift");

        Ok(())
    }

    #[test]
    fn test_split_calls() {
        assert_eq!(
            split_calls("BRCA1 c.1A>T het and BRCA2 c.2del + KCNA1 c.3A>G"),
            ["BRCA1 c.1A>T het", "BRCA2 c.2del", "KCNA1 c.3A>G"]
        );
        assert!(split_calls("no variant detected").is_empty());
        assert!(split_calls("").is_empty());
    }

    #[test]
    fn test_tidy() {
        let tidied = tidy(vec![entry(
            "BRCA1 c.1A>T het & BRCA1 c.2A>T het",
            "BRCA1 c.1A>T het",
        )]);

        assert_eq!(tidied.len(), 2);
        assert_eq!(tidied[0].request, "BRCA1 c.1A>T het");
        assert_eq!(tidied[0].result, "BRCA1 c.1A>T het");
        assert_eq!(tidied[1].request, "BRCA1 c.2A>T het");
        assert_eq!(tidied[1].result, "");
        assert_eq!(tidied[1].sample, "S1");
    }

    #[test]
    fn test_tidy_keeps_entries_without_calls() {
        let file = Entry::from_file("batch.csv");
        assert_eq!(tidy(vec![file.clone()]), [file]);
    }

    #[test]
    fn test_full_run() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = vocabulary();
        let removed = dir.path().join("removed.tsv");
        let pipeline = Pipeline::new(source(), &vocabulary).with_removed(&removed);

        let mut manifest = Manifest::new(dir.path().join("manifest.tsv")).with_files([
            "batch.csv",
            "notes.csv",
            "missing.csv",
        ]);

        let report = pipeline.run(Stage::Filter, &mut manifest)?;
        assert_eq!(report.removed(), 1);
        assert_eq!(report.unreadable().len(), 1);
        assert_eq!(report.unreadable()[0].0, "missing.csv");
        assert_eq!(manifest.len(), 2);
        assert_eq!(Manifest::open(&removed)?.entries()[0].file, "notes.csv");

        let report = pipeline.run(Stage::Extract, &mut manifest)?;
        assert_eq!(report.entries_out(), 3);

        let report = pipeline.run(Stage::Tidy, &mut manifest)?;
        assert_eq!(report.entries_out(), 4);

        pipeline.run(Stage::Complete, &mut manifest)?;
        let report = pipeline.run(Stage::Validate, &mut manifest)?;
        assert_eq!(report.issues().get("request-no_class"), Some(&3));

        // Every stage committed the manifest.
        let reloaded = Manifest::open(manifest.path())?;
        assert_eq!(reloaded.entries(), manifest.entries());

        let samples = reloaded
            .entries()
            .iter()
            .map(|entry| entry.sample.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            samples,
            [
                "NGS1_01_111_AB_Pan4_S1",
                "NGS1_01_111_AB_Pan4_S1",
                "NGS1_02_222_CD_Pan4_S2",
                ""
            ]
        );

        Ok(())
    }

    #[test]
    fn test_validate_counts_issues_by_tag() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = vocabulary();
        let pipeline = Pipeline::new(source(), &vocabulary);

        let mut manifest = Manifest::new(dir.path().join("manifest.tsv"));
        manifest.extend([
            entry("BRCA1 c.1A>T het class 4", "BRCA1 c.1A>T het class 4"),
            entry("c.2del", ""),
            entry("BRCA2 c.9del", "BRCA2 c.9del hom Class 5"),
        ]);

        let report = pipeline.run(Stage::Validate, &mut manifest)?;

        let issues = report
            .issues()
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect::<Vec<_>>();

        assert_eq!(
            issues,
            [
                ("request-invalid_gene", 1),
                ("request-no_class", 2),
                ("request-no_zygosity", 2),
                ("result-no_data", 1),
            ]
        );

        let comments = manifest
            .entries()
            .iter()
            .map(|entry| entry.comments.as_str())
            .collect::<Vec<_>>();

        assert_eq!(
            comments,
            [
                "",
                "request-invalid_gene|request-no_class|request-no_zygosity|result-no_data",
                "request-no_class|request-no_zygosity",
            ]
        );

        Ok(())
    }

    #[test]
    fn test_filter_keeps_everything_without_removed_list(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = vocabulary();
        let pipeline = Pipeline::new(source(), &vocabulary);

        let mut manifest =
            Manifest::new(dir.path().join("manifest.tsv")).with_files(["batch.csv", "notes.csv"]);

        let report = pipeline.run(Stage::Filter, &mut manifest)?;
        assert_eq!(report.removed(), 0);
        assert_eq!(manifest.len(), 2);

        Ok(())
    }

    #[test]
    fn test_validate_is_idempotent() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = vocabulary();
        let pipeline = Pipeline::new(source(), &vocabulary);

        let mut manifest = Manifest::new(dir.path().join("manifest.tsv"));
        manifest.extend([
            entry("BRCA1 c.1A>T het Class 4", ""),
            entry("c.1A>T", "BRCA9 c.1A>T hom"),
        ]);

        pipeline.run(Stage::Validate, &mut manifest)?;
        let first = manifest.entries().to_vec();

        assert_eq!(first[0].comments, "result-no_data");
        assert_eq!(
            first[1].comments,
            "request-invalid_gene|request-no_class|request-no_zygosity|result-invalid_gene|\
             result-no_class"
        );

        pipeline.run(Stage::Validate, &mut manifest)?;
        assert_eq!(manifest.entries(), first);

        Ok(())
    }

    #[test]
    fn test_complete_repairs_genes() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = vocabulary();
        let pipeline = Pipeline::new(source(), &vocabulary);

        let mut manifest = Manifest::new(dir.path().join("manifest.tsv"));
        manifest.extend([
            entry("KCN1A c.76A>G het", "c.76A>G het"),
            entry("BRCA2 c.9del hom", "c.9del hom"),
        ]);

        let report = pipeline.run(Stage::Complete, &mut manifest)?;
        assert_eq!(report.repaired(), 3);

        let entries = manifest.entries();
        assert_eq!(entries[0].request, "KCNA1 c.76A>G het");
        assert_eq!(entries[0].result, "c.76A>G het KCNA1");
        assert_eq!(entries[1].result, "c.9del hom BRCA2");

        let report = pipeline.run(Stage::Validate, &mut manifest)?;
        assert!(report.issues().get("request-invalid_gene").is_none());
        assert!(report.issues().get("result-invalid_gene").is_none());

        Ok(())
    }

    #[test]
    fn test_genomic_requires_translator() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = vocabulary();
        let pipeline = Pipeline::new(source(), &vocabulary);

        let mut manifest = Manifest::new(dir.path().join("manifest.tsv"));
        manifest.extend([entry("BRCA1 c.1A>T het", "")]);

        let err = pipeline.run(Stage::Genomic, &mut manifest).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the genomic stage requires a coordinate translator"
        );
        assert_eq!(manifest.len(), 1);

        Ok(())
    }

    #[test]
    fn test_genomic() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("varconfirm")?;
        let vocabulary = Vocabulary::from_reader(&b"BRCA1 NM_007294.4\nBRCA2\n"[..])?;
        let pipeline = Pipeline::new(source(), &vocabulary);

        let translator =
            TableTranslator::default().with("NM_007294.4", "c.1A>T", "17:43124096:T:A");
        let resolver = Resolver::new(translator, &vocabulary);

        let mut manifest = Manifest::new(dir.path().join("manifest.tsv"));
        manifest.extend([
            entry("BRCA1 c.1A>T het", "BRCA2 c.9del hom"),
            Entry {
                result_genomic: String::from("1:1:A:C"),
                ..entry("", "BRCA1 c.1A>T het")
            },
        ]);

        let report = pipeline.genomic(&mut manifest, &resolver)?;

        let entries = manifest.entries();
        assert_eq!(entries[0].request_genomic, "17:43124096:T:A");
        assert_eq!(entries[0].result_genomic, "");
        assert_eq!(entries[1].result_genomic, "1:1:A:C");
        assert_eq!(report.unresolved().len(), 1);
        assert_eq!(
            report.unresolved()[0].1,
            "no preferred transcript for gene: BRCA2"
        );

        Ok(())
    }
}
