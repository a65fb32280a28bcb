//! Clinical variant calls parsed from free-text spreadsheet cells.
//!
//! Confirmation requests and results are written by hand, so a cell such as
//! `"BRCA1 c.68_69del het Class 5"` is the closest thing to a structured
//! record we get. A [`Variant`] pulls the gene, the HGVS.c description, the
//! zygosity and the classification out of such a cell and reports each field it
//! could not find as an [`Issue`].
//!
//! ```
//! use varconfirm::variant::Issue;
//! use varconfirm::variant::Variant;
//! use varconfirm::variant::Vocabulary;
//!
//! let vocabulary = Vocabulary::new(["BRCA1", "BRCA2"]);
//!
//! let variant = Variant::parse("BRCA1 c.68_69del het Class 5", &vocabulary);
//! assert_eq!(variant.gene(), Some("BRCA1"));
//! assert_eq!(variant.hgvs_c(), Some("c.68_69del"));
//! assert!(variant.issues().is_empty());
//! assert_eq!(variant.to_string(), "BRCA1 c.68_69del het");
//!
//! let variant = Variant::parse("c.68_69del", &vocabulary);
//! assert_eq!(
//!     variant.issues(),
//!     [Issue::InvalidGene, Issue::NoClass, Issue::NoZygosity]
//! );
//! assert_eq!(variant.to_string(), "X");
//! ```

pub mod repair;
pub mod vocabulary;

use std::sync::LazyLock;

use regex::Regex;

pub use repair::Repairer;
pub use vocabulary::GeneSelection;
pub use vocabulary::Vocabulary;

/// The rendering of a variant that lacks a gene, HGVS.c or zygosity.
pub const INCOMPLETE: &str = "X";

/// Matches an HGVS.c description.
static HGVS_C: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"c\.\d+\S+").unwrap());

/// Matches anything that looks like the start of an HGVS.c description.
static HGVS_C_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"c\.\d").unwrap());

/// Matches a zygosity token.
static ZYGOSITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)het|hom|hemi").unwrap());

/// Matches a classification (`Class 4`, `class4`, `c 4`).
static CLASSIFICATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:class|c)\s?([1-5])\b").unwrap());

/// Whether `text` holds something that looks like an HGVS.c description.
///
/// # Examples
///
/// ```
/// use varconfirm::variant::looks_like_hgvs_c;
///
/// assert!(looks_like_hgvs_c("BRCA1 c.68_69del"));
/// assert!(!looks_like_hgvs_c("no variant detected"));
/// ```
pub fn looks_like_hgvs_c(text: &str) -> bool {
    HGVS_C_LIKE.is_match(text)
}

////////////////////////////////////////////////////////////////////////////////////////
// Issues
////////////////////////////////////////////////////////////////////////////////////////

/// A field that could not be found in a cell.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Issue {
    /// The cell is empty.
    NoData,

    /// No HGVS.c description was found.
    NoHgvsc,

    /// No gene from the vocabulary was found.
    InvalidGene,

    /// No classification was found.
    NoClass,

    /// No zygosity was found.
    NoZygosity,
}

impl Issue {
    /// Gets the tag for the issue.
    pub fn tag(&self) -> &'static str {
        match self {
            Issue::NoData => "no_data",
            Issue::NoHgvsc => "no_hgvsc",
            Issue::InvalidGene => "invalid_gene",
            Issue::NoClass => "no_class",
            Issue::NoZygosity => "no_zygosity",
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Zygosity and classification
////////////////////////////////////////////////////////////////////////////////////////

/// The zygosity of a variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Zygosity {
    /// Heterozygous. Hemizygous calls are reported as heterozygous too.
    Heterozygous,

    /// Homozygous.
    Homozygous,
}

impl std::fmt::Display for Zygosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zygosity::Heterozygous => write!(f, "heterozygous"),
            Zygosity::Homozygous => write!(f, "homozygous"),
        }
    }
}

/// A variant classification between 1 (benign) and 5 (pathogenic).
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Classification(u8);

impl Classification {
    /// Creates a classification if `value` is between 1 and 5.
    pub fn try_new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    /// Gets the inner value.
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Class {}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Variants
////////////////////////////////////////////////////////////////////////////////////////

/// A variant call parsed from a single cell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variant {
    /// The original text of the cell.
    cell: String,

    /// The gene symbol (as spelled in the vocabulary).
    gene: Option<String>,

    /// The HGVS.c description.
    hgvs_c: Option<String>,

    /// The zygosity along with the (lowercased) token it was read from.
    zygosity: Option<(Zygosity, String)>,

    /// The classification.
    classification: Option<Classification>,
}

impl Variant {
    /// Parses a cell.
    pub fn parse(cell: &str, vocabulary: &Vocabulary) -> Self {
        let hgvs_c = HGVS_C.find(cell).map(|m| m.as_str().to_string());

        let zygosity = ZYGOSITY.find(cell).map(|m| {
            let token = m.as_str().to_ascii_lowercase();
            let zygosity = match token.as_str() {
                "hom" => Zygosity::Homozygous,
                _ => Zygosity::Heterozygous,
            };
            (zygosity, token)
        });

        let classification = CLASSIFICATION
            .captures(cell)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .and_then(Classification::try_new);

        let gene = vocabulary.find_gene(cell).map(String::from);

        Self {
            cell: cell.to_string(),
            gene,
            hgvs_c,
            zygosity,
            classification,
        }
    }

    /// Gets the original text of the cell.
    pub fn cell(&self) -> &str {
        &self.cell
    }

    /// Gets the gene symbol.
    pub fn gene(&self) -> Option<&str> {
        self.gene.as_deref()
    }

    /// Gets the HGVS.c description.
    pub fn hgvs_c(&self) -> Option<&str> {
        self.hgvs_c.as_deref()
    }

    /// Gets the zygosity.
    pub fn zygosity(&self) -> Option<Zygosity> {
        self.zygosity.as_ref().map(|(zygosity, _)| *zygosity)
    }

    /// Gets the classification.
    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// Whether the cell is empty.
    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }

    /// Gets the fields missing from the cell.
    ///
    /// An empty cell only ever reports [`Issue::NoData`].
    pub fn issues(&self) -> Vec<Issue> {
        if self.is_empty() {
            return vec![Issue::NoData];
        }

        let mut issues = Vec::new();

        if self.hgvs_c.is_none() {
            issues.push(Issue::NoHgvsc);
        }

        if self.gene.is_none() {
            issues.push(Issue::InvalidGene);
        }

        if self.classification.is_none() {
            issues.push(Issue::NoClass);
        }

        if self.zygosity.is_none() {
            issues.push(Issue::NoZygosity);
        }

        issues
    }

    /// Gets the canonical form (`{gene} {hgvs_c} {zygosity}`).
    ///
    /// Only defined when the gene, HGVS.c description and zygosity are all
    /// present. The zygosity is written as the token found in the cell.
    pub fn canonical(&self) -> Option<String> {
        match (&self.gene, &self.hgvs_c, &self.zygosity) {
            (Some(gene), Some(hgvs_c), Some((_, token))) => {
                Some(format!("{gene} {hgvs_c} {token}"))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.canonical() {
            Some(canonical) => write!(f, "{canonical}"),
            None => write!(f, "{INCOMPLETE}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vocabulary {
        Vocabulary::new(["BRCA1", "BRCA2", "KCNA1"])
    }

    #[test]
    fn test_no_data_iff_empty() {
        let vocabulary = vocabulary();

        let variant = Variant::parse("", &vocabulary);
        assert_eq!(variant.issues(), [Issue::NoData]);

        for cell in [" ", "nothing", "BRCA1 c.1A>G hom class 2", "-"] {
            let variant = Variant::parse(cell, &vocabulary);
            assert!(!variant.issues().contains(&Issue::NoData), "{cell:?}");
        }
    }

    #[test]
    fn test_all_issues() {
        let variant = Variant::parse("see report", &vocabulary());
        assert_eq!(
            variant.issues(),
            [
                Issue::NoHgvsc,
                Issue::InvalidGene,
                Issue::NoClass,
                Issue::NoZygosity
            ]
        );
    }

    #[test]
    fn test_hgvs_c() {
        let vocabulary = vocabulary();

        let variant = Variant::parse("BRCA2 c.7007G>A p.(Arg2336His)", &vocabulary);
        assert_eq!(variant.hgvs_c(), Some("c.7007G>A"));

        // The description must carry something after the position.
        let variant = Variant::parse("BRCA2 c.7 het", &vocabulary);
        assert_eq!(variant.hgvs_c(), None);

        let variant = Variant::parse("BRCA2 c.-7G>A het", &vocabulary);
        assert_eq!(variant.hgvs_c(), None);
    }

    #[test]
    fn test_zygosity() {
        let vocabulary = vocabulary();

        let variant = Variant::parse("BRCA1 c.1A>G HOM", &vocabulary);
        assert_eq!(variant.zygosity(), Some(Zygosity::Homozygous));
        assert_eq!(variant.to_string(), "BRCA1 c.1A>G hom");

        let variant = Variant::parse("BRCA1 c.1A>G Heterozygous", &vocabulary);
        assert_eq!(variant.zygosity(), Some(Zygosity::Heterozygous));
        assert_eq!(variant.to_string(), "BRCA1 c.1A>G het");

        let variant = Variant::parse("KCNA1 c.1A>G hemi", &vocabulary);
        assert_eq!(variant.zygosity(), Some(Zygosity::Heterozygous));
        assert_eq!(variant.to_string(), "KCNA1 c.1A>G hemi");
    }

    #[test]
    fn test_classification() {
        let vocabulary = vocabulary();

        let classes = [
            ("BRCA1 c.1A>G het Class 4", Some(4)),
            ("BRCA1 c.1A>G het class5", Some(5)),
            ("BRCA1 c.1A>G het (C 3)", Some(3)),
            ("BRCA1 c.1A>G het class 6", None),
            ("BRCA1 c.1A>G het class 45", None),
            ("BRCA1 c.1A>G het subclass 4", None),
        ];

        for (cell, expected) in classes {
            let variant = Variant::parse(cell, &vocabulary);
            assert_eq!(
                variant.classification().map(|c| c.get()),
                expected,
                "{cell:?}"
            );
        }
    }

    #[test]
    fn test_canonical_requires_gene_hgvs_and_zygosity() {
        let vocabulary = vocabulary();

        assert_eq!(Variant::parse("BRCA1 c.1A>G", &vocabulary).canonical(), None);
        assert_eq!(Variant::parse("c.1A>G het", &vocabulary).canonical(), None);
        assert_eq!(Variant::parse("BRCA1 het", &vocabulary).canonical(), None);
        assert_eq!(
            Variant::parse("het BRCA1 c.1A>G", &vocabulary).canonical(),
            Some(String::from("BRCA1 c.1A>G het"))
        );
    }

    #[test]
    fn test_issue_display() {
        assert_eq!(Issue::NoData.to_string(), "no_data");
        assert_eq!(Issue::InvalidGene.to_string(), "invalid_gene");
    }
}
