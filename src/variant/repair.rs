//! Repairing cells whose gene symbol is missing or misspelled.
//!
//! When a cell reports [`Issue::InvalidGene`], a [`Repairer`] rewrites the
//! text of the cell and parses it again. The strategies are tried in order and
//! the first one that yields a known gene wins:
//!
//! 1. [`Strategy::FileName`]: the file the cell came from names a disease with
//!    a single causative gene, so that gene is prepended to the cell.
//! 2. [`Strategy::Correction`]: the cell holds a known typo or a deprecated
//!    symbol, which is replaced textually.
//! 3. [`Strategy::Sibling`]: the other field of the same entry (the request
//!    for a result, the result for a request) names a gene, so that gene is
//!    appended to the cell.
//!
//! ```
//! use varconfirm::variant::Repairer;
//! use varconfirm::variant::Vocabulary;
//! use varconfirm::variant::repair::Strategy;
//!
//! let vocabulary = Vocabulary::new(["KCNA1"]);
//! let repairer = Repairer::default();
//!
//! let repair = repairer.repair("KCN1A c.76A>G het", None, "sheet.csv", &vocabulary);
//! assert_eq!(repair.strategy(), Some(Strategy::Correction));
//! assert_eq!(repair.variant().gene(), Some("KCNA1"));
//! assert_eq!(repair.text(), "KCNA1 c.76A>G het");
//! ```

use crate::variant::Issue;
use crate::variant::Variant;
use crate::variant::Vocabulary;

/// Diseases named in file paths along with their single causative gene.
///
/// Matching is by case-insensitive substring on the file path.
pub const DISEASE_GENES: &[(&str, &str)] = &[
    ("cystic fibrosis", "CFTR"),
    ("episodic ataxia", "KCNA1"),
    ("haemochromatosis", "HFE"),
    ("hemochromatosis", "HFE"),
    ("marfan", "FBN1"),
    ("neurofibromatosis", "NF1"),
    ("retinoblastoma", "RB1"),
    ("von hippel", "VHL"),
];

/// Known misspellings and deprecated symbols along with their replacement.
///
/// Corrections are applied as case-sensitive substring replacements in the
/// order given.
pub const CORRECTIONS: &[(&str, &str)] = &[
    ("KCN1A", "KCNA1"),
    ("MLL2", "KMT2D"),
    ("C10orf2", "TWNK"),
    ("C10ORF2", "TWNK"),
    ("CXorf5", "OFD1"),
    ("PARK2", "PRKN"),
    ("SEPT9", "SEPTIN9"),
];

/// The strategy that repaired a cell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// The gene was inferred from the disease named in the file path.
    FileName,

    /// A misspelled or deprecated symbol was corrected.
    Correction,

    /// The gene was borrowed from the sibling field.
    Sibling,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::FileName => write!(f, "file name"),
            Strategy::Correction => write!(f, "correction"),
            Strategy::Sibling => write!(f, "sibling"),
        }
    }
}

/// The result of a repair attempt.
#[derive(Clone, Debug)]
pub struct Repair {
    /// The (possibly rewritten) text of the cell.
    text: String,

    /// The variant parsed from `text`.
    variant: Variant,

    /// The strategy that resolved the gene, if any did.
    strategy: Option<Strategy>,
}

impl Repair {
    /// Gets the text of the cell after the repair.
    ///
    /// This is the original text if no strategy resolved the gene.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Gets the variant parsed from [`Repair::text()`].
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Gets the strategy that resolved the gene.
    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    /// Whether the cell was rewritten.
    pub fn is_repaired(&self) -> bool {
        self.strategy.is_some()
    }

    /// Consumes `self` and returns the text and variant.
    pub fn into_parts(self) -> (String, Variant) {
        (self.text, self.variant)
    }
}

/// Repairs cells with a missing or misspelled gene.
#[derive(Clone, Debug)]
pub struct Repairer {
    /// Disease names and their causative gene.
    diseases: Vec<(String, String)>,

    /// Textual corrections.
    corrections: Vec<(String, String)>,
}

impl Repairer {
    /// Creates a repairer from a disease table and a corrections table.
    pub fn new(diseases: Vec<(String, String)>, corrections: Vec<(String, String)>) -> Self {
        let diseases = diseases
            .into_iter()
            .map(|(disease, gene)| (disease.to_lowercase(), gene))
            .collect();

        Self {
            diseases,
            corrections,
        }
    }

    /// Attempts to repair `cell`.
    ///
    /// `sibling` is the gene found in the other field of the same entry and
    /// `path` is the file the cell was read from. Empty cells and cells that
    /// already hold a known gene are returned as they are.
    pub fn repair(
        &self,
        cell: &str,
        sibling: Option<&str>,
        path: &str,
        vocabulary: &Vocabulary,
    ) -> Repair {
        let original = Variant::parse(cell, vocabulary);

        if original.is_empty() || !original.issues().contains(&Issue::InvalidGene) {
            return unrepaired(cell, original);
        }

        let path = path.to_lowercase();
        let candidates = [
            (
                Strategy::FileName,
                self.diseases
                    .iter()
                    .find(|(disease, _)| path.contains(disease.as_str()))
                    .map(|(_, gene)| format!("{gene} {cell}")),
            ),
            (Strategy::Correction, self.correct(cell)),
            (
                Strategy::Sibling,
                sibling
                    .filter(|gene| !gene.is_empty())
                    .map(|gene| format!("{cell} {gene}")),
            ),
        ];

        for (strategy, text) in candidates {
            let Some(text) = text else {
                continue;
            };

            let variant = Variant::parse(&text, vocabulary);
            if variant.gene().is_some() {
                return Repair {
                    text,
                    variant,
                    strategy: Some(strategy),
                };
            }
        }

        unrepaired(cell, original)
    }

    /// Applies the corrections table, returning `None` when nothing changed.
    fn correct(&self, cell: &str) -> Option<String> {
        let corrected = self
            .corrections
            .iter()
            .fold(cell.to_string(), |text, (from, to)| {
                text.replace(from.as_str(), to.as_str())
            });

        (corrected != cell).then_some(corrected)
    }
}

impl Default for Repairer {
    fn default() -> Self {
        let owned = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<Vec<_>>()
        };

        Self::new(owned(DISEASE_GENES), owned(CORRECTIONS))
    }
}

/// Wraps a cell that was not rewritten.
fn unrepaired(cell: &str, variant: Variant) -> Repair {
    Repair {
        text: cell.to_string(),
        variant,
        strategy: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vocabulary {
        Vocabulary::new(["BRCA1", "CFTR", "KCNA1", "KMT2D"])
    }

    #[test]
    fn test_known_gene_is_left_alone() {
        let repair = Repairer::default().repair(
            "BRCA1 c.1A>G het",
            Some("KCNA1"),
            "cystic fibrosis.csv",
            &vocabulary(),
        );

        assert!(!repair.is_repaired());
        assert_eq!(repair.text(), "BRCA1 c.1A>G het");
    }

    #[test]
    fn test_empty_cell_is_left_alone() {
        let repair = Repairer::default().repair("", Some("BRCA1"), "x.csv", &vocabulary());
        assert!(!repair.is_repaired());
        assert_eq!(repair.text(), "");
    }

    #[test]
    fn test_file_name_strategy() {
        let repair = Repairer::default().repair(
            "c.1521_1523del hom",
            None,
            "/data/Cystic Fibrosis/2023/NGS1.csv",
            &vocabulary(),
        );

        assert_eq!(repair.strategy(), Some(Strategy::FileName));
        assert_eq!(repair.text(), "CFTR c.1521_1523del hom");
        assert_eq!(repair.variant().gene(), Some("CFTR"));
    }

    #[test]
    fn test_correction_strategy() {
        let repair =
            Repairer::default().repair("MLL2 c.5A>T het", Some("BRCA1"), "x.csv", &vocabulary());

        assert_eq!(repair.strategy(), Some(Strategy::Correction));
        assert_eq!(repair.text(), "KMT2D c.5A>T het");
    }

    #[test]
    fn test_sibling_strategy() {
        let repair = Repairer::default().repair("c.5A>T het", Some("BRCA1"), "x.csv", &vocabulary());

        assert_eq!(repair.strategy(), Some(Strategy::Sibling));
        assert_eq!(repair.text(), "c.5A>T het BRCA1");
    }

    #[test]
    fn test_strategies_in_order() {
        // The file name wins over the sibling field.
        let repair = Repairer::default().repair(
            "c.5A>T het",
            Some("BRCA1"),
            "episodic ataxia.csv",
            &vocabulary(),
        );

        assert_eq!(repair.strategy(), Some(Strategy::FileName));
        assert_eq!(repair.variant().gene(), Some("KCNA1"));
    }

    #[test]
    fn test_unknown_inferred_gene_falls_through() {
        // HFE is not part of the vocabulary, so the sibling is used instead.
        let repair = Repairer::default().repair(
            "c.845G>A hom",
            Some("BRCA1"),
            "haemochromatosis.csv",
            &vocabulary(),
        );

        assert_eq!(repair.strategy(), Some(Strategy::Sibling));
    }

    #[test]
    fn test_unresolved() {
        let repair = Repairer::default().repair("c.5A>T het", None, "x.csv", &vocabulary());

        assert!(!repair.is_repaired());
        assert_eq!(repair.text(), "c.5A>T het");
        assert!(repair.variant().issues().contains(&Issue::InvalidGene));
    }
}
