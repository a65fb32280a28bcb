//! The controlled vocabulary of gene symbols.
//!
//! A vocabulary file is whitespace-delimited: the first token on each line is
//! a gene symbol and the optional second token is a comma-delimited list of
//! preferred transcripts for that gene. Lines starting with `#` and blank lines
//! are ignored.
//!
//! ```text
//! BRCA1   NM_007294.4
//! KCNA1   NM_000217.3
//! SCN1A   NM_001165963.4,NM_006920.6
//! ```

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::{self};
use std::path::Path;

use flate2::read::GzDecoder;
use nonempty::NonEmpty;

use crate::manifest::reader::read_line;

/// The prefix of a comment line.
pub const COMMENT_PREFIX: char = '#';

/// The delimiter between preferred transcripts.
pub const TRANSCRIPT_DELIMITER: char = ',';

/// An error related to a [`Vocabulary`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A line held more than two fields.
    TooManyFields(usize, usize),

    /// A line held an empty transcript within its transcript list.
    EmptyTranscript(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::TooManyFields(line_no, n) => write!(
                f,
                "invalid number of fields at line {line_no}: expected 1 or 2 fields, found {n} \
                 fields"
            ),
            Error::EmptyTranscript(line_no) => {
                write!(f, "empty transcript in transcript list at line {line_no}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// How a gene is chosen when a cell mentions more than one known symbol.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GeneSelection {
    /// The first symbol in vocabulary order that appears in the cell.
    #[default]
    VocabularyOrder,

    /// The symbol appearing leftmost in the cell (longest symbol on ties).
    Leftmost,
}

/// An ordered set of gene symbols with their preferred transcripts.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    /// The gene symbols in the order they were supplied.
    genes: Vec<String>,

    /// The gene symbols, lowercased, in the same order as `genes`.
    lowercase: Vec<String>,

    /// The gene symbols for membership checks.
    known: HashSet<String>,

    /// The preferred transcripts for each gene (if any were supplied).
    transcripts: HashMap<String, NonEmpty<String>>,

    /// The gene selection policy.
    selection: GeneSelection,
}

impl Vocabulary {
    /// Creates a vocabulary from gene symbols in priority order.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::variant::Vocabulary;
    ///
    /// let vocabulary = Vocabulary::new(["BRCA1", "BRCA2"]);
    /// assert_eq!(vocabulary.len(), 2);
    /// assert!(vocabulary.contains("BRCA2"));
    /// ```
    pub fn new<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Self::default();

        for gene in genes {
            vocabulary.insert(gene.into());
        }

        vocabulary
    }

    /// Sets the gene selection policy.
    pub fn with_selection(mut self, selection: GeneSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Reads a vocabulary from a file.
    ///
    /// Files ending in `.gz` are decompressed on the fly.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(Error::Io)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::from_reader(BufReader::new(GzDecoder::new(file))),
            _ => Self::from_reader(BufReader::new(file)),
        }
    }

    /// Reads a vocabulary from a buffered reader.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::variant::Vocabulary;
    ///
    /// let data = b"# gene transcripts\nBRCA1 NM_007294.4\nTTN\n";
    /// let vocabulary = Vocabulary::from_reader(&data[..])?;
    ///
    /// assert_eq!(vocabulary.genes(), ["BRCA1", "TTN"]);
    /// assert_eq!(vocabulary.transcripts("BRCA1").unwrap().head, "NM_007294.4");
    /// assert!(vocabulary.transcripts("TTN").is_none());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_reader<T>(mut reader: T) -> Result<Self>
    where
        T: BufRead,
    {
        let mut vocabulary = Self::default();
        let mut buffer = String::new();
        let mut line_no = 0usize;

        while read_line(&mut reader, &mut buffer).map_err(Error::Io)? != 0 {
            line_no += 1;

            let line = buffer.trim();
            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }

            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() > 2 {
                return Err(Error::TooManyFields(line_no, fields.len()));
            }

            let gene = fields[0].to_string();
            vocabulary.insert(gene.clone());

            if let Some(list) = fields.get(1) {
                for transcript in list.split(TRANSCRIPT_DELIMITER) {
                    if transcript.is_empty() {
                        return Err(Error::EmptyTranscript(line_no));
                    }

                    match vocabulary.transcripts.get_mut(&gene) {
                        Some(transcripts) => transcripts.push(transcript.to_string()),
                        None => {
                            vocabulary
                                .transcripts
                                .insert(gene.clone(), NonEmpty::new(transcript.to_string()));
                        }
                    }
                }
            }
        }

        Ok(vocabulary)
    }

    /// Adds a gene to the end of the vocabulary (if it is not already known).
    fn insert(&mut self, gene: String) {
        if self.known.insert(gene.clone()) {
            self.lowercase.push(gene.to_ascii_lowercase());
            self.genes.push(gene);
        }
    }

    /// Gets the gene symbols in priority order.
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// Gets the number of gene symbols.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the vocabulary holds no gene symbols.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Whether `gene` is a known symbol (exact match).
    pub fn contains(&self, gene: &str) -> bool {
        self.known.contains(gene)
    }

    /// Gets the gene selection policy.
    pub fn selection(&self) -> GeneSelection {
        self.selection
    }

    /// Gets the preferred transcripts for a gene.
    pub fn transcripts(&self, gene: &str) -> Option<&NonEmpty<String>> {
        self.transcripts.get(gene)
    }

    /// Finds the gene mentioned in `text`.
    ///
    /// A symbol is mentioned when it occurs as a whole word, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::variant::GeneSelection;
    /// use varconfirm::variant::Vocabulary;
    ///
    /// let text = "BRCA2 c.1A>G het (see also BRCA1)";
    ///
    /// let vocabulary = Vocabulary::new(["BRCA1", "BRCA2"]);
    /// assert_eq!(vocabulary.find_gene(text), Some("BRCA1"));
    ///
    /// let vocabulary = vocabulary.with_selection(GeneSelection::Leftmost);
    /// assert_eq!(vocabulary.find_gene(text), Some("BRCA2"));
    /// ```
    pub fn find_gene(&self, text: &str) -> Option<&str> {
        let haystack = text.to_ascii_lowercase();

        match self.selection {
            GeneSelection::VocabularyOrder => self
                .lowercase
                .iter()
                .position(|needle| find_word(&haystack, needle).is_some())
                .map(|i| self.genes[i].as_str()),
            GeneSelection::Leftmost => self
                .lowercase
                .iter()
                .enumerate()
                .filter_map(|(i, needle)| find_word(&haystack, needle).map(|at| (at, i)))
                // Leftmost first, then the longest symbol, then vocabulary order.
                .min_by_key(|(at, i)| (*at, std::cmp::Reverse(self.genes[*i].len()), *i))
                .map(|(_, i)| self.genes[i].as_str()),
        }
    }
}

/// Whether a byte is part of a word (mirrors `\w` for ASCII).
fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Finds the first occurrence of `needle` in `haystack` bounded by non-word
/// characters (or the ends of the haystack).
///
/// This is `(?-u)\b{needle}\b` without a compiled regex per symbol, which
/// keeps [`Vocabulary::new`] infallible for vocabularies of thousands of genes.
/// Both arguments are expected to be lowercased already.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }

    let bytes = haystack.as_bytes();

    haystack.match_indices(needle).map(|(at, _)| at).find(|&at| {
        let end = at + needle.len();
        let before = at == 0 || !is_word_byte(bytes[at - 1]);
        let after = end == bytes.len() || !is_word_byte(bytes[end]);
        before && after
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_matching() {
        let vocabulary = Vocabulary::new(["BRCA1", "CF"]);

        assert_eq!(vocabulary.find_gene("brca1 c.1A>G"), Some("BRCA1"));
        assert_eq!(vocabulary.find_gene("BRCA12 c.1A>G"), None);
        assert_eq!(vocabulary.find_gene("xBRCA1 c.1A>G"), None);
        assert_eq!(vocabulary.find_gene("(BRCA1):c.1A>G"), Some("BRCA1"));
        assert_eq!(vocabulary.find_gene("CFTR"), None);
        assert_eq!(vocabulary.find_gene("CF;"), Some("CF"));
    }

    #[test]
    fn test_word_occurring_after_partial_hit() {
        assert_eq!(find_word("brca12 brca1", "brca1"), Some(7));
    }

    #[test]
    fn test_word_matches_ascii_word_boundaries(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let haystacks = [
            "brca1 c.1a>g het",
            "nm_007294.4(brca1):c.1a>g",
            "brca1_del brca1",
            "kcna1/brca1-as1",
            "pbrca1 brca11",
            "brca1",
            "",
        ];

        for needle in ["brca1", "kcna1", "as1", "del"] {
            let pattern = regex::Regex::new(&format!(r"(?-u)\b{}\b", regex::escape(needle)))?;

            for haystack in haystacks {
                assert_eq!(
                    find_word(haystack, needle),
                    pattern.find(haystack).map(|m| m.start()),
                    "{needle} in {haystack}"
                );
            }
        }

        Ok(())
    }

    #[test]
    fn test_leftmost_prefers_longest_symbol_on_ties() {
        let vocabulary = Vocabulary::new(["HLA", "HLA-A"]).with_selection(GeneSelection::Leftmost);
        assert_eq!(vocabulary.find_gene("HLA-A c.1A>G"), Some("HLA-A"));
    }

    #[test]
    fn test_reading_transcripts() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = b"SCN1A NM_001165963.4,NM_006920.6\n\nSCN1A NM_001202435.3\n";
        let vocabulary = Vocabulary::from_reader(&data[..])?;

        assert_eq!(vocabulary.genes(), ["SCN1A"]);

        let transcripts = vocabulary.transcripts("SCN1A").unwrap();
        assert_eq!(
            transcripts.iter().map(String::as_str).collect::<Vec<_>>(),
            ["NM_001165963.4", "NM_006920.6", "NM_001202435.3"]
        );

        Ok(())
    }

    #[test]
    fn test_too_many_fields() {
        let data = b"BRCA1\nBRCA2 NM_000059.4 extra\n";
        let err = Vocabulary::from_reader(&data[..]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of fields at line 2: expected 1 or 2 fields, found 3 fields"
        );
    }

    #[test]
    fn test_empty_transcript() {
        let data = b"BRCA1 NM_007294.4,\n";
        let err = Vocabulary::from_reader(&data[..]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "empty transcript in transcript list at line 1"
        );
    }
}
