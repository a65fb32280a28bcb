//! Resolving transcript-relative HGVS.c descriptions to genomic coordinates.
//!
//! The translation itself (reference genome, transcript models) lives behind
//! the [`Translator`] trait. A [`Resolver`] adds what the translator does not
//! know: confirmation spreadsheets name a gene rather than a transcript, so
//! the gene is mapped through its preferred transcripts from the
//! [`Vocabulary`], and the answer is only accepted when every preferred
//! transcript agrees on it.

use std::str::FromStr;

use crate::variant::Vocabulary;

/// The prefix of a RefSeq mRNA transcript accession.
pub const TRANSCRIPT_PREFIX: &str = "NM_";

/// The delimiter between the parts of a [`Locus`].
const LOCUS_DELIMITER: char = ':';

/// The number of parts in a [`Locus`].
const NUM_LOCUS_PARTS: usize = 4;

////////////////////////////////////////////////////////////////////////////////////////
// Loci
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to parsing a [`Locus`].
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of parts.
    IncorrectNumberOfParts(usize),

    /// An invalid position.
    InvalidPosition(std::num::ParseIntError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfParts(n) => write!(
                f,
                "invalid number of parts in locus: expected {NUM_LOCUS_PARTS} parts, found {n} \
                 parts"
            ),
            ParseError::InvalidPosition(err) => write!(f, "invalid position: {err}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A genomic variant (`chrom:position:reference:alternate`).
///
/// The position is 1-based.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Locus {
    /// The chromosome.
    chrom: String,

    /// The 1-based position.
    position: u64,

    /// The reference allele.
    reference: String,

    /// The alternate allele.
    alternate: String,
}

impl Locus {
    /// Creates a new locus.
    pub fn new(
        chrom: impl Into<String>,
        position: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            reference: reference.into(),
            alternate: alternate.into(),
        }
    }

    /// Gets the chromosome.
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// Gets the 1-based position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Gets the reference allele.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Gets the alternate allele.
    pub fn alternate(&self) -> &str {
        &self.alternate
    }
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{LOCUS_DELIMITER}{}{LOCUS_DELIMITER}{}{LOCUS_DELIMITER}{}",
            self.chrom, self.position, self.reference, self.alternate
        )
    }
}

impl FromStr for Locus {
    type Err = ParseError;

    /// Parses a locus.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::genomic::Locus;
    ///
    /// let locus = "17:43124096:A:G".parse::<Locus>()?;
    /// assert_eq!(locus.chrom(), "17");
    /// assert_eq!(locus.position(), 43124096);
    /// assert_eq!(locus.to_string(), "17:43124096:A:G");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(LOCUS_DELIMITER).collect::<Vec<_>>();

        if parts.len() != NUM_LOCUS_PARTS {
            return Err(ParseError::IncorrectNumberOfParts(parts.len()));
        }

        let position = parts[1]
            .parse::<u64>()
            .map_err(ParseError::InvalidPosition)?;

        Ok(Self::new(parts[0], position, parts[2], parts[3]))
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Translation
////////////////////////////////////////////////////////////////////////////////////////

/// Translates an HGVS.c description on a transcript to a genomic variant.
pub trait Translator {
    /// The error returned when a description cannot be translated.
    type Error: std::error::Error;

    /// Translates `hgvs_c` on `transcript`.
    fn translate(&self, transcript: &str, hgvs_c: &str) -> Result<Locus, Self::Error>;
}

/// An error related to resolving a description.
#[derive(Debug)]
pub enum Error {
    /// The gene has no preferred transcripts.
    NoPreferredTranscript(String),

    /// The preferred transcripts of the gene translate to different variants.
    AmbiguousTranscript(String),

    /// The translator failed (transcript, message).
    Translation(String, String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoPreferredTranscript(gene) => {
                write!(f, "no preferred transcript for gene: {gene}")
            }
            Error::AmbiguousTranscript(gene) => write!(
                f,
                "cannot unambiguously determine transcript from gene: {gene}"
            ),
            Error::Translation(transcript, message) => {
                write!(f, "translation error on {transcript}: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A resolved description.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    /// The genomic variant.
    locus: Locus,

    /// The transcript the variant was translated on.
    transcript: String,
}

impl Resolution {
    /// Gets the genomic variant.
    pub fn locus(&self) -> &Locus {
        &self.locus
    }

    /// Gets the transcript the variant was translated on.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// Resolves genes or transcripts along with an HGVS.c description to genomic
/// variants.
#[derive(Debug)]
pub struct Resolver<'a, T> {
    /// The translator.
    translator: T,

    /// The vocabulary holding the preferred transcripts.
    vocabulary: &'a Vocabulary,
}

impl<'a, T> Resolver<'a, T>
where
    T: Translator,
{
    /// Creates a new resolver.
    pub fn new(translator: T, vocabulary: &'a Vocabulary) -> Self {
        Self {
            translator,
            vocabulary,
        }
    }

    /// Resolves `hgvs_c` on `target`.
    ///
    /// A target starting with `NM_` is used as the transcript directly. Any
    /// other target is a gene: every preferred transcript of the gene is
    /// translated and the resolution is reported on the first one, provided
    /// they all agree.
    pub fn resolve(&self, target: &str, hgvs_c: &str) -> Result<Resolution, Error> {
        if target.starts_with(TRANSCRIPT_PREFIX) {
            let locus = self.translate(target, hgvs_c)?;
            return Ok(Resolution {
                locus,
                transcript: target.to_string(),
            });
        }

        let transcripts = self
            .vocabulary
            .transcripts(target)
            .ok_or_else(|| Error::NoPreferredTranscript(target.to_string()))?;

        let locus = self.translate(&transcripts.head, hgvs_c)?;

        for transcript in transcripts.tail.iter() {
            if self.translate(transcript, hgvs_c)? != locus {
                return Err(Error::AmbiguousTranscript(target.to_string()));
            }
        }

        Ok(Resolution {
            locus,
            transcript: transcripts.head.clone(),
        })
    }

    /// Translates with the inner translator.
    fn translate(&self, transcript: &str, hgvs_c: &str) -> Result<Locus, Error> {
        self.translator
            .translate(transcript, hgvs_c)
            .map_err(|err| Error::Translation(transcript.to_string(), err.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    /// An error from the [`TableTranslator`].
    #[derive(Debug)]
    pub(crate) struct UnknownDescription;

    impl std::fmt::Display for UnknownDescription {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "unknown description")
        }
    }

    impl std::error::Error for UnknownDescription {}

    /// A translator backed by a fixed table.
    #[derive(Debug, Default)]
    pub(crate) struct TableTranslator(pub(crate) HashMap<(String, String), Locus>);

    impl TableTranslator {
        pub(crate) fn with(mut self, transcript: &str, hgvs_c: &str, locus: &str) -> Self {
            self.0.insert(
                (transcript.to_string(), hgvs_c.to_string()),
                locus.parse().unwrap(),
            );
            self
        }
    }

    impl Translator for TableTranslator {
        type Error = UnknownDescription;

        fn translate(&self, transcript: &str, hgvs_c: &str) -> Result<Locus, Self::Error> {
            self.0
                .get(&(transcript.to_string(), hgvs_c.to_string()))
                .cloned()
                .ok_or(UnknownDescription)
        }
    }

    fn vocabulary() -> Vocabulary {
        let data = b"BRCA1 NM_007294.4\nSCN1A NM_001165963.4,NM_006920.6\nTTN\n";
        Vocabulary::from_reader(&data[..]).unwrap()
    }

    #[test]
    fn test_resolve_transcript() -> Result<(), Box<dyn std::error::Error>> {
        let vocabulary = vocabulary();
        let translator = TableTranslator::default().with("NM_000059.4", "c.1A>G", "13:1:A:G");
        let resolver = Resolver::new(translator, &vocabulary);

        let resolution = resolver.resolve("NM_000059.4", "c.1A>G")?;
        assert_eq!(resolution.transcript(), "NM_000059.4");
        assert_eq!(resolution.locus().to_string(), "13:1:A:G");

        Ok(())
    }

    #[test]
    fn test_resolve_gene() -> Result<(), Box<dyn std::error::Error>> {
        let vocabulary = vocabulary();
        let translator = TableTranslator::default()
            .with("NM_001165963.4", "c.5A>G", "2:100:T:C")
            .with("NM_006920.6", "c.5A>G", "2:100:T:C");
        let resolver = Resolver::new(translator, &vocabulary);

        let resolution = resolver.resolve("SCN1A", "c.5A>G")?;
        assert_eq!(resolution.transcript(), "NM_001165963.4");
        assert_eq!(resolution.locus().position(), 100);

        Ok(())
    }

    #[test]
    fn test_ambiguous_transcript() {
        let vocabulary = vocabulary();
        let translator = TableTranslator::default()
            .with("NM_001165963.4", "c.5A>G", "2:100:T:C")
            .with("NM_006920.6", "c.5A>G", "2:130:T:C");
        let resolver = Resolver::new(translator, &vocabulary);

        let err = resolver.resolve("SCN1A", "c.5A>G").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot unambiguously determine transcript from gene: SCN1A"
        );
    }

    #[test]
    fn test_no_preferred_transcript() {
        let vocabulary = vocabulary();
        let resolver = Resolver::new(TableTranslator::default(), &vocabulary);

        let err = resolver.resolve("TTN", "c.5A>G").unwrap_err();
        assert_eq!(err.to_string(), "no preferred transcript for gene: TTN");
    }

    #[test]
    fn test_translation_error() {
        let vocabulary = vocabulary();
        let resolver = Resolver::new(TableTranslator::default(), &vocabulary);

        let err = resolver.resolve("BRCA1", "c.5A>G").unwrap_err();
        assert_eq!(
            err.to_string(),
            "translation error on NM_007294.4: unknown description"
        );
    }

    #[test]
    fn test_invalid_locus() {
        let err = "17:x:A:G".parse::<Locus>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidPosition(_)));

        let err = "17:1:A".parse::<Locus>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of parts in locus: expected 4 parts, found 3 parts"
        );
    }
}
