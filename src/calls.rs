//! Looking up a genomic variant in a sample's variant calls.
//!
//! Variant call files are read through the [`CallReader`] trait: a reader
//! fetches every record overlapping a [`Window`] from a (remote, indexed) call
//! file. [`locate()`] builds the window around a [`Locus`] and picks out the
//! record describing exactly that variant.

use std::collections::BTreeMap;

use crate::genomic::Locus;

/// The number of bases added on either side of a variant when fetching
/// records.
pub const PADDING: u64 = 10;

/// The delimiter between alternate alleles.
const ALTERNATE_DELIMITER: &str = ",";

/// A 0-based, half-open region of a chromosome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Window {
    /// The chromosome.
    chrom: String,

    /// The 0-based start.
    start: u64,

    /// The exclusive end.
    end: u64,
}

impl Window {
    /// Creates the window around a locus, padded by [`PADDING`] bases on each
    /// side.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::calls::Window;
    /// use varconfirm::genomic::Locus;
    ///
    /// let window = Window::around(&Locus::new("17", 100, "AT", "A"));
    /// assert_eq!(window.chrom(), "17");
    /// assert_eq!(window.start(), 89);
    /// assert_eq!(window.end(), 101);
    /// ```
    pub fn around(locus: &Locus) -> Self {
        let start = locus.position().saturating_sub(1 + PADDING);
        let end = start + locus.reference().len() as u64 + PADDING;

        Self {
            chrom: locus.chrom().to_string(),
            start,
            end,
        }
    }

    /// Gets the chromosome.
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// Gets the 0-based start.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Gets the exclusive end.
    pub fn end(&self) -> u64 {
        self.end
    }
}

/// A single variant call record for the first sample of a call file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallRecord {
    /// The chromosome.
    pub chrom: String,

    /// The 1-based position.
    pub position: u64,

    /// The reference allele.
    pub reference: String,

    /// The alternate alleles.
    pub alternates: Vec<String>,

    /// The quality.
    pub quality: Option<f64>,

    /// The genotype (e.g. `0/1`).
    pub genotype: Option<String>,

    /// The genotype quality.
    pub genotype_quality: Option<u32>,

    /// The read depth.
    pub depth: Option<u32>,

    /// The allelic depths (reference first).
    pub allelic_depths: Vec<u32>,

    /// The remaining annotations.
    pub info: BTreeMap<String, String>,
}

impl CallRecord {
    /// Whether the record describes exactly `locus`.
    ///
    /// Multiallelic records are compared with their alternates joined by `,`.
    pub fn matches(&self, locus: &Locus) -> bool {
        self.chrom == locus.chrom()
            && self.position == locus.position()
            && self.reference == locus.reference()
            && self.alternates.join(ALTERNATE_DELIMITER) == locus.alternate()
    }

    /// Gets the fraction of reads supporting the first alternate allele.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::calls::CallRecord;
    ///
    /// let record = CallRecord {
    ///     allelic_depths: vec![30, 10],
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(record.allele_fraction(), Some(0.25));
    /// assert_eq!(CallRecord::default().allele_fraction(), None);
    /// ```
    pub fn allele_fraction(&self) -> Option<f64> {
        let alternate = *self.allelic_depths.get(1)?;
        let total = self.allelic_depths.iter().map(|&n| u64::from(n)).sum::<u64>();

        match total {
            0 => None,
            total => Some(f64::from(alternate) / total as f64),
        }
    }
}

/// Reads records from an indexed variant call file.
pub trait CallReader {
    /// The error returned when a file cannot be read.
    type Error: std::error::Error;

    /// Fetches the records overlapping `window` from the call file at `url`
    /// using the index at `index_url`.
    fn fetch(
        &self,
        url: &str,
        index_url: &str,
        window: &Window,
    ) -> Result<Vec<CallRecord>, Self::Error>;
}

/// Finds the record describing exactly `locus`.
///
/// Returns `Ok(None)` when the variant was not called.
pub fn locate<R>(
    reader: &R,
    url: &str,
    index_url: &str,
    locus: &Locus,
) -> Result<Option<CallRecord>, R::Error>
where
    R: CallReader,
{
    let window = Window::around(locus);
    let records = reader.fetch(url, index_url, &window)?;
    Ok(records.into_iter().find(|record| record.matches(locus)))
}
