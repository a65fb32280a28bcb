//! Reconciling requested calls against confirmed calls.
//!
//! A requested call is what the sequencing pipeline reported and asked to be
//! confirmed; a confirmed call is what Sanger sequencing found. Comparing the
//! canonical forms of the two gives an [`Outcome`], and a [`Tally`] of
//! outcomes gives the positive predictive value of the sequencing calls.
//!
//! ```
//! use varconfirm::reconcile::Outcome;
//! use varconfirm::reconcile::classify;
//! use varconfirm::variant::Variant;
//! use varconfirm::variant::Vocabulary;
//!
//! let vocabulary = Vocabulary::new(["BRCA1"]);
//! let requested = Variant::parse("BRCA1 c.123A>T het", &vocabulary);
//! let confirmed = Variant::parse("", &vocabulary);
//!
//! assert_eq!(classify(&requested, &confirmed), Outcome::FalsePositive);
//! ```

use crate::manifest::Entry;
use crate::variant::Variant;
use crate::variant::Vocabulary;

/// The outcome of reconciling a requested call against a confirmed call.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Outcome {
    /// Both calls are present and identical.
    TruePositive,

    /// The requested call was not confirmed.
    FalsePositive,

    /// A call was confirmed that was not requested.
    FalseNegative,

    /// Neither call is present.
    TrueNegative,

    /// Both calls are present but they differ.
    Discordant,
}

impl Outcome {
    /// All outcomes in display order.
    pub const ALL: [Outcome; 5] = [
        Outcome::TruePositive,
        Outcome::FalsePositive,
        Outcome::FalseNegative,
        Outcome::TrueNegative,
        Outcome::Discordant,
    ];
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::TruePositive => write!(f, "TP"),
            Outcome::FalsePositive => write!(f, "FP"),
            Outcome::FalseNegative => write!(f, "FN"),
            Outcome::TrueNegative => write!(f, "TN"),
            Outcome::Discordant => write!(f, "DISCORDANT"),
        }
    }
}

/// Classifies a requested call against a confirmed call.
///
/// Calls are compared by their canonical forms: a call without a canonical
/// form (missing gene, HGVS.c or zygosity) counts as absent.
pub fn classify(requested: &Variant, confirmed: &Variant) -> Outcome {
    match (requested.canonical(), confirmed.canonical()) {
        (None, None) => Outcome::TrueNegative,
        (Some(_), None) => Outcome::FalsePositive,
        (None, Some(_)) => Outcome::FalseNegative,
        (Some(a), Some(b)) if a == b => Outcome::TruePositive,
        (Some(_), Some(_)) => Outcome::Discordant,
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Reconciled entries
////////////////////////////////////////////////////////////////////////////////////////

/// A manifest entry along with its outcome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reconciled {
    /// The sample.
    sample: String,

    /// The gene of the requested call (or of the confirmed call if nothing
    /// was requested).
    gene: Option<String>,

    /// The HGVS.c description of the requested call.
    requested: Option<String>,

    /// The HGVS.c description of the confirmed call.
    confirmed: Option<String>,

    /// The outcome.
    outcome: Outcome,
}

impl Reconciled {
    /// Reconciles a manifest entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::manifest::Entry;
    /// use varconfirm::reconcile::Outcome;
    /// use varconfirm::reconcile::Reconciled;
    /// use varconfirm::variant::Vocabulary;
    ///
    /// let vocabulary = Vocabulary::new(["BRCA1"]);
    /// let entry = Entry {
    ///     sample: String::from("S1"),
    ///     request: String::from("BRCA1 c.1A>G het"),
    ///     result: String::from("brca1 c.1A>G HET"),
    ///     ..Default::default()
    /// };
    ///
    /// let reconciled = Reconciled::from_entry(&entry, &vocabulary);
    /// assert_eq!(reconciled.outcome(), Outcome::TruePositive);
    /// assert_eq!(reconciled.gene(), Some("BRCA1"));
    /// ```
    pub fn from_entry(entry: &Entry, vocabulary: &Vocabulary) -> Self {
        let requested = Variant::parse(&entry.request, vocabulary);
        let confirmed = Variant::parse(&entry.result, vocabulary);

        Self {
            sample: entry.sample.clone(),
            gene: requested
                .gene()
                .or_else(|| confirmed.gene())
                .map(String::from),
            requested: requested.hgvs_c().map(String::from),
            confirmed: confirmed.hgvs_c().map(String::from),
            outcome: classify(&requested, &confirmed),
        }
    }

    /// Gets the sample.
    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// Gets the gene.
    pub fn gene(&self) -> Option<&str> {
        self.gene.as_deref()
    }

    /// Gets the HGVS.c description of the requested call.
    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// Gets the HGVS.c description of the confirmed call.
    pub fn confirmed(&self) -> Option<&str> {
        self.confirmed.as_deref()
    }

    /// Gets the outcome.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Tallies
////////////////////////////////////////////////////////////////////////////////////////

/// Counts of outcomes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    /// True positives.
    true_positives: usize,

    /// False positives.
    false_positives: usize,

    /// False negatives.
    false_negatives: usize,

    /// True negatives.
    true_negatives: usize,

    /// Discordant calls.
    discordant: usize,
}

impl Tally {
    /// Counts an outcome.
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.true_positives += 1,
            Outcome::FalsePositive => self.false_positives += 1,
            Outcome::FalseNegative => self.false_negatives += 1,
            Outcome::TrueNegative => self.true_negatives += 1,
            Outcome::Discordant => self.discordant += 1,
        }
    }

    /// Gets the count of an outcome.
    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::TruePositive => self.true_positives,
            Outcome::FalsePositive => self.false_positives,
            Outcome::FalseNegative => self.false_negatives,
            Outcome::TrueNegative => self.true_negatives,
            Outcome::Discordant => self.discordant,
        }
    }

    /// Gets the total number of outcomes counted.
    pub fn total(&self) -> usize {
        Outcome::ALL.iter().map(|outcome| self.get(*outcome)).sum()
    }

    /// Gets the positive predictive value: the share of requested calls that
    /// were confirmed as is.
    ///
    /// Discordant calls count against it. Returns `None` when nothing was
    /// requested.
    ///
    /// # Examples
    ///
    /// ```
    /// use varconfirm::reconcile::Outcome;
    /// use varconfirm::reconcile::Tally;
    ///
    /// let tally = [
    ///     Outcome::TruePositive,
    ///     Outcome::TruePositive,
    ///     Outcome::TruePositive,
    ///     Outcome::Discordant,
    ///     Outcome::TrueNegative,
    /// ]
    /// .into_iter()
    /// .collect::<Tally>();
    ///
    /// assert_eq!(tally.positive_predictive_value(), Some(0.75));
    /// assert_eq!(Tally::default().positive_predictive_value(), None);
    /// ```
    pub fn positive_predictive_value(&self) -> Option<f64> {
        let positives = self.true_positives + self.false_positives + self.discordant;

        match positives {
            0 => None,
            n => Some(self.true_positives as f64 / n as f64),
        }
    }
}

impl FromIterator<Outcome> for Tally {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut tally = Self::default();

        for outcome in iter {
            tally.add(outcome);
        }

        tally
    }
}
