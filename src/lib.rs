//! `varconfirm` is a crate for reconciling Sanger confirmation spreadsheets
//! against the variant calls of a sequencing pipeline.
//!
//! Variants called by the sequencing pipeline are sent for orthogonal
//! confirmation by Sanger sequencing. The requests and their results come back
//! as free-text cells in spreadsheets of varying layouts, one column per
//! sample. This crate provides the facilities to turn those spreadsheets into a
//! tidy manifest of calls and to score the pipeline against them.
//!
//! The crate provides the following main points of entry:
//!
//! - Deriving a canonical [sample identifier](crate::sample::SampleId) from a
//!   file name or a column header with a [`sample::Matcher`].
//! - Parsing a single free-text cell into a [`variant::Variant`] (gene,
//!   HGVS.c, zygosity, classification) checked against a
//!   [`variant::Vocabulary`] of genes.
//! - Pulling the requested and confirmed calls for each sample out of a
//!   [`sheet::Sheet`] with an [`extract::Extractor`].
//! - Driving a [`manifest::Manifest`] through the processing stages with a
//!   [`manifest::Pipeline`].
//! - [Classifying](crate::reconcile::classify) a requested call against its
//!   confirmed call and tallying the outcomes into a positive predictive value.
//!
//! The remote platform holding the pipeline output, the reader for variant
//! call files, and the translator from HGVS.c to genomic coordinates are not
//! implemented here. They are reached through the [`remote::Platform`],
//! [`calls::CallReader`], and [`genomic::Translator`] traits respectively.
//!
//! Below is a representative example of extracting calls from a spreadsheet
//! and reconciling them.
//!
//! ```
//! use varconfirm::extract::Extractor;
//! use varconfirm::reconcile::Outcome;
//! use varconfirm::reconcile::classify;
//! use varconfirm::sheet::Sheet;
//! use varconfirm::variant::Variant;
//! use varconfirm::variant::Vocabulary;
//!
//! let sheet = Sheet::from_raw([
//!     vec!["", "NGS12_01_345_AB_Pan4044_S1"],
//!     vec!["SNV variant confirmation", "BRCA1 c.68_69del het"],
//!     vec!["Final Result", "BRCA1 c.68_69del het"],
//! ]);
//!
//! let vocabulary = Vocabulary::new(["BRCA1", "BRCA2"]);
//! let extraction = Extractor::default().extract(&sheet, "batch.csv").unwrap();
//!
//! for (sample, calls) in extraction.iter() {
//!     let requested = Variant::parse(calls.requested(), &vocabulary);
//!     let confirmed = Variant::parse(calls.confirmed(), &vocabulary);
//!     assert_eq!(sample, "NGS12_01_345_AB_Pan4044_S1");
//!     assert_eq!(classify(&requested, &confirmed), Outcome::TruePositive);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod calls;
pub mod extract;
pub mod genomic;
pub mod manifest;
pub mod reconcile;
pub mod remote;
pub mod sample;
pub mod sheet;
pub mod variant;

pub use manifest::Manifest;
