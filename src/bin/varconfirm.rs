//! A binary to build a manifest of Sanger confirmation calls and to score the
//! sequencing pipeline against it.
//!
//! ```shell
//! cargo run --release --bin=varconfirm --features=binaries -- \
//!     run --manifest manifest.tsv --genes genes.txt --directory confirmations/
//! cargo run --release --bin=varconfirm --features=binaries -- \
//!     classify --manifest manifest.tsv --genes genes.txt
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Rows;
use tracing::info;
use tracing::warn;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;
use varconfirm::Manifest;
use varconfirm::manifest::Entry;
use varconfirm::manifest::Pipeline;
use varconfirm::manifest::Stage;
use varconfirm::manifest::pipeline::Report;
use varconfirm::reconcile::Outcome;
use varconfirm::reconcile::Reconciled;
use varconfirm::reconcile::Tally;
use varconfirm::sheet::Spreadsheets;
use varconfirm::variant::GeneSelection;
use varconfirm::variant::Vocabulary;
use walkdir::WalkDir;

////////////////////////////////////////////////////////////////////////////////////////
// Arguments
////////////////////////////////////////////////////////////////////////////////////////

/// Reconciles Sanger confirmation spreadsheets against sequencing calls.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// The subcommand.
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity,
}

/// The subcommands.
#[derive(Subcommand)]
enum Command {
    /// Runs pipeline stages over a manifest.
    Run(RunArgs),

    /// Classifies every entry of a manifest and summarizes the outcomes.
    Classify(ClassifyArgs),
}

/// Options shared by every subcommand.
#[derive(Args)]
struct Common {
    /// The manifest.
    #[arg(short, long)]
    manifest: PathBuf,

    /// The gene vocabulary (one gene per line, optionally followed by its
    /// preferred transcripts).
    #[arg(short, long)]
    genes: PathBuf,

    /// Pick the leftmost gene in a cell rather than the first gene in
    /// vocabulary order.
    #[arg(long, default_value_t = false)]
    leftmost: bool,
}

/// Arguments to `run`.
#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    common: Common,

    /// The stages to run, in order (defaults to every stage but `genomic`).
    #[arg(short, long = "stage", value_delimiter = ',')]
    stages: Vec<Stage>,

    /// A spreadsheet to add to the manifest.
    #[arg(short, long)]
    file: Vec<PathBuf>,

    /// A directory searched (recursively) for spreadsheets to add to the
    /// manifest.
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// A manifest that entries dropped by the filter stage are appended to.
    #[arg(short, long)]
    removed: Option<PathBuf>,
}

/// Arguments to `classify`.
#[derive(Args)]
struct ClassifyArgs {
    #[command(flatten)]
    common: Common,

    /// Where the per-entry outcomes are written (defaults to stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

////////////////////////////////////////////////////////////////////////////////////////
// Helpers
////////////////////////////////////////////////////////////////////////////////////////

/// Loads the gene vocabulary.
fn vocabulary(common: &Common) -> Result<Vocabulary> {
    let selection = match common.leftmost {
        true => GeneSelection::Leftmost,
        false => GeneSelection::VocabularyOrder,
    };

    let vocabulary = Vocabulary::from_path(&common.genes)
        .with_context(|| format!("reading gene vocabulary: {}", common.genes.display()))?
        .with_selection(selection);

    info!("gene vocabulary: {} genes", vocabulary.len());
    Ok(vocabulary)
}

/// Finds every spreadsheet beneath `directory`.
///
/// Entries that cannot be read are skipped.
fn spreadsheets(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        bail!("not a directory: {}", directory.display());
    }

    let mut found = WalkDir::new(directory)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| Spreadsheets::supports(path))
        .collect::<Vec<_>>();

    found.sort();
    Ok(found)
}

/// Renders the stage reports as a table.
fn stage_table(reports: &[Report]) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Stage",
        "Entries in",
        "Entries out",
        "Unreadable",
        "Removed",
        "Repaired",
        "Issues",
    ]);

    for report in reports {
        builder.push_record([
            report.stage().to_string(),
            report.entries_in().to_string(),
            report.entries_out().to_string(),
            report.unreadable().len().to_string(),
            report.removed().to_string(),
            report.repaired().to_string(),
            report.issues().values().sum::<usize>().to_string(),
        ]);
    }

    builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string()
}

/// Renders the issue counts of the stage reports as a table.
///
/// Returns [`None`] when no stage recorded an issue.
fn issue_table(reports: &[Report]) -> Option<String> {
    let mut builder = Builder::default();
    builder.push_record(["Stage", "Field", "Issue", "Count"]);

    let mut empty = true;

    for report in reports {
        for (key, count) in report.issues() {
            let (field, issue) = key.split_once('-').unwrap_or(("", key.as_str()));
            builder.push_record([
                report.stage().to_string(),
                field.to_string(),
                issue.to_string(),
                count.to_string(),
            ]);
            empty = false;
        }
    }

    if empty {
        return None;
    }

    Some(
        builder
            .build()
            .with(Style::rounded())
            .modify(Rows::new(1..), Alignment::left())
            .to_string(),
    )
}

/// Renders the spreadsheets that could not be read as a table.
///
/// Returns [`None`] when every spreadsheet was read.
fn unreadable_table(reports: &[Report]) -> Option<String> {
    let mut builder = Builder::default();
    builder.push_record(["Stage", "File", "Reason"]);

    let mut empty = true;

    for report in reports {
        for (file, reason) in report.unreadable() {
            builder.push_record([report.stage().to_string(), file.clone(), reason.clone()]);
            empty = false;
        }
    }

    if empty {
        return None;
    }

    Some(
        builder
            .build()
            .with(Style::rounded())
            .modify(Rows::new(1..), Alignment::left())
            .to_string(),
    )
}

/// Renders an outcome tally as a table.
fn tally_table(tally: &Tally) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Outcome", "Count"]);

    for outcome in Outcome::ALL {
        builder.push_record([outcome.to_string(), tally.get(outcome).to_string()]);
    }

    builder.push_record([String::from("Total"), tally.total().to_string()]);

    let ppv = tally
        .positive_predictive_value()
        .map(|ppv| format!("{:.2}%", ppv * 100.0))
        .unwrap_or_else(|| String::from("n/a"));
    builder.push_record([String::from("PPV"), ppv]);

    builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string()
}

////////////////////////////////////////////////////////////////////////////////////////
// Subcommands
////////////////////////////////////////////////////////////////////////////////////////

/// Runs pipeline stages over a manifest.
fn run(args: &RunArgs) -> Result<()> {
    let stages = match args.stages.is_empty() {
        true => Stage::STANDARD.to_vec(),
        false => args.stages.clone(),
    };

    if stages.contains(&Stage::Genomic) {
        bail!(
            "the genomic stage needs a coordinate translator, which this binary does not \
             provide"
        );
    }

    let vocabulary = vocabulary(&args.common)?;

    let mut manifest = Manifest::open(&args.common.manifest)
        .with_context(|| format!("opening manifest: {}", args.common.manifest.display()))?;

    let mut files = args.file.clone();

    if let Some(directory) = &args.directory {
        files.extend(spreadsheets(directory)?);
    }

    let known = manifest
        .entries()
        .iter()
        .map(|entry| entry.file.clone())
        .collect::<std::collections::HashSet<_>>();

    let added = files
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .filter(|file| !known.contains(file))
        .map(Entry::from_file)
        .collect::<Vec<_>>();

    if !added.is_empty() {
        info!("adding {} spreadsheets to the manifest", added.len());
        manifest.extend(added);
    }

    if manifest.is_empty() {
        warn!("the manifest is empty");
    }

    let mut pipeline = Pipeline::new(Spreadsheets, &vocabulary);

    if let Some(removed) = &args.removed {
        pipeline = pipeline.with_removed(removed);
    }

    let mut reports = Vec::new();

    for stage in stages {
        info!("running stage: {stage}");
        let report = pipeline
            .run(stage, &mut manifest)
            .with_context(|| format!("running the {stage} stage"))?;

        for (file, reason) in report.unreadable() {
            warn!("unreadable spreadsheet: {file} ({reason})");
        }

        reports.push(report);
    }

    println!("{}", stage_table(&reports));

    if let Some(table) = issue_table(&reports) {
        println!("{table}");
    }

    if let Some(table) = unreadable_table(&reports) {
        println!("{table}");
    }

    Ok(())
}

/// Classifies every entry of a manifest.
fn classify(args: &ClassifyArgs) -> Result<()> {
    if !args.common.manifest.exists() {
        bail!("manifest does not exist: {}", args.common.manifest.display());
    }

    let vocabulary = vocabulary(&args.common)?;
    let manifest = Manifest::open(&args.common.manifest)
        .with_context(|| format!("opening manifest: {}", args.common.manifest.display()))?;

    let reconciled = manifest
        .entries()
        .iter()
        .map(|entry| Reconciled::from_entry(entry, &vocabulary))
        .collect::<Vec<_>>();

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("creating output file: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    writeln!(writer, "sample\tgene\trequested\tconfirmed\toutcome").context("writing outcomes")?;

    for entry in &reconciled {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            entry.sample(),
            entry.gene().unwrap_or_default(),
            entry.requested().unwrap_or_default(),
            entry.confirmed().unwrap_or_default(),
            entry.outcome()
        )
        .context("writing outcomes")?;
    }

    writer.flush().context("writing outcomes")?;
    drop(writer);

    let tally = reconciled
        .iter()
        .map(Reconciled::outcome)
        .collect::<Tally>();

    eprintln!("{}", tally_table(&tally));
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

fn main() -> Result<()> {
    let cli = Cli::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(cli.verbose.log_level_filter().as_trace())
            .init(),
    };

    match &cli.command {
        Command::Run(args) => run(args),
        Command::Classify(args) => classify(args),
    }
}
