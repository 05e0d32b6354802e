// src/main.rs
mod utils;
mod extractors;
mod storage;

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use clap::{ArgAction, Parser};
use utils::AppError;
use extractors::models::AnswerRecord;
use extractors::{ScanOptions, TableScanner};
use storage::{DocumentSummary, OutputFormat, RunSummary, StorageManager};

/// Extracts expected answers from MCC results pages as flat CSV records
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Saved results pages (HTML). Reads stdin when omitted
    inputs: Vec<PathBuf>,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Append the expected-result label to record names (name-TYPE-label)
    #[arg(long)]
    with_variation: bool,

    /// Skip documents that fail to extract instead of aborting the run
    #[arg(long)]
    keep_going: bool,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Raise the default log level (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Where one results page comes from.
#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Stdin,
}

impl Source {
    fn read(&self) -> Result<String, AppError> {
        match self {
            Source::File(path) => Ok(std::fs::read_to_string(path)?),
            Source::Stdin => {
                let mut content = String::new();
                std::io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Stdin => write!(f, "<stdin>"),
        }
    }
}

fn sources(inputs: &[PathBuf]) -> Vec<Source> {
    if inputs.is_empty() {
        vec![Source::Stdin]
    } else {
        inputs.iter().cloned().map(Source::File).collect()
    }
}

/// Records and counters gathered over all input documents.
#[derive(Debug, Default)]
struct ScanRun {
    records: Vec<AnswerRecord>,
    documents: Vec<DocumentSummary>,
    failure_count: usize,
}

/// Scans each source in order. The first failure aborts unless `keep_going`
/// is set, in which case it is logged and counted. Fails when no document
/// could be scanned at all.
fn scan_sources(scanner: &TableScanner, sources: &[Source], keep_going: bool) -> Result<ScanRun, AppError> {
    let mut run = ScanRun::default();

    for source in sources {
        tracing::info!("Doing {}", source);

        let scanned = source
            .read()
            .and_then(|html| scanner.scan(&html).map_err(AppError::from));

        match scanned {
            Ok(scan) => {
                tracing::info!("got {} total results for category {}", scan.records.len(), scan.category);
                run.documents.push(DocumentSummary::from_scan(source.to_string(), &scan));
                run.records.extend(scan.records);
            }
            Err(e) if keep_going => {
                tracing::error!("Failed to extract answers from {}: {}", source, e);
                run.failure_count += 1;
            }
            Err(e) => {
                tracing::error!("Failed to extract answers from {}: {}", source, e);
                return Err(e);
            }
        }
    }

    if run.documents.is_empty() && run.failure_count > 0 {
        return Err(AppError::Processing(format!("Failed to extract answers from all {} documents", run.failure_count)));
    }

    Ok(run)
}

fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.verbose);
    tracing::info!("Starting processing for args: {:?}", args);

    if args.output.is_some() && args.output == args.summary {
        return Err(AppError::Config("--output and --summary must be different files".to_string()));
    }

    let scanner = TableScanner::new(ScanOptions { include_variation: args.with_variation });

    // 3. Scan every document; records are buffered until all succeed
    let run = scan_sources(&scanner, &sources(&args.inputs), args.keep_going)?;

    // 4. Write records, then the optional summary
    let storage = StorageManager::new(args.output.clone());
    let rendered = storage::render(&run.records, args.format)?;
    storage.write_records(&rendered)?;

    if let Some(path) = &args.summary {
        let summary = RunSummary::new(run.documents, run.failure_count);
        storage.save_summary(path, &summary)?;
    }

    tracing::info!("Processing finished. Records: {}, Failures: {}", run.records.len(), run.failure_count);

    Ok(())
}
