use crate::infra::{parse_dimension, parse_format, parse_sort_key};
use crate::report::{run_export, run_report, run_segments};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_insight::error::AppError;
use loan_insight::portfolio::{ActionSortKey, ExportFormat, SegmentDimension};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Insight",
    about = "Score, segment, and rank a loan portfolio from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print portfolio KPIs, risk bands, segment tables, and the top of the action list
    Report(ReportArgs),
    /// Rank segments of one dimension by default rate after minimum-volume suppression
    Segments(SegmentsArgs),
    /// Write the ranked action list to a CSV, TSV, or Excel file
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

/// Inputs shared by every analysis command.
#[derive(Args, Debug, Default)]
pub(crate) struct ViewArgs {
    /// Loan dataset CSV (defaults to LOAN_DATASET_PATH)
    #[arg(long)]
    pub(crate) dataset: Option<PathBuf>,
    /// JSON file holding the filter specification to apply
    #[arg(long)]
    pub(crate) filters: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ActionArgs {
    /// Number of loans kept in the action list (50-2000, defaults to LOAN_TOP_N)
    #[arg(long)]
    pub(crate) top_n: Option<usize>,
    /// Only keep loans whose DTI ratio exceeds the critical threshold
    #[arg(long)]
    pub(crate) critical_only: bool,
    /// Ranking key: risk-score or value-at-risk
    #[arg(long, default_value = "risk-score", value_parser = parse_sort_key)]
    pub(crate) sort_by: ActionSortKey,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) view: ViewArgs,
    #[command(flatten)]
    pub(crate) actions: ActionArgs,
    /// Action-list rows to print
    #[arg(long, default_value_t = 10)]
    pub(crate) show: usize,
}

#[derive(Args, Debug)]
pub(crate) struct SegmentsArgs {
    #[command(flatten)]
    pub(crate) view: ViewArgs,
    /// Column to group on, e.g. LoanPurpose or employment_type
    #[arg(long, value_parser = parse_dimension)]
    pub(crate) dimension: SegmentDimension,
    /// Drop segments with fewer loans (defaults to LOAN_MIN_SEGMENT_VOLUME)
    #[arg(long)]
    pub(crate) min_count: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) view: ViewArgs,
    #[command(flatten)]
    pub(crate) actions: ActionArgs,
    /// Output file, or a directory to receive a timestamped file
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// csv, tsv or xlsx
    #[arg(long, default_value = "csv", value_parser = parse_format)]
    pub(crate) format: ExportFormat,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args),
        Command::Segments(args) => run_segments(args),
        Command::Export(args) => run_export(args),
    }
}
