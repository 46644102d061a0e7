mod logging;
mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use omniture_client::{ApiError, ClientError, FetchOptions, HttpReportApi, ReportClient};
use omniture_core::{
    EmitSummary, Error as CoreError, FlatReport, ResolvedStep, RowEmitter, StepConfig, Variables,
    expected_headers,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::logging::init_logging;
use crate::output::{CsvSink, JsonLinesSink, OutputFormat};

#[derive(Debug, Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config file: {0}")]
    ConfigFile(#[from] toml::de::Error),
    #[error(transparent)]
    Step(#[from] CoreError),
    #[error("client setup failed: {0}")]
    Setup(#[from] ApiError),
    #[error(transparent)]
    Fetch(#[from] ClientError),
    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "omniture", version, about = "Queue, poll and flatten analytics reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the configured report and write it as rows.
    Fetch(FetchArgs),
    /// Print the header a configured report is expected to produce.
    Fields(FieldsArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Step configuration (TOML); `${NAME}` is replaced from the environment.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Output file; rows go to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Row format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Args, Debug)]
struct FieldsArgs {
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Fetch(args) => run_fetch(args).await,
        Command::Fields(args) => run_fields(args),
    }
}

async fn run_fetch(args: FetchArgs) -> Result<(), CliError> {
    let FetchArgs {
        config,
        out,
        format,
        log_file,
        json_logs,
    } = args;

    init_logging(log_file.as_deref(), json_logs)?;
    let step = load_step(&config, &env_variables())?;

    let api = HttpReportApi::new(&step.endpoint, step.credentials.clone())?;
    let client = ReportClient::new(api).with_options(FetchOptions::from(&step));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling fetch");
            on_interrupt.cancel();
        }
    });

    let report = client.fetch(&step.descriptor, &cancel).await?;
    let flat = FlatReport::from_report(&report);

    let written = match out.as_deref() {
        Some(path) => write_rows(format, BufWriter::new(File::create(path)?), &flat)?,
        None => write_rows(format, io::stdout().lock(), &flat)?,
    };

    info!(
        report_suite = step.descriptor.report_suite_id(),
        rows = written.summary.rows,
        columns = written.summary.columns,
        bytes = written.bytes,
        dropped = flat.dropped,
        "report written"
    );
    Ok(())
}

fn run_fields(args: FieldsArgs) -> Result<(), CliError> {
    let step = load_step(&args.config, &env_variables())?;
    let mut stdout = io::stdout().lock();
    for column in expected_headers(&step.descriptor) {
        writeln!(stdout, "{column}")?;
    }
    Ok(())
}

fn env_variables() -> Variables {
    std::env::vars().collect()
}

fn load_step(path: &Path, vars: &Variables) -> Result<ResolvedStep, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let config: StepConfig = toml::from_str(&raw)?;
    Ok(config.resolve(vars)?)
}

/// Rows handed to the sink and bytes it wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Written {
    summary: EmitSummary,
    bytes: u64,
}

fn write_rows<W: Write>(
    format: OutputFormat,
    out: W,
    flat: &FlatReport,
) -> Result<Written, CliError> {
    match format {
        OutputFormat::Csv => {
            let mut emitter = RowEmitter::new(CsvSink::new(out));
            let summary = emitter.emit(&flat.header, &flat.records)?;
            let sink = emitter.into_inner();
            let bytes = sink.bytes_written();
            sink.into_inner()?;
            Ok(Written { summary, bytes })
        }
        OutputFormat::Jsonl => {
            let mut emitter = RowEmitter::new(JsonLinesSink::new(out));
            let summary = emitter.emit(&flat.header, &flat.records)?;
            let sink = emitter.into_inner();
            let bytes = sink.bytes_written();
            drop(sink.into_inner());
            Ok(Written { summary, bytes })
        }
    }
}
