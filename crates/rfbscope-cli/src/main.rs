use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use rfbscope_core::protocols::rfb::{Encoding, PixelFormat, builtin_encoding_by_name};
use rfbscope_core::{AnalysisOptions, Report};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("RFBSCOPE_BUILD_COMMIT"),
    "\nbuilt: ",
    env!("RFBSCOPE_BUILD_DATE"),
);

const EXAMPLES: &str = "Examples:\n  rfbscope decode server.bin -o report.json\n  rfbscope analyze server.bin --stdout --pretty\n  rfbscope decode server.bin --stdout --bpp 8 --encodings copyrect,desktop-size";

#[derive(Parser, Debug)]
#[command(name = "rfbscope")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline decoder for recorded RFB (VNC) server-to-client streams.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Log decoder activity to stderr (overridden by RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a recorded stream and generate a versioned JSON report.
    #[command(alias = "analyze")]
    #[command(after_help = EXAMPLES)]
    Decode {
        /// Path (or glob matching one file) of the server-to-client bytes
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if decoding stopped on an error
        #[arg(long)]
        strict: bool,

        /// Negotiated bits per pixel (8, 16 or 32)
        #[arg(long, default_value_t = 32)]
        bpp: u8,

        /// Negotiated encodings, comma separated (copyrect, desktop-size or numeric ids)
        #[arg(long, value_delimiter = ',')]
        encodings: Option<Vec<String>>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Decode {
            input,
            report,
            stdout,
            pretty,
            compact,
            quiet,
            strict,
            bpp,
            encodings,
        } => cmd_decode(DecodeArgs {
            input,
            report,
            stdout,
            pretty,
            compact,
            quiet,
            strict,
            bpp,
            encodings,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

struct DecodeArgs {
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    bpp: u8,
    encodings: Option<Vec<String>>,
}

fn cmd_decode(args: DecodeArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report_path = if args.stdout {
        None
    } else {
        Some(args.report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report_path.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let options = build_options(args.bpp, args.encodings.as_deref())?;
    let rep = rfbscope_core::analyze_stream_file(&resolved_input, &options, log::logger())
        .context("stream analysis failed")?;
    let json = serialize_report(&rep, args.pretty, args.compact)?;

    match report_path {
        None => print!("{}", json),
        Some(report_path) => {
            if let Some(parent) = report_path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report_path, json)
                .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
            if !args.quiet {
                eprintln!("OK: report written -> {}", report_path.display());
            }
        }
    }

    if !args.quiet {
        print_failure(&rep);
    }
    if args.strict && rep.failure.is_some() {
        return Err(CliError::new(
            "stream decoding stopped on an error",
            Some("see the report's `failure` entry".to_string()),
        ));
    }
    Ok(())
}

/// A report whose directory does not exist yet cannot be the input file.
fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_abs = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            }
        })
        .filter(|parent| parent.exists())
        .map(fs::canonicalize)
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    if let Some(report_dir) = report_abs {
        let report_target = report_dir.join(
            report_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
        );
        if report_target == input_abs {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn build_options(bpp: u8, encodings: Option<&[String]>) -> Result<AnalysisOptions, CliError> {
    let mut options = AnalysisOptions::default();
    options.pixel_format = PixelFormat::for_bits_per_pixel(bpp).map_err(|err| {
        CliError::new(err.to_string(), Some("use --bpp 8, 16 or 32".to_string()))
    })?;
    if let Some(names) = encodings {
        options.encodings = parse_encodings(names)?;
    }
    Ok(options)
}

fn parse_encodings(names: &[String]) -> Result<Vec<Arc<dyn Encoding>>, CliError> {
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| {
            builtin_encoding_by_name(name).ok_or_else(|| {
                CliError::new(
                    format!("unknown encoding '{}'", name),
                    Some("built-in encodings: raw, copyrect, desktop-size".to_string()),
                )
            })
        })
        .collect()
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn print_failure(rep: &Report) {
    if let Some(failure) = rep.failure.as_ref() {
        eprintln!(
            "Decoding stopped at message {} (offset {}, {}): {}",
            failure.message_index, failure.offset, failure.phase, failure.error
        );
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a file holding the server-to-client bytes".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a file holding the server-to-client bytes".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single stream file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
