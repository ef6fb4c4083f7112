// crates/fixture-bench-cli/src/main.rs
// ============================================================================
// Module: Fixture Bench CLI Entry Point
// Description: Command dispatcher for manual fixture and bucket workflows.
// Purpose: Seed, clean, and count against a mock S3 bucket outside a test run.
// Dependencies: clap, fixture-bench-core, fixture-bench-s3, serde, thiserror
// ============================================================================

//! ## Overview
//! `fixture-bench` exposes the harness steps as individual commands so a
//! developer can reproduce a test's bucket state by hand. Every command loads
//! the same configuration as the test harness and writes one JSON document to
//! stdout. Errors go to stderr with a failing exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use fixture_bench_core::BucketCleaner;
use fixture_bench_core::CleanReport;
use fixture_bench_core::CsvReadOptions;
use fixture_bench_core::FixtureLoader;
use fixture_bench_core::HarnessConfig;
use fixture_bench_core::HarnessEvent;
use fixture_bench_core::HarnessEventKind;
use fixture_bench_core::HarnessEventSink;
use fixture_bench_core::LocalSession;
use fixture_bench_core::ObjectStoreClient;
use fixture_bench_core::ObjectUri;
use fixture_bench_core::UploadReport;
use fixture_bench_core::sink_from_config;
use fixture_bench_s3::S3ObjectStoreClient;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fixture-bench", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a test's fixture directory into the bucket.
    Seed(SeedCommand),
    /// Delete every object in the bucket.
    Clean(CleanCommand),
    /// Read a CSV path through the local session and count rows.
    Count(CountCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `seed` command.
#[derive(Args, Debug)]
struct SeedCommand {
    /// Fixture directory name (the test function name).
    #[arg(value_name = "TEST_NAME")]
    test_name: String,
    /// Optional config file path (defaults to fixture-bench.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Create the bucket before uploading.
    #[arg(long, action = ArgAction::SetTrue)]
    create_bucket: bool,
}

/// Arguments for the `clean` command.
#[derive(Args, Debug)]
struct CleanCommand {
    /// Optional config file path (defaults to fixture-bench.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `count` command.
#[derive(Args, Debug)]
struct CountCommand {
    /// Object or prefix URI, e.g. `s3a://bucket/cars.csv`.
    #[arg(value_name = "URI", value_parser = parse_uri)]
    uri: ObjectUri,
    /// Optional config file path (defaults to fixture-bench.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Treat the first line of each object as a header.
    #[arg(long, action = ArgAction::SetTrue)]
    header: bool,
    /// Single-byte field delimiter.
    #[arg(long, value_name = "CHAR", default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
    /// Fail unless the row count equals this value.
    #[arg(long, value_name = "N")]
    expect: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a fixture bench configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to fixture-bench.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// `count` command output.
#[derive(Debug, Serialize)]
struct CountOutput {
    /// URI that was read.
    uri: String,
    /// Rows read.
    rows: usize,
    /// Object keys that contributed rows.
    sources: Vec<String>,
}

/// `config validate` command output.
#[derive(Debug, Serialize)]
struct ConfigOutput {
    /// Validation status label.
    status: &'static str,
    /// Storage endpoint.
    endpoint: String,
    /// Target bucket.
    bucket: String,
    /// Fixture root directory.
    fixture_root: PathBuf,
}

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Loaded config plus the storage client and event sink built from it.
struct Environment {
    /// Harness configuration.
    config: HarnessConfig,
    /// Storage client.
    client: Arc<dyn ObjectStoreClient>,
    /// Event sink.
    sink: Arc<dyn HarnessEventSink>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }

    /// Wraps an error with a short context label.
    fn context(label: &str, err: impl std::fmt::Display) -> Self {
        Self::new(format!("{label}: {err}"))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Seed(command) => {
            let env = load_environment(command.config.as_deref())?;
            write_json(&command_seed(&command, &env)?)?;
        }
        Commands::Clean(command) => {
            let env = load_environment(command.config.as_deref())?;
            write_json(&command_clean(&env)?)?;
        }
        Commands::Count(command) => {
            let env = load_environment(command.config.as_deref())?;
            write_json(&command_count(&command, &env)?)?;
        }
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => write_json(&command_config_validate(&command)?)?,
        },
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Uploads one fixture directory.
fn command_seed(command: &SeedCommand, env: &Environment) -> CliResult<UploadReport> {
    let bucket = env.config.storage.bucket.as_str();
    if command.create_bucket {
        env.client
            .create_bucket(&env.config.storage.bucket_spec())
            .map_err(|err| CliError::context("create bucket failed", err))?;
        env.sink.record(&HarnessEvent::new(HarnessEventKind::BucketCreated, bucket));
    }
    let report = FixtureLoader::new(&env.config.fixtures.root)
        .upload(&command.test_name, env.client.as_ref(), bucket)
        .map_err(|err| CliError::context("seed failed", err))?;
    env.sink.record(
        &HarnessEvent::new(HarnessEventKind::FixturesUploaded, bucket)
            .with_test(&command.test_name)
            .with_objects(report.keys.len())
            .with_bytes(report.total_bytes),
    );
    Ok(report)
}

/// Empties the configured bucket.
fn command_clean(env: &Environment) -> CliResult<CleanReport> {
    let report = BucketCleaner::new(&env.config.storage.bucket)
        .clean(env.client.as_ref())
        .map_err(|err| CliError::context("clean failed", err))?;
    env.sink.record(
        &HarnessEvent::new(HarnessEventKind::BucketCleaned, &report.bucket)
            .with_objects(report.deleted),
    );
    Ok(report)
}

/// Reads and counts a CSV path, enforcing `--expect` when given.
fn command_count(command: &CountCommand, env: &Environment) -> CliResult<CountOutput> {
    let mut session =
        LocalSession::start(&env.config.session, &env.config.storage.bucket, env.client.clone());
    let options = CsvReadOptions {
        has_header: command.header,
        delimiter: command.delimiter,
    };
    let frame = session
        .read_csv_with(&command.uri, options)
        .map_err(|err| CliError::context("read failed", err))?;
    env.sink.record(
        &HarnessEvent::new(HarnessEventKind::DatasetRead, session.bucket())
            .with_read(command.uri.to_string(), frame.count()),
    );
    session.stop().map_err(|err| CliError::context("session stop failed", err))?;
    match command.expect {
        Some(expected) if expected != frame.count() => Err(CliError::new(format!(
            "row count mismatch for {}: expected {expected}, got {}",
            command.uri,
            frame.count()
        ))),
        _ => Ok(CountOutput {
            uri: command.uri.to_string(),
            rows: frame.count(),
            sources: frame.sources().to_vec(),
        }),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ConfigOutput> {
    let config = HarnessConfig::load(command.config.as_deref())
        .map_err(|err| CliError::context("config load failed", err))?;
    Ok(ConfigOutput {
        status: "ok",
        endpoint: config.storage.endpoint,
        bucket: config.storage.bucket,
        fixture_root: config.fixtures.root,
    })
}

// ============================================================================
// SECTION: Setup Helpers
// ============================================================================

/// Loads config and builds the S3 client and event sink.
fn load_environment(path: Option<&std::path::Path>) -> CliResult<Environment> {
    let config =
        HarnessConfig::load(path).map_err(|err| CliError::context("config load failed", err))?;
    let client = S3ObjectStoreClient::new(&config.storage)
        .map_err(|err| CliError::context("storage client failed", err))?;
    let sink = sink_from_config(&config.events)
        .map_err(|err| CliError::context("event sink failed", err))?;
    Ok(Environment {
        config,
        client: Arc::new(client),
        sink,
    })
}

/// Parses an object URI argument.
fn parse_uri(raw: &str) -> Result<ObjectUri, String> {
    ObjectUri::parse(raw).map_err(|err| err.to_string())
}

/// Parses a single-byte ASCII delimiter argument.
fn parse_delimiter(raw: &str) -> Result<u8, String> {
    let value = match raw {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match value.as_bytes() {
        [byte] if byte.is_ascii() && *byte != b'\n' && *byte != b'"' => Ok(*byte),
        _ => Err(format!("delimiter must be a single ASCII character, got '{raw}'")),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value as one JSON line on stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let payload =
        serde_json::to_string(value).map_err(|err| CliError::context("serialize failed", err))?;
    write_stdout_line(&payload).map_err(|err| CliError::context("stdout write failed", err))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
