//! Domain Resolve CLI Application
//!
//! Reads a list of domains and URLs, checks which ones resolve via DNS with
//! bounded concurrency, and writes the resolving names sorted and unique.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_resolve_lib::{
    load_env_config, read_input_lines, timeout_from_secs, write_output, ConfigManager,
    DomainResolveError, DomainValidator, FileConfig, NoProgress, ProgressReporter, RunConfig,
    MAX_WORKERS, MIN_WORKERS,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-resolve
#[derive(Parser, Debug)]
#[command(name = "domain-resolve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Filter a domain list down to the names that resolve via DNS")]
#[command(
    long_about = "Filter a domain list down to the names that resolve via DNS.\n\nInput lines may be bare domains or URLs; schemes, paths and ports are stripped, blank lines and #-comments are ignored. Resolving names are written sorted and de-duplicated, one per line."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Text file with one domain or URL per line
    #[arg(value_name = "INPUT_FILE")]
    pub input_file: PathBuf,

    /// Where to write the domains that resolve (parent directories are created)
    #[arg(value_name = "OUTPUT_FILE")]
    pub output_file: PathBuf,

    /// Per-attempt DNS timeout in seconds [default: 5.0]
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "SECONDS",
        allow_negative_numbers = true,
        help_heading = "Performance"
    )]
    pub timeout: Option<f64>,

    /// Concurrent lookups, 1-200 [default: 50]
    #[arg(
        short = 'w',
        long = "workers",
        value_name = "N",
        allow_negative_numbers = true,
        help_heading = "Performance"
    )]
    pub workers: Option<i64>,

    /// Retries per domain after a failed attempt [default: 2]
    #[arg(
        short = 'r',
        long = "retries",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub retries: Option<u32>,

    /// Lookup backend: hickory (async DNS) or system (OS resolver) [default: hickory]
    #[arg(long = "resolver", value_name = "BACKEND", help_heading = "Performance")]
    pub resolver: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Do not draw the progress line
    #[arg(long = "no-progress", help_heading = "Output Format")]
    pub no_progress: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Log rejected lines and failed domains
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

type LogHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too and are not failures.
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let log_handle = init_tracing(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // verbose may also come from DR_VERBOSE or the config file
    if config.verbose && !args.verbose {
        let _ = log_handle.reload(log_filter(true));
    }

    if let Err(e) = run_resolution(&args, config).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "warn" };
        EnvFilter::new(format!(
            "warn,domain_resolve_lib={level},domain_resolve={level}"
        ))
    })
}

fn init_tracing(verbose: bool) -> LogHandle {
    let (filter, handle) = reload::Layer::new(log_filter(verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
    handle
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(timeout) = args.timeout {
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(format!("Timeout must be a positive number of seconds, got {}", timeout));
        }
    }

    if let Some(workers) = args.workers {
        if workers < MIN_WORKERS as i64 || workers > MAX_WORKERS as i64 {
            return Err(format!(
                "Workers must be between {} and {}, got {}",
                MIN_WORKERS, MAX_WORKERS, workers
            ));
        }
    }

    if let Some(resolver) = &args.resolver {
        resolver
            .parse::<domain_resolve_lib::ResolverBackend>()
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Build the run configuration: defaults, then config file, then `DR_*`
/// environment variables, then CLI flags.
fn build_config(args: &Args) -> Result<RunConfig, DomainResolveError> {
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config(args.verbose);

    let file_config = if let Some(explicit_path) = &args.config {
        tracing::debug!(path = %explicit_path, "using config file from --config");
        config_manager.load_file(explicit_path)?
    } else if let Some(env_path) = &env_config.config {
        tracing::debug!(path = %env_path, "using config file from DR_CONFIG");
        config_manager.load_file(env_path)?
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => file_config,
            Err(e) => {
                tracing::warn!("ignoring config files: {}", e);
                FileConfig::default()
            }
        }
    };

    let mut config = RunConfig::default();
    if let Some(defaults) = &file_config.defaults {
        config = defaults.apply_to(config)?;
    }
    config = env_config.apply_to(config);
    config = apply_cli_args_to_config(config, args)?;

    config.validate()?;
    Ok(config)
}

/// Apply CLI arguments to config (highest precedence).
///
/// Only flags the user actually passed override earlier layers.
fn apply_cli_args_to_config(
    mut config: RunConfig,
    args: &Args,
) -> Result<RunConfig, DomainResolveError> {
    if let Some(timeout) = args.timeout {
        config.timeout = timeout_from_secs(timeout)?;
    }
    if let Some(workers) = args.workers {
        config.max_workers = usize::try_from(workers)
            .map_err(|_| DomainResolveError::config("Workers must not be negative"))?;
    }
    if let Some(retries) = args.retries {
        config.max_retries = retries;
    }
    if args.verbose {
        config.verbose = true;
    }
    if let Some(resolver) = &args.resolver {
        config.resolver = resolver.parse()?;
    }
    Ok(config)
}

/// Read, resolve, write, report.
///
/// An interrupt before the run finishes aborts every worker and writes
/// nothing.
async fn run_resolution(args: &Args, config: RunConfig) -> Result<(), DomainResolveError> {
    let lines = read_input_lines(&args.input_file)?;
    let verbose = config.verbose;
    let validator = DomainValidator::with_config(config);

    let progress_line = if args.no_progress {
        None
    } else {
        ui::ProgressLine::stderr()
    };
    let reporter: &dyn ProgressReporter = match &progress_line {
        Some(line) => line,
        None => &NoProgress,
    };

    let outcome = tokio::select! {
        report = validator.validate_lines(&lines, reporter) => Some(report),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    if let Some(line) = &progress_line {
        line.finish();
    }

    let report = match outcome {
        Some(report) => report?,
        None => {
            return Err(DomainResolveError::run(
                "interrupted before all domains were checked, no output written",
            ))
        }
    };

    write_output(&args.output_file, &report.valid)?;

    let summary = report.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if verbose {
            ui::print_failures(&report.outcomes);
        }
        ui::print_summary(&summary, &args.output_file);
    }

    Ok(())
}
